pub mod currency;
pub mod error;
pub mod hooks;
