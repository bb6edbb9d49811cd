pub mod attendee;
pub mod event;
pub mod fields;
pub mod query;
pub mod stock;
pub mod ticket;
