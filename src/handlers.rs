pub mod attendees;
pub mod events;
pub mod tickets;
