pub mod attendee_service;
pub use attendee_service::AttendeeService;
pub mod capability;
pub use capability::{CapabilityChecker, EventOwnerCapabilities, StaticCapabilities};
pub mod checkin_service;
pub use checkin_service::CheckinService;
pub mod provider_service;
pub use provider_service::ProviderService;
pub mod sales_engine;
pub use sales_engine::SalesEngine;
pub mod status_options;
pub use status_options::StatusOptions;
pub mod stock_resolver;
pub mod ticket_cache;
pub use ticket_cache::{CacheSignal, MemoryTicketCache, TicketCache};
pub mod ticket_service;
pub use ticket_service::{TicketEditor, TicketService};
