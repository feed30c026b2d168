pub mod events;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use events::{DomainEvent, EventPublisher};
pub use models::*;
pub use router::*;
pub use services::presence::{ClientConnection, PresenceRegistry};
