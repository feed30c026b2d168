pub mod consumer;
pub mod notification;
pub mod presence;
