pub mod billing;
pub mod lifecycle;
pub mod mailer;
