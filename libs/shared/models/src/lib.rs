pub mod account;
pub mod error;
pub mod localized;

pub use account::*;
pub use error::AppError;
pub use localized::LocalizedText;
