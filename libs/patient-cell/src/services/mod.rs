pub mod identity;
pub mod records;
