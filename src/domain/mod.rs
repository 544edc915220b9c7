pub mod message;
pub mod receipt;
