pub mod database;
pub mod memory;
pub mod store;
pub mod transport;
