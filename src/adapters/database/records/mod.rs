pub mod message;
pub mod receipt;

pub use message::MessageRecord;
pub use receipt::ReceiptRecord;
