pub mod address;
pub mod amount;
pub mod classifier;
pub mod error;
pub mod network;
pub mod pool;
pub mod transaction;

pub use address::*;
pub use amount::*;
pub use classifier::*;
pub use error::*;
pub use network::*;
pub use pool::*;
pub use transaction::*;

/// Current unix time in seconds
pub fn current_timestamp() -> Timestamp {
    chrono::Utc::now().timestamp().max(0) as u64
}
