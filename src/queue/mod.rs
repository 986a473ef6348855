pub mod buffer;
pub mod counter;
pub mod error;
pub mod fingerprint;
pub mod retry;

pub use buffer::BoundedBuffer;
pub use counter::AttemptCounterStore;
pub use error::{QueueError, Result};
pub use fingerprint::{Fingerprint, fingerprint};
pub use retry::RetryLimitQueue;
