pub mod codec;
pub mod config;
pub mod errors;
pub mod layout;
pub mod lock;
pub mod names;
pub mod queue;
pub mod region;
pub mod semaphore;
pub mod types;

#[cfg(feature = "producer")]
pub mod publisher;
#[cfg(feature = "consumer")]
pub mod reader;

pub use config::QueueConfig;
pub use errors::{QueueError, Result};
pub use layout::QueueGeometry;
pub use names::QueueNames;
pub use queue::{Role, SharedQueue};
pub use semaphore::SemaphoreError;
pub use types::{Detection, Frame, FrameView, QueueStatus};

#[cfg(feature = "producer")]
pub use publisher::SlotPublisher;
#[cfg(feature = "consumer")]
pub use reader::SlotReader;
