//! Batched execution: slot-partitioned buffers and the worker pool

pub mod buffer;
pub mod coordinator;

pub use buffer::SlotBuffer;
pub use coordinator::{BatchBuffers, BatchCoordinator};
