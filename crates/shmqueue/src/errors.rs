use crate::semaphore::SemaphoreError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Shared memory error: {0}")]
    RegionError(#[from] nix::errno::Errno),

    #[error("Semaphore error: {0}")]
    SemaphoreError(#[from] SemaphoreError),

    #[error("{name} not found (is the producer running?)")]
    NotFound { name: String },

    #[error("Invalid IPC name: {0}")]
    InvalidName(String),

    #[error("Region {name} has size {actual} bytes, expected {expected}")]
    SizeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Layout mismatch on {field}: expected {expected}, found {actual}")]
    LayoutMismatch {
        field: &'static str,
        expected: u32,
        actual: u32,
    },

    #[error("Control block {field} is {value}, out of range for {capacity} slots")]
    CorruptControl {
        field: &'static str,
        value: u32,
        capacity: u32,
    },

    #[error("Invalid queue geometry: {0}")]
    InvalidGeometry(String),

    #[error("Frame is {actual:?} (w, h, c) but the queue carries {expected:?}")]
    GeometryMismatch {
        expected: (u32, u32, u32),
        actual: (u32, u32, u32),
    },

    #[error("Payload is {actual} bytes, slot payload is {expected} bytes")]
    PayloadSizeMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, QueueError>;
