//! Error types for shared state operations

use thiserror::Error;

/// Errors that can occur while creating, locking or persisting the shared state
#[derive(Error, Debug)]
pub enum ShmError {
    /// Mapped segment size does not match the compiled layout
    #[error("Segment layout mismatch: expected {expected} bytes, found {actual}")]
    LayoutMismatch {
        /// Size of the compiled layout
        expected: usize,
        /// Size of the file on disk
        actual: u64,
    },

    /// Memory alignment error
    #[error("Memory alignment error: address {address:#x} not aligned to {alignment}")]
    AlignmentError {
        /// Memory address
        address: usize,
        /// Required alignment
        alignment: usize,
    },

    /// A pthread call on the shared mutex failed
    #[error("Shared lock operation failed with errno {code}")]
    LockFailed {
        /// errno-style return code
        code: i32,
    },

    /// A previous owner died and the mutex was never made consistent again
    #[error("Shared lock is unrecoverable")]
    LockUnrecoverable,

    /// Fixed-capacity table is full
    #[error("{table} table full (capacity {capacity})")]
    CapacityExceeded {
        /// Table name
        table: &'static str,
        /// Fixed capacity
        capacity: usize,
    },

    /// Snapshot file is not a valid image of the shared state
    #[error("Corrupt snapshot: {reason}")]
    CorruptSnapshot {
        /// What failed validation
        reason: String,
    },

    /// IO error
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },

    /// Nix system call error
    #[error("System call error: {source}")]
    Nix {
        /// Source nix error
        #[from]
        source: nix::Error,
    },
}

/// Result type for shared state operations
pub type ShmResult<T> = Result<T, ShmError>;
