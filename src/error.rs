use std::io;

use crate::types::Protocol;

/// The error type for connection collection.
///
/// Every failure below the CLI boundary surfaces as one of these variants and
/// aborts the collection call that raised it.
#[derive(thiserror::Error, Debug)]
pub enum CollectionError {
    /// The OS refused or failed the table query
    #[error("[ {table} Collect Error] {message}")]
    QueryFailed {
        table: Protocol,
        code: i32,
        message: String,
    },

    /// The process owning a connection could not be located
    #[error("No process found with given PID: {pid}")]
    ProcessNotFound { pid: u32 },

    /// The process enumeration facility could not be opened
    #[error("Can not get a process snapshot: {reason}")]
    SnapshotUnavailable { reason: String },

    /// The OS returned fewer bytes than its own row count requires
    #[error("[ {table} Collect Error] table declares {expected} bytes of rows but only {actual} were returned")]
    TruncatedTable {
        table: Protocol,
        expected: usize,
        actual: usize,
    },
}

impl CollectionError {
    /// Create a query failure from a raw OS status code.
    ///
    /// The message is the operating system's own text for `code`.
    pub fn query_failed(table: Protocol, code: i32) -> Self {
        Self::QueryFailed {
            table,
            code,
            message: io::Error::from_raw_os_error(code).to_string(),
        }
    }

    /// Create a query failure from an I/O error raised while reading a table
    pub fn query_io(table: Protocol, err: &io::Error) -> Self {
        Self::QueryFailed {
            table,
            code: err.raw_os_error().unwrap_or(-1),
            message: err.to_string(),
        }
    }

    /// Create a new process not found error
    pub const fn process_not_found(pid: u32) -> Self {
        Self::ProcessNotFound { pid }
    }

    /// Create a new snapshot unavailable error
    pub fn snapshot_unavailable(reason: impl Into<String>) -> Self {
        Self::SnapshotUnavailable {
            reason: reason.into(),
        }
    }

    /// The table being collected when the error occurred, if the error is tied to one
    pub const fn table(&self) -> Option<Protocol> {
        match self {
            Self::QueryFailed { table, .. } | Self::TruncatedTable { table, .. } => Some(*table),
            Self::ProcessNotFound { .. } | Self::SnapshotUnavailable { .. } => None,
        }
    }
}

/// A specialized `Result` type for connection collection.
pub type Result<T> = std::result::Result<T, CollectionError>;
