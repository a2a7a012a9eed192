use std::fmt;

/// Operation attempted in a lifecycle state that does not allow it.
///
/// These are caller contract violations. They are raised before anything is
/// sent to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    /// No live connection: `init` was never called, or `close` completed.
    NotConnected,
    /// `init` is still in flight.
    Connecting,
    /// `init` called while a connection is live or being established.
    AlreadyConnected,
    /// `close` called while an explicit transaction is open.
    TransactionActive,
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StateError::NotConnected => "The adapter has no live connection, call init first",
            StateError::Connecting => "The adapter connection is still being established",
            StateError::AlreadyConnected => "The adapter is already connected, close it first",
            StateError::TransactionActive => {
                "Cannot close the connection while a transaction is active, commit or rollback first"
            }
        })
    }
}

impl std::error::Error for StateError {}

/// Raw driver payload that cannot be turned into a well formed result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    DuplicateColumn(String),
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeError::RowWidth {
                row,
                expected,
                found,
            } => write!(
                f,
                "Row {row} has {found} values but the result declares {expected} columns"
            ),
            ShapeError::DuplicateColumn(name) => {
                write!(
                    f,
                    "Column `{name}` is declared more than once in the result, alias the columns to distinct names"
                )
            }
        }
    }
}

impl std::error::Error for ShapeError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    /// The driver released the completion callback without calling it.
    CallbackDropped,
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::CallbackDropped => {
                f.write_str("The driver dropped the completion callback without invoking it")
            }
        }
    }
}

impl std::error::Error for BridgeError {}
