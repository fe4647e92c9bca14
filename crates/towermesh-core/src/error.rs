//! Error types for Towermesh core

use thiserror::Error;

/// Top-level error type for core operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Call error: {0}")]
    Call(#[from] CallError),

    #[error("Pulse period must be non-zero")]
    ZeroPeriod,
}

/// Errors related to tower identity
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Tower name must not be empty")]
    EmptyName,

    #[error("Tower name too long: {len} bytes (max {max})")]
    NameTooLong { len: usize, max: usize },
}

/// Errors raised by the call envelope
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallError {
    /// The receiving mailbox is closed
    #[error("Mailbox closed")]
    MailboxClosed,

    /// The receiver dropped the envelope without replying
    #[error("Reply slot dropped before a response was sent")]
    NoReply,
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
