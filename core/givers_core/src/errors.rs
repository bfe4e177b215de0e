//! Domain error taxonomy.
//!
//! Every variant is recoverable by the caller: the UI surfaces the message
//! and lets the user correct input or retry. None is fatal to the process.

use thiserror::Error;

use crate::types::RecurringStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Bad amount, threshold, or other field-level input problem.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A cost line with a negative unit price.
    #[error("invalid cost item: {0}")]
    InvalidCostItem(String),

    /// The account may read but not create donations, subscriptions, or projects.
    #[error("account is suspended")]
    SuspendedAccount,

    /// The project is frozen or deleted and accepts no new donations.
    #[error("project is not accepting donations")]
    ProjectNotDonatable,

    /// The requested transition is not allowed from the current state.
    #[error("operation not allowed on a {0} recurring donation")]
    InvalidState(RecurringStatus),

    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    #[error("forbidden")]
    Forbidden,
}

pub type Result<T> = std::result::Result<T, DomainError>;
