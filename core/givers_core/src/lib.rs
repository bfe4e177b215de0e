//! # GIVErS funding core
//!
//! Domain model of the GIVErS donation platform: the rules that turn a
//! project's pledge configuration into one canonical monthly target, the
//! achievement and health signals derived from it, and the lifecycle of
//! recurring donations — including the one-shot linking of anonymous-token
//! history to an account and the host-only disclosure export.
//!
//! | Concern    | Entry point(s)                                          |
//! |------------|---------------------------------------------------------|
//! | Target     | [`target::resolve_monthly_target`]                      |
//! | Health     | [`achievement::evaluate`], [`achievement::evaluate_for_project`] |
//! | Lifecycle  | [`recurring::create`] / `pause` / `resume` / `cancel` / `delete` / `update` |
//! | One-time   | [`donations::record`]                                   |
//! | Migration  | [`migrate::migrate_from_token`]                         |
//! | Disclosure | [`disclosure::export_disclosure`]                       |
//!
//! ## Architecture
//!
//! Every gated operation takes an explicit [`AuthContext`] and is injected
//! with the per-entity store traits from [`store`]; nothing reads
//! process-wide state. [`store::MemoryStore`] backs the test suite and
//! embedders without durable persistence; the
//! HTTP service implements the same operations over SQLite, applying each
//! transition in a single transaction.

pub mod achievement;
pub mod disclosure;
pub mod donations;
pub mod errors;
pub mod migrate;
pub mod recurring;
pub mod store;
pub mod target;
pub mod types;

#[cfg(test)]
mod test_donations;
#[cfg(test)]
mod test_recurring;
#[cfg(test)]
mod test_target;

pub use achievement::{Achievement, HealthSignal};
pub use errors::{DomainError, Result};
pub use migrate::MigrationOutcome;
pub use recurring::YearlyNormalization;
pub use types::{
    AuthContext, CostItem, Donation, DonorRef, Interval, Money, PledgeConfig, Project,
    ProjectAlerts, ProjectStatus, RecurringDonation, RecurringStatus, Role, User,
};

/// Platform name stamped into disclosure bundles.
pub const PLATFORM: &str = "GIVErS";
