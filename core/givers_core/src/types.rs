//! # Types
//!
//! Shared data structures used across all modules of the funding core.
//!
//! ## Design decisions
//!
//! ### Pledge configuration / cached target split
//!
//! A project's funding need is declared through [`PledgeConfig`] — a flat
//! owner-stated monthly amount, an itemized cost list, or both. The derived
//! [`Project::monthly_target`] field is a **cache** of
//! [`crate::target::resolve_monthly_target`], rewritten on every pledge
//! edit; it is never a second source of truth.
//!
//! ### Status as a finite-state machine
//!
//! [`RecurringStatus`] enforces the subscription lifecycle:
//!
//! ```text
//! Active ⇄ Paused
//! Active | Paused ──► Cancelled ──► Deleted
//! Active | Paused ──────────────► Deleted
//! ```
//!
//! `Cancelled` stays visible in the donor's history with a marker; `Deleted`
//! disappears from every listing and aggregate. Both are terminal with
//! respect to amount/interval edits.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, Result};
use crate::target::resolve_monthly_target;

/// Amount in the platform currency's smallest unit (JPY carries no minor unit).
pub type Money = i64;

// ─────────────────────────────────────────────────────────
// Pledge configuration
// ─────────────────────────────────────────────────────────

/// One line in a project's itemized cost estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostItem {
    pub label: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl CostItem {
    /// Monthly cost contributed by this line.
    pub fn monthly(&self) -> Money {
        self.unit_price * self.quantity as Money
    }

    /// An unfilled form row: no label and no price. Dropped before summing.
    pub fn is_blank(&self) -> bool {
        self.label.trim().is_empty() && self.unit_price == 0
    }

    pub fn validate(&self) -> Result<()> {
        if self.unit_price < 0 {
            return Err(DomainError::InvalidCostItem(format!(
                "negative unit price for {:?}",
                self.label
            )));
        }
        Ok(())
    }
}

/// A project's funding-need declaration: a flat owner-stated amount, an
/// itemized cost list, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PledgeConfig {
    pub owner_want_monthly: Option<Money>,
    #[serde(default)]
    pub cost_items: Vec<CostItem>,
}

impl PledgeConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(want) = self.owner_want_monthly {
            if want < 0 {
                return Err(DomainError::Validation(
                    "owner_want_monthly must not be negative".into(),
                ));
            }
        }
        for item in &self.cost_items {
            item.validate()?;
        }
        Ok(())
    }
}

/// Owner-configurable achievement thresholds, both in whole percent.
///
/// `critical_threshold < warning_threshold` is enforced at construction so
/// the three bands below "reached" stay ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAlerts {
    pub warning_threshold: u8,
    pub critical_threshold: u8,
}

impl ProjectAlerts {
    pub fn new(warning_threshold: u8, critical_threshold: u8) -> Result<Self> {
        let alerts = ProjectAlerts {
            warning_threshold,
            critical_threshold,
        };
        alerts.validate()?;
        Ok(alerts)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("warning_threshold", self.warning_threshold),
            ("critical_threshold", self.critical_threshold),
        ] {
            if !(1..=100).contains(&value) {
                return Err(DomainError::Validation(format!(
                    "{name} must be between 1 and 100, got {value}"
                )));
            }
        }
        if self.critical_threshold >= self.warning_threshold {
            return Err(DomainError::Validation(format!(
                "critical_threshold ({}) must be below warning_threshold ({})",
                self.critical_threshold, self.warning_threshold
            )));
        }
        Ok(())
    }
}

impl Default for ProjectAlerts {
    fn default() -> Self {
        ProjectAlerts {
            warning_threshold: 60,
            critical_threshold: 30,
        }
    }
}

// ─────────────────────────────────────────────────────────
// Project
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Accepting donations.
    Active,
    /// Temporarily closed by the owner; existing subscriptions keep running.
    Frozen,
    /// Logically removed; invisible to donors.
    Deleted,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Frozen => "frozen",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(Self::Active),
            "frozen" => Ok(Self::Frozen),
            "deleted" => Ok(Self::Deleted),
            _ => Err(DomainError::Validation(format!(
                "unknown project status: {s}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    #[serde(flatten)]
    pub pledge: PledgeConfig,
    /// Cached output of [`resolve_monthly_target`] over [`Self::pledge`].
    pub monthly_target: Money,
    pub alerts: Option<ProjectAlerts>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn is_donatable(&self) -> bool {
        matches!(self.status, ProjectStatus::Active)
    }

    pub fn alerts_or_default(&self) -> ProjectAlerts {
        self.alerts.unwrap_or_default()
    }

    /// Recompute the cached monthly target from the current pledge inputs.
    /// Must be called by every pledge write before the project is persisted.
    pub fn refresh_monthly_target(&mut self) {
        self.monthly_target = resolve_monthly_target(&self.pledge);
    }

    pub fn validate(&self) -> Result<()> {
        self.pledge.validate()?;
        if let Some(alerts) = &self.alerts {
            alerts.validate()?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────
// Donations
// ─────────────────────────────────────────────────────────

/// Who a donation is attributed to: an authenticated account or a
/// browser-local anonymous token awaiting migration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "donor_type", content = "donor_id", rename_all = "snake_case")]
pub enum DonorRef {
    User(String),
    Token(String),
}

impl DonorRef {
    pub fn is_user(&self, user_id: &str) -> bool {
        matches!(self, DonorRef::User(id) if id == user_id)
    }
}

/// A one-time donation. Immutable once created, except for the one-shot
/// anonymous-token reassignment performed by migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donation {
    pub id: String,
    pub project_id: String,
    #[serde(flatten)]
    pub donor: DonorRef,
    pub amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    Monthly,
    Yearly,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(DomainError::Validation(format!("unknown interval: {s}"))),
        }
    }
}

/// Lifecycle status of a recurring donation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurringStatus {
    /// Counted toward the project's current monthly total.
    Active,
    /// Kept but not counted; the donor may resume at any time.
    Paused,
    /// Terminal; visible in history with a cancelled marker.
    Cancelled,
    /// Terminal; removed from every listing and aggregate.
    Deleted,
}

impl RecurringStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for RecurringStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecurringStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "cancelled" => Ok(Self::Cancelled),
            "deleted" => Ok(Self::Deleted),
            _ => Err(DomainError::Validation(format!(
                "unknown recurring status: {s}"
            ))),
        }
    }
}

/// A subscription-like pledge, owned and mutated only by its donor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringDonation {
    pub id: String,
    pub project_id: String,
    #[serde(flatten)]
    pub donor: DonorRef,
    pub amount: Money,
    pub interval: Interval,
    pub status: RecurringStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────
// Users and authorization
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Host,
    ProjectOwner,
    Donor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::ProjectOwner => "project_owner",
            Self::Donor => "donor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "host" => Ok(Self::Host),
            "project_owner" => Ok(Self::ProjectOwner),
            "donor" => Ok(Self::Donor),
            _ => Err(DomainError::Validation(format!("unknown role: {s}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Blocks creation of new donations, subscriptions, and projects.
    /// Read access and already-running subscriptions are unaffected.
    pub suspended: bool,
    /// Set while anonymous-token donations exist that have not been linked
    /// to this account; cleared exactly once by migration.
    pub pending_token_migration: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity of the caller, resolved by the session layer and passed
/// explicitly to every gated operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: String,
    pub role: Role,
}

impl AuthContext {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        AuthContext {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn is_host(&self) -> bool {
        matches!(self.role, Role::Host)
    }
}
