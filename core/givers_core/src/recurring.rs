//! Recurring donation state machine.
//!
//! Transitions are methods on [`RecurringDonation`] so every caller — the
//! HTTP service, the in-memory store operations, tests — shares one set of
//! rules. The operations in the second half of this module wrap the
//! transitions with ownership checks and store access.
//!
//! `pause` and `resume` are explicit idempotent commands rather than a
//! single toggle: repeating one on a donation already in the requested
//! state is a no-op success, so a client acting on a stale label cannot
//! flip the subscription the wrong way.

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::{DomainError, Result};
use crate::store::{ProjectStore, RecurringStore, UserStore};
use crate::types::{
    AuthContext, DonorRef, Interval, Money, RecurringDonation, RecurringStatus,
};

/// How a yearly-interval amount counts toward the monthly total.
///
/// Sample data carries no yearly pledges, so the equivalence is a policy
/// choice rather than observed behavior; hosts pick one via configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YearlyNormalization {
    /// One twelfth per month, fractions of a unit truncated.
    #[default]
    DivideBy12,
    /// The full yearly amount counts toward each month.
    FaceValue,
}

// ─────────────────────────────────────────────────────────
// Transitions
// ─────────────────────────────────────────────────────────

impl RecurringDonation {
    /// `Active → Paused`. Pausing an already-paused donation is a no-op
    /// success. Returns whether the state changed.
    pub fn pause(&mut self) -> Result<bool> {
        match self.status {
            RecurringStatus::Active => {
                self.status = RecurringStatus::Paused;
                Ok(true)
            }
            RecurringStatus::Paused => Ok(false),
            status => Err(DomainError::InvalidState(status)),
        }
    }

    /// `Paused → Active`. Resuming an already-active donation is a no-op
    /// success. Returns whether the state changed.
    pub fn resume(&mut self) -> Result<bool> {
        match self.status {
            RecurringStatus::Paused => {
                self.status = RecurringStatus::Active;
                Ok(true)
            }
            RecurringStatus::Active => Ok(false),
            status => Err(DomainError::InvalidState(status)),
        }
    }

    /// `Active | Paused → Cancelled`. Terminal; the record stays visible in
    /// the donor's history with a cancelled marker.
    pub fn cancel(&mut self) -> Result<bool> {
        match self.status {
            RecurringStatus::Active | RecurringStatus::Paused => {
                self.status = RecurringStatus::Cancelled;
                Ok(true)
            }
            RecurringStatus::Cancelled => Ok(false),
            status => Err(DomainError::InvalidState(status)),
        }
    }

    /// `Active | Paused | Cancelled → Deleted`. Terminal; the record leaves
    /// every listing and aggregate. Applying the whole transition in one
    /// write also aborts any edit in flight.
    pub fn delete(&mut self) -> Result<()> {
        match self.status {
            RecurringStatus::Active | RecurringStatus::Paused | RecurringStatus::Cancelled => {
                self.status = RecurringStatus::Deleted;
                Ok(())
            }
            status => Err(DomainError::InvalidState(status)),
        }
    }

    /// Amount/interval edit, valid only from `Active` or `Paused`.
    /// Validates the whole patch before touching either field so a rejected
    /// edit leaves the record untouched.
    pub fn apply_patch(&mut self, patch: &RecurringPatch) -> Result<()> {
        match self.status {
            RecurringStatus::Active | RecurringStatus::Paused => {}
            status => return Err(DomainError::InvalidState(status)),
        }
        if let Some(amount) = patch.amount {
            if amount <= 0 {
                return Err(DomainError::Validation(
                    "amount must be positive".into(),
                ));
            }
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(interval) = patch.interval {
            self.interval = interval;
        }
        Ok(())
    }

    /// This donation's contribution to a monthly total, before any status
    /// filtering.
    pub fn monthly_equivalent(&self, normalization: YearlyNormalization) -> Money {
        match (self.interval, normalization) {
            (Interval::Monthly, _) => self.amount,
            (Interval::Yearly, YearlyNormalization::DivideBy12) => self.amount / 12,
            (Interval::Yearly, YearlyNormalization::FaceValue) => self.amount,
        }
    }
}

/// Sum of the monthly equivalents of all `Active` donations. Paused
/// donations count toward nothing, matching the "paused" badge semantics:
/// the donation is shown but not currently collected.
pub fn current_monthly_total<'a, I>(donations: I, normalization: YearlyNormalization) -> Money
where
    I: IntoIterator<Item = &'a RecurringDonation>,
{
    donations
        .into_iter()
        .filter(|r| r.status == RecurringStatus::Active)
        .map(|r| r.monthly_equivalent(normalization))
        .sum()
}

// ─────────────────────────────────────────────────────────
// Operations
// ─────────────────────────────────────────────────────────

pub struct NewRecurring {
    pub project_id: String,
    pub donor: DonorRef,
    pub amount: Money,
    pub interval: Interval,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RecurringPatch {
    pub amount: Option<Money>,
    pub interval: Option<Interval>,
}

/// Record a new recurring donation once its first payment succeeded.
///
/// User-attributed donations are gated on the account: unknown accounts are
/// `NotFound`, suspended accounts are rejected. Token-attributed donations
/// carry no account to check.
pub fn create<S>(store: &mut S, input: NewRecurring) -> Result<RecurringDonation>
where
    S: UserStore + ProjectStore + RecurringStore,
{
    if input.amount <= 0 {
        return Err(DomainError::Validation("amount must be positive".into()));
    }
    if let DonorRef::User(user_id) = &input.donor {
        let user = store
            .get_user(user_id)
            .ok_or_else(|| DomainError::NotFound("user", user_id.clone()))?;
        if user.suspended {
            return Err(DomainError::SuspendedAccount);
        }
    }
    let project = store
        .get_project(&input.project_id)
        .ok_or_else(|| DomainError::NotFound("project", input.project_id.clone()))?;
    if !project.is_donatable() {
        return Err(DomainError::ProjectNotDonatable);
    }

    let now = Utc::now();
    let donation = RecurringDonation {
        id: Uuid::new_v4().to_string(),
        project_id: input.project_id,
        donor: input.donor,
        amount: input.amount,
        interval: input.interval,
        status: RecurringStatus::Active,
        created_at: now,
        updated_at: now,
    };
    store.put_recurring(donation.clone());
    Ok(donation)
}

pub fn pause<S: RecurringStore>(store: &mut S, auth: &AuthContext, id: &str) -> Result<bool> {
    let mut donation = load_owned(store, auth, id)?;
    let changed = donation.pause()?;
    if changed {
        donation.updated_at = Utc::now();
        store.put_recurring(donation);
    }
    Ok(changed)
}

pub fn resume<S: RecurringStore>(store: &mut S, auth: &AuthContext, id: &str) -> Result<bool> {
    let mut donation = load_owned(store, auth, id)?;
    let changed = donation.resume()?;
    if changed {
        donation.updated_at = Utc::now();
        store.put_recurring(donation);
    }
    Ok(changed)
}

pub fn cancel<S: RecurringStore>(store: &mut S, auth: &AuthContext, id: &str) -> Result<bool> {
    let mut donation = load_owned(store, auth, id)?;
    let changed = donation.cancel()?;
    if changed {
        donation.updated_at = Utc::now();
        store.put_recurring(donation);
    }
    Ok(changed)
}

pub fn delete<S: RecurringStore>(store: &mut S, auth: &AuthContext, id: &str) -> Result<()> {
    let mut donation = load_owned(store, auth, id)?;
    donation.delete()?;
    donation.updated_at = Utc::now();
    store.put_recurring(donation);
    Ok(())
}

pub fn update<S: RecurringStore>(
    store: &mut S,
    auth: &AuthContext,
    id: &str,
    patch: RecurringPatch,
) -> Result<RecurringDonation> {
    let mut donation = load_owned(store, auth, id)?;
    donation.apply_patch(&patch)?;
    donation.updated_at = Utc::now();
    store.put_recurring(donation.clone());
    Ok(donation)
}

/// The caller's recurring donations, newest first. Cancelled records stay
/// visible with their status marker; deleted records are absent.
pub fn list_for_donor<S: RecurringStore>(
    store: &S,
    auth: &AuthContext,
) -> Vec<RecurringDonation> {
    let mut list = store.recurring_by_donor(&DonorRef::User(auth.user_id.clone()));
    list.retain(|r| r.status != RecurringStatus::Deleted);
    list.reverse();
    list
}

/// Live monthly total for a project.
pub fn project_monthly_total<S: RecurringStore>(
    store: &S,
    project_id: &str,
    normalization: YearlyNormalization,
) -> Money {
    current_monthly_total(
        store.recurring_by_project(project_id).iter(),
        normalization,
    )
}

fn load_owned<S: RecurringStore>(
    store: &S,
    auth: &AuthContext,
    id: &str,
) -> Result<RecurringDonation> {
    let donation = store
        .get_recurring(id)
        .ok_or_else(|| DomainError::NotFound("recurring donation", id.to_string()))?;
    if !donation.donor.is_user(&auth.user_id) {
        return Err(DomainError::Forbidden);
    }
    Ok(donation)
}
