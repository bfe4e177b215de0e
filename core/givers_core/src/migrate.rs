//! Anonymous-to-account migration.
//!
//! A browser may record donations against a local anonymous token before
//! the donor ever authenticates. Migration attaches that history to the
//! account exactly once.
//!
//! Idempotence contract: the account's `pending_token_migration` flag is
//! the single authority. The first successful call reassigns every
//! token-attributed record (possibly zero), clears the flag, and reports
//! `already_migrated: false`; any later call reports
//! `{migrated_count: 0, already_migrated: true}` and touches nothing, so a
//! retried call can never double-count. Dismissing the migration prompt is
//! client-side session state and never clears the flag.

use serde::Serialize;

use crate::errors::{DomainError, Result};
use crate::store::{DonationStore, RecurringStore, UserStore};
use crate::types::{AuthContext, DonorRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationOutcome {
    pub migrated_count: u64,
    pub already_migrated: bool,
}

/// Reassign every donation and recurring donation recorded against `token`
/// to the calling account.
pub fn migrate_from_token<S>(
    store: &mut S,
    auth: &AuthContext,
    token: &str,
) -> Result<MigrationOutcome>
where
    S: UserStore + DonationStore + RecurringStore,
{
    if token.is_empty() {
        return Err(DomainError::Validation("donor token is required".into()));
    }
    let mut user = store
        .get_user(&auth.user_id)
        .ok_or_else(|| DomainError::NotFound("user", auth.user_id.clone()))?;
    if !user.pending_token_migration {
        return Ok(MigrationOutcome {
            migrated_count: 0,
            already_migrated: true,
        });
    }

    let from = DonorRef::Token(token.to_string());
    let to = DonorRef::User(auth.user_id.clone());
    let mut migrated = 0u64;

    for mut donation in store.donations_by_donor(&from) {
        donation.donor = to.clone();
        store.put_donation(donation);
        migrated += 1;
    }
    for mut donation in store.recurring_by_donor(&from) {
        donation.donor = to.clone();
        store.put_recurring(donation);
        migrated += 1;
    }

    user.pending_token_migration = false;
    store.put_user(user);

    Ok(MigrationOutcome {
        migrated_count: migrated,
        already_migrated: false,
    })
}
