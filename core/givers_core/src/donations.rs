//! One-time donation records.
//!
//! Records enter the system once the external checkout reports a settled
//! payment; they are immutable afterwards, except for the one-shot
//! anonymous-token reassignment in [`crate::migrate`].

use chrono::Utc;
use uuid::Uuid;

use crate::errors::{DomainError, Result};
use crate::store::{DonationStore, ProjectStore, UserStore};
use crate::types::{AuthContext, Donation, DonorRef, Money};

pub struct NewDonation {
    pub project_id: String,
    pub donor: DonorRef,
    pub amount: Money,
    pub message: Option<String>,
}

/// Record a settled one-time donation.
pub fn record<S>(store: &mut S, input: NewDonation) -> Result<Donation>
where
    S: UserStore + ProjectStore + DonationStore,
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

    let donation = Donation {
        id: Uuid::new_v4().to_string(),
        project_id: input.project_id,
        donor: input.donor,
        amount: input.amount,
        message: input.message,
        created_at: Utc::now(),
    };
    store.put_donation(donation.clone());
    Ok(donation)
}

/// The caller's one-time donations, newest first.
pub fn list_for_donor<S: DonationStore>(store: &S, auth: &AuthContext) -> Vec<Donation> {
    let mut list = store.donations_by_donor(&DonorRef::User(auth.user_id.clone()));
    list.reverse();
    list
}
