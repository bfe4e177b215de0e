//! Disclosure export assembler.
//!
//! Privileged read-only aggregation of a user's or project's financial
//! history into one JSON-serializable bundle, for legal/administrative
//! disclosure requests. Consumes data owned by the other components and
//! writes nothing.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::{DomainError, Result};
use crate::store::{DonationStore, ProjectStore, RecurringStore, UserStore};
use crate::types::{
    AuthContext, Donation, Project, RecurringDonation, RecurringStatus, User,
};
use crate::PLATFORM;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisclosureSubject {
    User,
    Project,
}

impl FromStr for DisclosureSubject {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Self::User),
            "project" => Ok(Self::Project),
            _ => Err(DomainError::Validation(format!(
                "unknown disclosure subject: {s}"
            ))),
        }
    }
}

/// One exportable snapshot. Deterministic given the same underlying state
/// and `exported_at`: lists come out of the stores ordered by creation
/// time, then id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DisclosureBundle {
    User {
        exported_at: DateTime<Utc>,
        platform: &'static str,
        user: User,
        user_projects: Vec<Project>,
        user_donations: Vec<Donation>,
        user_recurring: Vec<RecurringDonation>,
    },
    Project {
        exported_at: DateTime<Utc>,
        platform: &'static str,
        project: Project,
        project_donations: Vec<Donation>,
        project_recurring: Vec<RecurringDonation>,
    },
}

/// Assemble the disclosure bundle for a user or project.
///
/// Host-only: the session layer resolves the caller, this checks the role.
/// Recurring history includes cancelled and paused records but never
/// deleted ones — deleted subscriptions are invisible everywhere.
pub fn export_disclosure<S>(
    store: &S,
    auth: &AuthContext,
    subject: DisclosureSubject,
    id: &str,
    exported_at: DateTime<Utc>,
) -> Result<DisclosureBundle>
where
    S: UserStore + ProjectStore + DonationStore + RecurringStore,
{
    if !auth.is_host() {
        return Err(DomainError::Forbidden);
    }

    match subject {
        DisclosureSubject::User => {
            let user = store
                .get_user(id)
                .ok_or_else(|| DomainError::NotFound("user", id.to_string()))?;
            let donor = crate::types::DonorRef::User(id.to_string());
            Ok(DisclosureBundle::User {
                exported_at,
                platform: PLATFORM,
                user,
                user_projects: store.projects_by_owner(id),
                user_donations: store.donations_by_donor(&donor),
                user_recurring: visible(store.recurring_by_donor(&donor)),
            })
        }
        DisclosureSubject::Project => {
            let project = store
                .get_project(id)
                .ok_or_else(|| DomainError::NotFound("project", id.to_string()))?;
            Ok(DisclosureBundle::Project {
                exported_at,
                platform: PLATFORM,
                project,
                project_donations: store.donations_by_project(id),
                project_recurring: visible(store.recurring_by_project(id)),
            })
        }
    }
}

fn visible(mut list: Vec<RecurringDonation>) -> Vec<RecurringDonation> {
    list.retain(|r| r.status != RecurringStatus::Deleted);
    list
}
