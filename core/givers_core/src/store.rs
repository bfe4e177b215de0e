//! # Storage
//!
//! Per-entity store traits injected into every operation, plus the
//! in-memory [`MemoryStore`] implementation.
//!
//! | Trait            | Entity              | Extra lookups                  |
//! |------------------|---------------------|--------------------------------|
//! | [`UserStore`]      | [`User`]              | —                              |
//! | [`ProjectStore`]   | [`Project`]           | by owner                       |
//! | [`RecurringStore`] | [`RecurringDonation`] | by project, by donor           |
//! | [`DonationStore`]  | [`Donation`]          | by project, by donor           |
//!
//! The traits are deliberately dumb `get`/`put`/`delete` maps: visibility
//! rules (deleted records, cancelled markers) live in the operations, not
//! in the storage layer. Listing methods return records ordered by
//! `created_at` then id so downstream output is deterministic.
//!
//! Callers that need durability implement these over a database and wrap
//! each operation in a transaction; [`MemoryStore`] applies every operation
//! on `&mut self`, which is atomic for its single-writer use.

use std::collections::HashMap;

use crate::types::{Donation, DonorRef, Project, RecurringDonation, User};

pub trait UserStore {
    fn get_user(&self, id: &str) -> Option<User>;
    fn put_user(&mut self, user: User);
    fn delete_user(&mut self, id: &str);
}

pub trait ProjectStore {
    fn get_project(&self, id: &str) -> Option<Project>;
    fn put_project(&mut self, project: Project);
    fn delete_project(&mut self, id: &str);
    fn projects_by_owner(&self, owner_id: &str) -> Vec<Project>;
}

pub trait RecurringStore {
    fn get_recurring(&self, id: &str) -> Option<RecurringDonation>;
    fn put_recurring(&mut self, donation: RecurringDonation);
    fn delete_recurring(&mut self, id: &str);
    fn recurring_by_project(&self, project_id: &str) -> Vec<RecurringDonation>;
    fn recurring_by_donor(&self, donor: &DonorRef) -> Vec<RecurringDonation>;
}

pub trait DonationStore {
    fn get_donation(&self, id: &str) -> Option<Donation>;
    fn put_donation(&mut self, donation: Donation);
    fn delete_donation(&mut self, id: &str);
    fn donations_by_project(&self, project_id: &str) -> Vec<Donation>;
    fn donations_by_donor(&self, donor: &DonorRef) -> Vec<Donation>;
}

/// In-memory implementation of all four store traits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: HashMap<String, User>,
    projects: HashMap<String, Project>,
    recurring: HashMap<String, RecurringDonation>,
    donations: HashMap<String, Donation>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for MemoryStore {
    fn get_user(&self, id: &str) -> Option<User> {
        self.users.get(id).cloned()
    }

    fn put_user(&mut self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    fn delete_user(&mut self, id: &str) {
        self.users.remove(id);
    }
}

impl ProjectStore for MemoryStore {
    fn get_project(&self, id: &str) -> Option<Project> {
        self.projects.get(id).cloned()
    }

    fn put_project(&mut self, project: Project) {
        self.projects.insert(project.id.clone(), project);
    }

    fn delete_project(&mut self, id: &str) {
        self.projects.remove(id);
    }

    fn projects_by_owner(&self, owner_id: &str) -> Vec<Project> {
        let mut list: Vec<Project> = self
            .projects
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        list
    }
}

impl RecurringStore for MemoryStore {
    fn get_recurring(&self, id: &str) -> Option<RecurringDonation> {
        self.recurring.get(id).cloned()
    }

    fn put_recurring(&mut self, donation: RecurringDonation) {
        self.recurring.insert(donation.id.clone(), donation);
    }

    fn delete_recurring(&mut self, id: &str) {
        self.recurring.remove(id);
    }

    fn recurring_by_project(&self, project_id: &str) -> Vec<RecurringDonation> {
        let mut list: Vec<RecurringDonation> = self
            .recurring
            .values()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        list
    }

    fn recurring_by_donor(&self, donor: &DonorRef) -> Vec<RecurringDonation> {
        let mut list: Vec<RecurringDonation> = self
            .recurring
            .values()
            .filter(|r| &r.donor == donor)
            .cloned()
            .collect();
        list.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        list
    }
}

impl DonationStore for MemoryStore {
    fn get_donation(&self, id: &str) -> Option<Donation> {
        self.donations.get(id).cloned()
    }

    fn put_donation(&mut self, donation: Donation) {
        self.donations.insert(donation.id.clone(), donation);
    }

    fn delete_donation(&mut self, id: &str) {
        self.donations.remove(id);
    }

    fn donations_by_project(&self, project_id: &str) -> Vec<Donation> {
        let mut list: Vec<Donation> = self
            .donations
            .values()
            .filter(|d| d.project_id == project_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        list
    }

    fn donations_by_donor(&self, donor: &DonorRef) -> Vec<Donation> {
        let mut list: Vec<Donation> = self
            .donations
            .values()
            .filter(|d| &d.donor == donor)
            .cloned()
            .collect();
        list.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        list
    }
}
