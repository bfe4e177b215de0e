use chrono::Utc;

use crate::donations::{self, NewDonation};
use crate::errors::DomainError;
use crate::store::{MemoryStore, ProjectStore, UserStore};
use crate::types::{AuthContext, DonorRef, Project, ProjectStatus, Role, User};

const DONOR: &str = "u-donor";
const PROJECT: &str = "p-1";

fn user(id: &str, suspended: bool) -> User {
    let now = Utc::now();
    User {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        name: id.to_string(),
        role: Role::Donor,
        suspended,
        pending_token_migration: false,
        created_at: now,
        updated_at: now,
    }
}

fn setup() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.put_user(user(DONOR, false));
    store.put_user(user("u-suspended", true));
    let now = Utc::now();
    for (id, status) in [(PROJECT, ProjectStatus::Active), ("p-frozen", ProjectStatus::Frozen)] {
        store.put_project(Project {
            id: id.to_string(),
            owner_id: "u-owner".into(),
            name: format!("Project {id}"),
            description: String::new(),
            status,
            pledge: Default::default(),
            monthly_target: 0,
            alerts: None,
            created_at: now,
            updated_at: now,
        });
    }
    store
}

fn new_donation(donor: DonorRef, project_id: &str, amount: i64) -> NewDonation {
    NewDonation {
        project_id: project_id.to_string(),
        donor,
        amount,
        message: None,
    }
}

#[test]
fn test_record_stores_donation() {
    let mut store = setup();
    let donation = donations::record(
        &mut store,
        NewDonation {
            project_id: PROJECT.into(),
            donor: DonorRef::User(DONOR.into()),
            amount: 3_000,
            message: Some("keep it up".into()),
        },
    )
    .unwrap();
    assert_eq!(donation.amount, 3_000);
    assert_eq!(donation.message.as_deref(), Some("keep it up"));

    let auth = AuthContext::new(DONOR, Role::Donor);
    let listed = donations::list_for_donor(&store, &auth);
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, donation.id);
}

#[test]
fn test_record_accepts_anonymous_token() {
    let mut store = setup();
    let donation = donations::record(
        &mut store,
        new_donation(DonorRef::Token("tok-1".into()), PROJECT, 500),
    )
    .unwrap();
    assert_eq!(donation.donor, DonorRef::Token("tok-1".into()));
}

#[test]
fn test_record_rejects_suspended_account() {
    let mut store = setup();
    let err = donations::record(
        &mut store,
        new_donation(DonorRef::User("u-suspended".into()), PROJECT, 500),
    );
    assert_eq!(err, Err(DomainError::SuspendedAccount));
}

#[test]
fn test_record_rejects_frozen_project() {
    let mut store = setup();
    let err = donations::record(
        &mut store,
        new_donation(DonorRef::User(DONOR.into()), "p-frozen", 500),
    );
    assert_eq!(err, Err(DomainError::ProjectNotDonatable));
}

#[test]
fn test_record_rejects_nonpositive_amount() {
    let mut store = setup();
    let err = donations::record(
        &mut store,
        new_donation(DonorRef::User(DONOR.into()), PROJECT, 0),
    );
    assert!(matches!(err, Err(DomainError::Validation(_))));
}
