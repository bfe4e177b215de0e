use chrono::Utc;

use crate::errors::DomainError;
use crate::invariants;
use crate::recurring::{self, NewRecurring, RecurringPatch, YearlyNormalization};
use crate::store::{MemoryStore, ProjectStore, RecurringStore, UserStore};
use crate::types::{
    AuthContext, DonorRef, Interval, Project, ProjectStatus, RecurringStatus, Role, User,
};

const DONOR: &str = "u-donor";
const OTHER: &str = "u-other";
const SUSPENDED: &str = "u-suspended";
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

fn project(id: &str, status: ProjectStatus) -> Project {
    let now = Utc::now();
    Project {
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
    }
}

fn setup() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.put_user(user(DONOR, false));
    store.put_user(user(OTHER, false));
    store.put_user(user(SUSPENDED, true));
    store.put_project(project(PROJECT, ProjectStatus::Active));
    store.put_project(project("p-frozen", ProjectStatus::Frozen));
    store.put_project(project("p-deleted", ProjectStatus::Deleted));
    store
}

fn donor_auth() -> AuthContext {
    AuthContext::new(DONOR, Role::Donor)
}

fn new_recurring(user_id: &str, project_id: &str, amount: i64) -> NewRecurring {
    NewRecurring {
        project_id: project_id.to_string(),
        donor: DonorRef::User(user_id.to_string()),
        amount,
        interval: Interval::Monthly,
    }
}

fn create(store: &mut MemoryStore, user_id: &str, amount: i64) -> String {
    recurring::create(store, new_recurring(user_id, PROJECT, amount))
        .unwrap()
        .id
}

fn total(store: &MemoryStore) -> i64 {
    recurring::project_monthly_total(store, PROJECT, YearlyNormalization::DivideBy12)
}

#[test]
fn test_create_starts_active() {
    let mut store = setup();
    let donation = recurring::create(&mut store, new_recurring(DONOR, PROJECT, 1_000)).unwrap();
    assert_eq!(donation.status, RecurringStatus::Active);
    assert_eq!(donation.amount, 1_000);
    invariants::assert_positive_amount(&donation);
}

#[test]
fn test_create_rejects_suspended_account() {
    let mut store = setup();
    let err = recurring::create(&mut store, new_recurring(SUSPENDED, PROJECT, 1_000));
    assert_eq!(err, Err(DomainError::SuspendedAccount));
}

#[test]
fn test_create_rejects_frozen_project() {
    let mut store = setup();
    let err = recurring::create(&mut store, new_recurring(DONOR, "p-frozen", 1_000));
    assert_eq!(err, Err(DomainError::ProjectNotDonatable));
}

#[test]
fn test_create_rejects_deleted_project() {
    let mut store = setup();
    let err = recurring::create(&mut store, new_recurring(DONOR, "p-deleted", 1_000));
    assert_eq!(err, Err(DomainError::ProjectNotDonatable));
}

#[test]
fn test_create_rejects_unknown_project() {
    let mut store = setup();
    let err = recurring::create(&mut store, new_recurring(DONOR, "p-missing", 1_000));
    assert!(matches!(err, Err(DomainError::NotFound("project", _))));
}

#[test]
fn test_create_rejects_nonpositive_amount() {
    let mut store = setup();
    for amount in [0, -100] {
        let err = recurring::create(&mut store, new_recurring(DONOR, PROJECT, amount));
        assert!(matches!(err, Err(DomainError::Validation(_))));
    }
}

#[test]
fn test_pause_excludes_from_total_and_resume_restores() {
    let mut store = setup();
    let id = create(&mut store, DONOR, 1_000);
    create(&mut store, OTHER, 500);
    assert_eq!(total(&store), 1_500);

    recurring::pause(&mut store, &donor_auth(), &id).unwrap();
    assert_eq!(total(&store), 500);
    invariants::assert_total_counts_only_active(
        &store.recurring_by_project(PROJECT),
        YearlyNormalization::DivideBy12,
    );

    recurring::resume(&mut store, &donor_auth(), &id).unwrap();
    assert_eq!(total(&store), 1_500);
}

#[test]
fn test_pause_is_idempotent() {
    let mut store = setup();
    let id = create(&mut store, DONOR, 1_000);

    assert_eq!(recurring::pause(&mut store, &donor_auth(), &id), Ok(true));
    assert_eq!(recurring::pause(&mut store, &donor_auth(), &id), Ok(false));
    assert_eq!(
        store.get_recurring(&id).unwrap().status,
        RecurringStatus::Paused
    );
}

#[test]
fn test_resume_on_active_is_noop() {
    let mut store = setup();
    let id = create(&mut store, DONOR, 1_000);
    assert_eq!(recurring::resume(&mut store, &donor_auth(), &id), Ok(false));
    assert_eq!(total(&store), 1_000);
}

#[test]
fn test_update_amount_and_interval() {
    let mut store = setup();
    let id = create(&mut store, DONOR, 1_000);

    let before = store.get_recurring(&id).unwrap().status;
    let updated = recurring::update(
        &mut store,
        &donor_auth(),
        &id,
        RecurringPatch {
            amount: Some(2_500),
            interval: Some(Interval::Yearly),
        },
    )
    .unwrap();
    invariants::assert_valid_recurring_transition(before, updated.status);
    assert_eq!(updated.amount, 2_500);
    assert_eq!(updated.interval, Interval::Yearly);
}

#[test]
fn test_update_allowed_while_paused() {
    let mut store = setup();
    let id = create(&mut store, DONOR, 1_000);
    recurring::pause(&mut store, &donor_auth(), &id).unwrap();

    let updated = recurring::update(
        &mut store,
        &donor_auth(),
        &id,
        RecurringPatch {
            amount: Some(800),
            interval: None,
        },
    )
    .unwrap();
    assert_eq!(updated.amount, 800);
    assert_eq!(updated.status, RecurringStatus::Paused);
}

#[test]
fn test_update_rejected_after_cancel() {
    let mut store = setup();
    let id = create(&mut store, DONOR, 1_000);
    recurring::cancel(&mut store, &donor_auth(), &id).unwrap();

    let err = recurring::update(
        &mut store,
        &donor_auth(),
        &id,
        RecurringPatch {
            amount: Some(500),
            interval: None,
        },
    );
    assert_eq!(err, Err(DomainError::InvalidState(RecurringStatus::Cancelled)));
}

#[test]
fn test_update_rejected_after_delete() {
    let mut store = setup();
    let id = create(&mut store, DONOR, 1_000);
    recurring::delete(&mut store, &donor_auth(), &id).unwrap();

    let err = recurring::update(
        &mut store,
        &donor_auth(),
        &id,
        RecurringPatch {
            amount: Some(500),
            interval: None,
        },
    );
    assert_eq!(err, Err(DomainError::InvalidState(RecurringStatus::Deleted)));
}

#[test]
fn test_rejected_update_applies_nothing() {
    let mut store = setup();
    let id = create(&mut store, DONOR, 1_000);

    // Bad amount together with a valid interval change: the whole patch
    // must be rejected, not half-applied.
    let err = recurring::update(
        &mut store,
        &donor_auth(),
        &id,
        RecurringPatch {
            amount: Some(0),
            interval: Some(Interval::Yearly),
        },
    );
    assert!(matches!(err, Err(DomainError::Validation(_))));

    let stored = store.get_recurring(&id).unwrap();
    assert_eq!(stored.amount, 1_000);
    assert_eq!(stored.interval, Interval::Monthly);
}

#[test]
fn test_cancel_keeps_record_visible_in_history() {
    let mut store = setup();
    let id = create(&mut store, DONOR, 1_000);
    recurring::cancel(&mut store, &donor_auth(), &id).unwrap();

    let listed = recurring::list_for_donor(&store, &donor_auth());
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, RecurringStatus::Cancelled);
    assert_eq!(total(&store), 0);
}

#[test]
fn test_cancel_is_idempotent() {
    let mut store = setup();
    let id = create(&mut store, DONOR, 1_000);
    assert_eq!(recurring::cancel(&mut store, &donor_auth(), &id), Ok(true));
    assert_eq!(recurring::cancel(&mut store, &donor_auth(), &id), Ok(false));
}

#[test]
fn test_delete_removes_from_listing() {
    let mut store = setup();
    let id = create(&mut store, DONOR, 1_000);
    recurring::delete(&mut store, &donor_auth(), &id).unwrap();

    assert!(recurring::list_for_donor(&store, &donor_auth()).is_empty());
    assert_eq!(total(&store), 0);
}

#[test]
fn test_delete_allowed_from_cancelled() {
    let mut store = setup();
    let id = create(&mut store, DONOR, 1_000);
    recurring::cancel(&mut store, &donor_auth(), &id).unwrap();
    recurring::delete(&mut store, &donor_auth(), &id).unwrap();
    assert!(recurring::list_for_donor(&store, &donor_auth()).is_empty());
}

#[test]
fn test_pause_on_cancelled_is_invalid_state() {
    let mut store = setup();
    let id = create(&mut store, DONOR, 1_000);
    recurring::cancel(&mut store, &donor_auth(), &id).unwrap();

    let err = recurring::pause(&mut store, &donor_auth(), &id);
    assert_eq!(err, Err(DomainError::InvalidState(RecurringStatus::Cancelled)));
}

#[test]
fn test_delete_aborts_pending_edit() {
    let mut store = setup();
    let id = create(&mut store, DONOR, 1_000);

    // Donor deletes from another tab while an edit form is open; the
    // late-arriving edit must fail instead of resurrecting the record.
    recurring::delete(&mut store, &donor_auth(), &id).unwrap();
    let err = recurring::update(
        &mut store,
        &donor_auth(),
        &id,
        RecurringPatch {
            amount: Some(2_000),
            interval: None,
        },
    );
    assert_eq!(err, Err(DomainError::InvalidState(RecurringStatus::Deleted)));
    assert_eq!(
        store.get_recurring(&id).unwrap().status,
        RecurringStatus::Deleted
    );
}

#[test]
fn test_mutation_by_other_user_is_forbidden() {
    let mut store = setup();
    let id = create(&mut store, DONOR, 1_000);
    let intruder = AuthContext::new(OTHER, Role::Donor);

    assert_eq!(
        recurring::pause(&mut store, &intruder, &id),
        Err(DomainError::Forbidden)
    );
    assert_eq!(
        recurring::delete(&mut store, &intruder, &id),
        Err(DomainError::Forbidden)
    );
}

#[test]
fn test_yearly_amount_divided_by_twelve() {
    let mut store = setup();
    recurring::create(
        &mut store,
        NewRecurring {
            project_id: PROJECT.into(),
            donor: DonorRef::User(DONOR.into()),
            amount: 12_000,
            interval: Interval::Yearly,
        },
    )
    .unwrap();
    assert_eq!(total(&store), 1_000);
}

#[test]
fn test_yearly_face_value_policy() {
    let mut store = setup();
    recurring::create(
        &mut store,
        NewRecurring {
            project_id: PROJECT.into(),
            donor: DonorRef::User(DONOR.into()),
            amount: 12_000,
            interval: Interval::Yearly,
        },
    )
    .unwrap();
    assert_eq!(
        recurring::project_monthly_total(&store, PROJECT, YearlyNormalization::FaceValue),
        12_000
    );
}

#[test]
fn test_later_suspension_leaves_subscription_running() {
    let mut store = setup();
    create(&mut store, DONOR, 1_000);
    assert_eq!(total(&store), 1_000);

    store.put_user(user(DONOR, true));
    assert_eq!(total(&store), 1_000);

    // New subscriptions are blocked, the running one is not.
    let err = recurring::create(&mut store, new_recurring(DONOR, PROJECT, 500));
    assert_eq!(err, Err(DomainError::SuspendedAccount));
}

#[test]
fn test_token_attributed_recurring_skips_account_gate() {
    let mut store = setup();
    let donation = recurring::create(
        &mut store,
        NewRecurring {
            project_id: PROJECT.into(),
            donor: DonorRef::Token("tok-1".into()),
            amount: 700,
            interval: Interval::Monthly,
        },
    )
    .unwrap();
    assert_eq!(donation.status, RecurringStatus::Active);
    assert_eq!(total(&store), 700);
}
