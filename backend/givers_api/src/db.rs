//! Database layer — migrations, row mapping, and transactional mutations.
//!
//! Rows are flat records mirroring the API's JSON contract; enums travel as
//! their string form and cost items as a JSON column. Every state-machine
//! mutation (pause/resume/cancel/delete/update, token migration) runs in a
//! single transaction so no caller can observe a half-applied transition.

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

use givers_core::recurring::current_monthly_total;
use givers_core::{
    AuthContext, CostItem, Donation, DonorRef, DomainError, MigrationOutcome, Money, PledgeConfig,
    Project, ProjectAlerts, RecurringDonation, User, YearlyNormalization,
};

use crate::errors::{ApiError, Result};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    // Make sure the file is created if it doesn't exist yet.
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

fn donor_ref(donor_type: &str, donor_id: String) -> Result<DonorRef> {
    match donor_type {
        "user" => Ok(DonorRef::User(donor_id)),
        "token" => Ok(DonorRef::Token(donor_id)),
        other => Err(ApiError::Decode(format!("unknown donor type: {other}"))),
    }
}

fn donor_columns(donor: &DonorRef) -> (&'static str, &str) {
    match donor {
        DonorRef::User(id) => ("user", id),
        DonorRef::Token(token) => ("token", token),
    }
}

// ─────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    name: String,
    role: String,
    suspended: bool,
    pending_token_migration: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_domain(self) -> Result<User> {
        Ok(User {
            role: self.role.parse().map_err(decode)?,
            id: self.id,
            email: self.email,
            name: self.name,
            suspended: self.suspended,
            pending_token_migration: self.pending_token_migration,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const USER_COLS: &str =
    "id, email, name, role, suspended, pending_token_migration, created_at, updated_at";

pub async fn get_user(pool: &SqlitePool, id: &str) -> Result<Option<User>> {
    let row: Option<UserRow> =
        sqlx::query_as(&format!("SELECT {USER_COLS} FROM users WHERE id = ?1"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    row.map(UserRow::into_domain).transpose()
}

/// Insert or replace a user record. Called by the session layer when it
/// provisions or refreshes an authenticated account.
pub async fn upsert_user(pool: &SqlitePool, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO users
            (id, email, name, role, suspended, pending_token_migration, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.name)
    .bind(user.role.as_str())
    .bind(user.suspended)
    .bind(user.pending_token_migration)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Projects
// ─────────────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: String,
    owner_id: String,
    name: String,
    description: String,
    status: String,
    owner_want_monthly: Option<i64>,
    cost_items: String,
    monthly_target: i64,
    warning_threshold: Option<i64>,
    critical_threshold: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProjectRow {
    fn into_domain(self) -> Result<Project> {
        let cost_items: Vec<CostItem> = serde_json::from_str(&self.cost_items)?;
        let alerts = match (self.warning_threshold, self.critical_threshold) {
            (Some(warning), Some(critical)) => Some(ProjectAlerts {
                warning_threshold: warning.try_into().map_err(decode)?,
                critical_threshold: critical.try_into().map_err(decode)?,
            }),
            _ => None,
        };
        Ok(Project {
            status: self.status.parse().map_err(decode)?,
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            description: self.description,
            pledge: PledgeConfig {
                owner_want_monthly: self.owner_want_monthly,
                cost_items,
            },
            monthly_target: self.monthly_target,
            alerts,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const PROJECT_COLS: &str = "id, owner_id, name, description, status, owner_want_monthly, \
     cost_items, monthly_target, warning_threshold, critical_threshold, created_at, updated_at";

pub async fn get_project(pool: &SqlitePool, id: &str) -> Result<Option<Project>> {
    let row: Option<ProjectRow> =
        sqlx::query_as(&format!("SELECT {PROJECT_COLS} FROM projects WHERE id = ?1"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    row.map(ProjectRow::into_domain).transpose()
}

/// All projects visible to donors (everything but deleted), newest first.
pub async fn list_projects(pool: &SqlitePool) -> Result<Vec<Project>> {
    let rows: Vec<ProjectRow> = sqlx::query_as(&format!(
        "SELECT {PROJECT_COLS} FROM projects WHERE status != 'deleted' \
         ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(ProjectRow::into_domain).collect()
}

pub async fn projects_by_owner(pool: &SqlitePool, owner_id: &str) -> Result<Vec<Project>> {
    let rows: Vec<ProjectRow> = sqlx::query_as(&format!(
        "SELECT {PROJECT_COLS} FROM projects WHERE owner_id = ?1 \
         ORDER BY created_at ASC, id ASC"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(ProjectRow::into_domain).collect()
}

pub async fn insert_project(pool: &SqlitePool, project: &Project) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO projects
            (id, owner_id, name, description, status, owner_want_monthly, cost_items,
             monthly_target, warning_threshold, critical_threshold, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&project.id)
    .bind(&project.owner_id)
    .bind(&project.name)
    .bind(&project.description)
    .bind(project.status.as_str())
    .bind(project.pledge.owner_want_monthly)
    .bind(serde_json::to_string(&project.pledge.cost_items)?)
    .bind(project.monthly_target)
    .bind(project.alerts.map(|a| a.warning_threshold as i64))
    .bind(project.alerts.map(|a| a.critical_threshold as i64))
    .bind(project.created_at)
    .bind(project.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Persist a project's mutable fields. The cached `monthly_target` is
/// written in the same statement as the pledge inputs it derives from, so
/// readers can never observe one without the other.
pub async fn update_project(pool: &SqlitePool, project: &Project) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE projects
        SET    name = ?1, description = ?2, status = ?3, owner_want_monthly = ?4,
               cost_items = ?5, monthly_target = ?6, warning_threshold = ?7,
               critical_threshold = ?8, updated_at = ?9
        WHERE  id = ?10
        "#,
    )
    .bind(&project.name)
    .bind(&project.description)
    .bind(project.status.as_str())
    .bind(project.pledge.owner_want_monthly)
    .bind(serde_json::to_string(&project.pledge.cost_items)?)
    .bind(project.monthly_target)
    .bind(project.alerts.map(|a| a.warning_threshold as i64))
    .bind(project.alerts.map(|a| a.critical_threshold as i64))
    .bind(project.updated_at)
    .bind(&project.id)
    .execute(pool)
    .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// One-time donations
// ─────────────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct DonationRow {
    id: String,
    project_id: String,
    donor_type: String,
    donor_id: String,
    amount: i64,
    message: Option<String>,
    created_at: DateTime<Utc>,
}

impl DonationRow {
    fn into_domain(self) -> Result<Donation> {
        Ok(Donation {
            donor: donor_ref(&self.donor_type, self.donor_id)?,
            id: self.id,
            project_id: self.project_id,
            amount: self.amount,
            message: self.message,
            created_at: self.created_at,
        })
    }
}

const DONATION_COLS: &str = "id, project_id, donor_type, donor_id, amount, message, created_at";

pub async fn insert_donation(pool: &SqlitePool, donation: &Donation) -> Result<()> {
    let (donor_type, donor_id) = donor_columns(&donation.donor);
    sqlx::query(
        r#"
        INSERT INTO donations (id, project_id, donor_type, donor_id, amount, message, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&donation.id)
    .bind(&donation.project_id)
    .bind(donor_type)
    .bind(donor_id)
    .bind(donation.amount)
    .bind(&donation.message)
    .bind(donation.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// A donor's one-time donations, newest first.
pub async fn donations_for_donor(pool: &SqlitePool, donor: &DonorRef) -> Result<Vec<Donation>> {
    let (donor_type, donor_id) = donor_columns(donor);
    let rows: Vec<DonationRow> = sqlx::query_as(&format!(
        "SELECT {DONATION_COLS} FROM donations \
         WHERE donor_type = ?1 AND donor_id = ?2 \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(donor_type)
    .bind(donor_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(DonationRow::into_domain).collect()
}

/// A project's donations in chronological order (disclosure exports).
pub async fn donations_for_project(pool: &SqlitePool, project_id: &str) -> Result<Vec<Donation>> {
    let rows: Vec<DonationRow> = sqlx::query_as(&format!(
        "SELECT {DONATION_COLS} FROM donations WHERE project_id = ?1 \
         ORDER BY created_at ASC, id ASC"
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(DonationRow::into_domain).collect()
}

// ─────────────────────────────────────────────────────────
// Recurring donations
// ─────────────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct RecurringRow {
    id: String,
    project_id: String,
    donor_type: String,
    donor_id: String,
    amount: i64,
    interval: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RecurringRow {
    fn into_domain(self) -> Result<RecurringDonation> {
        Ok(RecurringDonation {
            donor: donor_ref(&self.donor_type, self.donor_id)?,
            interval: self.interval.parse().map_err(decode)?,
            status: self.status.parse().map_err(decode)?,
            id: self.id,
            project_id: self.project_id,
            amount: self.amount,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const RECURRING_COLS: &str =
    "id, project_id, donor_type, donor_id, amount, interval, status, created_at, updated_at";

pub async fn insert_recurring(pool: &SqlitePool, donation: &RecurringDonation) -> Result<()> {
    let (donor_type, donor_id) = donor_columns(&donation.donor);
    sqlx::query(
        r#"
        INSERT INTO recurring_donations
            (id, project_id, donor_type, donor_id, amount, interval, status, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&donation.id)
    .bind(&donation.project_id)
    .bind(donor_type)
    .bind(donor_id)
    .bind(donation.amount)
    .bind(donation.interval.as_str())
    .bind(donation.status.as_str())
    .bind(donation.created_at)
    .bind(donation.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// A donor's recurring donations, newest first. Cancelled records stay
/// visible with their status marker; deleted records never surface.
pub async fn recurring_for_donor(
    pool: &SqlitePool,
    donor: &DonorRef,
) -> Result<Vec<RecurringDonation>> {
    let (donor_type, donor_id) = donor_columns(donor);
    let rows: Vec<RecurringRow> = sqlx::query_as(&format!(
        "SELECT {RECURRING_COLS} FROM recurring_donations \
         WHERE donor_type = ?1 AND donor_id = ?2 AND status != 'deleted' \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(donor_type)
    .bind(donor_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(RecurringRow::into_domain).collect()
}

/// A project's non-deleted recurring donations in chronological order.
pub async fn recurring_for_project(
    pool: &SqlitePool,
    project_id: &str,
) -> Result<Vec<RecurringDonation>> {
    let rows: Vec<RecurringRow> = sqlx::query_as(&format!(
        "SELECT {RECURRING_COLS} FROM recurring_donations \
         WHERE project_id = ?1 AND status != 'deleted' \
         ORDER BY created_at ASC, id ASC"
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(RecurringRow::into_domain).collect()
}

/// Live monthly total for a project: active recurring donations only,
/// yearly amounts normalized per the configured policy.
pub async fn project_monthly_total(
    pool: &SqlitePool,
    project_id: &str,
    normalization: YearlyNormalization,
) -> Result<Money> {
    let rows: Vec<RecurringRow> = sqlx::query_as(&format!(
        "SELECT {RECURRING_COLS} FROM recurring_donations \
         WHERE project_id = ?1 AND status = 'active'"
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    let donations: Vec<RecurringDonation> = rows
        .into_iter()
        .map(RecurringRow::into_domain)
        .collect::<Result<_>>()?;
    Ok(current_monthly_total(donations.iter(), normalization))
}

/// Load a recurring donation owned by the caller, apply a transition, and
/// persist the result — all inside one transaction. `apply` returns whether
/// the record changed; a no-op transition commits nothing.
pub async fn mutate_recurring(
    pool: &SqlitePool,
    auth: &AuthContext,
    id: &str,
    apply: impl FnOnce(&mut RecurringDonation) -> givers_core::Result<bool>,
) -> Result<RecurringDonation> {
    let mut tx = pool.begin().await?;

    let row: Option<RecurringRow> = sqlx::query_as(&format!(
        "SELECT {RECURRING_COLS} FROM recurring_donations WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;
    let mut donation = row
        .ok_or_else(|| DomainError::NotFound("recurring donation", id.to_string()))?
        .into_domain()?;

    if !donation.donor.is_user(&auth.user_id) {
        return Err(DomainError::Forbidden.into());
    }

    let changed = apply(&mut donation)?;
    if changed {
        donation.updated_at = Utc::now();
        sqlx::query(
            "UPDATE recurring_donations \
             SET amount = ?1, interval = ?2, status = ?3, updated_at = ?4 WHERE id = ?5",
        )
        .bind(donation.amount)
        .bind(donation.interval.as_str())
        .bind(donation.status.as_str())
        .bind(donation.updated_at)
        .bind(&donation.id)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(donation)
}

// ─────────────────────────────────────────────────────────
// Token migration
// ─────────────────────────────────────────────────────────

/// Reassign every donation and recurring donation recorded against `token`
/// to `account_id` and clear the account's pending flag, in one
/// transaction. The flag is the idempotence authority: once cleared, later
/// calls report `already_migrated` and write nothing, so retries after a
/// transient failure can never double-count.
pub async fn migrate_token(
    pool: &SqlitePool,
    account_id: &str,
    token: &str,
) -> Result<MigrationOutcome> {
    if token.is_empty() {
        return Err(DomainError::Validation("donor token is required".into()).into());
    }

    let mut tx = pool.begin().await?;

    let pending: Option<(bool,)> =
        sqlx::query_as("SELECT pending_token_migration FROM users WHERE id = ?1")
            .bind(account_id)
            .fetch_optional(&mut *tx)
            .await?;
    let Some((pending,)) = pending else {
        return Err(DomainError::NotFound("user", account_id.to_string()).into());
    };
    if !pending {
        return Ok(MigrationOutcome {
            migrated_count: 0,
            already_migrated: true,
        });
    }

    let now = Utc::now();
    let donations = sqlx::query(
        "UPDATE donations SET donor_type = 'user', donor_id = ?1 \
         WHERE donor_type = 'token' AND donor_id = ?2",
    )
    .bind(account_id)
    .bind(token)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let recurring = sqlx::query(
        "UPDATE recurring_donations SET donor_type = 'user', donor_id = ?1, updated_at = ?3 \
         WHERE donor_type = 'token' AND donor_id = ?2",
    )
    .bind(account_id)
    .bind(token)
    .bind(now)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    sqlx::query("UPDATE users SET pending_token_migration = 0, updated_at = ?2 WHERE id = ?1")
        .bind(account_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(MigrationOutcome {
        migrated_count: donations + recurring,
        already_migrated: false,
    })
}

fn decode(e: impl std::fmt::Display) -> ApiError {
    ApiError::Decode(e.to_string())
}
