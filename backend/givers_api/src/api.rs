//! Axum REST API handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use givers_core::disclosure::{DisclosureBundle, DisclosureSubject};
use givers_core::recurring::RecurringPatch;
use givers_core::target::resolve_monthly_target;
use givers_core::{
    achievement, Achievement, CostItem, Donation, DomainError, DonorRef, Interval,
    MigrationOutcome, Money, PledgeConfig, Project, ProjectAlerts, ProjectStatus,
    RecurringDonation, RecurringStatus, Role, User, PLATFORM,
};

use crate::auth;
use crate::config::Config;
use crate::db;
use crate::errors::Result;
use crate::payments::{self, CheckoutRequest};

#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
    pub config: Config,
    pub client: Client,
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub platform: &'static str,
    pub version: &'static str,
}

/// A project as the UI consumes it: stored fields plus the live monthly
/// total and its achievement evaluation.
#[derive(Serialize)]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: Project,
    pub current_monthly_donations: Money,
    pub achievement: Achievement,
}

#[derive(Deserialize)]
pub struct AlertsRequest {
    pub warning_threshold: u8,
    pub critical_threshold: u8,
}

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub owner_want_monthly: Option<Money>,
    #[serde(default)]
    pub cost_items: Vec<CostItem>,
    pub alerts: Option<AlertsRequest>,
}

#[derive(Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub owner_want_monthly: Option<Money>,
    pub cost_items: Option<Vec<CostItem>>,
    pub alerts: Option<AlertsRequest>,
}

#[derive(Deserialize)]
pub struct CheckoutBody {
    pub amount: Money,
    #[serde(default)]
    pub is_recurring: bool,
    pub interval: Option<Interval>,
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub checkout_url: String,
}

/// Settled-payment notification from the checkout provider.
#[derive(Deserialize)]
pub struct PaymentCompletedRequest {
    pub project_id: String,
    #[serde(flatten)]
    pub donor: DonorRef,
    pub amount: Money,
    #[serde(default)]
    pub is_recurring: bool,
    pub interval: Option<Interval>,
    pub message: Option<String>,
}

#[derive(Deserialize)]
pub struct UpsertUserRequest {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub suspended: bool,
    #[serde(default)]
    pub pending_token_migration: bool,
}

#[derive(Serialize)]
pub struct PlatformHealthResponse {
    pub project_id: String,
    pub monthly_target: Money,
    pub current_monthly: Money,
    #[serde(flatten)]
    pub achievement: Achievement,
}

// ─────────────────────────────────────────────────────────
// Health
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        platform: PLATFORM,
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ─────────────────────────────────────────────────────────
// Projects
// ─────────────────────────────────────────────────────────

async fn project_view(state: &ApiState, project: Project) -> Result<ProjectView> {
    let current = db::project_monthly_total(
        &state.pool,
        &project.id,
        state.config.yearly_normalization,
    )
    .await?;
    let achievement = achievement::evaluate_for_project(&project, current);
    Ok(ProjectView {
        project,
        current_monthly_donations: current,
        achievement,
    })
}

/// `GET /projects`
pub async fn list_projects(State(state): State<Arc<ApiState>>) -> Result<Json<Vec<ProjectView>>> {
    let mut views = Vec::new();
    for project in db::list_projects(&state.pool).await? {
        views.push(project_view(&state, project).await?);
    }
    Ok(Json(views))
}

/// `GET /projects/:id`
pub async fn get_project(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<ProjectView>> {
    let project = db::get_project(&state.pool, &id)
        .await?
        .ok_or_else(|| DomainError::NotFound("project", id))?;
    Ok(Json(project_view(&state, project).await?))
}

fn alerts_from(request: Option<AlertsRequest>) -> Result<Option<ProjectAlerts>> {
    request
        .map(|a| ProjectAlerts::new(a.warning_threshold, a.critical_threshold))
        .transpose()
        .map_err(Into::into)
}

/// `POST /projects`
pub async fn create_project(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(request): Json<CreateProjectRequest>,
) -> Result<Response> {
    let user = auth::current_user(&state.pool, &headers).await?;
    if user.suspended {
        return Err(DomainError::SuspendedAccount.into());
    }

    let now = Utc::now();
    let mut project = Project {
        id: Uuid::new_v4().to_string(),
        owner_id: user.id,
        name: request.name,
        description: request.description,
        status: ProjectStatus::Active,
        pledge: PledgeConfig {
            owner_want_monthly: request.owner_want_monthly,
            cost_items: request.cost_items,
        },
        monthly_target: 0,
        alerts: alerts_from(request.alerts)?,
        created_at: now,
        updated_at: now,
    };
    project.validate()?;
    project.refresh_monthly_target();

    db::insert_project(&state.pool, &project).await?;
    let view = project_view(&state, project).await?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

/// `PATCH /projects/:id`
///
/// Owner-only. The cached monthly target is recomputed from the edited
/// pledge inputs and written together with them.
pub async fn update_project(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<UpdateProjectRequest>,
) -> Result<Json<ProjectView>> {
    let user = auth::current_user(&state.pool, &headers).await?;
    let mut project = db::get_project(&state.pool, &id)
        .await?
        .ok_or_else(|| DomainError::NotFound("project", id))?;
    if project.owner_id != user.id {
        return Err(DomainError::Forbidden.into());
    }

    if let Some(name) = request.name {
        project.name = name;
    }
    if let Some(description) = request.description {
        project.description = description;
    }
    if let Some(status) = request.status {
        project.status = status;
    }
    if let Some(want) = request.owner_want_monthly {
        project.pledge.owner_want_monthly = Some(want);
    }
    if let Some(cost_items) = request.cost_items {
        project.pledge.cost_items = cost_items;
    }
    if let Some(alerts) = alerts_from(request.alerts)? {
        project.alerts = Some(alerts);
    }
    project.validate()?;
    project.refresh_monthly_target();
    project.updated_at = Utc::now();

    db::update_project(&state.pool, &project).await?;
    Ok(Json(project_view(&state, project).await?))
}

// ─────────────────────────────────────────────────────────
// Checkout and settled payments
// ─────────────────────────────────────────────────────────

async fn ensure_can_donate(
    pool: &SqlitePool,
    donor: &DonorRef,
    project_id: &str,
    amount: Money,
) -> Result<Project> {
    if amount <= 0 {
        return Err(DomainError::Validation("amount must be positive".into()).into());
    }
    if let DonorRef::User(user_id) = donor {
        let user = db::get_user(pool, user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("user", user_id.clone()))?;
        if user.suspended {
            return Err(DomainError::SuspendedAccount.into());
        }
    }
    let project = db::get_project(pool, project_id)
        .await?
        .ok_or_else(|| DomainError::NotFound("project", project_id.to_string()))?;
    if !project.is_donatable() {
        return Err(DomainError::ProjectNotDonatable.into());
    }
    Ok(project)
}

/// `POST /projects/:id/checkout`
///
/// Gates the donation, then asks the external provider for a hosted
/// checkout URL. Anonymous browsers may donate; their history is recorded
/// against the forwarded donor token until migration.
pub async fn create_checkout(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(project_id): Path<String>,
    Json(body): Json<CheckoutBody>,
) -> Result<Json<CheckoutResponse>> {
    let donor = match auth::optional_user(&state.pool, &headers).await? {
        Some(user) => DonorRef::User(user.id),
        None => DonorRef::Token(auth::donor_token(&headers).unwrap_or_default()),
    };
    ensure_can_donate(&state.pool, &donor, &project_id, body.amount).await?;

    let session = payments::create_checkout(
        &state.client,
        &state.config.checkout_base_url,
        &CheckoutRequest {
            project_id: &project_id,
            amount: body.amount,
            is_recurring: body.is_recurring,
            interval: body.interval,
            message: body.message.as_deref(),
        },
    )
    .await?;
    Ok(Json(CheckoutResponse {
        checkout_url: session.url,
    }))
}

/// `POST /payments/completed`
///
/// Records the donation once the provider reports a settled payment. This
/// is the only path on which donation records enter the system.
pub async fn payment_completed(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<PaymentCompletedRequest>,
) -> Result<Response> {
    ensure_can_donate(&state.pool, &request.donor, &request.project_id, request.amount).await?;

    let now = Utc::now();
    if request.is_recurring {
        let donation = RecurringDonation {
            id: Uuid::new_v4().to_string(),
            project_id: request.project_id,
            donor: request.donor,
            amount: request.amount,
            interval: request.interval.unwrap_or(Interval::Monthly),
            status: RecurringStatus::Active,
            created_at: now,
            updated_at: now,
        };
        db::insert_recurring(&state.pool, &donation).await?;
        Ok((StatusCode::CREATED, Json(donation)).into_response())
    } else {
        let donation = Donation {
            id: Uuid::new_v4().to_string(),
            project_id: request.project_id,
            donor: request.donor,
            amount: request.amount,
            message: request.message,
            created_at: now,
        };
        db::insert_donation(&state.pool, &donation).await?;
        Ok((StatusCode::CREATED, Json(donation)).into_response())
    }
}

// ─────────────────────────────────────────────────────────
// Donor history
// ─────────────────────────────────────────────────────────

/// `GET /me/donations`
pub async fn my_donations(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Donation>>> {
    let user = auth::current_user(&state.pool, &headers).await?;
    let list = db::donations_for_donor(&state.pool, &DonorRef::User(user.id)).await?;
    Ok(Json(list))
}

/// `GET /me/recurring`
pub async fn my_recurring(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<RecurringDonation>>> {
    let user = auth::current_user(&state.pool, &headers).await?;
    let list = db::recurring_for_donor(&state.pool, &DonorRef::User(user.id)).await?;
    Ok(Json(list))
}

// ─────────────────────────────────────────────────────────
// Recurring donation lifecycle
// ─────────────────────────────────────────────────────────

/// `POST /recurring/:id/pause`
pub async fn pause_recurring(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<RecurringDonation>> {
    let user = auth::current_user(&state.pool, &headers).await?;
    let ctx = auth::auth_context(&user);
    let donation = db::mutate_recurring(&state.pool, &ctx, &id, |d| d.pause()).await?;
    Ok(Json(donation))
}

/// `POST /recurring/:id/resume`
pub async fn resume_recurring(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<RecurringDonation>> {
    let user = auth::current_user(&state.pool, &headers).await?;
    let ctx = auth::auth_context(&user);
    let donation = db::mutate_recurring(&state.pool, &ctx, &id, |d| d.resume()).await?;
    Ok(Json(donation))
}

/// `POST /recurring/:id/cancel`
pub async fn cancel_recurring(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<RecurringDonation>> {
    let user = auth::current_user(&state.pool, &headers).await?;
    let ctx = auth::auth_context(&user);
    let donation = db::mutate_recurring(&state.pool, &ctx, &id, |d| d.cancel()).await?;
    Ok(Json(donation))
}

/// `DELETE /recurring/:id`
pub async fn delete_recurring(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let user = auth::current_user(&state.pool, &headers).await?;
    let ctx = auth::auth_context(&user);
    db::mutate_recurring(&state.pool, &ctx, &id, |d| d.delete().map(|_| true)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PATCH /recurring/:id`
pub async fn update_recurring(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<RecurringPatch>,
) -> Result<Json<RecurringDonation>> {
    let user = auth::current_user(&state.pool, &headers).await?;
    let ctx = auth::auth_context(&user);
    let donation =
        db::mutate_recurring(&state.pool, &ctx, &id, |d| d.apply_patch(&patch).map(|_| true))
            .await?;
    Ok(Json(donation))
}

// ─────────────────────────────────────────────────────────
// Migration
// ─────────────────────────────────────────────────────────

/// `POST /me/migrate`
pub async fn migrate(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Json<MigrationOutcome>> {
    let user = auth::current_user(&state.pool, &headers).await?;
    let token = auth::donor_token(&headers)
        .ok_or_else(|| DomainError::Validation("donor token is required".into()))?;
    let outcome = db::migrate_token(&state.pool, &user.id, &token).await?;
    Ok(Json(outcome))
}

// ─────────────────────────────────────────────────────────
// Disclosure export
// ─────────────────────────────────────────────────────────

/// `GET /admin/disclosure/:subject/:id`
///
/// Host-only snapshot of a user's or project's financial history for
/// disclosure requests. Read-only; deleted recurring donations never
/// appear, cancelled ones do.
pub async fn disclosure_export(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path((subject, id)): Path<(String, String)>,
) -> Result<Json<DisclosureBundle>> {
    let caller = auth::current_user(&state.pool, &headers).await?;
    if !auth::auth_context(&caller).is_host() {
        return Err(DomainError::Forbidden.into());
    }
    let subject: DisclosureSubject = subject.parse()?;
    let exported_at = Utc::now();

    let bundle = match subject {
        DisclosureSubject::User => {
            let user = db::get_user(&state.pool, &id)
                .await?
                .ok_or_else(|| DomainError::NotFound("user", id.clone()))?;
            let donor = DonorRef::User(id.clone());
            DisclosureBundle::User {
                exported_at,
                platform: PLATFORM,
                user,
                user_projects: db::projects_by_owner(&state.pool, &id).await?,
                user_donations: db::donations_for_donor(&state.pool, &donor).await?,
                user_recurring: db::recurring_for_donor(&state.pool, &donor).await?,
            }
        }
        DisclosureSubject::Project => {
            let project = db::get_project(&state.pool, &id)
                .await?
                .ok_or_else(|| DomainError::NotFound("project", id.clone()))?;
            DisclosureBundle::Project {
                exported_at,
                platform: PLATFORM,
                project,
                project_donations: db::donations_for_project(&state.pool, &id).await?,
                project_recurring: db::recurring_for_project(&state.pool, &id).await?,
            }
        }
    };
    Ok(Json(bundle))
}

// ─────────────────────────────────────────────────────────
// Platform health
// ─────────────────────────────────────────────────────────

/// `GET /platform/health`
///
/// Achievement evaluation of the platform's own project, consumed by the
/// navigation financial-health mark.
pub async fn platform_health(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<PlatformHealthResponse>> {
    let project_id = state
        .config
        .platform_project_id
        .clone()
        .ok_or_else(|| DomainError::NotFound("project", "platform project not configured".into()))?;
    let project = db::get_project(&state.pool, &project_id)
        .await?
        .ok_or_else(|| DomainError::NotFound("project", project_id.clone()))?;
    let current = db::project_monthly_total(
        &state.pool,
        &project_id,
        state.config.yearly_normalization,
    )
    .await?;
    let achievement = achievement::evaluate_for_project(&project, current);
    Ok(Json(PlatformHealthResponse {
        project_id,
        monthly_target: resolve_monthly_target(&project.pledge),
        current_monthly: current,
        achievement,
    }))
}

// ─────────────────────────────────────────────────────────
// Account provisioning (session layer)
// ─────────────────────────────────────────────────────────

/// `PUT /internal/users`
///
/// Called by the session layer when it provisions or refreshes an
/// authenticated account. Preserves the original creation time on refresh.
pub async fn upsert_user(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<UpsertUserRequest>,
) -> Result<StatusCode> {
    let existing = db::get_user(&state.pool, &request.id).await?;
    let now = Utc::now();
    let user = User {
        created_at: existing.map(|u| u.created_at).unwrap_or(now),
        updated_at: now,
        id: request.id,
        email: request.email,
        name: request.name,
        role: request.role,
        suspended: request.suspended,
        pending_token_migration: request.pending_token_migration,
    };
    db::upsert_user(&state.pool, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}
