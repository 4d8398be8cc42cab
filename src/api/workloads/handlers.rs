use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::api::common::ProjectId;
use crate::db::common::ProjectScope;
use crate::db::workloads::WorkloadFilters;
use crate::db::DelayTolerantWorkload;
use crate::error::SchedulerError;
use crate::service::{self, CreateWorkloadRequest};
use crate::AppState;

/// Delay tolerant workload details
#[derive(Serialize, ToSchema)]
pub struct WorkloadResponse {
    /// Workload ID
    pub id: String,
    /// Workload name, unique within the project
    pub name: String,
    /// Workflow name
    pub workflow_name: String,
    /// Workflow ID
    pub workflow_id: String,
    /// Input handed to the workflow at dispatch
    pub workflow_input: serde_json::Value,
    /// Engine parameters handed to the workflow at dispatch
    pub workflow_params: serde_json::Value,
    /// Completion deadline (RFC3339)
    pub deadline: String,
    /// Estimated job duration in minutes
    pub job_duration: Option<i32>,
    /// Visibility (private, public)
    pub scope: String,
    /// Whether the workload has been handed to the engine
    pub executed: bool,
    /// Whether a deferred trigger exists for the workload
    pub scheduled: bool,
    /// Creation timestamp (RFC3339)
    pub created_at: String,
    /// Last update timestamp (RFC3339)
    pub updated_at: String,
}

impl From<DelayTolerantWorkload> for WorkloadResponse {
    fn from(w: DelayTolerantWorkload) -> Self {
        WorkloadResponse {
            id: w.id.to_string(),
            name: w.name,
            workflow_name: w.workflow_name,
            workflow_id: w.workflow_id,
            workflow_input: w.workflow_input,
            workflow_params: w.workflow_params,
            deadline: w.deadline.to_rfc3339(),
            job_duration: w.job_duration,
            scope: w.scope,
            executed: w.executed,
            scheduled: w.scheduled,
            created_at: w.created_at.to_rfc3339(),
            updated_at: w.updated_at.to_rfc3339(),
        }
    }
}

/// Query parameters for listing workloads
#[derive(Deserialize, IntoParams)]
pub struct ListWorkloadsQuery {
    /// Keep only workloads with this name
    pub name: Option<String>,
    /// Keep only workloads for this workflow name
    pub workflow_name: Option<String>,
    /// Keep only workloads with this scope (private, public)
    pub scope: Option<String>,
    /// Maximum number of workloads to return (default 100)
    pub limit: Option<i64>,
    /// Number of workloads to skip
    pub offset: Option<i64>,
}

/// Response for listing workloads
#[derive(Serialize, ToSchema)]
pub struct ListWorkloadsResponse {
    /// Workloads visible to the caller
    pub delay_tolerant_workloads: Vec<WorkloadResponse>,
}

/// Create a delay tolerant workload
#[utoipa::path(
    post,
    path = "/v2/delay_tolerant_workload",
    tag = "Delay Tolerant Workloads",
    request_body = CreateWorkloadRequest,
    params(
        ("X-Project-ID" = String, Header, description = "Project ID")
    ),
    responses(
        (status = 201, description = "Workload created", body = WorkloadResponse),
        (status = 400, description = "Invalid deadline, duration or workflow input"),
        (status = 404, description = "Workflow definition not found"),
        (status = 409, description = "Workload name already taken"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_workload(
    State(state): State<Arc<AppState>>,
    ProjectId(project_id): ProjectId,
    Json(request): Json<CreateWorkloadRequest>,
) -> Result<(StatusCode, Json<WorkloadResponse>), SchedulerError> {
    tracing::info!("Creating new delay tolerant workload: {}", request.name);

    let workload =
        service::create_delay_tolerant_workload(&state.db, &state.config, project_id, &request)
            .await?;

    Ok((StatusCode::CREATED, Json(workload.into())))
}

/// Get the named delay tolerant workload
#[utoipa::path(
    get,
    path = "/v2/delay_tolerant_workload/{name}",
    tag = "Delay Tolerant Workloads",
    params(
        ("name" = String, Path, description = "Workload name"),
        ("X-Project-ID" = String, Header, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Workload details", body = WorkloadResponse),
        (status = 404, description = "Workload not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_workload(
    State(state): State<Arc<AppState>>,
    ProjectId(project_id): ProjectId,
    Path(name): Path<String>,
) -> Result<Json<WorkloadResponse>, SchedulerError> {
    tracing::info!("Fetching delay tolerant workload [name={}]", name);

    let workload = state
        .db
        .get_workload(&name, &ProjectScope::Project(project_id))
        .await?;

    Ok(Json(workload.into()))
}

/// List delay tolerant workloads visible to the caller
#[utoipa::path(
    get,
    path = "/v2/delay_tolerant_workload",
    tag = "Delay Tolerant Workloads",
    params(
        ListWorkloadsQuery,
        ("X-Project-ID" = String, Header, description = "Project ID")
    ),
    responses(
        (status = 200, description = "List of workloads", body = ListWorkloadsResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_workloads(
    State(state): State<Arc<AppState>>,
    ProjectId(project_id): ProjectId,
    Query(query): Query<ListWorkloadsQuery>,
) -> Result<Json<ListWorkloadsResponse>, SchedulerError> {
    let filters = WorkloadFilters {
        name: query.name,
        workflow_name: query.workflow_name,
        scope: query.scope,
        limit: query.limit,
        offset: query.offset,
    };

    let workloads = state.db.list_workloads(&filters, &project_id).await?;

    Ok(Json(ListWorkloadsResponse {
        delay_tolerant_workloads: workloads.into_iter().map(Into::into).collect(),
    }))
}

/// Delete the named delay tolerant workload
#[utoipa::path(
    delete,
    path = "/v2/delay_tolerant_workload/{name}",
    tag = "Delay Tolerant Workloads",
    params(
        ("name" = String, Path, description = "Workload name"),
        ("X-Project-ID" = String, Header, description = "Project ID")
    ),
    responses(
        (status = 204, description = "Workload deleted"),
        (status = 404, description = "Workload not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_workload(
    State(state): State<Arc<AppState>>,
    ProjectId(project_id): ProjectId,
    Path(name): Path<String>,
) -> Result<StatusCode, SchedulerError> {
    tracing::info!("Deleting delay tolerant workload [name={}]", name);

    let deleted = state.db.delete_workload(&name, &project_id).await?;
    if deleted == 0 {
        return Err(SchedulerError::NotFound(format!(
            "Delay tolerant workload not found [name={}]",
            name
        )));
    }

    Ok(StatusCode::NO_CONTENT)
}
