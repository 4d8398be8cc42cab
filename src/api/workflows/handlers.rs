use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::api::common::ProjectId;
use crate::db::common::ProjectScope;
use crate::db::WorkflowDefinition;
use crate::error::SchedulerError;
use crate::AppState;

/// Request to register a workflow definition
#[derive(Deserialize, ToSchema)]
pub struct RegisterWorkflowRequest {
    /// Workflow name, unique within the project
    pub name: String,
    /// Workflow definition, including its declared inputs
    pub definition: serde_json::Value,
}

/// Workflow definition details
#[derive(Serialize, ToSchema)]
pub struct WorkflowResponse {
    /// Workflow ID
    pub id: String,
    /// Workflow name
    pub name: String,
    /// Workflow definition
    pub definition: serde_json::Value,
    /// Visibility (private, public)
    pub scope: String,
    /// Creation timestamp (RFC3339)
    pub created_at: String,
    /// Last update timestamp (RFC3339)
    pub updated_at: String,
}

impl From<WorkflowDefinition> for WorkflowResponse {
    fn from(def: WorkflowDefinition) -> Self {
        WorkflowResponse {
            id: def.id,
            name: def.name,
            definition: def.definition,
            scope: def.scope,
            created_at: def.created_at.to_rfc3339(),
            updated_at: def.updated_at.to_rfc3339(),
        }
    }
}

/// Register a workflow definition
#[utoipa::path(
    post,
    path = "/v2/workflows",
    tag = "Workflows",
    request_body = RegisterWorkflowRequest,
    params(
        ("X-Project-ID" = String, Header, description = "Project ID")
    ),
    responses(
        (status = 201, description = "Workflow registered", body = WorkflowResponse),
        (status = 409, description = "Workflow name already taken"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_workflow(
    State(state): State<Arc<AppState>>,
    ProjectId(project_id): ProjectId,
    Json(request): Json<RegisterWorkflowRequest>,
) -> Result<(StatusCode, Json<WorkflowResponse>), SchedulerError> {
    tracing::info!("Registering workflow definition: {}", request.name);

    let definition = state
        .db
        .register_workflow_definition(&request.name, &request.definition, &project_id)
        .await?;

    Ok((StatusCode::CREATED, Json(definition.into())))
}

/// Get a workflow definition by id or name
#[utoipa::path(
    get,
    path = "/v2/workflows/{identifier}",
    tag = "Workflows",
    params(
        ("identifier" = String, Path, description = "Workflow id or name"),
        ("X-Project-ID" = String, Header, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Workflow definition", body = WorkflowResponse),
        (status = 404, description = "Workflow not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_workflow(
    State(state): State<Arc<AppState>>,
    ProjectId(project_id): ProjectId,
    Path(identifier): Path<String>,
) -> Result<Json<WorkflowResponse>, SchedulerError> {
    let definition = state
        .db
        .get_workflow_definition(&identifier, &ProjectScope::Project(project_id))
        .await?;

    Ok(Json(definition.into()))
}
