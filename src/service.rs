// Delay tolerant workload creation service.
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::common::ProjectScope;
use crate::db::workflows::get_workflow_definition_in_tx;
use crate::db::workloads::{create_workload_in_tx, NewWorkload};
use crate::db::{Database, DelayTolerantWorkload, WorkflowDefinition};
use crate::error::SchedulerError;
use crate::security;

/// Request to create a delay tolerant workload
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateWorkloadRequest {
    /// Workload name, unique within the project
    pub name: String,
    /// Workflow to run, by name (used when workflow_id is absent)
    pub workflow_name: Option<String>,
    /// Workflow to run, by id (preferred)
    pub workflow_id: Option<String>,
    /// Input handed to the workflow at dispatch
    pub workflow_input: Option<serde_json::Value>,
    /// Engine parameters handed to the workflow at dispatch
    pub workflow_params: Option<serde_json::Value>,
    /// Completion deadline, ISO 8601
    pub deadline: String,
    /// Estimated job duration in minutes
    pub job_duration: Option<i32>,
}

/// Validate, issue trust and persist a new workload. Definition
/// resolution, input validation and the insert share one transaction.
pub async fn create_delay_tolerant_workload(
    db: &Database,
    config: &AppConfig,
    project_id: Uuid,
    request: &CreateWorkloadRequest,
) -> Result<DelayTolerantWorkload, SchedulerError> {
    let deadline = parse_deadline(&request.deadline)?;

    if deadline < Utc::now() + Duration::seconds(60) {
        return Err(SchedulerError::InvalidModel(
            "deadline must be at least 1 minute in the future.".to_string(),
        ));
    }

    if let Some(duration) = request.job_duration {
        if duration < 1 {
            return Err(SchedulerError::InvalidModel(
                "job_duration must be at least 1 minute.".to_string(),
            ));
        }
    }

    let identifier = request
        .workflow_id
        .as_deref()
        .or(request.workflow_name.as_deref())
        .ok_or_else(|| {
            SchedulerError::InvalidModel(
                "Either workflow_id or workflow_name must be provided.".to_string(),
            )
        })?;

    let workflow_input = request
        .workflow_input
        .clone()
        .unwrap_or_else(|| serde_json::json!({}));

    let mut tx = db.pool.begin().await?;

    let definition =
        get_workflow_definition_in_tx(&mut tx, identifier, &ProjectScope::Project(project_id))
            .await?;

    validate_workflow_input(&definition, &workflow_input)?;

    let mut values = NewWorkload {
        name: request.name.clone(),
        workflow_name: definition.name.clone(),
        workflow_id: definition.id.clone(),
        workflow_input,
        workflow_params: request
            .workflow_params
            .clone()
            .unwrap_or_else(|| serde_json::json!({})),
        deadline,
        job_duration: request.job_duration,
        scope: "private".to_string(),
        trust_id: None,
        project_id,
    };

    security::add_trust_id(config, &mut values);

    let workload = create_workload_in_tx(&mut tx, &values).await?;

    tx.commit().await?;

    Ok(workload)
}

fn parse_deadline(raw: &str) -> Result<DateTime<Utc>, SchedulerError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    // Bare wall-clock timestamps without an offset are taken as UTC.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| SchedulerError::InvalidModel(format!("Unparseable deadline '{}': {}", raw, e)))
}

/// Check the provided input against the workflow definition's declared
/// inputs. The definition lists its inputs as an array of names, with
/// defaulted inputs written as single-entry objects:
/// `"input": ["host", {"timeout": 30}]`.
fn validate_workflow_input(
    definition: &WorkflowDefinition,
    workflow_input: &serde_json::Value,
) -> Result<(), SchedulerError> {
    let input = workflow_input.as_object().ok_or_else(|| {
        SchedulerError::InvalidModel("workflow_input must be a JSON object.".to_string())
    })?;

    let declared = match definition.definition.get("input") {
        Some(serde_json::Value::Array(entries)) => entries.as_slice(),
        _ => &[],
    };

    let mut known = Vec::new();
    let mut required = Vec::new();

    for entry in declared {
        match entry {
            serde_json::Value::String(name) => {
                known.push(name.as_str());
                required.push(name.as_str());
            }
            serde_json::Value::Object(with_default) => {
                known.extend(with_default.keys().map(|k| k.as_str()));
            }
            _ => {
                return Err(SchedulerError::InvalidModel(format!(
                    "Malformed input declaration in workflow '{}'",
                    definition.name
                )))
            }
        }
    }

    for name in &required {
        if !input.contains_key(*name) {
            return Err(SchedulerError::InvalidModel(format!(
                "Invalid input: missing required parameter '{}' for workflow '{}'",
                name, definition.name
            )));
        }
    }

    for key in input.keys() {
        if !known.contains(&key.as_str()) {
            return Err(SchedulerError::InvalidModel(format!(
                "Invalid input: unexpected parameter '{}' for workflow '{}'",
                key, definition.name
            )));
        }
    }

    Ok(())
}
