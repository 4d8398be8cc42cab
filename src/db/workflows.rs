// Workflow definition store
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::db::common::{is_unique_violation, ProjectScope};
use crate::db::{models::WorkflowDefinition, Database};
use crate::error::SchedulerError;

/// Resolve a definition by id or by name within an open transaction.
pub async fn get_workflow_definition_in_tx(
  tx: &mut Transaction<'_, Postgres>,
  identifier: &str,
  scope: &ProjectScope,
) -> Result<WorkflowDefinition, SchedulerError> {
  let query = match scope {
    ProjectScope::Project(project_id) => sqlx::query_as::<_, WorkflowDefinition>(
      "SELECT id, name, definition, scope, project_id, created_at, updated_at
       FROM workflow_definitions
       WHERE (id = $1 OR name = $1) AND (project_id = $2 OR scope = 'public')",
    )
    .bind(identifier)
    .bind(project_id),
    ProjectScope::Insecure => sqlx::query_as::<_, WorkflowDefinition>(
      "SELECT id, name, definition, scope, project_id, created_at, updated_at
       FROM workflow_definitions
       WHERE (id = $1 OR name = $1)",
    )
    .bind(identifier),
  };

  query.fetch_optional(&mut **tx).await?.ok_or_else(|| {
    SchedulerError::NotFound(format!(
      "Workflow definition not found [identifier={}]",
      identifier
    ))
  })
}

impl Database {
  pub async fn register_workflow_definition(
    &self,
    name: &str,
    definition: &serde_json::Value,
    project_id: &Uuid,
  ) -> Result<WorkflowDefinition, SchedulerError> {
    let result = sqlx::query_as::<_, WorkflowDefinition>(
      "INSERT INTO workflow_definitions
         (id, name, definition, scope, project_id, created_at, updated_at)
       VALUES ($1, $2, $3, 'private', $4, NOW(), NOW())
       RETURNING id, name, definition, scope, project_id, created_at, updated_at",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(definition)
    .bind(project_id)
    .fetch_one(&self.pool)
    .await;

    result.map_err(|e| {
      if is_unique_violation(&e) {
        SchedulerError::Duplicate(format!("Duplicate entry for workflow definition '{}'", name))
      } else {
        SchedulerError::Database(e)
      }
    })
  }

  pub async fn get_workflow_definition(
    &self,
    identifier: &str,
    scope: &ProjectScope,
  ) -> Result<WorkflowDefinition, SchedulerError> {
    let query = match scope {
      ProjectScope::Project(project_id) => sqlx::query_as::<_, WorkflowDefinition>(
        "SELECT id, name, definition, scope, project_id, created_at, updated_at
         FROM workflow_definitions
         WHERE (id = $1 OR name = $1) AND (project_id = $2 OR scope = 'public')",
      )
      .bind(identifier)
      .bind(project_id),
      ProjectScope::Insecure => sqlx::query_as::<_, WorkflowDefinition>(
        "SELECT id, name, definition, scope, project_id, created_at, updated_at
         FROM workflow_definitions
         WHERE (id = $1 OR name = $1)",
      )
      .bind(identifier),
    };

    query.fetch_optional(&self.pool).await?.ok_or_else(|| {
      SchedulerError::NotFound(format!(
        "Workflow definition not found [identifier={}]",
        identifier
      ))
    })
  }
}
