// Delay tolerant workload store
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::db::common::{is_unique_violation, ProjectScope};
use crate::db::{models::DelayTolerantWorkload, Database};
use crate::error::SchedulerError;

/// Insert values for a new workload. Flags always start false; the trust
/// id is filled in by the security seam before insertion.
#[derive(Debug, Clone)]
pub struct NewWorkload {
  pub name: String,
  pub workflow_name: String,
  pub workflow_id: String,
  pub workflow_input: serde_json::Value,
  pub workflow_params: serde_json::Value,
  pub deadline: DateTime<Utc>,
  pub job_duration: Option<i32>,
  pub scope: String,
  pub trust_id: Option<String>,
  pub project_id: Uuid,
}

/// Optional filters for the list endpoint.
#[derive(Debug, Default)]
pub struct WorkloadFilters {
  pub name: Option<String>,
  pub workflow_name: Option<String>,
  pub scope: Option<String>,
  pub limit: Option<i64>,
  pub offset: Option<i64>,
}

/// Insert a workload inside an open transaction. Used by the creation
/// service so definition resolution, validation and insertion commit
/// atomically.
pub async fn create_workload_in_tx(
  tx: &mut Transaction<'_, Postgres>,
  values: &NewWorkload,
) -> Result<DelayTolerantWorkload, SchedulerError> {
  let result = sqlx::query_as::<_, DelayTolerantWorkload>(
    "INSERT INTO delay_tolerant_workloads
       (id, name, workflow_name, workflow_id, workflow_input, workflow_params,
        deadline, job_duration, scope, executed, scheduled, trust_id, project_id,
        created_at, updated_at)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, FALSE, FALSE, $10, $11, NOW(), NOW())
     RETURNING id, name, workflow_name, workflow_id, workflow_input, workflow_params,
               deadline, job_duration, scope, executed, scheduled, trust_id, project_id,
               created_at, updated_at",
  )
  .bind(Uuid::new_v4())
  .bind(&values.name)
  .bind(&values.workflow_name)
  .bind(&values.workflow_id)
  .bind(&values.workflow_input)
  .bind(&values.workflow_params)
  .bind(values.deadline)
  .bind(values.job_duration)
  .bind(&values.scope)
  .bind(&values.trust_id)
  .bind(values.project_id)
  .fetch_one(&mut **tx)
  .await;

  result.map_err(|e| {
    if is_unique_violation(&e) {
      SchedulerError::Duplicate(format!(
        "Duplicate entry for delay tolerant workload '{}'",
        values.name
      ))
    } else {
      SchedulerError::Database(e)
    }
  })
}

impl Database {
  pub async fn get_workload(
    &self,
    name: &str,
    scope: &ProjectScope,
  ) -> Result<DelayTolerantWorkload, SchedulerError> {
    let query = match scope {
      ProjectScope::Project(project_id) => sqlx::query_as::<_, DelayTolerantWorkload>(
        "SELECT id, name, workflow_name, workflow_id, workflow_input, workflow_params,
                deadline, job_duration, scope, executed, scheduled, trust_id, project_id,
                created_at, updated_at
         FROM delay_tolerant_workloads
         WHERE name = $1 AND (project_id = $2 OR scope = 'public')",
      )
      .bind(name)
      .bind(project_id),
      ProjectScope::Insecure => sqlx::query_as::<_, DelayTolerantWorkload>(
        "SELECT id, name, workflow_name, workflow_id, workflow_input, workflow_params,
                deadline, job_duration, scope, executed, scheduled, trust_id, project_id,
                created_at, updated_at
         FROM delay_tolerant_workloads
         WHERE name = $1",
      )
      .bind(name),
    };

    query.fetch_optional(&self.pool).await?.ok_or_else(|| {
      SchedulerError::NotFound(format!("Delay tolerant workload not found [name={}]", name))
    })
  }

  pub async fn list_workloads(
    &self,
    filters: &WorkloadFilters,
    project_id: &Uuid,
  ) -> Result<Vec<DelayTolerantWorkload>, SchedulerError> {
    let workloads = sqlx::query_as::<_, DelayTolerantWorkload>(
      "SELECT id, name, workflow_name, workflow_id, workflow_input, workflow_params,
              deadline, job_duration, scope, executed, scheduled, trust_id, project_id,
              created_at, updated_at
       FROM delay_tolerant_workloads
       WHERE (project_id = $1 OR scope = 'public')
         AND ($2::text IS NULL OR name = $2)
         AND ($3::text IS NULL OR workflow_name = $3)
         AND ($4::text IS NULL OR scope = $4)
       ORDER BY created_at ASC
       LIMIT COALESCE($5, 100) OFFSET COALESCE($6, 0)",
    )
    .bind(project_id)
    .bind(filters.name.as_deref())
    .bind(filters.workflow_name.as_deref())
    .bind(filters.scope.as_deref())
    .bind(filters.limit)
    .bind(filters.offset)
    .fetch_all(&self.pool)
    .await?;

    Ok(workloads)
  }

  pub async fn delete_workload(
    &self,
    name: &str,
    project_id: &Uuid,
  ) -> Result<u64, SchedulerError> {
    let result = sqlx::query(
      "DELETE FROM delay_tolerant_workloads WHERE name = $1 AND project_id = $2",
    )
    .bind(name)
    .bind(project_id)
    .execute(&self.pool)
    .await?;

    Ok(result.rows_affected())
  }

  /// Workloads by executed flag, unscoped. `false` yields the unscheduled
  /// set the periodic loop works through; a workload deferred to a cron
  /// trigger stays in the set (executed is still false) until the trigger
  /// fires.
  pub async fn get_workloads_by_executed_flag(
    &self,
    executed: bool,
  ) -> Result<Vec<DelayTolerantWorkload>, SchedulerError> {
    let workloads = sqlx::query_as::<_, DelayTolerantWorkload>(
      "SELECT id, name, workflow_name, workflow_id, workflow_input, workflow_params,
              deadline, job_duration, scope, executed, scheduled, trust_id, project_id,
              created_at, updated_at
       FROM delay_tolerant_workloads
       WHERE executed = $1
       ORDER BY created_at ASC",
    )
    .bind(executed)
    .fetch_all(&self.pool)
    .await?;

    Ok(workloads)
  }

  /// Flip executed false -> true. The flag in the WHERE clause is the
  /// claim: with several runner replicas racing on the same workload, at
  /// most one update reports a row.
  pub async fn mark_workload_executed(&self, id: Uuid) -> Result<u64, SchedulerError> {
    let result = sqlx::query(
      "UPDATE delay_tolerant_workloads
       SET executed = TRUE, updated_at = NOW()
       WHERE id = $1 AND executed = FALSE",
    )
    .bind(id)
    .execute(&self.pool)
    .await?;

    Ok(result.rows_affected())
  }

  /// Executed claim keyed by (name, project). Used by the cron loop when
  /// a trigger parked by a placement policy fires; a trigger that does
  /// not belong to a workload simply matches no row.
  pub async fn mark_workload_executed_by_name(
    &self,
    name: &str,
    project_id: &Uuid,
  ) -> Result<u64, SchedulerError> {
    let result = sqlx::query(
      "UPDATE delay_tolerant_workloads
       SET executed = TRUE, updated_at = NOW()
       WHERE name = $1 AND project_id = $2 AND executed = FALSE",
    )
    .bind(name)
    .bind(project_id)
    .execute(&self.pool)
    .await?;

    Ok(result.rows_affected())
  }

  /// Flip scheduled false -> true, same claim semantics as
  /// `mark_workload_executed`.
  pub async fn mark_workload_scheduled(&self, id: Uuid) -> Result<u64, SchedulerError> {
    let result = sqlx::query(
      "UPDATE delay_tolerant_workloads
       SET scheduled = TRUE, updated_at = NOW()
       WHERE id = $1 AND scheduled = FALSE",
    )
    .bind(id)
    .execute(&self.pool)
    .await?;

    Ok(result.rows_affected())
  }
}
