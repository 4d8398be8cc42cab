// Cron trigger store and advancer
use chrono::{DateTime, Utc};
use std::str::FromStr;
use uuid::Uuid;

use crate::db::common::is_unique_violation;
use crate::db::{models::CronTrigger, Database};
use crate::error::SchedulerError;

#[derive(Debug, Clone)]
pub struct NewCronTrigger {
  pub name: String,
  pub pattern: Option<String>,
  pub next_execution_time: DateTime<Utc>,
  pub remaining_executions: Option<i32>,
  pub workflow_id: Option<String>,
  pub workflow_name: String,
  pub workflow_input: serde_json::Value,
  pub workflow_params: serde_json::Value,
  pub trust_id: Option<String>,
  pub project_id: Uuid,
}

/// Next fire time of a 5-field cron pattern strictly after `after`.
pub fn next_fire_time(
  pattern: &str,
  after: DateTime<Utc>,
) -> Result<DateTime<Utc>, SchedulerError> {
  let schedule = parse_pattern(pattern)?;

  schedule.after(&after).next().ok_or_else(|| {
    SchedulerError::InvalidModel(format!(
      "Cron pattern '{}' has no fire time after {}",
      pattern, after
    ))
  })
}

fn parse_pattern(pattern: &str) -> Result<cron::Schedule, SchedulerError> {
  let parts: Vec<&str> = pattern.split_whitespace().collect();
  if parts.len() != 5 {
    return Err(SchedulerError::InvalidModel(
      "Invalid cron pattern. Must have 5 fields: minute hour day month weekday".to_string(),
    ));
  }

  // The cron crate expects a seconds field.
  let with_seconds = format!("0 {}", pattern);
  cron::Schedule::from_str(&with_seconds)
    .map_err(|e| SchedulerError::InvalidModel(format!("Invalid cron pattern '{}': {}", pattern, e)))
}

impl Database {
  pub async fn create_cron_trigger(
    &self,
    values: &NewCronTrigger,
  ) -> Result<CronTrigger, SchedulerError> {
    if let Some(pattern) = values.pattern.as_deref() {
      parse_pattern(pattern)?;
    }

    let result = sqlx::query_as::<_, CronTrigger>(
      "INSERT INTO cron_triggers
         (id, name, pattern, next_execution_time, remaining_executions, workflow_id,
          workflow_name, workflow_input, workflow_params, trust_id, project_id,
          created_at, updated_at)
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), NOW())
       RETURNING id, name, pattern, next_execution_time, remaining_executions, workflow_id,
                 workflow_name, workflow_input, workflow_params, trust_id, project_id,
                 created_at, updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(&values.name)
    .bind(&values.pattern)
    .bind(values.next_execution_time)
    .bind(values.remaining_executions)
    .bind(&values.workflow_id)
    .bind(&values.workflow_name)
    .bind(&values.workflow_input)
    .bind(&values.workflow_params)
    .bind(&values.trust_id)
    .bind(values.project_id)
    .fetch_one(&self.pool)
    .await;

    result.map_err(|e| {
      if is_unique_violation(&e) {
        SchedulerError::Duplicate(format!("Duplicate entry for cron trigger '{}'", values.name))
      } else {
        SchedulerError::Database(e)
      }
    })
  }

  pub async fn get_cron_trigger(
    &self,
    name: &str,
    project_id: &Uuid,
  ) -> Result<CronTrigger, SchedulerError> {
    sqlx::query_as::<_, CronTrigger>(
      "SELECT id, name, pattern, next_execution_time, remaining_executions, workflow_id,
              workflow_name, workflow_input, workflow_params, trust_id, project_id,
              created_at, updated_at
       FROM cron_triggers
       WHERE name = $1 AND project_id = $2",
    )
    .bind(name)
    .bind(project_id)
    .fetch_optional(&self.pool)
    .await?
    .ok_or_else(|| SchedulerError::NotFound(format!("Cron trigger not found [name={}]", name)))
  }

  /// Triggers due at `now`, oldest first. Unscoped; the cron loop runs
  /// across all projects.
  pub async fn get_next_cron_triggers(
    &self,
    now: DateTime<Utc>,
  ) -> Result<Vec<CronTrigger>, SchedulerError> {
    let triggers = sqlx::query_as::<_, CronTrigger>(
      "SELECT id, name, pattern, next_execution_time, remaining_executions, workflow_id,
              workflow_name, workflow_input, workflow_params, trust_id, project_id,
              created_at, updated_at
       FROM cron_triggers
       WHERE next_execution_time < $1
       ORDER BY next_execution_time ASC",
    )
    .bind(now)
    .fetch_all(&self.pool)
    .await?;

    Ok(triggers)
  }

  /// Move a trigger to its next firing, or delete it when its execution
  /// count runs out. Returns true only when this caller committed the
  /// transition; concurrent advancers racing on the same pre-advance
  /// `next_execution_time` lose the conditional update (or the delete)
  /// and get false. A trigger that vanished between list and advance is
  /// also false, not an error.
  pub async fn advance_cron_trigger(&self, t: &CronTrigger) -> Result<bool, SchedulerError> {
    let remaining = t
      .remaining_executions
      .map(|r| if r > 0 { r - 1 } else { r });

    if remaining == Some(0) {
      let result = sqlx::query("DELETE FROM cron_triggers WHERE id = $1")
        .bind(t.id)
        .execute(&self.pool)
        .await?;

      return Ok(result.rows_affected() == 1);
    }

    let pattern = t.pattern.as_deref().ok_or_else(|| {
      SchedulerError::InvalidModel(format!(
        "Cron trigger '{}' has no pattern and no remaining executions to advance",
        t.name
      ))
    })?;

    let next = next_fire_time(pattern, t.next_execution_time)?;

    let result = sqlx::query(
      "UPDATE cron_triggers
       SET next_execution_time = $1, remaining_executions = $2, updated_at = NOW()
       WHERE id = $3 AND next_execution_time = $4",
    )
    .bind(next)
    .bind(remaining)
    .bind(t.id)
    .bind(t.next_execution_time)
    .execute(&self.pool)
    .await?;

    Ok(result.rows_affected() == 1)
  }

  pub async fn delete_cron_trigger(
    &self,
    name: &str,
    project_id: &Uuid,
  ) -> Result<u64, SchedulerError> {
    let result = sqlx::query("DELETE FROM cron_triggers WHERE name = $1 AND project_id = $2")
      .bind(name)
      .bind(project_id)
      .execute(&self.pool)
      .await?;

    Ok(result.rows_affected())
  }
}
