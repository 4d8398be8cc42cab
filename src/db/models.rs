use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DelayTolerantWorkload {
  pub id: Uuid,
  pub name: String,
  pub workflow_name: String,
  pub workflow_id: String,
  pub workflow_input: serde_json::Value,
  pub workflow_params: serde_json::Value,
  pub deadline: DateTime<Utc>,
  pub job_duration: Option<i32>, // minutes
  pub scope: String,             // "private" or "public"
  pub executed: bool,
  pub scheduled: bool,
  pub trust_id: Option<String>,
  pub project_id: Uuid,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CronTrigger {
  pub id: Uuid,
  pub name: String,
  pub pattern: Option<String>, // 5-field cron; None for one-shot triggers
  pub next_execution_time: DateTime<Utc>,
  pub remaining_executions: Option<i32>, // None = unbounded
  pub workflow_id: Option<String>,
  pub workflow_name: String,
  pub workflow_input: serde_json::Value,
  pub workflow_params: serde_json::Value,
  pub trust_id: Option<String>,
  pub project_id: Uuid,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkflowDefinition {
  pub id: String,
  pub name: String,
  pub definition: serde_json::Value,
  pub scope: String,
  pub project_id: Uuid,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
