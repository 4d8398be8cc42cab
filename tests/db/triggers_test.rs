// Integration tests for the cron trigger store and advancer
use crate::common::setup_test_db;
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use dtw_scheduler::db::triggers::{next_fire_time, NewCronTrigger};
use dtw_scheduler::error::SchedulerError;

fn trigger_values(
  pattern: Option<&str>,
  next_execution_time: DateTime<Utc>,
  remaining_executions: Option<i32>,
) -> NewCronTrigger {
  NewCronTrigger {
    name: format!("trigger-{}", Uuid::new_v4()),
    pattern: pattern.map(|p| p.to_string()),
    next_execution_time,
    remaining_executions,
    workflow_id: Some(Uuid::new_v4().to_string()),
    workflow_name: "my_wf".to_string(),
    workflow_input: serde_json::json!({}),
    workflow_params: serde_json::json!({}),
    trust_id: None,
    project_id: Uuid::new_v4(),
  }
}

#[tokio::test]
async fn test_create_and_get_trigger() {
  let db = setup_test_db()
    .await
    .expect("Failed to setup test database");

  let values = trigger_values(None, Utc::now() + Duration::hours(1), Some(1));
  let created = db
    .create_cron_trigger(&values)
    .await
    .expect("Failed to create trigger");

  let fetched = db
    .get_cron_trigger(&values.name, &values.project_id)
    .await
    .expect("Failed to get trigger");

  assert_eq!(fetched.id, created.id);
  assert_eq!(fetched.remaining_executions, Some(1));
  assert!(fetched.pattern.is_none());
}

#[tokio::test]
async fn test_invalid_pattern_rejected() {
  let db = setup_test_db()
    .await
    .expect("Failed to setup test database");

  let values = trigger_values(Some("not a cron"), Utc::now(), None);
  let err = db
    .create_cron_trigger(&values)
    .await
    .expect_err("Invalid pattern must be rejected");
  assert!(matches!(err, SchedulerError::InvalidModel(_)));

  let values = trigger_values(Some("0 * * * * *"), Utc::now(), None);
  let err = db
    .create_cron_trigger(&values)
    .await
    .expect_err("Six-field pattern must be rejected");
  assert!(matches!(err, SchedulerError::InvalidModel(_)));
}

#[tokio::test]
async fn test_duplicate_trigger_name_rejected() {
  let db = setup_test_db()
    .await
    .expect("Failed to setup test database");

  let values = trigger_values(None, Utc::now() + Duration::hours(1), Some(1));
  db.create_cron_trigger(&values)
    .await
    .expect("Failed to create trigger");

  let err = db
    .create_cron_trigger(&values)
    .await
    .expect_err("Duplicate name must be rejected");
  assert!(matches!(err, SchedulerError::Duplicate(_)));
}

#[tokio::test]
async fn test_one_shot_advance_deletes_and_commits_once() {
  let db = setup_test_db()
    .await
    .expect("Failed to setup test database");

  let values = trigger_values(None, Utc::now() - Duration::minutes(1), Some(1));
  let trigger = db
    .create_cron_trigger(&values)
    .await
    .expect("Failed to create trigger");

  // Two advancers racing on the same pre-advance snapshot: exactly one wins
  let first = db
    .advance_cron_trigger(&trigger)
    .await
    .expect("Failed to advance trigger");
  let second = db
    .advance_cron_trigger(&trigger)
    .await
    .expect("Failed to advance trigger");

  assert!(first);
  assert!(!second);

  // Exhausted triggers are deleted, never observed at rest
  let err = db
    .get_cron_trigger(&values.name, &values.project_id)
    .await
    .expect_err("Exhausted trigger must be gone");
  assert!(matches!(err, SchedulerError::NotFound(_)));
}

#[tokio::test]
async fn test_recurring_advance_is_conditional_on_snapshot() {
  let db = setup_test_db()
    .await
    .expect("Failed to setup test database");

  let values = trigger_values(Some("*/5 * * * *"), Utc::now() - Duration::minutes(1), None);
  let trigger = db
    .create_cron_trigger(&values)
    .await
    .expect("Failed to create trigger");

  let first = db
    .advance_cron_trigger(&trigger)
    .await
    .expect("Failed to advance trigger");
  assert!(first);

  let advanced = db
    .get_cron_trigger(&values.name, &values.project_id)
    .await
    .expect("Failed to get trigger");
  assert!(advanced.next_execution_time > trigger.next_execution_time);
  assert!(advanced.remaining_executions.is_none());

  // Advancing again from the stale snapshot loses the conditional update
  let second = db
    .advance_cron_trigger(&trigger)
    .await
    .expect("Failed to advance trigger");
  assert!(!second);
}

#[tokio::test]
async fn test_advance_decrements_remaining_executions() {
  let db = setup_test_db()
    .await
    .expect("Failed to setup test database");

  let values = trigger_values(Some("0 * * * *"), Utc::now() - Duration::minutes(1), Some(3));
  let trigger = db
    .create_cron_trigger(&values)
    .await
    .expect("Failed to create trigger");

  let advanced = db
    .advance_cron_trigger(&trigger)
    .await
    .expect("Failed to advance trigger");
  assert!(advanced);

  let fetched = db
    .get_cron_trigger(&values.name, &values.project_id)
    .await
    .expect("Failed to get trigger");
  assert_eq!(fetched.remaining_executions, Some(2));
}

#[tokio::test]
async fn test_vanished_trigger_is_not_an_error() {
  let db = setup_test_db()
    .await
    .expect("Failed to setup test database");

  let values = trigger_values(Some("0 * * * *"), Utc::now() - Duration::minutes(1), None);
  let trigger = db
    .create_cron_trigger(&values)
    .await
    .expect("Failed to create trigger");

  db.delete_cron_trigger(&values.name, &values.project_id)
    .await
    .expect("Failed to delete trigger");

  // Deleted between list and advance: advanced = false, no error
  let advanced = db
    .advance_cron_trigger(&trigger)
    .await
    .expect("Vanished trigger must not be an error");
  assert!(!advanced);
}

#[tokio::test]
async fn test_due_triggers_ordered_by_next_execution_time() {
  let db = setup_test_db()
    .await
    .expect("Failed to setup test database");

  let later = trigger_values(None, Utc::now() - Duration::minutes(5), Some(1));
  let earlier = trigger_values(None, Utc::now() - Duration::minutes(10), Some(1));
  db.create_cron_trigger(&later)
    .await
    .expect("Failed to create trigger");
  db.create_cron_trigger(&earlier)
    .await
    .expect("Failed to create trigger");

  let due = db
    .get_next_cron_triggers(Utc::now())
    .await
    .expect("Failed to list due triggers");

  let pos_earlier = due.iter().position(|t| t.name == earlier.name);
  let pos_later = due.iter().position(|t| t.name == later.name);
  assert!(pos_earlier.expect("earlier trigger is due") < pos_later.expect("later trigger is due"));

  // Future triggers are not due
  let future = trigger_values(None, Utc::now() + Duration::hours(1), Some(1));
  db.create_cron_trigger(&future)
    .await
    .expect("Failed to create trigger");
  let due = db
    .get_next_cron_triggers(Utc::now())
    .await
    .expect("Failed to list due triggers");
  assert!(!due.iter().any(|t| t.name == future.name));
}

#[test]
fn test_next_fire_time_hourly_pattern() {
  let after = Utc.with_ymd_and_hms(2016, 7, 6, 10, 15, 0).single().expect("valid timestamp");
  let next = next_fire_time("0 * * * *", after).expect("pattern has a next fire time");
  let expected = Utc.with_ymd_and_hms(2016, 7, 6, 11, 0, 0).single().expect("valid timestamp");
  assert_eq!(next, expected);
}
