// Integration tests for the delay tolerant workload store
use crate::common::setup_test_db;
use chrono::{Duration, Utc};
use uuid::Uuid;

use dtw_scheduler::db::common::ProjectScope;
use dtw_scheduler::db::workloads::{create_workload_in_tx, NewWorkload, WorkloadFilters};
use dtw_scheduler::db::{Database, DelayTolerantWorkload};
use dtw_scheduler::error::SchedulerError;

fn workload_values(project_id: Uuid) -> NewWorkload {
  NewWorkload {
    name: format!("dtw-{}", Uuid::new_v4()),
    workflow_name: "my_wf".to_string(),
    workflow_id: Uuid::new_v4().to_string(),
    workflow_input: serde_json::json!({}),
    workflow_params: serde_json::json!({}),
    deadline: Utc::now() + Duration::hours(2),
    job_duration: Some(60),
    scope: "private".to_string(),
    trust_id: None,
    project_id,
  }
}

async fn insert_workload(db: &Database, values: &NewWorkload) -> DelayTolerantWorkload {
  let mut tx = db.pool.begin().await.expect("Failed to open transaction");
  let workload = create_workload_in_tx(&mut tx, values)
    .await
    .expect("Failed to create workload");
  tx.commit().await.expect("Failed to commit");
  workload
}

#[tokio::test]
async fn test_create_and_get_workload() {
  let db = setup_test_db()
    .await
    .expect("Failed to setup test database");

  let project_id = Uuid::new_v4();
  let values = workload_values(project_id);
  let created = insert_workload(&db, &values).await;

  assert_eq!(created.name, values.name);
  assert!(!created.executed);
  assert!(!created.scheduled);
  assert_eq!(created.scope, "private");

  let fetched = db
    .get_workload(&values.name, &ProjectScope::Project(project_id))
    .await
    .expect("Failed to get workload");
  assert_eq!(fetched.id, created.id);
}

#[tokio::test]
async fn test_duplicate_workload_name_rejected() {
  let db = setup_test_db()
    .await
    .expect("Failed to setup test database");

  let values = workload_values(Uuid::new_v4());
  insert_workload(&db, &values).await;

  let mut tx = db.pool.begin().await.expect("Failed to open transaction");
  let err = create_workload_in_tx(&mut tx, &values)
    .await
    .expect_err("Duplicate name must be rejected");
  assert!(matches!(err, SchedulerError::Duplicate(_)));
}

#[tokio::test]
async fn test_private_workload_hidden_from_other_projects() {
  let db = setup_test_db()
    .await
    .expect("Failed to setup test database");

  let values = workload_values(Uuid::new_v4());
  insert_workload(&db, &values).await;

  let other_project = Uuid::new_v4();
  let err = db
    .get_workload(&values.name, &ProjectScope::Project(other_project))
    .await
    .expect_err("Private workload must not be visible to other projects");
  assert!(matches!(err, SchedulerError::NotFound(_)));

  // Unscoped access still sees it
  db.get_workload(&values.name, &ProjectScope::Insecure)
    .await
    .expect("Insecure scope must see the workload");
}

#[tokio::test]
async fn test_public_workload_visible_across_projects() {
  let db = setup_test_db()
    .await
    .expect("Failed to setup test database");

  let mut values = workload_values(Uuid::new_v4());
  values.scope = "public".to_string();
  insert_workload(&db, &values).await;

  let other_project = Uuid::new_v4();
  db.get_workload(&values.name, &ProjectScope::Project(other_project))
    .await
    .expect("Public workload must be visible to other projects");
}

#[tokio::test]
async fn test_list_workloads_with_name_filter() {
  let db = setup_test_db()
    .await
    .expect("Failed to setup test database");

  let project_id = Uuid::new_v4();
  let values = workload_values(project_id);
  insert_workload(&db, &values).await;
  insert_workload(&db, &workload_values(project_id)).await;

  let filters = WorkloadFilters {
    name: Some(values.name.clone()),
    ..Default::default()
  };
  let listed = db
    .list_workloads(&filters, &project_id)
    .await
    .expect("Failed to list workloads");

  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].name, values.name);

  // Restrict to private rows: public workloads from other projects are
  // visible in an unfiltered listing.
  let all = db
    .list_workloads(
      &WorkloadFilters {
        scope: Some("private".to_string()),
        ..Default::default()
      },
      &project_id,
    )
    .await
    .expect("Failed to list workloads");
  assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_executed_flag_claim_commits_once() {
  let db = setup_test_db()
    .await
    .expect("Failed to setup test database");

  let values = workload_values(Uuid::new_v4());
  let created = insert_workload(&db, &values).await;

  // Two workers racing on the same workload: only the first claim lands
  let first = db
    .mark_workload_executed(created.id)
    .await
    .expect("Failed to mark executed");
  let second = db
    .mark_workload_executed(created.id)
    .await
    .expect("Failed to mark executed");

  assert_eq!(first, 1);
  assert_eq!(second, 0);

  let fetched = db
    .get_workload(&values.name, &ProjectScope::Insecure)
    .await
    .expect("Failed to get workload");
  assert!(fetched.executed);
}

#[tokio::test]
async fn test_scheduled_flag_claim_commits_once() {
  let db = setup_test_db()
    .await
    .expect("Failed to setup test database");

  let values = workload_values(Uuid::new_v4());
  let created = insert_workload(&db, &values).await;

  let first = db
    .mark_workload_scheduled(created.id)
    .await
    .expect("Failed to mark scheduled");
  let second = db
    .mark_workload_scheduled(created.id)
    .await
    .expect("Failed to mark scheduled");

  assert_eq!(first, 1);
  assert_eq!(second, 0);
}

#[tokio::test]
async fn test_executed_claim_by_name_is_project_scoped() {
  let db = setup_test_db()
    .await
    .expect("Failed to setup test database");

  let values = workload_values(Uuid::new_v4());
  insert_workload(&db, &values).await;

  let wrong_project = db
    .mark_workload_executed_by_name(&values.name, &Uuid::new_v4())
    .await
    .expect("Failed to mark executed");
  assert_eq!(wrong_project, 0);

  let right_project = db
    .mark_workload_executed_by_name(&values.name, &values.project_id)
    .await
    .expect("Failed to mark executed");
  assert_eq!(right_project, 1);
}

#[tokio::test]
async fn test_unscheduled_set_tracks_executed_flag() {
  let db = setup_test_db()
    .await
    .expect("Failed to setup test database");

  let values = workload_values(Uuid::new_v4());
  let created = insert_workload(&db, &values).await;

  let unscheduled = db
    .get_workloads_by_executed_flag(false)
    .await
    .expect("Failed to query unscheduled set");
  assert!(unscheduled.iter().any(|w| w.id == created.id));

  db.mark_workload_executed(created.id)
    .await
    .expect("Failed to mark executed");

  let unscheduled = db
    .get_workloads_by_executed_flag(false)
    .await
    .expect("Failed to query unscheduled set");
  assert!(!unscheduled.iter().any(|w| w.id == created.id));
}

#[tokio::test]
async fn test_delete_workload() {
  let db = setup_test_db()
    .await
    .expect("Failed to setup test database");

  let values = workload_values(Uuid::new_v4());
  insert_workload(&db, &values).await;

  let deleted = db
    .delete_workload(&values.name, &values.project_id)
    .await
    .expect("Failed to delete workload");
  assert_eq!(deleted, 1);

  let deleted_again = db
    .delete_workload(&values.name, &values.project_id)
    .await
    .expect("Failed to delete workload");
  assert_eq!(deleted_again, 0);
}
