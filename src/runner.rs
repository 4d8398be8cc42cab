// Periodic scheduler loops: cron trigger advancement and delay tolerant
// workload placement.
use chrono::Utc;
use std::sync::Arc;

use crate::error::SchedulerError;
use crate::policy::{
    EnergyAwarePolicy, ImmediatePolicy, LastMinutePolicy, PlacementPolicy, SchedulerMode,
};
use crate::security;
use crate::AppState;

/// One pass over the due cron triggers. Each trigger is advanced first;
/// only the worker whose advance committed dispatches the workflow, so a
/// firing starts at most once across runner replicas. Item failures are
/// logged and never abort the pass.
pub async fn process_cron_triggers(state: &AppState) -> Result<(), SchedulerError> {
    let triggers = state.db_bg.get_next_cron_triggers(Utc::now()).await?;

    for t in triggers {
        tracing::debug!("Processing cron trigger: {}", t.name);

        let ctx = security::create_context(t.trust_id.clone(), t.project_id);

        let advanced = match state.db_bg.advance_cron_trigger(&t).await {
            Ok(advanced) => advanced,
            Err(e) => {
                tracing::error!("Failed to advance cron trigger {}: {}", t.name, e);
                continue;
            }
        };

        if !advanced {
            // Another worker won this firing, or the trigger vanished.
            continue;
        }

        // A one-shot trigger parked by a placement policy carries its
        // workload's name; firing it executes the workload.
        if let Err(e) = state
            .db_bg
            .mark_workload_executed_by_name(&t.name, &t.project_id)
            .await
        {
            tracing::error!(
                "Failed to mark workload executed for cron trigger {}: {}",
                t.name,
                e
            );
        }

        tracing::debug!(
            "Starting workflow '{}' by cron trigger '{}'",
            t.workflow_name,
            t.name
        );

        if let Err(e) = state
            .engine
            .start_workflow(
                &ctx,
                &t.workflow_name,
                &t.workflow_input,
                &t.workflow_params,
                "Workflow execution created by cron trigger.",
            )
            .await
        {
            tracing::error!("Failed to process cron trigger {}: {}", t.name, e);
        }
    }

    Ok(())
}

/// One pass over the unscheduled workload set with the configured
/// placement policy. An unknown mode fails the tick before any item is
/// touched; per-item failures are contained.
pub async fn process_delay_tolerant_workloads(state: &AppState) -> Result<(), SchedulerError> {
    let mode = state.config.resolve_scheduler_mode()?;

    let policy: Box<dyn PlacementPolicy> = match mode {
        SchedulerMode::Immediately => Box::new(ImmediatePolicy),
        SchedulerMode::LastMinute => Box::new(LastMinutePolicy),
        SchedulerMode::EnergyAware => Box::new(EnergyAwarePolicy),
    };

    for workload in state.db_bg.get_workloads_by_executed_flag(false).await? {
        tracing::debug!("Processing delay tolerant workload: {}", workload.name);

        let ctx = security::create_context(workload.trust_id.clone(), workload.project_id);

        if let Err(e) = policy.handle(state, &ctx, &workload).await {
            tracing::error!(
                "Failed to process delay tolerant workload {}: {}",
                workload.name,
                e
            );
        }
    }

    Ok(())
}

/// Spawn the two scheduler loops. Each runs its body immediately, then
/// once a second; a task body never overlaps itself. The loops query the
/// stores unscoped and take per-item identities inside.
pub fn spawn_periodic_tasks(state: Arc<AppState>) {
    let cron_state = state.clone();
    tokio::spawn(async move {
        loop {
            if let Err(e) = process_cron_triggers(&cron_state).await {
                tracing::error!("Cron trigger tick failed: {}", e);
            }
            tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
        }
    });

    let workload_state = state;
    tokio::spawn(async move {
        loop {
            if let Err(e) = process_delay_tolerant_workloads(&workload_state).await {
                tracing::error!("Delay tolerant workload tick failed: {}", e);
            }
            tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
        }
    });
}
