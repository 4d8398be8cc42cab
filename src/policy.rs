// Placement policies: per-workload dispatch-now-or-defer decisions.
use axum::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::str::FromStr;

use crate::db::triggers::NewCronTrigger;
use crate::db::DelayTolerantWorkload;
use crate::error::SchedulerError;
use crate::oracle::PriceOracle;
use crate::security::IdentityContext;
use crate::solver;
use crate::AppState;

/// Jobs longer than this many minutes are not worth deferring for price;
/// the energy-aware policy dispatches them immediately.
const LONG_TERM_THRESHOLD_MINUTES: i32 = 360;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerMode {
    Immediately,
    LastMinute,
    EnergyAware,
}

impl FromStr for SchedulerMode {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "immediately" => Ok(SchedulerMode::Immediately),
            "last-minute" => Ok(SchedulerMode::LastMinute),
            "energy-aware" => Ok(SchedulerMode::EnergyAware),
            other => Err(SchedulerError::Config(format!(
                "Unknown dtw scheduler mode '{}'",
                other
            ))),
        }
    }
}

/// One decision per workload. Implementations must claim the relevant
/// flag via its conditional update before acting, and treat a lost claim
/// as another worker having handled the item.
#[async_trait]
pub trait PlacementPolicy: Send + Sync {
    async fn handle(
        &self,
        state: &AppState,
        ctx: &IdentityContext,
        workload: &DelayTolerantWorkload,
    ) -> Result<(), SchedulerError>;
}

pub struct ImmediatePolicy;
pub struct LastMinutePolicy;
pub struct EnergyAwarePolicy;

/// Claim the executed flag, then hand the workload to the engine. The
/// flag flips before dispatch; a dispatch failure leaves the workload
/// marked executed and needs operator intervention.
async fn execute_workload(
    state: &AppState,
    ctx: &IdentityContext,
    workload: &DelayTolerantWorkload,
) -> Result<(), SchedulerError> {
    let claimed = state.db_bg.mark_workload_executed(workload.id).await?;
    if claimed == 0 {
        tracing::debug!(
            "Delay tolerant workload '{}' already claimed by another worker",
            workload.name
        );
        return Ok(());
    }

    state
        .engine
        .start_workflow(
            ctx,
            &workload.workflow_name,
            &workload.workflow_input,
            &workload.workflow_params,
            "DTW Workflow execution created.",
        )
        .await
}

/// Claim the scheduled flag and park the workload behind a one-shot cron
/// trigger firing at `start_time`.
async fn defer_workload(
    state: &AppState,
    workload: &DelayTolerantWorkload,
    start_time: DateTime<Utc>,
) -> Result<(), SchedulerError> {
    let claimed = state.db_bg.mark_workload_scheduled(workload.id).await?;
    if claimed == 0 {
        tracing::debug!(
            "Delay tolerant workload '{}' already scheduled by another worker",
            workload.name
        );
        return Ok(());
    }

    state
        .db_bg
        .create_cron_trigger(&NewCronTrigger {
            name: workload.name.clone(),
            pattern: None,
            next_execution_time: start_time,
            remaining_executions: Some(1),
            workflow_id: Some(workload.workflow_id.clone()),
            workflow_name: workload.workflow_name.clone(),
            workflow_input: workload.workflow_input.clone(),
            workflow_params: workload.workflow_params.clone(),
            trust_id: workload.trust_id.clone(),
            project_id: workload.project_id,
        })
        .await?;

    tracing::info!(
        "Deferred delay tolerant workload '{}' to {}",
        workload.name,
        start_time
    );

    Ok(())
}

fn job_duration_minutes(workload: &DelayTolerantWorkload) -> Result<i32, SchedulerError> {
    workload.job_duration.ok_or_else(|| {
        SchedulerError::InvalidModel(format!(
            "Delay tolerant workload '{}' has no job duration and cannot be deferred",
            workload.name
        ))
    })
}

#[async_trait]
impl PlacementPolicy for ImmediatePolicy {
    async fn handle(
        &self,
        state: &AppState,
        ctx: &IdentityContext,
        workload: &DelayTolerantWorkload,
    ) -> Result<(), SchedulerError> {
        execute_workload(state, ctx, workload).await
    }
}

#[async_trait]
impl PlacementPolicy for LastMinutePolicy {
    async fn handle(
        &self,
        state: &AppState,
        _ctx: &IdentityContext,
        workload: &DelayTolerantWorkload,
    ) -> Result<(), SchedulerError> {
        // Latest admissible start: deadline less the job duration. The
        // duration is minutes everywhere in this system.
        let duration = job_duration_minutes(workload)?;
        let start_time = workload.deadline - Duration::minutes(duration as i64);

        defer_workload(state, workload, start_time).await
    }
}

#[async_trait]
impl PlacementPolicy for EnergyAwarePolicy {
    async fn handle(
        &self,
        state: &AppState,
        ctx: &IdentityContext,
        workload: &DelayTolerantWorkload,
    ) -> Result<(), SchedulerError> {
        let duration = job_duration_minutes(workload)?;

        if duration > LONG_TERM_THRESHOLD_MINUTES {
            return execute_workload(state, ctx, workload).await;
        }

        let start_time =
            determine_optimal_scheduling(&state.oracle, duration, workload.deadline).await?;

        defer_workload(state, workload, start_time).await
    }
}

/// Price-optimal start for a short job, or a near-immediate start when
/// the price oracle is unavailable.
pub async fn determine_optimal_scheduling(
    oracle: &PriceOracle,
    job_duration_minutes: i32,
    deadline: DateTime<Utc>,
) -> Result<DateTime<Utc>, SchedulerError> {
    let Some(prices) = oracle.get_prices().await else {
        return Ok(Utc::now() + Duration::minutes(2));
    };

    let now = Utc::now().naive_utc();
    solver::find_optimal_start_time(
        now,
        &prices,
        job_duration_minutes as i64,
        deadline.naive_utc(),
    )
    .map(|start| Utc.from_utc_datetime(&start))
    .ok_or_else(|| {
        SchedulerError::InvalidModel(format!(
            "No admissible start hour before deadline {}",
            deadline
        ))
    })
}
