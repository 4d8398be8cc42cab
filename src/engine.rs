// Workflow engine dispatch adapter.
use axum::async_trait;
use serde::Serialize;
use tokio::time::Duration;

use crate::error::SchedulerError;
use crate::security::IdentityContext;

/// The engine RPC seam. The scheduler only ever starts workflows; tests
/// substitute a recording implementation.
#[async_trait]
pub trait EngineClient: Send + Sync {
    async fn start_workflow(
        &self,
        ctx: &IdentityContext,
        workflow_name: &str,
        workflow_input: &serde_json::Value,
        workflow_params: &serde_json::Value,
        description: &str,
    ) -> Result<(), SchedulerError>;
}

#[derive(Serialize)]
struct StartWorkflowRequest<'a> {
    workflow_name: &'a str,
    workflow_input: &'a serde_json::Value,
    workflow_params: &'a serde_json::Value,
    description: &'a str,
}

pub struct HttpEngineClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpEngineClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EngineClient for HttpEngineClient {
    async fn start_workflow(
        &self,
        ctx: &IdentityContext,
        workflow_name: &str,
        workflow_input: &serde_json::Value,
        workflow_params: &serde_json::Value,
        description: &str,
    ) -> Result<(), SchedulerError> {
        let payload = StartWorkflowRequest {
            workflow_name,
            workflow_input,
            workflow_params,
            description,
        };

        let mut request = self
            .client
            .post(format!("{}/v2/executions", self.base_url))
            .timeout(Duration::from_secs(10))
            .json(&payload);

        // Identity travels as ambient headers; the engine resolves the
        // delegated tenant from them.
        if let Some(trust_id) = &ctx.trust_id {
            request = request.header("X-Trust-ID", trust_id);
        }
        if let Some(project_id) = &ctx.project_id {
            request = request.header("X-Project-ID", project_id.to_string());
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(SchedulerError::Transport(format!(
                "Engine returned status {} for workflow '{}'",
                response.status(),
                workflow_name
            )));
        }

        Ok(())
    }
}
