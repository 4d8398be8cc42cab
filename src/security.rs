// Identity context and trust issuance.
//
// Identity is an external concern; this module only carries the delegated
// identity through the scheduler and issues opaque trust tokens at create
// time. Contexts are passed explicitly as call arguments, never stashed in
// ambient state.
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::workloads::NewWorkload;

#[derive(Debug, Clone)]
pub struct IdentityContext {
    pub trust_id: Option<String>,
    pub project_id: Option<Uuid>,
}

/// Per-item identity for a workload or trigger owned by a tenant. The
/// periodic loops themselves run unscoped (`ProjectScope::Insecure`) and
/// take one of these per item.
pub fn create_context(trust_id: Option<String>, project_id: Uuid) -> IdentityContext {
    IdentityContext {
        trust_id,
        project_id: Some(project_id),
    }
}

/// Issue a trust for the workload being created and record it in the
/// insert values. No-op when auth is disabled.
pub fn add_trust_id(config: &AppConfig, values: &mut NewWorkload) {
    if config.auth_enable {
        values.trust_id = Some(create_trust());
    }
}

fn create_trust() -> String {
    Uuid::new_v4().to_string()
}
