//! Permission probing for a single context.
//!
//! While a context is reachable, a [`PermissionProber`] evaluates a batch of
//! capability requests ("may I watch resource kind X") against an external
//! [`AccessReviewer`] and reports grouped verdicts. Verdicts are never merged
//! across rounds: starting a new round for a context invalidates the previous
//! prober and replaces its verdicts wholesale.

mod prober;
pub use prober::*;

#[cfg(test)]
mod prober_test;

#[cfg(test)]
use mockall::automock;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::Context;
use crate::Result;

/// Whether a request targets cluster-scoped or namespaced resources.
/// The two groups are probed by separate prober instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Cluster,
    Namespaced,
}

/// One capability request: resource kind plus the verb required to watch it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionRequest {
    /// Pluralized resource kind identifier
    pub resource: String,
    pub verb: String,
    pub scope: Scope,
}

impl PermissionRequest {
    pub fn watch(
        resource: impl Into<String>,
        scope: Scope,
    ) -> Self {
        Self {
            resource: resource.into(),
            verb: "watch".into(),
            scope,
        }
    }
}

/// Allow/deny result for a single resource kind in a single context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionVerdict {
    pub context_name: String,
    pub resource: String,
    pub permitted: bool,
    pub reason: Option<String>,
}

/// One permitted or denied group emitted by a prober round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionResult {
    pub context_name: String,
    pub permitted: bool,
    pub resources: Vec<String>,
    pub reason: Option<String>,
}

/// External capability-review transport.
///
/// A failed review of a single request must not abort the batch; the prober
/// maps the error to `permitted: false` with a reason.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AccessReviewer: Send + Sync + 'static {
    async fn review(
        &self,
        context: &Context,
        request: &PermissionRequest,
    ) -> Result<bool>;
}
