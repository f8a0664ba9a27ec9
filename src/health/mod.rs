//! Periodic reachability probing for a single context.

mod prober;
pub use prober::*;


#[cfg(test)]
use mockall::automock;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::Context;
use crate::Result;

/// Reachability of one monitored context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthState {
    pub context_name: String,
    /// True only while a probe is in flight
    pub checking: bool,
    pub reachable: bool,
    pub error: Option<String>,
}

impl HealthState {
    pub fn unknown(context_name: impl Into<String>) -> Self {
        Self {
            context_name: context_name.into(),
            checking: false,
            reachable: false,
            error: None,
        }
    }
}

/// External probe transport: one round-trip to the context's endpoint.
///
/// `Ok(())` means the endpoint answered; any error means unreachable. The
/// prober enforces the timeout, implementations need not.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HealthProbe: Send + Sync + 'static {
    async fn probe(
        &self,
        context: &Context,
    ) -> Result<()>;
}
