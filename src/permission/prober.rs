use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;

use super::AccessReviewer;
use super::PermissionRequest;
use super::PermissionResult;
use super::PermissionVerdict;
use crate::engine::EngineEvent;
use crate::Context;

/// Evaluates one batch of permission requests for one context.
///
/// A prober belongs to exactly one round; the coordinator disposes the
/// previous round's probers before consuming this one's verdicts.
pub struct PermissionProber {
    context: Context,
    context_name: String,
    round: u64,
    requests: Vec<PermissionRequest>,
    reviewer: Arc<dyn AccessReviewer>,
    event_tx: mpsc::Sender<EngineEvent>,
    verdicts: Mutex<Vec<PermissionVerdict>>,
    cancel: CancellationToken,
}

impl PermissionProber {
    pub(crate) fn new(
        context: Context,
        round: u64,
        requests: Vec<PermissionRequest>,
        reviewer: Arc<dyn AccessReviewer>,
        event_tx: mpsc::Sender<EngineEvent>,
    ) -> Self {
        let context_name = context.name.clone();
        Self {
            context,
            context_name,
            round,
            requests,
            reviewer,
            event_tx,
            verdicts: Mutex::new(Vec::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Evaluates all requests concurrently on a spawned task and emits one
    /// `PermissionResult` per permitted/denied group.
    pub(crate) fn start(self: &Arc<Self>) {
        let prober = self.clone();
        tokio::spawn(async move {
            let verdicts = prober.evaluate().await;
            if prober.cancel.is_cancelled() {
                debug!("permission round {} for {} disposed mid-flight", prober.round, prober.context_name);
                return;
            }

            *prober.verdicts.lock() = verdicts.clone();

            for result in group_verdicts(&prober.context_name, &verdicts) {
                let event = EngineEvent::PermissionResult {
                    round: prober.round,
                    result,
                };
                tokio::select! {
                    _ = prober.cancel.cancelled() => return,
                    sent = prober.event_tx.send(event) => {
                        if let Err(e) = sent {
                            error!("permission result send failed: {:?}", e);
                            return;
                        }
                    }
                }
            }
        });
    }

    async fn evaluate(&self) -> Vec<PermissionVerdict> {
        debug!(
            "evaluating {} permission requests for context {}",
            self.requests.len(),
            self.context_name
        );

        let checks = self.requests.iter().map(|request| {
            let reviewer = self.reviewer.clone();
            let context = self.context.clone();
            async move {
                match reviewer.review(&context, request).await {
                    Ok(permitted) => (request.resource.clone(), permitted, None),
                    // A failed check never aborts the batch
                    Err(e) => (request.resource.clone(), false, Some(e.to_string())),
                }
            }
        });

        join_all(checks)
            .await
            .into_iter()
            .map(|(resource, permitted, reason)| PermissionVerdict {
                context_name: self.context_name.clone(),
                resource,
                permitted,
                reason,
            })
            .collect()
    }

    /// Flattened per-kind verdicts derived from the results seen so far.
    pub fn permissions(&self) -> Vec<PermissionVerdict> {
        self.verdicts.lock().clone()
    }

    /// Lets callers identify stale instances after a context switch.
    pub fn is_for_context(
        &self,
        name: &str,
    ) -> bool {
        self.context_name == name
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    /// Idempotent; a disposed prober never stores or emits verdicts.
    pub fn dispose(&self) {
        self.cancel.cancel();
    }
}

/// Collapses per-kind verdicts into at most one permitted and one denied
/// group, keeping the first denial reason seen.
fn group_verdicts(
    context_name: &str,
    verdicts: &[PermissionVerdict],
) -> Vec<PermissionResult> {
    let mut permitted = Vec::new();
    let mut denied = Vec::new();
    let mut denial_reason: Option<String> = None;

    for verdict in verdicts {
        if verdict.permitted {
            permitted.push(verdict.resource.clone());
        } else {
            denied.push(verdict.resource.clone());
            if denial_reason.is_none() {
                denial_reason = verdict.reason.clone();
            }
        }
    }

    let mut results = Vec::new();
    if !permitted.is_empty() {
        results.push(PermissionResult {
            context_name: context_name.to_string(),
            permitted: true,
            resources: permitted,
            reason: None,
        });
    }
    if !denied.is_empty() {
        results.push(PermissionResult {
            context_name: context_name.to_string(),
            permitted: false,
            resources: denied,
            reason: denial_reason,
        });
    }
    results
}
