use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::trace;

use super::HealthProbe;
use super::HealthState;
use crate::engine::EngineEvent;
use crate::ConnectivityError;
use crate::Context;
use crate::HealthConfig;

/// Probes one context's endpoint until disposed.
///
/// Emits `HealthChanged` on every probe result and the edge-triggered
/// `ContextReachable` only on the false→true transition. Consecutive
/// failures never stop future attempts; the configured interval keeps
/// re-probing from hot-looping.
pub struct HealthProber {
    context: Context,
    probe: Arc<dyn HealthProbe>,
    config: HealthConfig,
    state: ArcSwap<HealthState>,
    event_tx: mpsc::Sender<EngineEvent>,
    cancel: CancellationToken,
}

impl HealthProber {
    pub(crate) fn new(
        context: Context,
        probe: Arc<dyn HealthProbe>,
        config: HealthConfig,
        event_tx: mpsc::Sender<EngineEvent>,
    ) -> Self {
        let state = ArcSwap::from_pointee(HealthState::unknown(&context.name));
        Self {
            context,
            probe,
            config,
            state,
            event_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Begins periodic probing on a spawned task. A probe not completing
    /// within `probe_timeout` counts as a failure with its error attached.
    pub(crate) fn start(
        self: &Arc<Self>,
        probe_timeout: Duration,
    ) {
        let prober = self.clone();
        tokio::spawn(async move {
            loop {
                let became_reachable = prober.probe_once(probe_timeout).await;

                let state = prober.state();
                let event = EngineEvent::HealthChanged(state);
                tokio::select! {
                    _ = prober.cancel.cancelled() => return,
                    sent = prober.event_tx.send(event) => {
                        if let Err(e) = sent {
                            error!("health state send failed: {:?}", e);
                            return;
                        }
                    }
                }

                if became_reachable {
                    debug!("context {} became reachable", prober.context.name);
                    if prober
                        .event_tx
                        .send(EngineEvent::ContextReachable(prober.context.clone()))
                        .await
                        .is_err()
                    {
                        return;
                    }
                }

                tokio::select! {
                    _ = prober.cancel.cancelled() => return,
                    _ = sleep(prober.next_delay()) => {}
                }
            }
        });
    }

    /// Runs a single probe and returns whether the false→true edge fired.
    async fn probe_once(
        &self,
        probe_timeout: Duration,
    ) -> bool {
        let previous = self.state.load_full();

        self.state.store(Arc::new(HealthState {
            checking: true,
            ..(*previous).clone()
        }));

        trace!("probing context {}", self.context.name);
        let (reachable, error) = match timeout(probe_timeout, self.probe.probe(&self.context)).await {
            Ok(Ok(())) => (true, None),
            Ok(Err(e)) => (false, Some(e.to_string())),
            Err(_) => (
                false,
                Some(
                    ConnectivityError::ProbeTimeout {
                        duration: probe_timeout,
                    }
                    .to_string(),
                ),
            ),
        };

        self.state.store(Arc::new(HealthState {
            context_name: self.context.name.clone(),
            checking: false,
            reachable,
            error,
        }));

        reachable && !previous.reachable
    }

    fn next_delay(&self) -> Duration {
        let jitter = if self.config.probe_jitter_in_ms > 0 {
            rand::thread_rng().gen_range(0..self.config.probe_jitter_in_ms)
        } else {
            0
        };
        self.config.probe_interval() + Duration::from_millis(jitter)
    }

    /// Current health state, synchronously.
    pub fn state(&self) -> HealthState {
        (**self.state.load()).clone()
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Stops probing. Idempotent.
    pub fn dispose(&self) {
        self.cancel.cancel();
    }
}
