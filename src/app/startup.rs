use super::{AgentOrchestrator, ComponentState};
use crate::error::{EdgewatchError, Result};
use crate::events::{AgentEvent, EventBus, EventFilter, EventReceiver};
use crate::inference::{resolve_models, ModelCatalog};
use crate::rotation::SharedRotator;
use crate::scheduler::PollingScheduler;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

impl AgentOrchestrator {
    /// Discover cameras, probe the inference service and choose the model rotation
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing edgewatch agent");

        for component in ["discovery", "scheduler", "catalog"] {
            self.set_component_state(component, ComponentState::Stopped);
        }

        self.set_component_state("discovery", ComponentState::Starting);
        let cameras = self.discovery.discover().await;
        info!(
            "Discovered {} cameras with '{}' probe",
            cameras.len(),
            self.discovery.probe_name()
        );
        self.event_bus.emit(AgentEvent::CamerasDiscovered {
            count: cameras.len(),
        });
        self.cameras.replace(cameras);
        self.set_component_state("discovery", ComponentState::Stopped);

        match self.catalog.health().await {
            Ok(health) => info!(
                "Inference service {} ({} models: {:?})",
                health.status, health.total_models, health.available_models
            ),
            Err(e) => warn!("Inference service health check failed: {}", e),
        }

        let (models, source) = resolve_models(&self.config.inference, &self.catalog).await;
        self.rotator.lock().replace_models(models);
        self.model_source = Some(source);

        if self.cameras.is_empty() {
            warn!("No cameras available; capture cycles will be skipped");
        }

        info!("Agent initialized");
        Ok(())
    }

    /// Spawn the scheduler and background tasks
    pub async fn start(&mut self) -> Result<()> {
        if self.scheduler.is_some() {
            return Err(EdgewatchError::system("Agent already started"));
        }

        info!("Starting edgewatch agent");
        self.set_component_state("scheduler", ComponentState::Starting);

        let scheduler = Arc::new(
            PollingScheduler::builder()
                .cameras(self.cameras.clone())
                .rotator(Arc::clone(&self.rotator))
                .capture(Arc::clone(&self.capture))
                .dispatcher(Arc::clone(&self.dispatcher))
                .history(Arc::clone(&self.history))
                .event_bus(self.event_bus.clone())
                .interval(self.config.scheduler.interval())
                .overlap_policy(self.config.scheduler.overlap_policy)
                .build()?,
        );
        self.monitor.attach_scheduler(Arc::clone(&scheduler));

        let handle = tokio::spawn(
            Arc::clone(&scheduler).run(self.cancellation_token.child_token()),
        );
        self.tasks.push(("scheduler", handle));
        self.scheduler = Some(scheduler);
        self.set_component_state("scheduler", ComponentState::Running);

        if self.config.inference.catalog_refresh_secs > 0 {
            self.set_component_state("catalog", ComponentState::Starting);
            let handle = tokio::spawn(refresh_models(
                Arc::clone(&self.catalog),
                Arc::clone(&self.rotator),
                self.event_bus.clone(),
                Duration::from_secs(self.config.inference.catalog_refresh_secs),
                self.cancellation_token.child_token(),
            ));
            self.tasks.push(("catalog", handle));
            self.set_component_state("catalog", ComponentState::Running);
        }

        let handle = tokio::spawn(log_events(
            EventReceiver::new(&self.event_bus, EventFilter::All, "event-log"),
            self.cancellation_token.child_token(),
        ));
        self.tasks.push(("event-log", handle));

        info!("Agent started");
        Ok(())
    }
}

/// Periodically replace the rotation with the service's current catalog
pub(super) async fn refresh_models(
    catalog: Arc<ModelCatalog>,
    rotator: SharedRotator,
    event_bus: EventBus,
    every: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The startup resolution already ran
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let models = match catalog.fetch().await {
                    Ok(models) => models,
                    Err(e) => {
                        warn!("Model catalog refresh failed, keeping current rotation: {}", e);
                        continue;
                    }
                };

                let changed = {
                    let mut rotator = rotator.lock();
                    if rotator.models() == models.as_slice() {
                        false
                    } else {
                        rotator.replace_models(models.clone());
                        true
                    }
                };

                if changed {
                    event_bus.emit(AgentEvent::ModelsRefreshed { models });
                } else {
                    debug!("Model catalog unchanged");
                }
            }
        }
    }
}

async fn log_events(mut receiver: EventReceiver, token: CancellationToken) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            event = receiver.recv() => match event {
                Ok(event) => debug!(event = event.event_type(), "{}", event.description()),
                Err(_) => break,
            },
        }
    }
}
