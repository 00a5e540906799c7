use super::{AgentOrchestrator, ComponentState};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

impl AgentOrchestrator {
    /// Cancel background tasks and wait for them, bounded by the configured
    /// shutdown timeout. Returns 0 when everything stopped cleanly.
    pub async fn shutdown(&mut self) -> i32 {
        info!("Beginning graceful shutdown");
        self.cancellation_token.cancel();

        let limit = Duration::from_secs(self.config.system.shutdown_timeout_secs);
        let mut exit_code = 0;

        // Stop in reverse start order
        while let Some((component, handle)) = self.tasks.pop() {
            info!("Stopping {} component", component);
            self.set_component_state(component, ComponentState::Stopping);

            let abort = handle.abort_handle();
            match timeout(limit, handle).await {
                Ok(Ok(())) => {
                    self.set_component_state(component, ComponentState::Stopped);
                    info!("{} component stopped", component);
                }
                Ok(Err(e)) if e.is_cancelled() => {
                    self.set_component_state(component, ComponentState::Stopped);
                }
                Ok(Err(e)) => {
                    self.set_component_state(component, ComponentState::Failed);
                    error!("{} component failed: {}", component, e);
                    exit_code = 1;
                }
                Err(_) => {
                    abort.abort();
                    self.set_component_state(component, ComponentState::Failed);
                    warn!("{} component stop timed out after {:?}", component, limit);
                    exit_code = 1;
                }
            }
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        exit_code
    }
}
