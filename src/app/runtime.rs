use super::{AgentOrchestrator, ShutdownReason};
use crate::error::{EdgewatchError, Result};
use crate::events::AgentEvent;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info};

type SharedSender = Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>;

impl AgentOrchestrator {
    /// Run until SIGINT or SIGTERM, then shut down. Returns the process exit code.
    pub async fn run(&mut self) -> Result<i32> {
        info!("Edgewatch agent is running");

        let shutdown_sender = self
            .shutdown_sender
            .take()
            .ok_or_else(|| EdgewatchError::system("Shutdown sender already taken"))?;
        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| EdgewatchError::system("Shutdown receiver already taken"))?;

        self.setup_signal_handlers(Arc::new(Mutex::new(Some(shutdown_sender))));

        let reason = shutdown_receiver
            .await
            .map_err(|_| EdgewatchError::system("Shutdown channel closed unexpectedly"))?;

        info!("Shutdown initiated: {}", reason);
        self.event_bus.emit(AgentEvent::ShutdownRequested {
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });

        let exit_code = self.shutdown().await;
        info!("Edgewatch agent shutdown complete");
        Ok(exit_code)
    }

    fn setup_signal_handlers(&self, sender: SharedSender) {
        #[cfg(unix)]
        {
            let sigterm_sender = Arc::clone(&sender);
            let token = self.cancellation_token.clone();
            tokio::spawn(async move {
                let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate())
                {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        error!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };
                tokio::select! {
                    _ = token.cancelled() => {}
                    Some(()) = sigterm.recv() => {
                        info!("Received SIGTERM signal");
                        send_reason(&sigterm_sender, ShutdownReason::Signal("SIGTERM".to_string()));
                    }
                }
            });
        }

        let token = self.cancellation_token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                result = signal::ctrl_c() => match result {
                    Ok(()) => {
                        info!("Received SIGINT signal (Ctrl+C)");
                        send_reason(&sender, ShutdownReason::Signal("SIGINT".to_string()));
                    }
                    Err(e) => {
                        error!("Failed to listen for Ctrl+C: {}", e);
                        send_reason(&sender, ShutdownReason::Error(e.to_string()));
                    }
                },
            }
        });
    }
}

fn send_reason(sender: &SharedSender, reason: ShutdownReason) {
    if let Some(sender) = sender.lock().take() {
        let _ = sender.send(reason);
    }
}
