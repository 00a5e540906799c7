use crate::error::EventBusError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Events published by the agent for live downstream consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentEvent {
    /// Discovery finished
    CamerasDiscovered { count: usize },
    /// A capture cycle began with the given model
    CycleStarted {
        cycle: u64,
        model: String,
        timestamp: DateTime<Utc>,
    },
    /// A prediction was committed to history
    PredictionRecorded {
        camera_id: u32,
        model: String,
        timestamp: DateTime<Utc>,
    },
    /// A camera produced no frame this cycle
    CaptureFailed { camera_id: u32, error: String },
    /// The inference service rejected or lost a frame
    DispatchFailed { camera_id: u32, error: String },
    /// A cycle committed its results
    CycleCompleted {
        cycle: u64,
        predictions: usize,
        capture_errors: usize,
        dispatch_failures: usize,
        duration_ms: u64,
    },
    /// A tick did no work
    CycleSkipped { reason: String },
    /// The rotation list was replaced from the catalog
    ModelsRefreshed { models: Vec<String> },
    /// System shutdown requested
    ShutdownRequested {
        timestamp: DateTime<Utc>,
        reason: String,
    },
}

impl AgentEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            AgentEvent::CamerasDiscovered { count } => format!("{} cameras discovered", count),
            AgentEvent::CycleStarted { cycle, model, .. } => {
                format!("Cycle {} started with model {}", cycle, model)
            }
            AgentEvent::PredictionRecorded {
                camera_id, model, ..
            } => format!("Prediction recorded for camera {} ({})", camera_id, model),
            AgentEvent::CaptureFailed { camera_id, error } => {
                format!("Capture failed for camera {}: {}", camera_id, error)
            }
            AgentEvent::DispatchFailed { camera_id, error } => {
                format!("Dispatch failed for camera {}: {}", camera_id, error)
            }
            AgentEvent::CycleCompleted {
                cycle,
                predictions,
                capture_errors,
                dispatch_failures,
                duration_ms,
            } => format!(
                "Cycle {} completed in {}ms: {} predictions, {} capture errors, {} dispatch failures",
                cycle, duration_ms, predictions, capture_errors, dispatch_failures
            ),
            AgentEvent::CycleSkipped { reason } => format!("Cycle skipped: {}", reason),
            AgentEvent::ModelsRefreshed { models } => {
                format!("Model rotation refreshed: {}", models.join(", "))
            }
            AgentEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            AgentEvent::CamerasDiscovered { .. } => "cameras_discovered",
            AgentEvent::CycleStarted { .. } => "cycle_started",
            AgentEvent::PredictionRecorded { .. } => "prediction_recorded",
            AgentEvent::CaptureFailed { .. } => "capture_failed",
            AgentEvent::DispatchFailed { .. } => "dispatch_failed",
            AgentEvent::CycleCompleted { .. } => "cycle_completed",
            AgentEvent::CycleSkipped { .. } => "cycle_skipped",
            AgentEvent::ModelsRefreshed { .. } => "models_refreshed",
            AgentEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }

    /// Camera the event concerns, if any
    pub fn camera_id(&self) -> Option<u32> {
        match self {
            AgentEvent::PredictionRecorded { camera_id, .. }
            | AgentEvent::CaptureFailed { camera_id, .. }
            | AgentEvent::DispatchFailed { camera_id, .. } => Some(*camera_id),
            _ => None,
        }
    }
}

/// Async event bus using broadcast channels
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AgentEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers. Fails only when nobody is listening.
    pub fn publish(&self, event: AgentEvent) -> Result<usize, EventBusError> {
        match &event {
            AgentEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            AgentEvent::ModelsRefreshed { models } => {
                info!("Model rotation refreshed ({} models)", models.len());
            }
            _ => {}
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Publish, ignoring the absence of subscribers
    pub fn emit(&self, event: AgentEvent) {
        let _ = self.publish(event);
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
    /// Accept events concerning specific cameras
    Cameras(Vec<u32>),
}

impl EventFilter {
    pub fn matches(&self, event: &AgentEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Cameras(cameras) => event
                .camera_id()
                .map(|id| cameras.contains(&id))
                .unwrap_or(false),
        }
    }
}

/// Filtered view of a bus subscription
pub struct EventReceiver {
    receiver: broadcast::Receiver<AgentEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(bus: &EventBus, filter: EventFilter, name: impl Into<String>) -> Self {
        Self {
            receiver: bus.subscribe(),
            filter,
            name: name.into(),
        }
    }

    /// Receive the next matching event. Lagging skips ahead rather than failing.
    pub async fn recv(&mut self) -> Result<AgentEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Ok(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<AgentEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    fn capture_failed(camera_id: u32) -> AgentEvent {
        AgentEvent::CaptureFailed {
            camera_id,
            error: "timed out".to_string(),
        }
    }

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let bus = EventBus::new(10);
        let mut receiver = bus.subscribe();

        let delivered = bus.publish(AgentEvent::CamerasDiscovered { count: 2 }).unwrap();
        assert_eq!(delivered, 1);

        match receiver.recv().await.unwrap() {
            AgentEvent::CamerasDiscovered { count } => assert_eq!(count, 2),
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(4);
        assert!(bus.publish(AgentEvent::CamerasDiscovered { count: 0 }).is_err());
        bus.emit(AgentEvent::CamerasDiscovered { count: 0 });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new(10);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(capture_failed(0));

        timeout(Duration::from_millis(100), first.recv())
            .await
            .unwrap()
            .unwrap();
        timeout(Duration::from_millis(100), second.recv())
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_event_filter() {
        let by_type = EventFilter::EventTypes(vec!["capture_failed"]);
        assert!(by_type.matches(&capture_failed(1)));
        assert!(!by_type.matches(&AgentEvent::CycleSkipped {
            reason: "no cameras".to_string()
        }));

        let by_camera = EventFilter::Cameras(vec![1]);
        assert!(by_camera.matches(&capture_failed(1)));
        assert!(!by_camera.matches(&capture_failed(2)));
        assert!(!by_camera.matches(&AgentEvent::CamerasDiscovered { count: 1 }));
    }

    #[tokio::test]
    async fn test_filtered_receiver() {
        let bus = EventBus::new(10);
        let mut receiver = EventReceiver::new(&bus, EventFilter::Cameras(vec![3]), "test");

        bus.emit(capture_failed(1));
        bus.emit(capture_failed(3));

        match receiver.recv().await.unwrap() {
            AgentEvent::CaptureFailed { camera_id, .. } => assert_eq!(camera_id, 3),
            other => panic!("Unexpected event: {:?}", other),
        }
        assert!(receiver.try_recv().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lagged_receiver_skips_ahead() {
        let bus = EventBus::new(2);
        let mut receiver = EventReceiver::new(&bus, EventFilter::All, "slow");

        for camera_id in 0..5 {
            bus.emit(capture_failed(camera_id));
        }

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.camera_id(), Some(3));
    }

    #[test]
    fn test_descriptions() {
        let event = AgentEvent::CycleCompleted {
            cycle: 4,
            predictions: 2,
            capture_errors: 1,
            dispatch_failures: 0,
            duration_ms: 120,
        };
        assert_eq!(event.event_type(), "cycle_completed");
        assert!(event.description().contains("Cycle 4 completed"));
    }
}
