use super::{AgentOrchestrator, ComponentState};
use std::collections::BTreeMap;
use tracing::debug;

impl AgentOrchestrator {
    pub(super) fn set_component_state(&self, component: &str, state: ComponentState) {
        let previous = self
            .component_states
            .lock()
            .insert(component.to_string(), state);
        if previous != Some(state) {
            debug!("Component '{}' state: {:?} -> {:?}", component, previous, state);
        }
    }

    pub fn component_state(&self, component: &str) -> Option<ComponentState> {
        self.component_states.lock().get(component).copied()
    }

    /// All component states, ordered by component name
    pub fn component_states(&self) -> BTreeMap<String, ComponentState> {
        self.component_states.lock().clone()
    }
}
