use super::error::{StateError, StateResult};
use super::event::{AppEvent, StateTransition};
use super::model::AppState;

/// Event-driven view state. Rejected events leave the machine untouched.
#[derive(Debug, Default)]
pub struct StateMachine {
    state: AppState,
    applied: Vec<StateTransition>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn can_transition(&self, event: AppEvent) -> bool {
        route(self.state, event).is_some()
    }

    /// Applies `event` and returns the state it lands in.
    pub fn transition(&mut self, event: AppEvent) -> StateResult<AppState> {
        let Some(next) = route(self.state, event) else {
            tracing::warn!(state = ?self.state, ?event, "event rejected in current state");
            return Err(StateError::EventRejected {
                from: self.state,
                event,
            });
        };

        let from = self.state;
        self.state = next;
        self.applied
            .push(StateTransition::new(Some(from), event, next));
        tracing::debug!(?from, ?event, to = ?next, "state advanced");
        Ok(next)
    }

    #[cfg(test)]
    pub(crate) fn history(&self) -> &[StateTransition] {
        &self.applied
    }
}

/// Routing table; `None` marks an event the current state does not accept.
const fn route(from: AppState, event: AppEvent) -> Option<AppState> {
    use AppEvent::*;

    match (from, event) {
        (AppState::Idle, Start) => Some(AppState::Idle),
        (AppState::Idle, OpenEditor) => Some(AppState::Editor),
        (AppState::Idle, OpenHistory) => Some(AppState::History),
        (AppState::History, OpenHistory) => Some(AppState::History),
        (AppState::History, OpenEditor) => Some(AppState::Editor),
        (AppState::Editor, OpenEditor) => Some(AppState::Editor),
        (AppState::Editor, CloseEditor) => Some(AppState::Idle),
        (AppState::History, CloseHistory) => Some(AppState::Idle),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_accepts_only_listed_events() {
        let machine = StateMachine::new();
        assert!(machine.can_transition(AppEvent::Start));
        assert!(machine.can_transition(AppEvent::OpenEditor));
        assert!(machine.can_transition(AppEvent::OpenHistory));
        assert!(!machine.can_transition(AppEvent::CloseEditor));
        assert!(!machine.can_transition(AppEvent::CloseHistory));
    }

    #[test]
    fn gallery_reedit_flows_into_the_editor_and_back_to_idle() {
        let mut machine = StateMachine::new();
        machine
            .transition(AppEvent::OpenHistory)
            .expect("idle should open the gallery");
        machine
            .transition(AppEvent::OpenEditor)
            .expect("gallery should hand off into the editor");
        machine
            .transition(AppEvent::CloseEditor)
            .expect("editor should close back to idle");
        assert_eq!(machine.state(), AppState::Idle);

        let applied = machine.history();
        assert_eq!(applied.len(), 3);
        assert_eq!(
            applied[0],
            StateTransition::new(Some(AppState::Idle), AppEvent::OpenHistory, AppState::History)
        );
        assert_eq!(
            applied[1],
            StateTransition::new(
                Some(AppState::History),
                AppEvent::OpenEditor,
                AppState::Editor
            )
        );
        assert_eq!(
            applied[2],
            StateTransition::new(Some(AppState::Editor), AppEvent::CloseEditor, AppState::Idle)
        );
    }

    #[test]
    fn reopening_the_editor_in_place_is_allowed() {
        let mut machine = StateMachine::new();
        machine
            .transition(AppEvent::OpenEditor)
            .expect("open editor should work");
        let state = machine
            .transition(AppEvent::OpenEditor)
            .expect("editor -> editor should be valid");
        assert_eq!(state, AppState::Editor);
    }

    #[test]
    fn rejected_event_leaves_state_and_history_untouched() {
        let mut machine = StateMachine::new();
        let err = machine
            .transition(AppEvent::CloseHistory)
            .expect_err("idle cannot close the gallery");
        assert!(matches!(
            err,
            StateError::EventRejected {
                from: AppState::Idle,
                event: AppEvent::CloseHistory,
            }
        ));
        assert_eq!(machine.state(), AppState::Idle);
        assert!(machine.history().is_empty());
    }
}
