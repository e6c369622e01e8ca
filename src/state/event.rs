use super::model::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    Start,
    OpenEditor,
    CloseEditor,
    OpenHistory,
    CloseHistory,
}

/// One applied transition, kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    from: Option<AppState>,
    event: AppEvent,
    to: AppState,
}

impl StateTransition {
    pub const fn new(from: Option<AppState>, event: AppEvent, to: AppState) -> Self {
        Self { from, event, to }
    }
}
