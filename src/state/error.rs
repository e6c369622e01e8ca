use thiserror::Error;

use super::event::AppEvent;
use super::model::AppState;

pub type StateResult<T> = std::result::Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    /// The event is not accepted while the machine is in `from`.
    #[error("cannot apply {event:?} while in {from:?}")]
    EventRejected { from: AppState, event: AppEvent },
}
