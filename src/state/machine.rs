use super::error::{StateError, StateResult};
use super::{SessionEvent, SessionState, StateTransition};

#[derive(Debug)]
pub struct StateMachine {
    state: SessionState,
    transition_history: Vec<StateTransition>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: SessionState::default(),
            transition_history: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.transition_history
    }

    pub fn can_transition(&self, event: SessionEvent) -> bool {
        self.next_state(event).is_some()
    }

    pub fn next_state(&self, event: SessionEvent) -> Option<SessionState> {
        use SessionEvent::*;
        match (self.state, event) {
            (SessionState::Empty, LoadImage) => Some(SessionState::Editing),
            // Replacing the image keeps the session open.
            (SessionState::Editing, LoadImage) => Some(SessionState::Editing),
            (SessionState::Editing, BeginExport) => Some(SessionState::Exporting),
            (SessionState::Exporting, FinishExport) => Some(SessionState::Editing),
            (SessionState::Editing | SessionState::Exporting, Close) => Some(SessionState::Empty),
            _ => None,
        }
    }

    pub fn transition(&mut self, event: SessionEvent) -> StateResult<SessionState> {
        tracing::debug!(from = ?self.state, event = ?event, "request session transition");
        let next = self.next_state(event).ok_or_else(|| {
            let from = self.state;
            tracing::warn!(from = ?from, event = ?event, "invalid session transition requested");
            StateError::InvalidStateTransition { from, event }
        })?;

        let record = StateTransition::new(Some(self.state), event, next);
        self.state = next;
        self.transition_history.push(record);

        Ok(self.state)
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionState::{:?}", self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_session_only_accepts_an_image() {
        let machine = StateMachine::new();
        assert_eq!(machine.state(), SessionState::Empty);
        assert!(!machine.state().has_image());
        assert!(machine.can_transition(SessionEvent::LoadImage));
        assert!(!machine.can_transition(SessionEvent::BeginExport));
        assert!(!machine.can_transition(SessionEvent::FinishExport));
        assert!(!machine.can_transition(SessionEvent::Close));
    }

    #[test]
    fn export_round_trip_records_ordered_history() {
        let mut machine = StateMachine::new();
        machine
            .transition(SessionEvent::LoadImage)
            .expect("empty -> editing");
        machine
            .transition(SessionEvent::BeginExport)
            .expect("editing -> exporting");
        assert!(machine.state().is_exporting());
        assert!(!machine.can_transition(SessionEvent::BeginExport));
        machine
            .transition(SessionEvent::FinishExport)
            .expect("exporting -> editing");
        machine
            .transition(SessionEvent::Close)
            .expect("editing -> empty");

        assert_eq!(machine.state(), SessionState::Empty);
        assert_eq!(
            machine.history(),
            &[
                StateTransition::new(
                    Some(SessionState::Empty),
                    SessionEvent::LoadImage,
                    SessionState::Editing
                ),
                StateTransition::new(
                    Some(SessionState::Editing),
                    SessionEvent::BeginExport,
                    SessionState::Exporting
                ),
                StateTransition::new(
                    Some(SessionState::Exporting),
                    SessionEvent::FinishExport,
                    SessionState::Editing
                ),
                StateTransition::new(
                    Some(SessionState::Editing),
                    SessionEvent::Close,
                    SessionState::Empty
                ),
            ]
        );
    }

    #[test]
    fn closing_during_export_returns_to_empty() {
        let mut machine = StateMachine::new();
        machine.transition(SessionEvent::LoadImage).expect("load");
        machine.transition(SessionEvent::BeginExport).expect("export");
        assert_eq!(
            machine.transition(SessionEvent::Close).expect("close"),
            SessionState::Empty
        );
        assert_eq!(machine.to_string(), "SessionState::Empty");
    }

    #[test]
    fn invalid_transition_returns_error_without_mutating_history() {
        let mut machine = StateMachine::new();
        let err = machine
            .transition(SessionEvent::FinishExport)
            .expect_err("empty -> finish export should fail");
        assert_eq!(
            err,
            StateError::InvalidStateTransition {
                from: SessionState::Empty,
                event: SessionEvent::FinishExport
            }
        );
        assert_eq!(machine.state(), SessionState::Empty);
        assert!(machine.history().is_empty());
    }
}
