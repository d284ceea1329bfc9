// Completeness state machine - lifecycle states for a structure document
// and the legal transitions between them

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of a structure document's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletenessState {
    /// No modules at all
    Empty,
    /// Modules exist but required pieces are missing
    Incomplete,
    /// All modules well-formed and quality checks satisfied
    Complete,
}

impl CompletenessState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletenessState::Empty => "empty",
            CompletenessState::Incomplete => "incomplete",
            CompletenessState::Complete => "complete",
        }
    }
}

impl std::fmt::Display for CompletenessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CompletenessState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "empty" => Ok(CompletenessState::Empty),
            "incomplete" => Ok(CompletenessState::Incomplete),
            "complete" => Ok(CompletenessState::Complete),
            _ => Err(format!(
                "Invalid completeness state: '{}'. Expected 'empty', 'incomplete', or 'complete'",
                s
            )),
        }
    }
}

/// What caused a state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletenessTrigger {
    /// The analyzer re-classified the document's current content
    Reanalyzed(CompletenessState),
    /// The whole document body was replaced (the only path from
    /// Complete back to Empty)
    DocumentReplaced,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletenessTransitionError {
    #[error("Invalid transition from '{from}' to '{to}': a complete document only becomes empty through full replacement")]
    InvalidTransition {
        from: CompletenessState,
        to: CompletenessState,
    },
}

/// Whether `from` may move to `to` by re-analysis alone.
/// Self-transitions are always allowed; the single forbidden edge is
/// Complete to Empty, which requires `DocumentReplaced`.
pub fn can_transition(from: CompletenessState, to: CompletenessState) -> bool {
    !matches!(
        (from, to),
        (CompletenessState::Complete, CompletenessState::Empty)
    )
}

/// Apply a trigger to the current state
pub fn transition_state(
    current: CompletenessState,
    trigger: CompletenessTrigger,
) -> Result<CompletenessState, CompletenessTransitionError> {
    match trigger {
        CompletenessTrigger::DocumentReplaced => Ok(CompletenessState::Empty),
        CompletenessTrigger::Reanalyzed(target) => {
            if can_transition(current, target) {
                Ok(target)
            } else {
                Err(CompletenessTransitionError::InvalidTransition {
                    from: current,
                    to: target,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_string_round_trip() {
        for state in [
            CompletenessState::Empty,
            CompletenessState::Incomplete,
            CompletenessState::Complete,
        ] {
            let parsed: CompletenessState = state.as_str().parse().unwrap();
            assert_eq!(parsed, state);
        }
        assert!("done".parse::<CompletenessState>().is_err());
    }

    #[test]
    fn test_reanalysis_transitions() {
        use CompletenessState::*;

        assert_eq!(
            transition_state(Empty, CompletenessTrigger::Reanalyzed(Incomplete)),
            Ok(Incomplete)
        );
        assert_eq!(
            transition_state(Incomplete, CompletenessTrigger::Reanalyzed(Complete)),
            Ok(Complete)
        );
        assert_eq!(
            transition_state(Complete, CompletenessTrigger::Reanalyzed(Incomplete)),
            Ok(Incomplete)
        );
        // self-transition is a no-op, not an error
        assert_eq!(
            transition_state(Complete, CompletenessTrigger::Reanalyzed(Complete)),
            Ok(Complete)
        );
    }

    #[test]
    fn test_complete_to_empty_requires_replacement() {
        use CompletenessState::*;

        assert!(!can_transition(Complete, Empty));
        assert!(matches!(
            transition_state(Complete, CompletenessTrigger::Reanalyzed(Empty)),
            Err(CompletenessTransitionError::InvalidTransition { .. })
        ));
        assert_eq!(
            transition_state(Complete, CompletenessTrigger::DocumentReplaced),
            Ok(Empty)
        );
    }
}
