//! State machine trait for status enums.

use std::fmt::Display;

use super::ValidationError;

/// Status enums that move through a fixed transition graph.
///
/// Implementors only describe the graph; `transition_to` and `is_terminal`
/// come for free.
pub trait StateMachine: Sized + Copy + PartialEq + Display {
    /// Returns true if moving from `self` to `target` is allowed.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns every state reachable in one step from the current one.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs the transition, or reports which edge was rejected.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_transition(self, target))
        }
    }

    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
