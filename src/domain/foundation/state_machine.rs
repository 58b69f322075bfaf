//! State machine trait for status enums.
//!
//! Gives lifecycle status enums a uniform, validated transition interface.

/// Trait for status enums that represent state machines.
///
/// Implementors define which transitions are allowed; callers use
/// [`StateMachine::can_transition_to`] before mutating an aggregate.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if a transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Checks if the state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestStatus {
        Open,
        Closed,
    }

    impl StateMachine for TestStatus {
        fn can_transition_to(&self, target: &Self) -> bool {
            matches!((self, target), (TestStatus::Open, TestStatus::Closed))
        }

        fn is_terminal(&self) -> bool {
            matches!(self, TestStatus::Closed)
        }
    }

    #[test]
    fn allows_declared_transition() {
        assert!(TestStatus::Open.can_transition_to(&TestStatus::Closed));
    }

    #[test]
    fn rejects_undeclared_transition() {
        assert!(!TestStatus::Closed.can_transition_to(&TestStatus::Open));
    }

    #[test]
    fn terminal_state_is_terminal() {
        assert!(TestStatus::Closed.is_terminal());
        assert!(!TestStatus::Open.is_terminal());
    }
}
