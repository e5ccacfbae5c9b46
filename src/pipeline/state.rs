use serde::Serialize;
use std::fmt;

/// Construction phases of a pipeline instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Default)]
pub enum Phase {
    #[default]
    Constructed,
    SchemaBuilt,
    InputsBound,
    BodyBuilt,
    Scheduled,
}

impl Phase {
    /// Check if transition from current phase to target phase is valid
    pub fn can_transition_to(&self, target: Phase) -> bool {
        use Phase::*;

        matches!(
            (self, target),
            (Constructed, SchemaBuilt) |

            // Binding is optional for an interface-only top-level instance
            (SchemaBuilt, InputsBound) |
            (SchemaBuilt, BodyBuilt) |
            (InputsBound, BodyBuilt) |

            (BodyBuilt, Scheduled)
        )
    }

    /// Get human-readable phase name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Constructed => "Constructed",
            Self::SchemaBuilt => "SchemaBuilt",
            Self::InputsBound => "InputsBound",
            Self::BodyBuilt => "BodyBuilt",
            Self::Scheduled => "Scheduled",
        }
    }

    pub fn is_built(&self) -> bool {
        *self >= Self::BodyBuilt
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert!(Phase::Constructed.can_transition_to(Phase::SchemaBuilt));
        assert!(Phase::SchemaBuilt.can_transition_to(Phase::BodyBuilt));
        assert!(Phase::BodyBuilt.can_transition_to(Phase::Scheduled));
    }

    #[test]
    fn test_no_going_back_or_skipping_the_body() {
        assert!(!Phase::Scheduled.can_transition_to(Phase::BodyBuilt));
        assert!(!Phase::InputsBound.can_transition_to(Phase::InputsBound));
        assert!(!Phase::InputsBound.can_transition_to(Phase::Scheduled));
        assert!(!Phase::Constructed.can_transition_to(Phase::InputsBound));
    }
}
