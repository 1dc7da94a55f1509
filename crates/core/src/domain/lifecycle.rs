// Server Lifecycle

use serde::{Deserialize, Serialize};

/// Lifecycle of a queue server.
///
/// Transitions only move forward: `Created -> Running -> Draining -> Closed`.
/// A server that was never started goes `Created -> Draining -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Lifecycle {
    Created,
    Running,
    Draining,
    Closed,
}

impl Lifecycle {
    /// Sealed against further sends
    pub fn is_closed(self) -> bool {
        self == Lifecycle::Closed
    }
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lifecycle::Created => write!(f, "CREATED"),
            Lifecycle::Running => write!(f, "RUNNING"),
            Lifecycle::Draining => write!(f, "DRAINING"),
            Lifecycle::Closed => write!(f, "CLOSED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_closed_is_closed() {
        assert!(!Lifecycle::Created.is_closed());
        assert!(!Lifecycle::Running.is_closed());
        assert!(!Lifecycle::Draining.is_closed());
        assert!(Lifecycle::Closed.is_closed());
    }

    #[test]
    fn test_display_matches_serialized_form() {
        for state in [
            Lifecycle::Created,
            Lifecycle::Running,
            Lifecycle::Draining,
            Lifecycle::Closed,
        ] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state));
        }
    }
}
