use serde::{Deserialize, Serialize};

/// Per-symbol warm-up progress shared by both engines.
///
/// `Cold` before the first bar, `Warming` until every rolling window is
/// filled, then `Ready` for the rest of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarmupState {
    #[default]
    Cold,
    Warming,
    Ready,
}

impl WarmupState {
    /// Next state after one more accepted bar. `Ready` is latched.
    pub fn advance(self, windows_filled: bool) -> Self {
        match self {
            WarmupState::Ready => WarmupState::Ready,
            _ if windows_filled => WarmupState::Ready,
            _ => WarmupState::Warming,
        }
    }

    pub fn is_ready(self) -> bool {
        self == WarmupState::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let state = WarmupState::default();
        assert_eq!(state, WarmupState::Cold);

        let state = state.advance(false);
        assert_eq!(state, WarmupState::Warming);

        let state = state.advance(true);
        assert!(state.is_ready());

        // Latched
        assert_eq!(state.advance(false), WarmupState::Ready);
    }

    #[test]
    fn test_cold_straight_to_ready() {
        assert_eq!(WarmupState::Cold.advance(true), WarmupState::Ready);
    }
}
