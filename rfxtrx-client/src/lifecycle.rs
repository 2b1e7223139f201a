//! Bring-up and teardown state machine.
//!
//! ```text
//! Closed|Failed  --Open------------> Opening
//! Opening        --TransportOpened-> Settling
//! Settling       --SettleElapsed---> Resetting
//! Resetting      --ResetAcked------> Flushing
//! Flushing       --Flushed---------> QueryingStatus
//! QueryingStatus --StatusAcked-----> Ready
//! Resetting|Flushing|QueryingStatus --StepFailed--> Failed
//! any open state --TransportLost---> Closed
//! ```
//!
//! The machine is pure. The connection task feeds it events and performs the
//! I/O each new state calls for.

use crate::error::{ClientError, Result};
use crate::state::ConnectionState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Open,
    TransportOpened,
    SettleElapsed,
    ResetAcked,
    Flushed,
    StatusAcked,
    StepFailed,
    TransportLost,
}

impl LifecycleEvent {
    pub const ALL: [LifecycleEvent; 8] = [
        Self::Open,
        Self::TransportOpened,
        Self::SettleElapsed,
        Self::ResetAcked,
        Self::Flushed,
        Self::StatusAcked,
        Self::StepFailed,
        Self::TransportLost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::TransportOpened => "TransportOpened",
            Self::SettleElapsed => "SettleElapsed",
            Self::ResetAcked => "ResetAcked",
            Self::Flushed => "Flushed",
            Self::StatusAcked => "StatusAcked",
            Self::StepFailed => "StepFailed",
            Self::TransportLost => "TransportLost",
        }
    }
}

#[derive(Debug)]
pub struct Lifecycle {
    state: ConnectionState,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Closed,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Apply `event`. An illegal transition leaves the state unchanged.
    pub fn apply(&mut self, event: LifecycleEvent) -> Result<ConnectionState> {
        use ConnectionState as S;
        use LifecycleEvent as E;

        let next = match (self.state, event) {
            (S::Closed | S::Failed, E::Open) => S::Opening,
            (S::Opening, E::TransportOpened) => S::Settling,
            (S::Settling, E::SettleElapsed) => S::Resetting,
            (S::Resetting, E::ResetAcked) => S::Flushing,
            (S::Flushing, E::Flushed) => S::QueryingStatus,
            (S::QueryingStatus, E::StatusAcked) => S::Ready,
            (S::Resetting | S::Flushing | S::QueryingStatus, E::StepFailed) => S::Failed,
            (state, E::TransportLost) if state.is_open() => S::Closed,
            (from, event) => {
                return Err(ClientError::InvalidTransition {
                    from: from.as_str(),
                    event: event.as_str(),
                });
            }
        };
        self.state = next;
        Ok(next)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleEvent as E;

    const CANONICAL: [LifecycleEvent; 6] = [
        E::Open,
        E::TransportOpened,
        E::SettleElapsed,
        E::ResetAcked,
        E::Flushed,
        E::StatusAcked,
    ];

    #[test]
    fn canonical_bring_up() {
        let mut lc = Lifecycle::new();
        let states: Vec<_> = CANONICAL.iter().map(|&e| lc.apply(e).unwrap()).collect();
        assert_eq!(
            states,
            vec![
                ConnectionState::Opening,
                ConnectionState::Settling,
                ConnectionState::Resetting,
                ConnectionState::Flushing,
                ConnectionState::QueryingStatus,
                ConnectionState::Ready,
            ]
        );
    }

    #[test]
    fn illegal_transition_keeps_state() {
        let mut lc = Lifecycle::new();
        lc.apply(E::Open).unwrap();
        let err = lc.apply(E::StatusAcked).unwrap_err();
        assert!(matches!(
            err,
            ClientError::InvalidTransition {
                from: "Opening",
                event: "StatusAcked"
            }
        ));
        assert_eq!(lc.state(), ConnectionState::Opening);
    }

    #[test]
    fn step_failure_is_terminal_until_reopened() {
        let mut lc = Lifecycle::new();
        for e in &CANONICAL[..3] {
            lc.apply(*e).unwrap();
        }
        assert_eq!(lc.apply(E::StepFailed).unwrap(), ConnectionState::Failed);
        assert!(lc.apply(E::TransportLost).is_err());
        assert!(lc.apply(E::ResetAcked).is_err());
        assert_eq!(lc.apply(E::Open).unwrap(), ConnectionState::Opening);
    }

    #[test]
    fn transport_loss_from_every_open_state() {
        for depth in 1..=CANONICAL.len() {
            let mut lc = Lifecycle::new();
            for e in &CANONICAL[..depth] {
                lc.apply(*e).unwrap();
            }
            assert_eq!(lc.apply(E::TransportLost).unwrap(), ConnectionState::Closed);
        }
        assert!(Lifecycle::new().apply(E::TransportLost).is_err());
    }

    #[test]
    fn settling_and_opening_cannot_fail_a_step() {
        let mut lc = Lifecycle::new();
        lc.apply(E::Open).unwrap();
        assert!(lc.apply(E::StepFailed).is_err());
        lc.apply(E::TransportOpened).unwrap();
        assert!(lc.apply(E::StepFailed).is_err());
    }

    /// Every sequence of six events over the whole alphabet: Ready is reached
    /// only by the canonical order, and never from a sequence that failed.
    #[test]
    fn ready_only_via_canonical_order() {
        let n = LifecycleEvent::ALL.len();
        let mut ready_count = 0;

        for mut code in 0..n.pow(6) {
            let mut seq = [E::Open; 6];
            for slot in seq.iter_mut() {
                *slot = LifecycleEvent::ALL[code % n];
                code /= n;
            }

            let mut lc = Lifecycle::new();
            let mut accepted = Vec::new();
            for &e in &seq {
                if lc.apply(e).is_ok() {
                    accepted.push(e);
                }
                if lc.state() == ConnectionState::Ready {
                    assert_eq!(accepted, CANONICAL.to_vec(), "sequence {seq:?}");
                    ready_count += 1;
                }
            }
        }

        assert_eq!(ready_count, 1);
    }
}
