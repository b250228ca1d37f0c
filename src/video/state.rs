//! Frame-copy loop state machine

use std::sync::atomic::{AtomicU8, Ordering};

/// States of the frame-copy loop.
///
/// `Stopped` is terminal: re-entering `Running` requires building a new
/// video pipeline via `process`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No pipeline built yet
    Idle = 0,
    /// Copying decoded frames on every display-refresh tick
    Running = 1,
    /// Torn down; no further copies occur
    Stopped = 2,
}

impl LoopState {
    /// Convert from u8 value. Returns Stopped for invalid values.
    #[inline]
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LoopState::Idle,
            1 => LoopState::Running,
            _ => LoopState::Stopped,
        }
    }

    /// Check if this state transition is valid
    pub fn can_transition_to(&self, target: &LoopState) -> bool {
        use LoopState::*;

        match (self, target) {
            (Idle, Running) => true,
            // Torn down before the first tick ever ran
            (Idle, Stopped) => true,
            (Running, Stopped) => true,

            // Terminal
            (Stopped, _) => false,

            // Self-transitions
            (a, b) if a == b => true,

            _ => false,
        }
    }
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopState::Idle => write!(f, "Idle"),
            LoopState::Running => write!(f, "Running"),
            LoopState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Lock-free shared handle on the loop state.
///
/// Read by the copy task on every tick, written only from session-lifecycle
/// transitions.
#[derive(Debug)]
pub struct SharedLoopState(AtomicU8);

impl SharedLoopState {
    pub fn new() -> Self {
        Self(AtomicU8::new(LoopState::Idle as u8))
    }

    pub fn get(&self) -> LoopState {
        LoopState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Apply a transition if it is valid; returns whether it took effect.
    pub fn transition(&self, target: LoopState) -> bool {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if !LoopState::from_u8(current).can_transition_to(&target) {
                return false;
            }
            match self.0.compare_exchange(
                current,
                target as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.get() == LoopState::Running
    }

    pub fn is_stopped(&self) -> bool {
        self.get() == LoopState::Stopped
    }
}

impl Default for SharedLoopState {
    fn default() -> Self {
        Self::new()
    }
}
