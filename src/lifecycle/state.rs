//! Server state machine.
//!
//! `Created → Running → ShuttingDown → Stopped`. States only move forward;
//! observers subscribe through a watch channel.

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServerState {
    Created,
    Running,
    ShuttingDown,
    Stopped,
}

impl std::fmt::Display for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ServerState::Created => "created",
            ServerState::Running => "running",
            ServerState::ShuttingDown => "shutting_down",
            ServerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Shared, monotonic holder of the current `ServerState`.
#[derive(Debug)]
pub struct StateCell {
    tx: watch::Sender<ServerState>,
}

impl StateCell {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ServerState::Created);
        Self { tx }
    }

    pub fn current(&self) -> ServerState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.tx.subscribe()
    }

    /// Move `from → to` atomically. Returns false if the current state is
    /// not `from` or `to` is not later than `from`.
    pub fn transition(&self, from: ServerState, to: ServerState) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == from && to > from {
                *state = to;
                true
            } else {
                false
            }
        })
    }

    /// Move to `to` from any earlier state. Returns false if already there
    /// or beyond.
    pub fn advance(&self, to: ServerState) -> bool {
        self.tx.send_if_modified(|state| {
            if *state < to {
                *state = to;
                true
            } else {
                false
            }
        })
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_created() {
        assert_eq!(StateCell::new().current(), ServerState::Created);
    }

    #[test]
    fn transitions_only_from_expected_state() {
        let cell = StateCell::new();
        assert!(!cell.transition(ServerState::Running, ServerState::ShuttingDown));
        assert!(cell.transition(ServerState::Created, ServerState::Running));
        assert!(!cell.transition(ServerState::Created, ServerState::Running));
        assert_eq!(cell.current(), ServerState::Running);
    }

    #[test]
    fn never_moves_backwards() {
        let cell = StateCell::new();
        assert!(cell.advance(ServerState::Stopped));
        assert!(!cell.advance(ServerState::Running));
        assert!(!cell.transition(ServerState::Stopped, ServerState::Created));
        assert_eq!(cell.current(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let cell = StateCell::new();
        let mut rx = cell.subscribe();
        cell.transition(ServerState::Created, ServerState::Running);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), ServerState::Running);
    }
}
