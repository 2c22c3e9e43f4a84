//! Single-flight coordination of token refreshes
//!
//! The first caller to [`RefreshCoordinator::join`] while no refresh is running
//! becomes the leader and performs the refresh. Everyone arriving before the
//! leader settles becomes a waiter and receives the leader's outcome.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::RefreshError;

/// New access token, or why there is none
pub type RefreshOutcome = Result<String, RefreshError>;

#[derive(Debug, Default)]
struct RefreshState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Shared by every request a gateway sends
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

/// Role handed out by [`RefreshCoordinator::join`]
#[derive(Debug)]
pub enum RefreshTicket {
    /// Perform the refresh and settle the guard
    Leader(LeaderGuard),
    /// Await the leader's outcome
    Waiter(oneshot::Receiver<RefreshOutcome>),
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(self: &Arc<Self>) -> RefreshTicket {
        let mut state = self.state.lock();
        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            RefreshTicket::Waiter(rx)
        } else {
            state.in_flight = true;
            RefreshTicket::Leader(LeaderGuard {
                coordinator: Arc::clone(self),
                settled: false,
            })
        }
    }

    pub fn in_flight(&self) -> bool {
        self.state.lock().in_flight
    }

    /// Number of callers parked on the running refresh
    pub fn waiting(&self) -> usize {
        self.state.lock().waiters.len()
    }

    fn settle(&self, outcome: &RefreshOutcome) {
        // Clearing the flag and draining under one lock means a caller either
        // lands in this batch or starts the next refresh.
        let waiters = {
            let mut state = self.state.lock();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };

        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// Held by the leader while its refresh runs
///
/// Dropping it unsettled (the leader's future was cancelled) fails every
/// waiter with [`RefreshError::Abandoned`].
#[derive(Debug)]
pub struct LeaderGuard {
    coordinator: Arc<RefreshCoordinator>,
    settled: bool,
}

impl LeaderGuard {
    /// Publish the outcome to every waiter and release leadership
    pub fn settle(mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        self.coordinator.settle(outcome);
    }
}

impl Drop for LeaderGuard {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator.settle(&Err(RefreshError::Abandoned));
        }
    }
}
