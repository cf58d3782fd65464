//! Per-attempt sync state machine
//!
//! ```text
//! Discovered → Debounced → Parsing → Resolving → Matching → Reconciling → Committed
//!      └──────────┴───────────┴──────────┴───────────┴───────────┴──→ Failed(reason)
//! ```
//!
//! An attempt ends in `Committed` or `Failed`. The next change event for the
//! same file starts a fresh attempt at `Discovered`.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a playlist sync attempt currently is
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Discovered,
    Debounced,
    Parsing,
    Resolving,
    Matching,
    Reconciling,
    Committed,
    Failed(String),
}

impl SyncState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncState::Committed | SyncState::Failed(_))
    }

    fn can_advance_to(&self, next: &SyncState) -> bool {
        use SyncState::*;

        if let Failed(_) = next {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (Discovered, Debounced)
                | (Debounced, Parsing)
                | (Parsing, Resolving)
                | (Resolving, Matching)
                | (Matching, Reconciling)
                | (Reconciling, Committed)
        )
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Discovered => write!(f, "discovered"),
            SyncState::Debounced => write!(f, "debounced"),
            SyncState::Parsing => write!(f, "parsing"),
            SyncState::Resolving => write!(f, "resolving"),
            SyncState::Matching => write!(f, "matching"),
            SyncState::Reconciling => write!(f, "reconciling"),
            SyncState::Committed => write!(f, "committed"),
            SyncState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// One pass of one playlist through the state machine
#[derive(Debug, Clone)]
pub struct SyncAttempt {
    path: PathBuf,
    state: SyncState,
    history: Vec<SyncState>,
}

impl SyncAttempt {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: SyncState::Discovered,
            history: vec![SyncState::Discovered],
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Every state this attempt has been in, oldest first
    pub fn history(&self) -> &[SyncState] {
        &self.history
    }

    /// Move to `next`, returning false if the transition is not allowed
    ///
    /// A rejected transition leaves the attempt where it was.
    pub fn advance(&mut self, next: SyncState) -> bool {
        if !self.state.can_advance_to(&next) {
            debug!(
                "Rejected transition {} -> {} for {:?}",
                self.state, next, self.path
            );
            return false;
        }

        debug!("{:?}: {} -> {}", self.path, self.state, next);
        self.history.push(next.clone());
        self.state = next;
        true
    }

    /// End the attempt as failed
    pub fn fail(&mut self, reason: impl Into<String>) -> bool {
        self.advance(SyncState::Failed(reason.into()))
    }
}
