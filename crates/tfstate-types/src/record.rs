use std::fmt;

use serde::{Deserialize, Serialize};

/// Lock/data combination of a stored record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LockPhase {
    UnlockedEmpty,
    UnlockedHasData,
    LockedEmpty,
    LockedHasData,
}

impl fmt::Display for LockPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnlockedEmpty => write!(f, "unlocked-empty"),
            Self::UnlockedHasData => write!(f, "unlocked-has-data"),
            Self::LockedEmpty => write!(f, "locked-empty"),
            Self::LockedHasData => write!(f, "locked-has-data"),
        }
    }
}

/// The persisted state and lock of one workspace.
///
/// Both fields are opaque bytes. An empty `lock` means unlocked; an empty
/// `data` means nothing has been written (or it was deleted). The default
/// value is what a store reports for a key it has never seen.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    pub data: Vec<u8>,
    pub lock: Vec<u8>,
}

impl StateRecord {
    pub fn new(data: impl Into<Vec<u8>>, lock: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            lock: lock.into(),
        }
    }

    pub fn is_locked(&self) -> bool {
        !self.lock.is_empty()
    }

    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }

    pub fn phase(&self) -> LockPhase {
        match (self.is_locked(), self.has_data()) {
            (false, false) => LockPhase::UnlockedEmpty,
            (false, true) => LockPhase::UnlockedHasData,
            (true, false) => LockPhase::LockedEmpty,
            (true, true) => LockPhase::LockedHasData,
        }
    }

    /// Same data, new lock envelope.
    pub fn with_lock(&self, lock: impl Into<Vec<u8>>) -> Self {
        Self {
            data: self.data.clone(),
            lock: lock.into(),
        }
    }

    /// Same data, lock cleared.
    pub fn unlocked(&self) -> Self {
        self.with_lock(Vec::new())
    }

    /// Same lock, new data.
    pub fn with_data(&self, data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            lock: self.lock.clone(),
        }
    }
}
