//! The lock protocol.
//!
//! Each request is resolved against a single fingerprint. GET is a plain
//! read; every other supported verb is one atomic [`StateStore::update`],
//! so the lock check and the write it guards cannot interleave with another
//! request for the same fingerprint.
//!
//! A request whose client has gone away is abandoned at the last point
//! before the write: the `update` closure checks the request's
//! [`Cancellation`] once it holds the record, and declines to write.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tfstate_store::StateStore;
use tfstate_types::{LockInfo, StateId, StateRecord};

use crate::error::{ServerError, ServerResult};

/// Verbs of the remote-state protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Delete,
    Lock,
    Unlock,
}

impl Verb {
    /// Map an HTTP method name to a verb.
    pub fn parse(method: &str) -> ServerResult<Self> {
        match method {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "DELETE" => Ok(Self::Delete),
            "LOCK" => Ok(Self::Lock),
            "UNLOCK" => Ok(Self::Unlock),
            other => Err(ServerError::UnsupportedMethod(other.to_owned())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
            Self::Lock => "LOCK",
            Self::Unlock => "UNLOCK",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared flag raised when the client of an in-flight request disconnects.
#[derive(Clone, Debug, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One state request, already fingerprinted.
#[derive(Clone, Debug)]
pub struct StateRequest {
    pub verb: Verb,
    pub id: StateId,
    pub body: Vec<u8>,
    /// Lock id supplied by the caller (`?ID=`); absent compares as empty.
    pub lock_id: Option<String>,
    pub cancellation: Cancellation,
}

/// Applies the lock protocol to a [`StateStore`].
#[derive(Clone)]
pub struct LockDispatcher {
    store: Arc<dyn StateStore>,
}

impl LockDispatcher {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Resolve a request. `Ok` carries the response body for a 200.
    pub fn dispatch(&self, request: StateRequest) -> ServerResult<Vec<u8>> {
        let StateRequest { verb, id, body, lock_id, cancellation } = request;
        if cancellation.is_cancelled() {
            return Err(ServerError::Cancelled);
        }
        let lock_id = lock_id.unwrap_or_default();
        match verb {
            Verb::Get => self.get(&id),
            Verb::Lock => self.lock(&id, body, &cancellation),
            Verb::Unlock => self.unlock(&id, &cancellation),
            Verb::Post => self.write(verb, &id, &lock_id, body, &cancellation),
            Verb::Delete => self.write(verb, &id, &lock_id, Vec::new(), &cancellation),
        }
    }

    fn get(&self, id: &StateId) -> ServerResult<Vec<u8>> {
        Ok(self.store.lookup(id)?.data)
    }

    fn lock(
        &self,
        id: &StateId,
        envelope: Vec<u8>,
        cancellation: &Cancellation,
    ) -> ServerResult<Vec<u8>> {
        let mut outcome = Ok(());
        let previous = self.store.update(id, &mut |current: &StateRecord| {
            if current.is_locked() {
                outcome = Err(ServerError::Conflict { lock: current.lock.clone() });
                return None;
            }
            if cancellation.is_cancelled() {
                outcome = Err(ServerError::Cancelled);
                return None;
            }
            Some(current.with_lock(envelope.clone()))
        })?;
        if let Err(err) = outcome {
            if previous.is_locked() {
                log_conflict(Verb::Lock, id, &previous.lock);
            }
            return Err(err);
        }
        tracing::debug!(id = %id.short(), before = %previous.phase(), "lock acquired");
        Ok(Vec::new())
    }

    /// Releases the lock without checking the caller's id. Clients that lost
    /// their lock id (crashed runs, `force-unlock`) rely on this.
    fn unlock(&self, id: &StateId, cancellation: &Cancellation) -> ServerResult<Vec<u8>> {
        let mut cancelled = false;
        let previous = self.store.update(id, &mut |current: &StateRecord| {
            if !current.is_locked() {
                return None;
            }
            cancelled = cancellation.is_cancelled();
            (!cancelled).then(|| current.unlocked())
        })?;
        if cancelled {
            return Err(ServerError::Cancelled);
        }
        tracing::debug!(id = %id.short(), before = %previous.phase(), "unlocked");
        Ok(Vec::new())
    }

    /// Replace the data, provided the caller holds the lock (if any).
    fn write(
        &self,
        verb: Verb,
        id: &StateId,
        lock_id: &str,
        data: Vec<u8>,
        cancellation: &Cancellation,
    ) -> ServerResult<Vec<u8>> {
        let mut rejected = None;
        let previous = self.store.update(id, &mut |current: &StateRecord| {
            if let Err(err) = check_holder(current, lock_id) {
                rejected = Some(err);
                return None;
            }
            if cancellation.is_cancelled() {
                rejected = Some(ServerError::Cancelled);
                return None;
            }
            Some(current.with_data(data.clone()))
        })?;
        if let Some(err) = rejected {
            if matches!(err, ServerError::Conflict { .. }) {
                log_conflict(verb, id, &previous.lock);
            }
            return Err(err);
        }
        tracing::debug!(%verb, id = %id.short(), before = %previous.phase(), "state written");
        Ok(Vec::new())
    }
}

impl fmt::Debug for LockDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockDispatcher").finish_non_exhaustive()
    }
}

/// An unlocked record accepts any caller; a locked one only the holder.
fn check_holder(current: &StateRecord, lock_id: &str) -> ServerResult<()> {
    if !current.is_locked() {
        return Ok(());
    }
    let holder = LockInfo::holder_id(&current.lock)?;
    if holder != lock_id {
        tracing::debug!(holder = %holder, caller = %lock_id, "lock id mismatch");
        return Err(ServerError::Conflict {
            lock: current.lock.clone(),
        });
    }
    Ok(())
}

/// Log a 423 with whatever the stored envelope says about its holder.
fn log_conflict(verb: Verb, id: &StateId, lock: &[u8]) {
    match LockInfo::parse(lock) {
        Ok(holder) => tracing::info!(
            %verb,
            id = %id.short(),
            holder = %holder.id,
            who = holder.who.as_deref().unwrap_or("-"),
            operation = holder.operation.as_deref().unwrap_or("-"),
            since = holder.created.as_deref().unwrap_or("-"),
            "lock already held"
        ),
        Err(_) => tracing::info!(%verb, id = %id.short(), "lock already held"),
    }
}
