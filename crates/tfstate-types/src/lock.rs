use serde::Deserialize;

use crate::error::{TypeError, TypeResult};

/// Name of the holder-id field inside a lock envelope.
pub const LOCK_ID_FIELD: &str = "ID";

/// The parts of a client lock envelope this backend understands.
///
/// Clients send an arbitrary JSON object when locking. Only `ID` is needed
/// to decide who holds the lock; `Operation`, `Who` and `Created` are kept
/// for conflict logs and everything else is ignored. The stored lock is
/// always the exact bytes the client sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockInfo {
    pub id: String,
    pub operation: Option<String>,
    pub who: Option<String>,
    pub created: Option<String>,
}

#[derive(Deserialize)]
struct RawLockInfo {
    #[serde(rename = "ID")]
    id: Option<String>,
    #[serde(rename = "Operation")]
    operation: Option<String>,
    #[serde(rename = "Who")]
    who: Option<String>,
    #[serde(rename = "Created")]
    created: Option<String>,
}

impl LockInfo {
    /// Parse a raw lock envelope.
    ///
    /// Fails with [`TypeError::LockParse`] if `raw` is not a JSON object of
    /// the expected shape, and with [`TypeError::MissingLockField`] if the
    /// object has no `ID`.
    pub fn parse(raw: &[u8]) -> TypeResult<Self> {
        let parsed: RawLockInfo =
            serde_json::from_slice(raw).map_err(|e| TypeError::LockParse(e.to_string()))?;
        let id = parsed.id.ok_or_else(|| TypeError::MissingLockField {
            field: LOCK_ID_FIELD,
            payload: String::from_utf8_lossy(raw).into_owned(),
        })?;
        Ok(Self {
            id,
            operation: parsed.operation,
            who: parsed.who,
            created: parsed.created,
        })
    }

    /// Extract only the holder id from a raw lock envelope.
    pub fn holder_id(raw: &[u8]) -> TypeResult<String> {
        Self::parse(raw).map(|lock| lock.id)
    }
}
