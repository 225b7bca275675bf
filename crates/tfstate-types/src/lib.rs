//! Foundation types for the tfstate remote-state backend.
//!
//! Every other tfstate crate depends on `tfstate-types`.
//!
//! # Key Types
//!
//! - [`StateId`] -- Workspace fingerprint (SHA-256 of path and credentials)
//! - [`Credentials`] -- Basic-auth username/password pair fed into the fingerprint
//! - [`StateRecord`] -- Opaque state blob plus opaque lock envelope
//! - [`LockInfo`] -- Parsed view of a lock envelope, exposing the holder `ID`

pub mod error;
pub mod fingerprint;
pub mod lock;
pub mod record;

pub use error::{TypeError, TypeResult};
pub use fingerprint::{Credentials, StateId, FINGERPRINT_HEX_LEN};
pub use lock::{LockInfo, LOCK_ID_FIELD};
pub use record::{LockPhase, StateRecord};
