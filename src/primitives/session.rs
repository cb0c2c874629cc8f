//! The session interface required from the embedding application.
//!
//! The core does not own any session storage. It only requires a per-user mapping that survives
//! the redirect round trip from the authorization request to the consent decision, with typed
//! access to a transaction container stored under a configurable session key.

use std::collections::HashMap;
use std::error;
use std::fmt;

/// Failure modes of a session implementation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionError {
    /// The session exists but the container under the expected session key does not.
    ///
    /// This is a configuration error of the embedding application, e.g. two server instances
    /// configured with different session keys, and never a client-facing oauth error.
    MissingContainer,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SessionError::MissingContainer => f.write_str("invalid session key"),
        }
    }
}

impl error::Error for SessionError {}

/// A per-user session holding pending authorization transactions.
///
/// Implementations store serialized transactions in a container keyed by the session key, itself
/// a mapping from transaction id to the serialized form. `set` creates the container on demand,
/// `get` reports a missing container as [`SessionError::MissingContainer`] and `remove` is
/// idempotent.
///
/// Concurrent requests for the same session race on last-write-wins; serializing access is the
/// responsibility of the session storage, not of this interface.
pub trait TransactionSession {
    /// Read the serialized transaction stored under `id`, without removing it.
    fn get(&self, session_key: &str, id: &str) -> Result<Option<String>, SessionError>;

    /// Store a serialized transaction under `id`, creating the container if necessary.
    fn set(&mut self, session_key: &str, id: &str, value: String) -> Result<(), SessionError>;

    /// Delete the transaction stored under `id`, if any.
    fn remove(&mut self, session_key: &str, id: &str) -> Result<(), SessionError>;
}

/// An in-memory session, useful for tests and single-process embeddings.
#[derive(Clone, Debug, Default)]
pub struct SessionMap {
    containers: HashMap<String, HashMap<String, String>>,
}

impl SessionMap {
    /// Create an empty session.
    pub fn new() -> Self {
        SessionMap::default()
    }

    /// Number of transactions pending under a session key.
    pub fn pending(&self, session_key: &str) -> usize {
        self.containers.get(session_key).map_or(0, HashMap::len)
    }
}

impl TransactionSession for SessionMap {
    fn get(&self, session_key: &str, id: &str) -> Result<Option<String>, SessionError> {
        let container = self
            .containers
            .get(session_key)
            .ok_or(SessionError::MissingContainer)?;
        Ok(container.get(id).cloned())
    }

    fn set(&mut self, session_key: &str, id: &str, value: String) -> Result<(), SessionError> {
        self.containers
            .entry(session_key.to_string())
            .or_insert_with(HashMap::new)
            .insert(id.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, session_key: &str, id: &str) -> Result<(), SessionError> {
        if let Some(container) = self.containers.get_mut(session_key) {
            container.remove(id);
        }
        Ok(())
    }
}
