//! Pending authorization transactions and their session-backed store.
//!
//! An authorization request is a two-step protocol: the request is validated, then the resource
//! owner decides over it, usually after a redirect to a consent screen. The transaction carries
//! the validated request across that redirect. Its id is both the session lookup key and the
//! csrf token a decision must present.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::endpoint::ResponseMode;

use super::generator::TransactionId;
use super::session::{SessionError, TransactionSession};

/// The normalized parameters of an authorization request, as captured at validation time.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AuthorizationRequest {
    /// The `response_type` the request was dispatched on.
    pub response_type: String,

    /// Identity of the client the grant is requested for.
    pub client_id: String,

    /// The raw redirect uri named in the request, if any. The validated uri lives on the
    /// transaction itself.
    pub redirect_uri: Option<String>,

    /// The requested scope, already split into ordered tokens.
    pub scope: Vec<String>,

    /// Opaque value used by the client to maintain state between request and callback.
    pub state: Option<String>,

    /// Remaining request parameters in request order, for grant-specific extensions.
    #[serde(default)]
    pub extensions: Vec<(String, String)>,
}

/// A pending authorization request bound to a resolved client.
///
/// Only a successful completion, an explicit denial or a revoked client delete a transaction
/// from the session; transient failures leave it in place so the decision can be retried.
#[derive(Clone, Debug)]
pub struct Transaction<C> {
    /// The random identifier, doubling as csrf token.
    pub id: String,

    /// The client the authorization was requested for.
    pub client: C,

    /// The validated redirect uri results are delivered to.
    pub redirect_uri: String,

    /// The normalized request parameters.
    pub request: AuthorizationRequest,

    /// The response mode of the handler that validated the request.
    ///
    /// Remembered so errors and denials decided after the consent round trip are delivered
    /// through the same channel a success would use.
    pub mode: ResponseMode,

    /// Arbitrary data carried from request validation to grant completion.
    pub info: Option<Value>,
}

/// What a grant handler produces when it accepts an authorization request.
///
/// The dispatcher turns this into a stored [`Transaction`] by generating an id and serializing
/// the client through the registered serializer functions.
#[derive(Clone, Debug)]
pub struct TransactionPayload<C> {
    /// The resolved client.
    pub client: C,

    /// The validated redirect uri.
    pub redirect_uri: String,

    /// The normalized request parameters.
    pub request: AuthorizationRequest,

    /// Arbitrary data carried to grant completion.
    pub info: Option<Value>,
}

/// The session-storable form of a transaction.
///
/// The client is replaced by the compact representation produced by the registered client
/// serializer, commonly just its id.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StoredTransaction {
    /// Serialized compact client representation.
    pub client: String,

    /// The validated redirect uri.
    pub redirect_uri: String,

    /// The normalized request parameters.
    pub request: AuthorizationRequest,

    /// The response mode of the validating handler.
    #[serde(default)]
    pub mode: ResponseMode,

    /// Arbitrary data carried to grant completion.
    pub info: Option<Value>,
}

/// Failure modes of the transaction store.
#[derive(Debug)]
pub enum StoreError {
    /// The underlying session failed.
    Session(SessionError),

    /// The stored value under the presented id was not a transaction.
    Corrupt,
}

impl From<SessionError> for StoreError {
    fn from(err: SessionError) -> Self {
        StoreError::Session(err)
    }
}

/// Keyed store of pending transactions inside a [`TransactionSession`].
pub struct TransactionStore {
    session_key: String,
    generator: Box<dyn TransactionId + Send + Sync>,
}

impl TransactionStore {
    /// A store writing under the given session key, generating ids with `generator`.
    pub fn new(session_key: impl Into<String>, generator: Box<dyn TransactionId + Send + Sync>) -> Self {
        TransactionStore {
            session_key: session_key.into(),
            generator,
        }
    }

    /// The session key transactions are stored under.
    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    /// Store a new transaction, returning its generated id.
    pub fn create(
        &self, session: &mut dyn TransactionSession, stored: &StoredTransaction,
    ) -> Result<String, StoreError> {
        let id = self.generator.generate();
        // Serializing a struct of strings and json values can not fail.
        let raw = serde_json::to_string(stored).map_err(|_| StoreError::Corrupt)?;
        session.set(&self.session_key, &id, raw)?;
        Ok(id)
    }

    /// Load a transaction by id, without removing it.
    pub fn load(
        &self, session: &dyn TransactionSession, id: &str,
    ) -> Result<Option<StoredTransaction>, StoreError> {
        let raw = match session.get(&self.session_key, id)? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        serde_json::from_str(&raw).map(Some).map_err(|_| StoreError::Corrupt)
    }

    /// Delete a transaction by id. Deleting an absent id is not an error.
    pub fn remove(&self, session: &mut dyn TransactionSession, id: &str) -> Result<(), StoreError> {
        session.remove(&self.session_key, id)?;
        Ok(())
    }
}
