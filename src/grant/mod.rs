//! Grant handlers for the authorization endpoint.
//!
//! A grant handler owns one `response_type` value. It validates incoming authorization requests
//! into transaction payloads and, once the resource owner has decided, turns a transaction into
//! the parameters delivered back to the client through a response mode encoder.

pub mod code;
pub mod implicit;

use crate::endpoint::{BoxError, HandlerOutcome, QueryParameter, ResponseMode};
use crate::error::AuthorizationError;
use crate::primitives::transaction::{Transaction, TransactionPayload};

/// An error produced while handling an authorization request.
#[derive(Debug)]
pub enum GrantError {
    /// No validated redirect target exists yet, the error surfaces to the embedding application.
    Direct(AuthorizationError),

    /// A redirect target was validated, the error is delivered to it through the encoder.
    Redirect {
        /// The validated target of the delivery.
        redirect_uri: String,
        /// The error, already carrying the request state where one was given.
        error: AuthorizationError,
    },

    /// User supplied validation or issuance code failed, passed through unchanged.
    Failure(BoxError),
}

/// The resource owner's decision over a pending transaction.
#[derive(Clone, Debug)]
pub struct Decision {
    /// Identity of the deciding resource owner.
    pub owner: String,

    /// Whether the owner allowed the authorization.
    pub allowed: bool,

    /// A narrowed scope chosen by the owner, `None` to keep the requested one.
    pub scope: Option<Vec<String>>,
}

/// The successful result of a grant handler's response phase.
#[derive(Clone, Debug)]
pub struct GrantResponse {
    /// The validated uri the parameters are delivered to.
    pub redirect_uri: String,

    /// The parameters, in delivery order.
    pub params: Vec<(String, String)>,
}

/// The result of validating a client against an authorization request.
pub enum Validated<C> {
    /// The client exists and may use this grant with the given redirect uri.
    Client {
        /// The resolved client.
        client: C,
        /// The validated redirect uri.
        redirect_uri: String,
    },

    /// The client is unknown or not allowed to use this grant.
    Denied,

    /// The request fails validation with a specific protocol error.
    ///
    /// Lets the callback pick the rfc6749 code itself, e.g. `invalid_request` when the
    /// presented redirect uri does not match the registered one, or `invalid_client` for an
    /// unknown client id.
    Rejected(AuthorizationError),
}

/// Client validation callback of a grant handler, run once at transaction creation.
pub type ValidateFn<C> =
    Box<dyn Fn(&str, Option<&str>) -> Result<Validated<C>, BoxError> + Send + Sync>;

/// One handler in the chain registered for a `response_type`.
pub trait GrantHandler<C> {
    /// Validate an authorization request into a transaction payload.
    ///
    /// `Pass` yields to the next handler in the chain.
    fn request(
        &self, query: &dyn QueryParameter,
    ) -> Result<HandlerOutcome<TransactionPayload<C>>, GrantError>;

    /// Turn a decided transaction into delivery parameters.
    fn respond(
        &self, transaction: &Transaction<C>, decision: &Decision,
    ) -> Result<HandlerOutcome<GrantResponse>, GrantError>;

    /// The response mode results and errors of this handler are encoded with.
    fn response_mode(&self) -> ResponseMode {
        ResponseMode::Query
    }
}

/// Parameters with a protocol meaning on the authorization endpoint.
///
/// Everything else in the query is carried on the transaction as an extension.
const RESERVED: [&str; 5] = ["response_type", "client_id", "redirect_uri", "scope", "state"];

pub(crate) fn extension_params(query: &dyn QueryParameter) -> Vec<(String, String)> {
    query
        .normalize()
        .into_iter()
        .filter(|(key, _)| !RESERVED.contains(&key.as_str()))
        .collect()
}
