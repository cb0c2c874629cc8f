//! The dispatcher connecting web requests, handler chains and the transaction store.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use url::Url;

use crate::error::{AuthorizationError, ErrorCode, TokenError};
use crate::exchange::{ExchangeError, ExchangeHandler, TokenResponse};
use crate::grant::{Decision, GrantError, GrantHandler};
use crate::primitives::generator::RandomIdGenerator;
use crate::primitives::scope::ScopeParser;
use crate::primitives::session::SessionError;
use crate::primitives::transaction::{
    StoredTransaction, StoreError, Transaction, TransactionPayload, TransactionStore,
};

use super::error::{BoxError, ServerError};
use super::response_mode::{self, ResponseMode};
use super::{
    HandlerOutcome, OwnerConsent, OwnerSolicitor, QueryParameter, Solicitation, WebRequest,
    WebResponse,
};

/// Outcome of one registered client deserializer.
pub enum Deserialized<C> {
    /// The stored representation resolved to this client.
    Client(C),

    /// The stored representation is recognized but the client no longer exists.
    ///
    /// The pending transaction is purged and the decision rejected, since completing it would
    /// issue a grant to a client deleted after the transaction was created.
    Revoked,

    /// The representation is not recognized, the next deserializer is consulted.
    Pass,
}

/// Converts a client into its compact session representation, `None` to pass.
pub type SerializeFn<C> = Box<dyn Fn(&C) -> Result<Option<String>, BoxError> + Send + Sync>;

/// Restores a client from its compact session representation.
pub type DeserializeFn<C> = Box<dyn Fn(&str) -> Result<Deserialized<C>, BoxError> + Send + Sync>;

/// Configuration of a [`Server`].
pub struct ServerOptions {
    /// The session key the transaction container is stored under.
    pub session_key: String,

    /// The query and body field carrying the transaction id of a decision.
    pub transaction_field: String,

    /// Bytes of entropy in a transaction id.
    pub id_length: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        ServerOptions {
            session_key: "authorize".to_string(),
            transaction_field: "transaction_id".to_string(),
            id_length: 12,
        }
    }
}

/// The authorization server core.
///
/// Dispatches authorization requests by `response_type` to registered [`GrantHandler`] chains
/// and token requests by `grant_type` to registered [`ExchangeHandler`] chains. Generic over the
/// client type `C`, which it never inspects: conversion to and from the session form goes
/// through the registered serializer functions.
pub struct Server<C> {
    grants: HashMap<String, Vec<Arc<dyn GrantHandler<C> + Send + Sync>>>,
    exchanges: HashMap<String, Vec<Arc<dyn ExchangeHandler<C> + Send + Sync>>>,
    serializers: Vec<SerializeFn<C>>,
    deserializers: Vec<DeserializeFn<C>>,
    store: TransactionStore,
    transaction_field: String,
    scope: ScopeParser,
}

enum Validation<C> {
    Ready {
        payload: TransactionPayload<C>,
        mode: ResponseMode,
    },
    Failed {
        error: GrantError,
        mode: ResponseMode,
    },
}

impl<C> Server<C> {
    /// A server with the default options.
    pub fn new() -> Self {
        Server::with_options(ServerOptions::default())
    }

    /// A server with explicit options.
    pub fn with_options(options: ServerOptions) -> Self {
        Server {
            grants: HashMap::new(),
            exchanges: HashMap::new(),
            serializers: Vec::new(),
            deserializers: Vec::new(),
            store: TransactionStore::new(
                options.session_key,
                Box::new(RandomIdGenerator::new(options.id_length)),
            ),
            transaction_field: options.transaction_field,
            scope: ScopeParser::default(),
        }
    }

    /// Replace the scope parser used for the narrowed scope of a decision.
    pub fn with_scope_parser(mut self, scope: ScopeParser) -> Self {
        self.scope = scope;
        self
    }

    /// Register a grant handler under one or more `response_type` values.
    ///
    /// Repeated registrations under the same type form an ordered chain. Registering under
    /// several types at once makes them aliases of the same chain entry.
    ///
    /// Panics when `types` is empty, a programmer error caught at startup.
    pub fn register_grant(
        &mut self, types: &[&str], handler: impl GrantHandler<C> + Send + Sync + 'static,
    ) {
        assert!(!types.is_empty(), "a grant handler needs at least one response type");
        let handler: Arc<dyn GrantHandler<C> + Send + Sync> = Arc::new(handler);
        for ty in types {
            self.grants
                .entry(ty.to_string())
                .or_insert_with(Vec::new)
                .push(handler.clone());
        }
    }

    /// Register an exchange handler under one or more `grant_type` values.
    ///
    /// Panics when `types` is empty, a programmer error caught at startup.
    pub fn register_exchange(
        &mut self, types: &[&str], handler: impl ExchangeHandler<C> + Send + Sync + 'static,
    ) {
        assert!(!types.is_empty(), "an exchange handler needs at least one grant type");
        let handler: Arc<dyn ExchangeHandler<C> + Send + Sync> = Arc::new(handler);
        for ty in types {
            self.exchanges
                .entry(ty.to_string())
                .or_insert_with(Vec::new)
                .push(handler.clone());
        }
    }

    /// Append a client serializer. The first one returning `Some` wins.
    pub fn serialize_client(
        &mut self, serialize: impl Fn(&C) -> Result<Option<String>, BoxError> + Send + Sync + 'static,
    ) {
        self.serializers.push(Box::new(serialize));
    }

    /// Append a client deserializer. The first one not passing wins.
    pub fn deserialize_client(
        &mut self, deserialize: impl Fn(&str) -> Result<Deserialized<C>, BoxError> + Send + Sync + 'static,
    ) {
        self.deserializers.push(Box::new(deserialize));
    }

    /// Handle an authorization endpoint request.
    ///
    /// Validates the request through the grant chain for its `response_type`, stores the
    /// resulting transaction in the session and consults `solicitor` for the owner's consent.
    /// An immediate `Authorized` or `Denied` completes the transaction in the same request; an
    /// `InProgress` response leaves it pending for a later [`Server::decision`].
    pub fn authorize<W: WebRequest>(
        &self, request: &mut W, solicitor: &mut dyn OwnerSolicitor<W, C>,
    ) -> Result<W::Response, ServerError<W::Error>> {
        let validated = {
            let query = request.query().map_err(ServerError::Web)?;
            let response_type = match query.unique_value("response_type") {
                Some(ty) => ty.into_owned(),
                None => {
                    return Err(AuthorizationError::new(
                        ErrorCode::InvalidRequest,
                        "missing response_type parameter",
                    )
                    .into())
                }
            };
            debug!("authorization request with response_type {}", response_type);
            self.validate_request(&response_type, query)
        };

        let (payload, mode) = match validated {
            Validation::Ready { payload, mode } => (payload, mode),
            Validation::Failed {
                error: GrantError::Direct(error),
                ..
            } => return Err(error.into()),
            Validation::Failed {
                error: GrantError::Failure(error),
                ..
            } => return Err(ServerError::Failure(error)),
            Validation::Failed {
                error: GrantError::Redirect { redirect_uri, error },
                mode,
            } => {
                let mut response = request.response().map_err(ServerError::Web)?;
                encode_to(mode, &mut response, &redirect_uri, error.into_params())?;
                return Ok(response);
            }
        };

        let serialized = self.run_serializers(&payload.client)?;
        let stored = StoredTransaction {
            client: serialized,
            redirect_uri: payload.redirect_uri.clone(),
            request: payload.request.clone(),
            mode,
            info: payload.info.clone(),
        };

        let id = {
            let session = request.session().ok_or(ServerError::NoSession)?;
            self.store.create(session, &stored).map_err(store_error)?
        };

        let solicitation = Solicitation {
            id: &id,
            client: &payload.client,
            redirect_uri: &payload.redirect_uri,
            request: &payload.request,
        };

        match solicitor.check_consent(request, solicitation) {
            OwnerConsent::InProgress(response) => Ok(response),
            OwnerConsent::Error(error) => Err(ServerError::Web(error)),
            OwnerConsent::Authorized(owner) => {
                let transaction = Transaction {
                    id,
                    client: payload.client,
                    redirect_uri: payload.redirect_uri,
                    request: payload.request,
                    mode,
                    info: payload.info,
                };
                let decision = Decision {
                    owner,
                    allowed: true,
                    scope: None,
                };
                self.complete(request, transaction, decision)
            }
            OwnerConsent::Denied => {
                self.remove_transaction(request, &id)?;
                self.deny(request, mode, &payload.redirect_uri, payload.request.state.clone())
            }
        }
    }

    /// Handle the consent decision posted back for a pending transaction.
    ///
    /// `owner` is the authenticated resource owner the embedding application resolved for this
    /// request. The transaction id is taken from the query, falling back to the body; the body
    /// also carries the verdict, denial when a `cancel` field is present, and an optional
    /// narrowed `scope`.
    pub fn decision<W: WebRequest>(
        &self, request: &mut W, owner: &str,
    ) -> Result<W::Response, ServerError<W::Error>> {
        let query_id = {
            let query = request.query().map_err(ServerError::Web)?;
            query
                .unique_value(&self.transaction_field)
                .map(|id| id.into_owned())
        };

        let (body_id, allowed, scope) = {
            let body = request
                .body()
                .map_err(ServerError::Web)?
                .ok_or(ServerError::MissingBody)?;
            (
                body.unique_value(&self.transaction_field)
                    .map(|id| id.into_owned()),
                body.unique_value("cancel").is_none(),
                body.unique_value("scope").map(|raw| self.scope.parse(&raw)),
            )
        };

        let id = match query_id.or(body_id) {
            Some(id) => id,
            None => {
                return Err(AuthorizationError::new(
                    ErrorCode::InvalidRequest,
                    format!("missing {} parameter", self.transaction_field),
                )
                .into())
            }
        };

        let stored = {
            let session = request.session().ok_or(ServerError::NoSession)?;
            match self.store.load(&*session, &id) {
                Ok(Some(stored)) => stored,
                Ok(None) => {
                    warn!("decision for unknown transaction {}", id);
                    return Err(ServerError::UnknownTransaction(id));
                }
                Err(StoreError::Corrupt) => {
                    warn!("dropping unreadable transaction {}", id);
                    self.store.remove(session, &id).map_err(store_error)?;
                    return Err(ServerError::UnknownTransaction(id));
                }
                Err(err) => return Err(store_error(err)),
            }
        };

        let client = match self.run_deserializers(&stored.client)? {
            Deserialized::Client(client) => client,
            Deserialized::Revoked => {
                warn!("rejecting decision for revoked client of transaction {}", id);
                self.remove_transaction(request, &id)?;
                return Err(AuthorizationError::new(
                    ErrorCode::UnauthorizedClient,
                    "unauthorized client",
                )
                .into());
            }
            Deserialized::Pass => return Err(ServerError::DeserializeClient),
        };

        let transaction = Transaction {
            id,
            client,
            redirect_uri: stored.redirect_uri,
            request: stored.request,
            mode: stored.mode,
            info: stored.info,
        };
        let decision = Decision {
            owner: owner.to_string(),
            allowed,
            scope,
        };
        self.complete(request, transaction, decision)
    }

    /// Handle a token endpoint request for an already authenticated client.
    ///
    /// Client authentication happens upstream; this dispatches the parsed body through the
    /// exchange chain for its `grant_type` and renders the json success or error body.
    pub fn token<W: WebRequest>(
        &self, request: &mut W, client: &C,
    ) -> Result<W::Response, ServerError<W::Error>> {
        let outcome = {
            let body = request
                .body()
                .map_err(ServerError::Web)?
                .ok_or(ServerError::MissingBody)?;

            let grant_type = body.unique_value("grant_type").map(|ty| ty.into_owned());
            match grant_type {
                None => Err(TokenError::new(
                    ErrorCode::InvalidRequest,
                    "missing grant_type parameter",
                )),
                Some(grant_type) => {
                    debug!("token request with grant_type {}", grant_type);
                    self.run_exchanges(&grant_type, client, body)?
                }
            }
        };

        let mut response = request.response().map_err(ServerError::Web)?;
        match outcome {
            Ok(token) => {
                response.body_json(&token.to_json()).map_err(ServerError::Web)?;
                response.ok().map_err(ServerError::Web)?;
            }
            Err(error) => {
                response.body_json(&error.to_json()).map_err(ServerError::Web)?;
                match error.status() {
                    401 => response.unauthorized().map_err(ServerError::Web)?,
                    500 => response.server_error().map_err(ServerError::Web)?,
                    _ => response.client_error().map_err(ServerError::Web)?,
                }
            }
        }
        Ok(response)
    }

    fn validate_request(&self, response_type: &str, query: &dyn QueryParameter) -> Validation<C> {
        let chain = match self.grants.get(response_type) {
            Some(chain) => chain,
            None => {
                return Validation::Failed {
                    error: unsupported_response_type(response_type),
                    mode: ResponseMode::default(),
                }
            }
        };

        for handler in chain {
            match handler.request(query) {
                Ok(HandlerOutcome::Handled(payload)) => {
                    return Validation::Ready {
                        payload,
                        mode: handler.response_mode(),
                    }
                }
                Ok(HandlerOutcome::Pass) => continue,
                Err(error) => {
                    return Validation::Failed {
                        error,
                        mode: handler.response_mode(),
                    }
                }
            }
        }

        Validation::Failed {
            error: unsupported_response_type(response_type),
            mode: ResponseMode::default(),
        }
    }

    fn run_exchanges<WE>(
        &self, grant_type: &str, client: &C, body: &dyn QueryParameter,
    ) -> Result<Result<TokenResponse, TokenError>, ServerError<WE>> {
        let chain = match self.exchanges.get(grant_type) {
            Some(chain) => chain,
            None => return Ok(Err(unsupported_grant_type(grant_type))),
        };

        for handler in chain {
            match handler.exchange(client, body) {
                Ok(HandlerOutcome::Handled(token)) => return Ok(Ok(token)),
                Ok(HandlerOutcome::Pass) => continue,
                Err(ExchangeError::Token(error)) => return Ok(Err(error)),
                Err(ExchangeError::Failure(error)) => return Err(ServerError::Failure(error)),
            }
        }

        Ok(Err(unsupported_grant_type(grant_type)))
    }

    /// Run the response phase of a decided transaction and encode the result.
    ///
    /// The transaction is removed on every outcome delivered to the client. It stays pending
    /// only when the issuer or a deserializer failed with a raw error, so the owner can retry
    /// the decision.
    fn complete<W: WebRequest>(
        &self, request: &mut W, transaction: Transaction<C>, decision: Decision,
    ) -> Result<W::Response, ServerError<W::Error>> {
        let chain = match self.grants.get(&transaction.request.response_type) {
            Some(chain) => chain,
            None => {
                return Err(AuthorizationError::new(
                    ErrorCode::UnsupportedResponseType,
                    format!("unsupported response type: {}", transaction.request.response_type),
                )
                .into())
            }
        };

        if !decision.allowed {
            self.remove_transaction(request, &transaction.id)?;
            // Denials use the mode remembered from validation.
            return self.deny(
                request,
                transaction.mode,
                &transaction.redirect_uri,
                transaction.request.state.clone(),
            );
        }

        for handler in chain {
            match handler.respond(&transaction, &decision) {
                Ok(HandlerOutcome::Handled(grant)) => {
                    self.remove_transaction(request, &transaction.id)?;
                    let mut response = request.response().map_err(ServerError::Web)?;
                    encode_to(handler.response_mode(), &mut response, &grant.redirect_uri, grant.params)?;
                    return Ok(response);
                }
                Ok(HandlerOutcome::Pass) => continue,
                Err(GrantError::Redirect { redirect_uri, error }) => {
                    self.remove_transaction(request, &transaction.id)?;
                    let mut response = request.response().map_err(ServerError::Web)?;
                    encode_to(handler.response_mode(), &mut response, &redirect_uri, error.into_params())?;
                    return Ok(response);
                }
                Err(GrantError::Direct(error)) => return Err(error.into()),
                Err(GrantError::Failure(error)) => return Err(ServerError::Failure(error)),
            }
        }

        Err(unsupported_response_type_direct(&transaction.request.response_type))
    }

    fn deny<W: WebRequest>(
        &self, request: &mut W, mode: ResponseMode, redirect_uri: &str, state: Option<String>,
    ) -> Result<W::Response, ServerError<W::Error>> {
        let mut error = AuthorizationError::new(ErrorCode::AccessDenied, "access denied");
        error.set_state(state);
        let mut response = request.response().map_err(ServerError::Web)?;
        encode_to(mode, &mut response, redirect_uri, error.into_params())?;
        Ok(response)
    }

    fn remove_transaction<W: WebRequest>(
        &self, request: &mut W, id: &str,
    ) -> Result<(), ServerError<W::Error>> {
        let session = request.session().ok_or(ServerError::NoSession)?;
        self.store.remove(session, id).map_err(store_error)
    }

    fn run_serializers<WE>(&self, client: &C) -> Result<String, ServerError<WE>> {
        for serialize in &self.serializers {
            match serialize(client) {
                Ok(Some(serialized)) => return Ok(serialized),
                Ok(None) => continue,
                Err(error) => return Err(ServerError::Failure(error)),
            }
        }
        Err(ServerError::SerializeClient)
    }

    fn run_deserializers<WE>(&self, raw: &str) -> Result<Deserialized<C>, ServerError<WE>> {
        for deserialize in &self.deserializers {
            match deserialize(raw) {
                Ok(Deserialized::Pass) => continue,
                Ok(settled) => return Ok(settled),
                Err(error) => return Err(ServerError::Failure(error)),
            }
        }
        Err(ServerError::DeserializeClient)
    }
}

impl<C> Default for Server<C> {
    fn default() -> Self {
        Server::new()
    }
}

fn unsupported_response_type(response_type: &str) -> GrantError {
    GrantError::Direct(AuthorizationError::new(
        ErrorCode::UnsupportedResponseType,
        format!("unsupported response type: {}", response_type),
    ))
}

fn unsupported_response_type_direct<WE>(response_type: &str) -> ServerError<WE> {
    AuthorizationError::new(
        ErrorCode::UnsupportedResponseType,
        format!("unsupported response type: {}", response_type),
    )
    .into()
}

fn unsupported_grant_type(grant_type: &str) -> TokenError {
    TokenError::new(
        ErrorCode::UnsupportedGrantType,
        format!("unsupported grant type: {}", grant_type),
    )
}

fn store_error<WE>(err: StoreError) -> ServerError<WE> {
    match err {
        StoreError::Session(SessionError::MissingContainer) => ServerError::InvalidSessionKey,
        StoreError::Corrupt => ServerError::InvalidSessionKey,
    }
}

/// Parse the redirect target and encode `params` into `response` with `mode`.
fn encode_to<R: WebResponse>(
    mode: ResponseMode, response: &mut R, redirect_uri: &str, params: Vec<(String, String)>,
) -> Result<(), ServerError<R::Error>> {
    let url = Url::parse(redirect_uri).map_err(ServerError::BadRedirect)?;
    response_mode::encode(mode, response, &url, &params).map_err(ServerError::Web)
}
