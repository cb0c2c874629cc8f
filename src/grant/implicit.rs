//! The implicit grant, [rfc6749 section 4.2](https://tools.ietf.org/html/rfc6749#section-4.2).
//!
//! Tokens are delivered in the uri fragment so they never reach the server behind the redirect
//! uri. The token endpoint is not involved.

use crate::endpoint::{HandlerOutcome, QueryParameter, ResponseMode};
use crate::error::{AuthorizationError, ErrorCode};
use crate::primitives::scope::ScopeParser;
use crate::primitives::transaction::{AuthorizationRequest, Transaction, TransactionPayload};

use super::{extension_params, Decision, GrantError, GrantHandler, GrantResponse, ValidateFn};
use crate::endpoint::BoxError;

/// The issuer's verdict over a decided implicit transaction.
pub enum TokenIssue {
    /// A token was issued, with optional extra delivery parameters.
    Token {
        /// The access token.
        access_token: String,
        /// Additional delivery parameters in order, e.g. `expires_in` or a `token_type`
        /// overriding the `Bearer` default.
        params: Vec<(String, String)>,
    },

    /// The issuer refused, delivered to the client as `access_denied`.
    Denied,
}

/// How the access token is minted once the owner has allowed the request.
pub enum TokenIssuer<C> {
    /// Receives the client and the owner identity.
    Simple(Box<dyn Fn(&C, &str) -> Result<TokenIssue, BoxError> + Send + Sync>),

    /// Additionally receives the full decision, including a narrowed scope.
    WithDecision(Box<dyn Fn(&C, &str, &Decision) -> Result<TokenIssue, BoxError> + Send + Sync>),

    /// Additionally receives the original request parameters.
    WithRequest(
        Box<
            dyn Fn(&C, &str, &Decision, &AuthorizationRequest) -> Result<TokenIssue, BoxError>
                + Send
                + Sync,
        >,
    ),
}

/// Grant handler for `response_type=token`.
pub struct ImplicitGrant<C> {
    validate: ValidateFn<C>,
    issue: TokenIssuer<C>,
    scope: ScopeParser,
    mode: ResponseMode,
}

impl<C> ImplicitGrant<C> {
    /// A handler validating clients with `validate` and minting tokens with `issue`.
    pub fn new(validate: ValidateFn<C>, issue: TokenIssuer<C>) -> Self {
        ImplicitGrant {
            validate,
            issue,
            scope: ScopeParser::default(),
            mode: ResponseMode::Fragment,
        }
    }

    /// Replace the scope parser, e.g. to accept additional separators.
    pub fn with_scope_parser(mut self, scope: ScopeParser) -> Self {
        self.scope = scope;
        self
    }

    /// Override the response mode, `fragment` by default.
    pub fn with_response_mode(mut self, mode: ResponseMode) -> Self {
        self.mode = mode;
        self
    }
}

impl<C> GrantHandler<C> for ImplicitGrant<C> {
    fn request(
        &self, query: &dyn QueryParameter,
    ) -> Result<HandlerOutcome<TransactionPayload<C>>, GrantError> {
        let client_id = match query.unique_value("client_id") {
            Some(client_id) => client_id.into_owned(),
            None => {
                return Err(GrantError::Direct(AuthorizationError::new(
                    ErrorCode::InvalidRequest,
                    "missing client_id parameter",
                )))
            }
        };

        let raw_redirect = query.unique_value("redirect_uri").map(|uri| uri.into_owned());
        let (client, redirect_uri) =
            match (self.validate)(&client_id, raw_redirect.as_deref()).map_err(GrantError::Failure)? {
                super::Validated::Client { client, redirect_uri } => (client, redirect_uri),
                super::Validated::Denied => {
                    return Err(GrantError::Direct(AuthorizationError::new(
                        ErrorCode::UnauthorizedClient,
                        "unauthorized client",
                    )))
                }
                super::Validated::Rejected(error) => return Err(GrantError::Direct(error)),
            };

        let scope = query
            .unique_value("scope")
            .map(|raw| self.scope.parse(&raw))
            .unwrap_or_default();

        let request = AuthorizationRequest {
            response_type: query
                .unique_value("response_type")
                .map(|value| value.into_owned())
                .unwrap_or_else(|| "token".to_string()),
            client_id,
            redirect_uri: raw_redirect,
            scope,
            state: query.unique_value("state").map(|state| state.into_owned()),
            extensions: extension_params(query),
        };

        Ok(HandlerOutcome::Handled(TransactionPayload {
            client,
            redirect_uri,
            request,
            info: None,
        }))
    }

    fn respond(
        &self, transaction: &Transaction<C>, decision: &Decision,
    ) -> Result<HandlerOutcome<GrantResponse>, GrantError> {
        let issue = match &self.issue {
            TokenIssuer::Simple(issue) => issue(&transaction.client, &decision.owner),
            TokenIssuer::WithDecision(issue) => {
                issue(&transaction.client, &decision.owner, decision)
            }
            TokenIssuer::WithRequest(issue) => issue(
                &transaction.client,
                &decision.owner,
                decision,
                &transaction.request,
            ),
        }
        .map_err(GrantError::Failure)?;

        let (access_token, extra) = match issue {
            TokenIssue::Token { access_token, params } => (access_token, params),
            TokenIssue::Denied => {
                let mut error = AuthorizationError::new(ErrorCode::AccessDenied, "access denied");
                error.set_state(transaction.request.state.clone());
                return Err(GrantError::Redirect {
                    redirect_uri: transaction.redirect_uri.clone(),
                    error,
                });
            }
        };

        let mut params = vec![("access_token".to_string(), access_token)];
        let has_token_type = extra.iter().any(|(key, _)| key == "token_type");
        params.extend(extra);
        if !has_token_type {
            params.push(("token_type".to_string(), "Bearer".to_string()));
        }
        if let Some(state) = &transaction.request.state {
            params.push(("state".to_string(), state.clone()));
        }

        Ok(HandlerOutcome::Handled(GrantResponse {
            redirect_uri: transaction.redirect_uri.clone(),
            params,
        }))
    }

    fn response_mode(&self) -> ResponseMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::Validated;

    #[derive(Clone, Debug)]
    struct Client;

    fn handler(issue: TokenIssuer<Client>) -> ImplicitGrant<Client> {
        ImplicitGrant::new(
            Box::new(|_, redirect| {
                Ok(Validated::Client {
                    client: Client,
                    redirect_uri: redirect.unwrap_or("https://client.example/cb").to_string(),
                })
            }),
            issue,
        )
    }

    fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    fn transaction(handler: &ImplicitGrant<Client>, pairs: &[(&str, &str)]) -> Transaction<Client> {
        let payload = match handler.request(&query(pairs)).unwrap() {
            HandlerOutcome::Handled(payload) => payload,
            HandlerOutcome::Pass => panic!("handler unexpectedly passed"),
        };
        Transaction {
            id: "tid".to_string(),
            client: payload.client,
            redirect_uri: payload.redirect_uri,
            request: payload.request,
            mode: handler.response_mode(),
            info: payload.info,
        }
    }

    fn allow() -> Decision {
        Decision {
            owner: "alice".to_string(),
            allowed: true,
            scope: None,
        }
    }

    #[test]
    fn default_mode_is_fragment() {
        let handler = handler(TokenIssuer::Simple(Box::new(|_, _| Ok(TokenIssue::Denied))));
        assert_eq!(handler.response_mode(), ResponseMode::Fragment);
    }

    #[test]
    fn token_type_defaults_to_bearer_and_state_comes_last() {
        let handler = handler(TokenIssuer::Simple(Box::new(|_, owner| {
            Ok(TokenIssue::Token {
                access_token: format!("token-for-{}", owner),
                params: vec![("expires_in".to_string(), "3600".to_string())],
            })
        })));
        let transaction = transaction(
            &handler,
            &[("response_type", "token"), ("client_id", "c1"), ("state", "xyz")],
        );
        let response = match handler.respond(&transaction, &allow()).unwrap() {
            HandlerOutcome::Handled(response) => response,
            HandlerOutcome::Pass => panic!("handler unexpectedly passed"),
        };
        assert_eq!(
            response.params,
            vec![
                ("access_token".to_string(), "token-for-alice".to_string()),
                ("expires_in".to_string(), "3600".to_string()),
                ("token_type".to_string(), "Bearer".to_string()),
                ("state".to_string(), "xyz".to_string()),
            ]
        );
    }

    #[test]
    fn issuer_supplied_token_type_is_kept_in_place() {
        let handler = handler(TokenIssuer::Simple(Box::new(|_, _| {
            Ok(TokenIssue::Token {
                access_token: "s3cr1t".to_string(),
                params: vec![("token_type".to_string(), "MAC".to_string())],
            })
        })));
        let transaction = transaction(&handler, &[("response_type", "token"), ("client_id", "c1")]);
        let response = match handler.respond(&transaction, &allow()).unwrap() {
            HandlerOutcome::Handled(response) => response,
            HandlerOutcome::Pass => panic!("handler unexpectedly passed"),
        };
        assert_eq!(
            response.params,
            vec![
                ("access_token".to_string(), "s3cr1t".to_string()),
                ("token_type".to_string(), "MAC".to_string()),
            ]
        );
    }
}
