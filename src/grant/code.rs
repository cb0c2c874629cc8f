//! The authorization code grant, [rfc6749 section 4.1](https://tools.ietf.org/html/rfc6749#section-4.1).

use crate::endpoint::{HandlerOutcome, QueryParameter, ResponseMode};
use crate::error::{AuthorizationError, ErrorCode};
use crate::primitives::scope::ScopeParser;
use crate::primitives::transaction::{AuthorizationRequest, Transaction, TransactionPayload};

use super::{extension_params, Decision, GrantError, GrantHandler, GrantResponse, ValidateFn};
use crate::endpoint::BoxError;

/// The issuer's verdict over a decided code transaction.
pub enum CodeIssue {
    /// A code was issued, with optional extra delivery parameters.
    Code {
        /// The authorization code.
        code: String,
        /// Additional delivery parameters in order, e.g. a granted scope echo.
        params: Vec<(String, String)>,
    },

    /// The issuer refused, delivered to the client as `access_denied`.
    Denied,
}

/// How the authorization code is minted once the owner has allowed the request.
///
/// The variants differ only in how much context the supplied function receives. Pick the
/// smallest one that suffices.
pub enum CodeIssuer<C> {
    /// Receives the client, the redirect uri and the owner identity.
    Simple(Box<dyn Fn(&C, &str, &str) -> Result<CodeIssue, BoxError> + Send + Sync>),

    /// Additionally receives the full decision, including a narrowed scope.
    WithDecision(Box<dyn Fn(&C, &str, &str, &Decision) -> Result<CodeIssue, BoxError> + Send + Sync>),

    /// Additionally receives the original request parameters.
    WithRequest(
        Box<
            dyn Fn(&C, &str, &str, &Decision, &AuthorizationRequest) -> Result<CodeIssue, BoxError>
                + Send
                + Sync,
        >,
    ),
}

/// Grant handler for `response_type=code`.
pub struct AuthorizationCodeGrant<C> {
    validate: ValidateFn<C>,
    issue: CodeIssuer<C>,
    scope: ScopeParser,
    mode: ResponseMode,
}

impl<C> AuthorizationCodeGrant<C> {
    /// A handler validating clients with `validate` and minting codes with `issue`.
    pub fn new(validate: ValidateFn<C>, issue: CodeIssuer<C>) -> Self {
        AuthorizationCodeGrant {
            validate,
            issue,
            scope: ScopeParser::default(),
            mode: ResponseMode::Query,
        }
    }

    /// Replace the scope parser, e.g. to accept additional separators.
    pub fn with_scope_parser(mut self, scope: ScopeParser) -> Self {
        self.scope = scope;
        self
    }

    /// Override the response mode, `query` by default.
    pub fn with_response_mode(mut self, mode: ResponseMode) -> Self {
        self.mode = mode;
        self
    }
}

impl<C> GrantHandler<C> for AuthorizationCodeGrant<C> {
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
                .unwrap_or_else(|| "code".to_string()),
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
            CodeIssuer::Simple(issue) => {
                issue(&transaction.client, &transaction.redirect_uri, &decision.owner)
            }
            CodeIssuer::WithDecision(issue) => issue(
                &transaction.client,
                &transaction.redirect_uri,
                &decision.owner,
                decision,
            ),
            CodeIssuer::WithRequest(issue) => issue(
                &transaction.client,
                &transaction.redirect_uri,
                &decision.owner,
                decision,
                &transaction.request,
            ),
        }
        .map_err(GrantError::Failure)?;

        let (code, extra) = match issue {
            CodeIssue::Code { code, params } => (code, params),
            CodeIssue::Denied => {
                let mut error = AuthorizationError::new(ErrorCode::AccessDenied, "access denied");
                error.set_state(transaction.request.state.clone());
                return Err(GrantError::Redirect {
                    redirect_uri: transaction.redirect_uri.clone(),
                    error,
                });
            }
        };

        let mut params = vec![("code".to_string(), code)];
        params.extend(extra);
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

    #[derive(Clone, Debug, PartialEq)]
    struct Client(String);

    fn handler(issue: CodeIssuer<Client>) -> AuthorizationCodeGrant<Client> {
        AuthorizationCodeGrant::new(
            Box::new(|client_id, redirect| {
                if client_id == "revoked" {
                    return Ok(Validated::Denied);
                }
                Ok(Validated::Client {
                    client: Client(client_id.to_string()),
                    redirect_uri: redirect.unwrap_or("https://client.example/cb").to_string(),
                })
            }),
            issue,
        )
    }

    fn simple_issuer() -> CodeIssuer<Client> {
        CodeIssuer::Simple(Box::new(|_, _, owner| {
            Ok(CodeIssue::Code {
                code: format!("code-for-{}", owner),
                params: Vec::new(),
            })
        }))
    }

    fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    fn transaction(handler: &AuthorizationCodeGrant<Client>, pairs: &[(&str, &str)]) -> Transaction<Client> {
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
    fn missing_client_id_is_a_direct_error() {
        let handler = handler(simple_issuer());
        match handler.request(&query(&[("response_type", "code")])) {
            Err(GrantError::Direct(error)) => {
                assert_eq!(error.code(), ErrorCode::InvalidRequest);
                assert_eq!(error.description(), Some("missing client_id parameter"));
            }
            _ => panic!("expected a direct invalid_request"),
        }
    }

    #[test]
    fn mismatched_redirect_uri_is_invalid_request() {
        let handler = AuthorizationCodeGrant::new(
            Box::new(|client_id, redirect| match redirect {
                Some("https://client.example/cb") | None => Ok(Validated::Client {
                    client: Client(client_id.to_string()),
                    redirect_uri: "https://client.example/cb".to_string(),
                }),
                Some(_) => Ok(Validated::Rejected(AuthorizationError::new(
                    ErrorCode::InvalidRequest,
                    "redirect_uri does not match the registered value",
                ))),
            }),
            simple_issuer(),
        );
        match handler.request(&query(&[
            ("response_type", "code"),
            ("client_id", "c1"),
            ("redirect_uri", "https://attacker.example/cb"),
        ])) {
            Err(GrantError::Direct(error)) => {
                assert_eq!(error.code(), ErrorCode::InvalidRequest);
                assert_eq!(
                    error.description(),
                    Some("redirect_uri does not match the registered value")
                );
            }
            _ => panic!("expected a direct invalid_request"),
        }
    }

    #[test]
    fn unknown_client_can_be_rejected_as_invalid_client() {
        let handler = AuthorizationCodeGrant::new(
            Box::new(|_, _| {
                Ok(Validated::Rejected(AuthorizationError::new(
                    ErrorCode::InvalidClient,
                    "unknown client",
                )))
            }),
            simple_issuer(),
        );
        match handler.request(&query(&[("response_type", "code"), ("client_id", "ghost")])) {
            Err(GrantError::Direct(error)) => assert_eq!(error.code(), ErrorCode::InvalidClient),
            _ => panic!("expected a direct invalid_client"),
        }
    }

    #[test]
    fn denied_validation_is_unauthorized_client() {
        let handler = handler(simple_issuer());
        match handler.request(&query(&[("response_type", "code"), ("client_id", "revoked")])) {
            Err(GrantError::Direct(error)) => {
                assert_eq!(error.code(), ErrorCode::UnauthorizedClient)
            }
            _ => panic!("expected a direct unauthorized_client"),
        }
    }

    #[test]
    fn request_captures_scope_state_and_extensions() {
        let handler = handler(simple_issuer());
        let transaction = transaction(
            &handler,
            &[
                ("response_type", "code"),
                ("client_id", "c1"),
                ("scope", "read write"),
                ("state", "xyz"),
                ("prompt", "consent"),
            ],
        );
        assert_eq!(transaction.request.scope, vec!["read", "write"]);
        assert_eq!(transaction.request.state.as_deref(), Some("xyz"));
        assert_eq!(
            transaction.request.extensions,
            vec![("prompt".to_string(), "consent".to_string())]
        );
    }

    #[test]
    fn code_and_state_in_order() {
        let handler = handler(simple_issuer());
        let transaction = transaction(
            &handler,
            &[("response_type", "code"), ("client_id", "c1"), ("state", "xyz")],
        );
        let response = match handler.respond(&transaction, &allow()).unwrap() {
            HandlerOutcome::Handled(response) => response,
            HandlerOutcome::Pass => panic!("handler unexpectedly passed"),
        };
        assert_eq!(
            response.params,
            vec![
                ("code".to_string(), "code-for-alice".to_string()),
                ("state".to_string(), "xyz".to_string()),
            ]
        );
    }

    #[test]
    fn issuer_denial_redirects_access_denied_with_state() {
        let handler = handler(CodeIssuer::Simple(Box::new(|_, _, _| Ok(CodeIssue::Denied))));
        let transaction = transaction(
            &handler,
            &[("response_type", "code"), ("client_id", "c1"), ("state", "xyz")],
        );
        match handler.respond(&transaction, &allow()) {
            Err(GrantError::Redirect { redirect_uri, error }) => {
                assert_eq!(redirect_uri, "https://client.example/cb");
                assert_eq!(error.code(), ErrorCode::AccessDenied);
                assert_eq!(error.state(), Some("xyz"));
            }
            _ => panic!("expected a redirect access_denied"),
        }
    }

    #[test]
    fn with_request_issuer_sees_the_narrowed_scope() {
        let handler = handler(CodeIssuer::WithRequest(Box::new(
            |_, _, _, decision, request| {
                assert_eq!(decision.scope.as_deref(), Some(&["read".to_string()][..]));
                assert_eq!(request.scope, vec!["read", "write"]);
                Ok(CodeIssue::Code {
                    code: "c0de".to_string(),
                    params: Vec::new(),
                })
            },
        )));
        let transaction = transaction(
            &handler,
            &[
                ("response_type", "code"),
                ("client_id", "c1"),
                ("scope", "read write"),
            ],
        );
        let decision = Decision {
            owner: "alice".to_string(),
            allowed: true,
            scope: Some(vec!["read".to_string()]),
        };
        assert!(matches!(
            handler.respond(&transaction, &decision).unwrap(),
            HandlerOutcome::Handled(_)
        ));
    }
}
