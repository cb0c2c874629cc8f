//! The client credentials exchange, [rfc6749 section 4.4](https://tools.ietf.org/html/rfc6749#section-4.4).

use crate::endpoint::{HandlerOutcome, QueryParameter};
use crate::primitives::scope::ScopeParser;

use super::{denied, ExchangeError, ExchangeHandler, Issue, IssueResult, TokenResponse};

/// How tokens are minted for an authenticated client's own credentials.
pub enum ClientCredentialsIssuer<C> {
    /// Receives only the client.
    Simple(Box<dyn Fn(&C) -> IssueResult + Send + Sync>),

    /// Additionally receives the requested scope, an empty slice when absent.
    WithScope(Box<dyn Fn(&C, &[String]) -> IssueResult + Send + Sync>),

    /// Additionally receives the full request body for extension parameters.
    WithBody(Box<dyn Fn(&C, &[String], &dyn QueryParameter) -> IssueResult + Send + Sync>),
}

/// Exchange handler for `grant_type=client_credentials`.
pub struct ClientCredentials<C> {
    issue: ClientCredentialsIssuer<C>,
    scope: ScopeParser,
}

impl<C> ClientCredentials<C> {
    /// A handler minting tokens with `issue`.
    pub fn new(issue: ClientCredentialsIssuer<C>) -> Self {
        ClientCredentials {
            issue,
            scope: ScopeParser::default(),
        }
    }

    /// Replace the scope parser, e.g. to accept additional separators.
    pub fn with_scope_parser(mut self, scope: ScopeParser) -> Self {
        self.scope = scope;
        self
    }
}

impl<C> ExchangeHandler<C> for ClientCredentials<C> {
    fn exchange(
        &self, client: &C, body: &dyn QueryParameter,
    ) -> Result<HandlerOutcome<TokenResponse>, ExchangeError> {
        let scope = body
            .unique_value("scope")
            .map(|raw| self.scope.parse(&raw))
            .unwrap_or_default();

        let issued = match &self.issue {
            ClientCredentialsIssuer::Simple(issue) => issue(client),
            ClientCredentialsIssuer::WithScope(issue) => issue(client, &scope),
            ClientCredentialsIssuer::WithBody(issue) => issue(client, &scope, body),
        }
        .map_err(ExchangeError::Failure)?;

        match issued {
            Issue::Token {
                access_token,
                refresh_token,
                params,
            } => Ok(HandlerOutcome::Handled(TokenResponse::from_issue(
                access_token,
                refresh_token,
                params,
                "Bearer",
            ))),
            Issue::Denied => Err(denied("invalid client credentials")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::Value;

    struct Client;

    fn body(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn simple_issuer_produces_bearer_response() {
        let handler = ClientCredentials::new(ClientCredentialsIssuer::Simple(Box::new(|_| {
            Ok(Issue::Token {
                access_token: "s3cr1t".to_string(),
                refresh_token: None,
                params: None,
            })
        })));
        let response = match handler
            .exchange(&Client, &body(&[("grant_type", "client_credentials")]))
            .unwrap()
        {
            HandlerOutcome::Handled(response) => response,
            HandlerOutcome::Pass => panic!("handler unexpectedly passed"),
        };
        assert_eq!(
            response.to_json(),
            "{\"access_token\":\"s3cr1t\",\"token_type\":\"Bearer\"}"
        );
    }

    #[test]
    fn scope_issuer_sees_empty_slice_when_absent() {
        let handler = ClientCredentials::new(ClientCredentialsIssuer::WithScope(Box::new(
            |_, scope| {
                assert!(scope.is_empty());
                Ok(Issue::Token {
                    access_token: "s3cr1t".to_string(),
                    refresh_token: None,
                    params: Some(vec![("expires_in".to_string(), Value::from(3600))]),
                })
            },
        )));
        let response = match handler
            .exchange(&Client, &body(&[("grant_type", "client_credentials")]))
            .unwrap()
        {
            HandlerOutcome::Handled(response) => response,
            HandlerOutcome::Pass => panic!("handler unexpectedly passed"),
        };
        assert_eq!(
            response.to_json(),
            "{\"access_token\":\"s3cr1t\",\"expires_in\":3600,\"token_type\":\"Bearer\"}"
        );
    }

    #[test]
    fn denial_is_invalid_grant() {
        let handler =
            ClientCredentials::new(ClientCredentialsIssuer::Simple(Box::new(|_| Ok(Issue::Denied))));
        match handler.exchange(&Client, &body(&[])) {
            Err(ExchangeError::Token(error)) => {
                assert_eq!(error.code(), ErrorCode::InvalidGrant);
                assert_eq!(error.description(), Some("invalid client credentials"));
            }
            _ => panic!("expected an invalid_grant token error"),
        }
    }
}
