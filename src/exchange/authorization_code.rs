//! The authorization code exchange, [rfc6749 section 4.1.3](https://tools.ietf.org/html/rfc6749#section-4.1.3).
//!
//! Redeems a code previously issued by the authorization endpoint. Checking the code against the
//! stored grant, including that the presented `redirect_uri` matches the one the code was bound
//! to, is the issuer's job.

use crate::endpoint::{HandlerOutcome, QueryParameter};

use super::{denied, missing, ExchangeError, ExchangeHandler, Issue, IssueResult, TokenResponse};

/// How an authorization code is redeemed for tokens.
pub enum AuthorizationCodeIssuer<C> {
    /// Receives the client and the presented code.
    Simple(Box<dyn Fn(&C, &str) -> IssueResult + Send + Sync>),

    /// Additionally receives the presented `redirect_uri`, if any.
    WithRedirect(Box<dyn Fn(&C, &str, Option<&str>) -> IssueResult + Send + Sync>),

    /// Additionally receives the full request body for extension parameters.
    WithBody(Box<dyn Fn(&C, &str, Option<&str>, &dyn QueryParameter) -> IssueResult + Send + Sync>),
}

/// Exchange handler for `grant_type=authorization_code`.
pub struct AuthorizationCode<C> {
    issue: AuthorizationCodeIssuer<C>,
}

impl<C> AuthorizationCode<C> {
    /// A handler redeeming codes with `issue`.
    pub fn new(issue: AuthorizationCodeIssuer<C>) -> Self {
        AuthorizationCode { issue }
    }
}

impl<C> ExchangeHandler<C> for AuthorizationCode<C> {
    fn exchange(
        &self, client: &C, body: &dyn QueryParameter,
    ) -> Result<HandlerOutcome<TokenResponse>, ExchangeError> {
        let code = body.unique_value("code").ok_or_else(|| missing("code"))?;
        let redirect_uri = body.unique_value("redirect_uri");

        let issued = match &self.issue {
            AuthorizationCodeIssuer::Simple(issue) => issue(client, &code),
            AuthorizationCodeIssuer::WithRedirect(issue) => {
                issue(client, &code, redirect_uri.as_deref())
            }
            AuthorizationCodeIssuer::WithBody(issue) => {
                issue(client, &code, redirect_uri.as_deref(), body)
            }
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
            Issue::Denied => Err(denied("invalid authorization code")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    struct Client;

    fn body(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn missing_code_is_invalid_request() {
        let handler = AuthorizationCode::new(AuthorizationCodeIssuer::Simple(Box::new(|_, _| {
            Ok(Issue::Denied)
        })));
        match handler.exchange(&Client, &body(&[])) {
            Err(ExchangeError::Token(error)) => {
                assert_eq!(error.code(), ErrorCode::InvalidRequest);
                assert_eq!(error.description(), Some("missing code parameter"));
            }
            _ => panic!("expected an invalid_request token error"),
        }
    }

    #[test]
    fn redirect_issuer_sees_the_presented_uri() {
        let handler = AuthorizationCode::new(AuthorizationCodeIssuer::WithRedirect(Box::new(
            |_, code, redirect| {
                assert_eq!(code, "c0de");
                assert_eq!(redirect, Some("https://client.example/cb"));
                Ok(Issue::Token {
                    access_token: "s3cr1t".to_string(),
                    refresh_token: None,
                    params: None,
                })
            },
        )));
        let outcome = handler
            .exchange(
                &Client,
                &body(&[("code", "c0de"), ("redirect_uri", "https://client.example/cb")]),
            )
            .unwrap();
        assert!(matches!(outcome, HandlerOutcome::Handled(_)));
    }

    #[test]
    fn unknown_code_is_invalid_grant() {
        let handler = AuthorizationCode::new(AuthorizationCodeIssuer::Simple(Box::new(|_, _| {
            Ok(Issue::Denied)
        })));
        match handler.exchange(&Client, &body(&[("code", "forged")])) {
            Err(ExchangeError::Token(error)) => {
                assert_eq!(error.code(), ErrorCode::InvalidGrant);
                assert_eq!(error.description(), Some("invalid authorization code"));
            }
            _ => panic!("expected an invalid_grant token error"),
        }
    }
}
