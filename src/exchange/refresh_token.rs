//! The refresh token exchange, [rfc6749 section 6](https://tools.ietf.org/html/rfc6749#section-6).

use crate::endpoint::{HandlerOutcome, QueryParameter};
use crate::primitives::scope::ScopeParser;

use super::{denied, missing, ExchangeError, ExchangeHandler, Issue, IssueResult, TokenResponse};

/// How a refresh token is exchanged for a fresh access token.
pub enum RefreshTokenIssuer<C> {
    /// Receives the client and the presented refresh token.
    Simple(Box<dyn Fn(&C, &str) -> IssueResult + Send + Sync>),

    /// Additionally receives the requested scope, an empty slice when absent. The issuer must
    /// not widen the scope beyond the originally granted one.
    WithScope(Box<dyn Fn(&C, &str, &[String]) -> IssueResult + Send + Sync>),

    /// Additionally receives the full request body for extension parameters.
    WithBody(Box<dyn Fn(&C, &str, &[String], &dyn QueryParameter) -> IssueResult + Send + Sync>),
}

/// Exchange handler for `grant_type=refresh_token`.
pub struct RefreshToken<C> {
    issue: RefreshTokenIssuer<C>,
    scope: ScopeParser,
}

impl<C> RefreshToken<C> {
    /// A handler exchanging refresh tokens with `issue`.
    pub fn new(issue: RefreshTokenIssuer<C>) -> Self {
        RefreshToken {
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

impl<C> ExchangeHandler<C> for RefreshToken<C> {
    fn exchange(
        &self, client: &C, body: &dyn QueryParameter,
    ) -> Result<HandlerOutcome<TokenResponse>, ExchangeError> {
        let refresh_token = body
            .unique_value("refresh_token")
            .ok_or_else(|| missing("refresh_token"))?;
        let scope = body
            .unique_value("scope")
            .map(|raw| self.scope.parse(&raw))
            .unwrap_or_default();

        let issued = match &self.issue {
            RefreshTokenIssuer::Simple(issue) => issue(client, &refresh_token),
            RefreshTokenIssuer::WithScope(issue) => issue(client, &refresh_token, &scope),
            RefreshTokenIssuer::WithBody(issue) => issue(client, &refresh_token, &scope, body),
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
                "bearer",
            ))),
            Issue::Denied => Err(denied("invalid refresh token")),
        }
    }
}
