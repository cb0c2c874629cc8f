//! The resource owner password credentials exchange,
//! [rfc6749 section 4.3](https://tools.ietf.org/html/rfc6749#section-4.3).

use crate::endpoint::{HandlerOutcome, QueryParameter};
use crate::primitives::scope::ScopeParser;

use super::{denied, missing, ExchangeError, ExchangeHandler, Issue, IssueResult, TokenResponse};

/// How tokens are minted for presented resource owner credentials.
pub enum PasswordIssuer<C> {
    /// Receives the client, the username and the password.
    Simple(Box<dyn Fn(&C, &str, &str) -> IssueResult + Send + Sync>),

    /// Additionally receives the requested scope, an empty slice when absent.
    WithScope(Box<dyn Fn(&C, &str, &str, &[String]) -> IssueResult + Send + Sync>),

    /// Additionally receives the full request body for extension parameters.
    WithBody(Box<dyn Fn(&C, &str, &str, &[String], &dyn QueryParameter) -> IssueResult + Send + Sync>),
}

/// Exchange handler for `grant_type=password`.
pub struct Password<C> {
    issue: PasswordIssuer<C>,
    scope: ScopeParser,
}

impl<C> Password<C> {
    /// A handler checking credentials and minting tokens with `issue`.
    pub fn new(issue: PasswordIssuer<C>) -> Self {
        Password {
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

impl<C> ExchangeHandler<C> for Password<C> {
    fn exchange(
        &self, client: &C, body: &dyn QueryParameter,
    ) -> Result<HandlerOutcome<TokenResponse>, ExchangeError> {
        let username = body.unique_value("username").ok_or_else(|| missing("username"))?;
        let password = body.unique_value("password").ok_or_else(|| missing("password"))?;
        let scope = body
            .unique_value("scope")
            .map(|raw| self.scope.parse(&raw))
            .unwrap_or_default();

        let issued = match &self.issue {
            PasswordIssuer::Simple(issue) => issue(client, &username, &password),
            PasswordIssuer::WithScope(issue) => issue(client, &username, &password, &scope),
            PasswordIssuer::WithBody(issue) => issue(client, &username, &password, &scope, body),
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
            Issue::Denied => Err(denied("invalid resource owner credentials")),
        }
    }
}
