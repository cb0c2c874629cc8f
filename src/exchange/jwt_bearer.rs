//! The jwt bearer assertion exchange, [rfc7523](https://tools.ietf.org/html/rfc7523).
//!
//! The handler only checks the assertion's shape, exactly three dot-separated segments.
//! Signature verification, claim validation and expiry checks are the issuer's job.

use crate::endpoint::{HandlerOutcome, QueryParameter};
use crate::error::{ErrorCode, TokenError};

use super::{denied, missing, ExchangeError, ExchangeHandler, Issue, IssueResult, TokenResponse};

/// How an assertion is verified and exchanged for tokens.
///
/// The variants differ in how far the assertion is decomposed before the supplied function
/// runs. `Signed` receives the signing input, everything before the last dot, so a verifier
/// does not have to reassemble it.
pub enum JwtIssuer<C> {
    /// Receives the client and the whole assertion.
    Assertion(Box<dyn Fn(&C, &str) -> IssueResult + Send + Sync>),

    /// Receives the signing input (`header.claimSet`) and the signature separately.
    Signed(Box<dyn Fn(&C, &str, &str) -> IssueResult + Send + Sync>),

    /// Receives the three segments separately.
    Decomposed(Box<dyn Fn(&C, &str, &str, &str) -> IssueResult + Send + Sync>),

    /// Additionally receives the full request body for extension parameters.
    DecomposedWithBody(
        Box<dyn Fn(&C, &str, &str, &str, &dyn QueryParameter) -> IssueResult + Send + Sync>,
    ),
}

/// Exchange handler for `grant_type=urn:ietf:params:oauth:grant-type:jwt-bearer`.
pub struct JwtBearer<C> {
    issue: JwtIssuer<C>,
}

impl<C> JwtBearer<C> {
    /// A handler verifying assertions with `issue`.
    pub fn new(issue: JwtIssuer<C>) -> Self {
        JwtBearer { issue }
    }
}

impl<C> ExchangeHandler<C> for JwtBearer<C> {
    fn exchange(
        &self, client: &C, body: &dyn QueryParameter,
    ) -> Result<HandlerOutcome<TokenResponse>, ExchangeError> {
        let assertion = body
            .unique_value("assertion")
            .ok_or_else(|| missing("assertion"))?;

        let segments: Vec<&str> = assertion.split('.').collect();
        let (header, claim_set, signature) = match segments.as_slice() {
            [header, claim_set, signature] => (*header, *claim_set, *signature),
            _ => {
                return Err(ExchangeError::Token(TokenError::new(
                    ErrorCode::InvalidRequest,
                    "malformed assertion parameter",
                )))
            }
        };

        let issued = match &self.issue {
            JwtIssuer::Assertion(issue) => issue(client, &assertion),
            JwtIssuer::Signed(issue) => {
                // The signing input is everything before the last dot.
                let data_len = header.len() + 1 + claim_set.len();
                issue(client, &assertion[..data_len], signature)
            }
            JwtIssuer::Decomposed(issue) => issue(client, header, claim_set, signature),
            JwtIssuer::DecomposedWithBody(issue) => {
                issue(client, header, claim_set, signature, body)
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
                "bearer",
            ))),
            Issue::Denied => Err(denied("invalid JWT")),
        }
    }
}
