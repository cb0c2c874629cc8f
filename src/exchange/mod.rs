//! Exchange handlers for the token endpoint.
//!
//! An exchange handler owns one `grant_type` value. It is called with an already authenticated
//! client and the parsed request body and either settles the request with a [`TokenResponse`],
//! passes to the next handler in the chain, or fails.

pub mod authorization_code;
pub mod client_credentials;
pub mod jwt_bearer;
pub mod password;
pub mod refresh_token;

use serde_json::Value;

use crate::endpoint::{BoxError, HandlerOutcome, QueryParameter};
use crate::error::{ErrorCode, TokenError};

/// The issuer's verdict over a token request.
pub enum Issue {
    /// Tokens were issued.
    Token {
        /// The access token.
        access_token: String,

        /// An optional refresh token. An empty string counts as absent.
        refresh_token: Option<String>,

        /// Additional response members in order. A `token_type` member overrides the per-type
        /// default in place, `expires_in` and `scope` are common additions.
        params: Option<Vec<(String, Value)>>,
    },

    /// The issuer refused the presented grant.
    Denied,
}

/// What issuer strategy functions return.
pub type IssueResult = Result<Issue, BoxError>;

/// An error produced while handling a token request.
#[derive(Debug)]
pub enum ExchangeError {
    /// A protocol error, rendered as the json error body of the token endpoint.
    Token(TokenError),

    /// User supplied issuance code failed, passed through unchanged.
    Failure(BoxError),
}

/// One handler in the chain registered for a `grant_type`.
pub trait ExchangeHandler<C> {
    /// Exchange the presented grant for tokens.
    ///
    /// `Pass` yields to the next handler in the chain. The handler never writes to the response
    /// itself, rendering is the dispatcher's job.
    fn exchange(
        &self, client: &C, body: &dyn QueryParameter,
    ) -> Result<HandlerOutcome<TokenResponse>, ExchangeError>;
}

/// The successful json body of the token endpoint.
///
/// Member order is part of the observable wire format and preserved as built: `access_token`,
/// then `refresh_token` when one was supplied, then the extra params in their order, then
/// `token_type` unless a param already set it.
#[derive(Clone, Debug)]
pub struct TokenResponse {
    fields: serde_json::Map<String, Value>,
}

impl TokenResponse {
    /// Assemble the response from an issuer verdict.
    pub fn from_issue(
        access_token: String, refresh_token: Option<String>, params: Option<Vec<(String, Value)>>,
        default_token_type: &str,
    ) -> Self {
        let mut fields = serde_json::Map::new();
        fields.insert("access_token".to_string(), Value::String(access_token));
        if let Some(refresh) = refresh_token.filter(|token| !token.is_empty()) {
            fields.insert("refresh_token".to_string(), Value::String(refresh));
        }
        let mut has_token_type = false;
        for (key, value) in params.unwrap_or_default() {
            has_token_type |= key == "token_type";
            fields.insert(key, value);
        }
        if !has_token_type {
            fields.insert(
                "token_type".to_string(),
                Value::String(default_token_type.to_string()),
            );
        }
        TokenResponse { fields }
    }

    /// Read a member, mainly for assertions in tests.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The serialized json body, members in insertion order.
    pub fn to_json(&self) -> String {
        Value::Object(self.fields.clone()).to_string()
    }
}

/// The standard error for a required parameter the body does not carry.
pub(crate) fn missing(field: &str) -> ExchangeError {
    ExchangeError::Token(TokenError::new(
        ErrorCode::InvalidRequest,
        format!("missing {} parameter", field),
    ))
}

/// The standard error for a grant the issuer refused.
pub(crate) fn denied(message: &'static str) -> ExchangeError {
    ExchangeError::Token(TokenError::new(ErrorCode::InvalidGrant, message))
}
