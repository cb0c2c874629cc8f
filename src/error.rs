//! Errors defined in [rfc6749].
//!
//! Two flavors exist, one for each endpoint. An `AuthorizationError` is delivered to the client
//! through a response mode encoder as redirect or form parameters, a `TokenError` is delivered as
//! the direct json body of the token endpoint response.
//!
//! [rfc6749]: https://tools.ietf.org/html/rfc6749

use std::borrow::Cow;
use std::error;
use std::fmt;

use serde_json::Value;

/// All error codes defined in rfc6749, for both the authorization and the token endpoint.
///
/// Which codes are admissible depends on the endpoint, e.g. `access_denied` only ever appears in
/// an authorization response while `invalid_grant` is exclusive to the token endpoint. This is not
/// enforced by the type but by the constructors used throughout the crate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    /// The request is missing a required parameter, includes an invalid parameter value, includes
    /// a parameter more than once, or is otherwise malformed.
    InvalidRequest,

    /// Client authentication failed (e.g., unknown client, no client authentication included, or
    /// unsupported authentication method).
    InvalidClient,

    /// The provided authorization grant (e.g., authorization code, resource owner credentials) or
    /// refresh token is invalid, expired, revoked, or was issued to another client.
    InvalidGrant,

    /// The client is not authorized to request a grant using this method.
    UnauthorizedClient,

    /// The resource owner or authorization server denied the request.
    AccessDenied,

    /// The authorization server does not support obtaining a grant using this method.
    UnsupportedResponseType,

    /// The authorization grant type is not supported by the authorization server.
    UnsupportedGrantType,

    /// The requested scope is invalid, unknown, or malformed.
    InvalidScope,

    /// The server encountered an unexpected condition that prevented it from fulfilling the
    /// request. (Needed because a 500 status code can not be returned via a redirect.)
    ServerError,

    /// The server is currently unable to handle the request due to temporary overloading or
    /// maintenance. (Needed because a 503 status code can not be returned via a redirect.)
    TemporarilyUnavailable,
}

impl ErrorCode {
    /// The wire representation of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "invalid_request",
            ErrorCode::InvalidClient => "invalid_client",
            ErrorCode::InvalidGrant => "invalid_grant",
            ErrorCode::UnauthorizedClient => "unauthorized_client",
            ErrorCode::AccessDenied => "access_denied",
            ErrorCode::UnsupportedResponseType => "unsupported_response_type",
            ErrorCode::UnsupportedGrantType => "unsupported_grant_type",
            ErrorCode::InvalidScope => "invalid_scope",
            ErrorCode::ServerError => "server_error",
            ErrorCode::TemporarilyUnavailable => "temporarily_unavailable",
        }
    }
}

impl AsRef<str> for ErrorCode {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error on the authorization endpoint path.
///
/// When a validated redirect uri exists, the error is encoded through the configured response mode
/// as the parameters `error`, `error_description`, `error_uri` and `state`. Before a redirect
/// target has been validated no such encoding is safe and the error surfaces directly to the
/// embedding application instead.
#[derive(Clone, Debug)]
pub struct AuthorizationError {
    code: ErrorCode,
    description: Option<Cow<'static, str>>,
    uri: Option<Cow<'static, str>>,
    state: Option<String>,
}

impl AuthorizationError {
    /// Construct an error with a code and a short explanation.
    pub fn new<D>(code: ErrorCode, description: D) -> Self
    where
        D: Into<Cow<'static, str>>,
    {
        AuthorizationError {
            code,
            description: Some(description.into()),
            uri: None,
            state: None,
        }
    }

    /// The formal kind of error.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The human readable explanation, if one was given.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// A uri identifying a resource explaining the error in detail.
    pub fn explain_uri<U>(&mut self, uri: U)
    where
        U: Into<Cow<'static, str>>,
    {
        self.uri = Some(uri.into());
    }

    /// Attach the `state` parameter of the request this error responds to.
    pub fn set_state(&mut self, state: Option<String>) {
        self.state = state;
    }

    /// The attached request state, if any.
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// The http status associated with the code, for responses that are not redirects.
    pub fn status(&self) -> u16 {
        match self.code {
            ErrorCode::AccessDenied => 403,
            ErrorCode::ServerError => 500,
            ErrorCode::TemporarilyUnavailable => 503,
            _ => 400,
        }
    }

    /// The key value pairs to hand to a response mode encoder.
    pub fn into_params(self) -> Vec<(String, String)> {
        let mut params = vec![("error".to_string(), self.code.as_str().to_string())];
        if let Some(description) = self.description {
            params.push(("error_description".to_string(), description.into_owned()));
        }
        if let Some(uri) = self.uri {
            params.push(("error_uri".to_string(), uri.into_owned()));
        }
        if let Some(state) = self.state {
            params.push(("state".to_string(), state));
        }
        params
    }
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.code, description),
            None => write!(f, "{}", self.code),
        }
    }
}

impl error::Error for AuthorizationError {}

/// An error on the token endpoint path, rendered as a direct json body.
#[derive(Clone, Debug)]
pub struct TokenError {
    code: ErrorCode,
    description: Option<Cow<'static, str>>,
    uri: Option<Cow<'static, str>>,
}

impl TokenError {
    /// Construct an error with a code and a short explanation.
    pub fn new<D>(code: ErrorCode, description: D) -> Self
    where
        D: Into<Cow<'static, str>>,
    {
        TokenError {
            code,
            description: Some(description.into()),
            uri: None,
        }
    }

    /// The formal kind of error.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The human readable explanation, if one was given.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// A uri identifying a resource explaining the error in detail.
    pub fn explain_uri<U>(&mut self, uri: U)
    where
        U: Into<Cow<'static, str>>,
    {
        self.uri = Some(uri.into());
    }

    /// The http status mapped from the code: 401 for `invalid_client`, 500 for `server_error`,
    /// 400 otherwise.
    pub fn status(&self) -> u16 {
        match self.code {
            ErrorCode::InvalidClient => 401,
            ErrorCode::ServerError => 500,
            _ => 400,
        }
    }

    /// Encode the error as the json body of a token endpoint response.
    ///
    /// The `error` member is always emitted first, followed by `error_description` and `error_uri`
    /// when present.
    pub fn to_json(&self) -> String {
        let mut body = serde_json::Map::new();
        body.insert("error".to_string(), Value::String(self.code.as_str().to_string()));
        if let Some(description) = &self.description {
            body.insert(
                "error_description".to_string(),
                Value::String(description.clone().into_owned()),
            );
        }
        if let Some(uri) = &self.uri {
            body.insert("error_uri".to_string(), Value::String(uri.clone().into_owned()));
        }
        Value::Object(body).to_string()
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.code, description),
            None => write!(f, "{}", self.code),
        }
    }
}

impl error::Error for TokenError {}
