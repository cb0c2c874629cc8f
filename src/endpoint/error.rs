//! The combined error type surfaced to the embedding application.

use std::error;
use std::fmt;

use crate::error::AuthorizationError;

/// A boxed error produced by user supplied handler or strategy code.
pub type BoxError = Box<dyn error::Error + Send + Sync + 'static>;

/// All ways the dispatcher can fail without producing an oauth protocol response.
///
/// Protocol-level failures never appear here: they are delivered to the client as redirect
/// parameters or as a json error body. This type covers the remainder, integration mistakes of
/// the embedding application and internal failures of handler code.
#[derive(Debug)]
pub enum ServerError<WE> {
    /// The web layer failed while reading the request or writing the response.
    Web(WE),

    /// An authorization request failed before any redirect target was validated.
    ///
    /// Encoding the error into a redirect would send it to an unvalidated location, so it is
    /// handed to the embedding application instead.
    Authorization(AuthorizationError),

    /// A decision named a transaction id with no pending transaction behind it.
    ///
    /// Either the id was forged, the transaction already completed, or the stored entry was
    /// unreadable and has been dropped. No grant is issued.
    UnknownTransaction(String),

    /// The request carries no session although the operation requires one.
    NoSession,

    /// The session exists but holds no transaction container under the configured session key.
    InvalidSessionKey,

    /// The operation reads the request body but none was parsed by the web layer.
    MissingBody,

    /// No registered serializer produced a stored representation for the client.
    SerializeClient,

    /// No registered deserializer restored a client from its stored representation.
    DeserializeClient,

    /// The redirect uri recorded in the transaction failed to parse as a url.
    BadRedirect(url::ParseError),

    /// A handler or strategy function failed internally.
    Failure(BoxError),
}

impl<WE> fmt::Display for ServerError<WE>
where
    WE: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ServerError::Web(err) => write!(f, "web layer error: {}", err),
            ServerError::Authorization(err) => write!(f, "{}", err),
            ServerError::UnknownTransaction(id) => {
                write!(f, "unknown transaction: {}", id)
            }
            ServerError::NoSession => f.write_str("server requires session support"),
            ServerError::InvalidSessionKey => f.write_str("invalid session key"),
            ServerError::MissingBody => {
                f.write_str("Request body not parsed. Use bodyParser middleware.")
            }
            ServerError::SerializeClient => f.write_str(
                "failed to serialize client; register a serialization function with serialize_client()",
            ),
            ServerError::DeserializeClient => f.write_str(
                "failed to deserialize client; register a deserialization function with deserialize_client()",
            ),
            ServerError::BadRedirect(err) => write!(f, "stored redirect uri is invalid: {}", err),
            ServerError::Failure(err) => write!(f, "{}", err),
        }
    }
}

impl<WE> error::Error for ServerError<WE>
where
    WE: fmt::Debug + fmt::Display,
{
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ServerError::Authorization(err) => Some(err),
            ServerError::BadRedirect(err) => Some(err),
            ServerError::Failure(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl<WE> From<AuthorizationError> for ServerError<WE> {
    fn from(err: AuthorizationError) -> Self {
        ServerError::Authorization(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestError = ServerError<std::io::Error>;

    #[test]
    fn integration_error_messages() {
        assert_eq!(TestError::NoSession.to_string(), "server requires session support");
        assert_eq!(TestError::InvalidSessionKey.to_string(), "invalid session key");
        assert_eq!(
            TestError::MissingBody.to_string(),
            "Request body not parsed. Use bodyParser middleware."
        );
    }
}
