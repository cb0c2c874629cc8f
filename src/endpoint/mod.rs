//! The web-framework-facing surface of the crate.
//!
//! The central type is [`Server`], the dispatcher behind both oauth endpoints. It speaks to the
//! embedding web framework exclusively through the [`WebRequest`] and [`WebResponse`] traits and
//! to the resource owner through an [`OwnerSolicitor`], so any framework able to present query
//! parameters, an urlencoded body and a session can host it.

mod error;
mod query;
pub mod response_mode;
mod server;

#[cfg(test)]
mod tests;

pub use self::error::{BoxError, ServerError};
pub use self::query::QueryParameter;
pub use self::response_mode::ResponseMode;
pub use self::server::{Deserialized, DeserializeFn, SerializeFn, Server, ServerOptions};

use url::Url;

use crate::primitives::session::TransactionSession;
use crate::primitives::transaction::AuthorizationRequest;

/// Answer of a single handler in a dispatch chain.
///
/// Handlers are tried in registration order. A handler that recognizes the request settles it
/// with `Handled`, one that does not yields to the next handler with `Pass`. Hard failures use
/// the `Err` branch of the surrounding `Result` and stop the chain.
#[derive(Clone, Debug)]
pub enum HandlerOutcome<T> {
    /// The handler settled the request, no further handlers run.
    Handled(T),

    /// The handler does not apply, the next one in the chain is consulted.
    Pass,
}

/// Abstraction of web requests with common characteristics.
pub trait WebRequest {
    /// The error generated from access of malformed or invalid requests.
    type Error;

    /// The corresponding type of responses returned from this request.
    type Response: WebResponse<Error = Self::Error>;

    /// Retrieve a parsed version of the url query.
    ///
    /// An `Err` value indicates a malformed query or an otherwise malformed request.
    fn query(&mut self) -> Result<&dyn QueryParameter, Self::Error>;

    /// Retrieve the parsed `application/x-www-form-urlencoded` body of the request.
    ///
    /// `Ok(None)` signals that the web layer did not parse a body at all, which is different
    /// from an empty body.
    fn body(&mut self) -> Result<Option<&dyn QueryParameter>, Self::Error>;

    /// The per-user session attached to the request, if the web layer provides one.
    fn session(&mut self) -> Option<&mut dyn TransactionSession>;

    /// Create a fresh response to be filled in by the dispatcher.
    fn response(&mut self) -> Result<Self::Response, Self::Error>;
}

/// Response representation into which the dispatcher encodes its results.
pub trait WebResponse {
    /// The error generated when trying to construct an unhandled or invalid response.
    type Error;

    /// Set the response status to 200.
    fn ok(&mut self) -> Result<(), Self::Error>;

    /// A response which will redirect the user-agent to which the response is issued.
    fn redirect(&mut self, url: Url) -> Result<(), Self::Error>;

    /// Set the response status to 400.
    fn client_error(&mut self) -> Result<(), Self::Error>;

    /// Set the response status to 401.
    fn unauthorized(&mut self) -> Result<(), Self::Error>;

    /// Set the response status to 500.
    fn server_error(&mut self) -> Result<(), Self::Error>;

    /// A pure text response with no special media type set.
    fn body_text(&mut self, text: &str) -> Result<(), Self::Error>;

    /// Json repsonse data, media type `application/json`.
    ///
    /// Token responses carry credentials, so implementations must also set `Cache-Control:
    /// no-store` and `Pragma: no-cache`.
    fn body_json(&mut self, data: &str) -> Result<(), Self::Error>;

    /// Html response data, media type `text/html;charset=UTF-8`.
    ///
    /// Used for the auto-submitting document of the `form_post` response mode, which carries
    /// credentials as well and must not be cached, `Cache-Control: no-store`.
    fn body_html(&mut self, html: &str) -> Result<(), Self::Error>;
}

/// Answer from the solicitor to the request to approve or deny an authorization.
pub enum OwnerConsent<R: WebResponse> {
    /// The owner did not authorize the client.
    Denied,

    /// The owner has not yet decided, the response asks for consent.
    ///
    /// The transaction stays pending in the session; the consent form is expected to post the
    /// transaction id back to the decision operation.
    InProgress(R),

    /// Authorization was granted by the owner with the given identity.
    Authorized(String),

    /// An error occurred while checking authorization.
    Error(R::Error),
}

/// Data to be displayed on a consent screen.
pub struct Solicitation<'a, C> {
    pub(crate) id: &'a str,
    pub(crate) client: &'a C,
    pub(crate) redirect_uri: &'a str,
    pub(crate) request: &'a AuthorizationRequest,
}

impl<'a, C> Solicitation<'a, C> {
    /// The transaction id the consent form must post back.
    pub fn id(&self) -> &str {
        self.id
    }

    /// The client requesting the authorization.
    pub fn client(&self) -> &C {
        self.client
    }

    /// The validated uri results will be delivered to.
    pub fn redirect_uri(&self) -> &str {
        self.redirect_uri
    }

    /// The normalized request parameters, including the requested scope.
    pub fn request(&self) -> &AuthorizationRequest {
        self.request
    }
}

/// Solicits the resource owner for consent to a pending authorization.
///
/// In a web server environment this is usually implemented by rendering a consent form on
/// `InProgress` and resuming through the decision operation once the form is posted.
pub trait OwnerSolicitor<W: WebRequest, C> {
    /// Check if the owner has granted consent, or ask for it.
    fn check_consent(
        &mut self, request: &mut W, solicitation: Solicitation<'_, C>,
    ) -> OwnerConsent<W::Response>;
}

impl<'a, W: WebRequest, C, S: OwnerSolicitor<W, C> + ?Sized> OwnerSolicitor<W, C> for &'a mut S {
    fn check_consent(
        &mut self, request: &mut W, solicitation: Solicitation<'_, C>,
    ) -> OwnerConsent<W::Response> {
        (**self).check_consent(request, solicitation)
    }
}
