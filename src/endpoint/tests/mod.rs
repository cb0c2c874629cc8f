//! Tests of the dispatcher against crafted requests.


use url::Url;

use crate::endpoint::{
    Deserialized, OwnerConsent, OwnerSolicitor, QueryParameter, Server, Solicitation, WebRequest,
    WebResponse,
};
use crate::primitives::session::{SessionMap, TransactionSession};

/// The client type the test server is generic over.
#[derive(Clone, Debug, PartialEq)]
struct TestClient {
    id: String,
}

/// A request crafted directly from its parts, no framework involved.
#[derive(Debug, Default)]
struct CraftedRequest {
    query: Option<Vec<(String, String)>>,
    body: Option<Vec<(String, String)>>,
    session: Option<SessionMap>,
}

#[derive(Debug)]
enum CraftedError {
    NoQuery,
}

impl std::fmt::Display for CraftedError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("crafted request without a query")
    }
}

#[derive(Debug, Eq, PartialEq)]
enum Status {
    Ok,
    Redirect,
    BadRequest,
    Unauthorized,
    ServerError,
}

#[derive(Debug, Eq, PartialEq)]
enum Body {
    Text(String),
    Json(String),
    Html(String),
}

#[derive(Debug)]
struct CraftedResponse {
    status: Status,
    location: Option<Url>,
    body: Option<Body>,
}

impl Default for CraftedResponse {
    fn default() -> Self {
        CraftedResponse {
            status: Status::Ok,
            location: None,
            body: None,
        }
    }
}

impl WebRequest for CraftedRequest {
    type Error = CraftedError;
    type Response = CraftedResponse;

    fn query(&mut self) -> Result<&dyn QueryParameter, CraftedError> {
        self.query
            .as_ref()
            .map(|query| query as &dyn QueryParameter)
            .ok_or(CraftedError::NoQuery)
    }

    fn body(&mut self) -> Result<Option<&dyn QueryParameter>, CraftedError> {
        Ok(self.body.as_ref().map(|body| body as &dyn QueryParameter))
    }

    fn session(&mut self) -> Option<&mut dyn TransactionSession> {
        self.session
            .as_mut()
            .map(|session| session as &mut dyn TransactionSession)
    }

    fn response(&mut self) -> Result<CraftedResponse, CraftedError> {
        Ok(CraftedResponse::default())
    }
}

impl WebResponse for CraftedResponse {
    type Error = CraftedError;

    fn ok(&mut self) -> Result<(), CraftedError> {
        self.status = Status::Ok;
        Ok(())
    }

    fn redirect(&mut self, url: Url) -> Result<(), CraftedError> {
        self.status = Status::Redirect;
        self.location = Some(url);
        Ok(())
    }

    fn client_error(&mut self) -> Result<(), CraftedError> {
        self.status = Status::BadRequest;
        Ok(())
    }

    fn unauthorized(&mut self) -> Result<(), CraftedError> {
        self.status = Status::Unauthorized;
        Ok(())
    }

    fn server_error(&mut self) -> Result<(), CraftedError> {
        self.status = Status::ServerError;
        Ok(())
    }

    fn body_text(&mut self, text: &str) -> Result<(), CraftedError> {
        self.body = Some(Body::Text(text.to_string()));
        Ok(())
    }

    fn body_json(&mut self, data: &str) -> Result<(), CraftedError> {
        self.body = Some(Body::Json(data.to_string()));
        Ok(())
    }

    fn body_html(&mut self, html: &str) -> Result<(), CraftedError> {
        self.body = Some(Body::Html(html.to_string()));
        Ok(())
    }
}

fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
    raw.iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// A server with the usual client (de)serializers registered.
///
/// Clients serialize to their id; the representation `"revoked"` deserializes to a revoked
/// client.
fn test_server() -> Server<TestClient> {
    let mut server = Server::new();
    server.serialize_client(|client: &TestClient| Ok(Some(client.id.clone())));
    server.deserialize_client(|raw| {
        if raw == "revoked" {
            Ok(Deserialized::Revoked)
        } else {
            Ok(Deserialized::Client(TestClient { id: raw.to_string() }))
        }
    });
    server
}

/// Consents immediately with a fixed owner identity.
struct Allow(&'static str);

impl OwnerSolicitor<CraftedRequest, TestClient> for Allow {
    fn check_consent(
        &mut self, _: &mut CraftedRequest, _: Solicitation<'_, TestClient>,
    ) -> OwnerConsent<CraftedResponse> {
        OwnerConsent::Authorized(self.0.to_string())
    }
}

/// Denies immediately.
struct Deny;

impl OwnerSolicitor<CraftedRequest, TestClient> for Deny {
    fn check_consent(
        &mut self, _: &mut CraftedRequest, _: Solicitation<'_, TestClient>,
    ) -> OwnerConsent<CraftedResponse> {
        OwnerConsent::Denied
    }
}

/// Defers the decision, remembering the solicited transaction id.
#[derive(Default)]
struct Pend {
    solicited: Option<String>,
}

impl OwnerSolicitor<CraftedRequest, TestClient> for Pend {
    fn check_consent(
        &mut self, request: &mut CraftedRequest, solicitation: Solicitation<'_, TestClient>,
    ) -> OwnerConsent<CraftedResponse> {
        self.solicited = Some(solicitation.id().to_string());
        let mut response = match request.response() {
            Ok(response) => response,
            Err(err) => return OwnerConsent::Error(err),
        };
        if let Err(err) = response.body_text("consent form") {
            return OwnerConsent::Error(err);
        }
        OwnerConsent::InProgress(response)
    }
}

fn location_query(response: &CraftedResponse) -> Vec<(String, String)> {
    response
        .location
        .as_ref()
        .expect("expected a redirect")
        .query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}
