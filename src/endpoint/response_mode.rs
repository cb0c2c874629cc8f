//! Encoding of authorization results into the user-agent response.
//!
//! A grant handler determines not only which parameters to deliver but also where in the
//! redirect they travel. Three modes exist: the query component used by the authorization code
//! grant, the fragment component used by the implicit grant so tokens never reach the client
//! server, and an auto-submitting html form posting to the redirect uri.

use serde::{Deserialize, Serialize};
use url::form_urlencoded::Serializer;
use url::Url;

use super::WebResponse;

/// Where in the user-agent response the result parameters are delivered.
///
/// Serializable because a pending transaction remembers its handler's mode, so denials decided
/// in a later request are delivered the same way as successes.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Parameters are merged into the query component of the redirect uri.
    Query,

    /// Parameters are encoded into the fragment component of the redirect uri.
    ///
    /// Fragments are never sent to the server behind the uri, which keeps tokens issued by the
    /// implicit grant out of server logs and referrer headers.
    Fragment,

    /// Parameters are posted to the redirect uri by an auto-submitting html form.
    FormPost,
}

impl Default for ResponseMode {
    fn default() -> Self {
        ResponseMode::Query
    }
}

/// Encode `params` into `response` according to `mode`, targeting `redirect_uri`.
pub fn encode<R: WebResponse>(
    mode: ResponseMode, response: &mut R, redirect_uri: &Url, params: &[(String, String)],
) -> Result<(), R::Error> {
    match mode {
        ResponseMode::Query => {
            let mut url = redirect_uri.clone();
            // Later values win over pairs already present in the registered uri.
            let mut pairs: Vec<(String, String)> = url
                .query_pairs()
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect();
            for (key, value) in params {
                match pairs.iter_mut().find(|(existing, _)| existing == key) {
                    Some(pair) => pair.1 = value.clone(),
                    None => pairs.push((key.clone(), value.clone())),
                }
            }
            url.set_query(None);
            if !pairs.is_empty() {
                url.query_pairs_mut().extend_pairs(pairs);
            }
            response.redirect(url)
        }
        ResponseMode::Fragment => {
            let mut url = redirect_uri.clone();
            let fragment = Serializer::new(String::new()).extend_pairs(params).finish();
            url.set_fragment(Some(&fragment));
            response.redirect(url)
        }
        ResponseMode::FormPost => {
            let html = form_post_document(redirect_uri, params);
            response.body_html(&html)?;
            response.ok()
        }
    }
}

/// The self-submitting document delivering `params` to `redirect_uri` as form fields.
fn form_post_document(redirect_uri: &Url, params: &[(String, String)]) -> String {
    let mut html = String::from(
        "<html><head><title>Submitting...</title></head>\
         <body onload=\"javascript:document.forms[0].submit()\">",
    );
    html.push_str(&format!(
        "<form method=\"post\" action=\"{}\">",
        escape(redirect_uri.as_str())
    ));
    for (key, value) in params {
        html.push_str(&format!(
            "<input type=\"hidden\" name=\"{}\" value=\"{}\"/>",
            escape(key),
            escape(value)
        ));
    }
    html.push_str("</form></body></html>");
    html
}

/// Escape a value for interpolation into an html attribute.
fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
