//! consentry, an extensible OAuth2 authorization server core.
//!
//! This crate implements the protocol logic of [rfc6749] without binding to a web framework, a
//! persistence layer or a token format. The embedding application supplies those through small
//! interfaces and callback functions; the crate supplies the dispatch, the error taxonomy and
//! the redirect plumbing.
//!
//! # Overview
//!
//! The central type is [`endpoint::Server`], registered with handler chains for each grant:
//!
//! * [`grant`] handlers own a `response_type` on the authorization endpoint. They validate
//!   requests into pending transactions stored in the user's session, survive the consent round
//!   trip, and encode results through a [`endpoint::response_mode`] encoder.
//! * [`exchange`] handlers own a `grant_type` on the token endpoint. They exchange a presented
//!   grant for the json token response.
//!
//! Requests and responses are abstracted by [`endpoint::WebRequest`] and
//! [`endpoint::WebResponse`], consent by [`endpoint::OwnerSolicitor`], session storage by
//! [`primitives::session::TransactionSession`]. Client authentication on the token endpoint and
//! resource owner authentication are left to the embedding application, which passes their
//! results into [`endpoint::Server::token`] and [`endpoint::Server::decision`].
//!
//! [rfc6749]: https://tools.ietf.org/html/rfc6749

#![warn(missing_docs)]

pub mod endpoint;
pub mod error;
pub mod exchange;
pub mod grant;
pub mod primitives;
