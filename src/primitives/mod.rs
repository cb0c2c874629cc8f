//! Protocol-neutral building blocks used by the dispatcher and handlers.
//!
//! Everything here is independent of any particular web request representation: the scope
//! parser, the transaction id generator, the session interface owned by the embedding
//! application, and the authorization transaction itself.

pub mod generator;
pub mod scope;
pub mod session;
pub mod transaction;
