//! Lexical Scopes
//!
//! Name accesses arrive as plain strings. Two callbacks that both write `x`
//! only conflict if `x` resolves to the same binding for both of them, which
//! depends on where each function was created. This module rebuilds enough
//! of the observed program's scope chain to answer that question.

mod resolver;

pub(crate) use resolver::validate;
pub use resolver::{Scope, ScopeId, ScopeResolver};
