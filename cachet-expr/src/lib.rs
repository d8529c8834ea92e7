//! Cachet Expression Resolver
//!
//! A small declarative path language for extracting cache keys and values
//! from an invocation: `#argName.field` reads a field of a named argument,
//! `#result.field` reads a field of the method result, and the bare defaults
//! (first positional argument for keys, method result for values) are
//! explicit constructors rather than call-time guesses.
//!
//! Expressions are parsed once, at binding registration, into a [`PathExpr`]
//! AST; resolution happens per invocation against an [`EvalContext`].

mod context;
mod path;

pub use context::EvalContext;
pub use path::{ExprRoot, PathExpr};
