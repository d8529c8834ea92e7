//! Cachet Aside - Cache-Aside Orchestration
//!
//! This crate is the cache-aside half of cachet: a pluggable [`CacheBackend`],
//! a caller-supplied [`Loader`] that reads the backing store on miss, a
//! return adapter that (un)wraps declared return shapes around raw cached
//! values, and a [`CacheDispatcher`] that maps declarative operation bindings
//! onto the six cache-aside operations.
//!
//! # Design Philosophy
//!
//! Nothing here is discovered at call time. Each method gets a [`Binding`]
//! registered once at startup: its operation kind, its key and value
//! expressions (parsed to ASTs up front), and its [`WrapperKind`] tag. The
//! dispatcher is state-free; per invocation it resolves expressions, talks to
//! the backend and loader, and re-wraps the raw value.
//!
//! Reads are cache-first: a miss invokes the loader and populates the cache,
//! a null load included. Writes are store-first: the business call runs to
//! completion and only its success mutates the cache.

pub mod adapter;
pub mod binding;
pub mod dispatcher;
pub mod key;
pub mod memory;
pub mod traits;

pub use adapter::{Declared, WrapperKind};
pub use binding::{Binding, BindingRegistry, CacheOp};
pub use dispatcher::{CacheDispatcher, MethodCall};
pub use key::CacheKey;
pub use memory::{CacheConfig, MemoryCache};
pub use traits::{CacheBackend, CacheStats, Loader};
