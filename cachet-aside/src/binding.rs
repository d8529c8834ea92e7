//! Declarative operation bindings.
//!
//! A binding is the reified form of a cache annotation: which cache-aside
//! operation a method maps to, where its key and value come from, and what
//! return shape it declares. Bindings are registered once at startup into an
//! immutable [`BindingRegistry`]; nothing about them is re-derived per call.

use cachet_core::{CachetResult, DispatchError};
use cachet_expr::PathExpr;
use std::collections::HashMap;

use crate::adapter::WrapperKind;

/// The six cache-aside operations, plus the batch read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOp {
    /// Single read-through.
    Get,
    /// Batch read-through over a key set.
    GetAll,
    /// Single write-through.
    Put,
    /// Batch write-through from a key-value map.
    PutAll,
    /// Single eviction.
    Evict,
    /// Batch eviction over a key set.
    EvictAll,
    /// Drop the whole cache region.
    Clear,
}

/// A method's registered cache behavior.
///
/// Constructors are named after the declarative surface they reify
/// (`cacheable` → Get, `put` → Put, ...). Each constructor fills in the
/// operation's static defaults: the first positional argument for keys, the
/// method result for values. Defaults are fixed here, at registration -
/// never discovered at call time.
#[derive(Debug, Clone)]
pub struct Binding {
    method: String,
    op: CacheOp,
    key: Option<PathExpr>,
    value: Option<PathExpr>,
    wrapper: WrapperKind,
}

impl Binding {
    fn new(method: impl Into<String>, op: CacheOp) -> Self {
        let (key, value) = match op {
            CacheOp::Get | CacheOp::GetAll | CacheOp::Evict | CacheOp::EvictAll => {
                (Some(PathExpr::first_arg()), None)
            }
            CacheOp::Put => (Some(PathExpr::first_arg()), Some(PathExpr::result())),
            CacheOp::PutAll => (None, Some(PathExpr::result())),
            CacheOp::Clear => (None, None),
        };
        Self {
            method: method.into(),
            op,
            key,
            value,
            wrapper: WrapperKind::Plain,
        }
    }

    /// A single read-through binding (`Cacheable`).
    pub fn cacheable(method: impl Into<String>) -> Self {
        Self::new(method, CacheOp::Get)
    }

    /// A batch read-through binding (`CacheableAll`).
    pub fn cacheable_all(method: impl Into<String>) -> Self {
        Self::new(method, CacheOp::GetAll)
    }

    /// A single write-through binding (`CachePut`).
    pub fn put(method: impl Into<String>) -> Self {
        Self::new(method, CacheOp::Put)
    }

    /// A batch write-through binding (`CachePutAll`).
    pub fn put_all(method: impl Into<String>) -> Self {
        Self::new(method, CacheOp::PutAll)
    }

    /// A single eviction binding (`CacheEvict`).
    pub fn evict(method: impl Into<String>) -> Self {
        Self::new(method, CacheOp::Evict)
    }

    /// A batch eviction binding (`CacheEvictAll`).
    pub fn evict_all(method: impl Into<String>) -> Self {
        Self::new(method, CacheOp::EvictAll)
    }

    /// A region-clear binding (`CacheClear`).
    pub fn clear(method: impl Into<String>) -> Self {
        Self::new(method, CacheOp::Clear)
    }

    /// Override the key expression, e.g. `#result.id`.
    pub fn with_key(mut self, key: PathExpr) -> Self {
        self.key = Some(key);
        self
    }

    /// Override the value expression, e.g. `#record`.
    pub fn with_value(mut self, value: PathExpr) -> Self {
        self.value = Some(value);
        self
    }

    /// Declare the return shape the method carries.
    pub fn with_wrapper(mut self, wrapper: WrapperKind) -> Self {
        self.wrapper = wrapper;
        self
    }

    /// The method name this binding is registered under.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The cache-aside operation.
    pub fn op(&self) -> CacheOp {
        self.op
    }

    /// The key expression, if this operation takes a key.
    pub fn key_expr(&self) -> Option<&PathExpr> {
        self.key.as_ref()
    }

    /// The value expression, if this operation writes a value.
    pub fn value_expr(&self) -> Option<&PathExpr> {
        self.value.as_ref()
    }

    /// The declared return shape.
    pub fn wrapper(&self) -> WrapperKind {
        self.wrapper
    }
}

/// The binding table, immutable after construction.
#[derive(Debug, Clone, Default)]
pub struct BindingRegistry {
    bindings: HashMap<String, Binding>,
}

impl BindingRegistry {
    /// Start building a registry.
    pub fn builder() -> BindingRegistryBuilder {
        BindingRegistryBuilder::default()
    }

    /// Look up the binding for a method.
    pub fn lookup(&self, method: &str) -> CachetResult<&Binding> {
        self.bindings
            .get(method)
            .ok_or_else(|| {
                DispatchError::UnknownMethod {
                    method: method.to_string(),
                }
                .into()
            })
    }

    /// Number of registered bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// True when no binding is registered.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Builder for [`BindingRegistry`]. A later registration for the same method
/// name replaces the earlier one.
#[derive(Debug, Default)]
pub struct BindingRegistryBuilder {
    bindings: HashMap<String, Binding>,
}

impl BindingRegistryBuilder {
    /// Register a binding.
    pub fn register(mut self, binding: Binding) -> Self {
        self.bindings.insert(binding.method().to_string(), binding);
        self
    }

    /// Finish building.
    pub fn build(self) -> BindingRegistry {
        BindingRegistry {
            bindings: self.bindings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachet_core::CachetError;
    use cachet_expr::ExprRoot;

    #[test]
    fn test_cacheable_defaults_key_to_first_argument() {
        let binding = Binding::cacheable("get_record");
        assert_eq!(binding.op(), CacheOp::Get);
        assert_eq!(binding.key_expr().unwrap().root(), &ExprRoot::FirstArg);
        assert!(binding.value_expr().is_none());
        assert_eq!(binding.wrapper(), WrapperKind::Plain);
    }

    #[test]
    fn test_put_defaults_value_to_result() {
        let binding = Binding::put("save_record");
        assert_eq!(binding.key_expr().unwrap().root(), &ExprRoot::FirstArg);
        assert_eq!(binding.value_expr().unwrap().root(), &ExprRoot::Result);
    }

    #[test]
    fn test_clear_takes_no_key_or_value() {
        let binding = Binding::clear("clear");
        assert!(binding.key_expr().is_none());
        assert!(binding.value_expr().is_none());
    }

    #[test]
    fn test_key_override() {
        let binding =
            Binding::put("save_record").with_key(PathExpr::parse("#result.id").unwrap());
        assert_eq!(binding.key_expr().unwrap().to_string(), "#result.id");
    }

    #[test]
    fn test_registry_lookup() {
        let registry = BindingRegistry::builder()
            .register(Binding::cacheable("get_record"))
            .register(Binding::clear("clear"))
            .build();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup("get_record").unwrap().op(), CacheOp::Get);
        assert!(matches!(
            registry.lookup("missing"),
            Err(CachetError::Dispatch(DispatchError::UnknownMethod { .. }))
        ));
    }

    #[test]
    fn test_later_registration_replaces_earlier() {
        let registry = BindingRegistry::builder()
            .register(Binding::cacheable("op"))
            .register(Binding::evict("op"))
            .build();
        assert_eq!(registry.lookup("op").unwrap().op(), CacheOp::Evict);
    }
}
