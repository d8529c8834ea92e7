//! The cache-aside dispatcher.
//!
//! One call per invocation, no retained state across calls. Reads consult
//! the cache first and fall back to the loader on miss; writes run the
//! business call to completion and only on its success touch the cache. The
//! dispatcher never makes the store mutation and the cache mutation atomic
//! with respect to each other - that gap is an accepted weak-consistency
//! window, and concurrent misses on one key may each invoke the loader.

use cachet_core::{CachetError, CachetResult, DispatchError};
use cachet_expr::{EvalContext, PathExpr};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::adapter::Declared;
use crate::binding::{Binding, BindingRegistry, CacheOp};
use crate::key::CacheKey;
use crate::traits::{CacheBackend, Loader};

/// The intercepted business method, boxed for dispatch.
pub type BusinessCall = BoxFuture<'static, CachetResult<Declared>>;

/// One intercepted invocation: the named arguments (in declaration order)
/// and, for operations that mutate the store, the business call itself.
#[derive(Default)]
pub struct MethodCall {
    ctx: EvalContext,
    body: Option<BusinessCall>,
}

impl MethodCall {
    /// Start an empty invocation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a named argument. The first bound argument doubles as the
    /// positional key default.
    pub fn arg(mut self, name: impl Into<String>, value: Value) -> Self {
        self.ctx = self.ctx.arg(name, value);
        self
    }

    /// Attach the business call. Required for Put/PutAll/Evict/EvictAll/
    /// Clear; ignored by reads, whose loader stands in for the method body.
    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Future<Output = CachetResult<Declared>> + Send + 'static,
    {
        self.body = Some(body.boxed());
        self
    }
}

/// State-free orchestrator for the six cache-aside operations.
///
/// Generic over the cache backend and the loader; holds the binding table
/// built at startup. Every public entry point is [`CacheDispatcher::dispatch`].
pub struct CacheDispatcher<C, L>
where
    C: CacheBackend,
    L: Loader,
{
    cache: Arc<C>,
    loader: Arc<L>,
    registry: BindingRegistry,
}

impl<C, L> CacheDispatcher<C, L>
where
    C: CacheBackend,
    L: Loader,
{
    /// Create a dispatcher over a cache backend, a loader, and a binding
    /// table.
    pub fn new(cache: Arc<C>, loader: Arc<L>, registry: BindingRegistry) -> Self {
        Self {
            cache,
            loader,
            registry,
        }
    }

    /// The registered binding table.
    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    /// A reference to the cache backend.
    pub fn backend(&self) -> &C {
        &self.cache
    }

    /// Execute the registered cache behavior for `method`.
    pub async fn dispatch(&self, method: &str, call: MethodCall) -> CachetResult<Declared> {
        let binding = self.registry.lookup(method)?;
        match binding.op() {
            CacheOp::Get => self.get(binding, call.ctx).await,
            CacheOp::GetAll => self.get_all(binding, call.ctx).await,
            CacheOp::Put => self.put(binding, call).await,
            CacheOp::PutAll => self.put_all(binding, call).await,
            CacheOp::Evict => self.evict(binding, call).await,
            CacheOp::EvictAll => self.evict_all(binding, call).await,
            CacheOp::Clear => self.clear(binding, call).await,
        }
    }

    // ========================================================================
    // READS (cache first, loader on miss)
    // ========================================================================

    async fn get(&self, binding: &Binding, ctx: EvalContext) -> CachetResult<Declared> {
        let key_value = Self::resolve_key(binding, &ctx)?;
        let key = CacheKey::from_value(&key_value)?;

        if let Some(raw) = self.cache.get(&key).await? {
            debug!(method = binding.method(), %key, "cache hit");
            return Ok(Declared::wrap(raw, binding.wrapper()));
        }

        debug!(method = binding.method(), %key, "cache miss, loading");
        let raw = self.loader.load(&key_value).await?;
        // A null load is a legitimate outcome and is cached like any other.
        self.cache.put(key, raw.clone()).await?;
        Ok(Declared::wrap(raw, binding.wrapper()))
    }

    async fn get_all(&self, binding: &Binding, ctx: EvalContext) -> CachetResult<Declared> {
        let pairs = Self::resolve_key_set(binding, &ctx)?;
        let keys: Vec<CacheKey> = pairs.iter().map(|(_, key)| key.clone()).collect();
        let hits = self.cache.get_many(&keys).await?;

        let mut merged = Map::new();
        let mut missing: Vec<Value> = Vec::new();
        for (key_value, key) in &pairs {
            match hits.get(key) {
                Some(raw) => {
                    merged.insert(key.as_str().to_string(), raw.clone());
                }
                None => missing.push(key_value.clone()),
            }
        }
        debug!(
            method = binding.method(),
            hits = merged.len(),
            misses = missing.len(),
            "batch read partitioned"
        );

        // One loader call for the whole miss set; a fully-hit read never
        // reaches the loader.
        if !missing.is_empty() {
            let loaded = self.loader.load_many(&missing).await?;
            let mut entries = Vec::with_capacity(loaded.len());
            for (key_value, raw) in loaded {
                let key = CacheKey::from_value(&key_value)?;
                merged.insert(key.as_str().to_string(), raw.clone());
                entries.push((key, raw));
            }
            // Keys the loader omitted stay uncached and unreported.
            self.cache.put_many(entries).await?;
        }

        Ok(Declared::wrap(Value::Object(merged), binding.wrapper()))
    }

    // ========================================================================
    // WRITES (business call first, cache only on success)
    // ========================================================================

    async fn put(&self, binding: &Binding, call: MethodCall) -> CachetResult<Declared> {
        let raw = Self::run_body(binding, call.body).await?;
        let ctx = call.ctx.with_result(raw.clone());

        let key_value = Self::resolve_key(binding, &ctx)?;
        let key = CacheKey::from_value(&key_value)?;
        let value = Self::resolve_value(binding, &ctx)?;

        debug!(method = binding.method(), %key, "write-through put");
        self.cache.put(key, value).await?;
        Ok(Declared::wrap(raw, binding.wrapper()))
    }

    async fn put_all(&self, binding: &Binding, call: MethodCall) -> CachetResult<Declared> {
        let raw = Self::run_body(binding, call.body).await?;
        let ctx = call.ctx.with_result(raw.clone());

        let value = Self::resolve_value(binding, &ctx)?;
        let Value::Object(pairs) = value else {
            return Err(DispatchError::ValueShape {
                method: binding.method().to_string(),
                expected: "a key-value object".to_string(),
            }
            .into());
        };

        let mut entries = Vec::with_capacity(pairs.len());
        for (key_text, raw_value) in pairs {
            let key = CacheKey::from_value(&Value::String(key_text))?;
            entries.push((key, raw_value));
        }
        debug!(
            method = binding.method(),
            count = entries.len(),
            "write-through put_all"
        );
        self.cache.put_many(entries).await?;
        Ok(Declared::wrap(raw, binding.wrapper()))
    }

    async fn evict(&self, binding: &Binding, call: MethodCall) -> CachetResult<Declared> {
        let raw = Self::run_body(binding, call.body).await?;
        let ctx = call.ctx.with_result(raw.clone());

        let key_value = Self::resolve_key(binding, &ctx)?;
        let key = CacheKey::from_value(&key_value)?;

        debug!(method = binding.method(), %key, "evicting");
        self.cache.evict(&key).await?;
        Ok(Declared::wrap(raw, binding.wrapper()))
    }

    async fn evict_all(&self, binding: &Binding, call: MethodCall) -> CachetResult<Declared> {
        let raw = Self::run_body(binding, call.body).await?;
        let ctx = call.ctx.with_result(raw.clone());

        let pairs = Self::resolve_key_set(binding, &ctx)?;
        let keys: Vec<CacheKey> = pairs.into_iter().map(|(_, key)| key).collect();

        debug!(method = binding.method(), count = keys.len(), "evicting batch");
        self.cache.evict_many(&keys).await?;
        Ok(Declared::wrap(raw, binding.wrapper()))
    }

    async fn clear(&self, binding: &Binding, call: MethodCall) -> CachetResult<Declared> {
        let raw = Self::run_body(binding, call.body).await?;

        debug!(method = binding.method(), "clearing cache region");
        self.cache.clear().await?;
        Ok(Declared::wrap(raw, binding.wrapper()))
    }

    // ========================================================================
    // SHARED RESOLUTION STEPS
    // ========================================================================

    /// Run the business call to completion, unwrapping its declared result.
    /// Nothing touches the cache before this returns successfully.
    async fn run_body(binding: &Binding, body: Option<BusinessCall>) -> CachetResult<Value> {
        let body = body.ok_or_else(|| DispatchError::MissingBody {
            method: binding.method().to_string(),
        })?;
        let declared = body.await?;
        Ok(declared.into_raw().await)
    }

    fn key_expr(binding: &Binding) -> CachetResult<&PathExpr> {
        binding.key_expr().ok_or_else(|| {
            DispatchError::KeyShape {
                method: binding.method().to_string(),
                expected: "declared at registration".to_string(),
            }
            .into()
        })
    }

    /// Resolve the binding's key expression to a single non-null key.
    fn resolve_key(binding: &Binding, ctx: &EvalContext) -> CachetResult<Value> {
        let key_value = Self::key_expr(binding)?.resolve(ctx)?;
        if key_value.is_null() {
            return Err(DispatchError::NullArgument {
                method: binding.method().to_string(),
            }
            .into());
        }
        Ok(key_value)
    }

    /// Resolve the binding's key expression to a key set (a JSON array of
    /// non-null keys), deduplicated by canonical form.
    fn resolve_key_set(
        binding: &Binding,
        ctx: &EvalContext,
    ) -> CachetResult<Vec<(Value, CacheKey)>> {
        let keys_value = Self::key_expr(binding)?.resolve(ctx)?;
        let Value::Array(elements) = keys_value else {
            return Err(DispatchError::KeyShape {
                method: binding.method().to_string(),
                expected: "an array of keys".to_string(),
            }
            .into());
        };

        let mut pairs: Vec<(Value, CacheKey)> = Vec::with_capacity(elements.len());
        for element in elements {
            if element.is_null() {
                return Err(DispatchError::NullArgument {
                    method: binding.method().to_string(),
                }
                .into());
            }
            let key = CacheKey::from_value(&element)?;
            if !pairs.iter().any(|(_, existing)| existing == &key) {
                pairs.push((element, key));
            }
        }
        Ok(pairs)
    }

    fn resolve_value(binding: &Binding, ctx: &EvalContext) -> CachetResult<Value> {
        let expr = binding.value_expr().ok_or_else(|| -> CachetError {
            DispatchError::ValueShape {
                method: binding.method().to_string(),
                expected: "declared at registration".to_string(),
            }
            .into()
        })?;
        Ok(expr.resolve(ctx)?)
    }
}
