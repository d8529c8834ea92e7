//! Return adapter: declared return shapes around raw cached values.
//!
//! A method declares one of four return shapes for the same underlying
//! value. The cache only ever stores the raw unwrapped value (possibly
//! null); the adapter re-wraps it on every read. The shape is a static tag
//! fixed at binding registration, never derived by inspecting a call's
//! result at runtime.

use futures_util::future::{self, BoxFuture};
use futures_util::stream::{BoxStream, StreamExt};
use futures_util::FutureExt;
use serde_json::Value;
use std::fmt;

/// How a method's declared return shape relates to the raw cached value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapperKind {
    /// The raw value itself, null included.
    #[default]
    Plain,
    /// An optional: empty stands for null.
    Optional,
    /// An already-completed future carrying the value. A completed null is a
    /// legitimate value, unlike the optional case.
    Future,
    /// A single-element stream carrying the value, null included.
    ReactiveSingle,
}

/// A value in its declared return shape.
pub enum Declared {
    /// `Plain` shape.
    Plain(Value),
    /// `Optional` shape; `None` is "empty".
    Optional(Option<Value>),
    /// `Future` shape; completed by construction in every sample, but
    /// awaited properly either way.
    Future(BoxFuture<'static, Value>),
    /// `ReactiveSingle` shape; a stream expected to yield one element.
    ReactiveSingle(BoxStream<'static, Value>),
}

impl Declared {
    /// Plain value constructor.
    pub fn plain(value: Value) -> Self {
        Self::Plain(value)
    }

    /// Optional constructor from a possibly-null value.
    pub fn optional(value: Option<Value>) -> Self {
        Self::Optional(value)
    }

    /// An already-completed future carrying `value`.
    pub fn completed(value: Value) -> Self {
        Self::Future(future::ready(value).boxed())
    }

    /// A single-element stream carrying `value`.
    pub fn single(value: Value) -> Self {
        Self::ReactiveSingle(Box::pin(tokio_stream::once(value)))
    }

    /// The wrapper kind this declared value carries.
    pub fn kind(&self) -> WrapperKind {
        match self {
            Self::Plain(_) => WrapperKind::Plain,
            Self::Optional(_) => WrapperKind::Optional,
            Self::Future(_) => WrapperKind::Future,
            Self::ReactiveSingle(_) => WrapperKind::ReactiveSingle,
        }
    }

    /// Unwrap to the raw value the cache stores.
    ///
    /// Plain passes through; an empty optional becomes null; a future is
    /// awaited; a stream yields its first element, or null if it is empty.
    pub async fn into_raw(self) -> Value {
        match self {
            Self::Plain(value) => value,
            Self::Optional(value) => value.unwrap_or(Value::Null),
            Self::Future(fut) => fut.await,
            Self::ReactiveSingle(mut stream) => stream.next().await.unwrap_or(Value::Null),
        }
    }

    /// Wrap a raw value back into the declared shape.
    ///
    /// `unwrap` then `wrap` is a lossless round trip for every kind, with
    /// one deliberate asymmetry at the type level: a raw null becomes an
    /// *empty* optional but a *completed null* future or stream.
    pub fn wrap(raw: Value, kind: WrapperKind) -> Self {
        match kind {
            WrapperKind::Plain => Self::Plain(raw),
            WrapperKind::Optional => {
                if raw.is_null() {
                    Self::Optional(None)
                } else {
                    Self::Optional(Some(raw))
                }
            }
            WrapperKind::Future => Self::completed(raw),
            WrapperKind::ReactiveSingle => Self::single(raw),
        }
    }
}

impl fmt::Debug for Declared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(value) => f.debug_tuple("Plain").field(value).finish(),
            Self::Optional(value) => f.debug_tuple("Optional").field(value).finish(),
            Self::Future(_) => f.debug_tuple("Future").field(&"..").finish(),
            Self::ReactiveSingle(_) => f.debug_tuple("ReactiveSingle").field(&"..").finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_round_trip_preserves_raw_value() {
        for kind in [
            WrapperKind::Plain,
            WrapperKind::Optional,
            WrapperKind::Future,
            WrapperKind::ReactiveSingle,
        ] {
            let raw = json!({"id": 1, "name": "Jack0"});
            let wrapped = Declared::wrap(raw.clone(), kind);
            assert_eq!(wrapped.kind(), kind);
            assert_eq!(wrapped.into_raw().await, raw);
        }
    }

    #[tokio::test]
    async fn test_round_trip_preserves_null() {
        for kind in [
            WrapperKind::Plain,
            WrapperKind::Optional,
            WrapperKind::Future,
            WrapperKind::ReactiveSingle,
        ] {
            let wrapped = Declared::wrap(Value::Null, kind);
            assert_eq!(wrapped.into_raw().await, Value::Null);
        }
    }

    #[tokio::test]
    async fn test_null_wraps_to_empty_optional_but_completed_future() {
        assert!(matches!(
            Declared::wrap(Value::Null, WrapperKind::Optional),
            Declared::Optional(None)
        ));
        // The future case carries null as a completed value instead.
        match Declared::wrap(Value::Null, WrapperKind::Future) {
            Declared::Future(fut) => assert_eq!(fut.await, Value::Null),
            other => panic!("expected future, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_stream_unwraps_to_null() {
        let declared = Declared::ReactiveSingle(Box::pin(tokio_stream::empty()));
        assert_eq!(declared.into_raw().await, Value::Null);
    }

    #[tokio::test]
    async fn test_plain_null_passes_through() {
        assert_eq!(Declared::plain(Value::Null).into_raw().await, Value::Null);
    }
}
