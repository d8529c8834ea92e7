//! Resolution context binding an invocation's arguments and result.

use serde_json::Value;

/// The values a path expression can be resolved against: the invocation's
/// named arguments (in declaration order) and, for value expressions, the
/// method result.
///
/// Built per invocation and discarded afterwards; never persisted.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    args: Vec<(String, Value)>,
    result: Option<Value>,
}

impl EvalContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a named argument. Declaration order is preserved; the first
    /// bound argument is the positional default.
    pub fn arg(mut self, name: impl Into<String>, value: Value) -> Self {
        self.args.push((name.into(), value));
        self
    }

    /// Bind the method result.
    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    /// Look up an argument by name.
    pub fn lookup_arg(&self, name: &str) -> Option<&Value> {
        self.args
            .iter()
            .find(|(arg_name, _)| arg_name == name)
            .map(|(_, value)| value)
    }

    /// The first positional argument, if any.
    pub fn first_arg(&self) -> Option<&Value> {
        self.args.first().map(|(_, value)| value)
    }

    /// The bound method result, if any.
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_by_name_and_position() {
        let ctx = EvalContext::new()
            .arg("id", json!(1))
            .arg("name", json!("Jack0"));

        assert_eq!(ctx.first_arg(), Some(&json!(1)));
        assert_eq!(ctx.lookup_arg("name"), Some(&json!("Jack0")));
        assert_eq!(ctx.lookup_arg("missing"), None);
        assert_eq!(ctx.result(), None);
    }

    #[test]
    fn test_result_binding() {
        let ctx = EvalContext::new().with_result(json!({"id": 3}));
        assert_eq!(ctx.result(), Some(&json!({"id": 3})));
    }
}
