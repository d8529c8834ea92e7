//! Path expression AST, parser, and evaluator.

use cachet_core::ExprError;
use serde_json::Value;
use std::fmt;

use crate::EvalContext;

/// Where a path expression starts resolving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprRoot {
    /// The invocation's first positional argument (the static default for keys).
    FirstArg,
    /// A named argument, e.g. `#record`.
    Arg(String),
    /// The method result, `#result`.
    Result,
}

/// A parsed path expression: a root binding followed by field segments.
///
/// Parsing happens once at binding registration; per-invocation work is
/// limited to [`PathExpr::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    root: ExprRoot,
    segments: Vec<String>,
}

impl PathExpr {
    /// The static key default: the first positional argument, no traversal.
    pub fn first_arg() -> Self {
        Self {
            root: ExprRoot::FirstArg,
            segments: Vec::new(),
        }
    }

    /// The static value default: the method result, no traversal.
    pub fn result() -> Self {
        Self {
            root: ExprRoot::Result,
            segments: Vec::new(),
        }
    }

    /// Parse an expression of the form `#root.segment.segment`.
    ///
    /// The root is either an argument name or the reserved word `result`.
    /// Each component must be an identifier (`[A-Za-z_][A-Za-z0-9_]*`).
    pub fn parse(text: &str) -> Result<Self, ExprError> {
        let mut chars = text.char_indices().peekable();

        match chars.next() {
            Some((_, '#')) => {}
            Some((position, other)) => {
                return Err(ExprError::Parse {
                    message: format!("expected '#', found '{}'", other),
                    position,
                });
            }
            None => {
                return Err(ExprError::Parse {
                    message: "empty expression".to_string(),
                    position: 0,
                });
            }
        }

        let mut components: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut component_start = 1;

        for (position, c) in chars {
            match c {
                '.' => {
                    if current.is_empty() {
                        return Err(ExprError::Parse {
                            message: "empty path segment".to_string(),
                            position,
                        });
                    }
                    components.push(std::mem::take(&mut current));
                    component_start = position + 1;
                }
                c if c.is_ascii_alphabetic() || c == '_' => current.push(c),
                c if c.is_ascii_digit() && !current.is_empty() => current.push(c),
                other => {
                    return Err(ExprError::Parse {
                        message: format!("illegal character '{}' in identifier", other),
                        position,
                    });
                }
            }
        }

        if current.is_empty() {
            return Err(ExprError::Parse {
                message: "empty path segment".to_string(),
                position: component_start,
            });
        }
        components.push(current);

        let mut components = components.into_iter();
        let root_name = components.next().unwrap_or_default();
        let root = if root_name == "result" {
            ExprRoot::Result
        } else {
            ExprRoot::Arg(root_name)
        };

        Ok(Self {
            root,
            segments: components.collect(),
        })
    }

    /// The expression root.
    pub fn root(&self) -> &ExprRoot {
        &self.root
    }

    /// The field segments traversed after the root.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Resolve this expression against an invocation context.
    ///
    /// Fails when the root binding is absent or a segment cannot be followed;
    /// there is no silent defaulting on evaluation failure.
    pub fn resolve(&self, ctx: &EvalContext) -> Result<Value, ExprError> {
        let mut current = match &self.root {
            ExprRoot::FirstArg => ctx.first_arg().ok_or_else(|| ExprError::UnknownBinding {
                name: "first argument".to_string(),
            })?,
            ExprRoot::Arg(name) => {
                ctx.lookup_arg(name)
                    .ok_or_else(|| ExprError::UnknownBinding { name: name.clone() })?
            }
            ExprRoot::Result => ctx.result().ok_or_else(|| ExprError::UnknownBinding {
                name: "result".to_string(),
            })?,
        };

        for segment in &self.segments {
            match current {
                Value::Object(fields) => {
                    current = fields.get(segment).ok_or_else(|| ExprError::MissingField {
                        segment: segment.clone(),
                        path: self.to_string(),
                    })?;
                }
                _ => {
                    return Err(ExprError::NonObjectTraversal {
                        segment: segment.clone(),
                        path: self.to_string(),
                    });
                }
            }
        }

        Ok(current.clone())
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root {
            ExprRoot::FirstArg => write!(f, "<first argument>")?,
            ExprRoot::Arg(name) => write!(f, "#{}", name)?,
            ExprRoot::Result => write!(f, "#result")?,
        }
        for segment in &self.segments {
            write!(f, ".{}", segment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_named_argument_path() {
        let expr = PathExpr::parse("#record.id").unwrap();
        assert_eq!(expr.root(), &ExprRoot::Arg("record".to_string()));
        assert_eq!(expr.segments(), ["id"]);
        assert_eq!(expr.to_string(), "#record.id");
    }

    #[test]
    fn test_parse_result_root() {
        let expr = PathExpr::parse("#result.id").unwrap();
        assert_eq!(expr.root(), &ExprRoot::Result);

        let bare = PathExpr::parse("#result").unwrap();
        assert_eq!(bare.root(), &ExprRoot::Result);
        assert!(bare.segments().is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(matches!(
            PathExpr::parse("record.id"),
            Err(ExprError::Parse { position: 0, .. })
        ));
        assert!(matches!(PathExpr::parse(""), Err(ExprError::Parse { .. })));
        assert!(matches!(
            PathExpr::parse("#record..id"),
            Err(ExprError::Parse { .. })
        ));
        assert!(matches!(
            PathExpr::parse("#record."),
            Err(ExprError::Parse { .. })
        ));
        assert!(matches!(
            PathExpr::parse("#record.1id"),
            Err(ExprError::Parse { .. })
        ));
        assert!(matches!(
            PathExpr::parse("#record id"),
            Err(ExprError::Parse { .. })
        ));
    }

    #[test]
    fn test_resolve_first_arg_default() {
        let ctx = EvalContext::new().arg("id", json!(42));
        let value = PathExpr::first_arg().resolve(&ctx).unwrap();
        assert_eq!(value, json!(42));
    }

    #[test]
    fn test_resolve_traverses_fields() {
        let ctx = EvalContext::new().arg("record", json!({"id": 3, "name": "Jack0"}));
        let value = PathExpr::parse("#record.id").unwrap().resolve(&ctx).unwrap();
        assert_eq!(value, json!(3));
    }

    #[test]
    fn test_resolve_result_path() {
        let ctx = EvalContext::new()
            .arg("draft", json!({"name": "Jack0"}))
            .with_result(json!({"id": 9, "name": "Jack0"}));
        let value = PathExpr::parse("#result.id").unwrap().resolve(&ctx).unwrap();
        assert_eq!(value, json!(9));
    }

    #[test]
    fn test_resolve_unknown_binding() {
        let ctx = EvalContext::new();
        let err = PathExpr::parse("#record.id").unwrap().resolve(&ctx);
        assert_eq!(
            err,
            Err(ExprError::UnknownBinding {
                name: "record".to_string()
            })
        );

        let err = PathExpr::result().resolve(&ctx);
        assert_eq!(
            err,
            Err(ExprError::UnknownBinding {
                name: "result".to_string()
            })
        );
    }

    #[test]
    fn test_resolve_missing_field() {
        let ctx = EvalContext::new().arg("record", json!({"name": "Jack0"}));
        let err = PathExpr::parse("#record.id").unwrap().resolve(&ctx);
        assert_eq!(
            err,
            Err(ExprError::MissingField {
                segment: "id".to_string(),
                path: "#record.id".to_string(),
            })
        );
    }

    #[test]
    fn test_resolve_null_intermediate_is_an_error() {
        let ctx = EvalContext::new().arg("record", json!({"owner": null}));
        let err = PathExpr::parse("#record.owner.id").unwrap().resolve(&ctx);
        assert_eq!(
            err,
            Err(ExprError::NonObjectTraversal {
                segment: "id".to_string(),
                path: "#record.owner.id".to_string(),
            })
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        const IDENT: &str = "[a-z_][a-z0-9_]{0,8}";

        proptest! {
            /// Any well-formed expression survives a display/parse cycle.
            #[test]
            fn prop_display_parse_round_trip(
                root in IDENT,
                segments in prop::collection::vec(IDENT, 0..4),
            ) {
                let mut text = format!("#{}", root);
                for segment in &segments {
                    text.push('.');
                    text.push_str(segment);
                }
                let expr = PathExpr::parse(&text).unwrap();
                prop_assert_eq!(expr.to_string(), text);
                prop_assert_eq!(expr.segments().len(), segments.len());
            }
        }
    }
}
