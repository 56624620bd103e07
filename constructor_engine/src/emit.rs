/* Constructor-call trees produced by the tree-emission builder, and their source rendering */

use crate::errors::BuilderError;
use crate::value::{Arguments, Object, Value};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt::{self, Write};

/* "Construct `type_name` with these arguments" */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConstructorCall {
    pub type_name: String,
    pub args: Vec<CallArgument>,
}

/* One named argument of a constructor call, in declaration order */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CallArgument {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum Expr {
    /* Raw payload data passed through unchanged */
    Literal(JsonValue),
    /* A nested constructor call */
    New(ConstructorCall),
    /* A resolved list */
    Array(Vec<Expr>),
}

impl ConstructorCall {
    /* Lower a merged argument list into a call tree */
    pub fn from_arguments(args: Arguments) -> Result<Self, BuilderError> {
        let type_name = args.type_name().to_string();
        let args = args
            .into_entries()
            .into_iter()
            .map(|(name, value)| {
                let value = Expr::from_value(&type_name, &name, value)?;
                Ok(CallArgument { name, value })
            })
            .collect::<Result<Vec<_>, BuilderError>>()?;
        Ok(Self { type_name, args })
    }

    pub fn arg(&self, name: &str) -> Option<&Expr> {
        self.args
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| &arg.value)
    }

    /* Render as Rust-flavoured source, e.g. `Shape::new(Point::new(0, 0), None)` */
    pub fn render(&self) -> String {
        let mut output = String::new();
        write_call(&mut output, self);
        output
    }
}

impl fmt::Display for ConstructorCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl Expr {
    fn from_value(type_name: &str, parameter: &str, value: Value) -> Result<Self, BuilderError> {
        match value {
            Value::Data(json) => Ok(Expr::Literal(json)),
            Value::Object(Object::Call(call)) => Ok(Expr::New(call)),
            Value::Object(Object::Instance(instance)) => Err(BuilderError::Unrepresentable {
                type_name: type_name.to_string(),
                parameter: parameter.to_string(),
                reason: format!("'{}' is a live instance", instance.type_name()),
            }),
            Value::List(items) => items
                .into_iter()
                .map(|item| Expr::from_value(type_name, parameter, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Expr::Array),
        }
    }

    pub fn as_call(&self) -> Option<&ConstructorCall> {
        match self {
            Expr::New(call) => Some(call),
            _ => None,
        }
    }

    pub fn render(&self) -> String {
        let mut output = String::new();
        write_expr(&mut output, self);
        output
    }
}

/* Namespaced type names (`Geometry\Point`) become Rust paths */
fn rust_path(type_name: &str) -> String {
    type_name
        .trim_start_matches('\\')
        .split('\\')
        .map(escape_rust_keyword)
        .collect::<Vec<_>>()
        .join("::")
}

/* Escape Rust keywords to valid identifiers */
fn escape_rust_keyword(name: &str) -> String {
    const RUST_KEYWORDS: &[&str] = &[
        "as", "break", "const", "continue", "else", "enum", "extern", "false", "fn", "for", "if",
        "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
        "static", "struct", "trait", "true", "type", "unsafe", "use", "where", "while", "async",
        "await", "dyn", "abstract", "become", "box", "do", "final", "macro", "override", "priv",
        "typeof", "unsized", "virtual", "yield", "try",
    ];
    /* Path keywords have no raw form */
    const PATH_KEYWORDS: &[&str] = &["self", "Self", "super", "crate", "_"];

    if PATH_KEYWORDS.contains(&name) {
        format!("{}_", name)
    } else if RUST_KEYWORDS.contains(&name) {
        format!("r#{}", name)
    } else {
        name.to_string()
    }
}

fn write_call(output: &mut String, call: &ConstructorCall) {
    let _ = write!(output, "{}::new(", rust_path(&call.type_name));
    for (idx, arg) in call.args.iter().enumerate() {
        if idx > 0 {
            output.push_str(", ");
        }
        write_expr(output, &arg.value);
    }
    output.push(')');
}

fn write_expr(output: &mut String, expr: &Expr) {
    match expr {
        Expr::Literal(json) => write_literal(output, json),
        Expr::New(call) => write_call(output, call),
        Expr::Array(items) => {
            output.push_str("vec![");
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    output.push_str(", ");
                }
                write_expr(output, item);
            }
            output.push(']');
        }
    }
}

fn write_literal(output: &mut String, json: &JsonValue) {
    match json {
        JsonValue::Null => output.push_str("None"),
        JsonValue::Bool(b) => {
            let _ = write!(output, "{}", b);
        }
        JsonValue::Number(n) => {
            let _ = write!(output, "{}", n);
        }
        JsonValue::String(s) => {
            let _ = write!(output, "{:?}", s);
        }
        JsonValue::Array(items) => {
            output.push_str("vec![");
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    output.push_str(", ");
                }
                write_literal(output, item);
            }
            output.push(']');
        }
        JsonValue::Object(_) => {
            let _ = write!(output, "serde_json::json!({})", json);
        }
    }
}
