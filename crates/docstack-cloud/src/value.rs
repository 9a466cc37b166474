//! Property values
//!
//! A property is either known when the template is built ([`Expr::Literal`])
//! or only known once the provisioning engine has created some resource
//! ([`Deferred`], [`Expr::Ref`], [`Expr::Pseudo`]). Keeping the two apart in
//! the type system means a deferred value can never be read as a string.
//! Neither type implements `Serialize`; they enter JSON only through
//! `to_json`, which emits the engine intrinsics.

use serde_json::{Value, json};

/// A resource attribute that is resolved after provisioning
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Deferred {
    resource: String,
    attribute: String,
}

impl Deferred {
    pub fn new(resource: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            attribute: attribute.into(),
        }
    }

    /// Logical id of the resource that produces the value
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn to_json(&self) -> Value {
        json!({ "Fn::GetAtt": [self.resource, self.attribute] })
    }
}

impl std::fmt::Display for Deferred {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.resource, self.attribute)
    }
}

/// Engine-provided values that are fixed per deployment target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pseudo {
    Region,
    AccountId,
    Partition,
}

impl Pseudo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pseudo::Region => "AWS::Region",
            Pseudo::AccountId => "AWS::AccountId",
            Pseudo::Partition => "AWS::Partition",
        }
    }
}

/// A string-valued expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Known at build time
    Literal(String),
    /// The primary identifier of a declared resource
    Ref(String),
    /// A deployment pseudo parameter
    Pseudo(Pseudo),
    /// A resource attribute resolved after provisioning
    Attr(Deferred),
    /// Concatenation of the parts
    Join(Vec<Expr>),
}

impl Expr {
    pub fn literal(value: impl Into<String>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn reference(logical_id: impl Into<String>) -> Self {
        Expr::Ref(logical_id.into())
    }

    pub fn attr(resource: impl Into<String>, attribute: impl Into<String>) -> Self {
        Expr::Attr(Deferred::new(resource, attribute))
    }

    pub fn join(parts: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Join(parts.into_iter().collect())
    }

    /// Returns the literal text if the whole expression is known at build time
    pub fn as_literal(&self) -> Option<String> {
        match self {
            Expr::Literal(s) => Some(s.clone()),
            Expr::Join(parts) => parts
                .iter()
                .map(Expr::as_literal)
                .collect::<Option<Vec<_>>>()
                .map(|p| p.concat()),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        self.as_literal().is_some()
    }

    /// Logical ids of declared resources this expression reads from
    pub fn resources(&self) -> Vec<&str> {
        match self {
            Expr::Literal(_) | Expr::Pseudo(_) => Vec::new(),
            Expr::Ref(id) => vec![id.as_str()],
            Expr::Attr(d) => vec![d.resource()],
            Expr::Join(parts) => parts.iter().flat_map(Expr::resources).collect(),
        }
    }

    /// Renders the expression as an engine intrinsic
    pub fn to_json(&self) -> Value {
        if let Some(text) = self.as_literal() {
            return Value::String(text);
        }
        match self {
            Expr::Literal(s) => Value::String(s.clone()),
            Expr::Ref(id) => json!({ "Ref": id }),
            Expr::Pseudo(p) => json!({ "Ref": p.as_str() }),
            Expr::Attr(d) => d.to_json(),
            Expr::Join(parts) => {
                // Adjacent literals are merged so the rendered join stays short
                let mut merged: Vec<Value> = Vec::new();
                let mut pending = String::new();
                for part in parts {
                    match part.as_literal() {
                        Some(text) => pending.push_str(&text),
                        None => {
                            if !pending.is_empty() {
                                merged.push(Value::String(std::mem::take(&mut pending)));
                            }
                            merged.push(part.to_json());
                        }
                    }
                }
                if !pending.is_empty() {
                    merged.push(Value::String(pending));
                }
                json!({ "Fn::Join": ["", merged] })
            }
        }
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Expr::Literal(value.to_string())
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Expr::Literal(value)
    }
}

impl From<Deferred> for Expr {
    fn from(value: Deferred) -> Self {
        Expr::Attr(value)
    }
}

impl From<Pseudo> for Expr {
    fn from(value: Pseudo) -> Self {
        Expr::Pseudo(value)
    }
}

impl From<Expr> for Value {
    fn from(value: Expr) -> Self {
        value.to_json()
    }
}
