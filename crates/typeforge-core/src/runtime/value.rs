use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::DispatchError;
use crate::runtime::instance::InstanceRef;
use crate::types::descriptor::TypeRef;
use crate::types::dispatch::CallContext;

/// A behavior body. Receives the per-invocation call context (receiver plus
/// the chain level that defines this body) and the caller's arguments,
/// forwarded unchanged.
pub type MethodFn = Rc<dyn Fn(&CallContext, &[Value]) -> Result<Value, DispatchError>>;

/// Dynamic value. Behaviors registered on a type are `Method` entries; every
/// other variant is plain data that instances and types can carry in their
/// tables and fields.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Float(f64),
    Str(String),
    List(Rc<RefCell<Vec<Value>>>),
    Method(MethodFn),
    Instance(InstanceRef),
    Type(TypeRef),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&InstanceRef> {
        match self {
            Value::Instance(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&TypeRef> {
        match self {
            Value::Type(t) => Some(t),
            _ => None,
        }
    }
}

// ─── Conversions ──────────────────────────────────────────────────────────────

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Bool(b) }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self { Value::Float(x) }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::Str(s.to_string()) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Value::Str(s) }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self { Value::List(Rc::new(RefCell::new(items))) }
}

impl From<InstanceRef> for Value {
    fn from(i: InstanceRef) -> Self { Value::Instance(i) }
}

impl From<TypeRef> for Value {
    fn from(t: TypeRef) -> Self { Value::Type(t) }
}

// ─── Formatting ───────────────────────────────────────────────────────────────

pub fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null        => "null",
        Value::Bool(_)     => "bool",
        Value::Float(_)    => "float",
        Value::Str(_)      => "string",
        Value::List(_)     => "list",
        Value::Method(_)   => "method",
        Value::Instance(_) => "instance",
        Value::Type(_)     => "type",
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null        => write!(f, "Null"),
            Value::Bool(b)     => write!(f, "Bool({b})"),
            Value::Float(x)    => write!(f, "Float({x})"),
            Value::Str(s)      => write!(f, "Str({s:?})"),
            Value::List(items) => write!(f, "List({:?})", items.borrow()),
            Value::Method(_)   => write!(f, "Method(<fn>)"),
            Value::Instance(i) => write!(f, "Instance(of {:?})", i.ty()),
            Value::Type(t)     => write!(f, "{t:?}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null     => write!(f, "null"),
            Value::Bool(b)  => write!(f, "{b}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s)   => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Method(_)   => write!(f, "<method>"),
            Value::Instance(i) => write!(f, "<instance of type#{}>", i.ty().id().0),
            Value::Type(t)     => write!(f, "<type#{}>", t.id().0),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_pick_the_right_variant() {
        assert!(matches!(Value::from(true), Value::Bool(true)));
        assert!(matches!(Value::from(1.5), Value::Float(_)));
        assert!(matches!(Value::from("hi"), Value::Str(_)));
        assert!(matches!(Value::from(vec![Value::Null]), Value::List(_)));
    }

    #[test]
    fn accessors() {
        assert_eq!(Value::Float(2.0).as_float(), Some(2.0));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Str("x".into()).as_str(), Some("x"));
        assert_eq!(Value::Null.as_float(), None);
        assert!(Value::Null.is_null());
    }

    #[test]
    fn type_names() {
        assert_eq!(value_type_name(&Value::Null), "null");
        assert_eq!(value_type_name(&Value::Float(0.0)), "float");
        assert_eq!(value_type_name(&Value::from("s")), "string");
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Value::Float(3.5)), "3.5");
        assert_eq!(format!("{}", Value::Null), "null");
        assert_eq!(format!("{}", Value::from(vec![Value::Float(1.0), Value::Bool(false)])), "[1, false]");
    }
}
