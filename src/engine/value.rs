use std::fmt;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::gfx::Image;
use crate::model::{Color, Vector2};

use super::entity::EntityRef;

/// Runtime value held in locals, entity fields and event payloads.
#[derive(Debug, Clone)]
pub enum Value {
    /// Sentinel for properties declared without an initializer. Equal only to itself.
    Unset,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Vector(Vector2),
    Color(Color),
    Image(Rc<Image>),
    Entity(EntityRef),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Self::Str(Rc::from(s))
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// `false`, `0`, `""` and unset are false; everything else is true.
    pub fn truthy(&self) -> bool {
        match self {
            Self::Unset => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Str(s) => !s.is_empty(),
            Self::Vector(_) | Self::Color(_) | Self::Image(_) | Self::Entity(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Vector(_) => "Vector2",
            Self::Color(_) => "Color",
            Self::Image(_) => "image",
            Self::Entity(_) => "entity",
        }
    }

    /// Value equality; entities and images compare by identity.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Unset, Self::Unset) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Vector(a), Self::Vector(b)) => a == b,
            (Self::Color(a), Self::Color(b)) => a == b,
            (Self::Image(a), Self::Image(b)) => Rc::ptr_eq(a, b),
            (Self::Entity(a), Self::Entity(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_number(&self) -> Result<f64, RuntimeError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Unset => Err(RuntimeError::UnsetArithmetic),
            other => Err(mismatch("number", other)),
        }
    }

    pub fn as_vector(&self) -> Result<Vector2, RuntimeError> {
        match self {
            Self::Vector(v) => Ok(*v),
            other => Err(mismatch("Vector2", other)),
        }
    }

    pub fn as_color(&self) -> Result<Color, RuntimeError> {
        match self {
            Self::Color(c) => Ok(*c),
            other => Err(mismatch("Color", other)),
        }
    }

    pub fn as_str(&self) -> Result<&str, RuntimeError> {
        match self {
            Self::Str(s) => Ok(s),
            other => Err(mismatch("string", other)),
        }
    }

    pub fn as_entity(&self) -> Result<&EntityRef, RuntimeError> {
        match self {
            Self::Entity(e) => Ok(e),
            other => Err(mismatch("entity", other)),
        }
    }
}

pub(crate) fn mismatch(expected: &str, got: &Value) -> RuntimeError {
    RuntimeError::TypeMismatch(format!("expected {expected}, got {}", got.type_name()))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "unset"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Vector(v) => write!(f, "{v}"),
            Self::Color(c) => write!(f, "{c}"),
            Self::Image(img) => write!(f, "image({})", img.name),
            Self::Entity(e) => write!(f, "{}#{}", e.type_name(), e.id()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vector2> for Value {
    fn from(v: Vector2) -> Self {
        Self::Vector(v)
    }
}

impl From<Color> for Value {
    fn from(c: Color) -> Self {
        Self::Color(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Unset.truthy());
        assert!(!Value::Number(0.0).truthy());
        assert!(!Value::str("").truthy());
        assert!(!Value::Bool(false).truthy());
        assert!(Value::Number(-1.0).truthy());
        assert!(Value::str("x").truthy());
        assert!(Value::Vector(Vector2::ZERO).truthy());
    }

    #[test]
    fn unset_equals_only_itself() {
        assert!(Value::Unset.equals(&Value::Unset));
        assert!(!Value::Unset.equals(&Value::Number(0.0)));
        assert!(!Value::Unset.equals(&Value::str("")));
        assert!(!Value::Bool(false).equals(&Value::Unset));
    }

    #[test]
    fn unset_is_not_a_number() {
        assert_eq!(Value::Unset.as_number(), Err(RuntimeError::UnsetArithmetic));
        assert!(matches!(Value::str("1").as_number(), Err(RuntimeError::TypeMismatch(_))));
    }

    #[test]
    fn display() {
        assert_eq!(Value::Number(1.5).to_string(), "1.5");
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Vector(Vector2::new(1.0, 2.0)).to_string(), "Vector2(1, 2)");
    }
}
