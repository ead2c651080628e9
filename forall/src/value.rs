//! Materialized parameter values and declared parameter types.

use std::fmt;

/// A generated value, erased to a small closed set of shapes.
///
/// Equality and hashing are structural, so tuples of values can key the
/// falsification cache during shrinking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "persistence", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Char(char),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(elements) | Value::Tuple(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Char(c) => write!(f, "'{}'", c),
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::List(elements) => write_sequence(f, elements, "[", "]"),
            Value::Tuple(elements) => write_sequence(f, elements, "(", ")"),
        }
    }
}

fn write_sequence(
    f: &mut fmt::Formatter<'_>,
    elements: &[Value],
    open: &str,
    close: &str,
) -> fmt::Result {
    write!(f, "{}", open)?;
    for (i, element) in elements.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", element)?;
    }
    write!(f, "{}", close)
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(elements: Vec<T>) -> Self {
        Value::List(elements.into_iter().map(Into::into).collect())
    }
}

/// The declared type of a parameter slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParameterType {
    Bool,
    Int,
    Char,
    Str,
    List(Box<ParameterType>),
    Tuple(Vec<ParameterType>),
    /// Accepts every value
    Any,
}

impl ParameterType {
    /// Primitive slots cannot hold `Value::Null`
    pub fn is_primitive(&self) -> bool {
        matches!(self, ParameterType::Bool | ParameterType::Int | ParameterType::Char)
    }

    /// Whether `value` can be assigned to a slot of this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ParameterType::Any, _) => true,
            (slot, Value::Null) => !slot.is_primitive(),
            (ParameterType::Bool, Value::Bool(_)) => true,
            (ParameterType::Int, Value::Int(_)) => true,
            (ParameterType::Char, Value::Char(_)) => true,
            (ParameterType::Str, Value::Str(_)) => true,
            (ParameterType::List(element), Value::List(elements)) => {
                elements.iter().all(|e| element.accepts(e))
            }
            (ParameterType::Tuple(slots), Value::Tuple(elements)) => {
                slots.len() == elements.len()
                    && slots.iter().zip(elements).all(|(s, e)| s.accepts(e))
            }
            _ => false,
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterType::Bool => write!(f, "bool"),
            ParameterType::Int => write!(f, "int"),
            ParameterType::Char => write!(f, "char"),
            ParameterType::Str => write!(f, "String"),
            ParameterType::List(element) => write!(f, "List<{}>", element),
            ParameterType::Tuple(slots) => {
                write!(f, "(")?;
                for (i, slot) in slots.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", slot)?;
                }
                write!(f, ")")
            }
            ParameterType::Any => write!(f, "Any"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_only_fits_non_primitive_slots() {
        assert!(!ParameterType::Int.accepts(&Value::Null));
        assert!(!ParameterType::Bool.accepts(&Value::Null));
        assert!(ParameterType::Str.accepts(&Value::Null));
        assert!(ParameterType::List(Box::new(ParameterType::Int)).accepts(&Value::Null));
    }

    #[test]
    fn test_nested_assignability() {
        let list_of_ints = ParameterType::List(Box::new(ParameterType::Int));
        assert!(list_of_ints.accepts(&Value::from(vec![1, 2, 3])));
        assert!(!list_of_ints.accepts(&Value::from(vec!["a"])));

        let pair = ParameterType::Tuple(vec![ParameterType::Str, ParameterType::Int]);
        assert!(pair.accepts(&Value::Tuple(vec!["a".into(), 1.into()])));
        assert!(!pair.accepts(&Value::Tuple(vec!["a".into()])));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(vec![1, 2]).to_string(), "[1, 2]");
        assert_eq!(Value::Tuple(vec!["a".into(), 1.into()]).to_string(), "(\"a\", 1)");
        assert_eq!(
            ParameterType::List(Box::new(ParameterType::Int)).to_string(),
            "List<int>"
        );
    }
}
