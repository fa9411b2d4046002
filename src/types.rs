use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive leaf value carried by metahandler-governed slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
    Bool(bool),
}

impl Value {
    /// Numeric view: integers widen, booleans map to 0/1, strings have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            // Debug keeps a '.' or an exponent so the literal re-parses as a float.
            Value::Float(x) => write!(f, "{:?}", x),
            Value::String(s) => {
                let quoted = serde_json::to_string(s).map_err(|_| fmt::Error)?;
                f.write_str(&quoted)
            }
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Raw fitness as returned by a problem: one scalar or one value per objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Fitness {
    Single(f64),
    Multi(Vec<f64>),
}

impl Fitness {
    pub fn values(&self) -> &[f64] {
        match self {
            Fitness::Single(v) => std::slice::from_ref(v),
            Fitness::Multi(vs) => vs,
        }
    }

    pub fn as_single(&self) -> Option<f64> {
        match self {
            Fitness::Single(v) => Some(*v),
            Fitness::Multi(_) => None,
        }
    }

    pub fn number_of_objectives(&self) -> usize {
        self.values().len()
    }
}

impl fmt::Display for Fitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fitness::Single(v) => write!(f, "{}", v),
            Fitness::Multi(vs) => {
                f.write_str("[")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_display_keeps_decimal_point() {
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(-0.5).to_string(), "-0.5");
        assert_eq!(Value::Integer(2).to_string(), "2");
    }

    #[test]
    fn test_string_display_is_quoted() {
        assert_eq!(Value::String("a\"b".to_string()).to_string(), "\"a\\\"b\"");
    }

    #[test]
    fn test_fitness_values_view() {
        assert_eq!(Fitness::Single(1.5).values(), &[1.5]);
        assert_eq!(Fitness::Multi(vec![1.0, 2.0]).to_string(), "[1, 2]");
        assert_eq!(Fitness::Multi(vec![1.0, 2.0]).as_single(), None);
    }
}
