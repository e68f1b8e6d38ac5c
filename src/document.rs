//! Checked traversal over raw JSON documents.
//!
//! Every accessor returns a [`ShapeError`] instead of panicking so extractors can treat an
//! unexpected shape as "skip this entry" in ordinary control flow.

use serde_json::Value;
use thiserror::Error;

use crate::value::Cell;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("missing key at {at}")]
    MissingKey { at: String },

    #[error("expected {expected} at {at}, found {found}")]
    WrongType {
        at: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("empty list at {at}")]
    EmptyList { at: String },
}

#[derive(Debug, Clone)]
pub struct Node<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> Node<'a> {
    pub fn root(value: &'a Value) -> Self {
        Self {
            value,
            path: "$".to_string(),
        }
    }

    /// Required key; an explicit `null` still counts as present.
    pub fn get(&self, key: &str) -> Result<Node<'a>, ShapeError> {
        let object = self.value.as_object().ok_or_else(|| self.wrong_type("object"))?;
        let path = format!("{}.{}", self.path, key);
        match object.get(key) {
            Some(value) => Ok(Node { value, path }),
            None => Err(ShapeError::MissingKey { at: path }),
        }
    }

    /// Optional key; absent and `null` both yield `None`.
    pub fn get_opt(&self, key: &str) -> Result<Option<Node<'a>>, ShapeError> {
        let object = self.value.as_object().ok_or_else(|| self.wrong_type("object"))?;
        Ok(object
            .get(key)
            .filter(|value| !value.is_null())
            .map(|value| Node {
                value,
                path: format!("{}.{}", self.path, key),
            }))
    }

    pub fn first(&self) -> Result<Node<'a>, ShapeError> {
        let items = self.value.as_array().ok_or_else(|| self.wrong_type("array"))?;
        items
            .first()
            .map(|value| Node {
                value,
                path: format!("{}[0]", self.path),
            })
            .ok_or_else(|| ShapeError::EmptyList {
                at: self.path.clone(),
            })
    }

    pub fn items(&self) -> Result<Vec<Node<'a>>, ShapeError> {
        let items = self.value.as_array().ok_or_else(|| self.wrong_type("array"))?;
        Ok(items
            .iter()
            .enumerate()
            .map(|(index, value)| Node {
                value,
                path: format!("{}[{index}]", self.path),
            })
            .collect())
    }

    pub fn entries(&self) -> Result<Vec<(&'a str, Node<'a>)>, ShapeError> {
        let object = self.value.as_object().ok_or_else(|| self.wrong_type("object"))?;
        Ok(object
            .iter()
            .map(|(key, value)| {
                (
                    key.as_str(),
                    Node {
                        value,
                        path: format!("{}.{}", self.path, key),
                    },
                )
            })
            .collect())
    }

    pub fn as_str(&self) -> Result<&'a str, ShapeError> {
        self.value.as_str().ok_or_else(|| self.wrong_type("string"))
    }

    /// Text cell from a string or a bare integer (pincodes arrive both ways).
    pub fn text_cell(&self) -> Result<Cell, ShapeError> {
        match self.value {
            Value::String(raw) => Ok(Cell::Text(raw.clone())),
            Value::Number(number) if number.is_i64() || number.is_u64() => {
                Ok(Cell::Text(number.to_string()))
            }
            _ => Err(self.wrong_type("string")),
        }
    }

    /// Integer cell: JSON integers, integral floats and numeric strings; `null` maps to NULL.
    pub fn integer_cell(&self) -> Result<Cell, ShapeError> {
        match self.value {
            Value::Null => Ok(Cell::Null),
            Value::Number(number) => {
                if let Some(value) = number.as_i64() {
                    return Ok(Cell::Int(value));
                }
                match number.as_f64() {
                    Some(value) if is_integral(value) => Ok(Cell::Int(value as i64)),
                    _ => Err(self.wrong_type("integer")),
                }
            }
            Value::String(raw) => parse_integer(raw.trim())
                .map(Cell::Int)
                .ok_or_else(|| self.wrong_type("integer")),
            _ => Err(self.wrong_type("integer")),
        }
    }

    /// Real cell: any JSON number or numeric string; `null` maps to NULL.
    pub fn real_cell(&self) -> Result<Cell, ShapeError> {
        match self.value {
            Value::Null => Ok(Cell::Null),
            Value::Number(number) => number
                .as_f64()
                .map(Cell::Real)
                .ok_or_else(|| self.wrong_type("number")),
            Value::String(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(Cell::Real)
                .ok_or_else(|| self.wrong_type("number")),
            _ => Err(self.wrong_type("number")),
        }
    }

    fn wrong_type(&self, expected: &'static str) -> ShapeError {
        ShapeError::WrongType {
            at: self.path.clone(),
            expected,
            found: kind_of(self.value),
        }
    }
}

fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64
}

fn parse_integer(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|value| is_integral(*value))
            .map(|value| value as i64)
    })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_key_reports_full_path() {
        let doc = json!({"data": {"transactionData": []}});
        let root = Node::root(&doc);
        let err = root
            .get("data")
            .and_then(|data| data.get("hoverData"))
            .unwrap_err();
        assert_eq!(
            err,
            ShapeError::MissingKey {
                at: "$.data.hoverData".to_string()
            }
        );
    }

    #[test]
    fn first_on_empty_list_is_a_shape_error() {
        let doc = json!({"metric": []});
        let metric = Node::root(&doc).get("metric").unwrap();
        assert!(matches!(metric.first(), Err(ShapeError::EmptyList { .. })));
    }

    #[test]
    fn integer_cell_coerces_integral_values() {
        let doc = json!({"a": 500, "b": 500.0, "c": "42", "d": null, "e": 1.5, "f": true});
        let root = Node::root(&doc);
        assert_eq!(root.get("a").unwrap().integer_cell(), Ok(Cell::Int(500)));
        assert_eq!(root.get("b").unwrap().integer_cell(), Ok(Cell::Int(500)));
        assert_eq!(root.get("c").unwrap().integer_cell(), Ok(Cell::Int(42)));
        assert_eq!(root.get("d").unwrap().integer_cell(), Ok(Cell::Null));
        assert!(root.get("e").unwrap().integer_cell().is_err());
        assert!(root.get("f").unwrap().integer_cell().is_err());
    }

    #[test]
    fn get_opt_treats_null_as_absent() {
        let doc = json!({"usersByDevice": null});
        let root = Node::root(&doc);
        assert!(root.get_opt("usersByDevice").unwrap().is_none());
        assert!(root.get_opt("missing").unwrap().is_none());
    }
}
