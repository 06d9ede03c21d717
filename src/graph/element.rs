//! Vertex and edge records as returned by the graph store.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::error::{RecipebotError, Result};
use crate::gremlin::protocol::{scalar_to_string, untyped_ref};

/// Property name -> single string value.
pub type PropertyMap = BTreeMap<String, String>;

/// A graph vertex with flattened properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vertex {
    pub id: String,
    pub label: String,
    pub properties: PropertyMap,
}

impl Vertex {
    /// Parse a vertex result item.
    ///
    /// Vertex properties arrive multi-valued (`name: [{id, value}]`); the
    /// first value wins.
    pub fn from_value(value: &Value) -> Result<Self> {
        let obj = untyped_ref(value)
            .as_object()
            .ok_or_else(|| RecipebotError::Parse(format!("Expected vertex object, got {}", value)))?;

        let id = obj
            .get("id")
            .and_then(scalar_to_string)
            .ok_or_else(|| RecipebotError::Parse("Vertex without id".to_string()))?;
        let label = obj
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut properties = PropertyMap::new();
        if let Some(props) = obj.get("properties").and_then(Value::as_object) {
            for (key, raw) in props {
                if let Some(value) = first_property_value(raw) {
                    properties.insert(key.clone(), value);
                }
            }
        }

        Ok(Self {
            id,
            label,
            properties,
        })
    }

    /// First value of a property, or `None` when absent.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// The human-readable key; `None` when missing or blank.
    pub fn name(&self) -> Option<&str> {
        self.property("name").filter(|n| !n.trim().is_empty())
    }
}

fn first_property_value(raw: &Value) -> Option<String> {
    match untyped_ref(raw) {
        Value::Array(values) => values.first().and_then(property_record_value),
        other => property_record_value(other),
    }
}

fn property_record_value(record: &Value) -> Option<String> {
    match untyped_ref(record) {
        Value::Object(map) => map.get("value").and_then(scalar_to_string),
        scalar => scalar_to_string(scalar),
    }
}

/// A directed, labeled edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub id: String,
    pub label: String,
    /// Source ("out") vertex id.
    pub from_id: String,
    /// Target ("in") vertex id.
    pub to_id: String,
    pub properties: PropertyMap,
}

impl Edge {
    pub fn from_value(value: &Value) -> Result<Self> {
        let obj = untyped_ref(value)
            .as_object()
            .ok_or_else(|| RecipebotError::Parse(format!("Expected edge object, got {}", value)))?;

        let field = |key: &str| obj.get(key).and_then(scalar_to_string).unwrap_or_default();

        let mut properties = PropertyMap::new();
        if let Some(props) = obj.get("properties").and_then(Value::as_object) {
            for (key, raw) in props {
                if let Some(value) = property_record_value(raw) {
                    properties.insert(key.clone(), value);
                }
            }
        }

        let id = field("id");
        if id.is_empty() {
            return Err(RecipebotError::Parse("Edge without id".to_string()));
        }

        Ok(Self {
            id,
            label: field("label"),
            from_id: field("outV"),
            to_id: field("inV"),
            properties,
        })
    }
}

/// Hop direction for neighbor traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Out,
    In,
    Both,
}

impl FromStr for Direction {
    type Err = RecipebotError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "out" => Ok(Direction::Out),
            "in" => Ok(Direction::In),
            "both" => Ok(Direction::Both),
            other => Err(RecipebotError::InvalidDirection(other.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Out => "out",
            Direction::In => "in",
            Direction::Both => "both",
        })
    }
}
