use crate::artifacts::kind::{ArtifactKind, AttributeType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    Integer(i64),
}

impl AttributeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            AttributeValue::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(v) => Some(*v),
            AttributeValue::Text(_) => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(s) => f.write_str(s),
            AttributeValue::Integer(v) => write!(f, "{}", v),
        }
    }
}

/// The (attribute type, source module, value) triple handed to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub attribute_type: AttributeType,
    pub source_module: String,
    pub value: AttributeValue,
}

/// One normalized row of extracted evidence.
///
/// Fields keep the order of the query's columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub kind: ArtifactKind,
    pub fields: Vec<(AttributeType, AttributeValue)>,
}

impl ArtifactRecord {
    pub fn new(kind: ArtifactKind) -> Self {
        Self {
            kind,
            fields: Vec::new(),
        }
    }

    pub fn push(&mut self, attribute: AttributeType, value: AttributeValue) {
        self.fields.push((attribute, value));
    }

    pub fn get(&self, attribute: AttributeType) -> Option<&AttributeValue> {
        self.fields
            .iter()
            .find(|(a, _)| *a == attribute)
            .map(|(_, v)| v)
    }

    pub fn text(&self, attribute: AttributeType) -> Option<&str> {
        self.get(attribute).and_then(AttributeValue::as_text)
    }

    pub fn integer(&self, attribute: AttributeType) -> Option<i64> {
        self.get(attribute).and_then(AttributeValue::as_integer)
    }

    /// Attach the source module name to every field.
    pub fn to_attributes(&self, source_module: &str) -> Vec<Attribute> {
        self.fields
            .iter()
            .map(|(attribute_type, value)| Attribute {
                attribute_type: *attribute_type,
                source_module: source_module.to_string(),
                value: value.clone(),
            })
            .collect()
    }

    /// Rebuild a record from the attributes the sink received.
    pub fn from_attributes(kind: ArtifactKind, attributes: &[Attribute]) -> Self {
        Self {
            kind,
            fields: attributes
                .iter()
                .map(|a| (a.attribute_type, a.value.clone()))
                .collect(),
        }
    }
}
