//! # Namespaces and Schemas

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::schema::property::Property;

/// Identifier of a schema within a namespace. Written into every row header
/// and into the type arguments of UDT scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaId(pub i32);

impl SchemaId {
    pub const INVALID: SchemaId = SchemaId(0);

    pub fn id(self) -> i32 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl std::fmt::Display for SchemaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaOptions {
    /// Reject top-level sparse writes whose path is not declared in the schema.
    #[serde(default)]
    pub disallow_unschematized: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub id: SchemaId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub options: SchemaOptions,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl Schema {
    pub fn new(name: impl Into<String>, id: SchemaId) -> Self {
        Self {
            name: name.into(),
            id,
            comment: None,
            options: SchemaOptions::default(),
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_properties(mut self, properties: impl IntoIterator<Item = Property>) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn with_options(mut self, options: SchemaOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    pub name: String,
    #[serde(default)]
    pub schemas: Vec<Schema>,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schemas: Vec::new(),
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schemas.push(schema);
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).wrap_err("failed to parse namespace json")
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).wrap_err("failed to serialize namespace")
    }

    pub fn schema_by_id(&self, id: SchemaId) -> Option<&Schema> {
        self.schemas.iter().find(|s| s.id == id)
    }

    /// All schemas sharing `name`, in declaration order.
    pub fn schemas_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Schema> + 'a {
        self.schemas.iter().filter(move |s| s.name == name)
    }
}
