//! # Properties and Property Types
//!
//! `PropertyType` is a flat description: `kind` selects which of the optional
//! fields are meaningful.
//!
//! | Kind | Fields used |
//! |------|-------------|
//! | primitives | `storage`, `length`, `nullable` |
//! | `object` | `properties` |
//! | `array`, `set` | `items` (one) |
//! | `map` | `keys`, `values` |
//! | `tuple`, `tagged` | `items` (many) |
//! | `schema` | `name`, optional `id` |

use serde::{Deserialize, Serialize};

use crate::schema::namespace::SchemaId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Sparse,
    Fixed,
    Variable,
}

impl StorageKind {
    pub fn name(&self) -> &'static str {
        match self {
            StorageKind::Sparse => "sparse",
            StorageKind::Fixed => "fixed",
            StorageKind::Variable => "variable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Null,
    #[serde(rename = "bool")]
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    VarInt,
    VarUInt,
    Float32,
    Float64,
    Float128,
    Decimal,
    DateTime,
    UnixDateTime,
    Guid,
    MongoDbObjectId,
    Utf8,
    Binary,
    Object,
    Array,
    Set,
    Map,
    Tuple,
    Tagged,
    Schema,
    Any,
}

impl TypeKind {
    pub fn is_primitive(&self) -> bool {
        !matches!(
            self,
            TypeKind::Object
                | TypeKind::Array
                | TypeKind::Set
                | TypeKind::Map
                | TypeKind::Tuple
                | TypeKind::Tagged
                | TypeKind::Schema
                | TypeKind::Any
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemTypes {
    One(Box<PropertyType>),
    Many(Vec<PropertyType>),
}

impl ItemTypes {
    pub fn as_slice(&self) -> &[PropertyType] {
        match self {
            ItemTypes::One(item) => std::slice::from_ref(item.as_ref()),
            ItemTypes::Many(items) => items,
        }
    }
}

fn default_nullable() -> bool {
    true
}

fn is_sparse(storage: &StorageKind) -> bool {
    *storage == StorageKind::Sparse
}

fn is_zero(length: &u32) -> bool {
    *length == 0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyType {
    #[serde(rename = "type")]
    pub kind: TypeKind,
    #[serde(default, skip_serializing_if = "is_sparse")]
    pub storage: StorageKind,
    /// Byte length of fixed-storage utf8/binary columns.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub length: u32,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<ItemTypes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Box<PropertyType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Box<PropertyType>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SchemaId>,
}

impl PropertyType {
    fn of_kind(kind: TypeKind) -> Self {
        Self {
            kind,
            storage: StorageKind::Sparse,
            length: 0,
            nullable: true,
            items: None,
            keys: None,
            values: None,
            properties: Vec::new(),
            name: None,
            id: None,
        }
    }

    pub fn primitive(kind: TypeKind) -> Self {
        Self::of_kind(kind)
    }

    pub fn object(properties: impl IntoIterator<Item = Property>) -> Self {
        Self {
            properties: properties.into_iter().collect(),
            ..Self::of_kind(TypeKind::Object)
        }
    }

    pub fn array(items: PropertyType) -> Self {
        Self {
            items: Some(ItemTypes::One(Box::new(items))),
            ..Self::of_kind(TypeKind::Array)
        }
    }

    pub fn untyped_array() -> Self {
        Self::of_kind(TypeKind::Array)
    }

    pub fn set(items: PropertyType) -> Self {
        Self {
            items: Some(ItemTypes::One(Box::new(items))),
            ..Self::of_kind(TypeKind::Set)
        }
    }

    pub fn map(keys: PropertyType, values: PropertyType) -> Self {
        Self {
            keys: Some(Box::new(keys)),
            values: Some(Box::new(values)),
            ..Self::of_kind(TypeKind::Map)
        }
    }

    pub fn tuple(items: impl IntoIterator<Item = PropertyType>) -> Self {
        Self {
            items: Some(ItemTypes::Many(items.into_iter().collect())),
            ..Self::of_kind(TypeKind::Tuple)
        }
    }

    pub fn tagged(items: impl IntoIterator<Item = PropertyType>) -> Self {
        Self {
            items: Some(ItemTypes::Many(items.into_iter().collect())),
            ..Self::of_kind(TypeKind::Tagged)
        }
    }

    pub fn udt(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::of_kind(TypeKind::Schema)
        }
    }

    pub fn with_schema_id(mut self, id: SchemaId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_storage(mut self, storage: StorageKind) -> Self {
        self.storage = storage;
        self
    }

    pub fn fixed(self) -> Self {
        self.with_storage(StorageKind::Fixed)
    }

    pub fn variable(self) -> Self {
        self.with_storage(StorageKind::Variable)
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn not_null(self) -> Self {
        self.with_nullable(false)
    }

    pub fn item_types(&self) -> &[PropertyType] {
        self.items.as_ref().map(ItemTypes::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub path: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Property {
    pub fn new(path: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            path: path.into(),
            property_type,
            comment: None,
        }
    }
}
