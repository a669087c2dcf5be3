//! # Layout Compiler
//!
//! Compiles a logical [`Schema`] within its [`Namespace`] into a physical
//! [`Layout`]. Compilation is deterministic: the same inputs always produce
//! identical offsets, bits and tokens.
//!
//! ## Storage Classification
//!
//! | Declared | Property kind | Result |
//! |----------|---------------|--------|
//! | `fixed` | fixed-size primitive, or utf8/binary with `length` | fixed column |
//! | `variable` | utf8, binary, varint, varuint | variable column |
//! | `sparse` (default) | anything | sparse column |
//! | any non-sparse | scope kind, or nested property | error |
//!
//! ## Logical to Physical Types
//!
//! | Logical | Physical |
//! |---------|----------|
//! | primitive | same-named `LayoutType` |
//! | `object` | `Object`; nested properties become sparse child columns |
//! | `array` with items | `TypedArray<T>`, `T` wrapped in `Nullable` when the item is a nullable primitive |
//! | `array` without items, or items `any` | `Array` |
//! | `set` | `TypedSet<T>` |
//! | `map` | `TypedMap<K, V>` |
//! | `tuple` | `TypedTuple<T1..Tn>` |
//! | `tagged` with 1 or 2 items | `Tagged<UInt8, T>` / `Tagged2<UInt8, T1, T2>` |
//! | `schema` | `Udt(id)`, resolved by name, or by name and id |

use eyre::{bail, ensure, eyre, Result, WrapErr};
use hashbrown::HashSet;
use tracing::debug;

use crate::config::MAX_TUPLE_ARITY;
use crate::layouts::builder::LayoutBuilder;
use crate::layouts::layout::Layout;
use crate::layouts::layout_type::{LayoutType, TypeArgument};
use crate::schema::{Namespace, Property, PropertyType, Schema, SchemaId, StorageKind, TypeKind};

pub struct LayoutCompiler;

impl LayoutCompiler {
    pub fn compile(namespace: &Namespace, schema: &Schema) -> Result<Layout> {
        validate_namespace(namespace)?;
        ensure!(
            namespace
                .schema_by_id(schema.id)
                .is_some_and(|s| s.name == schema.name),
            "schema '{}' ({}) is not a member of namespace '{}'",
            schema.name,
            schema.id,
            namespace.name
        );

        let mut builder = LayoutBuilder::new(schema.name.clone(), schema.id);
        builder.allow_unschematized(!schema.options.disallow_unschematized);

        let mut compiler = ScopeCompiler {
            namespace,
            builder: &mut builder,
        };
        compiler
            .add_properties(&schema.properties, false)
            .wrap_err_with(|| format!("failed to compile schema '{}' ({})", schema.name, schema.id))?;

        let layout = builder.build()?;
        debug!(
            schema = %schema.name,
            schema_id = %schema.id,
            columns = layout.columns().len(),
            "compiled layout"
        );
        Ok(layout)
    }
}

fn validate_namespace(namespace: &Namespace) -> Result<()> {
    let mut ids = HashSet::with_capacity(namespace.schemas.len());
    for schema in &namespace.schemas {
        ensure!(
            schema.id.is_valid(),
            "schema '{}' has invalid id {}",
            schema.name,
            schema.id
        );
        ensure!(
            is_identifier(&schema.name),
            "schema name '{}' is not a valid identifier",
            schema.name
        );
        ensure!(
            ids.insert(schema.id),
            "duplicate schema id {} in namespace '{}'",
            schema.id,
            namespace.name
        );
    }
    Ok(())
}

/// `[A-Za-z_$][A-Za-z0-9_$]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

struct ScopeCompiler<'a> {
    namespace: &'a Namespace,
    builder: &'a mut LayoutBuilder,
}

impl ScopeCompiler<'_> {
    fn add_properties(&mut self, properties: &[Property], nested: bool) -> Result<()> {
        check_paths(properties)?;
        for property in properties {
            self.add_property(property, nested)
                .wrap_err_with(|| format!("in property '{}'", property.path))?;
        }
        Ok(())
    }

    fn add_property(&mut self, property: &Property, nested: bool) -> Result<()> {
        let ty = &property.property_type;
        let path = property.path.as_str();

        if nested && ty.storage != StorageKind::Sparse {
            bail!(
                "nested property '{}' declares {} storage; only sparse is allowed",
                path,
                ty.storage.name()
            );
        }

        if ty.kind == TypeKind::Object {
            self.builder.add_object_scope(path, TypeArgument::object())?;
            self.add_properties(&ty.properties, true)?;
            return self.builder.end_object_scope();
        }

        match ty.storage {
            StorageKind::Fixed => {
                let layout_type = primitive_type(ty.kind)
                    .ok_or_else(|| eyre!("type {:?} cannot use fixed storage", ty.kind))?;
                self.builder
                    .add_fixed_column(path, layout_type, ty.nullable, ty.length as usize)
            }
            StorageKind::Variable => {
                let layout_type = primitive_type(ty.kind)
                    .ok_or_else(|| eyre!("type {:?} cannot use variable storage", ty.kind))?;
                self.builder.add_variable_column(path, layout_type)
            }
            StorageKind::Sparse => {
                let type_arg = physical_type(self.namespace, ty)?;
                self.builder.add_sparse_column(path, type_arg)
            }
        }
    }
}

fn check_paths(properties: &[Property]) -> Result<()> {
    let mut seen = HashSet::with_capacity(properties.len());
    for property in properties {
        ensure!(
            is_identifier(&property.path),
            "property path '{}' is not a valid identifier",
            property.path
        );
        ensure!(
            seen.insert(property.path.as_str()),
            "duplicate property path '{}'",
            property.path
        );
    }
    Ok(())
}

fn primitive_type(kind: TypeKind) -> Option<LayoutType> {
    let ty = match kind {
        TypeKind::Null => LayoutType::Null,
        TypeKind::Boolean => LayoutType::Boolean,
        TypeKind::Int8 => LayoutType::Int8,
        TypeKind::Int16 => LayoutType::Int16,
        TypeKind::Int32 => LayoutType::Int32,
        TypeKind::Int64 => LayoutType::Int64,
        TypeKind::UInt8 => LayoutType::UInt8,
        TypeKind::UInt16 => LayoutType::UInt16,
        TypeKind::UInt32 => LayoutType::UInt32,
        TypeKind::UInt64 => LayoutType::UInt64,
        TypeKind::VarInt => LayoutType::VarInt,
        TypeKind::VarUInt => LayoutType::VarUInt,
        TypeKind::Float32 => LayoutType::Float32,
        TypeKind::Float64 => LayoutType::Float64,
        TypeKind::Float128 => LayoutType::Float128,
        TypeKind::Decimal => LayoutType::Decimal,
        TypeKind::DateTime => LayoutType::DateTime,
        TypeKind::UnixDateTime => LayoutType::UnixDateTime,
        TypeKind::Guid => LayoutType::Guid,
        TypeKind::MongoDbObjectId => LayoutType::MongoDbObjectId,
        TypeKind::Utf8 => LayoutType::Utf8,
        TypeKind::Binary => LayoutType::Binary,
        _ => return None,
    };
    Some(ty)
}

/// Maps a logical property type (at any nesting depth) to its sparse physical type.
fn physical_type(namespace: &Namespace, ty: &PropertyType) -> Result<TypeArgument> {
    if let Some(layout_type) = primitive_type(ty.kind) {
        return Ok(TypeArgument::new(layout_type));
    }

    let arg = match ty.kind {
        TypeKind::Object => {
            check_paths(&ty.properties)?;
            TypeArgument::object()
        }
        TypeKind::Array => match ty.item_types() {
            [] => TypeArgument::array(),
            [item] if item.kind == TypeKind::Any => TypeArgument::array(),
            [item] => TypeArgument::typed_array(item_type(namespace, item)?),
            items => bail!("array declares {} item types; expected one", items.len()),
        },
        TypeKind::Set => match ty.item_types() {
            [item] if item.kind != TypeKind::Any => TypeArgument::typed_set(item_type(namespace, item)?),
            _ => bail!("set requires exactly one concrete item type"),
        },
        TypeKind::Map => {
            let keys = ty
                .keys
                .as_deref()
                .ok_or_else(|| eyre!("map requires a key type"))?;
            let values = ty
                .values
                .as_deref()
                .ok_or_else(|| eyre!("map requires a value type"))?;
            ensure!(
                keys.kind != TypeKind::Any && values.kind != TypeKind::Any,
                "map key and value types must be concrete"
            );
            TypeArgument::typed_map(item_type(namespace, keys)?, item_type(namespace, values)?)
        }
        TypeKind::Tuple => {
            let items = ty.item_types();
            ensure!(
                !items.is_empty() && items.len() <= MAX_TUPLE_ARITY,
                "tuple requires 1..={} item types, got {}",
                MAX_TUPLE_ARITY,
                items.len()
            );
            let args = items
                .iter()
                .map(|item| item_type(namespace, item))
                .collect::<Result<Vec<_>>>()?;
            TypeArgument::typed_tuple(args)
        }
        TypeKind::Tagged => match ty.item_types() {
            [item] => TypeArgument::tagged(item_type(namespace, item)?),
            [first, second] => {
                TypeArgument::tagged2(item_type(namespace, first)?, item_type(namespace, second)?)
            }
            items => bail!("tagged requires 1 or 2 item types, got {}", items.len()),
        },
        TypeKind::Schema => TypeArgument::udt(resolve_udt(namespace, ty)?),
        TypeKind::Any => bail!("type 'any' is only permitted as array items"),
        _ => bail!("unsupported type {:?}", ty.kind),
    };
    Ok(arg)
}

/// Element type inside a collection: nullable primitives are wrapped in `Nullable`.
fn item_type(namespace: &Namespace, item: &PropertyType) -> Result<TypeArgument> {
    ensure!(
        item.storage == StorageKind::Sparse,
        "collection items cannot declare {} storage",
        item.storage.name()
    );
    ensure!(item.kind != TypeKind::Null, "collection items cannot be of type null");
    let arg = physical_type(namespace, item)?;
    if item.nullable && item.kind.is_primitive() {
        Ok(TypeArgument::nullable(arg))
    } else {
        Ok(arg)
    }
}

fn resolve_udt(namespace: &Namespace, ty: &PropertyType) -> Result<SchemaId> {
    let name = ty
        .name
        .as_deref()
        .ok_or_else(|| eyre!("schema reference requires a name"))?;

    if let Some(id) = ty.id {
        return namespace
            .schemas_named(name)
            .find(|s| s.id == id)
            .map(|s| s.id)
            .ok_or_else(|| eyre!("dangling schema reference '{}' ({})", name, id));
    }

    let mut candidates = namespace.schemas_named(name);
    match (candidates.next(), candidates.next()) {
        (Some(schema), None) => Ok(schema.id),
        (None, _) => bail!("dangling schema reference '{}'", name),
        (Some(_), Some(_)) => bail!(
            "ambiguous schema reference '{}': multiple schemas share the name, specify an id",
            name
        ),
    }
}
