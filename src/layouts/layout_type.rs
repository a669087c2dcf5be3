//! # Physical Layout Types
//!
//! `LayoutType` is the closed set of physical kinds a HybridRow value can
//! have. Every operation in the row engine dispatches on it with `match`; no
//! trait objects are involved.
//!
//! ## Classification
//!
//! | Predicate | Types |
//! |-----------|-------|
//! | `fixed_size()` is `Some` | null, bool, ints, floats, decimal, dates, guid, object id |
//! | `is_variable()` | utf8, binary (length-prefixed), varint, varuint (self-delimiting) |
//! | `is_keyed_scope()` | object, UDT: children carry paths |
//! | `is_typed_scope()` | typed-array, set, map, typed-tuple, tagged, tagged2, nullable: children carry no type code |
//! | `is_sized_scope()` | typed-array, set, map: `u32` element count after the type args |
//! | `is_fixed_arity()` | tuple, typed-tuple, tagged, tagged2, nullable: element count implied by type args |
//! | `is_terminated_scope()` | object, array, UDT: body ends with `EndScope` |
//!
//! ## Type Arguments
//!
//! Parameterized scopes carry a [`TypeArgumentList`]. In memory the tagged
//! scopes include their implicit `UInt8` tag as the first argument; on the
//! wire it is omitted.
//!
//! ```text
//! TypedArray<T>, TypedSet<T>, Nullable<T>   [code(T)][args(T)]
//! TypedMap<K, V>                            [code(K)][args(K)][code(V)][args(V)]
//! Tuple<..>, TypedTuple<..>                 [varuint n] n x [code][args]
//! Tagged<UInt8, T>                          [code(T)][args(T)]
//! Tagged2<UInt8, T1, T2>                    [code(T1)][args(T1)][code(T2)][args(T2)]
//! Udt(schema)                               [i32 LE schema id]
//! ```

use std::sync::Arc;

use smallvec::SmallVec;

use crate::config::{MAX_NESTING_DEPTH, MAX_TUPLE_ARITY, SCHEMA_ID_SIZE};
use crate::encoding::{decode_varuint, encode_varuint_array, varuint_len};
use crate::layouts::layout_code::LayoutCode;
use crate::row::{RowError, RowResult};
use crate::schema::SchemaId;

/// Scratch space for sparse metadata (path, code, type args).
pub type MetaBytes = SmallVec<[u8; 32]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutType {
    Null,
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
    TypedArray,
    Tuple,
    TypedTuple,
    TypedMap,
    TypedSet,
    Nullable,
    Tagged,
    Tagged2,
    Udt,
    EndScope,
}

impl LayoutType {
    /// Wire code. Booleans report `Boolean`; use [`LayoutType::bool_code`]
    /// when encoding an actual value.
    pub fn code(self) -> LayoutCode {
        match self {
            LayoutType::Null => LayoutCode::Null,
            LayoutType::Boolean => LayoutCode::Boolean,
            LayoutType::Int8 => LayoutCode::Int8,
            LayoutType::Int16 => LayoutCode::Int16,
            LayoutType::Int32 => LayoutCode::Int32,
            LayoutType::Int64 => LayoutCode::Int64,
            LayoutType::UInt8 => LayoutCode::UInt8,
            LayoutType::UInt16 => LayoutCode::UInt16,
            LayoutType::UInt32 => LayoutCode::UInt32,
            LayoutType::UInt64 => LayoutCode::UInt64,
            LayoutType::VarInt => LayoutCode::VarInt,
            LayoutType::VarUInt => LayoutCode::VarUInt,
            LayoutType::Float32 => LayoutCode::Float32,
            LayoutType::Float64 => LayoutCode::Float64,
            LayoutType::Float128 => LayoutCode::Float128,
            LayoutType::Decimal => LayoutCode::Decimal,
            LayoutType::DateTime => LayoutCode::DateTime,
            LayoutType::UnixDateTime => LayoutCode::UnixDateTime,
            LayoutType::Guid => LayoutCode::Guid,
            LayoutType::MongoDbObjectId => LayoutCode::MongoDbObjectId,
            LayoutType::Utf8 => LayoutCode::Utf8,
            LayoutType::Binary => LayoutCode::Binary,
            LayoutType::Object => LayoutCode::ObjectScope,
            LayoutType::Array => LayoutCode::ArrayScope,
            LayoutType::TypedArray => LayoutCode::TypedArrayScope,
            LayoutType::Tuple => LayoutCode::TupleScope,
            LayoutType::TypedTuple => LayoutCode::TypedTupleScope,
            LayoutType::TypedMap => LayoutCode::TypedMapScope,
            LayoutType::TypedSet => LayoutCode::TypedSetScope,
            LayoutType::Nullable => LayoutCode::NullableScope,
            LayoutType::Tagged => LayoutCode::TaggedScope,
            LayoutType::Tagged2 => LayoutCode::Tagged2Scope,
            LayoutType::Udt => LayoutCode::Schema,
            LayoutType::EndScope => LayoutCode::EndScope,
        }
    }

    pub fn bool_code(value: bool) -> LayoutCode {
        if value {
            LayoutCode::Boolean
        } else {
            LayoutCode::BooleanFalse
        }
    }

    pub fn from_code(code: LayoutCode) -> RowResult<LayoutType> {
        let ty = match code {
            LayoutCode::Invalid => return Err(RowError::InvalidRow),
            LayoutCode::Null => LayoutType::Null,
            LayoutCode::BooleanFalse | LayoutCode::Boolean => LayoutType::Boolean,
            LayoutCode::Int8 => LayoutType::Int8,
            LayoutCode::Int16 => LayoutType::Int16,
            LayoutCode::Int32 => LayoutType::Int32,
            LayoutCode::Int64 => LayoutType::Int64,
            LayoutCode::UInt8 => LayoutType::UInt8,
            LayoutCode::UInt16 => LayoutType::UInt16,
            LayoutCode::UInt32 => LayoutType::UInt32,
            LayoutCode::UInt64 => LayoutType::UInt64,
            LayoutCode::VarInt => LayoutType::VarInt,
            LayoutCode::VarUInt => LayoutType::VarUInt,
            LayoutCode::Float32 => LayoutType::Float32,
            LayoutCode::Float64 => LayoutType::Float64,
            LayoutCode::Decimal => LayoutType::Decimal,
            LayoutCode::DateTime => LayoutType::DateTime,
            LayoutCode::Guid => LayoutType::Guid,
            LayoutCode::Utf8 => LayoutType::Utf8,
            LayoutCode::Binary => LayoutType::Binary,
            LayoutCode::Float128 => LayoutType::Float128,
            LayoutCode::UnixDateTime => LayoutType::UnixDateTime,
            LayoutCode::MongoDbObjectId => LayoutType::MongoDbObjectId,
            LayoutCode::ObjectScope => LayoutType::Object,
            LayoutCode::ArrayScope => LayoutType::Array,
            LayoutCode::TypedArrayScope => LayoutType::TypedArray,
            LayoutCode::TupleScope => LayoutType::Tuple,
            LayoutCode::TypedTupleScope => LayoutType::TypedTuple,
            LayoutCode::TypedMapScope => LayoutType::TypedMap,
            LayoutCode::TypedSetScope => LayoutType::TypedSet,
            LayoutCode::NullableScope => LayoutType::Nullable,
            LayoutCode::TaggedScope => LayoutType::Tagged,
            LayoutCode::Tagged2Scope => LayoutType::Tagged2,
            LayoutCode::Schema => LayoutType::Udt,
            LayoutCode::EndScope => LayoutType::EndScope,
        };
        Ok(ty)
    }

    pub fn name(self) -> &'static str {
        match self {
            LayoutType::Null => "null",
            LayoutType::Boolean => "bool",
            LayoutType::Int8 => "int8",
            LayoutType::Int16 => "int16",
            LayoutType::Int32 => "int32",
            LayoutType::Int64 => "int64",
            LayoutType::UInt8 => "uint8",
            LayoutType::UInt16 => "uint16",
            LayoutType::UInt32 => "uint32",
            LayoutType::UInt64 => "uint64",
            LayoutType::VarInt => "varint",
            LayoutType::VarUInt => "varuint",
            LayoutType::Float32 => "float32",
            LayoutType::Float64 => "float64",
            LayoutType::Float128 => "float128",
            LayoutType::Decimal => "decimal",
            LayoutType::DateTime => "datetime",
            LayoutType::UnixDateTime => "unixdatetime",
            LayoutType::Guid => "guid",
            LayoutType::MongoDbObjectId => "mongodbobjectid",
            LayoutType::Utf8 => "utf8",
            LayoutType::Binary => "binary",
            LayoutType::Object => "object",
            LayoutType::Array => "array",
            LayoutType::TypedArray => "array_t",
            LayoutType::Tuple => "tuple",
            LayoutType::TypedTuple => "tuple_t",
            LayoutType::TypedMap => "map_t",
            LayoutType::TypedSet => "set_t",
            LayoutType::Nullable => "nullable",
            LayoutType::Tagged => "tagged",
            LayoutType::Tagged2 => "tagged2",
            LayoutType::Udt => "udt",
            LayoutType::EndScope => "end",
        }
    }

    /// Encoded width of a fixed-size value, `None` for variable types and scopes.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            LayoutType::Null => Some(0),
            LayoutType::Boolean | LayoutType::Int8 | LayoutType::UInt8 => Some(1),
            LayoutType::Int16 | LayoutType::UInt16 => Some(2),
            LayoutType::Int32 | LayoutType::UInt32 | LayoutType::Float32 => Some(4),
            LayoutType::Int64
            | LayoutType::UInt64
            | LayoutType::Float64
            | LayoutType::DateTime
            | LayoutType::UnixDateTime => Some(8),
            LayoutType::MongoDbObjectId => Some(12),
            LayoutType::Float128 | LayoutType::Decimal | LayoutType::Guid => Some(16),
            _ => None,
        }
    }

    pub fn is_fixed(self) -> bool {
        self.fixed_size().is_some()
    }

    pub fn is_varint(self) -> bool {
        matches!(self, LayoutType::VarInt | LayoutType::VarUInt)
    }

    pub fn is_length_prefixed(self) -> bool {
        matches!(self, LayoutType::Utf8 | LayoutType::Binary)
    }

    pub fn is_variable(self) -> bool {
        self.is_varint() || self.is_length_prefixed()
    }

    pub fn is_primitive(self) -> bool {
        self.is_fixed() || self.is_variable()
    }

    pub fn is_scope(self) -> bool {
        matches!(
            self,
            LayoutType::Object
                | LayoutType::Array
                | LayoutType::TypedArray
                | LayoutType::Tuple
                | LayoutType::TypedTuple
                | LayoutType::TypedMap
                | LayoutType::TypedSet
                | LayoutType::Nullable
                | LayoutType::Tagged
                | LayoutType::Tagged2
                | LayoutType::Udt
        )
    }

    pub fn is_keyed_scope(self) -> bool {
        matches!(self, LayoutType::Object | LayoutType::Udt)
    }

    pub fn is_indexed_scope(self) -> bool {
        self.is_scope() && !self.is_keyed_scope()
    }

    pub fn is_typed_scope(self) -> bool {
        matches!(
            self,
            LayoutType::TypedArray
                | LayoutType::TypedTuple
                | LayoutType::TypedMap
                | LayoutType::TypedSet
                | LayoutType::Nullable
                | LayoutType::Tagged
                | LayoutType::Tagged2
        )
    }

    pub fn is_sized_scope(self) -> bool {
        matches!(
            self,
            LayoutType::TypedArray | LayoutType::TypedMap | LayoutType::TypedSet
        )
    }

    pub fn is_fixed_arity(self) -> bool {
        matches!(
            self,
            LayoutType::Tuple
                | LayoutType::TypedTuple
                | LayoutType::Nullable
                | LayoutType::Tagged
                | LayoutType::Tagged2
        )
    }

    pub fn is_unique_scope(self) -> bool {
        matches!(self, LayoutType::TypedMap | LayoutType::TypedSet)
    }

    pub fn is_terminated_scope(self) -> bool {
        matches!(self, LayoutType::Object | LayoutType::Array | LayoutType::Udt)
    }
}

impl std::fmt::Display for LayoutType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A layout type together with its (possibly empty) type arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeArgument {
    pub layout_type: LayoutType,
    pub type_args: TypeArgumentList,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum TypeArgumentList {
    #[default]
    Empty,
    Args(Arc<[TypeArgument]>),
    Schema(SchemaId),
}

impl TypeArgument {
    pub fn new(layout_type: LayoutType) -> Self {
        Self {
            layout_type,
            type_args: TypeArgumentList::Empty,
        }
    }

    pub fn with_args(layout_type: LayoutType, args: impl Into<Vec<TypeArgument>>) -> Self {
        Self {
            layout_type,
            type_args: TypeArgumentList::from_args(args.into()),
        }
    }

    pub fn object() -> Self {
        Self::new(LayoutType::Object)
    }

    pub fn array() -> Self {
        Self::new(LayoutType::Array)
    }

    pub fn typed_array(element: TypeArgument) -> Self {
        Self::with_args(LayoutType::TypedArray, vec![element])
    }

    pub fn typed_set(element: TypeArgument) -> Self {
        Self::with_args(LayoutType::TypedSet, vec![element])
    }

    pub fn typed_map(key: TypeArgument, value: TypeArgument) -> Self {
        Self::with_args(LayoutType::TypedMap, vec![key, value])
    }

    pub fn tuple(items: impl IntoIterator<Item = TypeArgument>) -> Self {
        Self::with_args(LayoutType::Tuple, items.into_iter().collect::<Vec<_>>())
    }

    pub fn typed_tuple(items: impl IntoIterator<Item = TypeArgument>) -> Self {
        Self::with_args(LayoutType::TypedTuple, items.into_iter().collect::<Vec<_>>())
    }

    pub fn tagged(item: TypeArgument) -> Self {
        Self::with_args(
            LayoutType::Tagged,
            vec![TypeArgument::new(LayoutType::UInt8), item],
        )
    }

    pub fn tagged2(first: TypeArgument, second: TypeArgument) -> Self {
        Self::with_args(
            LayoutType::Tagged2,
            vec![TypeArgument::new(LayoutType::UInt8), first, second],
        )
    }

    pub fn nullable(inner: TypeArgument) -> Self {
        Self::with_args(LayoutType::Nullable, vec![inner])
    }

    pub fn udt(schema_id: SchemaId) -> Self {
        Self {
            layout_type: LayoutType::Udt,
            type_args: TypeArgumentList::Schema(schema_id),
        }
    }

    /// Whether the argument list has the shape the layout type requires.
    pub fn is_well_formed(&self) -> bool {
        let args = self.type_args.as_slice();
        let shape_ok = match self.layout_type {
            LayoutType::TypedArray | LayoutType::TypedSet | LayoutType::Nullable => args.len() == 1,
            LayoutType::TypedMap => args.len() == 2,
            LayoutType::Tuple | LayoutType::TypedTuple => {
                !args.is_empty() && args.len() <= MAX_TUPLE_ARITY
            }
            LayoutType::Tagged => args.len() == 2 && args[0].layout_type == LayoutType::UInt8,
            LayoutType::Tagged2 => args.len() == 3 && args[0].layout_type == LayoutType::UInt8,
            LayoutType::Udt => matches!(self.type_args, TypeArgumentList::Schema(id) if id.is_valid()),
            LayoutType::EndScope => false,
            _ => matches!(self.type_args, TypeArgumentList::Empty),
        };
        shape_ok && args.iter().all(|a| a.layout_type != LayoutType::Null && a.is_well_formed())
    }

    /// Appends `[code][args]` for use inside another scope's type arguments.
    pub fn encode(&self, out: &mut MetaBytes) {
        out.push(self.layout_type.code().as_u8());
        self.type_args.encode_for(self.layout_type, out);
    }

    pub fn encoded_len(&self) -> usize {
        1 + self.type_args.encoded_len_for(self.layout_type)
    }

    /// Decodes `[code][args]`, returning the argument and bytes consumed.
    pub fn decode(bytes: &[u8], depth: usize) -> RowResult<(TypeArgument, usize)> {
        if depth > MAX_NESTING_DEPTH {
            return Err(RowError::InvalidRow);
        }
        let code = LayoutCode::try_from(*bytes.first().ok_or(RowError::InvalidRow)?)?;
        let layout_type = LayoutType::from_code(code)?;
        if layout_type == LayoutType::EndScope {
            return Err(RowError::InvalidRow);
        }
        let (type_args, consumed) =
            TypeArgumentList::decode_for(layout_type, &bytes[1..], depth + 1)?;
        Ok((
            TypeArgument {
                layout_type,
                type_args,
            },
            1 + consumed,
        ))
    }
}

impl std::fmt::Display for TypeArgument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.layout_type)?;
        match &self.type_args {
            TypeArgumentList::Empty => Ok(()),
            TypeArgumentList::Schema(id) => write!(f, "<{}>", id),
            TypeArgumentList::Args(args) => {
                f.write_str("<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(">")
            }
        }
    }
}

impl TypeArgumentList {
    pub fn from_args(args: Vec<TypeArgument>) -> Self {
        if args.is_empty() {
            TypeArgumentList::Empty
        } else {
            TypeArgumentList::Args(Arc::from(args))
        }
    }

    pub fn as_slice(&self) -> &[TypeArgument] {
        match self {
            TypeArgumentList::Args(args) => args,
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TypeArgument> {
        self.as_slice().get(index)
    }

    pub fn schema_id(&self) -> Option<SchemaId> {
        match self {
            TypeArgumentList::Schema(id) => Some(*id),
            _ => None,
        }
    }

    /// Declared type of element `index` in a scope of type `scope` carrying
    /// these arguments. Map elements are `TypedTuple<K, V>` pairs.
    pub fn element_type(&self, scope: LayoutType, index: usize) -> Option<TypeArgument> {
        match scope {
            LayoutType::TypedArray | LayoutType::TypedSet => self.get(0).cloned(),
            LayoutType::Nullable if index == 0 => self.get(0).cloned(),
            LayoutType::TypedMap => Some(TypeArgument {
                layout_type: LayoutType::TypedTuple,
                type_args: self.clone(),
            }),
            LayoutType::Tuple
            | LayoutType::TypedTuple
            | LayoutType::Tagged
            | LayoutType::Tagged2 => self.get(index).cloned(),
            _ => None,
        }
    }

    /// Number of elements a fixed-arity scope always holds.
    pub fn fixed_arity(&self, scope: LayoutType) -> Option<usize> {
        match scope {
            LayoutType::Tuple
            | LayoutType::TypedTuple
            | LayoutType::Tagged
            | LayoutType::Tagged2 => Some(self.len()),
            _ => None,
        }
    }

    fn wire_args(&self, scope: LayoutType) -> &[TypeArgument] {
        let args = self.as_slice();
        match scope {
            LayoutType::Tagged | LayoutType::Tagged2 if !args.is_empty() => &args[1..],
            _ => args,
        }
    }

    pub fn encode_for(&self, scope: LayoutType, out: &mut MetaBytes) {
        match scope {
            LayoutType::Udt => {
                let id = self.schema_id().unwrap_or(SchemaId::INVALID);
                out.extend_from_slice(&id.id().to_le_bytes());
            }
            LayoutType::Tuple | LayoutType::TypedTuple => {
                let (buf, len) = encode_varuint_array(self.len() as u64);
                out.extend_from_slice(&buf[..len]);
                for arg in self.as_slice() {
                    arg.encode(out);
                }
            }
            _ if scope.is_typed_scope() => {
                for arg in self.wire_args(scope) {
                    arg.encode(out);
                }
            }
            _ => {}
        }
    }

    pub fn encoded_len_for(&self, scope: LayoutType) -> usize {
        match scope {
            LayoutType::Udt => SCHEMA_ID_SIZE,
            LayoutType::Tuple | LayoutType::TypedTuple => {
                varuint_len(self.len() as u64)
                    + self.as_slice().iter().map(TypeArgument::encoded_len).sum::<usize>()
            }
            _ if scope.is_typed_scope() => self
                .wire_args(scope)
                .iter()
                .map(TypeArgument::encoded_len)
                .sum(),
            _ => 0,
        }
    }

    /// Decodes the type arguments that follow a `scope` code.
    pub fn decode_for(
        scope: LayoutType,
        bytes: &[u8],
        depth: usize,
    ) -> RowResult<(TypeArgumentList, usize)> {
        let mut pos = 0usize;
        let take = |pos: &mut usize, depth: usize| -> RowResult<TypeArgument> {
            let (arg, n) = TypeArgument::decode(&bytes[*pos..], depth)?;
            if arg.layout_type == LayoutType::Null {
                return Err(RowError::InvalidRow);
            }
            *pos += n;
            Ok(arg)
        };

        let args = match scope {
            LayoutType::Udt => {
                let raw: [u8; SCHEMA_ID_SIZE] = bytes
                    .get(..SCHEMA_ID_SIZE)
                    .and_then(|b| b.try_into().ok())
                    .ok_or(RowError::InvalidRow)?;
                let id = SchemaId(i32::from_le_bytes(raw));
                if !id.is_valid() {
                    return Err(RowError::InvalidRow);
                }
                return Ok((TypeArgumentList::Schema(id), SCHEMA_ID_SIZE));
            }
            LayoutType::TypedArray | LayoutType::TypedSet | LayoutType::Nullable => {
                vec![take(&mut pos, depth)?]
            }
            LayoutType::TypedMap => {
                let key = take(&mut pos, depth)?;
                vec![key, take(&mut pos, depth)?]
            }
            LayoutType::Tuple | LayoutType::TypedTuple => {
                let (count, n) = decode_varuint(bytes)?;
                pos += n;
                if count == 0 || count > MAX_TUPLE_ARITY as u64 {
                    return Err(RowError::InvalidRow);
                }
                let mut args = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    args.push(take(&mut pos, depth)?);
                }
                args
            }
            LayoutType::Tagged => {
                vec![TypeArgument::new(LayoutType::UInt8), take(&mut pos, depth)?]
            }
            LayoutType::Tagged2 => {
                let first = take(&mut pos, depth)?;
                vec![
                    TypeArgument::new(LayoutType::UInt8),
                    first,
                    take(&mut pos, depth)?,
                ]
            }
            _ => return Ok((TypeArgumentList::Empty, 0)),
        };
        Ok((TypeArgumentList::from_args(args), pos))
    }
}
