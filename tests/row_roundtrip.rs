//! # Row Round-Trip Tests
//!
//! Every primitive type written through `RowWriter` must read back
//! bit-for-bit through `RowReader`, in every storage class:
//!
//! - Sparse fields at the root scope
//! - Fixed columns (including fixed-length strings and binaries)
//! - Variable columns
//! - Rows reloaded from their serialized bytes

use std::sync::Arc;

use hybridrow::config::HYBRID_ROW_VERSION_V1;
use hybridrow::layouts::StaticResolver;
use hybridrow::row::{DateTime, Decimal, Float128, Guid, MongoDbObjectId, UnixDateTime};
use hybridrow::{
    LayoutCompiler, Namespace, NamespaceResolver, Property, PropertyType, RowBuffer, RowReader,
    RowValue, RowWriter, Schema, SchemaId, StorageKind, TypeKind,
};

fn sample_values() -> Vec<(&'static str, RowValue<'static>)> {
    vec![
        ("bool_true", RowValue::Bool(true)),
        ("bool_false", RowValue::Bool(false)),
        ("i8", RowValue::Int8(i8::MIN)),
        ("i16", RowValue::Int16(-12_345)),
        ("i32", RowValue::Int32(i32::MAX)),
        ("i64", RowValue::Int64(i64::MIN)),
        ("u8", RowValue::UInt8(u8::MAX)),
        ("u16", RowValue::UInt16(54_321)),
        ("u32", RowValue::UInt32(u32::MAX)),
        ("u64", RowValue::UInt64(u64::MAX)),
        ("vi", RowValue::VarInt(-1)),
        ("vu", RowValue::VarUInt(300)),
        ("f32", RowValue::Float32(-0.5)),
        ("f64", RowValue::Float64(std::f64::consts::PI)),
        ("f128", RowValue::Float128(Float128::new(-2, 7))),
        ("dec", RowValue::Decimal(Decimal::new(-123_456_789, 4).unwrap())),
        ("dt", RowValue::DateTime(DateTime(637_000_000_000_000_000))),
        ("unix", RowValue::UnixDateTime(UnixDateTime(-86_400_000))),
        ("guid", RowValue::Guid(Guid([0xAB; 16]))),
        ("oid", RowValue::MongoDbObjectId(MongoDbObjectId([7; 12]))),
        ("text", RowValue::Utf8("héllo wörld")),
        ("empty", RowValue::Utf8("")),
        ("bytes", RowValue::Binary(&[0, 1, 2, 0xFF])),
        ("nothing", RowValue::Null),
    ]
}

fn open_namespace() -> Namespace {
    Namespace::new("Open").with_schema(Schema::new("Bag", SchemaId(1)))
}

fn new_row(namespace: Namespace, schema: &str) -> RowBuffer {
    let resolver = Arc::new(NamespaceResolver::new(namespace));
    let layout = resolver.layout_by_name(schema).unwrap();
    let mut row = RowBuffer::new(resolver);
    row.init_layout(HYBRID_ROW_VERSION_V1, layout).unwrap();
    row
}

fn read_all(row: &RowBuffer) -> Vec<(String, RowValue<'_>)> {
    let mut reader = RowReader::new(row).unwrap();
    let mut out = Vec::new();
    while reader.read().unwrap() {
        let path = reader.path().unwrap().unwrap().to_string();
        out.push((path, reader.read_value().unwrap()));
    }
    out
}

#[test]
fn sparse_primitives_round_trip() {
    let mut row = new_row(open_namespace(), "Bag");
    let values = sample_values();
    RowWriter::write_buffer(&mut row, |w| {
        for (path, value) in &values {
            w.write_value(path, *value)?;
        }
        Ok(())
    })
    .unwrap();

    let read = read_all(&row);
    assert_eq!(read.len(), values.len());
    for ((path, value), (read_path, read_value)) in values.iter().zip(&read) {
        assert_eq!(path, read_path);
        assert_eq!(value, read_value, "value at {}", path);
    }
}

#[test]
fn sparse_floats_keep_their_bits() {
    let mut row = new_row(open_namespace(), "Bag");
    let nan32 = f32::from_bits(0x7FC0_1234);
    let nan64 = f64::from_bits(0xFFF8_0000_0000_00AA);
    RowWriter::write_buffer(&mut row, |w| {
        w.write_float32("a", nan32)?;
        w.write_float64("b", nan64)?;
        w.write_float64("c", -0.0)
    })
    .unwrap();

    let mut reader = RowReader::new(&row).unwrap();
    assert!(reader.read().unwrap());
    assert_eq!(reader.read_float32().unwrap().to_bits(), nan32.to_bits());
    assert!(reader.read().unwrap());
    assert_eq!(reader.read_float64().unwrap().to_bits(), nan64.to_bits());
    assert!(reader.read().unwrap());
    assert_eq!(reader.read_float64().unwrap().to_bits(), (-0.0f64).to_bits());
}

fn fixed_namespace() -> Namespace {
    let fixed = |kind| PropertyType::primitive(kind).fixed();
    Namespace::new("Fixed").with_schema(Schema::new("Wide", SchemaId(3)).with_properties([
        Property::new("flag", fixed(TypeKind::Boolean)),
        Property::new("i8", fixed(TypeKind::Int8)),
        Property::new("i16", fixed(TypeKind::Int16)),
        Property::new("i32", fixed(TypeKind::Int32)),
        Property::new("i64", fixed(TypeKind::Int64)),
        Property::new("u8", fixed(TypeKind::UInt8)),
        Property::new("u16", fixed(TypeKind::UInt16)),
        Property::new("u32", fixed(TypeKind::UInt32)),
        Property::new("u64", fixed(TypeKind::UInt64)),
        Property::new("f32", fixed(TypeKind::Float32)),
        Property::new("f64", fixed(TypeKind::Float64)),
        Property::new("f128", fixed(TypeKind::Float128)),
        Property::new("dec", fixed(TypeKind::Decimal)),
        Property::new("dt", fixed(TypeKind::DateTime)),
        Property::new("unix", fixed(TypeKind::UnixDateTime)),
        Property::new("guid", fixed(TypeKind::Guid)),
        Property::new("oid", fixed(TypeKind::MongoDbObjectId)),
        Property::new("code", fixed(TypeKind::Utf8).with_length(4)),
        Property::new("raw", fixed(TypeKind::Binary).with_length(2)),
        Property::new("name", PropertyType::primitive(TypeKind::Utf8).variable()),
        Property::new("blob", PropertyType::primitive(TypeKind::Binary).variable()),
        Property::new("vi", PropertyType::primitive(TypeKind::VarInt).variable()),
        Property::new("vu", PropertyType::primitive(TypeKind::VarUInt).variable()),
    ]))
}

fn schematized_values() -> Vec<(&'static str, RowValue<'static>)> {
    vec![
        ("flag", RowValue::Bool(true)),
        ("i8", RowValue::Int8(-8)),
        ("i16", RowValue::Int16(-16)),
        ("i32", RowValue::Int32(-32)),
        ("i64", RowValue::Int64(-64)),
        ("u8", RowValue::UInt8(8)),
        ("u16", RowValue::UInt16(16)),
        ("u32", RowValue::UInt32(32)),
        ("u64", RowValue::UInt64(64)),
        ("f32", RowValue::Float32(1.5)),
        ("f64", RowValue::Float64(-2.25)),
        ("f128", RowValue::Float128(Float128::new(1, 2))),
        ("dec", RowValue::Decimal(Decimal::new(42, 1).unwrap())),
        ("dt", RowValue::DateTime(DateTime(1))),
        ("unix", RowValue::UnixDateTime(UnixDateTime(2))),
        ("guid", RowValue::Guid(Guid([3; 16]))),
        ("oid", RowValue::MongoDbObjectId(MongoDbObjectId([4; 12]))),
        ("code", RowValue::Utf8("ABCD")),
        ("raw", RowValue::Binary(&[9, 8])),
        ("name", RowValue::Utf8("variable text")),
        ("blob", RowValue::Binary(&[1, 2, 3])),
        ("vi", RowValue::VarInt(i64::MIN)),
        ("vu", RowValue::VarUInt(u64::MAX)),
    ]
}

#[test]
fn schematized_columns_round_trip_in_layout_order() {
    let mut row = new_row(fixed_namespace(), "Wide");
    let values = schematized_values();
    // Written in reverse to show that read order follows the layout.
    RowWriter::write_buffer(&mut row, |w| {
        for (path, value) in values.iter().rev() {
            w.write_value(path, *value)?;
        }
        Ok(())
    })
    .unwrap();

    let mut reader = RowReader::new(&row).unwrap();
    for (path, value) in &values {
        assert!(reader.read().unwrap());
        assert_eq!(reader.path().unwrap(), Some(*path));
        assert_ne!(reader.storage(), StorageKind::Sparse);
        assert_eq!(reader.read_value().unwrap(), *value, "column {}", path);
    }
    assert!(!reader.read().unwrap());
}

#[test]
fn fixed_strings_must_match_their_length() {
    let mut row = new_row(fixed_namespace(), "Wide");
    RowWriter::write_buffer(&mut row, |w| {
        assert_eq!(w.write_utf8("code", "ABCDE").unwrap_err(), hybridrow::RowError::TooBig);
        assert_eq!(
            w.write_utf8("code", "AB").unwrap_err(),
            hybridrow::RowError::TypeConstraint
        );
        w.write_utf8("code", "WXYZ")
    })
    .unwrap();
    assert_eq!(read_all(&row), [("code".to_string(), RowValue::Utf8("WXYZ"))]);
}

#[test]
fn serialized_rows_reload_with_a_static_resolver() {
    let namespace = fixed_namespace();
    let schema = namespace.schemas[0].clone();
    let layout = LayoutCompiler::compile(&namespace, &schema).unwrap();
    let resolver = Arc::new(StaticResolver::new([layout]));

    let mut row = new_row(fixed_namespace(), "Wide");
    RowWriter::write_buffer(&mut row, |w| {
        w.write_int32("i32", 99)?;
        w.write_utf8("name", "persisted")?;
        w.write_scope("extra", &hybridrow::TypeArgument::object(), |o| o.write_bool("x", true))
    })
    .unwrap();
    let bytes = row.into_bytes();

    let reloaded = RowBuffer::from_bytes(&bytes, resolver).unwrap();
    assert_eq!(reloaded.schema_id().unwrap(), SchemaId(3));
    assert_eq!(reloaded.as_bytes(), bytes.as_slice());

    let mut reader = RowReader::new(&reloaded).unwrap();
    assert!(reader.read().unwrap());
    assert_eq!(reader.read_int32().unwrap(), 99);
    assert!(reader.read().unwrap());
    assert_eq!(reader.read_utf8().unwrap(), "persisted");
    assert!(reader.read().unwrap());
    assert_eq!(reader.path().unwrap(), Some("extra"));
    reader
        .read_scope_with(|o| {
            assert!(o.read()?);
            assert!(o.read_bool()?);
            Ok(())
        })
        .unwrap();
    assert!(!reader.read().unwrap());
}

#[test]
fn identical_writes_produce_identical_bytes() {
    let build = || {
        let mut row = new_row(fixed_namespace(), "Wide");
        RowWriter::write_buffer(&mut row, |w| {
            for (path, value) in schematized_values() {
                w.write_value(path, value)?;
            }
            w.write_utf8("note", "sparse")
        })
        .unwrap();
        row.into_bytes()
    };
    assert_eq!(build(), build());
}

#[test]
fn sparse_and_schematized_columns_read_the_same_values() {
    let storages = [
        (
            PropertyType::primitive(TypeKind::Int32).fixed(),
            PropertyType::primitive(TypeKind::Utf8).variable(),
        ),
        (
            PropertyType::primitive(TypeKind::Int32),
            PropertyType::primitive(TypeKind::Utf8),
        ),
    ];

    for (a, s) in storages {
        let namespace = Namespace::new("Same").with_schema(
            Schema::new("Pair", SchemaId(4))
                .with_properties([Property::new("a", a), Property::new("s", s)]),
        );
        let mut row = new_row(namespace, "Pair");
        RowWriter::write_buffer(&mut row, |w| {
            w.write_utf8("s", "x")?;
            w.write_int32("a", 5)
        })
        .unwrap();

        // Enumeration order depends on storage; the field set does not.
        let mut fields = read_all(&row);
        fields.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(
            fields,
            vec![
                ("a".to_string(), RowValue::Int32(5)),
                ("s".to_string(), RowValue::Utf8("x")),
            ]
        );
    }
}
