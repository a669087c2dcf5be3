//! Fuzz testing for the row reader.
//!
//! Arbitrary bytes are placed behind a valid header and fixed segment, then
//! every field of every nested scope is read. Malformed input must surface
//! as an error, never a panic or an unbounded recursion.

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;

use hybridrow::config::HYBRID_ROW_VERSION_V1;
use hybridrow::{
    LayoutResolver, Namespace, NamespaceResolver, Property, PropertyType, RowBuffer, RowReader,
    RowResult, Schema, SchemaId, TypeKind,
};

fn resolver() -> Arc<dyn LayoutResolver> {
    Arc::new(NamespaceResolver::new(
        Namespace::new("Fuzz")
            .with_schema(Schema::new("Inner", SchemaId(2)).with_properties([
                Property::new("n", PropertyType::primitive(TypeKind::Int32).fixed()),
                Property::new("s", PropertyType::primitive(TypeKind::Utf8).variable()),
            ]))
            .with_schema(Schema::new("Outer", SchemaId(1)).with_properties([
                Property::new("id", PropertyType::primitive(TypeKind::Int64).fixed()),
                Property::new("name", PropertyType::primitive(TypeKind::Utf8).variable()),
                Property::new("inner", PropertyType::udt("Inner")),
            ])),
    ))
}

fn drain(reader: &mut RowReader<'_>) -> RowResult<()> {
    while reader.read()? {
        let _ = reader.path()?;
        match reader.layout_type() {
            Some(ty) if ty.is_scope() => reader.read_scope_with(|child| drain(child))?,
            _ => {
                reader.read_value()?;
            }
        }
    }
    Ok(())
}

fuzz_target!(|data: &[u8]| {
    let resolver = resolver();
    let mut bytes = vec![HYBRID_ROW_VERSION_V1];
    bytes.extend_from_slice(&1i32.to_le_bytes());
    bytes.extend_from_slice(data);
    // Raw input is also tried as a whole row, header included.
    for candidate in [&bytes[..], data] {
        let Ok(row) = RowBuffer::from_bytes(candidate, Arc::clone(&resolver)) else {
            continue;
        };
        assert_eq!(row.as_bytes(), candidate);
        let Ok(mut reader) = RowReader::new(&row) else {
            continue;
        };
        let _ = drain(&mut reader);
    }
});
