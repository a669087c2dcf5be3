//! Fuzz testing for the row writer.
//!
//! Applies arbitrary sequences of writes, deletes and nested scopes to a
//! row. Individual operations may be rejected, but whatever they leave
//! behind must always read back cleanly.

#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use hybridrow::config::HYBRID_ROW_VERSION_V1;
use hybridrow::{
    LayoutType, Namespace, NamespaceResolver, Property, PropertyType, RowBuffer, RowReader,
    RowResult, RowWriter, Schema, SchemaId, TypeArgument, TypeKind, UpdateOptions,
};

const PATHS: [&str; 6] = ["id", "name", "a", "b", "tags", "a_much_longer_path"];

#[derive(Debug, Arbitrary)]
enum Operation {
    Int(u8, i64),
    Text(u8, String),
    Bool(u8, bool),
    Null(u8),
    Delete(u8),
    Array(u8, Vec<i32>),
    Set(u8, Vec<i16>, bool),
    Object(u8, Vec<(u8, i32)>),
    Options(u8),
}

fn path(index: u8) -> &'static str {
    PATHS[index as usize % PATHS.len()]
}

fn options(index: u8) -> UpdateOptions {
    match index % 3 {
        0 => UpdateOptions::Upsert,
        1 => UpdateOptions::Insert,
        _ => UpdateOptions::Update,
    }
}

fn apply(w: &mut RowWriter<'_>, op: &Operation) -> RowResult<()> {
    match op {
        Operation::Int(p, v) => w.write_int64(path(*p), *v),
        Operation::Text(p, v) => w.write_utf8(path(*p), v),
        Operation::Bool(p, v) => w.write_bool(path(*p), *v),
        Operation::Null(p) => w.write_null(path(*p)),
        Operation::Delete(p) => w.delete(path(*p)),
        Operation::Array(p, items) => w.write_scope(path(*p), &TypeArgument::array(), |a| {
            items.iter().try_for_each(|&v| a.write_int32("", v))
        }),
        Operation::Set(p, items, insert) => {
            let ty = TypeArgument::typed_set(TypeArgument::new(LayoutType::Int16));
            w.write_scope(path(*p), &ty, |s| {
                if *insert {
                    s.set_update_options(UpdateOptions::Insert);
                }
                items.iter().try_for_each(|&v| s.write_int16("", v))
            })
        }
        Operation::Object(p, fields) => w.write_scope(path(*p), &TypeArgument::object(), |o| {
            fields
                .iter()
                .try_for_each(|&(k, v)| o.write_int32(path(k), v))
        }),
        Operation::Options(o) => {
            w.set_update_options(options(*o));
            Ok(())
        }
    }
}

fn drain(reader: &mut RowReader<'_>) -> RowResult<()> {
    while reader.read()? {
        match reader.layout_type() {
            Some(ty) if ty.is_scope() => reader.read_scope_with(|child| drain(child))?,
            _ => {
                reader.read_value()?;
            }
        }
    }
    Ok(())
}

fuzz_target!(|ops: Vec<Operation>| {
    let resolver = Arc::new(NamespaceResolver::new(Namespace::new("Fuzz").with_schema(
        Schema::new("Doc", SchemaId(1)).with_properties([
            Property::new("id", PropertyType::primitive(TypeKind::Int64).fixed()),
            Property::new("name", PropertyType::primitive(TypeKind::Utf8).variable()),
            Property::new(
                "tags",
                PropertyType::array(PropertyType::primitive(TypeKind::Utf8).not_null()),
            ),
        ]),
    )));
    let Ok(layout) = resolver.layout_by_name("Doc") else {
        return;
    };
    let mut row = RowBuffer::new(resolver);
    if row.init_layout(HYBRID_ROW_VERSION_V1, layout).is_err() {
        return;
    }

    let _ = RowWriter::write_buffer(&mut row, |w| {
        for op in &ops {
            let _ = apply(w, op);
        }
        Ok(())
    });

    let mut reader = RowReader::new(&row).expect("initialized row has a reader");
    drain(&mut reader).expect("written rows always read back");
});
