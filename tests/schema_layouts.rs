//! # Schema and Layout Integration Tests
//!
//! Namespaces loaded from JSON compile into layouts that drive the row
//! engine. Covers:
//!
//! - JSON parsing and re-serialization of namespaces
//! - Deterministic compilation
//! - Cross-schema UDT references resolved by name
//! - Compilation failures surfacing through the resolver

use std::sync::Arc;

use hybridrow::config::HYBRID_ROW_VERSION_V1;
use hybridrow::{
    LayoutCompiler, LayoutResolver, LayoutType, Namespace, NamespaceResolver, RowBuffer, RowError,
    RowReader, RowWriter, SchemaId, StorageKind, TypeArgument,
};

const CATALOG_JSON: &str = r#"{
    "name": "Catalog",
    "schemas": [
        {
            "name": "Dimensions",
            "id": 20,
            "properties": [
                { "path": "width", "type": { "type": "float64", "storage": "fixed" } },
                { "path": "height", "type": { "type": "float64", "storage": "fixed" } }
            ]
        },
        {
            "name": "Product",
            "id": 10,
            "options": { "disallowUnschematized": true },
            "properties": [
                { "path": "sku", "type": { "type": "utf8", "storage": "fixed", "length": 8, "nullable": false } },
                { "path": "price", "type": { "type": "decimal", "storage": "fixed" } },
                { "path": "title", "type": { "type": "utf8", "storage": "variable" } },
                { "path": "labels", "type": { "type": "set", "items": { "type": "utf8", "nullable": false } } },
                { "path": "stock", "type": { "type": "map",
                    "keys": { "type": "utf8", "nullable": false },
                    "values": { "type": "int32", "nullable": false } } },
                { "path": "size", "type": { "type": "schema", "name": "Dimensions" } },
                { "path": "meta", "type": { "type": "object", "properties": [
                    { "path": "source", "type": { "type": "utf8" } }
                ] } }
            ]
        }
    ]
}"#;

fn catalog() -> Namespace {
    Namespace::from_json(CATALOG_JSON).unwrap()
}

#[test]
fn namespace_json_survives_a_round_trip() {
    let namespace = catalog();
    assert_eq!(namespace.schemas.len(), 2);
    assert!(namespace.schemas[1].options.disallow_unschematized);

    let json = namespace.to_json().unwrap();
    assert_eq!(Namespace::from_json(&json).unwrap(), namespace);
}

#[test]
fn malformed_json_is_reported() {
    let err = Namespace::from_json(r#"{ "name": "x", "schemas": [ { "name": 3 } ] }"#).unwrap_err();
    assert!(format!("{:#}", err).contains("failed to parse namespace json"));
}

#[test]
fn compilation_is_deterministic() {
    let namespace = catalog();
    let schema = &namespace.schemas[1];
    let first = LayoutCompiler::compile(&namespace, schema).unwrap();
    let second = LayoutCompiler::compile(&catalog(), &catalog().schemas[1]).unwrap();
    assert_eq!(first, second);
}

#[test]
fn compiled_layout_matches_declarations() {
    let resolver = NamespaceResolver::new(catalog());
    resolver.compile_all().unwrap();
    let layout = resolver.layout_by_name("Product").unwrap();

    assert_eq!(layout.schema_id(), SchemaId(10));
    assert!(!layout.allow_unschematized());
    let fixed: Vec<_> = layout.fixed_columns().iter().map(|c| c.path()).collect();
    assert_eq!(fixed, ["sku", "price"]);
    assert_eq!(layout.find("sku").unwrap().size(), 8);
    assert!(layout.find("sku").unwrap().null_bit().is_none());
    assert_eq!(layout.find("title").unwrap().storage(), StorageKind::Variable);
    assert_eq!(
        layout.find("size").unwrap().type_argument(),
        &TypeArgument::udt(SchemaId(20))
    );
    assert_eq!(layout.find("meta.source").unwrap().path(), "source");
    assert_eq!(layout.find("labels").unwrap().layout_type(), LayoutType::TypedSet);
    assert!(layout.tokenizer().find_token("stock").is_some());

    // Resolved layouts are cached and shared.
    let again = resolver.resolve(SchemaId(10)).unwrap();
    assert!(Arc::ptr_eq(&layout, &again));
}

#[test]
fn rows_follow_the_json_schema() {
    let resolver = Arc::new(NamespaceResolver::new(catalog()));
    let layout = resolver.layout_by_name("Product").unwrap();
    let mut row = RowBuffer::new(resolver);
    row.init_layout(HYBRID_ROW_VERSION_V1, layout).unwrap();

    let labels = TypeArgument::typed_set(TypeArgument::new(LayoutType::Utf8));
    RowWriter::write_buffer(&mut row, |w| {
        w.write_utf8("sku", "SKU-0001")?;
        w.write_utf8("title", "Lamp")?;
        w.write_scope("labels", &labels, |s| {
            s.write_utf8("", "office")?;
            s.write_utf8("", "bright")?;
            s.write_utf8("", "office")
        })?;
        w.write_scope("size", &TypeArgument::udt(SchemaId(20)), |d| {
            d.write_float64("height", 30.0)?;
            d.write_float64("width", 12.5)
        })?;
        w.write_scope("meta", &TypeArgument::object(), |m| m.write_utf8("source", "import"))
    })
    .unwrap();

    let err = RowWriter::write_buffer(&mut row, |w| w.write_utf8("undeclared", "x")).unwrap_err();
    assert_eq!(err, RowError::TypeConstraint);

    let mut reader = RowReader::new(&row).unwrap();
    let mut seen = Vec::new();
    while reader.read().unwrap() {
        let path = reader.path().unwrap().unwrap().to_string();
        if path == "labels" {
            reader
                .read_scope_with(|s| {
                    let mut items = Vec::new();
                    while s.read()? {
                        items.push(s.read_utf8()?.to_string());
                    }
                    assert_eq!(items, ["bright", "office"]);
                    Ok(())
                })
                .unwrap();
        } else if path == "size" {
            reader
                .read_scope_with(|d| {
                    assert!(d.read()?);
                    assert_eq!(d.read_float64()?, 12.5);
                    assert!(d.read()?);
                    assert_eq!(d.read_float64()?, 30.0);
                    assert!(!d.read()?);
                    Ok(())
                })
                .unwrap();
        }
        seen.push(path);
    }
    assert_eq!(seen, ["sku", "title", "labels", "size", "meta"]);
}

#[test]
fn unresolvable_references_fail_compilation() {
    let json = r#"{
        "name": "Broken",
        "schemas": [
            { "name": "A", "id": 1, "properties": [
                { "path": "b", "type": { "type": "schema", "name": "Missing" } }
            ] }
        ]
    }"#;
    let resolver = NamespaceResolver::new(Namespace::from_json(json).unwrap());
    assert!(resolver.compile_all().is_err());
    assert!(resolver.resolve(SchemaId(1)).is_none());
    assert!(resolver.layout_by_name("Nope").is_err());
}

#[test]
fn duplicate_schema_ids_are_rejected() {
    let json = r#"{
        "name": "Dup",
        "schemas": [
            { "name": "A", "id": 1 },
            { "name": "B", "id": 1 }
        ]
    }"#;
    let namespace = Namespace::from_json(json).unwrap();
    let err = LayoutCompiler::compile(&namespace, &namespace.schemas[0]).unwrap_err();
    assert!(format!("{:#}", err).contains("duplicate schema id"));
}
