//! Tests for the row module: writer and reader working together.

use std::sync::Arc;

use super::*;
use crate::config::HYBRID_ROW_VERSION_V1;
use crate::layouts::{LayoutType, NamespaceResolver, TypeArgument};
use crate::schema::{Namespace, Property, PropertyType, Schema, SchemaId, SchemaOptions, StorageKind, TypeKind};

fn utf8() -> TypeArgument {
    TypeArgument::new(LayoutType::Utf8)
}

fn int32() -> TypeArgument {
    TypeArgument::new(LayoutType::Int32)
}

fn contacts() -> Namespace {
    Namespace::new("Contacts")
        .with_schema(Schema::new("Address", SchemaId(2)).with_properties([
            Property::new("street", PropertyType::primitive(TypeKind::Utf8).variable()),
            Property::new("zip", PropertyType::primitive(TypeKind::Int32).fixed()),
        ]))
        .with_schema(Schema::new("Person", SchemaId(1)).with_properties([
            Property::new("a", PropertyType::primitive(TypeKind::Int32).fixed()),
            Property::new("b", PropertyType::primitive(TypeKind::Utf8)),
            Property::new("name", PropertyType::primitive(TypeKind::Utf8).variable()),
            Property::new(
                "tags",
                PropertyType::array(PropertyType::primitive(TypeKind::Utf8).not_null()),
            ),
            Property::new(
                "scores",
                PropertyType::map(
                    PropertyType::primitive(TypeKind::Utf8).not_null(),
                    PropertyType::primitive(TypeKind::Int32).not_null(),
                ),
            ),
            Property::new("home", PropertyType::udt("Address")),
        ]))
}

fn new_row(namespace: Namespace, schema: &str) -> RowBuffer {
    let resolver = Arc::new(NamespaceResolver::new(namespace));
    let layout = resolver.layout_by_name(schema).unwrap();
    let mut row = RowBuffer::new(resolver);
    row.init_layout(HYBRID_ROW_VERSION_V1, layout).unwrap();
    row
}

fn person() -> RowBuffer {
    new_row(contacts(), "Person")
}

fn top_level_paths(row: &RowBuffer) -> Vec<String> {
    let mut reader = RowReader::new(row).unwrap();
    let mut paths = Vec::new();
    while reader.read().unwrap() {
        paths.push(reader.path().unwrap().unwrap_or_default().to_string());
    }
    paths
}

#[test]
fn fixed_and_sparse_fields_read_back_in_storage_order() {
    let mut row = person();
    RowWriter::write_buffer(&mut row, |w| {
        w.write_int32("a", 5)?;
        w.write_utf8("b", "hi")
    })
    .unwrap();

    let mut reader = RowReader::new(&row).unwrap();
    assert!(reader.read().unwrap());
    assert_eq!(reader.path().unwrap(), Some("a"));
    assert_eq!(reader.storage(), StorageKind::Fixed);
    assert_eq!(reader.read_int32().unwrap(), 5);

    assert!(reader.read().unwrap());
    assert_eq!(reader.path().unwrap(), Some("b"));
    assert_eq!(reader.storage(), StorageKind::Sparse);
    assert_eq!(reader.read_utf8().unwrap(), "hi");

    assert!(!reader.read().unwrap());
    assert_eq!(reader.state(), ReaderState::Done);
    assert!(!reader.read().unwrap());
}

#[test]
fn empty_row_yields_no_fields() {
    let row = person();
    let mut reader = RowReader::new(&row).unwrap();
    assert!(!reader.read().unwrap());
    assert_eq!(reader.state(), ReaderState::Done);
}

#[test]
fn typed_accessors_do_not_coerce() {
    let mut row = person();
    RowWriter::write_buffer(&mut row, |w| w.write_int16("small", 3)).unwrap();

    let mut reader = RowReader::new(&row).unwrap();
    assert!(reader.read().unwrap());
    assert_eq!(reader.read_int32().unwrap_err(), RowError::TypeMismatch);
    assert_eq!(reader.read_int16().unwrap(), 3);
    assert_eq!(reader.read_value().unwrap(), RowValue::Int16(3));
}

#[test]
fn schematized_column_rejects_other_types() {
    let mut row = person();
    let err = RowWriter::write_buffer(&mut row, |w| w.write_utf8("a", "five")).unwrap_err();
    assert_eq!(err, RowError::TypeConstraint);

    let err = RowWriter::write_buffer(&mut row, |w| w.write_int32("b", 1)).unwrap_err();
    assert_eq!(err, RowError::TypeConstraint);
}

#[test]
fn writing_null_clears_schematized_columns() {
    let mut row = person();
    RowWriter::write_buffer(&mut row, |w| {
        w.write_int32("a", 1)?;
        w.write_utf8("name", "ada")
    })
    .unwrap();
    assert_eq!(top_level_paths(&row), ["a", "name"]);

    RowWriter::write_buffer(&mut row, |w| {
        w.write_null("a")?;
        w.delete("name")
    })
    .unwrap();
    assert!(top_level_paths(&row).is_empty());
}

#[test]
fn variable_writes_keep_later_sparse_fields_readable() {
    let mut row = person();
    RowWriter::write_buffer(&mut row, |w| {
        w.write_utf8("b", "sparse")?;
        w.write_utf8("name", "a much longer variable payload")?;
        w.write_utf8("extra", "after")?;
        w.write_utf8("name", "short")
    })
    .unwrap();

    let mut reader = RowReader::new(&row).unwrap();
    let mut seen = Vec::new();
    while reader.read().unwrap() {
        let path = reader.path().unwrap().unwrap().to_string();
        seen.push((path, reader.read_utf8().unwrap().to_string()));
    }
    assert_eq!(
        seen,
        [
            ("name".to_string(), "short".to_string()),
            ("b".to_string(), "sparse".to_string()),
            ("extra".to_string(), "after".to_string()),
        ]
    );
}

#[test]
fn nested_reader_stays_inside_its_scope() {
    let mut row = person();
    RowWriter::write_buffer(&mut row, |w| {
        w.write_scope("tags", &TypeArgument::typed_array(utf8()), |t| {
            t.write_utf8("", "x")?;
            t.write_utf8("", "y")
        })?;
        w.write_utf8("after", "tail")
    })
    .unwrap();

    let mut reader = RowReader::new(&row).unwrap();
    assert!(reader.read().unwrap());
    assert_eq!(reader.layout_type(), Some(LayoutType::TypedArray));
    assert_eq!(reader.read_value().unwrap_err(), RowError::TypeMismatch);

    let mut items = Vec::new();
    reader
        .read_scope_with(|child| {
            while child.read()? {
                assert_eq!(child.path()?, None);
                items.push((child.index(), child.read_utf8()?.to_string()));
            }
            Ok(())
        })
        .unwrap();
    assert_eq!(items, [(0, "x".to_string()), (1, "y".to_string())]);

    assert!(reader.read().unwrap());
    assert_eq!(reader.path().unwrap(), Some("after"));
    assert!(!reader.read().unwrap());
}

#[test]
fn parent_can_skip_a_partially_read_scope() {
    let mut row = person();
    RowWriter::write_buffer(&mut row, |w| {
        w.write_scope("list", &TypeArgument::array(), |a| {
            a.write_int8("", 1)?;
            a.write_utf8("", "two")?;
            a.write_bool("", true)
        })?;
        w.write_int8("next", 9)
    })
    .unwrap();

    let mut reader = RowReader::new(&row).unwrap();
    assert!(reader.read().unwrap());
    let mut child = reader.read_scope().unwrap();
    assert!(child.read().unwrap());
    assert_eq!(child.read_int8().unwrap(), 1);
    reader.skip_scope(&mut child).unwrap();
    assert!(!child.read().unwrap());

    assert!(reader.read().unwrap());
    assert_eq!(reader.read_int8().unwrap(), 9);
}

#[test]
fn skip_scope_rejects_foreign_child() {
    let mut row = person();
    RowWriter::write_buffer(&mut row, |w| {
        w.write_scope("one", &TypeArgument::object(), |o| o.write_int8("x", 1))?;
        w.write_scope("two", &TypeArgument::object(), |o| o.write_int8("y", 2))
    })
    .unwrap();

    let mut reader = RowReader::new(&row).unwrap();
    assert!(reader.read().unwrap());
    let mut stale = reader.read_scope().unwrap();
    let mut fresh = reader.read_scope().unwrap();
    reader.skip_scope(&mut fresh).unwrap();
    assert!(reader.read().unwrap());
    assert_eq!(reader.skip_scope(&mut stale).unwrap_err(), RowError::Failure);
}

#[test]
fn object_scopes_nest_and_resolve_paths() {
    let mut row = person();
    RowWriter::write_buffer(&mut row, |w| {
        w.write_scope("outer", &TypeArgument::object(), |o| {
            o.write_utf8("k", "v")?;
            o.write_scope("inner", &TypeArgument::object(), |i| i.write_bool("deep", false))
        })
    })
    .unwrap();

    let mut reader = RowReader::new(&row).unwrap();
    assert!(reader.read().unwrap());
    reader
        .read_scope_with(|outer| {
            assert!(outer.read()?);
            assert_eq!(outer.path()?, Some("k"));
            assert_eq!(outer.read_utf8()?, "v");
            assert!(outer.read()?);
            assert_eq!(outer.path()?, Some("inner"));
            outer.read_scope_with(|inner| {
                assert!(inner.read()?);
                assert_eq!(inner.path()?, Some("deep"));
                assert!(!inner.read_bool()?);
                assert!(!inner.read()?);
                Ok(())
            })?;
            assert!(!outer.read()?);
            Ok(())
        })
        .unwrap();
    assert!(!reader.read().unwrap());
}

fn write_scores(row: &mut RowBuffer, options: UpdateOptions) -> RowResult<()> {
    let map = TypeArgument::typed_map(utf8(), int32());
    RowWriter::write_buffer(row, |w| {
        w.write_scope("scores", &map, |m| {
            m.set_update_options(options);
            for (key, value) in [("b", 1), ("a", 2), ("b", 3)] {
                m.write_map_entry(|e| {
                    e.write_utf8("", key)?;
                    e.write_int32("", value)
                })?;
            }
            Ok(())
        })
    })
}

fn read_scores(row: &RowBuffer) -> Vec<(String, i32)> {
    let mut reader = RowReader::new(row).unwrap();
    assert!(reader.read().unwrap());
    assert_eq!(reader.path().unwrap(), Some("scores"));
    let mut entries = Vec::new();
    reader
        .read_scope_with(|map| {
            while map.read()? {
                map.read_scope_with(|entry| {
                    assert!(entry.read()?);
                    let key = entry.read_utf8()?.to_string();
                    assert!(entry.read()?);
                    entries.push((key, entry.read_int32()?));
                    assert!(!entry.read()?);
                    Ok(())
                })?;
            }
            Ok(())
        })
        .unwrap();
    entries
}

#[test]
fn map_upsert_keeps_the_later_entry_sorted_by_key() {
    let mut row = person();
    write_scores(&mut row, UpdateOptions::Upsert).unwrap();
    assert_eq!(
        read_scores(&row),
        [("a".to_string(), 2), ("b".to_string(), 3)]
    );
}

#[test]
fn map_insert_rejects_duplicate_keys() {
    let mut row = person();
    assert_eq!(
        write_scores(&mut row, UpdateOptions::Insert).unwrap_err(),
        RowError::Exists
    );
    // The scope is left sorted with the duplicate in place.
    assert_eq!(
        read_scores(&row),
        [
            ("a".to_string(), 2),
            ("b".to_string(), 1),
            ("b".to_string(), 3),
        ]
    );
}

#[test]
fn map_entry_outside_a_map_is_rejected() {
    let mut row = person();
    let err = RowWriter::write_buffer(&mut row, |w| {
        w.write_scope("list", &TypeArgument::array(), |a| a.write_map_entry(|_| Ok(())))
    })
    .unwrap_err();
    assert_eq!(err, RowError::TypeConstraint);
}

#[test]
fn nested_udt_has_its_own_schematized_columns() {
    let mut row = person();
    RowWriter::write_buffer(&mut row, |w| {
        w.write_scope("home", &TypeArgument::udt(SchemaId(2)), |h| {
            h.write_utf8("street", "Main St")?;
            h.write_int32("zip", 12345)?;
            h.write_utf8("note", "gate code 4")
        })?;
        w.write_utf8("b", "after home")
    })
    .unwrap();

    let mut reader = RowReader::new(&row).unwrap();
    assert!(reader.read().unwrap());
    assert_eq!(reader.path().unwrap(), Some("home"));
    reader
        .read_scope_with(|home| {
            assert!(home.read()?);
            assert_eq!(home.path()?, Some("zip"));
            assert_eq!(home.storage(), StorageKind::Fixed);
            assert_eq!(home.read_int32()?, 12345);
            assert!(home.read()?);
            assert_eq!(home.path()?, Some("street"));
            assert_eq!(home.storage(), StorageKind::Variable);
            assert_eq!(home.read_utf8()?, "Main St");
            assert!(home.read()?);
            assert_eq!(home.path()?, Some("note"));
            assert!(!home.read()?);
            Ok(())
        })
        .unwrap();
    assert!(reader.read().unwrap());
    assert_eq!(reader.read_utf8().unwrap(), "after home");
}

#[test]
fn declared_sparse_columns_enforce_their_type() {
    let mut row = person();
    let err = RowWriter::write_buffer(&mut row, |w| {
        w.write_scope("tags", &TypeArgument::typed_array(int32()), |_| Ok(()))
    })
    .unwrap_err();
    assert_eq!(err, RowError::TypeConstraint);

    let err = RowWriter::write_buffer(&mut row, |w| {
        w.write_scope("a", &TypeArgument::object(), |_| Ok(()))
    })
    .unwrap_err();
    assert_eq!(err, RowError::TypeConstraint);
}

#[test]
fn disallow_unschematized_rejects_undeclared_paths() {
    let namespace = Namespace::new("Strict").with_schema(
        Schema::new("Closed", SchemaId(7))
            .with_options(SchemaOptions {
                disallow_unschematized: true,
            })
            .with_property(Property::new("note", PropertyType::primitive(TypeKind::Utf8))),
    );
    let mut row = new_row(namespace, "Closed");

    RowWriter::write_buffer(&mut row, |w| w.write_utf8("note", "ok")).unwrap();
    let err = RowWriter::write_buffer(&mut row, |w| w.write_utf8("other", "no")).unwrap_err();
    assert_eq!(err, RowError::TypeConstraint);
    assert_eq!(top_level_paths(&row), ["note"]);
}

#[test]
fn update_options_govern_sparse_conflicts() {
    let mut row = person();
    RowWriter::write_buffer(&mut row, |w| {
        w.set_update_options(UpdateOptions::Update);
        assert_eq!(w.write_int8("x", 1).unwrap_err(), RowError::NotFound);
        w.set_update_options(UpdateOptions::Insert);
        w.write_int8("x", 1)?;
        assert_eq!(w.write_int8("x", 2).unwrap_err(), RowError::Exists);
        w.set_update_options(UpdateOptions::Update);
        w.write_int8("x", 3)
    })
    .unwrap();

    let mut reader = RowReader::new(&row).unwrap();
    assert!(reader.read().unwrap());
    assert_eq!(reader.read_int8().unwrap(), 3);
}

#[test]
fn sparse_delete_and_missing_delete() {
    let mut row = person();
    RowWriter::write_buffer(&mut row, |w| {
        w.write_utf8("b", "x")?;
        w.write_utf8("c", "y")?;
        w.delete("b")?;
        assert_eq!(w.delete("b").unwrap_err(), RowError::NotFound);
        Ok(())
    })
    .unwrap();
    assert_eq!(top_level_paths(&row), ["c"]);
}

#[test]
fn nullable_scopes_read_as_value_or_null() {
    let mut row = person();
    let ty = TypeArgument::nullable(int32());
    RowWriter::write_buffer(&mut row, |w| {
        w.write_nullable("some", &ty, true, |n| n.write_int32("", 4))?;
        w.write_nullable("none", &ty, false, |_| Ok(()))?;
        assert_eq!(
            w.write_nullable("bad", &int32(), true, |_| Ok(())).unwrap_err(),
            RowError::TypeConstraint
        );
        Ok(())
    })
    .unwrap();

    let mut reader = RowReader::new(&row).unwrap();
    assert!(reader.read().unwrap());
    assert_eq!(reader.read_value().unwrap(), RowValue::Int32(4));
    assert_eq!(reader.read_int32().unwrap(), 4);
    assert!(reader.read().unwrap());
    assert!(reader.is_null().unwrap());
    assert_eq!(reader.read_int32().unwrap_err(), RowError::TypeMismatch);
    assert!(!reader.read().unwrap());
}

#[test]
fn tuples_are_prefilled_and_bounded() {
    let mut row = person();
    let typed = TypeArgument::typed_tuple([int32(), utf8()]);
    let untyped = TypeArgument::tuple([int32(), utf8()]);
    RowWriter::write_buffer(&mut row, |w| {
        w.write_scope("pair", &typed, |t| {
            t.write_int32("", 1)?;
            t.write_utf8("", "one")?;
            assert_eq!(t.write_int32("", 2).unwrap_err(), RowError::TypeConstraint);
            Ok(())
        })?;
        w.write_scope("defaults", &typed, |_| Ok(()))?;
        w.write_scope("loose", &untyped, |t| {
            assert_eq!(t.write_utf8("", "wrong").unwrap_err(), RowError::TypeConstraint);
            t.write_null("")?;
            t.write_utf8("", "ok")
        })
    })
    .unwrap();

    let mut reader = RowReader::new(&row).unwrap();
    let mut values = Vec::new();
    while reader.read().unwrap() {
        reader
            .read_scope_with(|t| {
                while t.read()? {
                    values.push(format!("{:?}", t.read_value()?));
                }
                Ok(())
            })
            .unwrap();
    }
    assert_eq!(
        values,
        [
            "Int32(1)",
            "Utf8(\"one\")",
            "Int32(0)",
            "Utf8(\"\")",
            "Null",
            "Utf8(\"ok\")",
        ]
    );
}

#[test]
fn tagged_scopes_carry_implicit_tag() {
    let mut row = person();
    let ty = TypeArgument::tagged(utf8());
    RowWriter::write_buffer(&mut row, |w| {
        w.write_scope("tagged", &ty, |t| {
            t.write_uint8("", 7)?;
            t.write_utf8("", "payload")
        })
    })
    .unwrap();

    let mut reader = RowReader::new(&row).unwrap();
    assert!(reader.read().unwrap());
    assert_eq!(reader.type_args().len(), 2);
    reader
        .read_scope_with(|t| {
            assert!(t.read()?);
            assert_eq!(t.read_uint8()?, 7);
            assert!(t.read()?);
            assert_eq!(t.read_utf8()?, "payload");
            Ok(())
        })
        .unwrap();
}

#[test]
fn insert_at_places_element_before_cursor() {
    let mut row = person();
    RowWriter::write_buffer(&mut row, |w| {
        w.write_scope("arr", &TypeArgument::array(), |a| {
            a.write_int8("", 1)?;
            a.write_int8("", 3)
        })
    })
    .unwrap();

    let mut cursor = RowCursor::create(&row).unwrap();
    assert!(cursor.find(&row, "arr").unwrap());
    let mut child = row.scope_cursor(&cursor).unwrap();
    assert!(child.move_next(&row).unwrap());
    assert!(child.move_next(&row).unwrap());
    row.write_sparse(&mut child, &RowValue::Int8(2), UpdateOptions::InsertAt)
        .unwrap();

    let mut reader = RowReader::new(&row).unwrap();
    assert!(reader.read().unwrap());
    let mut values = Vec::new();
    reader
        .read_scope_with(|a| {
            while a.read()? {
                values.push(a.read_int8()?);
            }
            Ok(())
        })
        .unwrap();
    assert_eq!(values, [1, 2, 3]);
}

#[test]
fn checkpoint_resumes_at_the_same_field() {
    let mut row = person();
    RowWriter::write_buffer(&mut row, |w| {
        w.write_int32("a", 1)?;
        w.write_utf8("name", "n")?;
        w.write_utf8("b", "x")?;
        w.write_int64("c", 2)
    })
    .unwrap();

    let mut reader = RowReader::new(&row).unwrap();
    assert!(reader.read().unwrap());
    assert!(reader.read().unwrap());
    let checkpoint = reader.save_checkpoint();
    assert_eq!(checkpoint.state(), ReaderState::Schematized);
    assert!(checkpoint.column_index().is_some());

    let mut first = Vec::new();
    while reader.read().unwrap() {
        first.push(reader.path().unwrap().unwrap().to_string());
    }

    let mut resumed = RowReader::from_checkpoint(&row, checkpoint);
    assert_eq!(resumed.path().unwrap(), Some("name"));
    let mut second = Vec::new();
    while resumed.read().unwrap() {
        second.push(resumed.path().unwrap().unwrap().to_string());
    }
    assert_eq!(first, ["b", "c"]);
    assert_eq!(first, second);
}

#[test]
fn failed_scope_callback_propagates_its_error() {
    let mut row = person();
    let err = RowWriter::write_buffer(&mut row, |w| {
        w.write_scope("obj", &TypeArgument::object(), |_| Err(RowError::Failure))
    })
    .unwrap_err();
    assert_eq!(err, RowError::Failure);
}

#[test]
fn malformed_scope_type_is_a_type_constraint() {
    let mut row = person();
    let bogus = TypeArgument::with_args(LayoutType::TypedArray, Vec::<TypeArgument>::new());
    let err = RowWriter::write_buffer(&mut row, |w| w.write_scope("x", &bogus, |_| Ok(()))).unwrap_err();
    assert_eq!(err, RowError::TypeConstraint);
}

#[test]
fn bounded_rows_report_too_big() {
    let resolver = Arc::new(NamespaceResolver::new(contacts()));
    let layout = resolver.layout_by_name("Person").unwrap();
    let mut row = RowBuffer::builder()
        .resolver(resolver)
        .resizer(BoundedResizer::new(64))
        .initial_capacity(32)
        .build()
        .unwrap();
    row.init_layout(HYBRID_ROW_VERSION_V1, layout).unwrap();

    let big = "x".repeat(100);
    let err = RowWriter::write_buffer(&mut row, |w| w.write_utf8("b", &big)).unwrap_err();
    assert_eq!(err, RowError::TooBig);
    RowWriter::write_buffer(&mut row, |w| w.write_utf8("b", "fits")).unwrap();
}

#[test]
fn round_trip_through_bytes() {
    let mut row = person();
    RowWriter::write_buffer(&mut row, |w| {
        w.write_int32("a", -1)?;
        w.write_scope("tags", &TypeArgument::typed_array(utf8()), |t| t.write_utf8("", "t"))?;
        w.write_float64("f", f64::from_bits(0x7ff8_0000_0000_0001))
    })
    .unwrap();

    let copy = RowBuffer::from_bytes(row.as_bytes(), Arc::clone(row.resolver())).unwrap();
    let mut reader = RowReader::new(&copy).unwrap();
    assert!(reader.read().unwrap());
    assert_eq!(reader.read_int32().unwrap(), -1);
    assert!(reader.read().unwrap());
    reader.read_scope_with(|_| Ok(())).unwrap();
    assert!(reader.read().unwrap());
    assert_eq!(reader.read_float64().unwrap().to_bits(), 0x7ff8_0000_0000_0001);
}
