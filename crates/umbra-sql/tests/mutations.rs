use pretty_assertions::assert_eq;

use umbra_core::row;
use umbra_core::schema::{ColumnKind, Schema, Table, VectorElement};
use umbra_core::stmt::Value;
use umbra_sql::Compiler;

fn schema() -> Schema {
    Schema::builder()
        .table(
            Table::builder("authors")
                .column("id", ColumnKind::Number)
                .column("name", ColumnKind::String)
                .primary_key("id")
                .build(),
        )
        .table(
            Table::builder("notes")
                .column("id", ColumnKind::Number)
                .column("title", ColumnKind::String)
                .column("body", ColumnKind::FullText)
                .column("tags", ColumnKind::StringArray)
                .column("starred", ColumnKind::Bool)
                .column("author", ColumnKind::foreign_key("authors"))
                .column("embedding", ColumnKind::vector(2, VectorElement::F32))
                .primary_key("id")
                .build(),
        )
        .build()
        .unwrap()
}

fn le_blob(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

#[test]
fn insert_fans_out_to_shadows() {
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let rows = vec![row! {
        "id" => 1,
        "title" => "morning pages",
        "body" => "hello there",
        "tags" => vec!["journal"],
        "starred" => true,
        "author" => 7,
        "embedding" => vec![1.0f32, -2.0],
    }];

    let statements = compiler.insert_rows("notes", &rows).unwrap();
    assert_eq!(statements.len(), 3);

    assert_eq!(
        statements[0].sql,
        "INSERT INTO \"notes\" (\"id\", \"title\", \"tags\", \"starred\", \"author\") \
         VALUES (?1, ?2, json(?3), ?4, ?5)"
    );
    assert_eq!(
        statements[0].params,
        vec![
            Value::I64(1),
            Value::String("morning pages".into()),
            Value::String("[\"journal\"]".into()),
            Value::I64(1),
            Value::I64(7),
        ]
    );

    assert_eq!(
        statements[1].sql,
        "INSERT INTO \"notes_fts5\" (\"originPK\", \"body\") VALUES (?1, ?2)"
    );
    assert_eq!(
        statements[1].params,
        vec![Value::I64(1), Value::String("hello there".into())]
    );

    assert_eq!(
        statements[2].sql,
        "INSERT INTO \"notes_vector\" (\"originPK\", \"embedding\") VALUES (?1, ?2)"
    );
    assert_eq!(
        statements[2].params,
        vec![Value::I64(1), Value::Blob(le_blob(&[1.0, -2.0]))]
    );
}

#[test]
fn insert_skips_shadow_rows_without_values() {
    // No full-text value and a missing vector: the main insert still binds
    // NULL for absent columns, but no shadow statements are produced.
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let rows = vec![row! { "id" => 2, "title" => "untitled" }];
    let statements = compiler.insert_rows("notes", &rows).unwrap();

    assert_eq!(statements.len(), 1);
    assert_eq!(
        statements[0].params,
        vec![
            Value::I64(2),
            Value::String("untitled".into()),
            Value::Null,
            Value::Null,
            Value::Null,
        ]
    );
}

#[test]
fn insert_requires_primary_key() {
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let rows = vec![row! { "title" => "no key" }];
    let err = compiler.insert_rows("notes", &rows).unwrap_err();
    assert!(err.is_query_compile());
}

#[test]
fn multi_row_insert_numbers_placeholders_in_order() {
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let rows = vec![
        row! { "id" => 1, "name" => "Ada" },
        row! { "id" => 2, "name" => "Grace" },
    ];
    let statements = compiler.insert_rows("authors", &rows).unwrap();

    assert_eq!(statements.len(), 1);
    assert_eq!(
        statements[0].sql,
        "INSERT INTO \"authors\" (\"id\", \"name\") VALUES (?1, ?2), (?3, ?4)"
    );
}

#[test]
fn upsert_replaces_columns_and_refreshes_shadows() {
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let rows = vec![row! {
        "id" => 1,
        "title" => "revised",
        "body" => "updated text",
        "embedding" => vec![0.5f32, 0.5],
    }];

    let statements = compiler.upsert_rows("notes", &rows).unwrap();
    assert_eq!(statements.len(), 5);

    assert_eq!(
        statements[0].sql,
        "INSERT INTO \"notes\" (\"id\", \"title\", \"tags\", \"starred\", \"author\") \
         VALUES (?1, ?2, json(?3), ?4, ?5) \
         ON CONFLICT (\"id\") DO UPDATE SET \"title\" = excluded.\"title\", \
         \"tags\" = excluded.\"tags\", \"starred\" = excluded.\"starred\", \
         \"author\" = excluded.\"author\""
    );
    assert_eq!(
        statements[1].sql,
        "DELETE FROM \"notes_fts5\" WHERE \"originPK\" IN (?1)"
    );
    assert_eq!(
        statements[2].sql,
        "INSERT INTO \"notes_fts5\" (\"originPK\", \"body\") VALUES (?1, ?2)"
    );
    assert_eq!(
        statements[3].sql,
        "DELETE FROM \"notes_vector\" WHERE \"originPK\" IN (?1)"
    );
    assert_eq!(
        statements[4].sql,
        "INSERT INTO \"notes_vector\" (\"originPK\", \"embedding\") VALUES (?1, ?2)"
    );
}

#[test]
fn upsert_deletes_stale_shadow_rows_even_without_new_values() {
    // The new payload carries no full-text or vector values, but older
    // shadow rows for the same key must still go away.
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let rows = vec![row! { "id" => 1, "title" => "plain" }];
    let statements = compiler.upsert_rows("notes", &rows).unwrap();

    assert_eq!(statements.len(), 3);
    assert_eq!(
        statements[1].sql,
        "DELETE FROM \"notes_fts5\" WHERE \"originPK\" IN (?1)"
    );
    assert_eq!(
        statements[2].sql,
        "DELETE FROM \"notes_vector\" WHERE \"originPK\" IN (?1)"
    );
}

#[test]
fn upsert_honors_no_replace_columns() {
    let schema = Schema::builder()
        .table(
            Table::builder("documents")
                .column("id", ColumnKind::String)
                .column("created_at", ColumnKind::Number)
                .no_replace_on_upsert()
                .column("title", ColumnKind::String)
                .primary_key("id")
                .build(),
        )
        .build()
        .unwrap();
    let compiler = Compiler::new(&schema);

    let rows = vec![row! { "id" => "a", "created_at" => 1, "title" => "x" }];
    let statements = compiler.upsert_rows("documents", &rows).unwrap();

    assert_eq!(
        statements[0].sql,
        "INSERT INTO \"documents\" (\"id\", \"created_at\", \"title\") VALUES (?1, ?2, ?3) \
         ON CONFLICT (\"id\") DO UPDATE SET \"title\" = excluded.\"title\""
    );
}

#[test]
fn upsert_degrades_to_do_nothing() {
    let schema = Schema::builder()
        .table(
            Table::builder("seen")
                .column("id", ColumnKind::String)
                .column("first_seen", ColumnKind::Number)
                .no_replace_on_upsert()
                .primary_key("id")
                .build(),
        )
        .build()
        .unwrap();
    let compiler = Compiler::new(&schema);

    let rows = vec![row! { "id" => "a", "first_seen" => 1 }];
    let statements = compiler.upsert_rows("seen", &rows).unwrap();

    assert_eq!(
        statements[0].sql,
        "INSERT INTO \"seen\" (\"id\", \"first_seen\") VALUES (?1, ?2) \
         ON CONFLICT (\"id\") DO NOTHING"
    );
}

#[test]
fn update_compiles_only_touched_stores() {
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let rows = vec![row! { "id" => 1, "title" => "renamed" }];
    let statements = compiler.update_rows("notes", &rows).unwrap();
    assert_eq!(statements.len(), 1);
    assert_eq!(
        statements[0].sql,
        "UPDATE \"notes\" SET \"title\" = ?1 WHERE \"id\" = ?2"
    );
    assert_eq!(
        statements[0].params,
        vec![Value::String("renamed".into()), Value::I64(1)]
    );

    let rows = vec![row! { "id" => 1, "body" => "new text" }];
    let statements = compiler.update_rows("notes", &rows).unwrap();
    assert_eq!(statements.len(), 1);
    assert_eq!(
        statements[0].sql,
        "UPDATE \"notes_fts5\" SET \"body\" = ?1 WHERE \"originPK\" = ?2"
    );

    let rows = vec![row! { "id" => 1 }];
    let statements = compiler.update_rows("notes", &rows).unwrap();
    assert!(statements.is_empty());
}

#[test]
fn full_text_values_fold_smart_quotes() {
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let rows = vec![row! {
        "id" => 1,
        "body" => "\u{2018}tis \u{201C}quoted\u{201D}",
    }];
    let statements = compiler.update_rows("notes", &rows).unwrap();
    assert_eq!(
        statements[0].params[0],
        Value::String("'tis \"quoted\"".into())
    );
}

#[test]
fn delete_targets_main_and_shadows() {
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let keys = vec![Value::I64(1), Value::I64(2)];
    let statements = compiler.delete_rows("notes", &keys).unwrap();

    assert_eq!(statements.len(), 3);
    assert_eq!(
        statements[0].sql,
        "DELETE FROM \"notes\" WHERE \"id\" IN (?1, ?2)"
    );
    assert_eq!(
        statements[1].sql,
        "DELETE FROM \"notes_fts5\" WHERE \"originPK\" IN (?1, ?2)"
    );
    assert_eq!(
        statements[2].sql,
        "DELETE FROM \"notes_vector\" WHERE \"originPK\" IN (?1, ?2)"
    );
    assert_eq!(statements[0].params, keys);

    assert!(compiler.delete_rows("notes", &[]).unwrap().is_empty());
}

#[test]
fn unknown_field_is_rejected() {
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let rows = vec![row! { "id" => 1, "nope" => "x" }];
    let err = compiler.insert_rows("notes", &rows).unwrap_err();
    assert!(err.is_query_compile());
}
