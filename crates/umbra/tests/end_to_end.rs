//! Full-stack tests against an actual SQLite engine, covering the read and
//! write paths through the shadow tables.

use pretty_assertions::assert_eq;
use umbra::query::{array, distance, full_text, number, text};
use umbra::schema::{ColumnKind, Schema, Table, VectorElement};
use umbra::stmt::{Direction, Row, Value};
use umbra::{row, Db};
use umbra_sqlite::SqliteConfig;

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
                .no_replace_on_upsert()
                .column("author", ColumnKind::foreign_key("authors"))
                .column("embedding", ColumnKind::vector(2, VectorElement::F32))
                .primary_key("id")
                .build(),
        )
        .build()
        .unwrap()
}

async fn in_memory_db() -> Db {
    let connection = SqliteConfig::in_memory().connect().unwrap();
    let db = Db::new(schema(), connection);
    db.create_tables().await.unwrap();
    db
}

fn notes() -> Vec<Row> {
    vec![
        row! {
            "id" => 1,
            "title" => "Morning pages",
            "body" => "walked along the river at dawn",
            "tags" => vec!["journal", "walk"],
            "starred" => true,
            "author" => 1,
            "embedding" => vec![0.0_f32, 0.0],
        },
        row! {
            "id" => 2,
            "title" => "Groceries",
            "body" => "milk eggs flour",
            "tags" => Vec::<&str>::new(),
            "starred" => false,
            "author" => 1,
            "embedding" => vec![1.0_f32, 0.0],
        },
        row! {
            "id" => 3,
            "title" => "Reading list",
            "body" => "finish the compilers book",
            "tags" => vec!["books"],
            "starred" => false,
            "author" => 1,
            "embedding" => vec![10.0_f32, 10.0],
        },
    ]
}

async fn seeded_db() -> Db {
    let db = in_memory_db().await;
    db.insert_row("authors", row! { "id" => 1, "name" => "ada" })
        .await
        .unwrap();
    db.insert_rows("notes", notes()).await.unwrap();
    db
}

#[tokio::test]
async fn round_trip_preserves_typed_values() {
    let db = seeded_db().await;

    let note = db
        .from_table("notes")
        .filter(number("id").equals(1))
        .one()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        note,
        row! {
            "id" => 1,
            "title" => "Morning pages",
            "body" => "walked along the river at dawn",
            "tags" => vec!["journal", "walk"],
            "starred" => true,
            "author" => 1,
            "$distance_embedding" => Value::Null,
        }
    );
}

#[tokio::test]
async fn select_one_and_exists() {
    let db = seeded_db().await;

    assert!(db
        .from_table("notes")
        .filter(text("title").equals("Groceries"))
        .exists()
        .await
        .unwrap());
    assert!(!db
        .from_table("notes")
        .filter(text("title").equals("nope"))
        .exists()
        .await
        .unwrap());

    let starred = db
        .from_table("notes")
        .filter(umbra::query::boolean("starred").is(true))
        .all()
        .await
        .unwrap();
    assert_eq!(starred.len(), 1);
    assert_eq!(starred[0]["id"], Value::I64(1));
}

#[tokio::test]
async fn full_text_match_finds_substrings() {
    let db = seeded_db().await;

    let hits = db
        .from_table("notes")
        .filter(full_text("body").matches("dawn"))
        .all()
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["id"], Value::I64(1));

    // Two tokens, both required.
    let hits = db
        .from_table("notes")
        .filter(full_text("body").matches("river dawn"))
        .all()
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);

    let hits = db
        .from_table("notes")
        .filter(full_text("body").matches("river pancake"))
        .all()
        .await
        .unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn short_full_text_queries_match_by_prefix() {
    let db = seeded_db().await;

    // "mi" cannot form a trigram; it matches bodies starting with "mi".
    let hits = db
        .from_table("notes")
        .filter(full_text("body").matches("mi"))
        .all()
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["id"], Value::I64(2));
}

#[tokio::test]
async fn flexible_match_is_a_subsequence_search() {
    let db = seeded_db().await;

    let hits = db
        .from_table("notes")
        .filter(text("title").flexibly_matches("rdg lst"))
        .all()
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["id"], Value::I64(3));
}

#[tokio::test]
async fn vector_query_ranks_by_distance() {
    let db = seeded_db().await;

    let hits = db
        .from_table("notes")
        .nearest("embedding", vec![0.1_f32, 0.0], 2)
        .order_by("$distance(embedding)", Direction::Asc)
        .all()
        .await
        .unwrap();

    // Every row surfaces; the two nearest carry real distances, the rest the
    // far sentinel.
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0]["id"], Value::I64(1));
    assert_eq!(hits[1]["id"], Value::I64(2));
    assert_eq!(hits[2]["id"], Value::I64(3));

    let d0 = hits[0]["$distance_embedding"].as_f64().unwrap();
    let d1 = hits[1]["$distance_embedding"].as_f64().unwrap();
    let d2 = hits[2]["$distance_embedding"].as_f64().unwrap();
    assert!((d0 - 0.1).abs() < 1e-4);
    assert!((d1 - 0.9).abs() < 1e-4);
    assert!(d2.is_infinite());
}

#[tokio::test]
async fn distance_filter_excludes_non_matches() {
    let db = seeded_db().await;

    let hits = db
        .from_table("notes")
        .nearest("embedding", vec![0.1_f32, 0.0], 2)
        .filter(distance("embedding").less_than(5.0))
        .all()
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
}

async fn matching_ids(db: &Db, filter: umbra::stmt::Condition) -> Vec<i64> {
    let hits = db.from_table("notes").filter(filter).all().await.unwrap();
    let mut ids: Vec<i64> = hits
        .into_iter()
        .map(|row| row["id"].as_i64().unwrap())
        .collect();
    ids.sort_unstable();
    ids
}

#[tokio::test]
async fn array_operators() {
    let db = seeded_db().await;

    assert_eq!(matching_ids(&db, array("tags").contains("journal")).await, vec![1]);
    assert_eq!(matching_ids(&db, array("tags").is_empty()).await, vec![2]);
    assert_eq!(matching_ids(&db, array("tags").not_empty()).await, vec![1, 3]);
    assert_eq!(
        matching_ids(
            &db,
            array("tags").contains_any_of(vec!["books".into(), "journal".into()])
        )
        .await,
        vec![1, 3]
    );
    assert_eq!(
        matching_ids(
            &db,
            array("tags").contains_all_of(vec!["journal".into(), "walk".into()])
        )
        .await,
        vec![1]
    );
    assert_eq!(
        matching_ids(&db, array("tags").does_not_contain("journal")).await,
        vec![2, 3]
    );
}

#[tokio::test]
async fn foreign_key_filters_and_resolution() {
    let db = seeded_db().await;

    let hits = db
        .from_table("notes")
        .filter(text("author.name").equals("ada"))
        .all()
        .await
        .unwrap();
    assert_eq!(hits.len(), 3);

    let resolved = db
        .resolve_foreign_keys("notes", hits)
        .await
        .unwrap();
    assert_eq!(resolved.len(), 3);
    for note in &resolved {
        assert_eq!(
            note["author"],
            Value::Record(row! { "id" => 1, "name" => "ada" })
        );
    }
}

#[tokio::test]
async fn upsert_updates_but_keeps_protected_columns() {
    let db = seeded_db().await;

    db.upsert_row(
        "notes",
        row! {
            "id" => 1,
            "title" => "Morning pages, revised",
            "body" => "rewrote the opening",
            "tags" => vec!["journal"],
            "starred" => false,
            "author" => 1,
            "embedding" => vec![0.5_f32, 0.5],
        },
    )
    .await
    .unwrap();

    let note = db
        .from_table("notes")
        .filter(number("id").equals(1))
        .one()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(note["title"], Value::String("Morning pages, revised".into()));
    assert_eq!(note["body"], Value::String("rewrote the opening".into()));
    // `starred` opts out of replacement, so the original value survives.
    assert_eq!(note["starred"], Value::Bool(true));

    // The full-text shadow was refreshed along with the main row.
    let hits = db
        .from_table("notes")
        .filter(full_text("body").matches("rewrote"))
        .all()
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    let hits = db
        .from_table("notes")
        .filter(full_text("body").matches("dawn"))
        .all()
        .await
        .unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn upsert_inserts_missing_rows() {
    let db = seeded_db().await;

    db.upsert_row(
        "notes",
        row! {
            "id" => 4,
            "title" => "New",
            "body" => "fresh",
            "tags" => Vec::<&str>::new(),
            "starred" => false,
            "author" => 1,
            "embedding" => vec![2.0_f32, 2.0],
        },
    )
    .await
    .unwrap();

    assert!(db
        .from_table("notes")
        .filter(number("id").equals(4))
        .exists()
        .await
        .unwrap());
}

#[tokio::test]
async fn update_touches_only_provided_columns() {
    let db = seeded_db().await;

    db.update_row("notes", row! { "id" => 2, "starred" => true })
        .await
        .unwrap();

    let note = db
        .from_table("notes")
        .filter(number("id").equals(2))
        .one()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(note["starred"], Value::Bool(true));
    assert_eq!(note["title"], Value::String("Groceries".into()));
    assert_eq!(note["body"], Value::String("milk eggs flour".into()));
}

#[tokio::test]
async fn delete_where_removes_shadow_rows_too() {
    let db = seeded_db().await;

    let deleted = db
        .from_table("notes")
        .filter(text("title").equals("Groceries"))
        .delete()
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    let stats = db.db_stat().await.unwrap();
    assert_eq!(stats["notes"], 2);
    assert_eq!(stats["notes_fts5"], 2);
    assert_eq!(stats["notes_vector"], 2);
    assert_eq!(stats["authors"], 1);
}

#[tokio::test]
async fn garbage_collect_reclaims_out_of_band_deletes() {
    use umbra_core::driver::SqlStatement;
    use umbra_core::Connection;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.sqlite");

    {
        let connection = SqliteConfig::file(&path).connect().unwrap();
        let db = Db::new(schema(), connection);
        db.create_tables().await.unwrap();
        db.insert_row("authors", row! { "id" => 1, "name" => "ada" })
            .await
            .unwrap();
        db.insert_rows("notes", notes()).await.unwrap();
        db.close().await;
    }

    // A writer that bypasses the layer leaves the shadows stale.
    {
        let mut raw = SqliteConfig::file(&path).connect().unwrap();
        raw.execute(&SqlStatement::new(
            "DELETE FROM \"notes\" WHERE \"id\" = ?1",
            vec![Value::I64(1)],
        ))
        .await
        .unwrap();
        raw.close();
    }

    let connection = SqliteConfig::file(&path).connect().unwrap();
    let db = Db::new(schema(), connection);
    db.create_tables().await.unwrap();

    let reclaimed = db.garbage_collect("notes").await.unwrap();
    assert_eq!(reclaimed["notes_fts5"], 1);
    assert_eq!(reclaimed["notes_vector"], 1);

    // A second pass finds nothing left to reclaim.
    let reclaimed = db.garbage_collect("notes").await.unwrap();
    assert_eq!(reclaimed["notes_fts5"], 0);
    assert_eq!(reclaimed["notes_vector"], 0);

    let stats = db.db_stat().await.unwrap();
    assert_eq!(stats["notes"], 2);
    assert_eq!(stats["notes_fts5"], 2);
    assert_eq!(stats["notes_vector"], 2);
}
