//! A tour of the data-access layer: relational filters, full-text search
//! and vector similarity over one small notes schema.

use umbra::query::{array, distance, full_text, number, text};
use umbra::schema::{ColumnKind, Schema, Table, VectorElement};
use umbra::stmt::Direction;
use umbra::{row, Db};
use umbra_sqlite::SqliteConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let schema = Schema::builder()
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
                .column("author", ColumnKind::foreign_key("authors"))
                .column("embedding", ColumnKind::vector(3, VectorElement::F32))
                .primary_key("id")
                .build(),
        )
        .build()?;

    let db = Db::new(schema, SqliteConfig::in_memory().connect()?);
    db.create_tables().await?;

    db.observe("notes", |event| println!(" -> observed {event:?}"))
        .await;

    println!("==> inserting an author and some notes");
    db.insert_row("authors", row! { "id" => 1, "name" => "ada" })
        .await?;
    db.insert_rows(
        "notes",
        vec![
            row! {
                "id" => 1,
                "title" => "Morning pages",
                "body" => "walked along the river at dawn, saw two herons",
                "tags" => vec!["journal", "walk"],
                "author" => 1,
                "embedding" => vec![0.1_f32, 0.9, 0.2],
            },
            row! {
                "id" => 2,
                "title" => "Compiler notes",
                "body" => "register allocation is graph coloring in disguise",
                "tags" => vec!["work"],
                "author" => 1,
                "embedding" => vec![0.8_f32, 0.1, 0.4],
            },
            row! {
                "id" => 3,
                "title" => "Groceries",
                "body" => "milk, eggs, coffee beans",
                "tags" => Vec::<&str>::new(),
                "author" => 1,
                "embedding" => vec![0.4_f32, 0.4, 0.4],
            },
        ],
    )
    .await?;

    println!("==> notes tagged `journal`, newest first");
    let hits = db
        .from_table("notes")
        .filter(array("tags").contains("journal"))
        .order_by("id", Direction::Desc)
        .all()
        .await?;
    for note in &hits {
        println!(" -> {:?} {:?}", note["id"], note["title"]);
    }

    println!("==> full-text search for `heron`");
    let hits = db
        .from_table("notes")
        .filter(full_text("body").matches("heron"))
        .all()
        .await?;
    for note in &hits {
        println!(" -> {:?} {:?}", note["id"], note["title"]);
    }

    println!("==> two nearest notes to [0.7, 0.2, 0.4]");
    let hits = db
        .from_table("notes")
        .nearest("embedding", vec![0.7_f32, 0.2, 0.4], 2)
        .filter(distance("embedding").less_than(2.0))
        .order_by("$distance(embedding)", Direction::Asc)
        .all()
        .await?;
    for note in &hits {
        println!(
            " -> {:?} {:?} (distance {:?})",
            note["id"], note["title"], note["$distance_embedding"]
        );
    }

    println!("==> notes written by `ada`, resolved");
    let hits = db
        .from_table("notes")
        .filter(text("author.name").equals("ada"))
        .all()
        .await?;
    let resolved = db.resolve_foreign_keys("notes", hits).await?;
    println!(" -> {} notes", resolved.len());

    println!("==> deleting note 3 and collecting garbage");
    let deleted = db
        .from_table("notes")
        .filter(number("id").equals(3))
        .delete()
        .await?;
    println!(" -> deleted {deleted}");
    let reclaimed = db.garbage_collect("notes").await?;
    println!(" -> reclaimed {reclaimed:?}");

    for (table, rows) in db.db_stat().await? {
        println!(" -> {table}: {rows} rows");
    }

    db.close().await;
    Ok(())
}
