use pretty_assertions::assert_eq;

use umbra_core::schema::{ColumnKind, Schema, Table, VectorElement};
use umbra_core::stmt::{Condition, Direction, Operator, OrderBy, Query, Value, VectorQuery};
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
                .column("embedding", ColumnKind::vector(3, VectorElement::F32))
                .primary_key("id")
                .build(),
        )
        .build()
        .unwrap()
}

const PROJECTION: &str = "SELECT \"notes\".\"id\", \"notes\".\"title\", \
     \"notes_fts5\".\"body\" AS \"body\", \"notes\".\"tags\", \"notes\".\"starred\", \
     \"notes\".\"author\", NULL AS \"$distance_embedding\" FROM \"notes\" \
     LEFT JOIN \"notes_fts5\" ON \"notes_fts5\".\"originPK\" = \"notes\".\"id\"";

#[test]
fn filter_and_limit() {
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let mut query = Query::new("notes");
    query.filter = Some(Condition::cmp("title", Operator::Equals, "morning pages"));
    query.limit = Some(10);

    let statement = compiler.select(&query).unwrap();
    assert_eq!(
        statement.sql,
        format!("{PROJECTION} WHERE \"notes\".\"title\" = ?1 LIMIT ?2")
    );
    assert_eq!(
        statement.params,
        vec![Value::String("morning pages".into()), Value::I64(10)]
    );
}

#[test]
fn foreign_key_reference_joins_target() {
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let mut query = Query::new("notes");
    query.filter = Some(Condition::cmp("author.name", Operator::Equals, "Ada"));

    let statement = compiler.select(&query).unwrap();
    assert_eq!(
        statement.sql,
        format!(
            "{PROJECTION} INNER JOIN \"authors\" AS \"author_ref\" \
             ON \"author_ref\".\"id\" = \"notes\".\"author\" \
             WHERE \"author_ref\".\"name\" = ?1"
        )
    );
    assert_eq!(statement.params, vec![Value::String("Ada".into())]);
}

#[test]
fn order_by_foreign_key_reference_joins_once() {
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let mut query = Query::new("notes");
    query.filter = Some(Condition::cmp("author.name", Operator::NotEquals, "Ada"));
    query.order_by = Some(OrderBy {
        column: "author.name".into(),
        direction: Direction::Desc,
    });

    let statement = compiler.select(&query).unwrap();
    assert_eq!(
        statement.sql,
        format!(
            "{PROJECTION} INNER JOIN \"authors\" AS \"author_ref\" \
             ON \"author_ref\".\"id\" = \"notes\".\"author\" \
             WHERE \"author_ref\".\"name\" != ?1 \
             ORDER BY \"author_ref\".\"name\" DESC"
        )
    );
}

#[test]
fn full_text_match_uses_fts_subquery() {
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let mut query = Query::new("notes");
    query.filter = Some(Condition::cmp("body", Operator::Matches, "hello world"));

    let statement = compiler.select(&query).unwrap();
    assert_eq!(
        statement.sql,
        format!(
            "{PROJECTION} WHERE \"notes\".\"id\" IN \
             (SELECT \"originPK\" FROM \"notes_fts5\" WHERE \"notes_fts5\" MATCH ?1)"
        )
    );
    assert_eq!(
        statement.params,
        vec![Value::String("body : (\"hello\" \"world\")".into())]
    );
}

#[test]
fn short_full_text_match_falls_back_to_prefix_like() {
    // "ab" cannot form a trigram token, so MATCH would never hit.
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let mut query = Query::new("notes");
    query.filter = Some(Condition::cmp("body", Operator::Matches, "ab"));

    let statement = compiler.select(&query).unwrap();
    assert_eq!(
        statement.sql,
        format!(
            "{PROJECTION} WHERE \"notes\".\"id\" IN \
             (SELECT \"originPK\" FROM \"notes_fts5\" WHERE \"body\" LIKE ?1)"
        )
    );
    assert_eq!(statement.params, vec![Value::String("ab%".into())]);
}

#[test]
fn vector_query_compiles_matches_cte() {
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let mut query = Query::new("notes");
    query.vector = Some(VectorQuery::new(2).vector("embedding", vec![1.0f32, 0.0, 0.0]));
    query.filter = Some(Condition::cmp(
        "$distance(embedding)",
        Operator::LessThan,
        0.5,
    ));
    query.order_by = Some(OrderBy {
        column: "$distance(embedding)".into(),
        direction: Direction::Asc,
    });

    let statement = compiler.select(&query).unwrap();
    assert_eq!(
        statement.sql,
        "WITH \"embedding_matches\" AS (SELECT \"notes_vector\".\"originPK\" AS \"originPK\", \
         \"notes_vector\".\"embedding\" AS \"embedding\", \
         \"notes_vector\".\"distance\" AS \"distance\" FROM \"notes_vector\" \
         INNER JOIN \"notes\" ON \"notes\".\"id\" = \"notes_vector\".\"originPK\" \
         WHERE \"notes_vector\".\"embedding\" MATCH ?1 AND k = 2) \
         SELECT \"notes\".\"id\", \"notes\".\"title\", \"notes_fts5\".\"body\" AS \"body\", \
         \"notes\".\"tags\", \"notes\".\"starred\", \"notes\".\"author\", \
         COALESCE(\"embedding_matches\".\"distance\", 1e999) AS \"$distance_embedding\" \
         FROM \"notes\" \
         LEFT JOIN \"notes_fts5\" ON \"notes_fts5\".\"originPK\" = \"notes\".\"id\" \
         LEFT JOIN \"embedding_matches\" ON \"embedding_matches\".\"originPK\" = \"notes\".\"id\" \
         WHERE COALESCE(\"embedding_matches\".\"distance\", 1e999) < ?2 \
         ORDER BY \"$distance_embedding\" ASC"
    );

    let blob: Vec<u8> = [1.0f32, 0.0, 0.0]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();
    assert_eq!(statement.params, vec![Value::Blob(blob), Value::F64(0.5)]);
}

#[test]
fn distance_filter_without_vector_query_is_rejected() {
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let mut query = Query::new("notes");
    query.filter = Some(Condition::cmp(
        "$distance(embedding)",
        Operator::LessThan,
        0.5,
    ));

    let err = compiler.select(&query).unwrap_err();
    assert!(err.is_query_compile());
}

#[test]
fn empty_groups_and_lists_compile_to_constants() {
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let mut query = Query::new("notes");
    query.filter = Some(Condition::any([]));
    let statement = compiler.select(&query).unwrap();
    assert_eq!(statement.sql, format!("{PROJECTION} WHERE 1 = 1"));

    let mut query = Query::new("notes");
    query.filter = Some(Condition::cmp(
        "id",
        Operator::EqualsAnyOf,
        Vec::<Value>::new(),
    ));
    let statement = compiler.select(&query).unwrap();
    assert_eq!(statement.sql, format!("{PROJECTION} WHERE 1 = 0"));
    assert!(statement.params.is_empty());
}

#[test]
fn array_operators_use_json_each() {
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let mut query = Query::new("notes");
    query.filter = Some(Condition::cmp(
        "tags",
        Operator::ArrayContainsAnyOf,
        vec!["a", "b"],
    ));

    let statement = compiler.select(&query).unwrap();
    assert_eq!(
        statement.sql,
        format!(
            "{PROJECTION} WHERE EXISTS (SELECT 1 FROM json_each(\"notes\".\"tags\") \
             WHERE json_each.value IN (?1, ?2))"
        )
    );
}

#[test]
fn unsupported_operator_is_rejected_per_kind() {
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let mut query = Query::new("notes");
    query.filter = Some(Condition::cmp("tags", Operator::GreaterThan, 3));

    let err = compiler.select(&query).unwrap_err();
    assert!(err.is_unsupported_operator());
    assert_eq!(
        err.to_string(),
        "operator `greaterThan` is not supported for `notes.tags`"
    );
}

#[test]
fn select_by_primary_keys_lists_keys() {
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let statement = compiler
        .select_by_primary_keys("notes", &[Value::I64(1), Value::I64(2)])
        .unwrap();
    assert_eq!(
        statement.sql,
        format!("{PROJECTION} WHERE \"notes\".\"id\" IN (?1, ?2)")
    );

    let statement = compiler.select_by_primary_keys("notes", &[]).unwrap();
    assert_eq!(statement.sql, format!("{PROJECTION} WHERE 1 = 0"));
}

#[test]
fn recompilation_yields_identical_text() {
    // Statement text must be stable so the adapter's prepared-statement
    // cache actually hits.
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let mut query = Query::new("notes");
    query.filter = Some(
        Condition::cmp("starred", Operator::Equals, true)
            .and(Condition::cmp("author.name", Operator::Equals, "Ada")),
    );
    query.order_by = Some(OrderBy {
        column: "title".into(),
        direction: Direction::Asc,
    });
    query.limit = Some(5);

    let first = compiler.select(&query).unwrap();
    let second = compiler.select(&query).unwrap();
    assert_eq!(first.sql, second.sql);
}

#[test]
fn query_vector_dimension_mismatch_is_rejected() {
    let schema = schema();
    let compiler = Compiler::new(&schema);

    let mut query = Query::new("notes");
    query.vector = Some(VectorQuery::new(4).vector("embedding", vec![1.0f32, 0.0]));

    let err = compiler.select(&query).unwrap_err();
    assert!(err.is_query_compile());
    assert!(err.to_string().contains("expects dimension 3"));
}
