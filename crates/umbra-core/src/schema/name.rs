//! Naming conventions for derived database objects.
//!
//! Every physical name umbra derives from a logical schema comes from this
//! module, so the mapping stays in one place: shadow tables, constraint
//! names, join aliases and the serialized distance fields.

/// Column holding the owning row's primary key in shadow tables.
pub const ORIGIN_PK: &str = "originPK";

/// Prefix of serialized distance fields.
pub const DISTANCE_PREFIX: &str = "$distance_";

/// Name of the full-text shadow table for `table`.
pub fn fts_table(table: &str) -> String {
    format!("{table}_fts5")
}

/// Name of the vector shadow table for `table`.
pub fn vector_table(table: &str) -> String {
    format!("{table}_vector")
}

/// Name of the primary-key constraint for `table`.
pub fn pk_constraint(table: &str) -> String {
    format!("{table}_pk")
}

/// Name of the foreign-key constraint for `table`.`column`.
pub fn fk_constraint(table: &str, column: &str) -> String {
    format!("{table}_{column}_fk")
}

/// Serialized field carrying the match distance for vector column `column`.
pub fn distance_field(column: &str) -> String {
    format!("{DISTANCE_PREFIX}{column}")
}

/// Condition reference selecting the distance of vector column `column`.
pub fn distance_ref(column: &str) -> String {
    format!("$distance({column})")
}

/// Join alias for the table referenced by foreign-key column `column`.
pub fn fk_join_alias(column: &str) -> String {
    format!("{column}_ref")
}

/// Alias of the per-column CTE holding vector matches for `column`.
pub fn vector_matches_alias(column: &str) -> String {
    format!("{column}_matches")
}
