//! Compiles condition trees into SQL boolean expressions.
//!
//! Reference resolution decides which physical column a leaf applies to:
//! plain names stay on the queried table, `fk.remote` names jump to the
//! referenced table through an inner join collected as a side effect, and
//! `$distance(col)` names the match distance of a vector query's CTE.
//! Operator dispatch is keyed on the resolved column's kind; a mismatch is an
//! error, never a silent no-op.

use crate::serializer::{Formatter, Ident, Params, ToSql};

use umbra_core::schema::{name, ColumnKind, Schema, Table};
use umbra_core::stmt::{ColumnRef, Condition, Operator, Value};
use umbra_core::{Error, Result};

use indexmap::IndexMap;

/// An inner join required by a foreign-key-qualified reference.
pub(crate) struct FkJoin {
    /// Referenced table
    pub(crate) target: String,

    /// Foreign-key column on the queried table
    pub(crate) column: String,
}

/// Compilation context for one query's condition tree.
pub(crate) struct ConditionCx<'a> {
    schema: &'a Schema,
    table: &'a Table,

    /// Vector columns with a matches CTE available in this query
    queried_vectors: Vec<String>,

    /// Joins required so far, keyed by alias
    pub(crate) fk_joins: IndexMap<String, FkJoin>,
}

/// A fully qualified column, `"alias"."column"`.
struct ColumnExpr<'a>(&'a str, &'a str);

impl ToSql for &ColumnExpr<'_> {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) {
        fmt!(f, Ident(self.0), '.', Ident(self.1));
    }
}

/// A leaf's column after reference resolution.
struct Resolved<'a> {
    /// Table the column lives on
    table: &'a Table,

    /// Alias the table is joined under (the table name itself for the
    /// queried table)
    alias: &'a str,

    column: &'a str,
    kind: &'a ColumnKind,
}

impl<'a> ConditionCx<'a> {
    pub(crate) fn new(
        schema: &'a Schema,
        table: &'a Table,
        queried_vectors: Vec<String>,
    ) -> ConditionCx<'a> {
        ConditionCx {
            schema,
            table,
            queried_vectors,
            fk_joins: IndexMap::new(),
        }
    }

    /// Serializes `condition` into `f`, registering joins on the way.
    pub(crate) fn compile<P: Params>(
        &mut self,
        condition: &Condition,
        f: &mut Formatter<'_, P>,
    ) -> Result<()> {
        match condition {
            Condition::Where { column, op, value } => self.leaf(column, *op, value, f),
            Condition::All(items) => self.group(items, " AND ", f),
            Condition::Any(items) => self.group(items, " OR ", f),
        }
    }

    /// An empty group is the identity for AND and is treated the same way
    /// under OR, so filters assembled from optional pieces never change
    /// meaning when a piece is absent.
    fn group<P: Params>(
        &mut self,
        items: &[Condition],
        sep: &'static str,
        f: &mut Formatter<'_, P>,
    ) -> Result<()> {
        if items.is_empty() {
            fmt!(f, "1 = 1");
            return Ok(());
        }

        fmt!(f, '(');
        let mut s = "";
        for item in items {
            fmt!(f, s);
            self.compile(item, f)?;
            s = sep;
        }
        fmt!(f, ')');
        Ok(())
    }

    fn leaf<P: Params>(
        &mut self,
        raw: &str,
        op: Operator,
        value: &Value,
        f: &mut Formatter<'_, P>,
    ) -> Result<()> {
        match ColumnRef::parse(raw) {
            ColumnRef::Direct(column) => {
                let ty = self.table.column(&column)?;
                let resolved = Resolved {
                    table: self.table,
                    alias: &self.table.name,
                    column: &column,
                    kind: &ty.kind,
                };
                self.column_leaf(resolved, raw, op, value, f)
            }
            ColumnRef::Foreign { column, remote } => {
                let ty = self.table.column(&column)?;
                let Some(target) = ty.foreign_key_target() else {
                    return Err(Error::query_compile(format!(
                        "`{}`.`{column}` is not a foreign-key column",
                        self.table.name
                    )));
                };
                let target = self.schema.table(target)?;
                let alias = name::fk_join_alias(&column);
                self.fk_joins.entry(alias.clone()).or_insert(FkJoin {
                    target: target.name.clone(),
                    column: column.clone(),
                });

                let ty = target.column(&remote)?;
                let resolved = Resolved {
                    table: target,
                    alias: &alias,
                    column: &remote,
                    kind: &ty.kind,
                };
                self.column_leaf(resolved, raw, op, value, f)
            }
            ColumnRef::Distance(column) => self.distance_leaf(&column, raw, op, value, f),
        }
    }

    fn column_leaf<P: Params>(
        &self,
        rc: Resolved<'_>,
        raw: &str,
        op: Operator,
        value: &Value,
        f: &mut Formatter<'_, P>,
    ) -> Result<()> {
        use Operator::*;

        let expr = ColumnExpr(rc.alias, rc.column);

        match rc.kind {
            ColumnKind::Number => match op {
                Equals => binary(&expr, "=", value, f),
                NotEquals => binary(&expr, "!=", value, f),
                EqualsAnyOf => in_list(&expr, false, value, raw, op, f),
                NotEqualsAnyOf => in_list(&expr, true, value, raw, op, f),
                GreaterThan => binary(&expr, ">", value, f),
                GreaterThanOrEqual => binary(&expr, ">=", value, f),
                LessThan => binary(&expr, "<", value, f),
                LessThanOrEqual => binary(&expr, "<=", value, f),
                _ => Err(self.unsupported(op, raw)),
            },
            ColumnKind::Bool | ColumnKind::Bytes | ColumnKind::ForeignKey { .. } => match op {
                Equals => binary(&expr, "=", value, f),
                NotEquals => binary(&expr, "!=", value, f),
                EqualsAnyOf => in_list(&expr, false, value, raw, op, f),
                NotEqualsAnyOf => in_list(&expr, true, value, raw, op, f),
                _ => Err(self.unsupported(op, raw)),
            },
            ColumnKind::String => match op {
                Equals => binary(&expr, "=", value, f),
                NotEquals => binary(&expr, "!=", value, f),
                EqualsAnyOf => in_list(&expr, false, value, raw, op, f),
                NotEqualsAnyOf => in_list(&expr, true, value, raw, op, f),
                Contains => contains(&expr, false, value, raw, op, f),
                NotContains => contains(&expr, true, value, raw, op, f),
                FlexiblyMatches => {
                    let query = string_value(value, raw, op)?;
                    let p = f.param(&Value::String(fuzzy_pattern(query)));
                    fmt!(f, "lower(", &expr, ") LIKE ", p);
                    Ok(())
                }
                _ => Err(self.unsupported(op, raw)),
            },
            ColumnKind::StringArray => match op {
                ArrayContains => array_contains(&expr, false, value, f),
                ArrayDoesNotContain => array_contains(&expr, true, value, f),
                ArrayContainsAllOf => array_contains_all(&expr, value, raw, op, f),
                ArrayContainsAnyOf => array_contains_any(&expr, value, raw, op, f),
                ArrayNotEmpty => {
                    fmt!(f, "EXISTS (SELECT 1 FROM json_each(", &expr, ") LIMIT 1)");
                    Ok(())
                }
                ArrayIsEmpty => {
                    fmt!(f, "NOT EXISTS (SELECT 1 FROM json_each(", &expr, ") LIMIT 1)");
                    Ok(())
                }
                _ => Err(self.unsupported(op, raw)),
            },
            ColumnKind::FullText => match op {
                Matches => self.full_text_match(&rc, value, raw, op, f),
                FlexiblyMatches => {
                    let query = string_value(value, raw, op)?;
                    let pk = ColumnExpr(rc.alias, &rc.table.primary_key);
                    let fts = name::fts_table(&rc.table.name);
                    let p = f.param(&Value::String(fuzzy_pattern(query)));
                    fmt!(
                        f,
                        &pk,
                        " IN (SELECT ",
                        Ident(name::ORIGIN_PK),
                        " FROM ",
                        Ident(&fts),
                        " WHERE lower(",
                        Ident(rc.column),
                        ") LIKE ",
                        p,
                        ")",
                    );
                    Ok(())
                }
                _ => Err(self.unsupported(op, raw)),
            },
            ColumnKind::Json | ColumnKind::Vector { .. } => Err(self.unsupported(op, raw)),
        }
    }

    /// Full-text match. Queries shorter than three characters cannot form a
    /// trigram token, so they fall back to a prefix LIKE against the shadow
    /// column instead of a MATCH that would never hit.
    fn full_text_match<P: Params>(
        &self,
        rc: &Resolved<'_>,
        value: &Value,
        raw: &str,
        op: Operator,
        f: &mut Formatter<'_, P>,
    ) -> Result<()> {
        let query = string_value(value, raw, op)?;
        let pk = ColumnExpr(rc.alias, &rc.table.primary_key);
        let fts = name::fts_table(&rc.table.name);

        if query.chars().count() >= 3 {
            let p = f.param(&Value::String(match_query(rc.column, query)));
            fmt!(
                f,
                &pk,
                " IN (SELECT ",
                Ident(name::ORIGIN_PK),
                " FROM ",
                Ident(&fts),
                " WHERE ",
                Ident(&fts),
                " MATCH ",
                p,
                ")",
            );
        } else {
            let p = f.param(&Value::String(format!("{query}%")));
            fmt!(
                f,
                &pk,
                " IN (SELECT ",
                Ident(name::ORIGIN_PK),
                " FROM ",
                Ident(&fts),
                " WHERE ",
                Ident(rc.column),
                " LIKE ",
                p,
                ")",
            );
        }
        Ok(())
    }

    /// Comparison against a vector query's computed distance. Rows outside
    /// the top-k carry the far sentinel rather than NULL, so ordinary numeric
    /// comparison excludes them without a null branch.
    fn distance_leaf<P: Params>(
        &self,
        column: &str,
        raw: &str,
        op: Operator,
        value: &Value,
        f: &mut Formatter<'_, P>,
    ) -> Result<()> {
        let ty = self.table.column(column)?;
        if !ty.is_vector() {
            return Err(Error::query_compile(format!(
                "`{}`.`{column}` is not a vector column",
                self.table.name
            )));
        }
        if !self.queried_vectors.iter().any(|name| name == column) {
            return Err(Error::query_compile(format!(
                "`$distance({column})` requires a vector query for `{column}`"
            )));
        }

        let sql_op = match op {
            Operator::LessThan => "<",
            Operator::GreaterThan => ">",
            _ => return Err(self.unsupported(op, raw)),
        };
        if value.as_f64().is_none() {
            return Err(Error::query_compile(format!(
                "operator `{}` on `{raw}` requires a numeric value",
                op.name()
            )));
        }

        let alias = name::vector_matches_alias(column);
        let p = f.param(value);
        fmt!(
            f,
            "COALESCE(",
            Ident(&alias),
            ".\"distance\", 1e999) ",
            sql_op,
            ' ',
            p,
        );
        Ok(())
    }

    /// Resolves a foreign-key-qualified reference for use outside a leaf
    /// (ORDER BY), registering the join it needs.
    pub(crate) fn order_reference<P: Params>(
        &mut self,
        raw: &str,
        f: &mut Formatter<'_, P>,
    ) -> Result<()> {
        let ColumnRef::Foreign { column, remote } = ColumnRef::parse(raw) else {
            return Err(Error::query_compile(format!("cannot order by `{raw}`")));
        };
        let ty = self.table.column(&column)?;
        let Some(target) = ty.foreign_key_target() else {
            return Err(Error::query_compile(format!(
                "`{}`.`{column}` is not a foreign-key column",
                self.table.name
            )));
        };
        let target = self.schema.table(target)?;
        let remote_ty = target.column(&remote)?;
        if remote_ty.is_full_text() || remote_ty.is_vector() {
            return Err(Error::query_compile(format!("cannot order by `{raw}`")));
        }

        let alias = name::fk_join_alias(&column);
        self.fk_joins.entry(alias.clone()).or_insert(FkJoin {
            target: target.name.clone(),
            column,
        });
        fmt!(f, Ident(&alias), '.', Ident(&remote));
        Ok(())
    }

    fn unsupported(&self, op: Operator, raw: &str) -> Error {
        Error::unsupported_operator(op.name(), format!("{}.{raw}", self.table.name))
    }
}

fn binary<P: Params>(
    expr: &ColumnExpr<'_>,
    sql_op: &'static str,
    value: &Value,
    f: &mut Formatter<'_, P>,
) -> Result<()> {
    let p = f.param(value);
    fmt!(f, expr, ' ', sql_op, ' ', p);
    Ok(())
}

/// `IN` over an empty list is not valid SQL; the logical constant the list
/// reduces to is emitted instead.
fn in_list<P: Params>(
    expr: &ColumnExpr<'_>,
    negated: bool,
    value: &Value,
    raw: &str,
    op: Operator,
    f: &mut Formatter<'_, P>,
) -> Result<()> {
    let items = list_value(value, raw, op)?;

    if items.is_empty() {
        fmt!(f, if negated { "1 = 1" } else { "1 = 0" });
        return Ok(());
    }

    fmt!(f, expr, if negated { " NOT IN (" } else { " IN (" });
    let mut s = "";
    for item in items {
        let p = f.param(item);
        fmt!(f, s, p);
        s = ", ";
    }
    fmt!(f, ')');
    Ok(())
}

fn contains<P: Params>(
    expr: &ColumnExpr<'_>,
    negated: bool,
    value: &Value,
    raw: &str,
    op: Operator,
    f: &mut Formatter<'_, P>,
) -> Result<()> {
    let needle = string_value(value, raw, op)?;
    let p = f.param(&Value::String(format!("%{}%", needle.to_lowercase())));
    if negated {
        fmt!(f, "NOT (lower(", expr, ") LIKE ", p, ")");
    } else {
        fmt!(f, "lower(", expr, ") LIKE ", p);
    }
    Ok(())
}

fn array_contains<P: Params>(
    expr: &ColumnExpr<'_>,
    negated: bool,
    value: &Value,
    f: &mut Formatter<'_, P>,
) -> Result<()> {
    let p = f.param(value);
    fmt!(
        f,
        if negated { "NOT EXISTS" } else { "EXISTS" },
        " (SELECT 1 FROM json_each(",
        expr,
        ") WHERE json_each.value = ",
        p,
        ")",
    );
    Ok(())
}

fn array_contains_all<P: Params>(
    expr: &ColumnExpr<'_>,
    value: &Value,
    raw: &str,
    op: Operator,
    f: &mut Formatter<'_, P>,
) -> Result<()> {
    let items = list_value(value, raw, op)?;

    if items.is_empty() {
        fmt!(f, "1 = 1");
        return Ok(());
    }

    fmt!(f, '(');
    let mut s = "";
    for item in items {
        fmt!(f, s);
        array_contains(expr, false, item, f)?;
        s = " AND ";
    }
    fmt!(f, ')');
    Ok(())
}

fn array_contains_any<P: Params>(
    expr: &ColumnExpr<'_>,
    value: &Value,
    raw: &str,
    op: Operator,
    f: &mut Formatter<'_, P>,
) -> Result<()> {
    let items = list_value(value, raw, op)?;

    if items.is_empty() {
        fmt!(f, "1 = 0");
        return Ok(());
    }

    fmt!(
        f,
        "EXISTS (SELECT 1 FROM json_each(",
        expr,
        ") WHERE json_each.value IN (",
    );
    let mut s = "";
    for item in items {
        let p = f.param(item);
        fmt!(f, s, p);
        s = ", ";
    }
    fmt!(f, "))");
    Ok(())
}

fn string_value<'a>(value: &'a Value, raw: &str, op: Operator) -> Result<&'a str> {
    value.as_str().ok_or_else(|| {
        Error::query_compile(format!(
            "operator `{}` on `{raw}` requires a string value",
            op.name()
        ))
    })
}

fn list_value<'a>(value: &'a Value, raw: &str, op: Operator) -> Result<&'a [Value]> {
    value.as_list().ok_or_else(|| {
        Error::query_compile(format!(
            "operator `{}` on `{raw}` requires a list value",
            op.name()
        ))
    })
}

/// The loose "fuzzy subsequence" pattern: whitespace stripped, lowercased,
/// `%` interleaved between every remaining character and at both ends.
fn fuzzy_pattern(query: &str) -> String {
    let mut pattern = String::from("%");
    for ch in query.chars().filter(|ch| !ch.is_whitespace()) {
        pattern.extend(ch.to_lowercase());
        pattern.push('%');
    }
    pattern
}

/// FTS5 match string for `column`: whitespace-split tokens, each quoted with
/// embedded quotes doubled, ANDed by juxtaposition.
fn match_query(column: &str, query: &str) -> String {
    let mut out = format!("{column} : (");
    let mut s = "";
    for token in query.split_whitespace() {
        out.push_str(s);
        out.push('"');
        out.push_str(&token.replace('"', "\"\""));
        out.push('"');
        s = " ";
    }
    out.push(')');
    out
}
