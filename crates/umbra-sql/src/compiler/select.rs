//! Read-path compilation.
//!
//! A select joins the main table with up to three kinds of auxiliaries: the
//! full-text shadow (always LEFT JOINed when the table has full-text
//! columns, so rows without a shadow row still surface), inner joins for
//! foreign-key-qualified references, and one CTE per queried vector column.
//! Vector values themselves are never projected; each vector column turns
//! into a `$distance_<col>` field, coalesced to the far sentinel for rows
//! the nearest-neighbor match did not return.

use super::condition::{ConditionCx, FkJoin};
use super::{encode, Compiler};
use crate::serializer::{Formatter, Ident, Params, ToSql};

use umbra_core::driver::SqlStatement;
use umbra_core::schema::{name, ColumnKind, Table};
use umbra_core::stmt::{ColumnRef, Direction, OrderBy, Query, Value, VectorQuery};
use umbra_core::{Error, Result};

use indexmap::IndexMap;

impl Compiler<'_> {
    pub fn select(&self, query: &Query) -> Result<SqlStatement> {
        let table = self.schema.table(&query.table)?;

        let mut sql = String::new();
        let mut params = Vec::new();

        if let Some(vector) = &query.vector {
            let mut f = Formatter::new(&mut sql, &mut params);
            self.vector_ctes(table, vector, &mut f)?;
        }

        let queried: Vec<String> = query
            .vector
            .iter()
            .flat_map(|vector| vector.vectors.keys().cloned())
            .collect();
        let mut cx = ConditionCx::new(self.schema, table, queried.clone());

        // The filter and ordering are compiled into side buffers first so
        // every join they require is known before the FROM clause is
        // written. Neither the join section nor the ordering binds
        // parameters, so placeholder numbering still follows text order.
        let mut where_sql = String::new();
        if let Some(filter) = &query.filter {
            let mut f = Formatter::new(&mut where_sql, &mut params);
            cx.compile(filter, &mut f)?;
        }
        let order_sql = match &query.order_by {
            Some(order_by) => Some(self.order_clause(table, order_by, &queried, &mut cx)?),
            None => None,
        };

        {
            let mut f = Formatter::new(&mut sql, &mut params);
            self.select_from(table, &queried, &mut f);
            self.joins(table, &cx.fk_joins, query.vector.as_ref(), &mut f)?;
        }

        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }
        if let Some(order) = order_sql {
            sql.push_str(&order);
        }
        if let Some(limit) = query.limit {
            let mut f = Formatter::new(&mut sql, &mut params);
            let p = f.param(&Value::I64(limit as i64));
            fmt!(&mut f, " LIMIT ", p);
        }

        Ok(SqlStatement::new(sql, params))
    }

    /// Direct lookup by primary keys, used for foreign-key resolution
    /// batches. No condition tree, no vector CTEs; every vector column
    /// serializes as a NULL distance.
    pub fn select_by_primary_keys(&self, table: &str, keys: &[Value]) -> Result<SqlStatement> {
        let table = self.schema.table(table)?;

        let mut sql = String::new();
        let mut params = Vec::new();
        let mut f = Formatter::new(&mut sql, &mut params);

        self.select_from(table, &[], &mut f);
        self.joins(table, &IndexMap::new(), None, &mut f)?;

        fmt!(&mut f, " WHERE ");
        if keys.is_empty() {
            fmt!(&mut f, "1 = 0");
        } else {
            fmt!(
                &mut f,
                Ident(&table.name),
                '.',
                Ident(&table.primary_key),
                " IN (",
            );
            let mut s = "";
            for key in keys {
                let p = f.param(key);
                fmt!(&mut f, s, p);
                s = ", ";
            }
            fmt!(&mut f, ')');
        }

        drop(f);
        Ok(SqlStatement::new(sql, params))
    }

    /// One CTE per queried vector column: the shadow's nearest-neighbor
    /// matches joined back to main rows. `k` is interpolated because the
    /// vector engine does not accept it as a bound parameter.
    fn vector_ctes<P: Params>(
        &self,
        table: &Table,
        vector: &VectorQuery,
        f: &mut Formatter<'_, P>,
    ) -> Result<()> {
        if vector.vectors.is_empty() {
            return Ok(());
        }

        let vtab = name::vector_table(&table.name);

        fmt!(f, "WITH ");
        let mut s = "";
        for (column, query_vector) in &vector.vectors {
            let ty = table.column(column)?;
            let ColumnKind::Vector { dimension, element } = &ty.kind else {
                return Err(Error::query_compile(format!(
                    "`{}`.`{column}` is not a vector column",
                    table.name
                )));
            };
            if query_vector.len() != *dimension {
                return Err(Error::query_compile(format!(
                    "query vector for `{}`.`{column}` expects dimension {dimension}, got {}",
                    table.name,
                    query_vector.len()
                )));
            }
            if query_vector.element() != *element {
                return Err(Error::query_compile(format!(
                    "query vector for `{}`.`{column}` has the wrong element kind",
                    table.name
                )));
            }

            let alias = name::vector_matches_alias(column);
            let p = f.param(&encode::query_vector_blob(query_vector));
            fmt!(
                f,
                s,
                Ident(&alias),
                " AS (SELECT ",
                Ident(&vtab),
                '.',
                Ident(name::ORIGIN_PK),
                " AS ",
                Ident(name::ORIGIN_PK),
                ", ",
                Ident(&vtab),
                '.',
                Ident(column),
                " AS ",
                Ident(column),
                ", ",
                Ident(&vtab),
                ".\"distance\" AS \"distance\" FROM ",
                Ident(&vtab),
                " INNER JOIN ",
                Ident(&table.name),
                " ON ",
                Ident(&table.name),
                '.',
                Ident(&table.primary_key),
                " = ",
                Ident(&vtab),
                '.',
                Ident(name::ORIGIN_PK),
                " WHERE ",
                Ident(&vtab),
                '.',
                Ident(column),
                " MATCH ",
                p,
                " AND k = ",
                vector.k,
                ")",
            );
            s = ", ";
        }
        fmt!(f, ' ');
        Ok(())
    }

    /// `SELECT <projection> FROM "<table>"`, columns in declaration order.
    fn select_from<P: Params>(&self, table: &Table, queried: &[String], f: &mut Formatter<'_, P>) {
        let fts = name::fts_table(&table.name);

        fmt!(f, "SELECT ");
        let mut s = "";
        for (column, ty) in &table.columns {
            fmt!(f, s);
            s = ", ";
            match &ty.kind {
                ColumnKind::FullText => {
                    fmt!(f, Ident(&fts), '.', Ident(column), " AS ", Ident(column));
                }
                ColumnKind::Vector { .. } => {
                    let field = name::distance_field(column);
                    if queried.iter().any(|name| name == column) {
                        let alias = name::vector_matches_alias(column);
                        fmt!(
                            f,
                            "COALESCE(",
                            Ident(&alias),
                            ".\"distance\", 1e999) AS ",
                            Ident(&field),
                        );
                    } else {
                        fmt!(f, "NULL AS ", Ident(&field));
                    }
                }
                _ => fmt!(f, Ident(&table.name), '.', Ident(column)),
            }
        }
        fmt!(f, " FROM ", Ident(&table.name));
    }

    fn joins<P: Params>(
        &self,
        table: &Table,
        fk_joins: &IndexMap<String, FkJoin>,
        vector: Option<&VectorQuery>,
        f: &mut Formatter<'_, P>,
    ) -> Result<()> {
        if table.has_full_text() {
            let fts = name::fts_table(&table.name);
            fmt!(
                f,
                " LEFT JOIN ",
                Ident(&fts),
                " ON ",
                Ident(&fts),
                '.',
                Ident(name::ORIGIN_PK),
                " = ",
                Ident(&table.name),
                '.',
                Ident(&table.primary_key),
            );
        }

        for (alias, join) in fk_joins {
            let target = self.schema.table(&join.target)?;
            fmt!(
                f,
                " INNER JOIN ",
                Ident(&join.target),
                " AS ",
                Ident(alias),
                " ON ",
                Ident(alias),
                '.',
                Ident(&target.primary_key),
                " = ",
                Ident(&table.name),
                '.',
                Ident(&join.column),
            );
        }

        if let Some(vector) = vector {
            for column in vector.vectors.keys() {
                let alias = name::vector_matches_alias(column);
                fmt!(
                    f,
                    " LEFT JOIN ",
                    Ident(&alias),
                    " ON ",
                    Ident(&alias),
                    '.',
                    Ident(name::ORIGIN_PK),
                    " = ",
                    Ident(&table.name),
                    '.',
                    Ident(&table.primary_key),
                );
            }
        }
        Ok(())
    }

    fn order_clause(
        &self,
        table: &Table,
        order_by: &OrderBy,
        queried: &[String],
        cx: &mut ConditionCx<'_>,
    ) -> Result<String> {
        let mut out = String::from(" ORDER BY ");
        let mut no_params: Vec<Value> = Vec::new();
        let mut f = Formatter::new(&mut out, &mut no_params);

        match ColumnRef::parse(&order_by.column) {
            ColumnRef::Direct(column) => {
                let ty = table.column(&column)?;
                match &ty.kind {
                    ColumnKind::Vector { .. } => {
                        return Err(Error::query_compile(format!(
                            "cannot order by vector column `{column}`; order by \
                             `$distance({column})` instead"
                        )))
                    }
                    ColumnKind::FullText => {
                        let fts = name::fts_table(&table.name);
                        fmt!(&mut f, Ident(&fts), '.', Ident(&column));
                    }
                    _ => fmt!(&mut f, Ident(&table.name), '.', Ident(&column)),
                }
            }
            ColumnRef::Foreign { .. } => {
                // Compiling through the condition context registers the join.
                cx.order_reference(&order_by.column, &mut f)?;
            }
            ColumnRef::Distance(column) => {
                if !queried.iter().any(|name| name == &column) {
                    return Err(Error::query_compile(format!(
                        "ordering by `$distance({column})` requires a vector query for \
                         `{column}`"
                    )));
                }
                let field = name::distance_field(&column);
                fmt!(&mut f, Ident(&field));
            }
        }

        drop(f);
        out.push_str(match order_by.direction {
            Direction::Asc => " ASC",
            Direction::Desc => " DESC",
        });
        Ok(out)
    }
}
