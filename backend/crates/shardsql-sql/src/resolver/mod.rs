//! Query resolution: parse → analyze → rewrite → render.

mod conditions;
mod rewrite;
mod target;

use std::sync::Arc;

use shardsql_commons::{Result, ShardSqlError, StatementKind, Value};
use shardsql_sharding::{ShardRegistry, TableShardConfig};
use sqlparser::ast::Statement;

use crate::models::{ResolvedQuery, ResolverOptions};
use crate::parser::{dialect_for, has_skip_hint, parse_sql_statements};

use conditions::{BindArgs, Conditions};
use target::{statement_kind, target_table};

/// A statement that targets a registered table and must be rewritten.
struct ShardTarget {
    statement: Statement,
    kind: StatementKind,
    table: String,
    config: Arc<TableShardConfig>,
}

enum Analysis {
    Passthrough(ResolvedQuery),
    Shard(ShardTarget),
}

/// Resolves statements against a compiled [`ShardRegistry`].
///
/// Cheap to clone; the registry is shared.
#[derive(Debug, Clone)]
pub struct QueryResolver {
    registry: Arc<ShardRegistry>,
    options: ResolverOptions,
}

impl QueryResolver {
    pub fn new(registry: Arc<ShardRegistry>, options: ResolverOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &Arc<ShardRegistry> {
        &self.registry
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Resolve `sql` with its positional `args`.
    ///
    /// Errors are returned before anything is executed; the only side effect
    /// of resolution is primary-key generation for inserts.
    pub async fn resolve(&self, sql: &str, args: &[Value]) -> Result<ResolvedQuery> {
        let target = match self.analyze(sql) {
            Analysis::Passthrough(resolved) => return Ok(resolved),
            Analysis::Shard(target) => target,
        };

        let binds = BindArgs::new(&target.statement, args);
        let resolved = match target.kind {
            StatementKind::Insert => self.resolve_insert(target, &binds).await?,
            _ => self.resolve_filtered(target, &binds)?,
        };

        log::debug!(
            "Resolved {} on '{}' to '{}'",
            resolved.kind,
            resolved.table.as_deref().unwrap_or_default(),
            resolved.physical_table().unwrap_or_default()
        );
        Ok(resolved)
    }

    /// Parse and decide whether `sql` needs rewriting at all.
    fn analyze(&self, sql: &str) -> Analysis {
        if self.registry.is_empty() {
            return Analysis::Passthrough(ResolvedQuery::passthrough(sql, StatementKind::Other));
        }

        let dialect = dialect_for(self.options.dialect);
        let mut statements = match parse_sql_statements(sql, dialect.as_ref()) {
            Ok(statements) => statements,
            Err(e) => {
                log::trace!("Passing through unparseable statement: {}", e);
                return Analysis::Passthrough(ResolvedQuery::passthrough(sql, StatementKind::Other));
            },
        };

        if statements.len() != 1 {
            log::trace!("Passing through batch of {} statements", statements.len());
            return Analysis::Passthrough(ResolvedQuery::passthrough(sql, StatementKind::Other));
        }
        let statement = statements.remove(0);
        let kind = statement_kind(&statement);

        if kind == StatementKind::Other {
            return Analysis::Passthrough(ResolvedQuery::passthrough(sql, kind));
        }

        if kind == StatementKind::Select
            && has_skip_hint(sql, dialect.as_ref(), &self.options.skip_hints)
        {
            log::trace!("Skip-sharding hint present, passing through");
            return Analysis::Passthrough(ResolvedQuery::passthrough(sql, kind));
        }

        let Some(table) = target_table(&statement) else {
            return Analysis::Passthrough(ResolvedQuery::passthrough(sql, kind));
        };

        let Some(config) = self.registry.get(&table).cloned() else {
            return Analysis::Passthrough(ResolvedQuery::passthrough(sql, kind));
        };

        Analysis::Shard(ShardTarget {
            statement,
            kind,
            table,
            config,
        })
    }

    async fn resolve_insert(
        &self,
        target: ShardTarget,
        binds: &BindArgs<'_>,
    ) -> Result<ResolvedQuery> {
        let ShardTarget {
            mut statement,
            kind,
            table,
            config,
        } = target;

        let Statement::Insert(insert) = &mut statement else {
            return Err(ShardSqlError::InvalidStatement("expected INSERT".to_string()));
        };

        if insert.columns.is_empty() {
            return Err(ShardSqlError::MissingShardingKey);
        }
        let key_index = insert
            .columns
            .iter()
            .position(|c| c.value.eq_ignore_ascii_case(config.sharding_key()));
        let has_id = insert.columns.iter().any(|c| c.value.eq_ignore_ascii_case("id"));
        let column_count = insert.columns.len();

        let rows = rewrite::insert_rows(insert)?;
        let key_index = key_index.ok_or(ShardSqlError::MissingShardingKey)?;

        // Every row must land on the same shard; decide before generating ids.
        let mut suffix: Option<String> = None;
        for row in rows {
            if row.len() != column_count {
                return Err(ShardSqlError::InvalidStatement(format!(
                    "INSERT has {} columns but a row has {} values",
                    column_count,
                    row.len()
                )));
            }
            let value = binds.sharding_value(&row[key_index])?;
            let row_suffix = config.suffix_for_value(&value)?;
            match &suffix {
                Some(first) if *first != row_suffix => {
                    return Err(ShardSqlError::InsertSuffixMismatch {
                        first: first.clone(),
                        second: row_suffix,
                    });
                },
                Some(_) => {},
                None => suffix = Some(row_suffix),
            }
        }
        let row_count = rows.len();
        let suffix = suffix
            .ok_or_else(|| ShardSqlError::InvalidStatement("INSERT without rows".to_string()))?;

        if !has_id {
            let shard = config.shard_index(&suffix)?;
            let mut ids = Vec::with_capacity(row_count);
            for _ in 0..row_count {
                ids.push(config.generate_primary_key(shard).await?);
            }

            let filled = ids.iter().filter(|id| **id != 0).count();
            if filled == ids.len() {
                rewrite::append_ids(insert, &ids)?;
            } else if filled != 0 {
                return Err(ShardSqlError::PrimaryKey(format!(
                    "generator for '{}' returned 0 for some rows of one INSERT",
                    table
                )));
            }
        }

        render(statement, kind, table, suffix)
    }

    fn resolve_filtered(&self, target: ShardTarget, binds: &BindArgs<'_>) -> Result<ResolvedQuery> {
        let ShardTarget {
            statement,
            kind,
            table,
            config,
        } = target;

        let conditions = Conditions::collect(selection(&statement), config.sharding_key());
        let id = conditions.id.map(|expr| binds.primary_key(expr)).transpose()?;

        let suffix = match (conditions.key, id) {
            (Some(expr), _) => config.suffix_for_value(&binds.sharding_value(expr)?)?,
            (None, Some(id)) => config.suffix_for_primary_key(id)?,
            (None, None) => return Err(ShardSqlError::MissingShardingKey),
        };

        render(statement, kind, table, suffix)
    }
}

fn selection(statement: &Statement) -> Option<&sqlparser::ast::Expr> {
    match statement {
        Statement::Query(query) => match query.body.as_ref() {
            sqlparser::ast::SetExpr::Select(select) => select.selection.as_ref(),
            _ => None,
        },
        Statement::Update(update) => update.selection.as_ref(),
        Statement::Delete(delete) => delete.selection.as_ref(),
        _ => None,
    }
}

/// Render the logical text, rename, then render the shard text.
fn render(
    mut statement: Statement,
    kind: StatementKind,
    table: String,
    suffix: String,
) -> Result<ResolvedQuery> {
    let logical_query = statement.to_string();
    let physical = format!("{}{}", table, suffix);
    rewrite::rename_table(&mut statement, &table, &physical)?;
    let shard_query = statement.to_string();

    Ok(ResolvedQuery {
        kind,
        table: Some(table),
        suffix: Some(suffix),
        logical_query,
        shard_query,
    })
}
