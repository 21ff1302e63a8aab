//! AST edits applied once the shard suffix is known.

use std::ops::ControlFlow;

use shardsql_commons::{Result, ShardSqlError};
use sqlparser::ast::{
    visit_expressions_mut, Assignment, AssignmentTarget, Expr, Ident, Insert, ObjectName,
    ObjectNamePart, OnConflictAction, OnInsert, SetExpr, Statement, Value as SqlValue,
};

use super::target::{single_part_mut, target_table_mut};

/// Point the statement at `physical` and retarget `logical.col` references.
pub(crate) fn rename_table(statement: &mut Statement, logical: &str, physical: &str) -> Result<()> {
    let ident = target_table_mut(statement)
        .and_then(single_part_mut)
        .ok_or_else(|| {
            ShardSqlError::InvalidStatement(format!("statement no longer targets '{}'", logical))
        })?;
    ident.value = physical.to_string();

    let _ = visit_expressions_mut(statement, |expr| {
        if let Expr::CompoundIdentifier(idents) = expr {
            let len = idents.len();
            if len >= 2 && idents[len - 2].value == logical {
                idents[len - 2].value = physical.to_string();
            }
        }
        ControlFlow::<()>::Continue(())
    });

    // SET targets are column names, not expressions
    for assignment in assignments_mut(statement) {
        match &mut assignment.target {
            AssignmentTarget::ColumnName(name) => rename_qualifier(name, logical, physical),
            AssignmentTarget::Tuple(names) => {
                for name in names {
                    rename_qualifier(name, logical, physical);
                }
            },
        }
    }
    Ok(())
}

fn assignments_mut(statement: &mut Statement) -> Vec<&mut Assignment> {
    match statement {
        Statement::Update(update) => update.assignments.iter_mut().collect(),
        Statement::Insert(insert) => match &mut insert.on {
            Some(OnInsert::DuplicateKeyUpdate(assignments)) => assignments.iter_mut().collect(),
            Some(OnInsert::OnConflict(conflict)) => match &mut conflict.action {
                OnConflictAction::DoUpdate(update) => update.assignments.iter_mut().collect(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// `orders.product` -> `orders_1.product`
fn rename_qualifier(name: &mut ObjectName, logical: &str, physical: &str) {
    let len = name.0.len();
    if len < 2 {
        return;
    }
    if let ObjectNamePart::Identifier(ident) = &mut name.0[len - 2] {
        if ident.value == logical {
            ident.value = physical.to_string();
        }
    }
}

/// Rows of an `INSERT ... VALUES` statement.
pub(crate) fn insert_rows(insert: &Insert) -> Result<&Vec<Vec<Expr>>> {
    match insert.source.as_ref().map(|q| q.body.as_ref()) {
        Some(SetExpr::Values(values)) => Ok(&values.rows),
        Some(_) => Err(ShardSqlError::UnsupportedConstruct(
            "INSERT ... SELECT cannot be routed to a shard".to_string(),
        )),
        None => Err(ShardSqlError::MissingShardingKey),
    }
}

fn insert_rows_mut(insert: &mut Insert) -> Result<&mut Vec<Vec<Expr>>> {
    match insert.source.as_mut().map(|q| q.body.as_mut()) {
        Some(SetExpr::Values(values)) => Ok(&mut values.rows),
        Some(_) => Err(ShardSqlError::UnsupportedConstruct(
            "INSERT ... SELECT cannot be routed to a shard".to_string(),
        )),
        None => Err(ShardSqlError::MissingShardingKey),
    }
}

/// Append an `id` column with one generated value per row.
pub(crate) fn append_ids(insert: &mut Insert, ids: &[i64]) -> Result<()> {
    let rows = insert_rows_mut(insert)?;
    if rows.len() != ids.len() {
        return Err(ShardSqlError::InvalidStatement(format!(
            "{} generated ids for {} rows",
            ids.len(),
            rows.len()
        )));
    }
    for (row, id) in rows.iter_mut().zip(ids) {
        row.push(Expr::value(SqlValue::Number(id.to_string(), false)));
    }
    insert.columns.push(Ident::new("id"));
    Ok(())
}
