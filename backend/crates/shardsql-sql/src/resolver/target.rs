//! Statement classification and target-table lookup.

use shardsql_commons::StatementKind;
use sqlparser::ast::{
    FromTable, ObjectName, ObjectNamePart, SetExpr, Statement, TableFactor, TableObject,
    TableWithJoins,
};

pub(crate) fn statement_kind(statement: &Statement) -> StatementKind {
    match statement {
        Statement::Query(_) => StatementKind::Select,
        Statement::Insert(_) => StatementKind::Insert,
        Statement::Update(_) => StatementKind::Update,
        Statement::Delete(_) => StatementKind::Delete,
        _ => StatementKind::Other,
    }
}

/// Logical table a statement targets, when it targets exactly one plain,
/// unqualified table and nothing else.
pub(crate) fn target_table(statement: &Statement) -> Option<String> {
    table_name(statement)
        .and_then(single_part)
        .map(|ident| ident.value.clone())
}

/// Mutable access to the target table's name, under the same rules as
/// [`target_table`].
pub(crate) fn target_table_mut(statement: &mut Statement) -> Option<&mut ObjectName> {
    match statement {
        Statement::Query(query) => {
            if query.with.is_some() {
                return None;
            }
            match query.body.as_mut() {
                SetExpr::Select(select) => single_table_mut(&mut select.from),
                _ => None,
            }
        },
        Statement::Insert(insert) => match &mut insert.table {
            TableObject::TableName(name) => Some(name),
            _ => None,
        },
        Statement::Update(update) => {
            if update.from.is_some() || !update.table.joins.is_empty() {
                return None;
            }
            match &mut update.table.relation {
                TableFactor::Table { name, .. } => Some(name),
                _ => None,
            }
        },
        Statement::Delete(delete) => {
            if !delete.tables.is_empty() || delete.using.is_some() {
                return None;
            }
            match &mut delete.from {
                FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => {
                    single_table_mut(tables)
                },
            }
        },
        _ => None,
    }
}

fn table_name(statement: &Statement) -> Option<&ObjectName> {
    match statement {
        Statement::Query(query) => {
            if query.with.is_some() {
                return None;
            }
            match query.body.as_ref() {
                SetExpr::Select(select) => single_table(&select.from),
                _ => None,
            }
        },
        Statement::Insert(insert) => match &insert.table {
            TableObject::TableName(name) => Some(name),
            _ => None,
        },
        Statement::Update(update) => {
            if update.from.is_some() || !update.table.joins.is_empty() {
                return None;
            }
            match &update.table.relation {
                TableFactor::Table { name, .. } => Some(name),
                _ => None,
            }
        },
        Statement::Delete(delete) => {
            if !delete.tables.is_empty() || delete.using.is_some() {
                return None;
            }
            match &delete.from {
                FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => {
                    single_table(tables)
                },
            }
        },
        _ => None,
    }
}

fn single_table(from: &[TableWithJoins]) -> Option<&ObjectName> {
    match from {
        [only] if only.joins.is_empty() => match &only.relation {
            TableFactor::Table { name, .. } => Some(name),
            _ => None,
        },
        _ => None,
    }
}

fn single_table_mut(from: &mut [TableWithJoins]) -> Option<&mut ObjectName> {
    match from {
        [only] if only.joins.is_empty() => match &mut only.relation {
            TableFactor::Table { name, .. } => Some(name),
            _ => None,
        },
        _ => None,
    }
}

/// The identifier of a one-part name (`orders`, not `sales.orders`).
pub(crate) fn single_part(name: &ObjectName) -> Option<&sqlparser::ast::Ident> {
    match name.0.as_slice() {
        [ObjectNamePart::Identifier(ident)] => Some(ident),
        _ => None,
    }
}

pub(crate) fn single_part_mut(name: &mut ObjectName) -> Option<&mut sqlparser::ast::Ident> {
    match name.0.as_mut_slice() {
        [ObjectNamePart::Identifier(ident)] => Some(ident),
        _ => None,
    }
}
