//! Sharding-value extraction: bound arguments, literals, and the WHERE walk.

use std::ops::ControlFlow;

use shardsql_commons::{Result, ShardSqlError, Value};
use sqlparser::ast::{
    visit_expressions, BinaryOperator, Expr, Statement, UnaryOperator, Value as SqlValue,
};
use sqlparser::tokenizer::Span;

/// Positional arguments of one call, plus the textual order of bare `?`
/// placeholders in its statement.
pub(crate) struct BindArgs<'a> {
    args: &'a [Value],
    anonymous: Vec<(u64, u64)>,
}

impl<'a> BindArgs<'a> {
    pub(crate) fn new(statement: &Statement, args: &'a [Value]) -> Self {
        let mut anonymous = Vec::new();
        let _ = visit_expressions(statement, |expr| {
            if let Expr::Value(v) = expr {
                if matches!(&v.value, SqlValue::Placeholder(p) if p == "?") {
                    anonymous.push((v.span.start.line, v.span.start.column));
                }
            }
            ControlFlow::<()>::Continue(())
        });
        anonymous.sort_unstable();
        Self { args, anonymous }
    }

    /// Zero-based argument index of a placeholder.
    ///
    /// `?` counts by position in the text; `$N`, `?N` and `:N` are 1-based.
    fn index_of(&self, placeholder: &str, span: Span) -> Result<usize> {
        if placeholder == "?" {
            let at = (span.start.line, span.start.column);
            return self
                .anonymous
                .binary_search(&at)
                .map_err(|_| ShardSqlError::InvalidStatement(format!("unplaced placeholder at {:?}", at)));
        }

        let ordinal = placeholder
            .strip_prefix('$')
            .or_else(|| placeholder.strip_prefix('?'))
            .or_else(|| placeholder.strip_prefix(':'))
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| *n >= 1)
            .ok_or_else(|| {
                ShardSqlError::UnsupportedConstruct(format!(
                    "placeholder '{}' is not positional",
                    placeholder
                ))
            })?;
        Ok(ordinal - 1)
    }

    fn bound(&self, placeholder: &str, span: Span) -> Result<Value> {
        let index = self.index_of(placeholder, span)?;
        self.args
            .get(index)
            .cloned()
            .ok_or(ShardSqlError::ArgumentOutOfRange {
                index,
                len: self.args.len(),
            })
    }

    /// Value compared with (or inserted into) the sharding key.
    ///
    /// Only placeholders, string and numeric literals are accepted; anything
    /// else would risk routing a row to the wrong shard.
    pub(crate) fn sharding_value(&self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Nested(inner) => self.sharding_value(inner),
            Expr::Value(v) => match &v.value {
                SqlValue::Placeholder(p) => self.bound(p, v.span),
                SqlValue::Number(n, _) => Ok(number_value(n)),
                SqlValue::SingleQuotedString(s) | SqlValue::DoubleQuotedString(s) => {
                    Ok(Value::Text(s.clone()))
                },
                other => Err(ShardSqlError::UnsupportedConstruct(format!(
                    "sharding key compared with literal {}",
                    other
                ))),
            },
            Expr::UnaryOp {
                op: UnaryOperator::Minus,
                expr: inner,
            } => match inner.as_ref() {
                Expr::Value(v) => match &v.value {
                    SqlValue::Number(n, _) => Ok(number_value(&format!("-{}", n))),
                    _ => Err(unsupported(expr)),
                },
                _ => Err(unsupported(expr)),
            },
            _ => Err(unsupported(expr)),
        }
    }

    /// Integer value of an `id = ...` comparison.
    pub(crate) fn primary_key(&self, expr: &Expr) -> Result<i64> {
        let value = match self.sharding_value(expr) {
            Ok(value) => value,
            Err(e @ ShardSqlError::ArgumentOutOfRange { .. }) => return Err(e),
            Err(_) => return Err(ShardSqlError::InvalidId(expr.to_string())),
        };
        value
            .as_i64()
            .ok_or_else(|| ShardSqlError::InvalidId(value.to_string()))
    }
}

fn number_value(text: &str) -> Value {
    match text.parse::<i64>() {
        Ok(n) => Value::Int(n),
        Err(_) => Value::Text(text.to_string()),
    }
}

fn unsupported(expr: &Expr) -> ShardSqlError {
    ShardSqlError::UnsupportedConstruct(format!("sharding key compared with expression '{}'", expr))
}

/// Equality conditions found among the top-level conjuncts of a WHERE clause.
#[derive(Debug, Default)]
pub(crate) struct Conditions<'a> {
    /// `<sharding_key> = value`
    pub key: Option<&'a Expr>,
    /// `id = value`
    pub id: Option<&'a Expr>,
}

impl<'a> Conditions<'a> {
    /// Collect conditions from `selection`. Only `AND` and parentheses are
    /// descended into: a key under `OR` or `NOT` does not pin a single shard.
    pub(crate) fn collect(selection: Option<&'a Expr>, sharding_key: &str) -> Self {
        let mut found = Self::default();
        if let Some(expr) = selection {
            found.walk(expr, sharding_key);
        }
        found
    }

    fn walk(&mut self, expr: &'a Expr, sharding_key: &str) {
        match expr {
            Expr::Nested(inner) => self.walk(inner, sharding_key),
            Expr::BinaryOp {
                left,
                op: BinaryOperator::And,
                right,
            } => {
                self.walk(left, sharding_key);
                self.walk(right, sharding_key);
            },
            Expr::BinaryOp {
                left,
                op: BinaryOperator::Eq,
                right,
            } => {
                if let Some(column) = column_name(left) {
                    self.record(column, right, sharding_key);
                } else if let Some(column) = column_name(right) {
                    self.record(column, left, sharding_key);
                }
            },
            _ => {},
        }
    }

    fn record(&mut self, column: &str, value: &'a Expr, sharding_key: &str) {
        if self.key.is_none() && column.eq_ignore_ascii_case(sharding_key) {
            self.key = Some(value);
        }
        if self.id.is_none() && column.eq_ignore_ascii_case("id") {
            self.id = Some(value);
        }
    }
}

/// Column name of `col` or `t.col`.
pub(crate) fn column_name(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.as_str()),
        Expr::CompoundIdentifier(idents) => idents.last().map(|i| i.value.as_str()),
        _ => None,
    }
}
