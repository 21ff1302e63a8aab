//! Parsing helpers shared by the resolver.

use shardsql_configs::SqlDialectKind;
use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, GenericDialect, MySqlDialect, PostgreSqlDialect};
use sqlparser::parser::{Parser, ParserError, ParserOptions};
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};

const DEFAULT_SQL_RECURSION_LIMIT: usize = 512;

/// Default sqlparser options used across ShardSQL
pub fn parser_options() -> ParserOptions {
    ParserOptions::new().with_trailing_commas(true)
}

/// Parse SQL into statements using ShardSQL defaults (options + recursion limit)
pub fn parse_sql_statements(
    sql: &str,
    dialect: &dyn Dialect,
) -> Result<Vec<Statement>, ParserError> {
    Parser::new(dialect)
        .with_options(parser_options())
        .with_recursion_limit(DEFAULT_SQL_RECURSION_LIMIT)
        .try_with_sql(sql)?
        .parse_statements()
}

pub fn dialect_for(kind: SqlDialectKind) -> Box<dyn Dialect> {
    match kind {
        SqlDialectKind::Generic => Box::new(GenericDialect {}),
        SqlDialectKind::Postgres => Box::new(PostgreSqlDialect {}),
        SqlDialectKind::Mysql => Box::new(MySqlDialect {}),
    }
}

/// True when `sql` carries a comment whose whole text is one of `hints`,
/// e.g. `SELECT /* nosharding */ * FROM orders` or `/*+ nosharding */`.
pub fn has_skip_hint(sql: &str, dialect: &dyn Dialect, hints: &[String]) -> bool {
    if hints.is_empty() {
        return false;
    }

    let Ok(tokens) = Tokenizer::new(dialect, sql).tokenize() else {
        return false;
    };

    tokens.iter().any(|token| {
        let text = match token {
            Token::Whitespace(Whitespace::MultiLineComment(text)) => text.as_str(),
            Token::Whitespace(Whitespace::SingleLineComment { comment, .. }) => comment.as_str(),
            _ => return false,
        };
        let text = text.trim().trim_start_matches('+').trim();
        hints.iter().any(|hint| text.eq_ignore_ascii_case(hint))
    })
}
