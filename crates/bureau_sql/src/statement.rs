//! The minimal statement grammar for the reference executor.
//!
//! Supported statements:
//!
//! ```text
//! DELETE FROM <table> [WHERE <conjunction>]
//! SELECT COUNT(*) FROM <table> [WHERE <conjunction>]
//! ```
//!
//! where a conjunction is `column (= | <> | !=) (? | literal)` terms joined
//! by `AND`. Literals are numbers, single-quoted strings (with `''` as the
//! quote escape), `TRUE`, `FALSE` and `NULL`. Placeholders are positional.
//!
//! Anything outside this grammar is a [`SqlError::Parse`]. Real deployments
//! hand statements to a real database through their own
//! [`StatementExecutor`](crate::StatementExecutor) and never touch this
//! module.

use crate::error::{SqlError, SqlResult};
use crate::value::SqlValue;

/// A parsed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `DELETE FROM table [WHERE ...]`.
    Delete {
        /// Qualified table name as written.
        table: String,
        /// Optional row filter.
        filter: Option<Filter>,
    },
    /// `SELECT COUNT(*) FROM table [WHERE ...]`.
    CountRows {
        /// Qualified table name as written.
        table: String,
        /// Optional row filter.
        filter: Option<Filter>,
    },
}

impl Statement {
    /// Returns the table the statement targets.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::Delete { table, .. } | Self::CountRows { table, .. } => table,
        }
    }

    /// Returns the statement's filter, if any.
    #[must_use]
    pub fn filter(&self) -> Option<&Filter> {
        match self {
            Self::Delete { filter, .. } | Self::CountRows { filter, .. } => filter.as_ref(),
        }
    }
}

/// A conjunction of equality/inequality conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// The ANDed conditions.
    pub conditions: Vec<Condition>,
}

impl Filter {
    /// Evaluates the filter against a JSON row with the given parameters.
    ///
    /// Missing row fields compare as JSON null.
    pub fn matches(&self, row: &serde_json::Value, params: &[SqlValue]) -> SqlResult<bool> {
        for condition in &self.conditions {
            let value = match &condition.operand {
                Operand::Placeholder(index) => {
                    params.get(*index).ok_or(SqlError::MissingParameter {
                        index: *index,
                        supplied: params.len(),
                    })?
                }
                Operand::Literal(value) => value,
            };
            let field = row.get(&condition.column).unwrap_or(&serde_json::Value::Null);
            let equal = value.matches_json(field);
            if equal == condition.negated {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// One `column op operand` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Row column name.
    pub column: String,
    /// True for `<>` / `!=`, false for `=`.
    pub negated: bool,
    /// Right-hand side.
    pub operand: Operand,
}

/// The right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Positional placeholder, zero-based.
    Placeholder(usize),
    /// Inline literal.
    Literal(SqlValue),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(String),
    Placeholder,
    Eq,
    Neq,
    LParen,
    RParen,
    Star,
}

fn tokenize(sql: &str) -> SqlResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = sql.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '?' => {
                chars.next();
                tokens.push(Token::Placeholder);
            }
            '=' => {
                chars.next();
                tokens.push(Token::Eq);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '<' => {
                chars.next();
                if chars.next() != Some('>') {
                    return Err(SqlError::parse("expected '>' after '<'"));
                }
                tokens.push(Token::Neq);
            }
            '!' => {
                chars.next();
                if chars.next() != Some('=') {
                    return Err(SqlError::parse("expected '=' after '!'"));
                }
                tokens.push(Token::Neq);
            }
            '\'' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('\'') => {
                            // Doubled quote is an escaped quote.
                            if chars.peek() == Some(&'\'') {
                                chars.next();
                                text.push('\'');
                            } else {
                                break;
                            }
                        }
                        Some(ch) => text.push(ch),
                        None => return Err(SqlError::parse("unterminated string literal")),
                    }
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut num = String::new();
                num.push(c);
                chars.next();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Num(num));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' || d == '.' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => {
                return Err(SqlError::parse(format!("unexpected character '{other}'")));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    placeholders: usize,
}

impl Parser {
    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_keyword(&mut self, keyword: &str) -> SqlResult<()> {
        match self.next() {
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case(keyword) => Ok(()),
            other => Err(SqlError::parse(format!(
                "expected {keyword}, found {other:?}"
            ))),
        }
    }

    fn expect_ident(&mut self) -> SqlResult<String> {
        match self.next() {
            Some(Token::Ident(word)) => Ok(word),
            other => Err(SqlError::parse(format!(
                "expected identifier, found {other:?}"
            ))),
        }
    }

    fn parse_filter(&mut self) -> SqlResult<Filter> {
        let mut conditions = vec![self.parse_condition()?];
        while let Some(Token::Ident(word)) = self.tokens.get(self.pos) {
            if !word.eq_ignore_ascii_case("AND") {
                break;
            }
            self.pos += 1;
            conditions.push(self.parse_condition()?);
        }
        Ok(Filter { conditions })
    }

    fn parse_condition(&mut self) -> SqlResult<Condition> {
        let column = self.expect_ident()?;
        let negated = match self.next() {
            Some(Token::Eq) => false,
            Some(Token::Neq) => true,
            other => {
                return Err(SqlError::parse(format!(
                    "expected comparison operator, found {other:?}"
                )))
            }
        };
        let operand = match self.next() {
            Some(Token::Placeholder) => {
                let index = self.placeholders;
                self.placeholders += 1;
                Operand::Placeholder(index)
            }
            Some(Token::Str(text)) => Operand::Literal(SqlValue::Text(text)),
            Some(Token::Num(num)) => {
                let value = if num.contains('.') {
                    SqlValue::Float(
                        num.parse()
                            .map_err(|_| SqlError::parse(format!("bad number literal {num}")))?,
                    )
                } else {
                    SqlValue::Int(
                        num.parse()
                            .map_err(|_| SqlError::parse(format!("bad number literal {num}")))?,
                    )
                };
                Operand::Literal(value)
            }
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("TRUE") => {
                Operand::Literal(SqlValue::Bool(true))
            }
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("FALSE") => {
                Operand::Literal(SqlValue::Bool(false))
            }
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("NULL") => {
                Operand::Literal(SqlValue::Null)
            }
            other => {
                return Err(SqlError::parse(format!(
                    "expected placeholder or literal, found {other:?}"
                )))
            }
        };
        Ok(Condition {
            column,
            negated,
            operand,
        })
    }

    fn finish(&mut self) -> SqlResult<()> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(SqlError::parse("trailing tokens after statement"))
        }
    }
}

/// Parses a statement within the supported grammar.
pub fn parse_statement(sql: &str) -> SqlResult<Statement> {
    let mut parser = Parser {
        tokens: tokenize(sql)?,
        pos: 0,
        placeholders: 0,
    };

    let statement = match parser.next() {
        Some(Token::Ident(word)) if word.eq_ignore_ascii_case("DELETE") => {
            parser.expect_keyword("FROM")?;
            let table = parser.expect_ident()?;
            let filter = parse_optional_where(&mut parser)?;
            Statement::Delete { table, filter }
        }
        Some(Token::Ident(word)) if word.eq_ignore_ascii_case("SELECT") => {
            parser.expect_keyword("COUNT")?;
            match (parser.next(), parser.next(), parser.next()) {
                (Some(Token::LParen), Some(Token::Star), Some(Token::RParen)) => {}
                _ => return Err(SqlError::parse("expected COUNT(*)")),
            }
            parser.expect_keyword("FROM")?;
            let table = parser.expect_ident()?;
            let filter = parse_optional_where(&mut parser)?;
            Statement::CountRows { table, filter }
        }
        other => {
            return Err(SqlError::parse(format!(
                "expected DELETE or SELECT, found {other:?}"
            )))
        }
    };

    parser.finish()?;
    Ok(statement)
}

fn parse_optional_where(parser: &mut Parser) -> SqlResult<Option<Filter>> {
    match parser.tokens.get(parser.pos) {
        Some(Token::Ident(word)) if word.eq_ignore_ascii_case("WHERE") => {
            parser.pos += 1;
            Ok(Some(parser.parse_filter()?))
        }
        None => Ok(None),
        Some(other) => Err(SqlError::parse(format!(
            "expected WHERE or end of statement, found {other:?}"
        ))),
    }
}
