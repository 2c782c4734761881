//! Recursive-descent parser for DTL scripts.
//!
//! Fails fast: the first syntax error aborts the parse with its span.
//! Operator precedence is comparison < additive < multiplicative, all
//! left-associative.

#[cfg(debug_assertions)]
use std::cell::Cell;

use dtl_core::Span;

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{Token, lex};

/// Nesting limit for table and column expressions, preventing stack
/// overflow on adversarial input.
const MAX_DEPTH: u32 = 128;

/// Debug-mode progress detector. Decremented on lookahead, reset on
/// `bump()`; catches grammar rules that loop without consuming input.
#[cfg(debug_assertions)]
const DEFAULT_FUEL: u32 = 256;

pub fn parse(source: &str) -> Result<Script, ParseError> {
    let tokens = lex(source)?;
    Parser::new(source, tokens).parse_script()
}

struct Parser<'src> {
    tokens: Vec<(Token<'src>, Span)>,
    pos: usize,
    eof: Span,
    depth: u32,
    #[cfg(debug_assertions)]
    fuel: Cell<u32>,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str, tokens: Vec<(Token<'src>, Span)>) -> Self {
        let end = source.len() as u32;
        Self {
            tokens,
            pos: 0,
            eof: Span::new(end, end),
            depth: 0,
            #[cfg(debug_assertions)]
            fuel: Cell::new(DEFAULT_FUEL),
        }
    }

    // --- token access ---

    fn current(&self) -> Option<&Token<'src>> {
        #[cfg(debug_assertions)]
        {
            assert!(
                self.fuel.get() > 0,
                "parser is stuck: no progress made in {DEFAULT_FUEL} iterations",
            );
            self.fuel.set(self.fuel.get() - 1);
        }
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map_or(self.eof, |(_, span)| *span)
    }

    fn prev_span(&self) -> Span {
        assert!(self.pos > 0, "prev_span before any token was consumed");
        self.tokens[self.pos - 1].1
    }

    fn bump(&mut self) -> (Token<'src>, Span) {
        #[cfg(debug_assertions)]
        self.fuel.set(DEFAULT_FUEL);
        let entry = self.tokens[self.pos].clone();
        self.pos += 1;
        entry
    }

    fn at(&self, token: &Token<'_>) -> bool {
        self.current() == Some(token)
    }

    fn eat(&mut self, token: &Token<'_>) -> bool {
        if self.at(token) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token<'_>, expected: &str) -> Result<Span, ParseError> {
        if self.at(token) {
            Ok(self.bump().1)
        } else {
            Err(self.error_expected(expected))
        }
    }

    fn error_expected(&self, expected: &str) -> ParseError {
        let message = match self.current() {
            Some(token) => format!("expected {expected}, found {}", token.describe()),
            None => format!("expected {expected}, found end of input"),
        };
        ParseError::new(message, self.current_span())
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::new(
                "expression nested too deeply",
                self.current_span(),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn exit(&mut self) {
        self.depth -= 1;
    }

    // --- names and literals ---

    fn parse_ident(&mut self, expected: &str) -> Result<Ident, ParseError> {
        match self.current() {
            Some(Token::Name(name)) => {
                let name = (*name).to_owned();
                let span = self.bump().1;
                Ok(Ident { name, span })
            }
            Some(Token::QuotedName(text)) => {
                let name = unescape(&text[1..text.len() - 1], self.current_span())?;
                let span = self.bump().1;
                Ok(Ident { name, span })
            }
            _ => Err(self.error_expected(expected)),
        }
    }

    fn parse_string(&mut self, expected: &str) -> Result<StringLit, ParseError> {
        match self.current() {
            Some(Token::String(text)) => {
                let value = unescape(&text[1..text.len() - 1], self.current_span())?;
                let span = self.bump().1;
                Ok(StringLit { value, span })
            }
            _ => Err(self.error_expected(expected)),
        }
    }

    // --- statements ---

    fn parse_script(mut self) -> Result<Script, ParseError> {
        let mut statements = Vec::new();
        while self.current().is_some() {
            statements.push(self.parse_statement()?);
        }
        Ok(Script { statements })
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match self.current() {
            Some(Token::With) => self.parse_with_statement().map(Statement::With),
            Some(Token::Export) => self.parse_export_statement().map(Statement::Export),
            _ => Err(self.error_expected("a statement ('WITH' or 'EXPORT')")),
        }
    }

    fn parse_with_statement(&mut self) -> Result<WithStatement, ParseError> {
        let start = self.expect(&Token::With, "'WITH'")?;
        let target = self.parse_ident("a binding name")?;
        self.expect(&Token::As, "'AS'")?;
        let expression = self.parse_table_expression()?;
        let end = self.expect(&Token::Semicolon, "';'")?;
        Ok(WithStatement {
            target,
            expression,
            span: start.cover(end),
        })
    }

    fn parse_export_statement(&mut self) -> Result<ExportStatement, ParseError> {
        let start = self.expect(&Token::Export, "'EXPORT'")?;
        let expression = self.parse_table_expression()?;
        self.expect(&Token::To, "'TO'")?;
        let sink = self.parse_string("a sink name")?;
        let end = self.expect(&Token::Semicolon, "';'")?;
        Ok(ExportStatement {
            expression,
            sink,
            span: start.cover(end),
        })
    }

    // --- table expressions ---

    fn parse_table_expression(&mut self) -> Result<TableExpression, ParseError> {
        self.enter()?;
        let result = match self.current() {
            Some(Token::Import) => self.parse_import_expression(),
            Some(Token::Select) => self.parse_select_expression(),
            Some(Token::Name(_) | Token::QuotedName(_)) => {
                let name = self.parse_ident("a table name")?;
                let span = name.span;
                Ok(TableExpression::Reference(TableReference { name, span }))
            }
            _ => Err(self.error_expected("a table expression")),
        };
        self.exit();
        result
    }

    fn parse_import_expression(&mut self) -> Result<TableExpression, ParseError> {
        let start = self.expect(&Token::Import, "'IMPORT'")?;
        let location = self.parse_string("an input location")?;
        let span = start.cover(location.span);
        Ok(TableExpression::Import(ImportExpression { location, span }))
    }

    fn parse_select_expression(&mut self) -> Result<TableExpression, ParseError> {
        let start = self.expect(&Token::Select, "'SELECT'")?;

        let distinct = if self.at(&Token::Distinct) {
            let span = self.bump().1;
            let consecutive = self.at(&Token::Consecutive);
            let span = if consecutive {
                span.cover(self.bump().1)
            } else {
                span
            };
            Some(DistinctClause { consecutive, span })
        } else {
            None
        };

        let mut columns = vec![self.parse_column_binding()?];
        while self.eat(&Token::Comma) {
            columns.push(self.parse_column_binding()?);
        }

        self.expect(&Token::From, "'FROM'")?;
        let source = self.parse_table_binding()?;

        let mut joins = Vec::new();
        while self.at(&Token::Join) {
            joins.push(self.parse_join_clause()?);
        }

        let where_clause = if self.at(&Token::Where) {
            let keyword = self.bump().1;
            let predicate = self.parse_expression()?;
            let span = keyword.cover(predicate.span());
            Some(WhereClause { predicate, span })
        } else {
            None
        };

        let group_by = if self.at(&Token::Group) {
            Some(self.parse_group_by_clause()?)
        } else {
            None
        };

        let span = start.cover(self.prev_span());
        Ok(TableExpression::Select(Box::new(SelectExpression {
            distinct,
            columns,
            source,
            joins,
            where_clause,
            group_by,
            span,
        })))
    }

    fn parse_table_binding(&mut self) -> Result<TableBinding, ParseError> {
        let expression = self.parse_table_expression()?;
        let alias = if self.eat(&Token::As) {
            Some(self.parse_ident("an alias")?)
        } else {
            None
        };
        Ok(TableBinding { expression, alias })
    }

    fn parse_join_clause(&mut self) -> Result<JoinClause, ParseError> {
        let start = self.expect(&Token::Join, "'JOIN'")?;
        let table = self.parse_table_binding()?;

        let constraint = match self.current() {
            Some(Token::On) => {
                self.bump();
                JoinConstraint::On(self.parse_expression()?)
            }
            Some(Token::Using) => {
                let keyword = self.bump().1;
                self.expect(&Token::OpenParen, "'('")?;
                let mut columns = vec![self.parse_ident("a column name")?];
                while self.eat(&Token::Comma) {
                    columns.push(self.parse_ident("a column name")?);
                }
                let close = self.expect(&Token::CloseParen, "')'")?;
                JoinConstraint::Using {
                    columns,
                    span: keyword.cover(close),
                }
            }
            _ => return Err(self.error_expected("'ON' or 'USING'")),
        };

        let span = start.cover(self.prev_span());
        Ok(JoinClause {
            table,
            constraint,
            span,
        })
    }

    fn parse_group_by_clause(&mut self) -> Result<GroupByClause, ParseError> {
        let start = self.expect(&Token::Group, "'GROUP'")?;
        let consecutive = self.eat(&Token::Consecutive);
        self.expect(&Token::By, "'BY'")?;
        let mut pattern = vec![self.parse_expression()?];
        while self.eat(&Token::Comma) {
            pattern.push(self.parse_expression()?);
        }
        let span = start.cover(self.prev_span());
        Ok(GroupByClause {
            consecutive,
            pattern,
            span,
        })
    }

    fn parse_column_binding(&mut self) -> Result<ColumnBinding, ParseError> {
        if self.at(&Token::Star) {
            let span = self.bump().1;
            return Ok(ColumnBinding::Wildcard { span });
        }

        let expression = self.parse_expression()?;
        let alias = if self.eat(&Token::As) {
            Some(self.parse_ident("a column alias")?)
        } else {
            None
        };
        Ok(ColumnBinding::Expression { expression, alias })
    }

    // --- column expressions ---

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.enter()?;
        let result = self.parse_comparison();
        self.exit();
        result
    }

    fn parse_comparison(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_additive()?;
        while let Some(op) = self.comparison_op() {
            self.bump();
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn comparison_op(&self) -> Option<BinaryOp> {
        match self.current() {
            Some(Token::Eq) => Some(BinaryOp::Equal),
            Some(Token::NotEq) => Some(BinaryOp::NotEqual),
            Some(Token::LessThan) => Some(BinaryOp::LessThan),
            Some(Token::LessThanEq) => Some(BinaryOp::LessThanEqual),
            Some(Token::GreaterThan) => Some(BinaryOp::GreaterThan),
            Some(Token::GreaterThanEq) => Some(BinaryOp::GreaterThanEqual),
            _ => None,
        }
    }

    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Subtract,
                _ => break,
            };
            self.bump();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_primary()?;
        loop {
            let op = match self.current() {
                Some(Token::Star) => BinaryOp::Multiply,
                Some(Token::Slash) => BinaryOp::Divide,
                _ => break,
            };
            self.bump();
            let right = self.parse_primary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        self.enter()?;
        let result = self.parse_primary_inner();
        self.exit();
        result
    }

    fn parse_primary_inner(&mut self) -> Result<Expression, ParseError> {
        match self.current() {
            Some(Token::OpenParen) => {
                self.bump();
                let inner = self.parse_expression()?;
                self.expect(&Token::CloseParen, "')'")?;
                Ok(inner)
            }
            Some(Token::True) => {
                let span = self.bump().1;
                Ok(literal(LiteralValue::Bool(true), span))
            }
            Some(Token::False) => {
                let span = self.bump().1;
                Ok(literal(LiteralValue::Bool(false), span))
            }
            Some(Token::Integer(text)) => {
                let text = *text;
                let span = self.current_span();
                let value = text
                    .parse::<i64>()
                    .map_err(|_| ParseError::new(format!("integer '{text}' out of range"), span))?;
                self.bump();
                Ok(literal(LiteralValue::Integer(value), span))
            }
            Some(Token::Float(text)) => {
                let text = *text;
                let span = self.current_span();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| ParseError::new(format!("invalid float '{text}'"), span))?;
                self.bump();
                Ok(literal(LiteralValue::Float(value), span))
            }
            Some(Token::String(text)) => {
                let value = unescape(&text[1..text.len() - 1], self.current_span())?;
                let span = self.bump().1;
                Ok(literal(LiteralValue::Text(value), span))
            }
            Some(Token::ByteString(text)) => {
                let value = unescape(&text[2..text.len() - 1], self.current_span())?;
                let span = self.bump().1;
                Ok(literal(LiteralValue::Bytes(value.into_bytes()), span))
            }
            Some(Token::Name(_) | Token::QuotedName(_)) => self.parse_reference_or_call(),
            _ => Err(self.error_expected("an expression")),
        }
    }

    /// `c`, `t.c`, or `f(args...)`.
    fn parse_reference_or_call(&mut self) -> Result<Expression, ParseError> {
        let first = self.parse_ident("a column name")?;

        if self.at(&Token::Dot) {
            self.bump();
            let column = self.parse_ident("a column name")?;
            let span = first.span.cover(column.span);
            return Ok(Expression::ColumnReference(ColumnReference {
                namespace: Some(first.name),
                name: column.name,
                span,
            }));
        }

        if self.at(&Token::OpenParen) {
            self.bump();
            let mut args = Vec::new();
            if !self.at(&Token::CloseParen) {
                args.push(self.parse_expression()?);
                while self.eat(&Token::Comma) {
                    args.push(self.parse_expression()?);
                }
            }
            let close = self.expect(&Token::CloseParen, "')'")?;
            let span = first.span.cover(close);
            return Ok(Expression::FunctionCall(FunctionCall {
                name: first,
                args,
                span,
            }));
        }

        let span = first.span;
        Ok(Expression::ColumnReference(ColumnReference {
            namespace: None,
            name: first.name,
            span,
        }))
    }
}

fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    let span = left.span().cover(right.span());
    Expression::Binary(Box::new(BinaryExpression {
        op,
        left,
        right,
        span,
    }))
}

fn literal(value: LiteralValue, span: Span) -> Expression {
    Expression::Literal(Literal { value, span })
}

/// Resolve backslash escapes inside a quoted token body.
fn unescape(body: &str, span: Span) -> Result<String, ParseError> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => {
                return Err(ParseError::new(
                    format!("unknown escape sequence '\\{other}'"),
                    span,
                ));
            }
            None => {
                return Err(ParseError::new("dangling escape at end of literal", span));
            }
        }
    }
    Ok(out)
}
