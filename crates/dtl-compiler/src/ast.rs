//! Abstract syntax of DTL scripts.
//!
//! Every node carries the byte span it was parsed from; spans end up on
//! trace tables and in error messages.

use dtl_core::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Script {
    pub statements: Vec<Statement>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StringLit {
    pub value: String,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    /// `WITH <name> AS <table_expr>;`
    With(WithStatement),
    /// `EXPORT <table_expr> TO '<sink>';`
    Export(ExportStatement),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::With(stmt) => stmt.span,
            Statement::Export(stmt) => stmt.span,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WithStatement {
    pub target: Ident,
    pub expression: TableExpression,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExportStatement {
    pub expression: TableExpression,
    pub sink: StringLit,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TableExpression {
    /// `IMPORT '<location>'`
    Import(ImportExpression),
    /// A bare identifier referring to a `WITH` binding.
    Reference(TableReference),
    Select(Box<SelectExpression>),
}

impl TableExpression {
    pub fn span(&self) -> Span {
        match self {
            TableExpression::Import(expr) => expr.span,
            TableExpression::Reference(expr) => expr.span,
            TableExpression::Select(expr) => expr.span,
        }
    }

    /// The name a binding of this expression is known by when no alias is
    /// given. Only references have one.
    pub fn name(&self) -> Option<&str> {
        match self {
            TableExpression::Reference(expr) => Some(&expr.name.name),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImportExpression {
    pub location: StringLit,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableReference {
    pub name: Ident,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectExpression {
    pub distinct: Option<DistinctClause>,
    pub columns: Vec<ColumnBinding>,
    pub source: TableBinding,
    pub joins: Vec<JoinClause>,
    pub where_clause: Option<WhereClause>,
    pub group_by: Option<GroupByClause>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DistinctClause {
    pub consecutive: bool,
    pub span: Span,
}

/// A table expression with an optional `AS` alias, as it appears after
/// `FROM` and `JOIN`.
#[derive(Clone, Debug, PartialEq)]
pub struct TableBinding {
    pub expression: TableExpression,
    pub alias: Option<Ident>,
}

impl TableBinding {
    /// Alias if given, else the referenced table's own name.
    pub fn binding_name(&self) -> Option<&str> {
        self.alias
            .as_ref()
            .map(|alias| alias.name.as_str())
            .or_else(|| self.expression.name())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct JoinClause {
    pub table: TableBinding,
    pub constraint: JoinConstraint,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum JoinConstraint {
    /// `ON <predicate>`
    On(Expression),
    /// `USING (<column>, ...)` - parsed, rejected by lowering.
    Using { columns: Vec<Ident>, span: Span },
}

#[derive(Clone, Debug, PartialEq)]
pub struct WhereClause {
    pub predicate: Expression,
    pub span: Span,
}

/// `GROUP [CONSECUTIVE] BY <expr>, ...` - parsed, rejected by lowering.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupByClause {
    pub consecutive: bool,
    pub pattern: Vec<Expression>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ColumnBinding {
    /// `*`
    Wildcard { span: Span },
    /// `<expr>` or `<expr> AS <name>`
    Expression {
        expression: Expression,
        alias: Option<Ident>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    ColumnReference(ColumnReference),
    Literal(Literal),
    FunctionCall(FunctionCall),
    Binary(Box<BinaryExpression>),
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::ColumnReference(expr) => expr.span,
            Expression::Literal(expr) => expr.span,
            Expression::FunctionCall(expr) => expr.span,
            Expression::Binary(expr) => expr.span,
        }
    }
}

/// `c` or `t.c`.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnReference {
    pub namespace: Option<String>,
    pub name: String,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Literal {
    pub value: LiteralValue,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LiteralValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionCall {
    pub name: Ident,
    pub args: Vec<Expression>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BinaryExpression {
    pub op: BinaryOp,
    pub left: Expression,
    pub right: Expression,
    pub span: Span,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Equal => "=",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanEqual => ">=",
        }
    }
}
