use indoc::indoc;

use crate::ast::*;
use crate::parser::parse;

fn parse_one(source: &str) -> Statement {
    let script = parse(source).unwrap();
    assert_eq!(script.statements.len(), 1, "expected a single statement");
    script.statements.into_iter().next().unwrap()
}

fn select(statement: Statement) -> SelectExpression {
    let Statement::With(with) = statement else {
        panic!("expected WITH statement");
    };
    let TableExpression::Select(select) = with.expression else {
        panic!("expected SELECT expression");
    };
    *select
}

#[test]
fn with_import_statement() {
    let statement = parse_one("WITH input AS IMPORT 'input';");
    let Statement::With(with) = statement else {
        panic!("expected WITH statement");
    };
    assert_eq!(with.target.name, "input");
    let TableExpression::Import(import) = with.expression else {
        panic!("expected IMPORT expression");
    };
    assert_eq!(import.location.value, "input");
}

#[test]
fn export_statement() {
    let statement = parse_one("EXPORT output TO 'sink';");
    let Statement::Export(export) = statement else {
        panic!("expected EXPORT statement");
    };
    assert_eq!(export.sink.value, "sink");
    assert!(matches!(
        export.expression,
        TableExpression::Reference(ref reference) if reference.name.name == "output"
    ));
}

#[test]
fn select_columns_and_aliases() {
    let select = select(parse_one("WITH t AS SELECT a, b AS c, * FROM input;"));
    assert_eq!(select.columns.len(), 3);

    assert!(matches!(
        &select.columns[0],
        ColumnBinding::Expression {
            expression: Expression::ColumnReference(reference),
            alias: None,
        } if reference.name == "a" && reference.namespace.is_none()
    ));
    assert!(matches!(
        &select.columns[1],
        ColumnBinding::Expression {
            alias: Some(alias),
            ..
        } if alias.name == "c"
    ));
    assert!(matches!(&select.columns[2], ColumnBinding::Wildcard { .. }));
    assert_eq!(select.source.expression.name(), Some("input"));
}

#[test]
fn qualified_column_references() {
    let select = select(parse_one("WITH t AS SELECT input.a FROM input;"));
    let ColumnBinding::Expression {
        expression: Expression::ColumnReference(reference),
        ..
    } = &select.columns[0]
    else {
        panic!("expected column reference");
    };
    assert_eq!(reference.namespace.as_deref(), Some("input"));
    assert_eq!(reference.name, "a");
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let select = select(parse_one("WITH t AS SELECT a + b * c AS r FROM input;"));
    let ColumnBinding::Expression {
        expression: Expression::Binary(add),
        ..
    } = &select.columns[0]
    else {
        panic!("expected binary expression");
    };
    assert_eq!(add.op, BinaryOp::Add);
    assert!(matches!(
        &add.right,
        Expression::Binary(multiply) if multiply.op == BinaryOp::Multiply
    ));
}

#[test]
fn subtraction_is_left_associative() {
    let select = select(parse_one("WITH t AS SELECT a - b - c AS r FROM input;"));
    let ColumnBinding::Expression {
        expression: Expression::Binary(outer),
        ..
    } = &select.columns[0]
    else {
        panic!("expected binary expression");
    };
    assert_eq!(outer.op, BinaryOp::Subtract);
    // ((a - b) - c): the left operand is itself a subtraction.
    assert!(matches!(
        &outer.left,
        Expression::Binary(inner) if inner.op == BinaryOp::Subtract
    ));
    assert!(matches!(
        &outer.right,
        Expression::ColumnReference(reference) if reference.name == "c"
    ));
}

#[test]
fn parenthesised_expressions() {
    let select = select(parse_one("WITH t AS SELECT (a + b) * c AS r FROM input;"));
    let ColumnBinding::Expression {
        expression: Expression::Binary(outer),
        ..
    } = &select.columns[0]
    else {
        panic!("expected binary expression");
    };
    assert_eq!(outer.op, BinaryOp::Multiply);
    assert!(matches!(
        &outer.left,
        Expression::Binary(inner) if inner.op == BinaryOp::Add
    ));
}

#[test]
fn function_calls() {
    let select = select(parse_one("WITH t AS SELECT add(a, b) AS c FROM input;"));
    let ColumnBinding::Expression {
        expression: Expression::FunctionCall(call),
        ..
    } = &select.columns[0]
    else {
        panic!("expected function call");
    };
    assert_eq!(call.name.name, "add");
    assert_eq!(call.args.len(), 2);
}

#[test]
fn join_with_on_constraint() {
    let select = select(parse_one(
        "WITH t AS SELECT key FROM a JOIN b ON a.key = b.key;",
    ));
    assert_eq!(select.joins.len(), 1);
    let join = &select.joins[0];
    assert_eq!(join.table.binding_name(), Some("b"));
    let JoinConstraint::On(Expression::Binary(predicate)) = &join.constraint else {
        panic!("expected ON constraint");
    };
    assert_eq!(predicate.op, BinaryOp::Equal);
}

#[test]
fn join_alias_overrides_binding_name() {
    let select = select(parse_one(
        "WITH t AS SELECT key FROM a JOIN b AS other ON a.key = other.key;",
    ));
    assert_eq!(select.joins[0].table.binding_name(), Some("other"));
}

#[test]
fn using_constraint_is_parsed() {
    let select = select(parse_one(
        "WITH t AS SELECT key FROM a JOIN b USING (key, subkey);",
    ));
    let JoinConstraint::Using { columns, .. } = &select.joins[0].constraint else {
        panic!("expected USING constraint");
    };
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].name, "key");
}

#[test]
fn where_clause() {
    let select = select(parse_one("WITH t AS SELECT a FROM input WHERE a = b;"));
    let clause = select.where_clause.expect("where clause");
    assert!(matches!(
        clause.predicate,
        Expression::Binary(ref predicate) if predicate.op == BinaryOp::Equal
    ));
}

#[test]
fn group_by_is_parsed() {
    let first_select = select(parse_one("WITH t AS SELECT a FROM input GROUP BY a, b;"));
    let clause = first_select.group_by.expect("group-by clause");
    assert!(!clause.consecutive);
    assert_eq!(clause.pattern.len(), 2);

    let second_select = select(parse_one(
        "WITH t AS SELECT a FROM input GROUP CONSECUTIVE BY a;",
    ));
    assert!(second_select.group_by.expect("group-by clause").consecutive);
}

#[test]
fn distinct_is_parsed() {
    let first_select = select(parse_one("WITH t AS SELECT DISTINCT a FROM input;"));
    assert!(!first_select.distinct.expect("distinct clause").consecutive);

    let second_select = select(parse_one(
        "WITH t AS SELECT DISTINCT CONSECUTIVE a FROM input;",
    ));
    assert!(second_select.distinct.expect("distinct clause").consecutive);
}

#[test]
fn multiple_statements() {
    let script = parse(indoc! {"
        WITH input AS IMPORT 'input';
        WITH output AS SELECT old AS new FROM input;
        EXPORT output TO 'output';
    "})
    .unwrap();
    assert_eq!(script.statements.len(), 3);
}

#[test]
fn statement_spans_cover_the_statement() {
    let source = "WITH input AS IMPORT 'input';";
    let statement = parse_one(source);
    let span = statement.span();
    assert_eq!(span.start, 0);
    assert_eq!(span.end, source.len() as u32);
}

#[test]
fn missing_semicolon_fails() {
    let err = parse("WITH input AS IMPORT 'input'").unwrap_err();
    assert!(err.message.contains("';'"), "message: {}", err.message);
}

#[test]
fn join_without_constraint_fails() {
    let err = parse("WITH t AS SELECT a FROM x JOIN y;").unwrap_err();
    assert!(
        err.message.contains("'ON' or 'USING'"),
        "message: {}",
        err.message
    );
}

#[test]
fn garbage_after_expression_fails() {
    let err = parse("WITH t AS SELECT FROM input;").unwrap_err();
    assert!(
        err.message.contains("expected an expression"),
        "message: {}",
        err.message
    );
}

#[test]
fn string_escapes() {
    let statement = parse_one(r"EXPORT t TO 'it\'s';");
    let Statement::Export(export) = statement else {
        panic!("expected EXPORT statement");
    };
    assert_eq!(export.sink.value, "it's");
}

#[test]
fn unknown_escape_fails() {
    let err = parse(r"EXPORT t TO 'bad\q';").unwrap_err();
    assert!(err.message.contains("escape"), "message: {}", err.message);
}

#[test]
fn integer_overflow_fails() {
    let err = parse("WITH t AS SELECT 99999999999999999999 AS x FROM input;").unwrap_err();
    assert!(
        err.message.contains("out of range"),
        "message: {}",
        err.message
    );
}
