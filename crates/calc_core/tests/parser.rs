use calc_core::{parse, reference, Expression, Operator, ParseError};

#[test]
fn parses_each_operator() {
    let cases = [
        ("(+ 5 3)", Operator::Add, 5.0, 3.0),
        ("(- 5 3)", Operator::Subtract, 5.0, 3.0),
        ("(* -2.5 4)", Operator::Multiply, -2.5, 4.0),
        ("(/ 10 2)", Operator::Divide, 10.0, 2.0),
        ("(/ 1 0)", Operator::Divide, 1.0, 0.0),
        ("(+ .5 1e2)", Operator::Add, 0.5, 100.0),
    ];
    for (text, op, a, b) in cases {
        let expr = parse(text).unwrap_or_else(|err| panic!("{text}: {err}"));
        assert_eq!(expr, Expression::new(op, a, b), "{text}");
        assert_eq!(expr.reserved(), 0.0);
    }
}

#[test]
fn tolerates_extra_whitespace() {
    let tight = parse("(+ 1 2)").expect("tight form");
    for text in ["  (+ 1 2)  ", "( + 1 2 )", "(+\t1\n2)", "(   +    1      2   )"] {
        assert_eq!(parse(text), Ok(tight), "{text:?}");
    }
}

#[test]
fn parsing_is_deterministic() {
    for text in ["(* 3.25 -8)", "(/ 7 0.1)", "(- -0 0)"] {
        let first = parse(text).expect("valid");
        for _ in 0..8 {
            assert_eq!(parse(text).expect("valid"), first);
        }
    }
}

#[test]
fn documented_error_kinds() {
    assert_eq!(parse("(+ 1)"), Err(ParseError::ArityMismatch { found: 2 }));
    assert_eq!(parse("(+ 1 2 3)"), Err(ParseError::ArityMismatch { found: 4 }));
    assert_eq!(parse("()"), Err(ParseError::ArityMismatch { found: 0 }));
    assert_eq!(
        parse("(% 1 2)"),
        Err(ParseError::UnknownOperator("%".into()))
    );
    assert_eq!(
        parse("(+ a 2)"),
        Err(ParseError::InvalidOperand("a".into()))
    );
    assert_eq!(
        parse("(+ 1 inf)"),
        Err(ParseError::InvalidOperand("inf".into()))
    );
    for literal in ["1e39", "-1e39", "1e-50"] {
        assert_eq!(
            parse(&format!("(+ {literal} 1)")),
            Err(ParseError::InvalidOperand(literal.into())),
            "{literal} is outside f32 range"
        );
    }
    assert_eq!(parse("(+ 0e99 1)").map(|e| e.operand_a()), Ok(0.0));
    assert_eq!(parse("(+ (* 1 2) 3)"), Err(ParseError::UnsupportedNesting));
    assert_eq!(parse("((+ 1 2))"), Err(ParseError::UnsupportedNesting));
}

#[test]
fn malformed_inputs() {
    for text in ["", "   ", "+ 1 2", "(+ 1 2", "+ 1 2)", "(+ 1 2))", ")+ 1 2(", "(+ 1 2) (+ 3 4)"] {
        assert_eq!(
            parse(text),
            Err(ParseError::MalformedExpression),
            "{text:?}"
        );
    }
}

#[test]
fn parsed_expressions_feed_the_reference() {
    assert_eq!(reference::evaluate(&parse("(+ 5 3)").unwrap()), 8.0);
    assert_eq!(reference::evaluate(&parse("(/ 10 2)").unwrap()), 5.0);
    let inf = reference::evaluate(&parse("(/ 1 0)").unwrap());
    assert!(inf.is_infinite() && inf.is_sign_positive());
}
