//! Bracketed prefix-notation parser: `( <op> <num> <num> )`.

use crate::{Expression, Operator, ParseError, Scalar};

/// Parses a single-level `(op a b)` form.
///
/// Parentheses are split into their own tokens and whitespace runs collapse, so
/// `"(  +  1   2 )"` and `"(+ 1 2)"` parse identically.
pub fn parse(text: &str) -> Result<Expression, ParseError> {
    let tokens = tokenize(text);
    let inner = strip_outer_form(&tokens)?;

    let [symbol, lhs, rhs] = inner else {
        return Err(ParseError::ArityMismatch { found: inner.len() });
    };

    let operator = Operator::from_symbol(symbol)
        .ok_or_else(|| ParseError::UnknownOperator(symbol.to_string()))?;
    let operand_a = parse_operand(lhs)?;
    let operand_b = parse_operand(rhs)?;

    Ok(Expression::new(operator, operand_a, operand_b))
}

fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    for chunk in text.split_whitespace() {
        let mut rest = chunk;
        while let Some(idx) = rest.find(['(', ')']) {
            if idx > 0 {
                tokens.push(&rest[..idx]);
            }
            tokens.push(&rest[idx..idx + 1]);
            rest = &rest[idx + 1..];
        }
        if !rest.is_empty() {
            tokens.push(rest);
        }
    }
    tokens
}

/// Validates the paren structure and returns the tokens between the outer pair.
fn strip_outer_form<'a, 'b>(tokens: &'b [&'a str]) -> Result<&'b [&'a str], ParseError> {
    let (Some(&"("), Some(&")")) = (tokens.first(), tokens.last()) else {
        return Err(ParseError::MalformedExpression);
    };

    let mut depth = 0usize;
    let mut nested = false;
    for (idx, token) in tokens.iter().enumerate() {
        match *token {
            "(" => {
                depth += 1;
                nested |= depth > 1;
            }
            ")" => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(ParseError::MalformedExpression)?;
                // The outer form must close on the final token.
                if depth == 0 && idx != tokens.len() - 1 {
                    return Err(ParseError::MalformedExpression);
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ParseError::MalformedExpression);
    }
    if nested {
        return Err(ParseError::UnsupportedNesting);
    }

    Ok(&tokens[1..tokens.len() - 1])
}

fn parse_operand(token: &str) -> Result<Scalar, ParseError> {
    if !is_decimal_literal(token) {
        return Err(ParseError::InvalidOperand(token.to_string()));
    }
    match token.parse::<Scalar>() {
        // Out-of-range literals would otherwise round to infinity or zero.
        Ok(value) if value.is_finite() && (value != 0.0 || !has_nonzero_digit(token)) => Ok(value),
        _ => Err(ParseError::InvalidOperand(token.to_string())),
    }
}

fn has_nonzero_digit(token: &str) -> bool {
    let mantissa = token.split(['e', 'E']).next().unwrap_or(token);
    mantissa.bytes().any(|b| matches!(b, b'1'..=b'9'))
}

/// `[+-]? (digits ('.' digits?)? | '.' digits) ([eE] [+-]? digits)?`
///
/// Rejects the `inf`/`nan` spellings that `f32::from_str` would otherwise accept.
fn is_decimal_literal(token: &str) -> bool {
    let bytes = token.as_bytes();
    let mut pos = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        pos += 1;
    }

    let int_digits = count_digits(&bytes[pos..]);
    pos += int_digits;

    let mut frac_digits = 0;
    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        frac_digits = count_digits(&bytes[pos..]);
        pos += frac_digits;
    }
    if int_digits == 0 && frac_digits == 0 {
        return false;
    }

    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        pos += 1;
        if matches!(bytes.get(pos), Some(b'+' | b'-')) {
            pos += 1;
        }
        let exp_digits = count_digits(&bytes[pos..]);
        if exp_digits == 0 {
            return false;
        }
        pos += exp_digits;
    }

    pos == bytes.len()
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_isolates_parentheses() {
        assert_eq!(tokenize("(+ 1 2)"), vec!["(", "+", "1", "2", ")"]);
        assert_eq!(tokenize("  ( *\t-1.5   2 ) "), vec!["(", "*", "-1.5", "2", ")"]);
        assert_eq!(tokenize("(+(1)2)"), vec!["(", "+", "(", "1", ")", "2", ")"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn decimal_literals() {
        for ok in ["0", "5", "-3", "+2", "1.", "1.25", ".5", "-.5", "1e3", "2.5E-2", "-4e+1"] {
            assert!(is_decimal_literal(ok), "{ok} should be accepted");
        }
        for bad in ["", "-", ".", "a", "1.2.3", "1e", "e5", "inf", "-inf", "NaN", "0x10", "1_000"] {
            assert!(!is_decimal_literal(bad), "{bad} should be rejected");
        }
    }

    #[test]
    fn outer_form_must_close_last() {
        let tokens = tokenize("(+ 1 2) (+ 3 4)");
        assert_eq!(
            strip_outer_form(&tokens),
            Err(ParseError::MalformedExpression)
        );
    }
}
