//! CSS Values and Units Module Level 3 — §8 mathematical expressions.
//! Spec: <https://www.w3.org/TR/css-values-3/#calc-notation>
//!
//! Algebraic simplification of `calc()` expressions inside value strings:
//! constant folding, unit-aware addition grouped by unit, and nested
//! `calc()` flattening. Non-calc content passes through unchanged, as does
//! any `calc()` expression this module cannot reduce.

#![forbid(unsafe_code)]

use cssparser::{ParseError, Parser, ParserInput, Token};
use log::debug;

/// Values are rounded to five decimal places before rendering.
const PRECISION: f64 = 100_000.0;

/// Reduction error for a single `calc()` expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CalcError {
    /// The expression uses a construct that cannot be folded statically,
    /// e.g. a product of two dimensions or a division by zero.
    Irreducible,
}

/// One additive term: a numeric value with an optional lowercased unit.
/// A term without a unit is a plain number; percentages carry the unit `%`.
#[derive(Clone, Debug, PartialEq)]
struct Term {
    value: f64,
    unit: Option<String>,
}

/// Whether `character` can be part of a CSS identifier. A `calc(` preceded
/// by such a character belongs to a longer function name (e.g. `-moz-calc(`)
/// and is left alone.
fn is_ident_char(character: char) -> bool {
    character.is_ascii_alphanumeric() || character == '-' || character == '_'
}

/// Find the byte offset of the next `calc(` span start, matching the
/// function name ASCII-case-insensitively at an identifier boundary.
fn find_calc_start(text: &str) -> Option<usize> {
    for (index, _) in text.char_indices() {
        let Some(window) = text.get(index..index + 5) else {
            continue;
        };
        if !window.eq_ignore_ascii_case("calc(") {
            continue;
        }
        let boundary = text[..index]
            .chars()
            .next_back()
            .is_none_or(|previous| !is_ident_char(previous));
        if boundary {
            return Some(index);
        }
    }
    None
}

/// Find the byte offset of the parenthesis closing an already-open group.
/// `text` starts just after the opening `(`.
fn matching_paren(text: &str) -> Option<usize> {
    let mut depth = 1_u32;
    for (index, character) in text.char_indices() {
        match character {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

/// Negate every term of a sum.
fn negate(mut terms: Vec<Term>) -> Vec<Term> {
    for term in &mut terms {
        term.value = -term.value;
    }
    terms
}

/// Scale every term of a sum by a constant factor.
fn scale(mut terms: Vec<Term>, factor: f64) -> Vec<Term> {
    for term in &mut terms {
        term.value *= factor;
    }
    terms
}

/// Extract the value of a sum that reduced to a single unitless number.
fn as_number(terms: &[Term]) -> Option<f64> {
    match terms {
        [term] if term.unit.is_none() => Some(term.value),
        _ => None,
    }
}

/// Multiply two sums. At least one side must be a plain number.
fn multiply(lhs: Vec<Term>, rhs: Vec<Term>) -> Result<Vec<Term>, CalcError> {
    if let Some(factor) = as_number(&rhs) {
        return Ok(scale(lhs, factor));
    }
    if let Some(factor) = as_number(&lhs) {
        return Ok(scale(rhs, factor));
    }
    Err(CalcError::Irreducible)
}

/// Divide a sum by a nonzero plain number.
fn divide(lhs: Vec<Term>, rhs: Vec<Term>) -> Result<Vec<Term>, CalcError> {
    match as_number(&rhs) {
        Some(divisor) if divisor != 0.0 => Ok(scale(lhs, 1.0 / divisor)),
        _ => Err(CalcError::Irreducible),
    }
}

/// Combine terms with the same unit, preserving first-appearance order, and
/// drop zero terms while other terms remain.
fn normalize(terms: Vec<Term>) -> Vec<Term> {
    let mut combined: Vec<Term> = Vec::new();
    for term in terms {
        match combined.iter_mut().find(|existing| existing.unit == term.unit) {
            Some(existing) => existing.value += term.value,
            None => combined.push(term),
        }
    }
    let rounded: Vec<Term> = combined
        .into_iter()
        .map(|term| Term {
            value: (term.value * PRECISION).round() / PRECISION,
            unit: term.unit,
        })
        .collect();
    let nonzero: Vec<Term> = rounded
        .iter()
        .filter(|term| term.value != 0.0)
        .cloned()
        .collect();
    if nonzero.is_empty() {
        rounded.into_iter().take(1).collect()
    } else {
        nonzero
    }
}

/// Parse a `*`/`/` product of primaries.
fn parse_product(input: &mut Parser) -> Result<Vec<Term>, CalcError> {
    let mut terms = parse_primary(input)?;
    loop {
        let state = input.state();
        let token = match input.next() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::Delim('*') => terms = multiply(terms, parse_primary(input)?)?,
            Token::Delim('/') => terms = divide(terms, parse_primary(input)?)?,
            _ => {
                input.reset(&state);
                break;
            }
        }
    }
    Ok(terms)
}

/// Parse a `+`/`-` sum of products, consuming the input to its end.
fn parse_sum(input: &mut Parser) -> Result<Vec<Term>, CalcError> {
    let mut terms = parse_product(input)?;
    loop {
        let token = match input.next() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::Delim('+') => terms.extend(parse_product(input)?),
            Token::Delim('-') => terms.extend(negate(parse_product(input)?)),
            _ => return Err(CalcError::Irreducible),
        }
    }
    Ok(normalize(terms))
}

/// Parse one operand: a number, dimension, percentage, signed primary,
/// parenthesized sum, or nested `calc()`.
fn parse_primary(input: &mut Parser) -> Result<Vec<Term>, CalcError> {
    let token = match input.next() {
        Ok(token) => token.clone(),
        Err(_) => return Err(CalcError::Irreducible),
    };
    match token {
        Token::Number { value, .. } => Ok(vec![Term {
            value: f64::from(value),
            unit: None,
        }]),
        Token::Dimension { value, unit, .. } => Ok(vec![Term {
            value: f64::from(value),
            unit: Some(unit.as_ref().to_ascii_lowercase()),
        }]),
        Token::Percentage { unit_value, .. } => Ok(vec![Term {
            value: f64::from(unit_value) * 100.0,
            unit: Some("%".to_owned()),
        }]),
        Token::Delim('-') => Ok(negate(parse_primary(input)?)),
        Token::Delim('+') => parse_primary(input),
        Token::ParenthesisBlock => parse_nested_sum(input),
        Token::Function(name) if name.eq_ignore_ascii_case("calc") => parse_nested_sum(input),
        _ => Err(CalcError::Irreducible),
    }
}

/// Recurse into a parenthesis or nested `calc()` block.
fn parse_nested_sum(input: &mut Parser) -> Result<Vec<Term>, CalcError> {
    let nested = input.parse_nested_block(|block| {
        parse_sum(block).map_err(|_: CalcError| block.new_custom_error(()))
    });
    nested.map_err(|_: ParseError<'_, ()>| CalcError::Irreducible)
}

/// Render a number rounded to [`PRECISION`], without a trailing `.0`.
fn format_number(value: f64) -> String {
    let rounded = (value * PRECISION).round() / PRECISION;
    if rounded == 0.0 {
        // Collapses negative zero as well.
        "0".to_owned()
    } else {
        format!("{rounded}")
    }
}

/// Render one term as `<number><unit>`.
fn format_term(value: f64, unit: Option<&str>) -> String {
    let mut text = format_number(value);
    if let Some(suffix) = unit {
        text.push_str(suffix);
    }
    text
}

/// Render a reduced sum: a single term stands bare, several terms keep the
/// `calc()` wrapper with `+`/`-` separators.
fn render_terms(terms: &[Term]) -> String {
    match terms {
        [] => "0".to_owned(),
        [term] => format_term(term.value, term.unit.as_deref()),
        [first, rest @ ..] => {
            let mut text = String::from("calc(");
            text.push_str(&format_term(first.value, first.unit.as_deref()));
            for term in rest {
                if term.value < 0.0 {
                    text.push_str(" - ");
                    text.push_str(&format_term(-term.value, term.unit.as_deref()));
                } else {
                    text.push_str(" + ");
                    text.push_str(&format_term(term.value, term.unit.as_deref()));
                }
            }
            text.push(')');
            text
        }
    }
}

/// Reduce the arithmetic expression inside one `calc()` span.
fn reduce_expression(inner: &str) -> Result<String, CalcError> {
    let mut parser_input = ParserInput::new(inner);
    let mut input = Parser::new(&mut parser_input);
    let terms = parse_sum(&mut input)?;
    Ok(render_terms(&terms))
}

/// Simplify every `calc(...)` expression within `value`.
///
/// Each span is folded to a single value when its units agree
/// (`calc(0.5 * 4px)` becomes `2px`) and to a flattened sum otherwise
/// (`calc(calc(0.5 * 4px) + 2rem)` becomes `calc(2px + 2rem)`). Content
/// outside `calc()` spans, and spans that cannot be reduced, are preserved
/// byte-exact.
pub fn reduce_calc(value: &str) -> String {
    let mut output = String::new();
    let mut rest = value;
    while let Some(start) = find_calc_start(rest) {
        let after_open = &rest[start + 5..];
        let Some(close) = matching_paren(after_open) else {
            // Unbalanced parenthesis, leave the remainder untouched.
            output.push_str(rest);
            return output;
        };
        output.push_str(&rest[..start]);
        match reduce_expression(&after_open[..close]) {
            Ok(reduced) => output.push_str(&reduced),
            Err(CalcError::Irreducible) => {
                debug!("leaving irreducible expression untouched: {}", &rest[start..start + 5 + close + 1]);
                output.push_str(&rest[start..start + 5 + close + 1]);
            }
        }
        rest = &after_open[close + 1..];
    }
    output.push_str(rest);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that non-calc content passes through unchanged.
    ///
    /// # Panics
    /// Panics if assertions fail.
    #[test]
    fn passes_through_non_calc() {
        assert_eq!(reduce_calc("10px solid red"), "10px solid red");
        assert_eq!(reduce_calc(""), "");
    }

    /// Test folding same-unit addition to a bare value.
    ///
    /// # Panics
    /// Panics if assertions fail.
    #[test]
    fn folds_same_unit_addition() {
        assert_eq!(reduce_calc("calc(1px + 2px)"), "3px");
        assert_eq!(reduce_calc("calc(10px - 3px)"), "7px");
    }

    /// Test folding multiplication by a number.
    ///
    /// # Panics
    /// Panics if assertions fail.
    #[test]
    fn folds_multiplication() {
        assert_eq!(reduce_calc("calc(0.5 * 4px)"), "2px");
        assert_eq!(reduce_calc("calc(4px * 2)"), "8px");
    }

    /// Test folding division by a number.
    ///
    /// # Panics
    /// Panics if assertions fail.
    #[test]
    fn folds_division() {
        assert_eq!(reduce_calc("calc(4px / 2)"), "2px");
    }

    /// Test that nested calc flattens into the outer sum.
    ///
    /// # Panics
    /// Panics if assertions fail.
    #[test]
    fn flattens_nested_calc() {
        assert_eq!(
            reduce_calc("calc(calc(0.5 * 4px) + 2rem)"),
            "calc(2px + 2rem)"
        );
    }

    /// Test that mixed units keep the calc wrapper.
    ///
    /// # Panics
    /// Panics if assertions fail.
    #[test]
    fn keeps_wrapper_for_mixed_units() {
        assert_eq!(reduce_calc("calc(100% - 20px)"), "calc(100% - 20px)");
        assert_eq!(
            reduce_calc("calc(1px + 2px + 3rem)"),
            "calc(3px + 3rem)"
        );
    }

    /// Test that zero terms drop out of a mixed sum.
    ///
    /// # Panics
    /// Panics if assertions fail.
    #[test]
    fn drops_zero_terms() {
        assert_eq!(reduce_calc("calc(0px + 2rem)"), "2rem");
        assert_eq!(reduce_calc("calc(0px + 0px)"), "0px");
    }

    /// Test that irreducible expressions are preserved textually.
    ///
    /// # Panics
    /// Panics if assertions fail.
    #[test]
    fn preserves_irreducible_expressions() {
        assert_eq!(reduce_calc("calc(2px * 2px)"), "calc(2px * 2px)");
        assert_eq!(reduce_calc("calc(4px / 0)"), "calc(4px / 0)");
    }

    /// Test that surrounding text is preserved around a reduced span.
    ///
    /// # Panics
    /// Panics if assertions fail.
    #[test]
    fn reduces_span_in_context() {
        assert_eq!(
            reduce_calc("1px solid calc(1px + 1px) red"),
            "1px solid 2px red"
        );
        assert_eq!(
            reduce_calc("calc(1px + 1px) calc(1rem + 1rem)"),
            "2px 2rem"
        );
    }

    /// Test that a vendor-prefixed function name is not treated as calc.
    ///
    /// # Panics
    /// Panics if assertions fail.
    #[test]
    fn ignores_prefixed_function_names() {
        assert_eq!(reduce_calc("-moz-calc(1px + 1px)"), "-moz-calc(1px + 1px)");
    }

    /// Test rounding to five decimal places.
    ///
    /// # Panics
    /// Panics if assertions fail.
    #[test]
    fn rounds_to_five_decimals() {
        assert_eq!(reduce_calc("calc(10px / 3)"), "3.33333px");
    }

    /// Test parenthesized groups.
    ///
    /// # Panics
    /// Panics if assertions fail.
    #[test]
    fn folds_parenthesized_groups() {
        assert_eq!(reduce_calc("calc((1 + 1) * 2px)"), "4px");
    }
}
