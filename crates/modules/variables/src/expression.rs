//! Parsing `var()` references out of declaration values.
//! Spec: <https://www.w3.org/TR/css-variables-1/#using-variables>

/// One segment of a declaration value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExpressionNode {
    /// A fragment containing no reference syntax, contributed verbatim.
    Literal(String),
    /// A `var(name[, fallback])` reference to another custom property.
    VariableRef {
        /// Referenced property name, including the leading `--`.
        name: String,
        /// Fallback expression used when the reference cannot be resolved.
        /// A full expression, so fallbacks may mix literal text and nested
        /// references (e.g. `rgb(242, var(--green), 22)`).
        fallback: Option<ParsedExpression>,
    },
}

/// Ordered node sequence for one declaration value. Concatenating the
/// literals and substituted references reproduces the original text.
pub type ParsedExpression = Vec<ExpressionNode>;

/// Parse error for a `var()` reference that is not valid CSS.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MalformedReference {
    /// The reference's opening parenthesis has no matching close.
    UnclosedParenthesis,
    /// No custom property name (`--*`) follows `var(`.
    MissingName,
}

/// Whether `character` can be part of a CSS identifier. A `var(` preceded by
/// such a character belongs to a longer function name (e.g. `boovar(`) and is
/// not a reference.
fn is_ident_char(character: char) -> bool {
    character.is_ascii_alphanumeric() || character == '-' || character == '_'
}

/// Find the byte offset of the next `var(` reference start, matching the
/// function name ASCII-case-insensitively at an identifier boundary.
fn find_reference_start(text: &str) -> Option<usize> {
    for (index, _) in text.char_indices() {
        let Some(window) = text.get(index..index + 4) else {
            continue;
        };
        if !window.eq_ignore_ascii_case("var(") {
            continue;
        }
        let boundary = text[..index].chars().next_back().is_none_or(|previous| !is_ident_char(previous));
        if boundary {
            return Some(index);
        }
    }
    None
}

/// Find the byte offset of the parenthesis closing an already-open group,
/// tracking nested parentheses. `text` starts just after the opening `(`.
fn matching_paren(text: &str) -> Result<usize, MalformedReference> {
    let mut depth = 1_u32;
    for (index, character) in text.char_indices() {
        match character {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(index);
                }
            }
            _ => {}
        }
    }
    Err(MalformedReference::UnclosedParenthesis)
}

/// Split reference arguments at the first top-level comma, if any.
fn split_reference_args(inner: &str) -> (&str, Option<&str>) {
    let mut depth = 0_u32;
    for (index, character) in inner.char_indices() {
        match character {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return (&inner[..index], Some(&inner[index + 1..])),
            _ => {}
        }
    }
    (inner, None)
}

/// Parse the inside of one `var(...)` span into a reference node.
fn parse_reference(inner: &str) -> Result<ExpressionNode, MalformedReference> {
    let (name_text, fallback_text) = split_reference_args(inner);
    let name = name_text.trim();
    let named_like_custom_property =
        name.starts_with("--") && name.len() > 2 && !name.contains(char::is_whitespace);
    if !named_like_custom_property {
        return Err(MalformedReference::MissingName);
    }
    let fallback = match fallback_text {
        Some(text) => Some(parse(text.trim())?),
        None => None,
    };
    Ok(ExpressionNode::VariableRef {
        name: name.to_owned(),
        fallback,
    })
}

/// Parse a raw declaration value into an alternating sequence of literal
/// spans and `var()` references, scanning left to right.
///
/// # Errors
/// Returns [`MalformedReference`] when a reference has no matching closing
/// parenthesis or no custom property name follows `var(`.
pub fn parse(value: &str) -> Result<ParsedExpression, MalformedReference> {
    let mut nodes = ParsedExpression::new();
    let mut rest = value;
    while !rest.is_empty() {
        let Some(start) = find_reference_start(rest) else {
            nodes.push(ExpressionNode::Literal(rest.to_owned()));
            break;
        };
        if start > 0 {
            nodes.push(ExpressionNode::Literal(rest[..start].to_owned()));
        }
        let after_open = &rest[start + 4..];
        let close = matching_paren(after_open)?;
        nodes.push(parse_reference(&after_open[..close])?);
        rest = &after_open[close + 1..];
    }
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(text: &str) -> ExpressionNode {
        ExpressionNode::Literal(text.to_owned())
    }

    fn reference(name: &str, fallback: Option<ParsedExpression>) -> ExpressionNode {
        ExpressionNode::VariableRef {
            name: name.to_owned(),
            fallback,
        }
    }

    /// Test that a value without references is a single literal.
    ///
    /// # Panics
    /// Panics if assertions fail.
    #[test]
    fn literal_only() {
        assert_eq!(parse("1px solid black"), Ok(vec![literal("1px solid black")]));
    }

    /// Test parsing a bare reference with surrounding whitespace in the name.
    ///
    /// # Panics
    /// Panics if assertions fail.
    #[test]
    fn bare_reference_trims_name() {
        assert_eq!(parse("var( --light )"), Ok(vec![reference("--light", None)]));
    }

    /// Test parsing a reference with a literal fallback.
    ///
    /// # Panics
    /// Panics if assertions fail.
    #[test]
    fn literal_fallback() {
        assert_eq!(
            parse("var(--light, white)"),
            Ok(vec![reference("--light", Some(vec![literal("white")]))])
        );
    }

    /// Test parsing a nested reference fallback.
    ///
    /// # Panics
    /// Panics if assertions fail.
    #[test]
    fn nested_reference_fallback() {
        assert_eq!(
            parse("var(--light, var(--whitish, #fffffe))"),
            Ok(vec![reference(
                "--light",
                Some(vec![reference(
                    "--whitish",
                    Some(vec![literal("#fffffe")])
                )])
            )])
        );
    }

    /// Test a composite fallback mixing literal text and a reference.
    ///
    /// # Panics
    /// Panics if assertions fail.
    #[test]
    fn composite_fallback() {
        assert_eq!(
            parse("var(--missing, rgb(242, var(--green), 22))"),
            Ok(vec![reference(
                "--missing",
                Some(vec![
                    literal("rgb(242, "),
                    reference("--green", None),
                    literal(", 22)"),
                ])
            )])
        );
    }

    /// Test a reference embedded inside another function call.
    ///
    /// # Panics
    /// Panics if assertions fail.
    #[test]
    fn reference_inside_function_call() {
        assert_eq!(
            parse("rgba(0, 0, 0, var(--opacity))"),
            Ok(vec![
                literal("rgba(0, 0, 0, "),
                reference("--opacity", None),
                literal(")"),
            ])
        );
    }

    /// Test that `var(` inside a longer identifier is literal text.
    ///
    /// # Panics
    /// Panics if assertions fail.
    #[test]
    fn longer_function_name_is_literal() {
        assert_eq!(
            parse("boovar(--x) var(--y)"),
            Ok(vec![literal("boovar(--x) "), reference("--y", None)])
        );
    }

    /// Test that a reference missing its closing parenthesis is rejected.
    ///
    /// # Panics
    /// Panics if assertions fail.
    #[test]
    fn unclosed_reference() {
        assert_eq!(
            parse("var(--light, var(--whitish)"),
            Err(MalformedReference::UnclosedParenthesis)
        );
    }

    /// Test that a reference without a custom property name is rejected.
    ///
    /// # Panics
    /// Panics if assertions fail.
    #[test]
    fn missing_name() {
        assert_eq!(parse("var()"), Err(MalformedReference::MissingName));
        assert_eq!(parse("var(light)"), Err(MalformedReference::MissingName));
        assert_eq!(parse("var(--)"), Err(MalformedReference::MissingName));
    }

    /// Test that an empty fallback substitutes as the empty expression.
    ///
    /// # Panics
    /// Panics if assertions fail.
    #[test]
    fn empty_fallback() {
        assert_eq!(
            parse("var(--light,)"),
            Ok(vec![reference("--light", Some(Vec::new()))])
        );
    }
}
