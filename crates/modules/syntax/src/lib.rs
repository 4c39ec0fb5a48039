//! CSS Syntax Module Level 3 — parsing stylesheets into rules and declarations.
//! Spec: <https://www.w3.org/TR/css-syntax-3/>

#![forbid(unsafe_code)]

use cssparser::AtRuleParser as CssAtRuleParser;
use cssparser::BasicParseErrorKind;
use cssparser::CowRcStr;
use cssparser::DeclarationParser as CssDeclarationParser;
use cssparser::ParseError;
use cssparser::Parser;
use cssparser::ParserInput;
use cssparser::ParserState;
use cssparser::QualifiedRuleParser as CssQualifiedRuleParser;
use cssparser::RuleBodyItemParser as CssRuleBodyItemParser;
use cssparser::RuleBodyParser as CssRuleBodyParser;
use cssparser::StyleSheetParser;
use cssparser::Token;

/// A single CSS declaration (property: value [!important]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    /// Property name. Custom properties (`--*`) keep their exact case,
    /// since they are case-sensitive; all other names are lowercased.
    pub name: String,
    /// Raw value text with comments removed and without a trailing `!important`.
    pub value: String,
    /// Whether the declaration was marked as `!important`.
    pub important: bool,
}

/// A single style rule with its selector list and parsed declarations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleRule {
    /// Selectors from the rule prelude, split on top-level commas and trimmed.
    pub selectors: Vec<String>,
    /// Declarations within the rule block, in source order.
    pub declarations: Vec<Declaration>,
}

/// A parsed stylesheet consisting of style rules.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stylesheet {
    /// Top-level style rules in source order. At-rules are skipped.
    pub rules: Vec<StyleRule>,
}

/// Parse `!important` at the end of a value, returning (`value_without_important`, `important_flag`).
fn split_important_tail(value: &str) -> (String, bool) {
    let trimmed = value.trim();
    if let Some(pos) = trimmed.rfind("!important")
        && let Some(prefix) = trimmed.get(..pos)
    {
        let head = prefix.trim_end();
        return (head.to_owned(), true);
    }
    (trimmed.to_owned(), false)
}

/// Consume the remaining declaration value, dropping comment tokens.
///
/// Comments separate tokens, so each one is replaced by a single space; the
/// surrounding text is otherwise preserved byte-exact.
fn consume_value_text(input: &mut Parser) -> String {
    let mut value = String::new();
    let mut run_start = input.position();
    loop {
        let token_start = input.position();
        let is_comment = match input.next_including_whitespace_and_comments() {
            Ok(token) => matches!(token, Token::Comment(_)),
            Err(_) => break,
        };
        if is_comment {
            value.push_str(input.slice(run_start..token_start));
            value.push(' ');
            run_start = input.position();
        }
    }
    value.push_str(input.slice(run_start..input.position()));
    value
}

/// Append a trimmed, non-empty selector to the list.
fn push_selector(selectors: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        selectors.push(trimmed.to_owned());
    }
}

/// Split a rule prelude into its selector list on top-level commas.
///
/// Commas inside parentheses, square brackets, or quoted strings (e.g. within
/// `:not(.a, .b)` or attribute selectors) do not separate selectors.
fn split_selector_list(prelude: &str) -> Vec<String> {
    let mut selectors = Vec::new();
    let mut depth = 0_u32;
    let mut quote: Option<char> = None;
    let mut start = 0_usize;
    for (index, character) in prelude.char_indices() {
        match quote {
            Some(open) => {
                if character == open {
                    quote = None;
                }
            }
            None => match character {
                '(' | '[' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                '"' | '\'' => quote = Some(character),
                ',' if depth == 0 => {
                    push_selector(&mut selectors, &prelude[start..index]);
                    start = index + 1;
                }
                _ => {}
            },
        }
    }
    push_selector(&mut selectors, &prelude[start..]);
    selectors
}

/// A declaration parser that records property name and its raw value.
struct BodyDeclParser;

impl CssDeclarationParser<'_> for BodyDeclParser {
    type Declaration = Declaration;
    type Error = ();

    fn parse_value<'input>(
        &mut self,
        name: CowRcStr<'input>,
        input: &mut Parser<'input, '_>,
        _decl_start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'input, Self::Error>> {
        let raw = consume_value_text(input);
        let (value, important) = split_important_tail(&raw);
        let property = if name.starts_with("--") {
            name.as_ref().to_owned()
        } else {
            name.to_ascii_lowercase()
        };
        Ok(Declaration {
            name: property,
            value,
            important,
        })
    }
}

impl CssAtRuleParser<'_> for BodyDeclParser {
    type Prelude = ();
    type AtRule = Declaration; // Not produced
    type Error = ();

    #[inline]
    fn parse_prelude<'input>(
        &mut self,
        _name: CowRcStr<'input>,
        _input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        Ok(())
    }

    #[inline]
    fn parse_block<'input>(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::AtRule, ParseError<'input, Self::Error>> {
        // Not produced by this parser
        Err(input.new_error(BasicParseErrorKind::AtRuleBodyInvalid))
    }

    #[inline]
    fn rule_without_block(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
    ) -> Result<Self::AtRule, Self::Error> {
        Err(())
    }
}

impl CssQualifiedRuleParser<'_> for BodyDeclParser {
    type Prelude = ();
    type QualifiedRule = Declaration; // Not produced
    type Error = ();

    #[inline]
    fn parse_prelude<'input>(
        &mut self,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))
    }

    #[inline]
    fn parse_block<'input>(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::QualifiedRule, ParseError<'input, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))
    }
}

impl CssRuleBodyItemParser<'_, Declaration, ()> for BodyDeclParser {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}

/// Top-level parser that builds `StyleRule` items for qualified rules.
struct TopLevelParser;

impl CssAtRuleParser<'_> for TopLevelParser {
    type Prelude = ();
    type AtRule = StyleRule;
    type Error = ();

    #[inline]
    fn parse_prelude<'input>(
        &mut self,
        _name: CowRcStr<'input>,
        _input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        Ok(())
    }

    #[inline]
    fn parse_block<'input>(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::AtRule, ParseError<'input, Self::Error>> {
        // At-rules carry no custom property declarations we can scope, skip them.
        Err(input.new_error(BasicParseErrorKind::AtRuleBodyInvalid))
    }

    #[inline]
    fn rule_without_block(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
    ) -> Result<Self::AtRule, Self::Error> {
        Err(())
    }
}

impl CssQualifiedRuleParser<'_> for TopLevelParser {
    type Prelude = Vec<String>; // selector list
    type QualifiedRule = StyleRule;
    type Error = ();

    #[inline]
    fn parse_prelude<'input>(
        &mut self,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        let start = input.state();
        while input.next_including_whitespace_and_comments().is_ok() {}
        Ok(split_selector_list(input.slice_from(start.position())))
    }

    #[inline]
    fn parse_block<'input>(
        &mut self,
        prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::QualifiedRule, ParseError<'input, Self::Error>> {
        let decls = parse_declarations_from_block(input);
        Ok(StyleRule {
            selectors: prelude,
            declarations: decls,
        })
    }
}

/// Parse declarations from a rule block using the `cssparser` body parser.
/// Malformed declarations produce parse errors and are dropped.
fn parse_declarations_from_block(block: &mut Parser) -> Vec<Declaration> {
    let mut out: Vec<Declaration> = Vec::new();
    let mut body = BodyDeclParser;
    for decl in CssRuleBodyParser::new(block, &mut body).flatten() {
        out.push(decl);
    }
    out
}

/// Parse a full stylesheet into a [`Stylesheet`] using cssparser.
pub fn parse_stylesheet(css: &str) -> Stylesheet {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut top = TopLevelParser;
    let mut sheet = Stylesheet::default();
    for rule in StyleSheetParser::new(&mut parser, &mut top).flatten() {
        sheet.rules.push(rule);
    }
    sheet
}
