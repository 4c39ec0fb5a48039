//! Substituting `var()` references against declared custom properties.
//! Spec: <https://www.w3.org/TR/css-variables-1/#cycles>

use crate::CustomProperties;
use crate::expression::{ExpressionNode, ParsedExpression};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// Result of resolving a full set of custom properties.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Fully substituted literal value per property name.
    pub resolved: CustomProperties,
    /// Names that could not be resolved: undeclared references, names whose
    /// dependency chain bottoms out with no usable fallback, and cycle
    /// participants.
    pub failed: BTreeSet<String>,
}

/// Per-invocation resolver state. `resolved` and `failed` grow monotonically;
/// `visiting` is the active depth-first stack used for cycle detection.
struct Resolver<'expr> {
    parsed: &'expr BTreeMap<String, ParsedExpression>,
    resolved: CustomProperties,
    failed: BTreeSet<String>,
    visiting: Vec<String>,
}

impl Resolver<'_> {
    /// Resolve one property name to its literal value, memoizing the result.
    fn resolve_name(&mut self, name: &str) -> Option<String> {
        if let Some(value) = self.resolved.get(name) {
            return Some(value.clone());
        }
        if self.failed.contains(name) {
            return None;
        }
        if let Some(first) = self.visiting.iter().position(|visited| visited == name) {
            // Everything on the stack from the first occurrence onward forms
            // a cycle; no participant has a usable value, regardless of
            // fallbacks, so the outcome cannot depend on traversal order.
            debug!("cyclic custom property reference involving {name}");
            for participant in &self.visiting[first..] {
                self.failed.insert(participant.clone());
            }
            return None;
        }
        let Some(expression) = self.parsed.get(name) else {
            debug!("reference to undeclared custom property {name}");
            self.failed.insert(name.to_owned());
            return None;
        };
        self.visiting.push(name.to_owned());
        let outcome = self.resolve_expression(expression);
        self.visiting.pop();
        if self.failed.contains(name) {
            // A cycle discovered underneath this frame poisons it even if the
            // expression completed through a fallback.
            return None;
        }
        match outcome {
            Some(value) => {
                self.resolved.insert(name.to_owned(), value.clone());
                Some(value)
            }
            None => {
                debug!("could not resolve custom property {name}");
                self.failed.insert(name.to_owned());
                None
            }
        }
    }

    /// Resolve an expression by concatenating literals and substituted
    /// references. The first unresolvable reference aborts the expression.
    fn resolve_expression(&mut self, nodes: &[ExpressionNode]) -> Option<String> {
        let mut output = String::new();
        for node in nodes {
            match node {
                ExpressionNode::Literal(text) => output.push_str(text),
                ExpressionNode::VariableRef { name, fallback } => {
                    let substituted = self.resolve_reference(name, fallback.as_deref())?;
                    output.push_str(&substituted);
                }
            }
        }
        Some(output)
    }

    /// Resolve a single reference: the named property if possible, else its
    /// fallback expression, else failure.
    fn resolve_reference(
        &mut self,
        name: &str,
        fallback: Option<&[ExpressionNode]>,
    ) -> Option<String> {
        if let Some(value) = self.resolve_name(name) {
            return Some(value);
        }
        fallback.and_then(|nodes| self.resolve_expression(nodes))
    }
}

/// Resolve every parsed declaration, producing a literal value or a failure
/// per name. The outcome is a pure function of `parsed`: memoization and
/// cycle handling make it independent of iteration order.
pub fn resolve_all(parsed: &BTreeMap<String, ParsedExpression>) -> Resolution {
    let mut resolver = Resolver {
        parsed,
        resolved: CustomProperties::new(),
        failed: BTreeSet::new(),
        visiting: Vec::new(),
    };
    for name in parsed.keys() {
        resolver.resolve_name(name);
    }
    Resolution {
        resolved: resolver.resolved,
        failed: resolver.failed,
    }
}
