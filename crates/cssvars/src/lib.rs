//! Build-time resolution of CSS custom properties to literal values.
//! Spec: <https://www.w3.org/TR/css-variables-1/>
//!
//! Collects `--*` declarations from stylesheet sources, substitutes `var()`
//! references (chained references, nested fallbacks, references embedded in
//! arbitrary function calls, cycle and missing-reference handling), and
//! folds `calc()` arithmetic in the results. Intended for tools that need
//! computed custom property values without running a browser, e.g. static
//! style extraction or theming pipelines.

#![forbid(unsafe_code)]

use cssvars_calc::reduce_calc;
use cssvars_variables::resolve_all;
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

mod collect;

pub use collect::collect_custom_properties;
pub use cssvars_syntax::{Declaration, StyleRule, Stylesheet, parse_stylesheet};
pub use cssvars_variables::{
    CustomProperties, ExpressionNode, MalformedReference, ParsedExpression, Resolution,
};

/// Which rules contribute custom property declarations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    /// No scoping: collect from every rule.
    Any,
    /// Collect only from rules whose selector list is exactly this one
    /// selector, compared case-sensitively with no specificity or
    /// combinator matching.
    Selector(String),
}

impl Scope {
    /// Scope to a single exact selector.
    pub fn selector(selector: impl Into<String>) -> Self {
        Self::Selector(selector.into())
    }

    /// Whether a rule with this selector list is in scope.
    fn matches(&self, selectors: &[String]) -> bool {
        match self {
            Self::Any => true,
            Self::Selector(scope) => matches!(selectors, [only] if only == scope),
        }
    }
}

impl Default for Scope {
    /// The conventional place for theme variables.
    fn default() -> Self {
        Self::Selector(":root".to_owned())
    }
}

/// Output of [`resolve_css_variables`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedVariables {
    /// Collected declarations, unsubstituted.
    pub raw: CustomProperties,
    /// Fully substituted and calc-normalized values.
    pub resolved: CustomProperties,
    /// Sorted names that could not be resolved: undeclared references,
    /// names whose dependency chain bottoms out with no usable fallback,
    /// cycle participants, and declarations with malformed references.
    pub failed: Vec<String>,
}

/// Resolve the custom properties declared across `sources` for `scope`.
///
/// Sources are parsed in order; for a name declared more than once the last
/// declaration wins. Failures are local to individual names and reported in
/// [`ResolvedVariables::failed`], never fatal to the run.
pub fn resolve_css_variables(sources: &[&str], scope: &Scope) -> ResolvedVariables {
    let stylesheets: Vec<Stylesheet> = sources
        .iter()
        .map(|source| parse_stylesheet(source))
        .collect();
    let raw = collect::collect_custom_properties(&stylesheets, scope);

    let mut parsed = BTreeMap::new();
    let mut malformed = BTreeSet::new();
    for (name, value) in &raw {
        match cssvars_variables::parse(value) {
            Ok(expression) => {
                parsed.insert(name.clone(), expression);
            }
            Err(error) => {
                // A malformed reference fails only its own declaration.
                debug!("malformed reference in {name}: {error:?}");
                malformed.insert(name.clone());
            }
        }
    }

    let resolution = resolve_all(&parsed);
    let mut resolved = resolution.resolved;
    let mut failed = resolution.failed;
    failed.extend(malformed);

    for value in resolved.values_mut() {
        *value = reduce_calc(value);
    }

    ResolvedVariables {
        raw,
        resolved,
        failed: failed.into_iter().collect(),
    }
}
