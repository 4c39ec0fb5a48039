//! CSS Custom Properties for Cascading Variables Module Level 1 — CSS variables.
//! Spec: <https://www.w3.org/TR/css-variables-1/>
//!
//! Parses declaration values into sequences of literal fragments and `var()`
//! references ([`expression`]) and substitutes references against a set of
//! declared custom properties ([`resolve`]).

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

pub mod expression;
pub mod resolve;

pub use expression::{ExpressionNode, MalformedReference, ParsedExpression, parse};
pub use resolve::{Resolution, resolve_all};

/// Alias used by helpers that operate on a set of custom properties.
/// Keys are property names (including the leading `--`); values are raw or
/// resolved value strings. An ordered map keeps iteration deterministic.
pub type CustomProperties = BTreeMap<String, String>;
