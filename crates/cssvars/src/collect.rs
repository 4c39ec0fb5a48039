//! Collecting custom property declarations from parsed stylesheets.
//! Spec: <https://www.w3.org/TR/css-variables-1/#defining-variables>

use crate::Scope;
use cssvars_syntax::Stylesheet;
use cssvars_variables::CustomProperties;

/// Extract custom properties (`--*`) from every rule matching `scope`.
///
/// Stylesheets are processed in input order and rules in source order, so a
/// later declaration of the same name overwrites an earlier one, mirroring
/// CSS source order.
pub fn collect_custom_properties(stylesheets: &[Stylesheet], scope: &Scope) -> CustomProperties {
    let mut out = CustomProperties::new();
    for stylesheet in stylesheets {
        for rule in &stylesheet.rules {
            if !scope.matches(&rule.selectors) {
                continue;
            }
            for declaration in &rule.declarations {
                if declaration.name.starts_with("--") {
                    out.insert(declaration.name.clone(), declaration.value.clone());
                }
            }
        }
    }
    out
}
