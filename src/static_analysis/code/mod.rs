//! Code analysis module.

mod rule;

use crate::apk::MethodRef;
use log::debug;
pub use rule::{Rule, RULES};

/// Finds the insecure API usages among the given methods.
///
/// Each matching rule adds the `Class->method` signature once, so a signature matching several
/// rules appears several times, in rule order.
pub fn analysis(methods: &[MethodRef]) -> Vec<String> {
    let mut insecure_apis = Vec::new();

    for method in methods {
        let signature = method.signature();
        for rule in RULES.iter().filter(|rule| rule.matches(&signature)) {
            debug!("{}: {}", rule.label(), signature);
            insecure_apis.push(signature.clone());
        }
    }

    insecure_apis
}
