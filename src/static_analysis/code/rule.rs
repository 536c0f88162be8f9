//! Module for rules.

/// Insecure API searching rule.
///
/// A method signature matches the rule when it contains every one of its patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    label: &'static str,
    description: &'static str,
    patterns: &'static [&'static str],
}

/// Rules applied to every method signature, in order.
pub const RULES: [Rule; 3] = [
    Rule {
        label: "WebView JavaScript interface",
        description: "A JavaScript interface lets the web content loaded in a WebView call into \
                      the application code, exposing its data to any script in the page.",
        patterns: &["WebView", "addJavascriptInterface"],
    },
    Rule {
        label: "HttpURLConnection usage",
        description: "Connections opened with HttpURLConnection may send data in clear text if \
                      the URL does not use HTTPS.",
        patterns: &["HttpURLConnection"],
    },
    Rule {
        label: "Raw URL connection",
        description: "URL.openConnection() opens a connection to any scheme the URL has, with no \
                      transport security guarantees.",
        patterns: &["openConnection", "java/net/URL"],
    },
];

impl Rule {
    /// Gets the label of the rule.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Gets the description of the insecure usage.
    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Gets the patterns that must all be present in a signature.
    pub fn patterns(&self) -> impl Iterator<Item = &'static str> {
        self.patterns.iter().copied()
    }

    /// Checks if the given method signature matches the rule.
    pub fn matches(&self, signature: &str) -> bool {
        self.patterns.iter().all(|pattern| signature.contains(pattern))
    }
}
