use std::collections::BTreeMap;
use std::fmt;

use promql_parser::parser::{self, Expr, VectorSelector};

use crate::error::ConfigError;

/// Reserved label holding the metric name.
pub const METRIC_NAME: &str = "__name__";

/// A resolved instant vector selector: metric name plus label matchers,
/// flattened into a `label name → value` map.
///
/// Equality is plain map equality. The matcher kind is resolved away, so
/// `foo{a=~"x"}` and `foo{a="x"}` compare equal. This is a known limitation:
/// selectors are compared against series names found in a scrape, never
/// evaluated as patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    labels: BTreeMap<String, String>,
}

impl Selector {
    /// Parse the configured selector string.
    pub fn parse(selector: &str) -> Result<Self, ConfigError> {
        let selector = selector.trim();
        if selector.is_empty() {
            return Err(ConfigError::EmptySelector);
        }

        let expr = parser::parse(selector).map_err(|reason| ConfigError::InvalidSelector {
            selector: selector.to_string(),
            reason,
        })?;

        match expr {
            Expr::VectorSelector(vs) => Ok(Self::from_vector_selector(&vs)),
            other => Err(ConfigError::NotInstantVector {
                selector: selector.to_string(),
                found: expr_kind(&other),
            }),
        }
    }

    /// Parse the series token at the start of an exposition line.
    /// Returns `None` when the token is not an instant vector selector.
    pub fn from_series_token(token: &str) -> Option<Self> {
        match parser::parse(token) {
            Ok(Expr::VectorSelector(vs)) => Some(Self::from_vector_selector(&vs)),
            _ => None,
        }
    }

    fn from_vector_selector(vs: &VectorSelector) -> Self {
        let mut labels = BTreeMap::new();
        if let Some(name) = &vs.name {
            labels.insert(METRIC_NAME.to_string(), name.clone());
        }
        for matcher in &vs.matchers.matchers {
            labels.insert(matcher.name.clone(), matcher.value.clone());
        }
        Self { labels }
    }

    pub fn metric_name(&self) -> Option<&str> {
        self.labels.get(METRIC_NAME).map(String::as_str)
    }

    /// Same as `==`; spelled out for call sites that read better with a verb.
    pub fn matches(&self, other: &Selector) -> bool {
        self == other
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.metric_name().unwrap_or_default())?;
        let mut labels = self
            .labels
            .iter()
            .filter(|(name, _)| name.as_str() != METRIC_NAME)
            .peekable();
        if labels.peek().is_none() {
            return Ok(());
        }
        f.write_str("{")?;
        let mut first = true;
        for (name, value) in labels {
            if !first {
                f.write_str(",")?;
            }
            first = false;
            write!(f, "{name}={value:?}")?;
        }
        f.write_str("}")
    }
}

fn expr_kind(expr: &Expr) -> &'static str {
    match expr {
        Expr::VectorSelector(_) => "instant vector selector",
        Expr::MatrixSelector(_) => "range vector",
        Expr::NumberLiteral(_) => "scalar",
        Expr::StringLiteral(_) => "string",
        Expr::Subquery(_) => "subquery",
        _ => "expression",
    }
}
