//! Canonical tagged metric keys
//!
//! A key renders as `name` when untagged, otherwise as
//! `name[tag1:value1,tag2:value2]` with tags sorted by tag name.

use std::collections::BTreeMap;
use std::fmt;

/// Rendered in place of an empty tag value
pub const NONE_TAG_VALUE: &str = "none";

/// Metric name plus its tag set. Equality ignores tag insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    name: String,
    tags: BTreeMap<String, String>,
}

impl MetricKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: BTreeMap::new(),
        }
    }

    /// Adds a tag, replacing any previous value for the same tag name
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_tags<K, V, I>(name: impl Into<String>, tags: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        tags.into_iter()
            .fold(Self::new(name), |key, (k, v)| key.tag(k, v))
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.tags.is_empty() {
            return Ok(());
        }

        f.write_str("[")?;
        for (i, (key, value)) in self.tags.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            let value = if value.is_empty() { NONE_TAG_VALUE } else { value };
            write!(f, "{key}:{value}")?;
        }
        f.write_str("]")
    }
}

/// Shorthand for `MetricKey::with_tags(name, tags).encode()`
pub fn tagged_metric_name(name: &str, tags: &[(&str, &str)]) -> String {
    MetricKey::with_tags(name, tags.iter().copied()).encode()
}

/// Splits an encoded key back into its name and `tag:value` pairs
pub fn split_encoded(encoded: &str) -> (&str, Vec<&str>) {
    match encoded.split_once('[') {
        Some((name, rest)) => {
            let inner = rest.strip_suffix(']').unwrap_or(rest);
            let tags = inner.split(',').filter(|t| !t.is_empty()).collect();
            (name, tags)
        }
        None => (encoded, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_metric() {
        assert_eq!(tagged_metric_name("scanDurationSeconds", &[]), "scanDurationSeconds");
        assert_eq!(tagged_metric_name("", &[]), "");
    }

    #[test]
    fn test_single_tag() {
        assert_eq!(
            tagged_metric_name("scanDurationSeconds", &[("foo-key", "foo-value")]),
            "scanDurationSeconds[foo-key:foo-value]"
        );
    }

    #[test]
    fn test_empty_value_uses_sentinel() {
        assert_eq!(tagged_metric_name("x", &[("k", "")]), "x[k:none]");
    }

    #[test]
    fn test_tags_sorted_regardless_of_insertion_order() {
        let a = tagged_metric_name("x", &[("foo-key", "foo-value"), ("bar-key", "bar-value")]);
        let b = tagged_metric_name("x", &[("bar-key", "bar-value"), ("foo-key", "foo-value")]);
        assert_eq!(a, "x[bar-key:bar-value,foo-key:foo-value]");
        assert_eq!(a, b);
        assert_eq!(
            MetricKey::new("x").tag("b", "2").tag("a", "1"),
            MetricKey::new("x").tag("a", "1").tag("b", "2")
        );
    }

    #[test]
    fn test_split_encoded() {
        assert_eq!(split_encoded("jobQueueLength"), ("jobQueueLength", vec![]));
        assert_eq!(
            split_encoded("ipCount[assetName:dmz,org:Acme]"),
            ("ipCount", vec!["assetName:dmz", "org:Acme"])
        );
    }
}
