use std::fmt;

use indexmap::IndexMap;

/// Sample value of a gauge line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    /// Info-style gauge, always `1`.
    Info,
    /// Elapsed seconds, rendered with two decimals.
    Seconds(f64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => f.write_str("1"),
            Self::Seconds(secs) => write!(f, "{secs:.2}"),
        }
    }
}

/// One exposition line: `name{label="value",...} sample`.
///
/// Labels keep insertion order. Setting an existing key replaces its value
/// in place, so keys stay unique per line.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricLine {
    name: &'static str,
    labels: IndexMap<&'static str, String>,
    value: MetricValue,
}

impl MetricLine {
    pub fn info(name: &'static str) -> Self {
        Self::new(name, MetricValue::Info)
    }

    pub fn seconds(name: &'static str, seconds: f64) -> Self {
        Self::new(name, MetricValue::Seconds(seconds))
    }

    fn new(name: &'static str, value: MetricValue) -> Self {
        Self {
            name,
            labels: IndexMap::new(),
            value,
        }
    }

    #[must_use]
    pub fn label(mut self, key: &'static str, value: impl ToString) -> Self {
        self.labels.insert(key, value.to_string());
        self
    }
}

#[cfg(test)]
impl MetricLine {
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn value(&self) -> MetricValue {
        self.value
    }

    pub fn label_value(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn label_keys(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().copied()
    }
}

impl fmt::Display for MetricLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)?;
        f.write_str("{")?;
        for (i, (key, value)) in self.labels.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}=\"{}\"", escape_label_value(value))?;
        }
        write!(f, "}} {}", self.value)
    }
}

/// Escapes a label value per the Prometheus text format.
fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}
