use serde::{Deserialize, Serialize};

/// One named aggregation result: either a single metric value or a list of
/// buckets to descend into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Metric(f64),
    Buckets(Vec<Bucket>),
}

/// One bucket of a grouped query result. `formatted_key` carries the
/// human-readable rendering some backends attach to raw keys (formatted
/// dates, mostly) and is preferred by [`Bucket::label`] when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub key: String,
    pub formatted_key: Option<String>,
    pub doc_count: u64,
    /// Named sub-aggregations, in response order.
    pub aggs: Vec<(String, Aggregation)>,
}

impl Bucket {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            formatted_key: None,
            doc_count: 0,
            aggs: Vec::new(),
        }
    }

    pub fn with_formatted_key(mut self, formatted: impl Into<String>) -> Self {
        self.formatted_key = Some(formatted.into());
        self
    }

    pub fn with_doc_count(mut self, doc_count: u64) -> Self {
        self.doc_count = doc_count;
        self
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.aggs.push((name.into(), Aggregation::Metric(value)));
        self
    }

    pub fn with_buckets(mut self, name: impl Into<String>, buckets: Vec<Bucket>) -> Self {
        self.aggs.push((name.into(), Aggregation::Buckets(buckets)));
        self
    }

    /// The display key: the formatted rendering when the backend supplied
    /// one, the raw key otherwise.
    pub fn label(&self) -> &str {
        self.formatted_key.as_deref().unwrap_or(&self.key)
    }

    pub fn agg(&self, name: &str) -> Option<&Aggregation> {
        self.aggs
            .iter()
            .find(|(agg_name, _)| agg_name == name)
            .map(|(_, agg)| agg)
    }

    pub fn buckets(&self, name: &str) -> Option<&[Bucket]> {
        match self.agg(name) {
            Some(Aggregation::Buckets(buckets)) => Some(buckets.as_slice()),
            _ => None,
        }
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        match self.agg(name) {
            Some(Aggregation::Metric(value)) => Some(*value),
            _ => None,
        }
    }
}

/// The root of an aggregation response: the named top-level aggregations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BucketTree {
    pub aggs: Vec<(String, Aggregation)>,
}

impl BucketTree {
    pub fn new(aggs: Vec<(String, Aggregation)>) -> Self {
        Self { aggs }
    }

    pub fn agg(&self, name: &str) -> Option<&Aggregation> {
        self.aggs
            .iter()
            .find(|(agg_name, _)| agg_name == name)
            .map(|(_, agg)| agg)
    }

    pub fn buckets(&self, name: &str) -> Option<&[Bucket]> {
        match self.agg(name) {
            Some(Aggregation::Buckets(buckets)) => Some(buckets.as_slice()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_prefers_the_formatted_key() {
        let plain = Bucket::new("1483228800000");
        assert_eq!(plain.label(), "1483228800000");

        let formatted = Bucket::new("1483228800000").with_formatted_key("2017-01");
        assert_eq!(formatted.label(), "2017-01");
    }

    #[test]
    fn named_lookups_distinguish_metrics_from_buckets() {
        let bucket = Bucket::new("core")
            .with_metric("authors", 42.0)
            .with_buckets("per_month", vec![Bucket::new("2017-01")]);

        assert_eq!(bucket.metric("authors"), Some(42.0));
        assert!(bucket.buckets("authors").is_none());
        assert_eq!(bucket.buckets("per_month").map(<[Bucket]>::len), Some(1));
        assert!(bucket.metric("missing").is_none());
    }
}
