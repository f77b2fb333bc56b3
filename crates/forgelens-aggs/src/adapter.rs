use serde_json::Value;

use crate::AggError;
use crate::tree::{Aggregation, Bucket, BucketTree};

// Conventional field labels of a search-backend aggregation response. Any
// source speaking a different dialect must translate before calling the
// flatteners.
const FIELD_BUCKETS: &str = "buckets";
const FIELD_KEY: &str = "key";
const FIELD_KEY_AS_STRING: &str = "key_as_string";
const FIELD_DOC_COUNT: &str = "doc_count";
const FIELD_VALUE: &str = "value";

impl BucketTree {
    /// Translates the `aggregations` object of a search-backend response
    /// into the typed tree the flatteners consume. Bookkeeping fields the
    /// backend adds alongside buckets and metrics are ignored.
    pub fn from_response(response: &Value) -> Result<Self, AggError> {
        let object = response.as_object().ok_or_else(|| {
            AggError::Malformed("aggregations root is not an object".to_owned())
        })?;

        let mut aggs = Vec::new();
        for (name, value) in object {
            if let Some(agg) = parse_aggregation(name, value)? {
                aggs.push((name.clone(), agg));
            }
        }

        Ok(Self::new(aggs))
    }
}

fn parse_aggregation(name: &str, value: &Value) -> Result<Option<Aggregation>, AggError> {
    let Some(object) = value.as_object() else {
        return Ok(None);
    };

    if let Some(buckets) = object.get(FIELD_BUCKETS) {
        let entries = buckets.as_array().ok_or_else(|| {
            AggError::Malformed(format!("'{name}.buckets' is not an array"))
        })?;
        let buckets = entries
            .iter()
            .map(|entry| parse_bucket(name, entry))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Some(Aggregation::Buckets(buckets)));
    }

    match object.get(FIELD_VALUE) {
        Some(Value::Null) | None => Ok(None),
        Some(value) => {
            let value = value.as_f64().ok_or_else(|| {
                AggError::Malformed(format!("metric '{name}' has a non-numeric value"))
            })?;
            Ok(Some(Aggregation::Metric(value)))
        }
    }
}

fn parse_bucket(agg_name: &str, value: &Value) -> Result<Bucket, AggError> {
    let object = value.as_object().ok_or_else(|| {
        AggError::Malformed(format!("bucket under '{agg_name}' is not an object"))
    })?;

    let key = match object.get(FIELD_KEY) {
        Some(Value::String(key)) => key.clone(),
        Some(Value::Number(key)) => key.to_string(),
        Some(Value::Bool(key)) => key.to_string(),
        _ => {
            return Err(AggError::Malformed(format!(
                "bucket under '{agg_name}' has no usable key"
            )));
        }
    };

    let formatted_key = object
        .get(FIELD_KEY_AS_STRING)
        .and_then(Value::as_str)
        .map(str::to_owned);
    let doc_count = object
        .get(FIELD_DOC_COUNT)
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let mut aggs = Vec::new();
    for (name, child) in object {
        if matches!(
            name.as_str(),
            FIELD_KEY | FIELD_KEY_AS_STRING | FIELD_DOC_COUNT
        ) {
            continue;
        }
        if let Some(agg) = parse_aggregation(name, child)? {
            aggs.push((name.clone(), agg));
        }
    }

    Ok(Bucket {
        key,
        formatted_key,
        doc_count,
        aggs,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_a_two_level_response_with_metrics() {
        let response = json!({
            "org": {
                "doc_count_error_upper_bound": 0,
                "buckets": [
                    {
                        "key": "core",
                        "doc_count": 120,
                        "per_month": {
                            "buckets": [
                                {
                                    "key": 1483228800000u64,
                                    "key_as_string": "2017-01",
                                    "doc_count": 40,
                                    "authors": { "value": 12.0 }
                                }
                            ]
                        }
                    }
                ]
            }
        });

        let tree = BucketTree::from_response(&response).expect("tree");
        let orgs = tree.buckets("org").expect("org buckets");
        assert_eq!(orgs[0].key, "core");

        let months = orgs[0].buckets("per_month").expect("month buckets");
        assert_eq!(months[0].key, "1483228800000");
        assert_eq!(months[0].label(), "2017-01");
        assert_eq!(months[0].doc_count, 40);
        assert_eq!(months[0].metric("authors"), Some(12.0));
    }

    #[test]
    fn null_metrics_are_dropped_rather_than_zeroed() {
        let response = json!({
            "org": {
                "buckets": [
                    { "key": "core", "doc_count": 3, "authors": { "value": null } }
                ]
            }
        });

        let tree = BucketTree::from_response(&response).expect("tree");
        let orgs = tree.buckets("org").expect("org buckets");
        assert!(orgs[0].metric("authors").is_none());
    }

    #[test]
    fn bucket_without_a_key_is_malformed() {
        let response = json!({
            "org": { "buckets": [ { "doc_count": 3 } ] }
        });

        let err = BucketTree::from_response(&response).expect_err("malformed");
        assert!(matches!(err, AggError::Malformed(_)));
    }

    #[test]
    fn non_object_root_is_malformed() {
        let err = BucketTree::from_response(&json!([1, 2, 3])).expect_err("malformed");
        assert!(matches!(err, AggError::Malformed(_)));
    }
}
