//! Cached query descriptions.
//!
//! A [`Query`] describes an expensive read (a catalog load, a metadata
//! lookup). The runtime's query cache memoizes its output per cache key; the
//! query itself only knows how to compute a fresh value.
//!
//! # Cache keys
//!
//! [`cache_key`] serializes the parameters to canonical JSON. Objects are
//! rebuilt with sorted keys, so two parameter values that are logically equal
//! produce the same key no matter how their maps were populated.

use futures::future::BoxFuture;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Errors produced by query workers and the query cache
///
/// Cloneable because one failed computation is reported to every caller that
/// was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The worker itself failed
    #[error("query failed: {0}")]
    Failed(String),

    /// Parameters could not be turned into a cache key
    #[error("invalid query parameters: {0}")]
    InvalidParams(String),

    /// No cache is registered for the query name
    #[error("unknown query: {0}")]
    UnknownQuery(String),

    /// The worker task panicked or was aborted
    #[error("query worker aborted: {0}")]
    Aborted(String),
}

/// An expensive, cacheable read operation
///
/// # Example
///
/// ```
/// use dashflow_core::query::{Query, QueryError};
/// use futures::future::{BoxFuture, FutureExt};
///
/// struct SquareQuery;
///
/// impl Query for SquareQuery {
///     const NAME: &'static str = "square";
///     type Params = u64;
///     type Output = u64;
///
///     fn execute(&self, params: u64) -> BoxFuture<'static, Result<u64, QueryError>> {
///         async move { Ok(params * params) }.boxed()
///     }
/// }
/// ```
pub trait Query: Send + Sync + 'static {
    /// Service name the query is registered under
    const NAME: &'static str;

    /// Parameters; serialized to form the cache key
    type Params: Serialize + Send + Sync + 'static;

    /// Result of a successful computation
    type Output: Send + Sync + 'static;

    /// Compute a fresh value
    ///
    /// The returned future must own everything it needs; the cache may run
    /// it on a separate task.
    fn execute(&self, params: Self::Params) -> BoxFuture<'static, Result<Self::Output, QueryError>>;
}

/// Shared query result handed to every caller of the same cache entry
pub type QueryOutput<Q> = Arc<<Q as Query>::Output>;

/// Deterministic cache key for a parameter value
///
/// # Errors
///
/// Returns [`QueryError::InvalidParams`] when the parameters cannot be
/// serialized (e.g. a map with non-string keys).
pub fn cache_key<P: Serialize + ?Sized>(params: &P) -> Result<String, QueryError> {
    let value =
        serde_json::to_value(params).map_err(|e| QueryError::InvalidParams(e.to_string()))?;
    Ok(canonicalize(value).to_string())
}

/// Rebuild objects with keys in sorted order, recursively
fn canonicalize(value: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect(),
            )
        },
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::Serialize;
    use std::collections::{BTreeMap, HashMap};

    #[derive(Serialize)]
    struct ElementsParams {
        display_form: String,
        limit: u32,
    }

    #[derive(Serialize)]
    struct ElementsParamsReordered {
        limit: u32,
        display_form: String,
    }

    #[test]
    fn test_field_order_does_not_matter() -> Result<(), QueryError> {
        let a = cache_key(&ElementsParams {
            display_form: "label.region".into(),
            limit: 50,
        })?;
        let b = cache_key(&ElementsParamsReordered {
            limit: 50,
            display_form: "label.region".into(),
        })?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_empty_params() -> Result<(), QueryError> {
        assert_eq!(cache_key(&serde_json::json!({}))?, "{}");
        assert_eq!(cache_key(&())?, "null");
        Ok(())
    }

    #[test]
    fn test_different_values_differ() -> Result<(), QueryError> {
        let a = cache_key(&serde_json::json!({ "limit": 1 }))?;
        let b = cache_key(&serde_json::json!({ "limit": 2 }))?;
        assert_ne!(a, b);
        Ok(())
    }

    #[test]
    fn test_non_string_map_keys_are_rejected() {
        let mut params = HashMap::new();
        params.insert((1, 2), "x");
        assert!(matches!(cache_key(&params), Err(QueryError::InvalidParams(_))));
    }

    proptest! {
        #[test]
        fn prop_insertion_order_is_irrelevant(entries in proptest::collection::vec(("[a-z]{1,6}", 0u32..1000), 0..12)) {
            let forward: HashMap<String, u32> = entries.iter().cloned().collect();
            let ordered: BTreeMap<String, u32> = forward.iter().map(|(k, v)| (k.clone(), *v)).collect();
            let rebuilt: HashMap<String, u32> = ordered.iter().rev().map(|(k, v)| (k.clone(), *v)).collect();

            let a = cache_key(&forward).map_err(|e| TestCaseError::fail(e.to_string()))?;
            let b = cache_key(&ordered).map_err(|e| TestCaseError::fail(e.to_string()))?;
            let c = cache_key(&rebuilt).map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(&a, &c);
        }
    }
}
