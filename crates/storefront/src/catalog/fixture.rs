//! In-process content store over a fixed set of objects.
//!
//! Serves offline demos (a JSON export of a Cosmic bucket) and tests. Filters
//! are evaluated locally with [`Query::matches`]; props and depth are ignored
//! since fixtures are stored fully expanded.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use super::query::Query;
use super::{ContentError, ContentStore};

/// Content store backed by an in-memory list of Cosmic objects.
#[derive(Debug, Clone, Default)]
pub struct FixtureStore {
    objects: Arc<Vec<Value>>,
}

impl FixtureStore {
    /// Create a store from raw objects (each with a `type` field).
    #[must_use]
    pub fn from_objects(objects: Vec<Value>) -> Self {
        Self {
            objects: Arc::new(objects),
        }
    }

    /// Load a store from a JSON file holding either an array of objects or a
    /// Cosmic export body `{"objects": [...]}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn from_path(path: &Path) -> Result<Self, ContentError> {
        let body = std::fs::read_to_string(path).map_err(|e| ContentError::Fixture {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let value: Value = serde_json::from_str(&body)?;

        let objects = match value {
            Value::Array(objects) => objects,
            Value::Object(mut map) => match map.remove("objects") {
                Some(Value::Array(objects)) => objects,
                _ => {
                    return Err(ContentError::Fixture {
                        path: path.display().to_string(),
                        message: "expected an array or an object with an `objects` array"
                            .to_owned(),
                    });
                }
            },
            _ => {
                return Err(ContentError::Fixture {
                    path: path.display().to_string(),
                    message: "expected an array or an object with an `objects` array".to_owned(),
                });
            }
        };

        tracing::info!(path = %path.display(), objects = objects.len(), "Loaded catalog fixture");
        Ok(Self::from_objects(objects))
    }

    fn matching(&self, query: &Query) -> Vec<Value> {
        self.objects
            .iter()
            .filter(|object| query.matches(object))
            .cloned()
            .collect()
    }
}

impl ContentStore for FixtureStore {
    async fn find(&self, query: &Query) -> Result<Vec<Value>, ContentError> {
        let objects = self.matching(query);
        // Mirror Cosmic: an empty result is reported as not found.
        if objects.is_empty() {
            return Err(ContentError::NotFound);
        }
        Ok(objects)
    }

    async fn find_one(&self, query: &Query) -> Result<Value, ContentError> {
        self.matching(query)
            .into_iter()
            .next()
            .ok_or(ContentError::NotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;
    use crate::catalog::query::ObjectType;

    #[tokio::test]
    async fn test_find_filters_by_type() {
        let store = FixtureStore::from_objects(vec![
            json!({ "type": "prompts", "id": "p1" }),
            json!({ "type": "categories", "id": "c1" }),
        ]);

        let prompts = store.find(&Query::new(ObjectType::Prompts)).await.unwrap();
        assert_eq!(prompts.len(), 1);
    }

    #[tokio::test]
    async fn test_find_empty_is_not_found() {
        let store = FixtureStore::default();
        let result = store.find(&Query::new(ObjectType::Prompts)).await;
        assert!(matches!(result, Err(ContentError::NotFound)));
    }

    #[test]
    fn test_from_path_accepts_export_body() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            json!({ "objects": [{ "type": "prompts", "id": "p1" }] })
        )
        .unwrap();

        let store = FixtureStore::from_path(file.path()).unwrap();
        assert_eq!(store.objects.len(), 1);
    }

    #[test]
    fn test_from_path_rejects_scalar() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "42").unwrap();

        let result = FixtureStore::from_path(file.path());
        assert!(matches!(result, Err(ContentError::Fixture { .. })));
    }
}
