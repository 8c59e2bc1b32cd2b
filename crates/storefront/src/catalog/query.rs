//! Content queries in the shape the Cosmic objects API expects.
//!
//! A [`Query`] names an object type, equality filters on object fields,
//! a projection of props to return, and an optional relationship depth.

use serde_json::{Map, Value};

/// Cosmic object types read by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Prompts,
    Categories,
    SubscriptionPlans,
}

impl ObjectType {
    /// Cosmic type slug.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Prompts => "prompts",
            Self::Categories => "categories",
            Self::SubscriptionPlans => "subscription-plans",
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A read query against the content store.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    object_type: ObjectType,
    filters: Map<String, Value>,
    props: Vec<&'static str>,
    depth: Option<u8>,
}

impl Query {
    /// Query all objects of a type.
    #[must_use]
    pub fn new(object_type: ObjectType) -> Self {
        Self {
            object_type,
            filters: Map::new(),
            props: Vec::new(),
            depth: None,
        }
    }

    /// Match objects whose `field` equals `value` (e.g. `metadata.category`).
    #[must_use]
    pub fn filter(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.insert(field.to_owned(), value.into());
        self
    }

    /// Restrict the returned fields.
    #[must_use]
    pub fn props(mut self, props: &[&'static str]) -> Self {
        self.props = props.to_vec();
        self
    }

    /// Expand related objects to the given depth.
    #[must_use]
    pub const fn depth(mut self, depth: u8) -> Self {
        self.depth = Some(depth);
        self
    }

    #[must_use]
    pub const fn object_type(&self) -> ObjectType {
        self.object_type
    }

    #[must_use]
    pub const fn filters(&self) -> &Map<String, Value> {
        &self.filters
    }

    #[must_use]
    pub fn props_list(&self) -> &[&'static str] {
        &self.props
    }

    #[must_use]
    pub const fn depth_value(&self) -> Option<u8> {
        self.depth
    }

    /// The `query` parameter: `{"type": ..., <filters>}`.
    #[must_use]
    pub fn to_filter_json(&self) -> Value {
        let mut object = Map::new();
        object.insert(
            "type".to_owned(),
            Value::String(self.object_type.as_str().to_owned()),
        );
        for (field, value) in &self.filters {
            object.insert(field.clone(), value.clone());
        }
        Value::Object(object)
    }

    /// Whether a raw object satisfies the type and every filter.
    ///
    /// Dotted filter fields address nested values; an expanded relation
    /// (`{"id": ...}`) matches a filter on its id.
    #[must_use]
    pub fn matches(&self, object: &Value) -> bool {
        if object.get("type").and_then(Value::as_str) != Some(self.object_type.as_str()) {
            return false;
        }

        self.filters.iter().all(|(field, expected)| {
            let actual = field
                .split('.')
                .try_fold(object, |current, segment| current.get(segment));
            match actual {
                Some(Value::Object(related)) => related.get("id") == Some(expected),
                Some(value) => value == expected,
                None => false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_filter_json_includes_type_and_filters() {
        let query = Query::new(ObjectType::Prompts)
            .filter("metadata.is_featured", true)
            .props(&["id", "title"])
            .depth(1);

        assert_eq!(
            query.to_filter_json(),
            json!({ "type": "prompts", "metadata.is_featured": true })
        );
        assert_eq!(query.props_list(), &["id", "title"]);
        assert_eq!(query.depth_value(), Some(1));
    }

    #[test]
    fn test_object_type_slugs() {
        assert_eq!(ObjectType::SubscriptionPlans.to_string(), "subscription-plans");
        assert_eq!(ObjectType::Categories.as_str(), "categories");
    }

    #[test]
    fn test_matches_expanded_relation_by_id() {
        let query = Query::new(ObjectType::Prompts).filter("metadata.category", "c1");
        let object = json!({
            "type": "prompts",
            "metadata": { "category": { "id": "c1", "title": "Writing" } }
        });
        assert!(query.matches(&object));

        let other = json!({
            "type": "prompts",
            "metadata": { "category": { "id": "c2" } }
        });
        assert!(!query.matches(&other));
    }

    #[test]
    fn test_matches_requires_type() {
        let query = Query::new(ObjectType::Categories);
        assert!(!query.matches(&json!({ "type": "prompts" })));
        assert!(query.matches(&json!({ "type": "categories" })));
    }

    #[test]
    fn test_matches_missing_field_is_false() {
        let query = Query::new(ObjectType::Prompts).filter("metadata.is_featured", true);
        assert!(!query.matches(&json!({ "type": "prompts", "metadata": {} })));
    }
}
