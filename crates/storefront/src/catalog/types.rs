//! Domain types for the Cosmic content catalog.
//!
//! Field names mirror the Cosmic object JSON (`metadata.price`,
//! `metadata.duration_months`, ...), so records deserialize directly from API
//! responses and round-trip unchanged when stored inside cart items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use promptos_core::{CategoryId, PlanId, PromptId};

// =============================================================================
// Shared Types
// =============================================================================

/// A select-dropdown value from Cosmic (e.g., AI tool, difficulty).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Stable option key.
    pub key: String,
    /// Human-readable label.
    pub value: String,
}

/// Preview image hosted by Cosmic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewImage {
    /// Original image URL.
    pub url: String,
    /// imgix URL supporting on-the-fly resizing.
    pub imgix_url: String,
}

// =============================================================================
// Category Types
// =============================================================================

/// A prompt category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub metadata: CategoryMetadata,
}

/// Category metadata fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryMetadata {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_emoji: Option<String>,
    /// Position in navigation; categories without one sort last.
    #[serde(default)]
    pub display_order: Option<i64>,
}

impl Category {
    /// Sort position used when listing categories.
    #[must_use]
    pub fn sort_order(&self) -> i64 {
        self.metadata
            .display_order
            .unwrap_or(super::UNORDERED_CATEGORY_POSITION)
    }

    /// Listing key: ordered categories by position, then unordered ones.
    #[must_use]
    pub fn sort_key(&self) -> (bool, i64) {
        (self.metadata.display_order.is_none(), self.sort_order())
    }
}

// =============================================================================
// Prompt Types
// =============================================================================

/// A sellable prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: PromptId,
    pub slug: String,
    pub title: String,
    /// Full body, only present on single-prompt fetches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub metadata: PromptMetadata,
}

/// Prompt metadata fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMetadata {
    #[serde(default)]
    pub description: String,
    /// Expanded category object (queries use depth 1).
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub ai_tool: Option<SelectOption>,
    #[serde(default)]
    pub difficulty_level: Option<SelectOption>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub preview_image: Option<PreviewImage>,
    #[serde(default)]
    pub example_output: Option<String>,
    /// Comma-separated tags.
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub is_featured: Option<bool>,
    #[serde(default)]
    pub prompt_content: String,
}

impl Prompt {
    /// One-time purchase price.
    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.metadata.price
    }

    /// Whether the prompt is flagged for the featured shelf.
    #[must_use]
    pub fn is_featured(&self) -> bool {
        self.metadata.is_featured.unwrap_or(false)
    }

    /// Tags split on commas, trimmed, empties dropped.
    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        self.metadata
            .tags
            .as_deref()
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

// =============================================================================
// Subscription Plan Types
// =============================================================================

/// A subscription plan granting time-limited access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: PlanId,
    pub slug: String,
    pub title: String,
    pub metadata: SubscriptionPlanMetadata,
}

/// Subscription plan metadata fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPlanMetadata {
    pub duration_months: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub discount_percentage: Option<Decimal>,
    /// Newline-separated feature list.
    #[serde(default)]
    pub features: String,
    #[serde(default)]
    pub is_popular: Option<bool>,
}

impl SubscriptionPlan {
    /// Price for one plan period.
    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.metadata.price
    }

    /// Plan length in months.
    #[must_use]
    pub const fn duration_months(&self) -> u32 {
        self.metadata.duration_months
    }

    /// Feature lines, trimmed, empties dropped.
    #[must_use]
    pub fn features(&self) -> Vec<&str> {
        self.metadata
            .features
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_prompt_from_cosmic_json() {
        let prompt: Prompt = serde_json::from_value(json!({
            "id": "p1",
            "slug": "seo-writer",
            "title": "SEO Writer",
            "type": "prompts",
            "metadata": {
                "description": "Writes SEO articles",
                "category": {
                    "id": "c1",
                    "slug": "writing",
                    "title": "Writing",
                    "metadata": { "display_order": 2 }
                },
                "ai_tool": { "key": "chatgpt", "value": "ChatGPT" },
                "price": 50000,
                "tags": "seo, writing, ,blog",
                "is_featured": true,
                "prompt_content": "You are an SEO expert..."
            }
        }))
        .unwrap();

        assert_eq!(prompt.id, PromptId::new("p1"));
        assert_eq!(prompt.price(), Decimal::new(50_000, 0));
        assert!(prompt.is_featured());
        assert_eq!(prompt.tags(), vec!["seo", "writing", "blog"]);
        assert_eq!(
            prompt.metadata.category.as_ref().map(Category::sort_order),
            Some(2)
        );
        assert!(prompt.content.is_none());
    }

    #[test]
    fn test_prompt_defaults_not_featured() {
        let prompt: Prompt = serde_json::from_value(json!({
            "id": "p2",
            "slug": "plain",
            "title": "Plain",
            "metadata": { "price": 1000 }
        }))
        .unwrap();

        assert!(!prompt.is_featured());
        assert!(prompt.tags().is_empty());
    }

    #[test]
    fn test_plan_from_cosmic_json() {
        let plan: SubscriptionPlan = serde_json::from_value(json!({
            "id": "plan-3",
            "slug": "quarterly",
            "title": "Quarterly",
            "metadata": {
                "duration_months": 3,
                "price": 120000,
                "discount_percentage": 15,
                "features": "All prompts\n\nPriority support\n"
            }
        }))
        .unwrap();

        assert_eq!(plan.duration_months(), 3);
        assert_eq!(plan.price(), Decimal::new(120_000, 0));
        assert_eq!(plan.metadata.discount_percentage, Some(Decimal::new(15, 0)));
        assert_eq!(plan.features(), vec!["All prompts", "Priority support"]);
    }

    #[test]
    fn test_category_without_order_sorts_last() {
        let category: Category = serde_json::from_value(json!({
            "id": "c9",
            "slug": "misc",
            "title": "Misc"
        }))
        .unwrap();

        assert_eq!(category.sort_order(), crate::catalog::UNORDERED_CATEGORY_POSITION);
    }

    #[test]
    fn test_prompt_price_serializes_as_number() {
        let prompt: Prompt = serde_json::from_value(json!({
            "id": "p1",
            "slug": "s",
            "title": "t",
            "metadata": { "price": 50000 }
        }))
        .unwrap();

        let value = serde_json::to_value(&prompt).unwrap();
        assert!(value["metadata"]["price"].is_number());
    }
}
