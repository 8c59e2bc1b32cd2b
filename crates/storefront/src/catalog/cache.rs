//! Cache types for catalog reads.

use promptos_core::CategoryId;

use super::types::{Category, Prompt, SubscriptionPlan};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Prompts,
    PromptsByCategory(CategoryId),
    FeaturedPrompts,
    Prompt(String),
    Categories,
    SubscriptionPlans,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Prompts(Vec<Prompt>),
    Prompt(Box<Prompt>),
    Categories(Vec<Category>),
    SubscriptionPlans(Vec<SubscriptionPlan>),
}
