//! Catalog browsing commands.

use tracing::info;

use promptos_core::{CategoryId, CurrencyCode, Price};
use promptos_storefront::catalog::{Catalog, Prompt};

use super::Source;

fn log_prompt(prompt: &Prompt, currency: CurrencyCode) {
    info!(
        slug = %prompt.slug,
        id = %prompt.id,
        price = %Price::new(prompt.price(), currency),
        featured = prompt.is_featured(),
        category = prompt.metadata.category.as_ref().map_or("-", |c| c.title.as_str()),
        "{}",
        prompt.title
    );
}

/// List prompts, optionally narrowed to a category or the featured shelf.
pub async fn prompts(
    catalog: &Catalog<Source>,
    category: Option<String>,
    featured: bool,
    currency: CurrencyCode,
) -> promptos_storefront::Result<()> {
    let prompts = match (category, featured) {
        (Some(id), _) => catalog.prompts_by_category(&CategoryId::new(id)).await?,
        (None, true) => catalog.featured_prompts().await?,
        (None, false) => catalog.prompts().await?,
    };

    if prompts.is_empty() {
        info!("No prompts found");
    }
    for prompt in &prompts {
        log_prompt(prompt, currency);
    }
    Ok(())
}

/// Show one prompt in full.
pub async fn prompt(
    catalog: &Catalog<Source>,
    slug: &str,
    currency: CurrencyCode,
) -> promptos_storefront::Result<()> {
    let Some(prompt) = catalog.prompt(slug).await? else {
        info!(slug, "Prompt not found");
        return Ok(());
    };

    log_prompt(&prompt, currency);
    if !prompt.metadata.description.is_empty() {
        info!("{}", prompt.metadata.description);
    }
    if let Some(tool) = &prompt.metadata.ai_tool {
        info!(ai_tool = %tool.value, "Tool");
    }
    if let Some(level) = &prompt.metadata.difficulty_level {
        info!(difficulty = %level.value, "Difficulty");
    }
    let tags = prompt.tags();
    if !tags.is_empty() {
        info!(tags = %tags.join(", "), "Tags");
    }
    if let Some(example) = &prompt.metadata.example_output {
        info!("Example output:\n{example}");
    }
    Ok(())
}

/// List categories in navigation order.
pub async fn categories(catalog: &Catalog<Source>) -> promptos_storefront::Result<()> {
    let categories = catalog.categories().await?;
    if categories.is_empty() {
        info!("No categories found");
    }
    for category in &categories {
        info!(
            id = %category.id,
            slug = %category.slug,
            order = category.sort_order(),
            "{} {}",
            category.metadata.icon_emoji.as_deref().unwrap_or(""),
            category.title
        );
    }
    Ok(())
}

/// List subscription plans, shortest first.
pub async fn plans(
    catalog: &Catalog<Source>,
    currency: CurrencyCode,
) -> promptos_storefront::Result<()> {
    let plans = catalog.subscription_plans().await?;
    if plans.is_empty() {
        info!("No subscription plans found");
    }
    for plan in &plans {
        info!(
            id = %plan.id,
            months = plan.duration_months(),
            price = %Price::new(plan.price(), currency),
            popular = plan.metadata.is_popular.unwrap_or(false),
            "{}",
            plan.title
        );
        for feature in plan.features() {
            info!("  - {feature}");
        }
    }
    Ok(())
}
