//! Suggestion queries against a freshly fetched catalog

use anyhow::Result;
use tscache_core::{Config, DEFAULT_CATEGORY_LIMIT, DEFAULT_SUGGESTION_LIMIT};

use super::fresh_cache;
use crate::cli::SuggestTarget;
use crate::output::print_list;

/// Execute `tscache suggest <target>`.
pub async fn execute(config: &Config, target: SuggestTarget) -> Result<()> {
    let cache = fresh_cache(config).await?;

    let (items, format) = match &target {
        SuggestTarget::Authors { needle, query } => (
            cache.suggest_authors(needle, query.limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT)),
            query.format.resolve(),
        ),
        SuggestTarget::Mods {
            needle,
            author,
            query,
        } => (
            cache.suggest_mods(
                author.as_deref(),
                needle,
                query.limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT),
            ),
            query.format.resolve(),
        ),
        SuggestTarget::Versions {
            author,
            name,
            needle,
            query,
        } => (
            cache.suggest_versions(
                author,
                name,
                needle,
                query.limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT),
            ),
            query.format.resolve(),
        ),
        SuggestTarget::Categories {
            needle,
            include_modpacks,
            query,
        } => (
            cache.suggest_categories(
                needle,
                *include_modpacks,
                query.limit.unwrap_or(DEFAULT_CATEGORY_LIMIT),
            ),
            query.format.resolve(),
        ),
    };

    print_list(&items, format)
}
