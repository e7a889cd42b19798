//! Split configuration resolver.
//!
//! Picks exactly one [`SplitConfig`] for an animal's category:
//!
//! 1. first active config whose category matches exactly (case-sensitive)
//! 2. else the first active `"standard"` config
//! 3. else the built-in 70/30 split ([`SplitConfig::fallback`])
//!
//! "First" is insertion order of `configs`. Resolution never fails so a sale
//! is never blocked by a missing config; share validity is checked later by
//! the calculator.

use herd_types::split::SplitConfig;
use herd_types::STANDARD_CATEGORY;

/// Resolve the split to apply for `category`.
pub fn resolve_split(category: &str, configs: &[SplitConfig]) -> SplitConfig {
    if let Some(config) = first_active(category, configs) {
        return config.clone();
    }

    if let Some(config) = first_active(STANDARD_CATEGORY, configs) {
        tracing::debug!(category, split_id = %config.id, "no active split for category, using standard");
        return config.clone();
    }

    tracing::debug!(category, "no active split configured, using built-in default");
    SplitConfig::fallback()
}

fn first_active<'a>(category: &str, configs: &'a [SplitConfig]) -> Option<&'a SplitConfig> {
    configs.iter().find(|c| c.active && c.category == category)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(id: &str, category: &str, farmer: u8, platform: u8, active: bool) -> SplitConfig {
        SplitConfig {
            active,
            ..SplitConfig::new(id, category, farmer, platform)
        }
    }

    #[test]
    fn test_exact_match_wins() {
        let configs = vec![
            config("std", "standard", 70, 30, true),
            config("prem", "premium", 80, 20, true),
        ];
        assert_eq!(resolve_split("premium", &configs).id, "prem");
    }

    #[test]
    fn test_first_match_by_insertion_order() {
        let configs = vec![
            config("prem-a", "premium", 80, 20, true),
            config("prem-b", "premium", 90, 10, true),
        ];
        for _ in 0..3 {
            assert_eq!(resolve_split("premium", &configs).id, "prem-a");
        }
    }

    #[test]
    fn test_inactive_skipped() {
        let configs = vec![
            config("prem-old", "premium", 60, 40, false),
            config("prem-new", "premium", 85, 15, true),
        ];
        assert_eq!(resolve_split("premium", &configs).id, "prem-new");
    }

    #[test]
    fn test_category_match_is_case_sensitive() {
        let configs = vec![
            config("std", "standard", 65, 35, true),
            config("prem", "Premium", 80, 20, true),
        ];
        assert_eq!(resolve_split("premium", &configs).id, "std");
    }

    #[test]
    fn test_falls_back_to_standard() {
        let configs = vec![
            config("organic", "organic", 75, 25, true),
            config("std", "standard", 65, 35, true),
        ];
        let split = resolve_split("wagyu", &configs);
        assert_eq!(split.id, "std");
        assert_eq!(split.farmer_share, 65);
    }

    #[test]
    fn test_empty_configs_yield_default() {
        let split = resolve_split("premium", &[]);
        assert_eq!(split, SplitConfig::fallback());
        assert_eq!((split.farmer_share, split.platform_share), (70, 30));
    }

    #[test]
    fn test_all_inactive_yield_default() {
        let configs = vec![
            config("std", "standard", 50, 50, false),
            config("prem", "premium", 80, 20, false),
        ];
        let split = resolve_split("premium", &configs);
        assert_eq!((split.farmer_share, split.platform_share), (70, 30));
    }

    #[test]
    fn test_invalid_shares_are_returned_unchanged() {
        let configs = vec![config("broken", "premium", 33, 34, true)];
        let split = resolve_split("premium", &configs);
        assert_eq!(split.total_share(), 67);
    }
}
