//! Built-in templates
//!
//! Bundled at compile time via `include_str!` of a JSON array (DESIGN
//! NOTES §9, "Embedded template files"); never mutated at runtime — a
//! `Save`/`Delete` against one of these ids is rejected upstream in
//! `TemplateResolver`.

use crate::error::CoreResult;
use crate::models::AlertRuleTemplate;

const BUILTIN_TEMPLATES_JSON: &str = include_str!("builtin_templates.json");

pub fn load() -> CoreResult<Vec<AlertRuleTemplate>> {
    let templates: Vec<AlertRuleTemplate> = serde_json::from_str(BUILTIN_TEMPLATES_JSON)?;
    Ok(templates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TemplateCategory;

    #[test]
    fn bundles_at_least_five_templates_across_expected_categories() {
        let templates = load().unwrap();
        assert!(templates.len() >= 5);
        assert!(templates.iter().all(|t| t.is_built_in));

        let categories: std::collections::HashSet<_> =
            templates.iter().map(|t| t.category).collect();
        for expected in [
            TemplateCategory::Network,
            TemplateCategory::Security,
            TemplateCategory::Resources,
            TemplateCategory::Vpn,
            TemplateCategory::System,
        ] {
            assert!(categories.contains(&expected), "missing category {expected:?}");
        }
    }
}
