//! Alert-Rule Template Resolver
//!
//! Turns a parameterized `AlertRuleTemplate` into a concrete
//! `AlertRule` by substituting operator-supplied variables into
//! placeholder-bearing condition values (spec §4.3).

mod builtin;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::clock::Clock;
use crate::error::{CoreError, CoreResult};
use crate::ids::new_id;
use crate::models::{
    AlertRule, AlertRuleTemplate, ConditionValue, DigestConfig, EscalationConfig, QuietHours,
    RuleCondition, Severity, TemplateCategory, TemplateCondition, ThrottleConfig, VarDef, VarType,
};
use crate::store::TemplateStore;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{([A-Z_]+)\}\}").expect("valid placeholder regex"))
}

/// Result of validating a variable map against a template's `VarDef`s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationInfo {
    pub is_valid: bool,
    pub missing_variables: Vec<String>,
    pub invalid_variables: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PreviewResult {
    pub resolved_conditions: Vec<RuleCondition>,
    pub resolved_event_type: String,
    pub resolved_throttle: Option<ThrottleConfig>,
    pub validation_info: ValidationInfo,
}

/// Overrides applied on top of a template when materializing a rule.
/// The source leaves this shape unspecified; we give it a minimal
/// concrete shape here (see DESIGN.md).
#[derive(Debug, Clone, Default)]
pub struct RuleCustomizations {
    pub name: Option<String>,
    pub severity: Option<Severity>,
    pub channels: Option<Vec<String>>,
    pub digest: Option<DigestConfig>,
    pub escalation: Option<EscalationConfig>,
    pub quiet_hours: Option<QuietHours>,
}

pub struct TemplateResolver {
    store: Arc<dyn TemplateStore>,
    builtins: Vec<AlertRuleTemplate>,
    clock: Arc<dyn Clock>,
}

impl TemplateResolver {
    pub fn new(store: Arc<dyn TemplateStore>, clock: Arc<dyn Clock>) -> CoreResult<Self> {
        Ok(Self {
            store,
            builtins: builtin::load()?,
            clock,
        })
    }

    pub async fn get_templates(
        &self,
        category: Option<TemplateCategory>,
    ) -> CoreResult<Vec<AlertRuleTemplate>> {
        let mut all = self.builtins.clone();
        all.extend(self.store.list_custom_templates().await?);
        if let Some(category) = category {
            all.retain(|t| t.category == category);
        }
        Ok(all)
    }

    pub async fn get_template_by_id(&self, id: &str) -> CoreResult<AlertRuleTemplate> {
        if let Some(found) = self.builtins.iter().find(|t| t.id == id) {
            return Ok(found.clone());
        }
        self.store
            .get_custom_template(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))
    }

    fn is_built_in_id(&self, id: &str) -> bool {
        self.builtins.iter().any(|t| t.id == id)
    }

    /// Checks presence/type/range for each `VarDef` against the
    /// supplied variable map (spec §4.3 validation semantics).
    fn validate_variables(
        &self,
        template: &AlertRuleTemplate,
        variables: &HashMap<String, String>,
    ) -> ValidationInfo {
        let mut info = ValidationInfo {
            is_valid: true,
            ..Default::default()
        };
        for var_def in &template.variables {
            let raw = variables.get(&var_def.name).map(|s| s.trim());
            match raw {
                None | Some("") => {
                    if var_def.required {
                        info.missing_variables.push(var_def.name.clone());
                    }
                }
                Some(value) => {
                    if !var_def_accepts(var_def, value) {
                        info.invalid_variables.push(var_def.name.clone());
                    }
                }
            }
        }
        info.is_valid = info.missing_variables.is_empty() && info.invalid_variables.is_empty();
        info
    }

    fn substitute(&self, raw: &str, variables: &HashMap<String, String>) -> String {
        let re = placeholder_re();
        if let Some(caps) = re.captures(raw) {
            let name = &caps[1];
            if let Some(value) = variables.get(name) {
                return re.replace(raw, value.as_str()).into_owned();
            }
        }
        raw.to_string()
    }

    fn resolve_condition(
        &self,
        condition: &TemplateCondition,
        variables: &HashMap<String, String>,
    ) -> RuleCondition {
        let substituted = self.substitute(&condition.value, variables);
        RuleCondition {
            field: condition.field.clone(),
            operator: condition.operator.clone(),
            value: coerce_condition_value(&substituted),
        }
    }

    pub async fn preview(
        &self,
        id: &str,
        variables: &HashMap<String, String>,
    ) -> CoreResult<PreviewResult> {
        let template = self.get_template_by_id(id).await?;
        let validation_info = self.validate_variables(&template, variables);
        let resolved_conditions = template
            .conditions
            .iter()
            .map(|c| self.resolve_condition(c, variables))
            .collect();
        let resolved_event_type = self.substitute(&template.event_type, variables);
        Ok(PreviewResult {
            resolved_conditions,
            resolved_event_type,
            resolved_throttle: template.throttle.clone(),
            validation_info,
        })
    }

    pub async fn apply(
        &self,
        id: &str,
        variables: &HashMap<String, String>,
        customizations: Option<RuleCustomizations>,
    ) -> CoreResult<AlertRule> {
        let template = self.get_template_by_id(id).await?;
        let validation_info = self.validate_variables(&template, variables);
        if !validation_info.is_valid {
            return Err(CoreError::ValidationFailed(format!(
                "missing={:?} invalid={:?}",
                validation_info.missing_variables, validation_info.invalid_variables
            )));
        }

        let resolved_conditions: Vec<RuleCondition> = template
            .conditions
            .iter()
            .map(|c| self.resolve_condition(c, variables))
            .collect();
        let resolved_event_type = self.substitute(&template.event_type, variables);
        let customizations = customizations.unwrap_or_default();
        let now = self.clock.now();

        let rule = AlertRule {
            id: new_id(),
            name: customizations.name.unwrap_or_else(|| template.name.clone()),
            event_type: resolved_event_type,
            severity: customizations.severity.unwrap_or(template.severity),
            conditions: resolved_conditions,
            channels: customizations.channels.unwrap_or_else(|| template.channels.clone()),
            enabled: true,
            throttle: template.throttle.clone(),
            digest: customizations.digest,
            escalation: customizations.escalation,
            quiet_hours: customizations.quiet_hours,
            created_at: now,
            updated_at: now,
        };

        // Built-in usage counts are process-local only; there is no
        // store row to persist them against.
        if !template.is_built_in {
            let mut updated = template;
            updated.usage_count += 1;
            updated.updated_at = now;
            self.store.upsert_custom_template(&updated).await?;
        }

        Ok(rule)
    }

    pub async fn save(&self, mut template: AlertRuleTemplate) -> CoreResult<AlertRuleTemplate> {
        template.is_built_in = false;
        template.category = TemplateCategory::Custom;
        let now = self.clock.now();
        if template.id.trim().is_empty() {
            template.id = new_id();
            template.created_at = now;
        }
        template.updated_at = now;
        self.store.upsert_custom_template(&template).await?;
        Ok(template)
    }

    pub async fn delete(&self, id: &str) -> CoreResult<()> {
        if self.is_built_in_id(id) {
            return Err(CoreError::BuiltInImmutable(id.to_string()));
        }
        if self.store.delete_custom_template(id).await? {
            Ok(())
        } else {
            Err(CoreError::NotFound(id.to_string()))
        }
    }

    pub fn import(&self, json: &str) -> CoreResult<AlertRuleTemplate> {
        let mut template: AlertRuleTemplate = serde_json::from_str(json)?;
        if template.name.trim().is_empty() || template.event_type.trim().is_empty() {
            return Err(CoreError::InvalidJson(
                "name and event_type are required".to_string(),
            ));
        }
        template.is_built_in = false;
        template.category = TemplateCategory::Custom;
        let now = self.clock.now();
        if template.id.trim().is_empty() {
            template.id = new_id();
        }
        template.created_at = now;
        template.updated_at = now;
        Ok(template)
    }

    pub fn export(&self, template: &AlertRuleTemplate) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(template)?)
    }
}

/// Coerces a fully-substituted placeholder value per spec §4.3: pure
/// integer first, then decimal, then case-insensitive boolean,
/// otherwise the raw string.
fn coerce_condition_value(raw: &str) -> ConditionValue {
    if let Ok(i) = raw.parse::<i64>() {
        return ConditionValue::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return ConditionValue::Float(f);
    }
    match raw.to_lowercase().as_str() {
        "true" => ConditionValue::Bool(true),
        "false" => ConditionValue::Bool(false),
        _ => ConditionValue::Str(raw.to_string()),
    }
}

fn var_def_accepts(var_def: &VarDef, value: &str) -> bool {
    match var_def.var_type {
        VarType::String => true,
        VarType::Integer | VarType::Duration => match value.parse::<i64>() {
            Ok(n) => within_bounds(var_def, n as f64),
            Err(_) => false,
        },
        VarType::Percentage => match value.parse::<f64>() {
            Ok(n) => within_bounds(var_def, n),
            Err(_) => false,
        },
    }
}

fn within_bounds(var_def: &VarDef, value: f64) -> bool {
    if let Some(min) = var_def.min {
        if value < min {
            return false;
        }
    }
    if let Some(max) = var_def.max {
        if value > max {
            return false;
        }
    }
    true
}
