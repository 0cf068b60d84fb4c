//! Per-resource hooks run on create and update bodies, and rule-based validation.

use crate::config::ValidationRule;
use crate::error::{AppError, ConfigError};
use crate::policy::Action;
use crate::record::Record;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

/// Overridable steps between body decoding and the store. Every step defaults to success.
pub trait RecordHooks: Send + Sync {
    /// Checks before anything is written.
    fn before_save(&self, _record: &Record, _action: Action) -> Result<(), AppError> {
        Ok(())
    }

    /// Field preparation (normalization, derived fields).
    fn prepare(&self, _record: &mut Record, _action: Action) -> Result<(), AppError> {
        Ok(())
    }

    fn validate(&self, _record: &Record, _action: Action) -> Result<(), AppError> {
        Ok(())
    }

    /// before_save, prepare, validate in that order.
    fn run(&self, record: &mut Record, action: Action) -> Result<(), AppError> {
        self.before_save(record, action)?;
        self.prepare(record, action)?;
        self.validate(record, action)
    }
}

pub struct NoopHooks;

impl RecordHooks for NoopHooks {}

/// Validates against `ValidationRule`s keyed by JSON field name. Creates check every
/// rule; updates only the fields present in the body.
pub struct RuleHooks {
    rules: HashMap<String, ValidationRule>,
    patterns: HashMap<String, Regex>,
}

impl RuleHooks {
    pub fn new(rules: HashMap<String, ValidationRule>) -> Result<Self, ConfigError> {
        let mut patterns = HashMap::new();
        for (field, rule) in &rules {
            if let Some(p) = &rule.pattern {
                let re = Regex::new(p)
                    .map_err(|e| ConfigError::Validation(format!("invalid pattern for {}: {}", field, e)))?;
                patterns.insert(field.clone(), re);
            }
        }
        Ok(RuleHooks { rules, patterns })
    }

    fn check_field(&self, field: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
        if v.is_null() {
            return Ok(());
        }
        let fail = |what: String| Err(AppError::bad_params(format!("{} {}", field, what)));
        if let Some(s) = v.as_str() {
            let len = s.chars().count();
            if let Some(max) = rule.max_length {
                if len > max as usize {
                    return fail(format!("must be at most {} characters", max));
                }
            }
            if let Some(min) = rule.min_length {
                if len < min as usize {
                    return fail(format!("must be at least {} characters", min));
                }
            }
            if let Some(re) = self.patterns.get(field) {
                if !re.is_match(s) {
                    return fail("does not match required pattern".into());
                }
            }
            if rule.format.as_deref().map(str::to_lowercase).as_deref() == Some("email")
                && !looks_like_email(s)
            {
                return fail("must be a valid email".into());
            }
        }
        if let Some(allowed) = &rule.allowed {
            if !allowed.iter().any(|a| value_eq(v, a)) {
                return fail("is not an allowed value".into());
            }
        }
        if let Some(n) = v.as_f64() {
            if rule.minimum.is_some_and(|min| n < min) {
                return fail(format!("must be at least {}", rule.minimum.unwrap_or_default()));
            }
            if rule.maximum.is_some_and(|max| n > max) {
                return fail(format!("must be at most {}", rule.maximum.unwrap_or_default()));
            }
        }
        Ok(())
    }
}

impl RecordHooks for RuleHooks {
    fn validate(&self, record: &Record, action: Action) -> Result<(), AppError> {
        for (field, rule) in &self.rules {
            let v = record.get(field);
            let missing = v.map_or(true, Value::is_null);
            if action == Action::Create && rule.required == Some(true) && missing {
                return Err(AppError::bad_params(format!("{} is required", field)));
            }
            if let Some(v) = v {
                self.check_field(field, v, rule)?;
            }
        }
        Ok(())
    }
}

fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> Record {
        serde_json::from_str(json).unwrap()
    }

    fn hooks() -> RuleHooks {
        let rules: HashMap<String, ValidationRule> = serde_json::from_str(
            r#"{
                "title": {"required": true, "max_length": 5},
                "email": {"format": "email"},
                "tags": {"allowed": ["a", "b"]},
                "rank": {"minimum": 1, "maximum": 3},
                "code": {"pattern": "^[A-Z]+$"}
            }"#,
        )
        .unwrap();
        RuleHooks::new(rules).unwrap()
    }

    #[test]
    fn noop_hooks_accept_anything() {
        let mut r = record(r#"{"x":1}"#);
        assert!(NoopHooks.run(&mut r, Action::Create).is_ok());
    }

    #[test]
    fn required_applies_only_on_create() {
        let h = hooks();
        assert!(h.validate(&record("{}"), Action::Create).is_err());
        assert!(h.validate(&record("{}"), Action::Update).is_ok());
        assert!(h.validate(&record(r#"{"title":"ok"}"#), Action::Create).is_ok());
    }

    #[test]
    fn field_rules_reject_bad_values() {
        let h = hooks();
        let bad = [
            r#"{"title":"toolong"}"#,
            r#"{"email":"nobody"}"#,
            r#"{"tags":"c"}"#,
            r#"{"rank":4}"#,
            r#"{"code":"abc"}"#,
        ];
        for body in bad {
            let err = h.validate(&record(body), Action::Update).unwrap_err();
            assert!(matches!(err, AppError::BadParams(_)), "{}", body);
        }
        let good = record(r#"{"title":"t","email":"a@b.org","tags":"a","rank":2,"code":"AB"}"#);
        assert!(h.validate(&good, Action::Create).is_ok());
    }

    #[test]
    fn invalid_pattern_is_rejected_up_front() {
        let mut rules = HashMap::new();
        rules.insert(
            "x".to_string(),
            ValidationRule {
                pattern: Some("(".into()),
                ..Default::default()
            },
        );
        assert!(matches!(RuleHooks::new(rules), Err(ConfigError::Validation(_))));
    }
}
