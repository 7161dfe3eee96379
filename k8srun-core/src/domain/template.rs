//! Pod template selection
//!
//! Templates are registered ahead of time and carry three labels that
//! identify them within a namespace. A job maps onto exactly one value for
//! each label.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::domain::job::Job;

pub const PREFIX_LABEL: &str = "k8srun.yashkov.org/prefix";
pub const CONFIG_LABEL: &str = "k8srun.yashkov.org/config";
pub const INSTANCE_LABEL: &str = "k8srun.yashkov.org/instance";

const MAX_LABEL_VALUE_LEN: usize = 63;

/// Exact-match selector over the three template labels
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateSelector {
    pub prefix: String,
    pub config: String,
    pub instance: String,
}

/// A selector value that Kubernetes would reject as a label value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value {value:?} for label {key}: {reason}")]
pub struct InvalidLabelValue {
    pub key: &'static str,
    pub value: String,
    pub reason: &'static str,
}

impl TemplateSelector {
    /// Builds the selector identifying the template for a job
    pub fn for_job(job: &Job) -> Self {
        Self {
            prefix: job.prefix(),
            config: job.config.clone(),
            instance: job.instance.to_lowercase(),
        }
    }

    /// `(label, value)` pairs, all of which must match
    pub fn requirements(&self) -> [(&'static str, &str); 3] {
        [
            (PREFIX_LABEL, self.prefix.as_str()),
            (CONFIG_LABEL, self.config.as_str()),
            (INSTANCE_LABEL, self.instance.as_str()),
        ]
    }

    /// Checks every value against the Kubernetes label value grammar
    pub fn validate(&self) -> Result<(), InvalidLabelValue> {
        for (key, value) in self.requirements() {
            check_label_value(key, value)?;
        }
        Ok(())
    }

    /// True when `labels` carries all three labels with equal values
    pub fn matches(&self, labels: Option<&BTreeMap<String, String>>) -> bool {
        let Some(labels) = labels else {
            return false;
        };

        self.requirements()
            .iter()
            .all(|(key, value)| labels.get(*key).map(String::as_str) == Some(*value))
    }

    /// The labels a template must carry to be selected
    pub fn to_labels(&self) -> BTreeMap<String, String> {
        self.requirements()
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }
}

/// Renders the selector in the API's `labelSelector` syntax
impl fmt::Display for TemplateSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [first, rest @ ..] = self.requirements();
        write!(f, "{}={}", first.0, first.1)?;
        for (key, value) in rest {
            write!(f, ",{}={}", key, value)?;
        }
        Ok(())
    }
}

fn check_label_value(key: &'static str, value: &str) -> Result<(), InvalidLabelValue> {
    let invalid = |reason| InvalidLabelValue {
        key,
        value: value.to_string(),
        reason,
    };

    if value.is_empty() {
        return Ok(());
    }

    if value.len() > MAX_LABEL_VALUE_LEN {
        return Err(invalid("must be 63 characters or less"));
    }

    let bytes = value.as_bytes();
    if !bytes[0].is_ascii_alphanumeric() || !bytes[bytes.len() - 1].is_ascii_alphanumeric() {
        return Err(invalid("must begin and end with an alphanumeric character"));
    }

    if !bytes
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
    {
        return Err(invalid(
            "may only contain alphanumerics, '-', '_' and '.'",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector() -> TemplateSelector {
        TemplateSelector::for_job(&Job::new("Team-A", "deploy-1", "prod"))
    }

    #[test]
    fn test_for_job_normalizes_keys() {
        let selector = selector();
        assert_eq!(selector.prefix, "deploy");
        assert_eq!(selector.config, "prod");
        assert_eq!(selector.instance, "team-a");
    }

    #[test]
    fn test_config_is_case_sensitive() {
        let selector = TemplateSelector::for_job(&Job::new("a", "b", "Prod"));
        assert_eq!(selector.config, "Prod");
    }

    #[test]
    fn test_display_renders_label_selector() {
        assert_eq!(
            selector().to_string(),
            "k8srun.yashkov.org/prefix=deploy,\
             k8srun.yashkov.org/config=prod,\
             k8srun.yashkov.org/instance=team-a"
        );
    }

    #[test]
    fn test_matches_requires_all_labels() {
        let selector = selector();
        let mut labels = selector.to_labels();
        assert!(selector.matches(Some(&labels)));

        labels.insert("unrelated".to_string(), "x".to_string());
        assert!(selector.matches(Some(&labels)));

        labels.insert(CONFIG_LABEL.to_string(), "staging".to_string());
        assert!(!selector.matches(Some(&labels)));

        labels.remove(CONFIG_LABEL);
        assert!(!selector.matches(Some(&labels)));

        assert!(!selector.matches(None));
    }

    #[test]
    fn test_validate_accepts_valid_values() {
        assert!(selector().validate().is_ok());

        let empty_prefix = TemplateSelector::for_job(&Job::new("a", "-x", "c.1_b"));
        assert!(empty_prefix.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_invalid_values() {
        let spaced = TemplateSelector::for_job(&Job::new("team a", "deploy", "prod"));
        let err = spaced.validate().unwrap_err();
        assert_eq!(err.key, INSTANCE_LABEL);

        let dangling = TemplateSelector::for_job(&Job::new("a", "deploy", "prod-"));
        let err = dangling.validate().unwrap_err();
        assert_eq!(err.key, CONFIG_LABEL);

        let long = TemplateSelector::for_job(&Job::new("a", "deploy", "x".repeat(64)));
        assert!(long.validate().is_err());
    }
}
