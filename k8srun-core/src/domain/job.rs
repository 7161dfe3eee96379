//! Job domain types

use serde::{Deserialize, Serialize};

/// Request to run one instance of a registered pod template
///
/// Owned by the caller and never mutated by the runner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Instance the job belongs to, matched case-insensitively
    pub instance: String,
    /// Job name; its leading alphanumeric run selects the template
    pub name: String,
    /// Namespace override, `None` (or empty) for the cluster default
    #[serde(default)]
    pub namespace: Option<String>,
    /// Configuration variant
    pub config: String,
    /// Arguments handed verbatim to the first container
    #[serde(default)]
    pub args: Vec<String>,
}

impl Job {
    /// Creates a job without arguments in the default namespace
    pub fn new(
        instance: impl Into<String>,
        name: impl Into<String>,
        config: impl Into<String>,
    ) -> Self {
        Self {
            instance: instance.into(),
            name: name.into(),
            namespace: None,
            config: config.into(),
            args: Vec::new(),
        }
    }

    /// Overrides the namespace the template is looked up in
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the arguments passed to the first container
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Value of the template prefix label for this job
    pub fn prefix(&self) -> String {
        name_prefix(&self.name)
    }

    /// `generateName` for pods launched for this job, e.g. `my-job-`
    pub fn generate_name(&self) -> String {
        format!("{}-", normalize(&self.name))
    }

    /// Namespace to search, falling back to `default` when no override is set
    pub fn namespace_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.namespace
            .as_deref()
            .filter(|ns| !ns.trim().is_empty())
            .unwrap_or(default)
    }
}

/// Lower-cased leading run of ASCII alphanumerics
///
/// A name that starts with any other character yields an empty prefix.
pub fn name_prefix(name: &str) -> String {
    name.chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Trims, lower-cases and replaces `_` with `-`
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase().replace('_', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_stops_at_first_non_alphanumeric() {
        assert_eq!(name_prefix("Build123-x"), "build123");
        assert_eq!(name_prefix("deploy-1"), "deploy");
        assert_eq!(name_prefix("report_daily"), "report");
    }

    #[test]
    fn test_prefix_empty_for_non_alphanumeric_lead() {
        assert_eq!(name_prefix("-deploy"), "");
        assert_eq!(name_prefix(" deploy"), "");
        assert_eq!(name_prefix(""), "");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(" My_Job "), "my-job");
        assert_eq!(normalize("a_b_c"), "a-b-c");
        assert_eq!(normalize("Already-Fine"), "already-fine");
    }

    #[test]
    fn test_generate_name() {
        let job = Job::new("team-a", " My_Job ", "prod");
        assert_eq!(job.generate_name(), "my-job-");
    }

    #[test]
    fn test_namespace_or() {
        let job = Job::new("team-a", "deploy", "prod");
        assert_eq!(job.namespace_or("default"), "default");

        let job = job.with_namespace("");
        assert_eq!(job.namespace_or("default"), "default");

        let job = job.with_namespace("batch");
        assert_eq!(job.namespace_or("default"), "batch");
    }

    #[test]
    fn test_with_args_preserves_order() {
        let job = Job::new("i", "n", "c").with_args(["--b", "--a", "x"]);
        assert_eq!(job.args, vec!["--b", "--a", "x"]);
    }

    #[test]
    fn test_job_deserializes_without_optional_fields() {
        let job: Job = serde_json::from_value(serde_json::json!({
            "instance": "Team-A",
            "name": "deploy-1",
            "config": "prod"
        }))
        .unwrap();

        assert_eq!(job.namespace, None);
        assert!(job.args.is_empty());
    }
}
