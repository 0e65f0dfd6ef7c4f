//! Per-repository bot configuration, loaded from a TOML file at startup.
//!
//! Validation failures are fatal at load time and never surface during
//! event handling.

use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::ci::{CiParser, CiTable, JobStatus};
use crate::error::{Error, Result};

pub const STATUS_SUCCESS: &str = "success";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// Link to the document listing all commands the bot accepts.
    pub commands_endpoint: String,

    /// Description of the review process, embedded in the welcome comment.
    pub doc: String,

    #[serde(default)]
    pub config_items: Vec<BotConfig>,
}

impl Configuration {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Configuration = toml::from_str(content)?;
        config.set_default();
        config.validate()?;
        Ok(config)
    }

    /// The config item covering `org/repo`. An exact repo entry beats an
    /// org-level entry; org-level entries honor `excluded_repos`.
    pub fn config_for(&self, org: &str, repo: &str) -> Option<&BotConfig> {
        let full = format!("{org}/{repo}");

        if let Some(item) = self
            .config_items
            .iter()
            .find(|i| i.repos.iter().any(|r| r == &full))
        {
            return Some(item);
        }

        self.config_items.iter().find(|i| {
            i.repos.iter().any(|r| r == org) && !i.excluded_repos.iter().any(|r| r == &full)
        })
    }

    fn set_default(&mut self) {
        for item in &mut self.config_items {
            item.set_default();
        }
    }

    fn validate(&mut self) -> Result<()> {
        if self.commands_endpoint.is_empty() {
            return Err(Error::ConfigValidation(
                "missing commands_endpoint".to_string(),
            ));
        }
        if self.doc.is_empty() {
            return Err(Error::ConfigValidation("missing doc".to_string()));
        }

        for (i, item) in self.config_items.iter_mut().enumerate() {
            item.validate()
                .map_err(|e| Error::ConfigValidation(format!("config_items[{i}]: {e}")))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Repositories this item applies to: `org` or `org/repo` entries.
    #[serde(default)]
    pub repos: Vec<String>,

    /// Repositories carved out of an org-level entry.
    #[serde(default)]
    pub excluded_repos: Vec<String>,

    #[serde(default)]
    pub ci: CiConfig,

    #[serde(default)]
    pub review: ReviewConfig,

    #[serde(default)]
    pub owner: OwnerConfig,

    /// Label proving the author has signed the CLA.
    pub cla_label: String,

    /// Label gating `/can-review` on a preliminary CI pass, if any.
    #[serde(default)]
    pub label_for_basic_ci_passed: Option<String>,

    /// Whether to post the one-time welcome comment when a PR opens.
    #[serde(default)]
    pub need_welcome: bool,

    #[serde(default)]
    pub maintainers: Vec<String>,
}

impl BotConfig {
    fn set_default(&mut self) {
        self.review.set_default();
    }

    fn validate(&mut self) -> Result<()> {
        if self.repos.is_empty() {
            return Err(Error::ConfigValidation("missing repos".to_string()));
        }
        if self.cla_label.is_empty() {
            return Err(Error::ConfigValidation("missing cla_label".to_string()));
        }
        self.ci.validate()?;
        self.owner.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CiConfig {
    /// The repo runs no CI; review starts as soon as the PR opens.
    #[serde(default)]
    pub no_ci: bool,

    #[serde(default)]
    pub job: Option<JobConfig>,

    /// How many job rows a complete CI summary carries.
    #[serde(default)]
    pub number_of_test_cases: usize,

    /// Label indicating the CI test cases have passed.
    #[serde(default)]
    pub label_for_ci_passed: String,
}

impl CiConfig {
    fn validate(&mut self) -> Result<()> {
        if self.no_ci {
            return Ok(());
        }

        if self.number_of_test_cases == 0 {
            return Err(Error::ConfigValidation(
                "number_of_test_cases must be bigger than 0".to_string(),
            ));
        }
        if self.label_for_ci_passed.is_empty() {
            return Err(Error::ConfigValidation(
                "missing label_for_ci_passed".to_string(),
            ));
        }

        match &mut self.job {
            None => Err(Error::ConfigValidation("missing job".to_string())),
            Some(job) => job.validate(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    pub ci_table: CiTable,

    /// Result-cell descriptions that count as a successful job.
    #[serde(default)]
    pub job_success_status: Vec<String>,
}

impl JobConfig {
    fn validate(&mut self) -> Result<()> {
        self.ci_table.validate()?;

        if self.job_success_status.is_empty() {
            return Err(Error::ConfigValidation(
                "missing job_success_status".to_string(),
            ));
        }
        Ok(())
    }

    fn ci_parser(&self) -> CiParser {
        CiParser {
            table: self.ci_table.clone(),
            statuses: vec![JobStatus {
                desc: self.job_success_status.clone(),
                status: STATUS_SUCCESS.to_string(),
                priority: 0,
            }],
        }
    }

    /// Whether the comment is a complete all-green CI summary: every row
    /// matches the success descriptions and the row count is the expected
    /// one. A body that is not a CI comment at all answers `false`.
    pub fn is_ci_success(&self, body: &str, expected_jobs: usize) -> Result<bool> {
        if !self.ci_table.is_ci_comment(body) {
            return Ok(false);
        }

        let statuses = self.ci_parser().parse_statuses(body)?;
        Ok(statuses.len() == expected_jobs)
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReviewConfig {
    /// Whether the PR author's own `/approve` counts.
    #[serde(default)]
    pub allow_self_approve: bool,

    /// Distinct agreed approvers every changed file needs.
    #[serde(default)]
    pub number_of_approvers: usize,

    /// Agreed approvers needed overall before the approved label is added.
    #[serde(default)]
    pub total_number_of_approvers: usize,

    /// Assenting reviewers + approvers needed before the lgtm label is
    /// added.
    #[serde(default)]
    pub total_number_of_reviewers: usize,

    /// Optional external service refining the suggested reviewer list.
    #[serde(default)]
    pub endpoint_to_recommend_reviewer: Option<String>,
}

impl ReviewConfig {
    fn set_default(&mut self) {
        if self.number_of_approvers == 0 {
            self.number_of_approvers = 1;
        }
        if self.total_number_of_approvers == 0 {
            self.total_number_of_approvers = 2;
        }
        if self.total_number_of_reviewers == 0 {
            self.total_number_of_reviewers = 1;
        }
    }
}

/// Which branches carry owners files. The two specifications are
/// mutually exclusive: an allow-list of branches that DO have owners, or
/// a regex of branches that do NOT.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct OwnerConfig {
    #[serde(default)]
    pub branch_with_owners: Vec<String>,

    #[serde(default)]
    pub branch_without_owners: Option<String>,

    #[serde(skip)]
    without_owners_re: Option<Regex>,
}

impl OwnerConfig {
    fn validate(&mut self) -> Result<()> {
        if !self.branch_with_owners.is_empty() && self.branch_without_owners.is_some() {
            return Err(Error::ConfigValidation(
                "branch_with_owners and branch_without_owners are mutually exclusive".to_string(),
            ));
        }

        if let Some(pat) = &self.branch_without_owners {
            let re = Regex::new(pat).map_err(|e| {
                Error::ConfigValidation(format!("bad branch_without_owners regex: {e}"))
            })?;
            self.without_owners_re = Some(re);
        }
        Ok(())
    }

    pub fn is_branch_without_owners(&self, branch: &str) -> bool {
        if !self.branch_with_owners.is_empty() {
            return !self.branch_with_owners.iter().any(|b| b == branch);
        }

        match &self.without_owners_re {
            Some(re) => re.is_match(branch),
            None => false,
        }
    }
}
