#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use reviewbot::config::Configuration;
use reviewbot::error::{Error, Result};
use reviewbot::owners::{OwnersClient, RepoOwner};
use reviewbot::platform::{PlatformClient, PrComment, PrInfo};

/// Platform mock recording every mutation so tests can assert the exact
/// label and comment traffic.
#[derive(Default)]
pub struct MockPlatform {
    pub labels_added: RefCell<Vec<Vec<String>>>,
    pub labels_removed: RefCell<Vec<Vec<String>>>,
    pub comments_created: RefCell<Vec<String>>,
    pub comments_deleted: RefCell<Vec<i64>>,

    pub comments: Vec<PrComment>,
    pub changed_files: Vec<String>,
    pub collaborators: Vec<String>,
    pub commit_time: String,
}

impl MockPlatform {
    pub fn new(commit_time: &str, changed_files: &[&str]) -> Self {
        Self {
            commit_time: commit_time.to_string(),
            changed_files: changed_files.iter().map(|f| f.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn all_added_labels(&self) -> Vec<String> {
        self.labels_added.borrow().iter().flatten().cloned().collect()
    }

    pub fn all_removed_labels(&self) -> Vec<String> {
        self.labels_removed.borrow().iter().flatten().cloned().collect()
    }
}

impl PlatformClient for MockPlatform {
    fn add_pr_label(&self, _: &str, _: &str, _: u64, label: &str) -> Result<()> {
        self.labels_added.borrow_mut().push(vec![label.to_string()]);
        Ok(())
    }

    fn add_pr_labels(&self, _: &str, _: &str, _: u64, labels: &[String]) -> Result<()> {
        self.labels_added.borrow_mut().push(labels.to_vec());
        Ok(())
    }

    fn remove_pr_labels(&self, _: &str, _: &str, _: u64, labels: &[String]) -> Result<()> {
        self.labels_removed.borrow_mut().push(labels.to_vec());
        Ok(())
    }

    fn list_pr_comments(&self, _: &str, _: &str, _: u64) -> Result<Vec<PrComment>> {
        Ok(self.comments.clone())
    }

    fn create_pr_comment(&self, _: &str, _: &str, _: u64, body: &str) -> Result<()> {
        self.comments_created.borrow_mut().push(body.to_string());
        Ok(())
    }

    fn delete_pr_comment(&self, _: &str, _: &str, comment_id: i64) -> Result<()> {
        self.comments_deleted.borrow_mut().push(comment_id);
        Ok(())
    }

    fn get_commit_time(&self, _: &str, _: &str, _: &str) -> Result<String> {
        Ok(self.commit_time.clone())
    }

    fn list_pr_changed_files(&self, _: &str, _: &str, _: u64) -> Result<Vec<String>> {
        Ok(self.changed_files.clone())
    }

    fn list_collaborators(&self, _: &str, _: &str) -> Result<Vec<String>> {
        Ok(self.collaborators.clone())
    }
}

/// Map-backed owner view; leaf and non-leaf share the same entries.
#[derive(Clone, Default)]
pub struct OwnersFixture {
    approvers: HashMap<String, HashSet<String>>,
    reviewers: HashMap<String, HashSet<String>>,
}

impl OwnersFixture {
    /// `reviewers` must include the approvers, as real owners files do.
    pub fn new(approvers: &[(&str, &[&str])], reviewers: &[(&str, &[&str])]) -> Self {
        let build = |entries: &[(&str, &[&str])]| {
            entries
                .iter()
                .map(|(path, users)| {
                    (
                        path.to_string(),
                        users.iter().map(|u| u.to_string()).collect::<HashSet<_>>(),
                    )
                })
                .collect()
        };
        Self {
            approvers: build(approvers),
            reviewers: build(reviewers),
        }
    }

    fn lookup(m: &HashMap<String, HashSet<String>>, path: &str) -> HashSet<String> {
        m.get(path).cloned().unwrap_or_default()
    }
}

impl RepoOwner for OwnersFixture {
    fn approvers(&self, path: &str) -> HashSet<String> {
        Self::lookup(&self.approvers, path)
    }

    fn leaf_approvers(&self, path: &str) -> HashSet<String> {
        Self::lookup(&self.approvers, path)
    }

    fn reviewers(&self, path: &str) -> HashSet<String> {
        Self::lookup(&self.reviewers, path)
    }

    fn leaf_reviewers(&self, path: &str) -> HashSet<String> {
        Self::lookup(&self.reviewers, path)
    }

    fn all_reviewers(&self) -> HashSet<String> {
        self.reviewers.values().flatten().cloned().collect()
    }
}

pub struct StaticOwnersClient {
    pub fixture: OwnersFixture,
}

impl OwnersClient for StaticOwnersClient {
    fn owners(&self, _: &str, _: &str, _: &str) -> Result<Box<dyn RepoOwner>> {
        Ok(Box::new(self.fixture.clone()))
    }
}

/// Owners client standing in for an unreachable cache.
pub struct FailingOwnersClient;

impl OwnersClient for FailingOwnersClient {
    fn owners(&self, _: &str, _: &str, _: &str) -> Result<Box<dyn RepoOwner>> {
        Err(Error::OwnersCache("cache unavailable".to_string()))
    }
}

pub fn pr_info(author: &str, labels: &[&str]) -> PrInfo {
    PrInfo {
        org: "myorg".to_string(),
        repo: "myrepo".to_string(),
        number: 12,
        target_branch: "master".to_string(),
        head_sha: "abc123".to_string(),
        author: author.to_string(),
        title: "Add feature".to_string(),
        url: "https://example.com/myorg/myrepo/pulls/12".to_string(),
        state: "open".to_string(),
        labels: labels.iter().map(|l| l.to_string()).collect(),
    }
}

pub fn comment(id: i64, author: &str, body: &str, at: &str) -> PrComment {
    PrComment {
        id,
        author: Some(author.to_string()),
        body: body.to_string(),
        updated_at: at.to_string(),
    }
}

/// A config with CI disabled: review starts as soon as the PR opens.
pub fn no_ci_config() -> Configuration {
    Configuration::parse(
        r#"
commands_endpoint = "https://example.com/commands"
doc = "See the review process description."

[[config_items]]
repos = ["myorg"]
cla_label = "cla/yes"

[config_items.ci]
no_ci = true

[config_items.review]
number_of_approvers = 1
total_number_of_approvers = 2
total_number_of_reviewers = 1

[config_items.owner]
branch_with_owners = ["master"]
"#,
    )
    .unwrap()
}

/// A config with a seven-job CI table gating review.
pub fn ci_config() -> Configuration {
    Configuration::parse(
        r#"
commands_endpoint = "https://example.com/commands"
doc = "See the review process description."

[[config_items]]
repos = ["myorg"]
cla_label = "cla/yes"

[config_items.ci]
number_of_test_cases = 7
label_for_ci_passed = "ci-pipeline-success"

[config_items.ci.job]
job_success_status = ["Jenkins job succeeded"]

[config_items.ci.job.ci_table]
title = "| Check Name | Result | Details |"
result_column_num = 2

[config_items.review]
number_of_approvers = 1
total_number_of_approvers = 2
total_number_of_reviewers = 1

[config_items.owner]
branch_with_owners = ["master"]
"#,
    )
    .unwrap()
}
