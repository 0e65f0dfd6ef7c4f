//! Boundary types and the client trait for the code-hosting platform.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};

use crate::error::Result;

/// Lowercase a login and strip a leading `@`.
pub fn normalize_login(login: &str) -> String {
    login.to_lowercase().trim_start_matches('@').to_string()
}

/// What the core consumes from the platform. The concrete HTTP client
/// lives outside this crate; tests supply mocks.
pub trait PlatformClient {
    fn add_pr_label(&self, org: &str, repo: &str, number: u64, label: &str) -> Result<()>;
    fn add_pr_labels(&self, org: &str, repo: &str, number: u64, labels: &[String]) -> Result<()>;
    fn remove_pr_labels(&self, org: &str, repo: &str, number: u64, labels: &[String])
    -> Result<()>;

    fn list_pr_comments(&self, org: &str, repo: &str, number: u64) -> Result<Vec<PrComment>>;
    fn create_pr_comment(&self, org: &str, repo: &str, number: u64, body: &str) -> Result<()>;
    fn delete_pr_comment(&self, org: &str, repo: &str, comment_id: i64) -> Result<()>;

    /// Committer timestamp of a commit, RFC3339.
    fn get_commit_time(&self, org: &str, repo: &str, sha: &str) -> Result<String>;

    fn list_pr_changed_files(&self, org: &str, repo: &str, number: u64) -> Result<Vec<String>>;
    fn list_collaborators(&self, org: &str, repo: &str) -> Result<Vec<String>>;
}

/// The committer time of the PR head commit, used as the tally cut-off.
pub fn pr_code_update_time(
    client: &dyn PlatformClient,
    org: &str,
    repo: &str,
    head_sha: &str,
) -> Result<DateTime<FixedOffset>> {
    let raw = client.get_commit_time(org, repo, head_sha)?;
    DateTime::parse_from_rfc3339(&raw)
        .map_err(|e| crate::error::Error::Platform(format!("bad commit time {raw:?}: {e}")))
}

#[derive(Debug, Clone)]
pub struct PrComment {
    pub id: i64,
    pub author: Option<String>,
    pub body: String,
    pub updated_at: String,
}

/// Identity and current platform state of one pull request.
#[derive(Debug, Clone)]
pub struct PrInfo {
    pub org: String,
    pub repo: String,
    pub number: u64,
    pub target_branch: String,
    pub head_sha: String,
    pub author: String,
    pub title: String,
    pub url: String,
    pub state: String,
    pub labels: HashSet<String>,
}

impl PrInfo {
    pub fn is_open(&self) -> bool {
        self.state == "open"
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn has_any_label(&self, labels: &[String]) -> bool {
        labels.iter().any(|l| self.labels.contains(l))
    }

    pub fn author_login(&self) -> String {
        normalize_login(&self.author)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrAction {
    Opened,
    SourceBranchChanged,
}

#[derive(Debug, Clone)]
pub struct PrEvent {
    pub action: PrAction,
    pub pr: PrInfo,
    pub assignees: Vec<String>,
}

/// A comment-created delivery on an open pull request.
#[derive(Debug, Clone)]
pub struct NoteEvent {
    pub pr: PrInfo,
    pub assignees: Vec<String>,
    pub comment: PrComment,
}

impl NoteEvent {
    pub fn commenter(&self) -> Option<String> {
        self.comment.author.as_deref().map(normalize_login)
    }
}

/// A notification comment previously written by the bot.
#[derive(Debug, Clone)]
pub struct BotComment {
    pub id: i64,
    pub body: String,
    pub created_at: DateTime<FixedOffset>,
}

/// Bot-authored comments whose body satisfies `is_target`. Comments with
/// an unparseable timestamp are skipped.
pub fn find_bot_comments(
    comments: &[PrComment],
    bot_name: &str,
    is_target: impl Fn(&str) -> bool,
) -> Vec<BotComment> {
    comments
        .iter()
        .filter(|c| c.author.as_deref() == Some(bot_name))
        .filter(|c| is_target(&c.body))
        .filter_map(|c| {
            let created_at = DateTime::parse_from_rfc3339(&c.updated_at).ok()?;
            Some(BotComment {
                id: c.id,
                body: c.body.clone(),
                created_at,
            })
        })
        .collect()
}

pub fn sort_bot_comments(comments: &mut [BotComment]) {
    comments.sort_by_key(|c| c.created_at);
}

/// Quote the original comment and address its author, for replies like
/// usage help or gate failures.
pub fn reply_with_reference(commenter: &str, original: &str, reply: &str) -> String {
    let quoted: String = original.lines().map(|l| format!("> {l}\n")).collect();
    format!("{quoted}\n@{commenter}, {reply}")
}
