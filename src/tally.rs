//! Turns the raw comment history into the per-reviewer latest-command
//! summary.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, FixedOffset};

use crate::commands::{
    CMD_APPROVE, CMD_LBTM, CMD_LGTM, CMD_REJECT, can_apply_command, get_review_command,
};
use crate::config::ReviewConfig;
use crate::platform::{PrComment, normalize_login};
use crate::pull_request::PullRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewCommand {
    pub author: String,
    pub command: String,
}

/// Four disjoint sets: each author lands in at most one, per their latest
/// applicable command. Sets are kept sorted for stable rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewSummary {
    pub agreed_approvers: Vec<String>,
    pub agreed_reviewers: Vec<String>,
    pub disagreed_approvers: Vec<String>,
    pub disagreed_reviewers: Vec<String>,
}

impl ReviewSummary {
    pub fn assentor_count(&self) -> usize {
        self.agreed_approvers.len() + self.agreed_reviewers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agreed_approvers.is_empty()
            && self.agreed_reviewers.is_empty()
            && self.disagreed_approvers.is_empty()
            && self.disagreed_reviewers.is_empty()
    }
}

pub fn summarize_commands(cmds: &[ReviewCommand]) -> ReviewSummary {
    let mut agreed_approvers = BTreeSet::new();
    let mut agreed_reviewers = BTreeSet::new();
    let mut disagreed_approvers = BTreeSet::new();
    let mut disagreed_reviewers = BTreeSet::new();

    for c in cmds {
        match c.command.as_str() {
            CMD_LGTM => agreed_reviewers.insert(c.author.clone()),
            CMD_APPROVE => agreed_approvers.insert(c.author.clone()),
            CMD_REJECT => disagreed_approvers.insert(c.author.clone()),
            CMD_LBTM => disagreed_reviewers.insert(c.author.clone()),
            _ => false,
        };
    }

    ReviewSummary {
        agreed_approvers: agreed_approvers.into_iter().collect(),
        agreed_reviewers: agreed_reviewers.into_iter().collect(),
        disagreed_approvers: disagreed_approvers.into_iter().collect(),
        disagreed_reviewers: disagreed_reviewers.into_iter().collect(),
    }
}

struct ReviewComment {
    author: String,
    body: String,
    t: DateTime<FixedOffset>,
}

pub struct ReviewStats<'a> {
    pub pr: &'a PullRequest,
    pub cfg: &'a ReviewConfig,
    pub reviewers: HashSet<String>,
}

impl ReviewStats<'_> {
    pub fn is_reviewer(&self, author: &str) -> bool {
        self.reviewers.contains(author)
    }

    pub fn number_of_reviewers(&self) -> usize {
        self.reviewers.len()
    }

    /// Applicability check bound to this PR's author and approver set.
    pub fn check_command(&self, cmd: &str, author: &str) -> bool {
        can_apply_command(
            cmd,
            self.pr.pr_author() == author,
            self.pr.is_approver(author),
            self.cfg.allow_self_approve,
        )
    }

    /// The per-reviewer summary over all comments at or after the
    /// cut-off time.
    pub fn stat_review(
        &self,
        comments: &[PrComment],
        start_time: DateTime<FixedOffset>,
        bot_name: &str,
    ) -> ReviewSummary {
        let commands = self.filter_comments(comments, start_time, bot_name);
        if commands.is_empty() {
            return ReviewSummary::default();
        }
        summarize_commands(&commands)
    }

    /// Walk the surviving comments newest-first; an author's most recent
    /// comment carrying an applicable command decides their entry.
    fn filter_comments(
        &self,
        comments: &[PrComment],
        start_time: DateTime<FixedOffset>,
        bot_name: &str,
    ) -> Vec<ReviewCommand> {
        let survivors = self.pre_treat_comments(comments, start_time, bot_name);

        let mut done: HashSet<&str> = HashSet::new();
        let mut commands = Vec::with_capacity(survivors.len());

        for c in survivors.iter().rev() {
            if done.contains(c.author.as_str()) {
                continue;
            }

            let (cmd, _) =
                get_review_command(&c.body, |cmd| self.check_command(cmd, &c.author));
            if let Some(cmd) = cmd {
                commands.push(ReviewCommand {
                    author: c.author.clone(),
                    command: cmd,
                });
                done.insert(c.author.as_str());
            }
        }

        commands
    }

    /// Drop bot comments, non-reviewers, unparseable timestamps, and
    /// anything strictly before the cut-off; sort ascending by time.
    fn pre_treat_comments(
        &self,
        comments: &[PrComment],
        start_time: DateTime<FixedOffset>,
        bot_name: &str,
    ) -> Vec<ReviewComment> {
        let mut r: Vec<ReviewComment> = comments
            .iter()
            .filter_map(|c| {
                let login = c.author.as_deref()?;
                if login == bot_name {
                    return None;
                }

                let author = normalize_login(login);
                if !self.is_reviewer(&author) {
                    return None;
                }

                let t = DateTime::parse_from_rfc3339(&c.updated_at).ok()?;
                if t < start_time {
                    return None;
                }

                Some(ReviewComment {
                    author,
                    body: c.body.clone(),
                    t,
                })
            })
            .collect();

        r.sort_by_key(|c| c.t);
        r
    }
}
