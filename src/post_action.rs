//! Commits a derived verdict: label set, notification comment, and
//! suggestion refresh, accumulating partial failures.

use tracing::warn;

use crate::commands::CMD_APPROVE;
use crate::config::ReviewConfig;
use crate::error::{MultiError, Result};
use crate::labels::{
    LABEL_APPROVED, LABEL_CAN_REVIEW, LABEL_LGTM, LABEL_REQUEST_CHANGE, update_labels,
};
use crate::notification::{
    NotificationComment, contains_suggested_approver, contains_suggested_reviewer,
};
use crate::owners::RepoOwner;
use crate::platform::{BotComment, PlatformClient, sort_bot_comments};
use crate::pull_request::PullRequest;
use crate::suggestion::{ApproverSuggester, suggest_reviewers};
use crate::tally::ReviewSummary;
use crate::verdict::Verdict;

pub struct PostAction<'a> {
    pub client: &'a dyn PlatformClient,
    pub review_cfg: &'a ReviewConfig,
    pub pr: &'a PullRequest,
    pub owner: &'a dyn RepoOwner,
    pub bot_name: &'a str,

    /// Whether review has actually begun (CI disabled or CI-passed label
    /// present). When false, only labels are maintained and stale
    /// notifications are dropped.
    pub is_starting_review: bool,
}

impl PostAction<'_> {
    pub fn run(
        &self,
        mut old_comments: Vec<BotComment>,
        last_command: Option<&str>,
        summary: &ReviewSummary,
        verdict: &Verdict,
    ) -> Result<()> {
        if summary.is_empty() {
            return Ok(());
        }

        sort_bot_comments(&mut old_comments);
        let old_tips = old_comments
            .last()
            .map(|c| c.body.clone())
            .unwrap_or_default();

        let n = NotificationComment::new(summary, &old_tips, self.bot_name);

        if verdict.is_rejected {
            return self.settle(&old_comments, &old_tips, LABEL_REQUEST_CHANGE, n.reject_comment());
        }
        if verdict.is_lbtm {
            return self.settle(
                &old_comments,
                &old_tips,
                LABEL_REQUEST_CHANGE,
                n.request_change_comment(),
            );
        }
        if verdict.is_lgtm && verdict.is_approved {
            return self.pass_review(&old_comments, &old_tips, &n);
        }
        if verdict.is_lgtm {
            return self.lgtm(&old_comments, &old_tips, &n, summary, last_command);
        }
        if verdict.is_approved {
            return self.approve(&old_comments, &old_tips, &n, verdict);
        }
        self.reviewing(&old_comments, &old_tips, &n, verdict)
    }

    /// Terminal negative states share one shape: a single label and a
    /// notification naming the detractors.
    fn settle(
        &self,
        old_comments: &[BotComment],
        old_tips: &str,
        label: &str,
        desc: String,
    ) -> Result<()> {
        let mut errors = MultiError::new();

        if let Err(e) = update_labels(self.client, &self.pr.info, &[label]) {
            errors.add_error(e);
        }
        if let Err(e) = self.write_notification(&desc, old_tips, old_comments) {
            errors.add_error(e);
        }

        errors.into_result()
    }

    fn pass_review(
        &self,
        old_comments: &[BotComment],
        old_tips: &str,
        n: &NotificationComment,
    ) -> Result<()> {
        let mut errors = MultiError::new();

        if let Err(e) = update_labels(self.client, &self.pr.info, &[LABEL_LGTM, LABEL_APPROVED]) {
            errors.add_error(e);
        }
        if let Err(e) = self.write_notification(&n.pass_review_comment(), old_tips, old_comments) {
            errors.add_error(e);
        }

        errors.into_result()
    }

    fn lgtm(
        &self,
        old_comments: &[BotComment],
        old_tips: &str,
        n: &NotificationComment,
        summary: &ReviewSummary,
        last_command: Option<&str>,
    ) -> Result<()> {
        let mut errors = MultiError::new();

        if let Err(e) = update_labels(self.client, &self.pr.info, &[LABEL_LGTM]) {
            errors.add_error(e);
        }

        if !self.is_starting_review {
            self.delete_old_comments(old_comments);
            return errors.into_result();
        }

        // A just-posted /approve refreshes the approver tips even when the
        // previous notification already carried some.
        let need_suggestion = old_tips.is_empty()
            || !contains_suggested_approver(old_tips)
            || last_command == Some(CMD_APPROVE);

        let suggested = if need_suggestion {
            self.suggest_approvers(&summary.agreed_approvers)
        } else {
            Vec::new()
        };

        let unapproved = self
            .pr
            .unapproved_files(&summary.agreed_approvers, self.review_cfg.number_of_approvers);

        let desc = n.lgtm_comment(&suggested, &unapproved);
        if let Err(e) = self.write_notification(&desc, old_tips, old_comments) {
            errors.add_error(e);
        }

        errors.into_result()
    }

    fn approve(
        &self,
        old_comments: &[BotComment],
        old_tips: &str,
        n: &NotificationComment,
        verdict: &Verdict,
    ) -> Result<()> {
        let mut errors = MultiError::new();

        if let Err(e) = update_labels(self.client, &self.pr.info, &[LABEL_APPROVED]) {
            errors.add_error(e);
        }

        if !self.is_starting_review {
            self.delete_old_comments(old_comments);
            return errors.into_result();
        }

        let need_suggestion = old_tips.is_empty() || !contains_suggested_reviewer(old_tips);
        let suggested = if need_suggestion {
            self.suggest_reviewers()
        } else {
            Vec::new()
        };

        let desc = n.approved_comment(verdict.need_lgtm_num, &suggested);
        if let Err(e) = self.write_notification(&desc, old_tips, old_comments) {
            errors.add_error(e);
        }

        errors.into_result()
    }

    fn reviewing(
        &self,
        old_comments: &[BotComment],
        old_tips: &str,
        n: &NotificationComment,
        verdict: &Verdict,
    ) -> Result<()> {
        if !self.is_starting_review {
            self.delete_old_comments(old_comments);
            return update_labels(self.client, &self.pr.info, &[]);
        }

        let mut errors = MultiError::new();

        if let Err(e) = update_labels(self.client, &self.pr.info, &[LABEL_CAN_REVIEW]) {
            errors.add_error(e);
        }

        let need_suggestion = old_tips.is_empty() || !contains_suggested_reviewer(old_tips);
        let suggested = if need_suggestion {
            self.suggest_reviewers()
        } else {
            Vec::new()
        };

        let desc = n.reviewing_comment(verdict.need_lgtm_num, &suggested);
        if let Err(e) = self.write_notification(&desc, old_tips, old_comments) {
            errors.add_error(e);
        }

        errors.into_result()
    }

    /// Write the replacement notification, then drop every previous one.
    /// An unchanged body is left alone entirely.
    fn write_notification(
        &self,
        desc: &str,
        old_tips: &str,
        old_comments: &[BotComment],
    ) -> Result<()> {
        if desc == old_tips {
            return Ok(());
        }

        let info = &self.pr.info;
        let result = if desc.is_empty() {
            Ok(())
        } else {
            self.client
                .create_pr_comment(&info.org, &info.repo, info.number, desc)
        };

        self.delete_old_comments(old_comments);
        result
    }

    fn delete_old_comments(&self, old_comments: &[BotComment]) {
        let info = &self.pr.info;
        for c in old_comments {
            if let Err(e) = self.client.delete_pr_comment(&info.org, &info.repo, c.id) {
                warn!(comment_id = c.id, error = %e, "failed to delete old notification");
            }
        }
    }

    fn suggest_reviewers(&self) -> Vec<String> {
        match suggest_reviewers(
            self.client,
            self.owner,
            &self.pr.info,
            self.review_cfg.total_number_of_reviewers,
            self.review_cfg.endpoint_to_recommend_reviewer.as_deref(),
        ) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "failed to suggest reviewers");
                Vec::new()
            }
        }
    }

    fn suggest_approvers(&self, current_approvers: &[String]) -> Vec<String> {
        ApproverSuggester {
            pr: self.pr,
            cfg: self.review_cfg,
            owner: self.owner,
        }
        .suggest(current_approvers, &self.pr.assignees)
    }
}
