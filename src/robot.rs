//! Event dispatch: turns PR and comment deliveries into snapshot +
//! tally + verdict + commit.

use chrono::{DateTime, FixedOffset};
use tracing::{debug, info, warn};

use crate::commands::{
    CMD_CAN_REVIEW, get_review_command, parse_comment_commands, parse_review_commands,
};
use crate::config::{BotConfig, Configuration};
use crate::error::{MultiError, Result};
use crate::labels::LABEL_CAN_REVIEW;
use crate::notification::{NotificationComment, is_notification_comment};
use crate::owners::{OwnersClient, RepoOwner, resolve_repo_owner};
use crate::platform::{
    BotComment, NoteEvent, PlatformClient, PrAction, PrComment, PrEvent, PrInfo,
    find_bot_comments, normalize_login, pr_code_update_time, reply_with_reference,
};
use crate::post_action::PostAction;
use crate::pull_request::PullRequest;
use crate::suggestion::suggest_reviewers;
use crate::tally::{ReviewStats, ReviewSummary};
use crate::verdict::derive_verdict;

pub struct Robot<'a> {
    pub client: &'a dyn PlatformClient,
    pub owners_client: &'a dyn OwnersClient,

    /// The bot's own platform login, resolved once at startup.
    pub bot_name: String,
}

impl Robot<'_> {
    pub fn handle_pr_event(&self, e: &PrEvent, config: &Configuration) -> Result<()> {
        let Some(cfg) = config.config_for(&e.pr.org, &e.pr.repo) else {
            debug!(org = %e.pr.org, repo = %e.pr.repo, "no config item for repo");
            return Ok(());
        };

        let can_review = cfg.ci.no_ci;

        match e.action {
            PrAction::Opened => {
                let mut errors = MultiError::new();

                if cfg.need_welcome
                    && let Err(err) = self.welcome(&e.pr, cfg, config)
                {
                    errors.add(format!("add welcome comment, err: {err}"));
                }
                if can_review
                    && let Err(err) = self.ready_to_review(&e.pr, cfg)
                {
                    errors.add_error(err);
                }

                errors.into_result()
            }
            PrAction::SourceBranchChanged => {
                let keep: &[&str] = if can_review { &[LABEL_CAN_REVIEW] } else { &[] };
                self.reset_to_review(&e.pr, cfg, keep)
            }
        }
    }

    pub fn handle_note_event(&self, e: &NoteEvent, config: &Configuration) -> Result<()> {
        if !e.pr.is_open() {
            return Ok(());
        }
        let Some(commenter) = e.commenter() else {
            return Ok(());
        };
        if e.comment.author.as_deref() == Some(self.bot_name.as_str()) {
            return Ok(());
        }
        let Some(cfg) = config.config_for(&e.pr.org, &e.pr.repo) else {
            debug!(org = %e.pr.org, repo = %e.pr.repo, "no config item for repo");
            return Ok(());
        };

        if !parse_review_commands(&e.comment.body).is_empty() {
            return self.handle_review_comment(e, cfg, config, &commenter);
        }

        if parse_comment_commands(&e.comment.body)
            .iter()
            .any(|c| c == CMD_CAN_REVIEW)
        {
            return self.handle_can_review(e, cfg, &commenter);
        }

        self.handle_ci_status_comment(e, cfg)
    }

    fn handle_review_comment(
        &self,
        e: &NoteEvent,
        cfg: &BotConfig,
        config: &Configuration,
        commenter: &str,
    ) -> Result<()> {
        let owner = self.repo_owner(&e.pr, cfg)?;
        let pr = self.snapshot(&e.pr, &e.assignees, owner.as_ref())?;

        let stats = ReviewStats {
            pr: &pr,
            cfg: &cfg.review,
            reviewers: owner.all_reviewers(),
        };

        let (cmd, invalid) =
            get_review_command(&e.comment.body, |c| stats.check_command(c, commenter));

        if let Some(bad) = invalid {
            let tip = format!(
                "You can't comment `/{}`. Please see the [*Command Usage*]({}) to get detail.",
                bad.to_lowercase(),
                config.commands_endpoint,
            );
            let body = reply_with_reference(commenter, &e.comment.body, &tip);
            if let Err(err) =
                self.client
                    .create_pr_comment(&e.pr.org, &e.pr.repo, e.pr.number, &body)
            {
                warn!(error = %err, "failed to reply to invalid command");
            }
        }

        if cmd.is_none() || !stats.is_reviewer(commenter) {
            info!(
                commenter,
                reviewers = stats.number_of_reviewers(),
                "skipping comment without an applicable command from a reviewer"
            );
            return Ok(());
        }

        let (comments, cutoff) = self.review_info(&e.pr)?;
        let summary = stats.stat_review(&comments, cutoff, &self.bot_name);
        let verdict = derive_verdict(
            &summary,
            |agreed, n| pr.are_all_files_approved(agreed, n),
            &cfg.review,
        );

        let is_starting_review =
            cfg.ci.no_ci || e.pr.has_label(&cfg.ci.label_for_ci_passed);

        PostAction {
            client: self.client,
            review_cfg: &cfg.review,
            pr: &pr,
            owner: owner.as_ref(),
            bot_name: &self.bot_name,
            is_starting_review,
        }
        .run(self.review_guides(&comments), cmd.as_deref(), &summary, &verdict)
    }

    /// `/can-review` by the PR author: gate on the CLA label and the
    /// basic-CI label, then open review.
    fn handle_can_review(&self, e: &NoteEvent, cfg: &BotConfig, commenter: &str) -> Result<()> {
        if commenter != e.pr.author_login() {
            return Ok(());
        }
        if e.pr.has_label(LABEL_CAN_REVIEW) {
            return Ok(());
        }

        let reply = |tip: &str| {
            let body = reply_with_reference(commenter, &e.comment.body, tip);
            self.client
                .create_pr_comment(&e.pr.org, &e.pr.repo, e.pr.number, &body)
        };

        if !e.pr.has_label(&cfg.cla_label) {
            return reply("Please, sign cla first");
        }

        if let Some(label) = &cfg.label_for_basic_ci_passed
            && !e.pr.has_label(label)
        {
            return reply("The basic CI should pass first");
        }

        self.ready_to_review(&e.pr, cfg)
    }

    /// An all-green CI summary enables review: start it when nobody has
    /// reviewed yet, otherwise re-drive the verdict with review open.
    fn handle_ci_status_comment(&self, e: &NoteEvent, cfg: &BotConfig) -> Result<()> {
        if cfg.ci.no_ci {
            return Ok(());
        }
        let Some(job) = &cfg.ci.job else {
            return Ok(());
        };
        if !job.is_ci_success(&e.comment.body, cfg.ci.number_of_test_cases)? {
            return Ok(());
        }

        let owner = self.repo_owner(&e.pr, cfg)?;
        let pr = self.snapshot(&e.pr, &e.assignees, owner.as_ref())?;
        let (comments, cutoff) = self.review_info(&e.pr)?;

        let stats = ReviewStats {
            pr: &pr,
            cfg: &cfg.review,
            reviewers: owner.all_reviewers(),
        };
        let summary = stats.stat_review(&comments, cutoff, &self.bot_name);

        if summary.is_empty() {
            return self.ready_to_review(&e.pr, cfg);
        }

        let verdict = derive_verdict(
            &summary,
            |agreed, n| pr.are_all_files_approved(agreed, n),
            &cfg.review,
        );

        PostAction {
            client: self.client,
            review_cfg: &cfg.review,
            pr: &pr,
            owner: owner.as_ref(),
            bot_name: &self.bot_name,
            is_starting_review: true,
        }
        .run(self.review_guides(&comments), None, &summary, &verdict)
    }

    /// Add the can-review label and post the start notification with
    /// suggested reviewers.
    pub fn ready_to_review(&self, pr: &PrInfo, cfg: &BotConfig) -> Result<()> {
        let mut errors = MultiError::new();

        if let Err(e) = self.add_can_review_label(pr) {
            errors.add_error(e);
        }
        if let Err(e) = self.add_review_notification(pr, cfg) {
            errors.add(format!("suggest reviewers, err: {e}"));
        }

        errors.into_result()
    }

    fn add_can_review_label(&self, pr: &PrInfo) -> Result<()> {
        if pr.has_label(LABEL_CAN_REVIEW) {
            return Ok(());
        }
        self.client
            .add_pr_label(&pr.org, &pr.repo, pr.number, LABEL_CAN_REVIEW)
    }

    fn add_review_notification(&self, pr: &PrInfo, cfg: &BotConfig) -> Result<()> {
        let owner = self.repo_owner(pr, cfg)?;

        let reviewers = suggest_reviewers(
            self.client,
            owner.as_ref(),
            pr,
            cfg.review.total_number_of_reviewers,
            cfg.review.endpoint_to_recommend_reviewer.as_deref(),
        )?;
        if reviewers.is_empty() {
            return Ok(());
        }

        let summary = ReviewSummary::default();
        let body =
            NotificationComment::new(&summary, "", &self.bot_name).start_review_comment(&reviewers);
        self.client
            .create_pr_comment(&pr.org, &pr.repo, pr.number, &body)
    }

    /// Source branch changed: reset labels, announce what was removed,
    /// drop stale notifications, and restart review when CI is disabled.
    fn reset_to_review(&self, pr: &PrInfo, cfg: &BotConfig, keep: &[&str]) -> Result<()> {
        let mut errors = MultiError::new();

        if let Err(e) = self.reset_labels(pr, keep) {
            errors.add(format!("remove label when source code changed, err: {e}"));
        }
        if let Err(e) = self.delete_review_notifications(pr) {
            errors.add(format!("delete tips, err: {e}"));
        }
        if cfg.ci.no_ci
            && let Err(e) = self.add_review_notification(pr, cfg)
        {
            errors.add_error(e);
        }

        errors.into_result()
    }

    fn reset_labels(&self, pr: &PrInfo, keep: &[&str]) -> Result<()> {
        let removed =
            crate::labels::update_labels_returning_removed(self.client, pr, keep)?;

        if !removed.is_empty() {
            let body = format!(
                "New changes are detected. Remove the following labels: {}.",
                removed.join(", "),
            );
            if let Err(e) = self
                .client
                .create_pr_comment(&pr.org, &pr.repo, pr.number, &body)
            {
                warn!(error = %e, "failed to announce removed labels");
            }
        }
        Ok(())
    }

    fn delete_review_notifications(&self, pr: &PrInfo) -> Result<()> {
        let comments = self
            .client
            .list_pr_comments(&pr.org, &pr.repo, pr.number)?;

        for c in self.review_guides(&comments) {
            if let Err(e) = self.client.delete_pr_comment(&pr.org, &pr.repo, c.id) {
                warn!(comment_id = c.id, error = %e, "failed to delete old notification");
            }
        }
        Ok(())
    }

    fn welcome(&self, pr: &PrInfo, cfg: &BotConfig, config: &Configuration) -> Result<()> {
        let maintainers = if cfg.maintainers.is_empty() {
            String::new()
        } else {
            format!(
                "\nThe maintainers of this repository are: {}.\n",
                cfg.maintainers
                    .iter()
                    .map(|m| format!("@{m}"))
                    .collect::<Vec<_>>()
                    .join(", "),
            )
        };

        let body = format!(
            "\nThank you for your pull-request.\n\n\
             The full list of commands accepted by me can be found at \
             [**here**]({}).\n{}\n{}\n",
            config.commands_endpoint, maintainers, config.doc,
        );

        self.client
            .create_pr_comment(&pr.org, &pr.repo, pr.number, &body)
    }

    fn repo_owner(&self, pr: &PrInfo, cfg: &BotConfig) -> Result<Box<dyn RepoOwner>> {
        resolve_repo_owner(
            self.owners_client,
            self.client,
            &pr.org,
            &pr.repo,
            &pr.target_branch,
            &cfg.owner,
        )
    }

    fn snapshot(
        &self,
        pr: &PrInfo,
        assignees: &[String],
        owner: &dyn RepoOwner,
    ) -> Result<PullRequest> {
        let files = self
            .client
            .list_pr_changed_files(&pr.org, &pr.repo, pr.number)?;
        let assignees = assignees.iter().map(|a| normalize_login(a)).collect();
        Ok(PullRequest::new(pr.clone(), files, assignees, owner))
    }

    fn review_info(&self, pr: &PrInfo) -> Result<(Vec<PrComment>, DateTime<FixedOffset>)> {
        let comments = self
            .client
            .list_pr_comments(&pr.org, &pr.repo, pr.number)?;
        let cutoff = pr_code_update_time(self.client, &pr.org, &pr.repo, &pr.head_sha)?;
        Ok((comments, cutoff))
    }

    fn review_guides(&self, comments: &[PrComment]) -> Vec<BotComment> {
        find_bot_comments(comments, &self.bot_name, is_notification_comment)
    }
}
