//! Composes the single review-guide comment the bot keeps on each PR.
//!
//! The body has two halves joined by the tips separator: a status
//! sentence keyed by the verdict, and optional suggestion tips. When no
//! fresh suggestion was computed, the tips of the previous notification
//! are spliced forward so guidance survives verdict changes.

use crate::tally::ReviewSummary;

pub const NOTIFICATION_TITLE: &str = "### Review Guide\n\nThis Pull-Request";

// Recognised on read for PRs annotated by old bot versions, never written.
const NOTIFICATION_TITLE_OLD: &str = "### ~~~ Approval ~~~ Notifier ~~~\nThis Pull-Request";
const TIPS_SEPARATOR_OLD: &str = "\n\n---\n\n";

const TIPS_SEPARATOR: &str = "\n#### Tips:\n";
const LINE_SEPARATOR: &str = "\n";
const LGTM_TIPS_MARKER: &str = "In order to add **lgtm** label";
const APPROVE_TIPS_MARKER: &str = "In order to add **approved** label";
const LGTM_TIPS_KEY: &str = "reviewers to comment /lgtm.";
const USER_LIST_SEPARATOR: &str = ", ";

const STATUS_START: &str = "gets ready to be reviewed";
const STATUS_IN_PROGRESS: &str = "is being reviewed";
const STATUS_REJECTED: &str = "is **Rejected**";
const STATUS_REQUEST_CHANGE: &str = "is **Requested Change**";
const STATUS_LGTM: &str = "is added **lgtm** label";
const STATUS_APPROVED: &str = "is added **approved** label";
const STATUS_PASS_REVIEW: &str = "**Passes Review**";

pub fn is_notification_comment(body: &str) -> bool {
    body.starts_with(NOTIFICATION_TITLE) || body.starts_with(NOTIFICATION_TITLE_OLD)
}

pub fn contains_suggested_reviewer(body: &str) -> bool {
    body.contains(LGTM_TIPS_MARKER)
}

pub fn contains_suggested_approver(body: &str) -> bool {
    body.contains(APPROVE_TIPS_MARKER)
}

fn user_link(login: &str) -> String {
    format!("[*{login}*](https://gitee.com/{login})")
}

fn to_user_list(logins: &[String]) -> String {
    logins
        .iter()
        .map(|l| user_link(l))
        .collect::<Vec<_>>()
        .join(USER_LIST_SEPARATOR)
}

pub struct NotificationComment<'a> {
    summary: &'a ReviewSummary,
    old_tips: &'a str,
    bot_name: &'a str,
}

impl<'a> NotificationComment<'a> {
    pub fn new(summary: &'a ReviewSummary, old_tips: &'a str, bot_name: &'a str) -> Self {
        Self {
            summary,
            old_tips,
            bot_name,
        }
    }

    pub fn start_review_comment(&self, reviewers: &[String]) -> String {
        let tips = self.gen_lgtm_tips(reviewers.len(), reviewers);
        format!("{NOTIFICATION_TITLE} {STATUS_START}.{tips}")
    }

    pub fn reviewing_comment(&self, need_lgtm_num: usize, reviewers: &[String]) -> String {
        let mut tips = String::new();
        if !self.summary.disagreed_reviewers.is_empty() {
            tips = format!(
                "{LINE_SEPARATOR}Reviewers who wrote a comment of `/lbtm` are: {}. \
                 Please make changes if it needs.",
                to_user_list(&self.summary.disagreed_reviewers)
            );
        }

        let info = self.review_info();
        if !info.is_empty() {
            tips.push_str(LINE_SEPARATOR);
            tips.push_str(&info);
        }

        let part2 = self.gen_lgtm_tips(need_lgtm_num, reviewers);
        format!("{NOTIFICATION_TITLE} {STATUS_IN_PROGRESS}.{tips}{part2}")
    }

    pub fn reject_comment(&self) -> String {
        format!(
            "{NOTIFICATION_TITLE} {STATUS_REJECTED}.{LINE_SEPARATOR}It is rejected by: {}. \
             Please see the comments left by them and do more changes.",
            to_user_list(&self.summary.disagreed_approvers)
        )
    }

    pub fn request_change_comment(&self) -> String {
        format!(
            "{NOTIFICATION_TITLE} {STATUS_REQUEST_CHANGE}.{LINE_SEPARATOR}It is requested \
             change by: {}. Please see the comments left by them and do more changes.",
            to_user_list(&self.summary.disagreed_reviewers)
        )
    }

    pub fn pass_review_comment(&self) -> String {
        let info = self.prefixed_review_info();
        format!("{NOTIFICATION_TITLE} {STATUS_PASS_REVIEW}.{info}")
    }

    pub fn approved_comment(&self, need_lgtm_num: usize, reviewers: &[String]) -> String {
        let info = self.prefixed_review_info();
        let tips = self.gen_lgtm_tips(need_lgtm_num, reviewers);
        format!(
            "{NOTIFICATION_TITLE} {STATUS_APPROVED}. In order to pass review, it still \
             needs **lgtm** label.{info}{tips}"
        )
    }

    pub fn lgtm_comment(
        &self,
        suggested_approvers: &[String],
        unapproved_files: &[String],
    ) -> String {
        let info = self.prefixed_review_info();
        let tips = self.approve_tips_half(suggested_approvers, unapproved_files);
        format!(
            "{NOTIFICATION_TITLE} {STATUS_LGTM}. In order to pass review, it still needs \
             **approved** label.{info}{tips}"
        )
    }

    /// Who has agreed so far, one line per command kind.
    fn review_info(&self) -> String {
        let mut lines = Vec::new();
        if !self.summary.agreed_approvers.is_empty() {
            lines.push(format!(
                "Approvers who wrote a comment of `/approve` are: {}.",
                to_user_list(&self.summary.agreed_approvers)
            ));
        }
        if !self.summary.agreed_reviewers.is_empty() {
            lines.push(format!(
                "Reviewers who wrote a comment of `/lgtm` are: {}.",
                to_user_list(&self.summary.agreed_reviewers)
            ));
        }
        lines.join(LINE_SEPARATOR)
    }

    fn prefixed_review_info(&self) -> String {
        let info = self.review_info();
        if info.is_empty() {
            info
        } else {
            format!("{LINE_SEPARATOR}{info}")
        }
    }

    /// Reviewer tips: a fresh suggestion when available, otherwise the
    /// surviving tail of the previous notification's reviewer tips.
    fn gen_lgtm_tips(&self, need_lgtm_num: usize, suggested_reviewers: &[String]) -> String {
        let lead = format!(
            "{LGTM_TIPS_MARKER}, it still needs **{need_lgtm_num}** {LGTM_TIPS_KEY}"
        );

        if !suggested_reviewers.is_empty() {
            let ask = format!(
                "{LINE_SEPARATOR}I suggest these reviewers( {} ) to review your codes.\
                 {LINE_SEPARATOR}You can ask them to review by writing a comment like this \
                 `@{bot}, Could you take a look at this PR, thanks!`. Please, replace `{bot}` \
                 with the correct reviewer's name.",
                to_user_list(suggested_reviewers),
                bot = self.bot_name,
            );
            return self.as_tips_half(&format!("{lead}{ask}"));
        }

        if !contains_suggested_reviewer(self.old_tips) || !self.old_tips.contains(LGTM_TIPS_KEY) {
            return String::new();
        }

        match self.old_tips.split_once(LGTM_TIPS_KEY) {
            Some((_, tail)) if !tail.is_empty() => self.as_tips_half(&format!("{lead}{tail}")),
            _ => String::new(),
        }
    }

    fn gen_approve_tips(&self, approvers: &[String], unapproved_files: &[String]) -> String {
        let files = if unapproved_files.is_empty() {
            String::new()
        } else {
            let mut sorted = unapproved_files.to_vec();
            sorted.sort();
            format!(
                "{LINE_SEPARATOR}The unapproved files are as below.{LINE_SEPARATOR}- {}\n",
                sorted.join("\n- ")
            )
        };

        format!(
            "{APPROVE_TIPS_MARKER}, it still needs approvers to comment /approve.{files}\
             {LINE_SEPARATOR}I suggest these approvers( {} ) to approve your PR.\
             {LINE_SEPARATOR}You can assign the PR to them by writing a comment like this \
             `/assign @{bot}`. Please, replace `{bot}` with the correct approver's name.",
            to_user_list(approvers),
            bot = self.bot_name,
        )
    }

    /// Approver tips: a fresh suggestion when available, otherwise the
    /// previous notification's tips half, whichever separator form it
    /// used.
    fn approve_tips_half(
        &self,
        suggested_approvers: &[String],
        unapproved_files: &[String],
    ) -> String {
        if !suggested_approvers.is_empty() {
            return self
                .as_tips_half(&self.gen_approve_tips(suggested_approvers, unapproved_files));
        }

        if !contains_suggested_approver(self.old_tips) {
            return String::new();
        }

        let parts: Vec<&str> = self.old_tips.split(TIPS_SEPARATOR).collect();
        if parts.len() == 2 {
            return self.as_tips_half(parts[1]);
        }

        let parts: Vec<&str> = self.old_tips.split(TIPS_SEPARATOR_OLD).collect();
        if parts.len() == 2 {
            return self.as_tips_half(parts[1]);
        }

        String::new()
    }

    fn as_tips_half(&self, content: &str) -> String {
        if content.is_empty() {
            String::new()
        } else {
            format!("{TIPS_SEPARATOR}{content}")
        }
    }
}
