//! Slash-command extraction from comment bodies.

use regex::Regex;

pub const CMD_LGTM: &str = "LGTM";
pub const CMD_LBTM: &str = "LBTM";
pub const CMD_APPROVE: &str = "APPROVE";
pub const CMD_REJECT: &str = "REJECT";
pub const CMD_CAN_REVIEW: &str = "CAN-REVIEW";

fn is_review_command(cmd: &str) -> bool {
    matches!(cmd, CMD_LGTM | CMD_LBTM | CMD_APPROVE | CMD_REJECT)
}

fn is_negative_command(cmd: &str) -> bool {
    matches!(cmd, CMD_REJECT | CMD_LBTM)
}

/// All `/cmd` tokens in the body, uppercased, in order of appearance.
/// A command must start its own line.
pub fn parse_comment_commands(body: &str) -> Vec<String> {
    let re = Regex::new(r"(?m)^/(\S+)[\t ]*").unwrap();
    re.captures_iter(body)
        .map(|c| c[1].to_uppercase())
        .collect()
}

/// The subset of tokens that are review commands.
pub fn parse_review_commands(body: &str) -> Vec<String> {
    parse_comment_commands(body)
        .into_iter()
        .filter(|c| is_review_command(c))
        .collect()
}

/// Whether `cmd` may take effect for this commenter on this PR.
///
/// REJECT needs an approver other than the PR author; LGTM anyone but the
/// author; APPROVE an approver, with self-approval gated by config; LBTM
/// is always applicable.
pub fn can_apply_command(
    cmd: &str,
    is_pr_author: bool,
    is_approver: bool,
    allow_self_approve: bool,
) -> bool {
    match cmd {
        CMD_REJECT => is_approver && !is_pr_author,
        CMD_LGTM => !is_pr_author,
        CMD_APPROVE => is_approver && (allow_self_approve || !is_pr_author),
        _ => true,
    }
}

/// Pick the effective command out of one comment's review tokens.
///
/// Among the applicable tokens, a present negative means the last
/// applicable token wins; without negatives an APPROVE wins over trailing
/// LGTMs; otherwise the last applicable token. The first inapplicable
/// token is reported so the caller can reply with usage help.
pub fn check_review_commands(
    cmds: &[String],
    is_applicable: impl Fn(&str) -> bool,
) -> (Option<String>, Option<String>) {
    let mut valid: Option<String> = None;
    let mut invalid: Option<String> = None;
    let mut saw_negative = false;
    let mut saw_approve = false;

    for cmd in cmds {
        if !is_applicable(cmd) {
            if invalid.is_none() {
                invalid = Some(cmd.clone());
            }
            continue;
        }

        valid = Some(cmd.clone());

        if is_negative_command(cmd) {
            saw_negative = true;
        }
        if cmd == CMD_APPROVE {
            saw_approve = true;
        }
    }

    if !saw_negative && saw_approve {
        valid = Some(CMD_APPROVE.to_string());
    }

    (valid, invalid)
}

/// Parse the body's review tokens and pick the effective command.
pub fn get_review_command(
    body: &str,
    is_applicable: impl Fn(&str) -> bool,
) -> (Option<String>, Option<String>) {
    let cmds = parse_review_commands(body);
    if cmds.is_empty() {
        return (None, None);
    }
    check_review_commands(&cmds, is_applicable)
}
