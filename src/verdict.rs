//! Derives the aggregate verdict from the review summary.

use crate::config::ReviewConfig;
use crate::tally::ReviewSummary;

/// The flags driving labels and the notification. `is_rejected`
/// dominates everything; `is_approved` and `is_lgtm` together mean the
/// review passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Verdict {
    pub is_rejected: bool,
    pub is_approved: bool,
    pub is_lgtm: bool,
    pub is_lbtm: bool,
    pub need_lgtm_num: usize,
}

/// `cover` is the snapshot's coverage predicate over agreed approvers.
///
/// Rejection by any approver short-circuits. Approval needs per-file
/// coverage plus the overall approver threshold, and once approved the
/// LGTM check runs regardless of LBTM votes. Without approval, LBTM wins
/// only when detractors strictly outnumber all assentors.
pub fn derive_verdict(
    summary: &ReviewSummary,
    cover: impl Fn(&[String], usize) -> bool,
    cfg: &ReviewConfig,
) -> Verdict {
    let mut v = Verdict::default();

    if !summary.disagreed_approvers.is_empty() {
        v.is_rejected = true;
        return v;
    }

    let approver_count = summary.agreed_approvers.len();

    if cover(&summary.agreed_approvers, cfg.number_of_approvers) {
        v.is_approved = approver_count >= cfg.total_number_of_approvers;
    }

    let assentors = summary.assentor_count();
    let check_lgtm = |v: &mut Verdict| {
        v.is_lgtm = assentors >= cfg.total_number_of_reviewers;
        if !v.is_lgtm {
            v.need_lgtm_num = cfg.total_number_of_reviewers - assentors;
        }
    };

    if v.is_approved {
        // LBTM is overruled once the approvers are satisfied.
        check_lgtm(&mut v);
        return v;
    }

    if assentors < summary.disagreed_reviewers.len() {
        v.is_lbtm = true;
    } else {
        check_lgtm(&mut v);
    }
    v
}
