//! The managed review labels and the minimal add/remove diff.

use crate::error::{MultiError, Result};
use crate::platform::{PlatformClient, PrInfo};

pub const LABEL_CAN_REVIEW: &str = "can-review";
pub const LABEL_LGTM: &str = "lgtm";
pub const LABEL_APPROVED: &str = "approved";
pub const LABEL_REQUEST_CHANGE: &str = "request-change";

pub const MANAGED_LABELS: [&str; 4] = [
    LABEL_CAN_REVIEW,
    LABEL_LGTM,
    LABEL_APPROVED,
    LABEL_REQUEST_CHANGE,
];

/// Make the PR's managed labels equal `keep`: one batch add of missing
/// keeps, one batch remove of present extras. Both directions are
/// attempted; their errors are reported jointly.
pub fn update_labels(client: &dyn PlatformClient, pr: &PrInfo, keep: &[&str]) -> Result<()> {
    update_labels_returning_removed(client, pr, keep).map(|_| ())
}

/// As `update_labels`, also reporting which labels were removed so the
/// source-branch-change path can announce them.
pub fn update_labels_returning_removed(
    client: &dyn PlatformClient,
    pr: &PrInfo,
    keep: &[&str],
) -> Result<Vec<String>> {
    let mut errors = MultiError::new();

    let to_add: Vec<String> = keep
        .iter()
        .filter(|&&l| !pr.has_label(l))
        .map(|l| l.to_string())
        .collect();
    if !to_add.is_empty()
        && let Err(e) = client.add_pr_labels(&pr.org, &pr.repo, pr.number, &to_add)
    {
        errors.add_error(e);
    }

    let to_remove: Vec<String> = MANAGED_LABELS
        .iter()
        .filter(|&&l| !keep.contains(&l) && pr.has_label(l))
        .map(|l| l.to_string())
        .collect();
    if !to_remove.is_empty()
        && let Err(e) = client.remove_pr_labels(&pr.org, &pr.repo, pr.number, &to_remove)
    {
        errors.add_error(e);
    }

    errors.into_result().map(|_| to_remove)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::platform::PrComment;
    use std::cell::RefCell;
    use std::collections::HashSet;

    #[derive(Default)]
    struct MockClient {
        added: RefCell<Vec<Vec<String>>>,
        removed: RefCell<Vec<Vec<String>>>,
        fail_add: bool,
        fail_remove: bool,
    }

    impl PlatformClient for MockClient {
        fn add_pr_label(&self, _: &str, _: &str, _: u64, label: &str) -> Result<()> {
            self.added.borrow_mut().push(vec![label.to_string()]);
            Ok(())
        }

        fn add_pr_labels(&self, _: &str, _: &str, _: u64, labels: &[String]) -> Result<()> {
            if self.fail_add {
                return Err(Error::Platform("add failed".to_string()));
            }
            self.added.borrow_mut().push(labels.to_vec());
            Ok(())
        }

        fn remove_pr_labels(&self, _: &str, _: &str, _: u64, labels: &[String]) -> Result<()> {
            if self.fail_remove {
                return Err(Error::Platform("remove failed".to_string()));
            }
            self.removed.borrow_mut().push(labels.to_vec());
            Ok(())
        }

        fn list_pr_comments(&self, _: &str, _: &str, _: u64) -> Result<Vec<PrComment>> {
            Ok(vec![])
        }

        fn create_pr_comment(&self, _: &str, _: &str, _: u64, _: &str) -> Result<()> {
            Ok(())
        }

        fn delete_pr_comment(&self, _: &str, _: &str, _: i64) -> Result<()> {
            Ok(())
        }

        fn get_commit_time(&self, _: &str, _: &str, _: &str) -> Result<String> {
            Ok("2024-05-01T00:00:00Z".to_string())
        }

        fn list_pr_changed_files(&self, _: &str, _: &str, _: u64) -> Result<Vec<String>> {
            Ok(vec![])
        }

        fn list_collaborators(&self, _: &str, _: &str) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    fn pr_with_labels(labels: &[&str]) -> PrInfo {
        PrInfo {
            org: "o".to_string(),
            repo: "r".to_string(),
            number: 1,
            target_branch: "master".to_string(),
            head_sha: "abc".to_string(),
            author: "alice".to_string(),
            title: "t".to_string(),
            url: "u".to_string(),
            state: "open".to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[test]
    fn test_adds_only_missing_labels() {
        let client = MockClient::default();
        let pr = pr_with_labels(&[LABEL_CAN_REVIEW]);

        update_labels(&client, &pr, &[LABEL_CAN_REVIEW, LABEL_LGTM]).unwrap();

        let added = client.added.borrow();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0], vec![LABEL_LGTM.to_string()]);
        assert!(client.removed.borrow().is_empty());
    }

    #[test]
    fn test_removes_managed_extras_only() {
        let client = MockClient::default();
        let pr = pr_with_labels(&[LABEL_LGTM, LABEL_REQUEST_CHANGE, "kind/bug"]);

        let removed = update_labels_returning_removed(&client, &pr, &[LABEL_LGTM]).unwrap();

        let removed_set: HashSet<String> = removed.into_iter().collect();
        assert!(removed_set.contains(LABEL_REQUEST_CHANGE));
        assert!(!removed_set.contains("kind/bug"));
        assert!(!removed_set.contains(LABEL_LGTM));
    }

    #[test]
    fn test_empty_keep_strips_all_managed() {
        let client = MockClient::default();
        let pr = pr_with_labels(&[LABEL_CAN_REVIEW, LABEL_APPROVED, "kind/bug"]);

        let removed = update_labels_returning_removed(&client, &pr, &[]).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(client.added.borrow().is_empty());
    }

    #[test]
    fn test_noop_makes_no_calls() {
        let client = MockClient::default();
        let pr = pr_with_labels(&[LABEL_LGTM]);

        update_labels(&client, &pr, &[LABEL_LGTM]).unwrap();
        assert!(client.added.borrow().is_empty());
        assert!(client.removed.borrow().is_empty());
    }

    #[test]
    fn test_both_directions_attempted_on_failure() {
        let client = MockClient {
            fail_add: true,
            ..Default::default()
        };
        let pr = pr_with_labels(&[LABEL_REQUEST_CHANGE]);

        let err = update_labels(&client, &pr, &[LABEL_LGTM]).unwrap_err();
        assert!(err.to_string().contains("add failed"));
        // The remove still went through.
        assert_eq!(client.removed.borrow().len(), 1);
    }

    #[test]
    fn test_joint_error_reports_both_directions() {
        let client = MockClient {
            fail_add: true,
            fail_remove: true,
            ..Default::default()
        };
        let pr = pr_with_labels(&[LABEL_REQUEST_CHANGE]);

        let err = update_labels(&client, &pr, &[LABEL_LGTM]).unwrap_err();
        let s = err.to_string();
        assert!(s.contains("add failed"));
        assert!(s.contains("remove failed"));
    }
}
