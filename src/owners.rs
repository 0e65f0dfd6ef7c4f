//! Per-path ownership views and the owners-cache boundary.

use std::collections::HashSet;

use crate::config::OwnerConfig;
use crate::error::Result;
use crate::platform::{PlatformClient, normalize_login};

/// Ownership answers for one `(org, repo, branch)`. "Leaf" is the nearest
/// owners scope to the path; the non-leaf variants include ancestors.
pub trait RepoOwner {
    fn approvers(&self, path: &str) -> HashSet<String>;
    fn leaf_approvers(&self, path: &str) -> HashSet<String>;
    fn reviewers(&self, path: &str) -> HashSet<String>;
    fn leaf_reviewers(&self, path: &str) -> HashSet<String>;
    fn all_reviewers(&self) -> HashSet<String>;
}

/// The owners-cache RPC boundary; the concrete gRPC client lives outside
/// this crate.
pub trait OwnersClient {
    fn owners(&self, org: &str, repo: &str, branch: &str) -> Result<Box<dyn RepoOwner>>;
}

/// Owner view for a branch without owners files: every collaborator is an
/// approver and a reviewer for every path, and leaf equals non-leaf.
pub struct CollaboratorOwners {
    members: HashSet<String>,
}

impl CollaboratorOwners {
    pub fn new(members: impl IntoIterator<Item = String>) -> Self {
        Self {
            members: members.into_iter().map(|m| normalize_login(&m)).collect(),
        }
    }
}

impl RepoOwner for CollaboratorOwners {
    fn approvers(&self, _path: &str) -> HashSet<String> {
        self.members.clone()
    }

    fn leaf_approvers(&self, _path: &str) -> HashSet<String> {
        self.members.clone()
    }

    fn reviewers(&self, _path: &str) -> HashSet<String> {
        self.members.clone()
    }

    fn leaf_reviewers(&self, _path: &str) -> HashSet<String> {
        self.members.clone()
    }

    fn all_reviewers(&self) -> HashSet<String> {
        self.members.clone()
    }
}

/// Owner view for the target branch: collaborators when the branch has no
/// owners files, the structured cache view otherwise.
pub fn resolve_repo_owner(
    owners_client: &dyn OwnersClient,
    platform: &dyn PlatformClient,
    org: &str,
    repo: &str,
    branch: &str,
    cfg: &OwnerConfig,
) -> Result<Box<dyn RepoOwner>> {
    if cfg.is_branch_without_owners(branch) {
        let members = platform.list_collaborators(org, repo)?;
        return Ok(Box::new(CollaboratorOwners::new(members)));
    }

    owners_client.owners(org, repo, branch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborator_owners_uniform_view() {
        let o = CollaboratorOwners::new(vec!["@Alice".to_string(), "bob".to_string()]);

        let expected: HashSet<String> =
            ["alice".to_string(), "bob".to_string()].into_iter().collect();

        assert_eq!(o.approvers("src/lib.rs"), expected);
        assert_eq!(o.leaf_approvers("README.md"), expected);
        assert_eq!(o.reviewers("any/path"), expected);
        assert_eq!(o.leaf_reviewers("any/path"), expected);
        assert_eq!(o.all_reviewers(), expected);
    }
}
