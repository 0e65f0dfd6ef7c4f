//! Picks reviewers and approvers to suggest in notification tips.

use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::ReviewConfig;
use crate::error::{Error, Result};
use crate::owners::RepoOwner;
use crate::platform::{PlatformClient, PrInfo};
use crate::pull_request::PullRequest;

const RECOMMEND_MAX_RETRIES: u32 = 3;
const RECOMMEND_BACKOFF_MS: u64 = 500;

/// A per-path pool of candidate reviewers. The owner view, the approver
/// hierarchy treated as reviewers, and the PR's approver index all
/// implement it.
trait ReviewerLookup {
    fn reviewers(&self, path: &str) -> HashSet<String>;
    fn leaf_reviewers(&self, path: &str) -> HashSet<String>;
}

struct OwnerReviewers<'a>(&'a dyn RepoOwner);

impl ReviewerLookup for OwnerReviewers<'_> {
    fn reviewers(&self, path: &str) -> HashSet<String> {
        self.0.reviewers(path)
    }

    fn leaf_reviewers(&self, path: &str) -> HashSet<String> {
        self.0.leaf_reviewers(path)
    }
}

/// Fallback pool once reviewers run dry: approvers double as reviewers.
struct ApproversAsReviewers<'a>(&'a dyn RepoOwner);

impl ReviewerLookup for ApproversAsReviewers<'_> {
    fn reviewers(&self, path: &str) -> HashSet<String> {
        self.0.approvers(path)
    }

    fn leaf_reviewers(&self, path: &str) -> HashSet<String> {
        self.0.leaf_approvers(path)
    }
}

/// Candidate approvers for the random top-up: the snapshot's approver
/// index narrowed by the owner's leaf scopes.
struct ApproverPool<'a> {
    pr: &'a PullRequest,
    owner: &'a dyn RepoOwner,
}

impl ReviewerLookup for ApproverPool<'_> {
    fn reviewers(&self, path: &str) -> HashSet<String> {
        self.pr.approvers_of_file(path)
    }

    fn leaf_reviewers(&self, path: &str) -> HashSet<String> {
        self.owner.leaf_approvers(path)
    }
}

/// Randomly move `n` entries to the tail, Fisher-Yates style, and return
/// them. The caller sorts for presentation.
fn random_pick(mut list: Vec<String>, n: usize) -> Vec<String> {
    list.sort();

    let len = list.len();
    if len <= n || n == 0 {
        return list;
    }

    let mut rng = rand::thread_rng();
    for i in 0..n {
        let j = rng.gen_range(0..len - i);
        let k = len - i - 1;
        list.swap(j, k);
    }
    list.split_off(len - n)
}

/// Up to `want` users from the leaf scopes of the changed files,
/// augmented from the non-leaf pool when leaves run dry.
fn pick_from_pool(
    pool: &dyn ReviewerLookup,
    files: &[String],
    want: usize,
    excluded: &HashSet<String>,
) -> Vec<String> {
    let mut leaf: HashSet<String> = HashSet::new();
    for file in files {
        leaf.extend(pool.leaf_reviewers(file));
    }
    leaf.retain(|r| !excluded.contains(r));

    let have = leaf.len();
    if have == want {
        let mut r: Vec<String> = leaf.into_iter().collect();
        r.sort();
        return r;
    }

    if have > want {
        let mut r = random_pick(leaf.into_iter().collect(), want);
        r.sort();
        return r;
    }

    let mut rest: HashSet<String> = HashSet::new();
    for file in files {
        rest.extend(pool.reviewers(file));
    }
    rest.retain(|r| !excluded.contains(r) && !leaf.contains(r));

    let need = want - have;
    let picked = if rest.len() <= need {
        rest.into_iter().collect()
    } else {
        random_pick(rest.into_iter().collect(), need)
    };

    let mut r: Vec<String> = leaf.into_iter().chain(picked).collect();
    r.sort();
    r
}

/// Up to `reviewer_count` reviewers for the PR's changed files, the PR
/// author excluded. When an external recommender endpoint is configured
/// its answer replaces the local pick verbatim.
pub fn suggest_reviewers(
    client: &dyn PlatformClient,
    owner: &dyn RepoOwner,
    pr: &PrInfo,
    reviewer_count: usize,
    endpoint: Option<&str>,
) -> Result<Vec<String>> {
    let changes = client.list_pr_changed_files(&pr.org, &pr.repo, pr.number)?;

    let mut excluded: HashSet<String> = [pr.author_login()].into_iter().collect();

    let mut reviewers = pick_from_pool(&OwnerReviewers(owner), &changes, reviewer_count, &excluded);

    if reviewers.len() < reviewer_count {
        excluded.extend(reviewers.iter().cloned());
        let approvers = pick_from_pool(
            &ApproversAsReviewers(owner),
            &changes,
            reviewer_count - reviewers.len(),
            &excluded,
        );
        info!(count = approvers.len(), "added approvers as reviewers");
        reviewers.extend(approvers);
        reviewers.sort();
    }

    if reviewers.len() < reviewer_count {
        warn!(
            found = reviewers.len(),
            want = reviewer_count,
            "not enough reviewers in owners files for the changed files"
        );
    }

    match endpoint {
        Some(endpoint) => recommend_reviewers(endpoint, &reviewers, pr),
        None => Ok(reviewers),
    }
}

#[derive(Debug, Deserialize)]
struct RecommendResponse {
    #[allow(dead_code)]
    msg: Option<String>,
    #[allow(dead_code)]
    code: Option<i32>,
    data: Option<Vec<String>>,
}

fn recommend_payload(pr: &PrInfo, reviewers: &[String]) -> serde_json::Value {
    serde_json::json!({
        "community": pr.org,
        "prUrl": pr.url,
        "prTitle": pr.title,
        "reviewers": reviewers,
    })
}

/// A missing or empty `data` field means "no suggestion".
fn parse_recommend_response(body: serde_json::Value) -> Result<Vec<String>> {
    let resp: RecommendResponse = serde_json::from_value(body)
        .map_err(|e| Error::Recommend(format!("bad response: {e}")))?;
    Ok(resp.data.unwrap_or_default())
}

fn recommend_reviewers(endpoint: &str, reviewers: &[String], pr: &PrInfo) -> Result<Vec<String>> {
    let payload = recommend_payload(pr, reviewers);

    let mut backoff_ms = RECOMMEND_BACKOFF_MS;
    for attempt in 1..=RECOMMEND_MAX_RETRIES {
        match ureq::post(endpoint)
            .set("Content-Type", "application/json")
            .set("Accept", "application/json")
            .set("User-Agent", "reviewbot")
            .send_json(&payload)
        {
            Ok(response) => {
                let body: serde_json::Value = response
                    .into_json()
                    .map_err(|e| Error::Recommend(format!("bad response body: {e}")))?;
                return parse_recommend_response(body);
            }
            Err(ref e) if attempt < RECOMMEND_MAX_RETRIES && is_retryable(e) => {
                warn!(attempt, error = %e, backoff_ms, "retrying reviewer recommendation");
                thread::sleep(Duration::from_millis(backoff_ms));
                backoff_ms *= 2;
            }
            Err(e) => {
                return Err(Error::Recommend(format!("request failed: {e}")));
            }
        }
    }
    unreachable!()
}

fn is_retryable(err: &ureq::Error) -> bool {
    match err {
        ureq::Error::Status(code, _) => *code == 429 || *code >= 500,
        ureq::Error::Transport(_) => true,
    }
}

/// Extends the agreed approvers until every changed file reaches the
/// per-file requirement and the overall threshold is met.
pub struct ApproverSuggester<'a> {
    pub pr: &'a PullRequest,
    pub cfg: &'a ReviewConfig,
    pub owner: &'a dyn RepoOwner,
}

impl ApproverSuggester<'_> {
    pub fn suggest(&self, current_approvers: &[String], assignees: &[String]) -> Vec<String> {
        let mut combined = current_approvers.to_vec();
        combined.extend(assignees.iter().cloned());

        let suggested = if self
            .pr
            .are_all_files_approved(&combined, self.cfg.number_of_approvers)
        {
            if assignees.is_empty() {
                Vec::new()
            } else {
                let current: HashSet<&str> =
                    current_approvers.iter().map(String::as_str).collect();
                assignees
                    .iter()
                    .filter(|a| self.pr.is_approver(a) && !current.contains(a.as_str()))
                    .cloned()
                    .collect()
            }
        } else {
            self.suggest_per_file(current_approvers, assignees)
        };

        self.top_up(current_approvers, suggested)
    }

    /// For each uncovered file, take the smallest set from its nearest
    /// owners scope that reaches the per-file requirement, assignees
    /// first.
    fn suggest_per_file(&self, current_approvers: &[String], assignees: &[String]) -> Vec<String> {
        let num = self.cfg.number_of_approvers;

        let mut excluded: HashSet<String> = current_approvers.iter().cloned().collect();
        if !self.cfg.allow_self_approve {
            excluded.insert(self.pr.pr_author());
        }
        let assignee_set: HashSet<&str> = assignees.iter().map(String::as_str).collect();

        let mut chosen: Vec<String> = Vec::new();
        for file in self.pr.unapproved_files(current_approvers, num) {
            let file_approvers = self.pr.approvers_of_file(&file);

            let have = current_approvers
                .iter()
                .chain(chosen.iter())
                .filter(|a| file_approvers.contains(a.as_str()))
                .count();
            if have >= num {
                continue;
            }

            let mut pool = self.owner.leaf_approvers(&file);
            if pool.is_empty() {
                pool = file_approvers.clone();
            }

            let mut candidates: Vec<String> = pool
                .into_iter()
                .filter(|c| !excluded.contains(c) && !chosen.contains(c))
                .collect();
            candidates.sort();
            // Assignees come first so picks stay biased toward them.
            candidates.sort_by_key(|c| !assignee_set.contains(c.as_str()));

            chosen.extend(candidates.into_iter().take(num - have));
        }

        debug!(count = chosen.len(), "suggested approvers per file");
        chosen
    }

    /// Random extra picks until the overall approver threshold is
    /// reachable with the suggestion applied.
    fn top_up(&self, current_approvers: &[String], suggested: Vec<String>) -> Vec<String> {
        let have = current_approvers.len() + suggested.len();
        let want = self.cfg.total_number_of_approvers;
        if have >= want {
            return suggested;
        }

        let mut excluded: HashSet<String> = current_approvers
            .iter()
            .chain(suggested.iter())
            .cloned()
            .collect();
        if !self.cfg.allow_self_approve {
            excluded.insert(self.pr.pr_author());
        }

        let pool = ApproverPool {
            pr: self.pr,
            owner: self.owner,
        };
        let mut extra = pick_from_pool(&pool, self.pr.files(), want - have, &excluded);
        extra.extend(suggested);
        extra
    }
}
