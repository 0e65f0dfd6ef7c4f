//! PR snapshot: changed files bound to their approver sets, with the
//! inverted index used for coverage counting.

use std::collections::{HashMap, HashSet};

use crate::owners::RepoOwner;
use crate::platform::PrInfo;

pub struct PullRequest {
    pub info: PrInfo,
    files: Vec<String>,
    pub assignees: Vec<String>,
    file_approvers: HashMap<String, HashSet<String>>,
    approver_files: HashMap<String, HashSet<String>>,
}

impl PullRequest {
    pub fn new(
        info: PrInfo,
        files: Vec<String>,
        assignees: Vec<String>,
        owner: &dyn RepoOwner,
    ) -> Self {
        let mut file_approvers: HashMap<String, HashSet<String>> = HashMap::new();
        for path in &files {
            file_approvers.insert(path.clone(), owner.approvers(path));
        }

        let mut approver_files: HashMap<String, HashSet<String>> = HashMap::new();
        for (path, approvers) in &file_approvers {
            for approver in approvers {
                approver_files
                    .entry(approver.clone())
                    .or_default()
                    .insert(path.clone());
            }
        }

        Self {
            info,
            files,
            assignees,
            file_approvers,
            approver_files,
        }
    }

    /// Whether the user covers at least one changed file.
    pub fn is_approver(&self, author: &str) -> bool {
        self.approver_files.contains_key(author)
    }

    /// The changed files the user may approve.
    pub fn files_approved_by(&self, author: &str) -> HashSet<String> {
        self.approver_files.get(author).cloned().unwrap_or_default()
    }

    pub fn approvers_of_file(&self, path: &str) -> HashSet<String> {
        self.file_approvers.get(path).cloned().unwrap_or_default()
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn number_of_files(&self) -> usize {
        self.files.len()
    }

    pub fn pr_author(&self) -> String {
        self.info.author_login()
    }

    /// Whether every changed file is covered by at least `num` distinct
    /// agreed approvers.
    pub fn are_all_files_approved(&self, agreed_approvers: &[String], num: usize) -> bool {
        if num == 1 {
            return self.are_all_files_reviewed(agreed_approvers);
        }

        let records = self.coverage_counts(agreed_approvers);
        if records.len() < self.number_of_files() {
            return false;
        }

        records.values().all(|&n| n >= num)
    }

    /// The changed files whose coverage count is below `num`. All files
    /// when nobody agreed.
    pub fn unapproved_files(&self, agreed_approvers: &[String], num: usize) -> Vec<String> {
        if agreed_approvers.is_empty() {
            return self.files.clone();
        }

        let records = self.coverage_counts(agreed_approvers);
        self.files
            .iter()
            .filter(|f| records.get(f.as_str()).copied().unwrap_or(0) < num)
            .cloned()
            .collect()
    }

    fn coverage_counts(&self, agreed_approvers: &[String]) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for approver in agreed_approvers {
            for file in self.files_approved_by(approver) {
                *counts.entry(file).or_insert(0) += 1;
            }
        }
        counts
    }

    fn are_all_files_reviewed(&self, approvers: &[String]) -> bool {
        let mut covered: HashSet<&str> = HashSet::new();
        for approver in approvers {
            if let Some(files) = self.approver_files.get(approver) {
                covered.extend(files.iter().map(String::as_str));
            }
        }
        covered.len() == self.number_of_files()
    }
}
