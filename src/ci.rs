//! Parser for CI summary comments rendered as a Markdown table.

use serde::Deserialize;

use crate::error::{Error, Result};

const CELL_SEPARATOR: &str = "|";
const ROW_SEPARATOR: &str = "\n";

fn column_count(row: &str) -> usize {
    row.matches(CELL_SEPARATOR).count().saturating_sub(1)
}

fn parse_error(msg: &str) -> Error {
    Error::CiParse(msg.to_string())
}

/// Describes the table a CI system posts, e.g.
///
/// ```text
/// | job name | result  | detail |
/// | ---      | ---     | ---    |
/// | test     | success | link   |
/// ```
///
/// `title` is the full header row; `result_column_num` the 1-based column
/// holding the job result.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CiTable {
    pub title: String,
    pub result_column_num: usize,

    #[serde(skip)]
    total_columns: usize,
}

impl CiTable {
    pub fn new(title: impl Into<String>, result_column_num: usize) -> Self {
        Self {
            title: title.into(),
            result_column_num,
            total_columns: 0,
        }
    }

    pub fn validate(&mut self) -> Result<()> {
        let n = column_count(&self.title);
        if n == 0 {
            return Err(Error::ConfigValidation(
                "title is not the one of CI table".to_string(),
            ));
        }
        if self.result_column_num > n {
            return Err(Error::ConfigValidation(format!(
                "result_column_num must be <= {n}"
            )));
        }
        if self.result_column_num == 0 {
            return Err(Error::ConfigValidation(
                "result_column_num must be bigger than 0".to_string(),
            ));
        }

        self.total_columns = n;
        Ok(())
    }

    /// The title row, followed by a newline, occurs exactly once.
    pub fn is_ci_comment(&self, body: &str) -> bool {
        let needle = format!("{}{ROW_SEPARATOR}", self.title);
        body.matches(&needle).count() == 1
    }

    /// The job rows of the table, separator row discarded. Trailing lines
    /// after the last well-formed row are truncated.
    pub fn job_rows<'a>(&self, body: &'a str) -> Result<Vec<&'a str>> {
        let needle = format!("{}{ROW_SEPARATOR}", self.title);
        let parts: Vec<&str> = body.split(&needle).collect();
        if parts.len() != 2 {
            return Err(parse_error("invalid CI comment"));
        }

        let rows: Vec<&str> = parts[1].split(ROW_SEPARATOR).collect();
        if rows.len() < 2 {
            return Err(parse_error("invalid table"));
        }

        // rows[0] is the | --- | --- | separator.
        for i in (1..rows.len()).rev() {
            if self.result_cell(rows[i]).is_ok() {
                return Ok(rows[1..=i].to_vec());
            }
        }

        Err(parse_error("empty table"))
    }

    fn result_cell<'a>(&self, row: &'a str) -> Result<&'a str> {
        if column_count(row) != self.total_columns {
            return Err(parse_error("invalid job comment"));
        }

        row.split(CELL_SEPARATOR)
            .nth(self.result_column_num)
            .ok_or_else(|| parse_error("invalid job comment"))
    }
}

/// Maps result-cell descriptions onto a status name with a priority used
/// when inferring the overall table status.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct JobStatus {
    pub desc: Vec<String>,
    pub status: String,
    pub priority: i32,
}

impl JobStatus {
    fn matches(&self, desc: &str) -> bool {
        self.desc.iter().any(|d| desc.contains(d.as_str()))
    }
}

#[derive(Debug, Clone)]
pub struct CiParser {
    pub table: CiTable,
    pub statuses: Vec<JobStatus>,
}

impl CiParser {
    /// The status of a single job row. Descriptions are matched in the
    /// configured order; the first hit wins.
    pub fn parse_job_status(&self, row: &str) -> Result<String> {
        let cell = self.table.result_cell(row)?;

        self.statuses
            .iter()
            .find(|s| s.matches(cell))
            .map(|s| s.status.clone())
            .ok_or_else(|| parse_error("unknown job description"))
    }

    /// All recognisable job statuses in the comment. Rows whose result
    /// cell matches no descriptor are dropped silently.
    pub fn parse_statuses(&self, body: &str) -> Result<Vec<String>> {
        let rows = self.table.job_rows(body)?;

        Ok(rows
            .iter()
            .filter_map(|row| self.parse_job_status(row).ok())
            .collect())
    }

    /// The present status of highest configured priority.
    pub fn infer_final_status(&self, statuses: &[String]) -> Option<String> {
        let mut best: Option<&JobStatus> = None;
        for s in &self.statuses {
            if !statuses.iter().any(|item| item == &s.status) {
                continue;
            }
            if best.is_none_or(|b| s.priority > b.priority) {
                best = Some(s);
            }
        }
        best.map(|s| s.status.clone())
    }
}
