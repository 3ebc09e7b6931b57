use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use chrono::DateTime;
use regex::Regex;

use crate::error::Result;
use crate::git::GitRunner;
use crate::models::{is_null_oid, Revision};

/// Date layout of `--pretty=medium`, e.g. `Thu Apr 7 15:13:13 2005 -0700`.
const MEDIUM_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %Y %z";
const ISO_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";
const UNKNOWN: &str = "unknown";

fn diff_tree_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^:(?P<src_mode>[0-9]{6}) (?P<dst_mode>[0-9]{6}) (?P<src_hash>[0-9a-f]{7,64}) (?P<dst_hash>[0-9a-f]{7,64}) (?P<status>[ADMTUX]|[CR][0-9]{1,3})\t(?P<file1>[^\t\n]+)(?:\t(?P<file2>[^\t\n]+))?$",
        )
        .expect("diff-tree pattern is valid")
    })
}

fn author_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^"?(.*?)"? <(.*)>$"#).expect("author pattern is valid"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Copied,
    Deleted,
    Modified,
    Renamed,
    TypeChanged,
    Unmerged,
    Unknown,
}

impl FileStatus {
    /// Maps a diff-tree status (`M`, `R086`, `C100`, ...) to its kind.
    pub fn from_code(code: &str) -> FileStatus {
        match code.chars().next() {
            Some('A') => FileStatus::Added,
            Some('C') => FileStatus::Copied,
            Some('D') => FileStatus::Deleted,
            Some('M') => FileStatus::Modified,
            Some('R') => FileStatus::Renamed,
            Some('T') => FileStatus::TypeChanged,
            Some('U') => FileStatus::Unmerged,
            _ => FileStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileChanges {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
}

/// Sorts `git diff-tree -r -C` output into added/removed/modified paths.
/// Unmerged and unknown entries are dropped.
pub fn classify_diff_tree(output: &str) -> FileChanges {
    let mut changes = FileChanges::default();

    for caps in diff_tree_re().captures_iter(output) {
        let file1 = caps["file1"].to_string();
        let file2 = caps.name("file2").map(|m| m.as_str().to_string());

        match FileStatus::from_code(&caps["status"]) {
            FileStatus::Added => changes.added.push(file1),
            FileStatus::Copied => changes.added.extend(file2),
            FileStatus::Deleted => changes.removed.push(file1),
            FileStatus::Modified | FileStatus::TypeChanged => changes.modified.push(file1),
            FileStatus::Renamed => {
                changes.removed.push(file1);
                changes.added.extend(file2);
            }
            FileStatus::Unmerged | FileStatus::Unknown => {
                log::debug!("ignoring diff-tree entry with status {}", &caps["status"]);
            }
        }
    }

    changes
}

/// One commit as printed by `git rev-list --pretty=medium`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitRecord {
    pub id: String,
    /// Header fields keyed by lower-cased name without the colon.
    pub headers: BTreeMap<String, String>,
    pub message: String,
}

/// Splits medium-format log output into commit records. Message lines are
/// always indented, so a `commit ` line at column 0 starts the next record.
pub fn split_commit_log(output: &str) -> Vec<CommitRecord> {
    let mut sections: Vec<Vec<&str>> = Vec::new();
    for line in output.lines() {
        if line.starts_with("commit ") || sections.is_empty() {
            sections.push(Vec::new());
        }
        if let Some(section) = sections.last_mut() {
            section.push(line);
        }
    }

    sections
        .into_iter()
        .filter(|lines| lines.first().map_or(false, |l| l.starts_with("commit ")))
        .map(|lines| parse_commit_record(&lines))
        .collect()
}

fn parse_commit_record(lines: &[&str]) -> CommitRecord {
    let id = lines
        .first()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or_default()
        .to_string();

    let mut headers = BTreeMap::new();
    let mut body = lines.len();
    for (idx, line) in lines.iter().enumerate().skip(1) {
        if line.trim().is_empty() {
            body = idx;
            break;
        }
        if let Some((key, value)) = line.split_once(' ') {
            headers.insert(
                key.trim_end_matches(':').to_lowercase(),
                value.trim().to_string(),
            );
        }
    }

    let message_lines: Vec<&str> = lines
        .get(body..)
        .unwrap_or_default()
        .iter()
        .map(|line| strip_message_indent(line))
        .collect();

    CommitRecord {
        id,
        headers,
        message: message_lines.join("\n").trim_matches('\n').to_string(),
    }
}

fn strip_message_indent(line: &str) -> &str {
    line.strip_prefix('\t')
        .or_else(|| line.strip_prefix("    "))
        .unwrap_or(line)
}

/// Reformats a medium-format date as ISO-8601 keeping its offset, and
/// returns the epoch seconds alongside.
pub fn normalize_date(raw: &str) -> Option<(String, i64)> {
    let compact = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let date = DateTime::parse_from_str(&compact, MEDIUM_DATE_FORMAT).ok()?;
    Some((date.format(ISO_DATE_FORMAT).to_string(), date.timestamp()))
}

/// Splits `Name <email>` (the name may be quoted). Anything else yields
/// `unknown` for both parts.
pub fn parse_author(raw: &str) -> (String, String) {
    match author_re().captures(raw.trim()) {
        Some(caps) => (caps[1].to_string(), caps[2].to_string()),
        None => (UNKNOWN.to_string(), UNKNOWN.to_string()),
    }
}

/// Directory-derived repository name. Hooks run inside the git directory:
/// for a bare repository that is the repository itself, otherwise it is the
/// `.git` folder of a working tree.
pub fn repo_name(cwd: &Path, bare: bool, strip_git_extension: bool) -> String {
    let dir = if bare { Some(cwd) } else { cwd.parent() };
    let name = dir
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    match name.strip_suffix(".git") {
        Some(stripped) if bare && strip_git_extension => stripped.to_string(),
        _ => name,
    }
}

pub struct GitCollector<'a> {
    git: &'a dyn GitRunner,
}

impl<'a> GitCollector<'a> {
    pub fn new(git: &'a dyn GitRunner) -> Self {
        GitCollector { git }
    }

    /// Commits in `old..new`, oldest first. A newly created ref (all-zero
    /// `old`) or a deleted one (all-zero `new`) announces nothing.
    pub fn list_revisions(&self, old: &str, new: &str) -> Result<Vec<Revision>> {
        if is_null_oid(old) {
            log::info!("ref creation at {}, no revisions listed", new);
            return Ok(Vec::new());
        }
        if is_null_oid(new) {
            log::info!("ref deletion from {}, no revisions listed", old);
            return Ok(Vec::new());
        }
        self.collect_range(&format!("{}..{}", old, new))
    }

    /// Only the pushed tip commit, via `new~1..new`.
    pub fn head_revision(&self, new: &str) -> Result<Option<Revision>> {
        let mut revisions = self.collect_range(&format!("{}~1..{}", new, new))?;
        Ok(if revisions.is_empty() {
            None
        } else {
            Some(revisions.swap_remove(0))
        })
    }

    /// Parent ids of a commit; empty for a root commit.
    pub fn parents(&self, id: &str) -> Result<Vec<String>> {
        let output = self.git.run(&["show", "--no-patch", "--format=%P", id])?;
        Ok(output.split_whitespace().map(str::to_string).collect())
    }

    fn collect_range(&self, range: &str) -> Result<Vec<Revision>> {
        let output = self
            .git
            .run(&["rev-list", "--pretty=medium", "--reverse", range])?;

        let records = split_commit_log(&output);
        log::debug!("{} commits in {}", records.len(), range);

        records
            .into_iter()
            .map(|record| self.build_revision(record))
            .collect()
    }

    fn build_revision(&self, record: CommitRecord) -> Result<Revision> {
        let diff = self
            .git
            .run(&["diff-tree", "-r", "-C", "--root", record.id.as_str()])?;
        let changes = classify_diff_tree(&diff);

        let mut fields = record.headers;
        let (name, email) = parse_author(&fields.remove("author").unwrap_or_default());
        let raw_date = fields.remove("date").unwrap_or_default();
        let (date, timestamp) = normalize_date(&raw_date).unwrap_or_else(|| {
            log::warn!("unparsable date '{}' on commit {}", raw_date, record.id);
            (raw_date.clone(), 0)
        });

        Ok(Revision {
            id: record.id,
            name,
            email,
            date,
            timestamp,
            message: record.message,
            added: changes.added,
            removed: changes.removed,
            modified: changes.modified,
            fields,
        })
    }
}
