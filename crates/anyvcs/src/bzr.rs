//! Bazaar repository driver - wraps the `bzr` command-line client.

use chrono::DateTime;
use lazy_static::lazy_static;
use regex::Regex;

use crate::detect::detect_vcs_from_path;
use crate::error::{Result, VcsError};
use crate::repo::{run, run_in, CommitInfo, Repo, VcsType};

lazy_static! {
    /// Matches the parent branch line of `bzr info` output.
    static ref PARENT_BRANCH: Regex = Regex::new(r"parent branch: (?P<url>.+)\n").unwrap();
    static ref LOG_REVNO: Regex = Regex::new(r"(?m)^revno: (?P<rev>\d+)").unwrap();
    static ref LOG_COMMITTER: Regex = Regex::new(r"(?m)^committer: (?P<author>.+)$").unwrap();
    static ref LOG_TIMESTAMP: Regex = Regex::new(r"(?m)^timestamp: (?P<date>.+)$").unwrap();
}

/// Timestamp format of `bzr log` output.
const LOG_DATE: &str = "%a %Y-%m-%d %H:%M:%S %z";

/// A Bazaar checkout.
#[derive(Debug)]
pub struct BzrRepo {
    remote: String,
    local: String,
}

impl BzrRepo {
    /// Creates a handle for a Bazaar branch at `local` synchronized against
    /// `remote`.
    ///
    /// Unlike the other drivers this one never compares the caller's remote
    /// against the configured parent branch. Launchpad rewrites both the
    /// protocol and the path when branching (`https://launchpad.net/foo`
    /// becomes something like
    /// `http://bazaar.launchpad.net/~owner/foo/trunk/`), so a string
    /// comparison would reject valid checkouts. The parent branch is only
    /// read to fill in an empty remote.
    pub fn new(remote: &str, local: &str) -> Result<Self> {
        let existing = match detect_vcs_from_path(local) {
            Ok(VcsType::Bzr) => true,
            Ok(_) => return Err(VcsError::WrongVcs),
            Err(VcsError::CannotDetectVcs) => false,
            Err(e) => return Err(e),
        };

        let mut repo = BzrRepo {
            remote: remote.to_string(),
            local: local.to_string(),
        };

        if existing && repo.check_local() && repo.remote.is_empty() {
            let out = run_in(&repo.local, "bzr", &["info"])?;
            if let Some(parent) = PARENT_BRANCH
                .captures(&out)
                .and_then(|c| c.name("url"))
                .map(|m| m.as_str().trim())
            {
                if !parent.is_empty() {
                    repo.remote = parent.to_string();
                }
            }
        }

        Ok(repo)
    }

    /// Whether `r` names a revision known to the checkout.
    pub fn is_reference(&self, r: &str) -> bool {
        run_in(&self.local, "bzr", &["log", "-r", r]).is_ok()
    }

    /// Metadata for the revision named by `id`.
    pub fn commit_info(&self, id: &str) -> Result<CommitInfo> {
        let out = run_in(&self.local, "bzr", &["log", "-r", id, "--long"])
            .map_err(|_| VcsError::RevisionUnavailable)?;
        parse_commit_info(&out)
    }
}

impl Repo for BzrRepo {
    fn vcs(&self) -> VcsType {
        VcsType::Bzr
    }

    fn remote(&self) -> &str {
        &self.remote
    }

    fn local_path(&self) -> &str {
        &self.local
    }

    fn get(&self) -> Result<()> {
        run("bzr", &["branch", &self.remote, &self.local])?;
        Ok(())
    }

    fn update(&self) -> Result<()> {
        run_in(&self.local, "bzr", &["pull"])?;
        run_in(&self.local, "bzr", &["update"])?;
        Ok(())
    }

    fn update_version(&self, version: &str) -> Result<()> {
        run_in(&self.local, "bzr", &["update", "-r", version])?;
        Ok(())
    }

    fn version(&self) -> Result<String> {
        let out = run_in(&self.local, "bzr", &["revno", "--tree"])?;
        Ok(out.trim().to_string())
    }

    fn check_local(&self) -> bool {
        std::path::Path::new(&self.local).join(".bzr").exists()
    }
}

/// Parses one `bzr log --long` entry. The message body follows the
/// `message:` line, indented by two spaces.
fn parse_commit_info(out: &str) -> Result<CommitInfo> {
    let revno = LOG_REVNO
        .captures(out)
        .and_then(|c| c.name("rev"))
        .ok_or(VcsError::RevisionUnavailable)?;

    let author = LOG_COMMITTER
        .captures(out)
        .and_then(|c| c.name("author"))
        .map(|m| m.as_str().trim())
        .unwrap_or("");
    let date = LOG_TIMESTAMP
        .captures(out)
        .and_then(|c| c.name("date"))
        .map(|m| m.as_str().trim())
        .unwrap_or("");

    let message: Vec<&str> = out
        .lines()
        .skip_while(|l| l.trim_end() != "message:")
        .skip(1)
        .take_while(|l| l.starts_with("  ") || l.trim().is_empty())
        .map(|l| l.strip_prefix("  ").unwrap_or(l))
        .collect();

    Ok(CommitInfo {
        commit: revno.as_str().to_string(),
        author: author.to_string(),
        message: message.join("\n").trim().to_string(),
        date: DateTime::parse_from_str(date, LOG_DATE).ok(),
    })
}
