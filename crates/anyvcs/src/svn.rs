//! Subversion repository driver - wraps the `svn` command-line client.

use chrono::DateTime;
use lazy_static::lazy_static;
use regex::Regex;

use crate::detect::detect_vcs_from_path;
use crate::error::{Result, VcsError};
use crate::repo::{run, run_in, CommitInfo, Repo, VcsType};

lazy_static! {
    /// Matches the URL line of `svn info` output.
    static ref INFO_URL: Regex = Regex::new(r"URL: (?P<url>.+)\n").unwrap();
    /// Header line of a `svn log` entry: revision, author, date.
    static ref LOG_HEADER: Regex =
        Regex::new(r"(?m)^r(?P<rev>\d+) \| (?P<author>[^|]*) \| (?P<date>[^|(]+)").unwrap();
}

/// A Subversion checkout.
///
/// Subversion is centralized, so the remote should name the branch to work
/// against; for a repository laid out the usual way that means ending the
/// URL in `/trunk`, `/branches/<name>`, or `/tags/<name>`.
#[derive(Debug)]
pub struct SvnRepo {
    remote: String,
    local: String,
}

impl SvnRepo {
    /// Creates a handle for a Subversion checkout at `local` synchronized
    /// against `remote`.
    ///
    /// Cross-validation against an existing checkout is scheme-tolerant:
    /// Subversion servers may transparently rewrite the protocol (an
    /// `http://` checkout URL answering for an `https://` remote), so two
    /// remotes that differ only in scheme are treated as the same endpoint.
    /// See [`same_remote`].
    pub fn new(remote: &str, local: &str) -> Result<Self> {
        let existing = match detect_vcs_from_path(local) {
            Ok(VcsType::Svn) => true,
            Ok(_) => return Err(VcsError::WrongVcs),
            Err(VcsError::CannotDetectVcs) => false,
            Err(e) => return Err(e),
        };

        let mut repo = SvnRepo {
            remote: remote.to_string(),
            local: local.to_string(),
        };

        if existing && repo.check_local() {
            let out = run("svn", &["info", &repo.local])?;
            let configured = INFO_URL
                .captures(&out)
                .and_then(|c| c.name("url"))
                .map(|m| m.as_str().trim())
                .unwrap_or("");

            if !configured.is_empty()
                && !repo.remote.is_empty()
                && !same_remote(configured, &repo.remote)
            {
                return Err(VcsError::WrongRemote);
            }
            if repo.remote.is_empty() && !configured.is_empty() {
                repo.remote = configured.to_string();
            }
        }

        Ok(repo)
    }

    /// Whether `r` names a revision known to the repository. The probe asks
    /// the server, so this goes out to the network for remote repositories.
    pub fn is_reference(&self, r: &str) -> bool {
        run_in(&self.local, "svn", &["info", "-r", r]).is_ok()
    }

    /// Metadata for the revision named by `id`.
    pub fn commit_info(&self, id: &str) -> Result<CommitInfo> {
        let out = run_in(&self.local, "svn", &["log", "-r", id])
            .map_err(|_| VcsError::RevisionUnavailable)?;
        parse_commit_info(&out)
    }
}

impl Repo for SvnRepo {
    fn vcs(&self) -> VcsType {
        VcsType::Svn
    }

    fn remote(&self) -> &str {
        &self.remote
    }

    fn local_path(&self) -> &str {
        &self.local
    }

    /// A checkout rather than a clone; Subversion keeps history on the
    /// server.
    fn get(&self) -> Result<()> {
        run("svn", &["checkout", &self.remote, &self.local])?;
        Ok(())
    }

    fn update(&self) -> Result<()> {
        run_in(&self.local, "svn", &["update"])?;
        Ok(())
    }

    fn update_version(&self, version: &str) -> Result<()> {
        run_in(&self.local, "svn", &["update", "-r", version])?;
        Ok(())
    }

    fn version(&self) -> Result<String> {
        let out = run_in(&self.local, "svnversion", &["."])?;
        Ok(out.trim().to_string())
    }

    fn check_local(&self) -> bool {
        std::path::Path::new(&self.local).join(".svn").exists()
    }
}

/// Remote equivalence for Subversion endpoints. An exact match is the same
/// remote; otherwise the comparison repeats with the scheme stripped, so
/// `http`/`https`/`svn` rewrites applied by the server do not trip the
/// [`VcsError::WrongRemote`] check. The path must still match exactly.
pub fn same_remote(a: &str, b: &str) -> bool {
    a == b || strip_scheme(a) == strip_scheme(b)
}

fn strip_scheme(url: &str) -> &str {
    url.split_once("://").map(|(_, rest)| rest).unwrap_or(url)
}

/// Parses one `svn log` entry. The message body sits between the first
/// blank line and the closing dashed rule.
fn parse_commit_info(out: &str) -> Result<CommitInfo> {
    let caps = LOG_HEADER
        .captures(out)
        .ok_or(VcsError::RevisionUnavailable)?;

    let date = caps.name("date").map(|m| m.as_str().trim()).unwrap_or("");
    let message: Vec<&str> = out
        .lines()
        .skip_while(|l| !l.trim().is_empty())
        .skip(1)
        .take_while(|l| !l.starts_with("----"))
        .collect();

    Ok(CommitInfo {
        commit: caps["rev"].to_string(),
        author: caps["author"].trim().to_string(),
        message: message.join("\n").trim().to_string(),
        date: DateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S %z").ok(),
    })
}
