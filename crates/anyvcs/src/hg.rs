//! Mercurial repository driver - wraps the `hg` command-line client.

use chrono::{DateTime, FixedOffset};
use lazy_static::lazy_static;
use regex::Regex;

use crate::detect::detect_vcs_from_path;
use crate::error::{Result, VcsError};
use crate::repo::{reference_list, run, run_in, CommitInfo, Repo, VcsType, VersionInfo};

lazy_static! {
    /// Matches the default path in `hg paths` output.
    static ref DEFAULT_PATH: Regex = Regex::new(r"default = (?P<url>.+)\n").unwrap();
    /// First column of `hg branches` / `hg tags` listings.
    static ref REF_NAME: Regex = Regex::new(r"(?m)^(\S+)").unwrap();
}

/// Timestamp format produced by hg's `isodatesec` filter.
const ISODATESEC: &str = "%Y-%m-%d %H:%M:%S %z";

/// A Mercurial checkout.
#[derive(Debug)]
pub struct HgRepo {
    remote: String,
    local: String,
}

impl HgRepo {
    /// Creates a handle for a Mercurial repository at `local` synchronized
    /// against `remote`, cross-validating against an existing checkout the
    /// same way [`GitRepo::new`](crate::git::GitRepo::new) does.
    pub fn new(remote: &str, local: &str) -> Result<Self> {
        let existing = match detect_vcs_from_path(local) {
            Ok(VcsType::Hg) => true,
            Ok(_) => return Err(VcsError::WrongVcs),
            Err(VcsError::CannotDetectVcs) => false,
            Err(e) => return Err(e),
        };

        let mut repo = HgRepo {
            remote: remote.to_string(),
            local: local.to_string(),
        };

        if existing && repo.check_local() {
            let out = run_in(&repo.local, "hg", &["paths"])?;
            let configured = DEFAULT_PATH
                .captures(&out)
                .and_then(|c| c.name("url"))
                .map(|m| m.as_str().trim())
                .unwrap_or("");

            if !configured.is_empty() && !repo.remote.is_empty() && configured != repo.remote {
                return Err(VcsError::WrongRemote);
            }
            if repo.remote.is_empty() && !configured.is_empty() {
                repo.remote = configured.to_string();
            }
        }

        Ok(repo)
    }

    /// Branch names known to the checkout.
    pub fn branches(&self) -> Result<Vec<String>> {
        let out = run_in(&self.local, "hg", &["branches"])?;
        Ok(reference_list(&out, &REF_NAME))
    }

    /// Tag names known to the checkout.
    pub fn tags(&self) -> Result<Vec<String>> {
        let out = run_in(&self.local, "hg", &["tags"])?;
        Ok(reference_list(&out, &REF_NAME))
    }

    /// Whether `r` names a commit, branch, or tag in the checkout.
    pub fn is_reference(&self, r: &str) -> bool {
        run_in(&self.local, "hg", &["log", "-r", r]).is_ok()
    }

    /// Whether the working copy differs from the checked out revision.
    pub fn is_dirty(&self) -> bool {
        match run_in(&self.local, "hg", &["diff"]) {
            Ok(out) => !out.is_empty(),
            Err(_) => true,
        }
    }

    /// Timestamp of the current revision.
    pub fn date(&self) -> Result<DateTime<FixedOffset>> {
        let version = self.version()?;
        let out = run_in(
            &self.local,
            "hg",
            &["log", "-r", &version, "--template", "{date|isodatesec}"],
        )?;
        DateTime::parse_from_str(out.trim(), ISODATESEC)
            .map_err(|_| VcsError::RevisionUnavailable)
    }

    /// Branches and tags together with the revisions they point at. The
    /// checkout is synchronized with upstream first so the list is current.
    pub fn current_versions_with_revs(&self) -> Result<Vec<VersionInfo>> {
        self.update()?;

        let out = run_in(&self.local, "hg", &["tags", "--debug", "--verbose"])?;
        let mut versions = parse_tag_revs(&out);

        let out = run_in(&self.local, "hg", &["branches", "--debug", "--verbose"])?;
        versions.extend(parse_branch_revs(&out));

        Ok(versions)
    }

    /// Metadata for the revision named by `id`.
    pub fn commit_info(&self, id: &str) -> Result<CommitInfo> {
        let template = "{node}\x1f{author}\x1f{date|isodatesec}\x1f{desc}";
        let out = run_in(&self.local, "hg", &["log", "-r", id, "--template", template])
            .map_err(|_| VcsError::RevisionUnavailable)?;
        parse_commit_info(&out)
    }
}

impl Repo for HgRepo {
    fn vcs(&self) -> VcsType {
        VcsType::Hg
    }

    fn remote(&self) -> &str {
        &self.remote
    }

    fn local_path(&self) -> &str {
        &self.local
    }

    fn get(&self) -> Result<()> {
        run("hg", &["clone", &self.remote, &self.local])?;
        Ok(())
    }

    fn update(&self) -> Result<()> {
        run_in(&self.local, "hg", &["update"])?;
        Ok(())
    }

    fn update_version(&self, version: &str) -> Result<()> {
        // Pull first so the requested revision is present locally.
        run_in(&self.local, "hg", &["pull"])?;
        run_in(&self.local, "hg", &["update", version])?;
        Ok(())
    }

    fn version(&self) -> Result<String> {
        let out = run_in(&self.local, "hg", &["identify"])?;
        // `hg identify` appends the branch and tag names after the hash.
        Ok(out
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_string())
    }

    fn check_local(&self) -> bool {
        std::path::Path::new(&self.local).join(".hg").exists()
    }
}

fn parse_tag_revs(out: &str) -> Vec<VersionInfo> {
    let mut versions = Vec::new();
    for line in out.trim().lines() {
        // Local tags and the magic "tip" tag are not real versions.
        if line.ends_with("local") || line.starts_with("tip") {
            continue;
        }
        if let Some((label, rev)) = line.split_once(':') {
            let rev = rev.trim();
            // A null revision marks a tag deleted in a later commit.
            if rev.is_empty() || rev.chars().all(|c| c == '0') {
                continue;
            }
            if let Some(name) = label.split_whitespace().next() {
                versions.push(VersionInfo {
                    name: name.to_string(),
                    revision: rev.to_string(),
                    is_branch: false,
                });
            }
        }
    }
    versions
}

fn parse_branch_revs(out: &str) -> Vec<VersionInfo> {
    let mut versions = Vec::new();
    for line in out.trim().lines() {
        if line.ends_with("(inactive)") {
            continue;
        }
        if let Some((label, rev)) = line.split_once(':') {
            let rev = rev.split_whitespace().next().unwrap_or("");
            if rev.is_empty() {
                continue;
            }
            if let Some(name) = label.split_whitespace().next() {
                versions.push(VersionInfo {
                    name: name.to_string(),
                    revision: rev.to_string(),
                    is_branch: true,
                });
            }
        }
    }
    versions
}

fn parse_commit_info(out: &str) -> Result<CommitInfo> {
    let mut parts = out.splitn(4, '\u{1f}');
    let commit = parts.next().unwrap_or("").trim();
    let author = parts.next().ok_or(VcsError::RevisionUnavailable)?.trim();
    let date = parts.next().ok_or(VcsError::RevisionUnavailable)?.trim();
    let message = parts.next().ok_or(VcsError::RevisionUnavailable)?.trim();

    if commit.is_empty() {
        return Err(VcsError::RevisionUnavailable);
    }

    Ok(CommitInfo {
        commit: commit.to_string(),
        author: author.to_string(),
        message: message.to_string(),
        date: DateTime::parse_from_str(date, ISODATESEC).ok(),
    })
}
