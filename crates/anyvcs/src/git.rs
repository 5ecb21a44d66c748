//! Git repository driver - wraps the `git` command-line client.

use chrono::{DateTime, FixedOffset};
use lazy_static::lazy_static;
use regex::Regex;

use crate::detect::detect_vcs_from_path;
use crate::error::{Result, VcsError};
use crate::repo::{reference_list, run, run_in, CommitInfo, Repo, VcsType};

/// Field separator used in `git log --format` queries. Unit separator keeps
/// multi-line commit messages intact.
const LOG_SEP: &str = "%x1f";

/// A git checkout.
#[derive(Debug)]
pub struct GitRepo {
    remote: String,
    local: String,
    /// Name of the configured remote to fetch from, `origin` by default.
    pub remote_location: String,
}

impl GitRepo {
    /// Creates a handle for a git repository at `local` synchronized against
    /// `remote`.
    ///
    /// When a checkout already exists at `local` its configured remote is
    /// cross-validated: a conflicting non-empty `remote` fails with
    /// [`VcsError::WrongRemote`], an empty one adopts the configured remote.
    /// A checkout of a different VCS fails with [`VcsError::WrongVcs`].
    pub fn new(remote: &str, local: &str) -> Result<Self> {
        let existing = match detect_vcs_from_path(local) {
            Ok(VcsType::Git) => true,
            Ok(_) => return Err(VcsError::WrongVcs),
            Err(VcsError::CannotDetectVcs) => false,
            Err(e) => return Err(e),
        };

        let mut repo = GitRepo {
            remote: remote.to_string(),
            local: local.to_string(),
            remote_location: "origin".to_string(),
        };

        if existing && repo.check_local() {
            let out = run_in(&repo.local, "git", &["config", "--get", "remote.origin.url"])?;
            let configured = out.trim();

            if !repo.remote.is_empty() && configured != repo.remote {
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
        let out = run_in(
            &self.local,
            "git",
            &["for-each-ref", "--format=%(refname:short)", "refs/heads/"],
        )?;
        Ok(lines(&out))
    }

    /// Tag names known to the checkout.
    pub fn tags(&self) -> Result<Vec<String>> {
        let out = run_in(
            &self.local,
            "git",
            &["for-each-ref", "--format=%(refname:short)", "refs/tags/"],
        )?;
        Ok(lines(&out))
    }

    /// Whether `r` names a commit, branch, or tag in the checkout.
    pub fn is_reference(&self, r: &str) -> bool {
        run_in(&self.local, "git", &["rev-parse", "--verify", "--quiet", r]).is_ok()
    }

    /// Whether the working tree differs from the checked out revision.
    pub fn is_dirty(&self) -> bool {
        match run_in(&self.local, "git", &["diff"]) {
            Ok(out) => !out.is_empty(),
            Err(_) => true,
        }
    }

    /// Timestamp of the latest commit.
    pub fn date(&self) -> Result<DateTime<FixedOffset>> {
        let out = run_in(&self.local, "git", &["log", "-1", "--format=%cI"])?;
        DateTime::parse_from_rfc3339(out.trim()).map_err(|_| VcsError::RevisionUnavailable)
    }

    /// Metadata for the commit named by `id`.
    pub fn commit_info(&self, id: &str) -> Result<CommitInfo> {
        let format = format!("--format=%H{0}%an <%ae>{0}%cI{0}%B", LOG_SEP);
        let out = run_in(&self.local, "git", &["log", "-1", &format, id])
            .map_err(|_| VcsError::RevisionUnavailable)?;
        parse_commit_info(&out)
    }
}

impl Repo for GitRepo {
    fn vcs(&self) -> VcsType {
        VcsType::Git
    }

    fn remote(&self) -> &str {
        &self.remote
    }

    fn local_path(&self) -> &str {
        &self.local
    }

    fn get(&self) -> Result<()> {
        run("git", &["clone", &self.remote, &self.local])?;
        Ok(())
    }

    fn update(&self) -> Result<()> {
        // Fetch first so the pull has everything it needs; stop if it fails.
        run_in(&self.local, "git", &["fetch", &self.remote_location])?;
        run_in(&self.local, "git", &["pull"])?;
        Ok(())
    }

    fn update_version(&self, version: &str) -> Result<()> {
        run_in(&self.local, "git", &["checkout", version])?;
        Ok(())
    }

    fn version(&self) -> Result<String> {
        let out = run_in(&self.local, "git", &["rev-parse", "HEAD"])?;
        Ok(out.trim().to_string())
    }

    fn check_local(&self) -> bool {
        std::path::Path::new(&self.local).join(".git").exists()
    }
}

fn lines(out: &str) -> Vec<String> {
    lazy_static! {
        static ref LINE: Regex = Regex::new(r"(?m)^(\S+)").unwrap();
    }
    reference_list(out, &LINE)
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
        date: DateTime::parse_from_rfc3339(date).ok(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::process::Command;
    use tempfile::TempDir;

    fn git(dir: &std::path::Path, args: &[&str]) {
        let out = Command::new("git").args(args).current_dir(dir).output().unwrap();
        assert!(out.status.success(), "git {:?}: {:?}", args, out);
    }

    fn create_test_repo() -> TempDir {
        let temp = TempDir::new().unwrap();
        git(temp.path(), &["init"]);
        git(temp.path(), &["config", "user.email", "test@test.com"]);
        git(temp.path(), &["config", "user.name", "Test"]);
        git(temp.path(), &["config", "commit.gpgsign", "false"]);
        git(temp.path(), &["config", "tag.gpgsign", "false"]);
        git(temp.path(), &["remote", "add", "origin", "https://example.com/one.git"]);
        fs::write(temp.path().join("README"), "hello\n").unwrap();
        git(temp.path(), &["add", "."]);
        git(temp.path(), &["commit", "-m", "Initial commit"]);
        temp
    }

    #[test]
    fn test_new_on_empty_location() {
        let temp = TempDir::new().unwrap();
        let local = temp.path().join("checkout");
        let repo = GitRepo::new("https://example.com/acme/widget.git", local.to_str().unwrap())
            .unwrap();
        assert_eq!(repo.vcs(), VcsType::Git);
        assert_eq!(repo.remote(), "https://example.com/acme/widget.git");
        assert!(!repo.check_local());
    }

    #[test]
    fn test_new_wrong_vcs() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".hg")).unwrap();
        let err = GitRepo::new("", temp.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, VcsError::WrongVcs));
    }

    #[test]
    fn test_cross_validation_of_remote() {
        let temp = create_test_repo();
        let path = temp.path().to_str().unwrap();

        let repo = GitRepo::new("https://example.com/one.git", path).unwrap();
        assert_eq!(repo.remote(), "https://example.com/one.git");

        let adopted = GitRepo::new("", path).unwrap();
        assert_eq!(adopted.remote(), "https://example.com/one.git");

        let err = GitRepo::new("https://example.com/two.git", path).unwrap_err();
        assert!(matches!(err, VcsError::WrongRemote));
    }

    #[test]
    fn test_version_and_check_local() {
        let temp = create_test_repo();
        let repo = GitRepo::new("", temp.path().to_str().unwrap()).unwrap();
        assert!(repo.check_local());
        let version = repo.version().unwrap();
        assert_eq!(version.len(), 40);
        assert!(repo.is_reference(&version));
        assert!(!repo.is_reference("no-such-ref"));
    }

    #[test]
    fn test_update_version_to_tag() {
        let temp = create_test_repo();
        git(temp.path(), &["tag", "-a", "v1.0.0", "-m", "Version 1.0.0"]);
        fs::write(temp.path().join("README"), "changed\n").unwrap();
        git(temp.path(), &["commit", "-am", "Second commit"]);

        let repo = GitRepo::new("", temp.path().to_str().unwrap()).unwrap();
        let before = repo.version().unwrap();
        repo.update_version("v1.0.0").unwrap();
        let after = repo.version().unwrap();
        assert_ne!(before, after);
        assert!(repo.tags().unwrap().contains(&"v1.0.0".to_string()));
    }

    #[test]
    fn test_update_version_unknown_ref_fails() {
        let temp = create_test_repo();
        let repo = GitRepo::new("", temp.path().to_str().unwrap()).unwrap();
        let err = repo.update_version("does-not-exist").unwrap_err();
        assert!(err.output().is_some());
    }

    #[test]
    fn test_branches() {
        let temp = create_test_repo();
        let repo = GitRepo::new("", temp.path().to_str().unwrap()).unwrap();
        let branches = repo.branches().unwrap();
        assert!(
            branches.contains(&"master".to_string()) || branches.contains(&"main".to_string()),
            "{:?}",
            branches
        );
    }

    #[test]
    fn test_is_dirty() {
        let temp = create_test_repo();
        let repo = GitRepo::new("", temp.path().to_str().unwrap()).unwrap();
        assert!(!repo.is_dirty());
        fs::write(temp.path().join("README"), "dirty\n").unwrap();
        assert!(repo.is_dirty());
    }

    #[test]
    fn test_commit_info() {
        let temp = create_test_repo();
        let repo = GitRepo::new("", temp.path().to_str().unwrap()).unwrap();
        let head = repo.version().unwrap();

        let info = repo.commit_info(&head).unwrap();
        assert_eq!(info.commit, head);
        assert_eq!(info.author, "Test <test@test.com>");
        assert_eq!(info.message, "Initial commit");
        assert!(info.date.is_some());

        let err = repo.commit_info("0000000000000000000000000000000000000000").unwrap_err();
        assert!(matches!(err, VcsError::RevisionUnavailable));
    }

    #[test]
    fn test_date() {
        let temp = create_test_repo();
        let repo = GitRepo::new("", temp.path().to_str().unwrap()).unwrap();
        repo.date().unwrap();
    }
}
