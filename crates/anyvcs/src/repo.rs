//! The `Repo` trait, the repository factory, and the shared command runner.

use std::fmt;
use std::path::Path;
use std::process::Command;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use regex::Regex;

use crate::bzr::BzrRepo;
use crate::detect::detect_vcs_from_path;
use crate::error::{Result, VcsError};
use crate::git::GitRepo;
use crate::hg::HgRepo;
use crate::remote::detect_vcs_from_url;
use crate::svn::SvnRepo;

/// The version control system backing a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VcsType {
    Git,
    Svn,
    Hg,
    Bzr,
}

impl VcsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VcsType::Git => "git",
            VcsType::Svn => "svn",
            VcsType::Hg => "hg",
            VcsType::Bzr => "bzr",
        }
    }
}

impl fmt::Display for VcsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VcsType {
    type Err = VcsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "git" => Ok(VcsType::Git),
            "svn" => Ok(VcsType::Svn),
            "hg" => Ok(VcsType::Hg),
            "bzr" => Ok(VcsType::Bzr),
            _ => Err(VcsError::CannotDetectVcs),
        }
    }
}

/// Metadata about a single commit.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    /// The commit identifier, in the native tool's own format.
    pub commit: String,
    /// Author, usually `Name <email>`.
    pub author: String,
    /// Commit message.
    pub message: String,
    /// Commit timestamp, when the native tool reported one.
    pub date: Option<DateTime<FixedOffset>>,
}

/// A branch or tag name together with the revision it points at.
#[derive(Debug, Clone)]
pub struct VersionInfo {
    pub name: String,
    pub revision: String,
    pub is_branch: bool,
}

/// A checkout of a repository under one of the supported version control
/// systems. Implementations invoke the native client; they never speak the
/// VCS's wire protocol themselves.
///
/// Operations that touch the checkout pass its path to the child process as
/// an explicit working directory. The parent process working directory is
/// never changed, so handles can be used concurrently.
pub trait Repo: fmt::Debug {
    /// The underlying VCS.
    fn vcs(&self) -> VcsType;

    /// The remote location the repository synchronizes against.
    fn remote(&self) -> &str;

    /// The local file system location of the checkout.
    fn local_path(&self) -> &str;

    /// Performs the initial clone/checkout of the remote into the local path.
    fn get(&self) -> Result<()>;

    /// Synchronizes an existing checkout with its upstream. When the
    /// operation takes several native commands they run strictly in
    /// sequence, stopping at the first failure.
    fn update(&self) -> Result<()>;

    /// Moves the working copy to the given reference (revision id, branch,
    /// or tag, depending on what the VCS accepts). The reference is not
    /// validated locally; an unknown reference is reported by the native
    /// tool.
    fn update_version(&self, version: &str) -> Result<()>;

    /// The current revision identifier, trimmed. The format is
    /// VCS-specific and is not normalized across types.
    fn version(&self) -> Result<String>;

    /// Whether the local path contains this VCS's metadata directory.
    fn check_local(&self) -> bool;
}

/// Returns a [`Repo`] for the given remote and local location, detecting the
/// VCS type from the local checkout first and falling back to the remote URL
/// when the local path carries no signal.
///
/// Note: remote detection may go out to the network for hosts whose URLs do
/// not encode the type (for example Bitbucket).
///
/// ```no_run
/// # fn main() -> anyvcs::Result<()> {
/// let repo = anyvcs::new_repo("https://github.com/acme/widget", "/tmp/widget")?;
/// repo.get()?;
/// println!("at revision {}", repo.version()?);
/// # Ok(())
/// # }
/// ```
pub fn new_repo(remote: &str, local: &str) -> Result<Box<dyn Repo>> {
    let vtype = match detect_vcs_from_path(local) {
        Ok(t) => t,
        // Nothing checked out yet; the remote URL is the only signal left.
        Err(VcsError::CannotDetectVcs) => detect_vcs_from_url(remote)?,
        Err(e) => return Err(e),
    };

    match vtype {
        VcsType::Git => Ok(Box::new(GitRepo::new(remote, local)?)),
        VcsType::Svn => Ok(Box::new(SvnRepo::new(remote, local)?)),
        VcsType::Hg => Ok(Box::new(HgRepo::new(remote, local)?)),
        VcsType::Bzr => Ok(Box::new(BzrRepo::new(remote, local)?)),
    }
}

/// Runs a native command with no particular working directory and returns
/// its stdout. Used for operations like `clone` that create the local path
/// themselves.
pub(crate) fn run(cmd: &str, args: &[&str]) -> Result<String> {
    log::debug!("running {} {}", cmd, args.join(" "));
    let mut command = Command::new(cmd);
    command.args(args);
    execute(command, cmd, args)
}

/// Runs a native command with the checkout as its working directory.
pub(crate) fn run_in(dir: impl AsRef<Path>, cmd: &str, args: &[&str]) -> Result<String> {
    let dir = dir.as_ref();
    log::debug!("running {} {} in {}", cmd, args.join(" "), dir.display());
    let mut command = Command::new(cmd);
    command.args(args).current_dir(dir);
    execute(command, cmd, args)
}

fn execute(mut command: Command, cmd: &str, args: &[&str]) -> Result<String> {
    let rendered = format!("{} {}", cmd, args.join(" "));

    let output = command.output().map_err(|e| VcsError::CommandFailed {
        command: rendered.clone(),
        output: String::new(),
        source: Some(e),
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stdout.is_empty() {
        log::debug!("{}", stdout);
    }
    if !stderr.is_empty() {
        log::debug!("{}", stderr);
    }

    if output.status.success() {
        Ok(stdout)
    } else {
        Err(VcsError::CommandFailed {
            command: rendered,
            output: format!("{}{}", stdout, stderr),
            source: None,
        })
    }
}

/// Extracts the first capture group of every match, for parsing reference
/// listings (`hg branches`, `hg tags`, ...) out of native command output.
pub(crate) fn reference_list(output: &str, re: &Regex) -> Vec<String> {
    re.captures_iter(output)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    #[test]
    fn test_vcs_type_round_trip() {
        for t in [VcsType::Git, VcsType::Svn, VcsType::Hg, VcsType::Bzr] {
            assert_eq!(t.as_str().parse::<VcsType>().unwrap(), t);
        }
        assert!(matches!(
            "cvs".parse::<VcsType>(),
            Err(VcsError::CannotDetectVcs)
        ));
    }

    #[test]
    fn test_new_repo_empty_dir_and_no_remote() {
        let temp = TempDir::new().unwrap();
        let err = new_repo("", temp.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, VcsError::CannotDetectVcs));
    }

    #[test]
    fn test_new_repo_from_remote_url() {
        // The local path does not exist yet, so the type comes from the URL.
        let temp = TempDir::new().unwrap();
        let local = temp.path().join("widget");
        let repo = new_repo(
            "https://github.com/acme/widget",
            local.to_str().unwrap(),
        )
        .unwrap();
        assert_eq!(repo.vcs(), VcsType::Git);
        assert_eq!(repo.remote(), "https://github.com/acme/widget");
        assert!(!repo.check_local());
    }

    #[test]
    fn test_new_repo_prefers_local_checkout() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().to_str().unwrap();
        Command::new("git")
            .args(["init"])
            .current_dir(temp.path())
            .output()
            .unwrap();
        Command::new("git")
            .args(["remote", "add", "origin", "https://example.com/one.git"])
            .current_dir(temp.path())
            .output()
            .unwrap();

        // An empty remote adopts the configured one.
        let repo = new_repo("", path).unwrap();
        assert_eq!(repo.vcs(), VcsType::Git);
        assert_eq!(repo.remote(), "https://example.com/one.git");

        // A conflicting remote is rejected.
        let err = new_repo("https://example.com/two.git", path).unwrap_err();
        assert!(matches!(err, VcsError::WrongRemote));
    }

    #[test]
    fn test_run_missing_binary() {
        let err = run("anyvcs-no-such-binary", &["--version"]).unwrap_err();
        match err {
            VcsError::CommandFailed { source, .. } => assert!(source.is_some()),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_run_in_captures_output_on_failure() {
        let temp = TempDir::new().unwrap();
        let err = run_in(temp.path(), "git", &["rev-parse", "HEAD"]).unwrap_err();
        assert!(err.output().is_some());
    }

    #[test]
    fn test_reference_list() {
        let re = Regex::new(r"(?m)^(\S+)").unwrap();
        let out = "default  123:abc\nstable   120:def\n";
        assert_eq!(reference_list(out, &re), vec!["default", "stable"]);
    }
}
