//! Work with repositories under varying version control systems (git,
//! Mercurial, Subversion, and Bazaar) through a single interface.
//!
//! The entry point is [`new_repo`], which detects the repository type from
//! the local checkout or, failing that, from the remote URL, and returns the
//! matching driver:
//!
//! ```no_run
//! # fn main() -> anyvcs::Result<()> {
//! let repo = anyvcs::new_repo("https://github.com/acme/widget", "/tmp/widget")?;
//! assert_eq!(repo.vcs(), anyvcs::VcsType::Git);
//! repo.get()?;
//! repo.update_version("v1.2.0")?;
//! # Ok(())
//! # }
//! ```
//!
//! URL detection handles the well-known hosting providers plus a generic
//! rule for URLs ending in `.git`, `.hg`, `.svn`, or `.bzr`; for some
//! providers (Bitbucket) it asks the provider's API which VCS backs the
//! repository.
//!
//! When the type is already known, the per-type constructors
//! ([`GitRepo::new`], [`SvnRepo::new`], [`HgRepo::new`], [`BzrRepo::new`])
//! take the same arguments and perform the same cross-validation against
//! whatever is already checked out at the local path.
//!
//! Every operation shells out to the native client and blocks until it
//! exits; nothing here speaks a VCS network protocol. Failures keep the
//! native command's combined output (see [`VcsError::output`]), and verbose
//! command output is emitted through the `log` facade at debug level.
//!
//! Caveats that carry across the uniform interface: revision identifier
//! formats differ per VCS (a 40-char hash for git, a short hash for hg, a
//! revision number for svn and bzr), and for Subversion the remote should
//! include the branch, e.g. `.../trunk`.

pub mod bzr;
pub mod detect;
pub mod error;
pub mod git;
pub mod hg;
pub mod remote;
pub mod repo;
pub mod svn;

pub use bzr::BzrRepo;
pub use detect::detect_vcs_from_path;
pub use error::{Result, VcsError};
pub use git::GitRepo;
pub use hg::HgRepo;
pub use remote::detect_vcs_from_url;
pub use repo::{new_repo, CommitInfo, Repo, VcsType, VersionInfo};
pub use svn::SvnRepo;
