//! VCS type detection from a local path.

use std::path::Path;

use crate::error::{Result, VcsError};
use crate::repo::VcsType;

/// Markers probed in priority order. A checkout normally carries exactly one
/// of these, but the order still matters for directories with stray markers
/// left behind by earlier operations: git wins over svn, svn over hg, hg
/// over bzr.
const MARKERS: [(&str, VcsType); 4] = [
    (".git", VcsType::Git),
    (".svn", VcsType::Svn),
    (".hg", VcsType::Hg),
    (".bzr", VcsType::Bzr),
];

/// Detects the VCS type of a local checkout by looking for the tool's
/// metadata directory directly under `path`.
///
/// A path that does not exist has not been checked out yet and fails with
/// [`VcsError::CannotDetectVcs`]. No native command is run.
pub fn detect_vcs_from_path(path: impl AsRef<Path>) -> Result<VcsType> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(VcsError::CannotDetectVcs);
    }

    for (marker, vcs) in MARKERS {
        if path.join(marker).exists() {
            return Ok(vcs);
        }
    }

    Err(VcsError::CannotDetectVcs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_detect_each_marker() {
        for (marker, expected) in MARKERS {
            let temp = TempDir::new().unwrap();
            fs::create_dir(temp.path().join(marker)).unwrap();
            assert_eq!(detect_vcs_from_path(temp.path()).unwrap(), expected);
        }
    }

    #[test]
    fn test_detect_missing_path() {
        let temp = TempDir::new().unwrap();
        let gone = temp.path().join("never-checked-out");
        assert!(matches!(
            detect_vcs_from_path(&gone),
            Err(VcsError::CannotDetectVcs)
        ));
    }

    #[test]
    fn test_detect_no_markers() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            detect_vcs_from_path(temp.path()),
            Err(VcsError::CannotDetectVcs)
        ));
    }

    #[test]
    fn test_detect_priority_order() {
        // Git outranks hg when both markers are present.
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".hg")).unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        assert_eq!(detect_vcs_from_path(temp.path()).unwrap(), VcsType::Git);

        // And svn outranks bzr.
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".bzr")).unwrap();
        fs::create_dir(temp.path().join(".svn")).unwrap();
        assert_eq!(detect_vcs_from_path(temp.path()).unwrap(), VcsType::Svn);
    }
}
