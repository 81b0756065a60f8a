// Relative symlink helpers
//
// Each public function runs its `std::fs` work on the blocking pool.

use std::io;
use std::path::{Path, PathBuf};

/// Create `link` as a symlink to `target`, stored relative to the link's parent.
///
/// Missing parent directories are created. An existing entry at `link` is not
/// removed; the caller decides what may be replaced.
pub async fn create_relative_symlink(
    link: impl AsRef<Path>,
    target: impl AsRef<Path>,
) -> io::Result<PathBuf> {
    let link = link.as_ref().to_path_buf();
    let target = target.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || create_relative_symlink_sync(&link, &target)).await?
}

fn create_relative_symlink_sync(link: &Path, target: &Path) -> io::Result<PathBuf> {
    let parent = link
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "link has no parent"))?;
    std::fs::create_dir_all(parent)?;

    let relative = pathdiff::diff_paths(target, parent).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "cannot express {} relative to {}",
                target.display(),
                parent.display()
            ),
        )
    })?;
    symlink_dir(&relative, link)?;
    Ok(relative)
}

#[cfg(unix)]
fn symlink_dir(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
fn symlink_dir(original: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(original, link)
}

/// Remove whatever is at `path`: file, symlink or directory tree. Missing is fine.
pub async fn remove_path(path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || remove_path_sync(&path)).await?
}

fn remove_path_sync(path: &Path) -> io::Result<()> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    if metadata.file_type().is_symlink() {
        remove_symlink_sync(path)
    } else if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

pub async fn remove_symlink(path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || remove_symlink_sync(&path)).await?
}

#[cfg(unix)]
fn remove_symlink_sync(path: &Path) -> io::Result<()> {
    std::fs::remove_file(path)
}

// Directory symlinks on Windows are removed like directories
#[cfg(windows)]
fn remove_symlink_sync(path: &Path) -> io::Result<()> {
    std::fs::remove_dir(path).or_else(|_| std::fs::remove_file(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_link_between_sibling_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let dists = dir.path().join("wrapper/dists");
        let target = dists.join("gradle-7.4-bin/c0gwcg53nkjbqw7r0h0umtfvt/gradle-7.4");
        std::fs::create_dir_all(target.join("bin")).unwrap();
        std::fs::write(target.join("bin/gradle"), b"").unwrap();

        let link = dists.join("gradle-7.3-bin/ddwl0k7mt9g6ak16i1m905vyv/gradle-7.3");
        let relative = create_relative_symlink_sync(&link, &target).unwrap();

        assert_eq!(
            relative,
            PathBuf::from("../../gradle-7.4-bin/c0gwcg53nkjbqw7r0h0umtfvt/gradle-7.4")
        );
        assert_eq!(std::fs::read_link(&link).unwrap(), relative);
        assert!(link.join("bin/gradle").is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_create_relative_symlink_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("dists/gradle-7.4-bin/h1/gradle-7.4");
        std::fs::create_dir_all(target.join("bin")).unwrap();
        std::fs::write(target.join("bin/gradle"), b"").unwrap();

        let link = dir.path().join("dists/gradle-7.3-bin/h2/gradle-7.3");
        let relative = create_relative_symlink(&link, &target).await.unwrap();

        assert!(relative.is_relative());
        assert_eq!(std::fs::read_link(&link).unwrap(), relative);
        assert!(link.join("bin/gradle").is_file());
    }

    #[test]
    fn test_parent_dir_in_link_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a")).unwrap();
        let target = dir.path().join("a/target");

        // No relative form exists once the base walks up with `..`
        let link = dir.path().join("a/../a/link");
        let err = create_relative_symlink_sync(&link, &target).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(std::fs::symlink_metadata(&link).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_remove_path_handles_every_kind() {
        let dir = tempfile::tempdir().unwrap();

        let file = dir.path().join("file");
        std::fs::write(&file, b"x").unwrap();
        let tree = dir.path().join("tree/nested");
        std::fs::create_dir_all(&tree).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(dir.path().join("tree"), &link).unwrap();

        remove_path(&link).await.unwrap();
        assert!(dir.path().join("tree/nested").is_dir());
        remove_path(&file).await.unwrap();
        remove_path(dir.path().join("tree")).await.unwrap();
        remove_path(dir.path().join("missing")).await.unwrap();

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
