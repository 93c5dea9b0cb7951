use std::path::{Path, PathBuf};

/// Find the project root by walking up from `cwd` looking for `package.json` or `.git`.
///
/// Returns the first directory containing either marker, or `None` if neither is found.
#[must_use]
pub fn project_root(cwd: &Path) -> Option<PathBuf> {
    let mut current = cwd.to_path_buf();

    loop {
        if current.join("package.json").exists() || current.join(".git").exists() {
            return Some(current);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Make `path` absolute against `base` without touching the filesystem.
#[must_use]
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Find an installed package directory by walking up `node_modules` folders from `start`.
#[must_use]
pub fn find_package_dir(start: &Path, name: &str) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join("node_modules").join(name);
        if candidate.is_dir() {
            return Some(dunce::canonicalize(&candidate).unwrap_or(candidate));
        }
        current = dir.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_project_root_walks_up() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        let nested = dir.path().join("src").join("pages");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(project_root(&nested), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_absolutize() {
        assert_eq!(
            absolutize(Path::new("src/App.tsx"), Path::new("/project")),
            PathBuf::from("/project/src/App.tsx")
        );
        assert_eq!(
            absolutize(Path::new("/abs/App.tsx"), Path::new("/project")),
            PathBuf::from("/abs/App.tsx")
        );
    }

    #[test]
    fn test_find_package_dir() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("node_modules").join("ondemand");
        std::fs::create_dir_all(&pkg).unwrap();
        let nested = dir.path().join("apps").join("web");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_package_dir(&nested, "ondemand").unwrap();
        assert!(found.ends_with("node_modules/ondemand"));
        assert!(find_package_dir(&nested, "missing-pkg").is_none());
    }
}
