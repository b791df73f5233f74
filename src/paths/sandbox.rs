//! Confinement of caller-supplied paths to a base directory

use std::path::{Component, Path, PathBuf};

use crate::error::{GatewayError, Result};

/// Rejects paths that lexically resolve outside `base`.
///
/// The base is made absolute against the working directory once, at
/// construction. Resolution never touches the filesystem after that: output
/// paths usually do not exist yet, so `canonicalize` is not an option.
/// Symlinks inside the base directory are trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSandbox {
    base: PathBuf,
}

impl PathSandbox {
    pub fn new<P: AsRef<Path>>(base: P) -> Result<Self> {
        let base = base.as_ref();
        if base.as_os_str().is_empty() {
            return Err(GatewayError::config("base_dir must not be empty"));
        }

        let absolute = if base.is_absolute() {
            base.to_path_buf()
        } else {
            std::env::current_dir()?.join(base)
        };

        Ok(Self {
            base: normalize(&absolute),
        })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Join a relative path onto the base without checking it
    pub fn anchor(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            normalize(path)
        } else {
            normalize(&self.base.join(path))
        }
    }

    /// Resolve `requested` under the base, failing if it escapes
    pub fn resolve(&self, requested: &Path) -> Result<PathBuf> {
        let resolved = self.anchor(requested);
        if resolved.starts_with(&self.base) {
            Ok(resolved)
        } else {
            Err(GatewayError::PathOutsideSandbox {
                path: requested.to_path_buf(),
                base: self.base.clone(),
            })
        }
    }
}

/// Fold `.` and `..` components without consulting the filesystem
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                Some(Component::ParentDir) | Some(Component::CurDir) | None => {
                    out.push("..");
                }
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize(Path::new("/../etc")), PathBuf::from("/etc"));
        assert_eq!(normalize(Path::new("../a")), PathBuf::from("../a"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_relative_inside_base() {
        let sandbox = PathSandbox::new("/data").unwrap();
        assert_eq!(
            sandbox.resolve(Path::new("in/../cat.png")).unwrap(),
            PathBuf::from("/data/cat.png")
        );
    }

    #[test]
    fn test_absolute_inside_base_allowed() {
        let sandbox = PathSandbox::new("/data").unwrap();
        assert!(sandbox.resolve(Path::new("/data/x/y.png")).is_ok());
    }

    #[test]
    fn test_escapes_rejected() {
        let sandbox = PathSandbox::new("/data").unwrap();
        assert!(sandbox.resolve(Path::new("../secret.png")).is_err());
        assert!(sandbox.resolve(Path::new("/etc/passwd")).is_err());
        // sibling sharing a name prefix
        assert!(sandbox.resolve(Path::new("/database/x.png")).is_err());
    }

    #[test]
    fn test_relative_base() {
        let cwd = std::env::current_dir().unwrap();
        let sandbox = PathSandbox::new("./assets").unwrap();
        assert_eq!(sandbox.base(), normalize(&cwd.join("assets")));
        assert_eq!(
            sandbox.resolve(Path::new("cat.png")).unwrap(),
            normalize(&cwd.join("assets/cat.png"))
        );
        assert!(sandbox.resolve(Path::new("../cat.png")).is_err());
    }

    #[test]
    fn test_current_dir_base_still_confines() {
        let cwd = normalize(&std::env::current_dir().unwrap());
        let sandbox = PathSandbox::new(".").unwrap();
        assert_eq!(sandbox.base(), cwd.as_path());

        assert!(sandbox.resolve(Path::new("../secret.png")).is_err());
        assert!(sandbox.resolve(Path::new("/etc/passwd")).is_err());
        assert_eq!(
            sandbox.resolve(Path::new("in/cat.png")).unwrap(),
            cwd.join("in/cat.png")
        );
    }

    #[test]
    fn test_parent_base_still_confines() {
        let sandbox = PathSandbox::new("..").unwrap();
        assert!(sandbox.base().is_absolute());
        // a base at the filesystem root contains every path
        if sandbox.base().parent().is_some() {
            assert!(sandbox.resolve(Path::new("../../x")).is_err());
        }
        assert!(sandbox.resolve(Path::new("sibling/x.png")).is_ok());
    }

    #[test]
    fn test_empty_base_rejected() {
        let err = PathSandbox::new("").unwrap_err();
        assert!(matches!(err, GatewayError::ConfigError { .. }));
    }
}
