//! Grammar reference resolution.
//!
//! A grammar reference is whatever the caller typed: relative or absolute,
//! with or without the artifact extension. Resolution turns it into exactly
//! one existing file or fails:
//!
//! ```text
//! "spec/hello"  ──expand──▶ /work/spec/hello      (missing)
//!                         ▶ /work/spec/hello.gzc  (exists) ──▶ ArtifactPath
//! ```
//!
//! Expansion is lexical, like a shell's `cd`: `.` is dropped, `..` pops one
//! component, and a leading `~` is replaced with `$HOME`. Symlinks are left
//! alone. Only one extra candidate is ever tried.

use crate::error::Error;
use std::ffi::OsString;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Extension of compiled grammar artifacts.
pub const DEFAULT_EXTENSION: &str = "gzc";

/// Absolute path of an artifact that existed when it was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactPath(PathBuf);

impl ArtifactPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for ArtifactPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.display().fmt(f)
    }
}

/// Resolve `reference` against the current working directory.
///
/// `extension` is given without the leading dot. The error always names the
/// reference as given, not the expanded path.
pub fn resolve(reference: &str, extension: &str) -> Result<ArtifactPath, Error> {
    let not_found = || Error::NotFound { reference: reference.to_string() };

    if reference.is_empty() {
        return Err(not_found());
    }

    let cwd = std::env::current_dir().map_err(|err| {
        debug_log!("[resolve:cwd_unavailable] reference=\"{}\" error={}", reference, err);
        not_found()
    })?;
    let absolute = expand(reference, &cwd);

    if absolute.is_file() {
        debug_log!("[resolve:exact] reference=\"{}\" path={}", reference, absolute.display());
        return Ok(ArtifactPath(absolute));
    }

    if has_extension(&absolute, extension) {
        debug_log!("[resolve:missing] reference=\"{}\" path={}", reference, absolute.display());
        return Err(not_found());
    }

    let candidate = with_extension_appended(&absolute, extension);
    if candidate.is_file() {
        debug_log!("[resolve:inferred_extension] reference=\"{}\" path={}", reference, candidate.display());
        return Ok(ArtifactPath(candidate));
    }

    debug_log!("[resolve:missing] reference=\"{}\" tried={},{}", reference, absolute.display(), candidate.display());
    Err(not_found())
}

/// Expand `reference` into an absolute, lexically normalized path.
fn expand(reference: &str, cwd: &Path) -> PathBuf {
    let joined = match home_relative(reference) {
        Some(path) => path,
        None => cwd.join(reference),
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // Popping past the root stays at the root.
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

fn home_relative(reference: &str) -> Option<PathBuf> {
    let rest = if reference == "~" {
        ""
    } else {
        reference.strip_prefix("~/")?
    };
    let home = std::env::var_os("HOME")?;
    Some(PathBuf::from(home).join(rest))
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext == extension)
}

/// `hello` -> `hello.gzc`, `hello.v2` -> `hello.v2.gzc`.
fn with_extension_appended(path: &Path, extension: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn expand_is_lexical() {
        let cwd = Path::new("/work/project");
        assert_eq!(expand("spec/hello", cwd), PathBuf::from("/work/project/spec/hello"));
        assert_eq!(expand("./spec/../hello", cwd), PathBuf::from("/work/project/hello"));
        assert_eq!(expand("/abs/./x", cwd), PathBuf::from("/abs/x"));
        assert_eq!(expand("../../../../x", cwd), PathBuf::from("/x"));
    }

    #[test]
    fn extension_is_appended_not_replaced() {
        assert_eq!(with_extension_appended(Path::new("/a/hello"), "gzc"), PathBuf::from("/a/hello.gzc"));
        assert_eq!(with_extension_appended(Path::new("/a/hello.v2"), "gzc"), PathBuf::from("/a/hello.v2.gzc"));
    }

    #[test]
    fn resolves_exact_path() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("hello.gzc");
        fs::write(&file, "{}").unwrap();

        let resolved = resolve(file.to_str().unwrap(), DEFAULT_EXTENSION).unwrap();
        assert_eq!(resolved.as_path(), file.as_path());
    }

    #[test]
    fn infers_missing_extension() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("hello.gzc");
        fs::write(&file, "{}").unwrap();

        let reference = dir.path().join("hello");
        let resolved = resolve(reference.to_str().unwrap(), DEFAULT_EXTENSION).unwrap();
        assert_eq!(resolved.as_path(), file.as_path());
    }

    #[test]
    fn exact_file_wins_over_inferred_one() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("hello"), "{}").unwrap();
        fs::write(dir.path().join("hello.gzc"), "{}").unwrap();

        let reference = dir.path().join("hello");
        let resolved = resolve(reference.to_str().unwrap(), DEFAULT_EXTENSION).unwrap();
        assert_eq!(resolved.as_path(), reference.as_path());
    }

    #[test]
    fn does_not_guess_when_extension_already_present() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("hello.gzc.gzc"), "{}").unwrap();

        let reference = dir.path().join("hello.gzc");
        let reference = reference.to_str().unwrap();
        match resolve(reference, DEFAULT_EXTENSION) {
            Err(Error::NotFound { reference: r }) => assert_eq!(r, reference),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn not_found_carries_original_reference() {
        let dir = tempdir().unwrap();
        let reference = format!("{}/sub/../non-existant-file", dir.path().display());

        match resolve(&reference, DEFAULT_EXTENSION) {
            Err(Error::NotFound { reference: r }) => assert_eq!(r, reference),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn directories_are_not_artifacts() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("grammar")).unwrap();

        let reference = dir.path().join("grammar");
        assert!(matches!(resolve(reference.to_str().unwrap(), DEFAULT_EXTENSION), Err(Error::NotFound { .. })));
    }

    #[test]
    fn empty_reference_is_not_found() {
        assert!(matches!(resolve("", DEFAULT_EXTENSION), Err(Error::NotFound { .. })));
    }

    #[test]
    fn relative_references_use_the_working_directory() {
        // cargo runs tests from the package root.
        let short = resolve("testdata/hello.gzc", DEFAULT_EXTENSION).unwrap();
        let bare = resolve("testdata/hello", DEFAULT_EXTENSION).unwrap();
        assert_eq!(short, bare);
        assert!(short.as_path().is_absolute());
    }

    #[test]
    fn custom_extension() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("hello.json");
        fs::write(&file, "{}").unwrap();

        let reference = dir.path().join("hello");
        let resolved = resolve(reference.to_str().unwrap(), "json").unwrap();
        assert_eq!(resolved.as_path(), file.as_path());
        assert!(resolve(reference.to_str().unwrap(), DEFAULT_EXTENSION).is_err());
    }
}
