//! Translating virtual mount paths to mirror-relative paths.

use std::path::{Path, PathBuf};

/// Translate an absolute virtual path into a path relative to the mirror.
///
/// The root path `/` maps to `.`. Any other path has its leading slash
/// stripped. An empty path is not a valid virtual path; callers must treat
/// [`None`] as a bad-path error.
///
/// This function performs no filesystem I/O.
pub fn relative_path(path: &Path) -> Option<PathBuf>
{
    let path = path.to_str()?;

    if path.is_empty() {
        return None;
    }

    if path == "/" {
        return Some(PathBuf::from("."));
    }

    Some(PathBuf::from(path.strip_prefix('/').unwrap_or(path)))
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn root_maps_to_dot()
    {
        assert_eq!(relative_path(Path::new("/")), Some(PathBuf::from(".")));
    }

    #[test]
    fn strips_leading_slash()
    {
        assert_eq!(
            relative_path(Path::new("/a/b/c")),
            Some(PathBuf::from("a/b/c")),
        );
    }

    #[test]
    fn empty_is_bad_path()
    {
        assert_eq!(relative_path(Path::new("")), None);
    }

    #[test]
    fn roundtrips_for_arbitrary_paths()
    {
        for p in ["a", "a/b", "a/b/c.txt", "very/deep/nested/path"] {
            let virtual_path = PathBuf::from("/").join(p);
            assert_eq!(relative_path(&virtual_path), Some(PathBuf::from(p)));
        }
    }
}
