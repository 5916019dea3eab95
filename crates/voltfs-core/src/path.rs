//! Path splitting and validation.
//!
//! Paths are absolute, `/`-separated component lists resolved from the
//! session root. There is no `.`/`..` traversal; the namespace is a tree
//! reached only from its root.

use crate::{FsError, FsResult};

/// Splits a path into its non-empty components.
///
/// Repeated and trailing slashes are tolerated; `"/"` yields no components.
pub fn split(path: &str) -> FsResult<Vec<&str>> {
    if !path.starts_with('/') {
        return Err(FsError::InvalidArgument(format!(
            "path must be absolute: {path}"
        )));
    }
    let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    for component in &components {
        validate_name(component)?;
    }
    Ok(components)
}

/// Splits a path into (parent components, final name).
///
/// Fails `InvalidArgument` for the root path, which names no entry.
pub fn split_parent(path: &str) -> FsResult<(Vec<&str>, &str)> {
    let mut components = split(path)?;
    match components.pop() {
        Some(name) => Ok((components, name)),
        None => Err(FsError::InvalidArgument(
            "root has no parent entry".to_string(),
        )),
    }
}

/// Validates a single entry name.
pub fn validate_name(name: &str) -> FsResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(FsError::InvalidArgument(format!("bad entry name: {name}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_root() {
        assert!(split("/").unwrap().is_empty());
    }

    #[test]
    fn test_split_components() {
        assert_eq!(split("/a/b/c").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(split("//a///b/").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_relative_path_rejected() {
        assert!(matches!(split("a/b"), Err(FsError::InvalidArgument(_))));
    }

    #[test]
    fn test_split_parent() {
        let (parent, name) = split_parent("/a/b/c").unwrap();
        assert_eq!(parent, vec!["a", "b"]);
        assert_eq!(name, "c");

        let (parent, name) = split_parent("/top").unwrap();
        assert!(parent.is_empty());
        assert_eq!(name, "top");
    }

    #[test]
    fn test_split_parent_of_root_fails() {
        assert!(matches!(
            split_parent("/"),
            Err(FsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_dot_names_rejected() {
        assert!(validate_name(".").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("ok.txt").is_ok());
    }
}
