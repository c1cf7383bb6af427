// src/kernel/fs/path.rs
//! Path resolution
//!
//! Plain component-by-component traversal over [`Node::find`]. Absolute
//! paths resolve from the filesystem root; relative paths resolve from
//! the calling process's `cwd_node`.
//!
//! The historical TOCTOU bug this spec calls out — measuring a user
//! pointer's string length by walking it before validating the pointer
//! range lies in user space — is a syscall-argument-copying concern, not
//! a path-resolution one, and is reproduced in
//! `kernel::syscall::copy_user_path` instead. `find_path_node` here
//! always receives an already-owned, already-validated `&str`.

use alloc::sync::Arc;

use super::node::{split_path, Node};
use super::{FileError, FileResult};

/// Resolves `path` against `root`/`cwd`, walking one path component at a
/// time through [`Node::find`].
pub fn find_path_node(root: &Arc<dyn Node>, cwd: &Arc<dyn Node>, path: &str) -> FileResult<Arc<dyn Node>> {
    let mut current = if path.starts_with('/') { root.clone() } else { cwd.clone() };

    for component in split_path(path) {
        if component == "." {
            continue;
        }
        if !current.is_dir() {
            return Err(FileError::InvalidInput);
        }
        current = current.find(component)?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::fs::ramdisk::{dir, file};

    #[test]
    fn resolves_absolute_path() {
        let leaf: Arc<dyn Node> = Arc::new(file(b"hi"));
        let sub = dir(alloc::vec![("leaf".into(), leaf)]);
        let root: Arc<dyn Node> = Arc::new(dir(alloc::vec![("sub".into(), Arc::new(sub))]));
        let cwd = root.clone();

        let found = find_path_node(&root, &cwd, "/sub/leaf").unwrap();
        assert!(found.is_file());
        assert_eq!(found.size_in_bytes(), 2);
    }

    #[test]
    fn missing_component_errors() {
        let root: Arc<dyn Node> = Arc::new(dir(alloc::vec![]));
        let cwd = root.clone();
        assert!(find_path_node(&root, &cwd, "/nope").is_err());
    }
}
