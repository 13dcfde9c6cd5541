//! Remote path handling
//!
//! Remote paths are always `/`-separated and absolute once normalized. These
//! helpers are purely lexical and never touch the network.

/// Normalize a remote directory path
///
/// Produces an absolute path with no empty, `.` or `..` components. `..` at the
/// root stays at the root. An empty input refers to the server root.
///
/// ```
/// use ftpseek_common::path::normalize_remote_path;
///
/// assert_eq!(normalize_remote_path(""), "/");
/// assert_eq!(normalize_remote_path("products/trends/"), "/products/trends");
/// assert_eq!(normalize_remote_path("/a/./b/../c"), "/a/c");
/// ```
#[must_use]
pub fn normalize_remote_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            normal => parts.push(normal),
        }
    }
    format!("/{}", parts.join("/"))
}

/// Join a directory and an entry name into an absolute path
#[must_use]
pub fn join_remote_path(dir: &str, name: &str) -> String {
    let dir = normalize_remote_path(dir);
    if dir == "/" {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Whether `path` is `root` itself or lies beneath it
///
/// Both arguments are normalized first.
#[must_use]
pub fn is_within(path: &str, root: &str) -> bool {
    let path = normalize_remote_path(path);
    let root = normalize_remote_path(root);
    root == "/" || path == root || path.starts_with(&format!("{root}/"))
}
