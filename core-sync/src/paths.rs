//! Mapping between remote paths, root-relative record paths and local files.

use std::path::{Path, PathBuf};

/// Make one path component safe on common filesystems.
pub fn sanitize_component(component: &str) -> String {
    let mut out: String = component
        .chars()
        .map(|c| match c {
            '<' => '(',
            '>' => ')',
            '"' => '\'',
            ':' | '|' | '?' | '*' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if out.ends_with('.') || out.ends_with(' ') {
        out.push('_');
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}

/// Local file for a root-relative path (`A/doc.docx`) below `root`.
pub fn local_path(root: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .fold(root.to_path_buf(), |path, part| path.join(sanitize_component(part)))
}

/// Root-relative path with every component sanitized, `/`-separated.
///
/// Artifact names derive from this so they line up with [`local_path`].
pub fn sanitize_relative(relative: &str) -> String {
    relative
        .split('/')
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .map(sanitize_component)
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a remote folder path and a child name.
pub fn join_remote(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{}{}", parent, name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Join a root-relative folder prefix and a child name.
pub fn join_relative(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// Whether `path` lies at or below the root-relative `folder`.
pub fn is_within(path: &str, folder: &str) -> bool {
    folder.is_empty()
        || path == folder
        || (path.len() > folder.len()
            && path.starts_with(folder)
            && path.as_bytes()[folder.len()] == b'/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("a<b>.txt"), "a(b).txt");
        assert_eq!(sanitize_component("say \"hi\""), "say 'hi'");
        assert_eq!(sanitize_component("a:b|c?d*e\\f"), "a_b_c_d_e_f");
        assert_eq!(sanitize_component("tab\there"), "tab_here");
        assert_eq!(sanitize_component("dots..."), "dots..._");
        assert_eq!(sanitize_component("trailing "), "trailing _");
        assert_eq!(sanitize_component("plain.docx"), "plain.docx");
    }

    #[test]
    fn test_local_path() {
        let root = Path::new("/data/downloads");
        assert_eq!(
            local_path(root, "A/Q1: plan?.docx"),
            PathBuf::from("/data/downloads/A/Q1_ plan_.docx")
        );
        assert_eq!(
            local_path(root, "../etc/passwd"),
            PathBuf::from("/data/downloads/etc/passwd")
        );
    }

    #[test]
    fn test_sanitize_relative_matches_local_path() {
        let root = Path::new("/out");
        let relative = sanitize_relative("A/Q1: plan?.docx");
        assert_eq!(relative, "A/Q1_ plan_.docx");
        assert_eq!(root.join(&relative), local_path(root, "A/Q1: plan?.docx"));
        assert_eq!(sanitize_relative(&relative), relative);
    }

    #[test]
    fn test_join() {
        assert_eq!(join_remote("/", "A"), "/A");
        assert_eq!(join_remote("/A", "b.txt"), "/A/b.txt");
        assert_eq!(join_relative("", "A"), "A");
        assert_eq!(join_relative("A", "b.txt"), "A/b.txt");
    }

    #[test]
    fn test_is_within() {
        assert!(is_within("A/b.txt", "A"));
        assert!(is_within("A/B/c.txt", "A"));
        assert!(!is_within("AB/c.txt", "A"));
        assert!(is_within("anything", ""));
    }
}
