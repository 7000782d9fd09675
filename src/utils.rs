//! Utility functions for path manipulation

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Maximum number of rename attempts when resolving destination collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Make a display name safe to use as one path segment
///
/// Forward and back slashes become `-`, so a subject named `"A/B"` is written
/// to directory `"A-B"`. Names that would not name a directory of their own
/// (empty, `.` or `..`) become `_`.
///
/// ```
/// use pastpaper_dl::utils::sanitize_path_component;
///
/// assert_eq!(sanitize_path_component("A/B"), "A-B");
/// assert_eq!(sanitize_path_component(r"Art\Design"), "Art-Design");
/// assert_eq!(sanitize_path_component(".."), "_");
/// ```
pub fn sanitize_path_component(name: &str) -> String {
    let replaced = name.replace(['/', '\\'], "-");
    match replaced.trim() {
        "" | "." | ".." => "_".to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// Reduce a remote file name to something that stays inside its directory
///
/// Returns `None` when nothing usable is left (empty, `.` or `..`).
pub fn safe_file_name(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    match last {
        "" | "." | ".." => None,
        other => Some(other.to_string()),
    }
}

/// Pick a destination not already claimed by another file of the same job
///
/// A taken `dir/paper.pdf` becomes `dir/paper (1).pdf`, then `dir/paper (2).pdf`,
/// and so on. The chosen path is added to `taken`.
pub fn claim_unique_path(path: PathBuf, taken: &mut HashSet<PathBuf>) -> PathBuf {
    if taken.insert(path.clone()) {
        return path;
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());
    let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();

    for i in 1..=MAX_RENAME_ATTEMPTS {
        let name = match &extension {
            Some(ext) => format!("{stem} ({i}).{ext}"),
            None => format!("{stem} ({i})"),
        };
        let candidate = parent.join(name);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
    }

    // Exhausted; the later file overwrites the earlier one
    path
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_both_slashes() {
        assert_eq!(sanitize_path_component("A/B"), "A-B");
        assert_eq!(sanitize_path_component("A\\B/C"), "A-B-C");
        assert_eq!(sanitize_path_component("2023 May June"), "2023 May June");
    }

    #[test]
    fn sanitize_never_yields_a_relative_component() {
        assert_eq!(sanitize_path_component(""), "_");
        assert_eq!(sanitize_path_component("   "), "_");
        assert_eq!(sanitize_path_component("."), "_");
        assert_eq!(sanitize_path_component(".."), "_");
        assert_eq!(sanitize_path_component(" .. "), "_");
        assert_eq!(sanitize_path_component("..."), "...");
        assert_eq!(sanitize_path_component(" Physics "), "Physics");

        let root = std::path::Path::new("/job");
        let nested = root
            .join(sanitize_path_component(".."))
            .join(sanitize_path_component("."));
        assert!(nested.starts_with(root));
        assert_eq!(nested.components().count(), 4);
    }

    #[test]
    fn safe_file_name_keeps_last_segment() {
        assert_eq!(safe_file_name("0580_s23_qp_11.pdf").unwrap(), "0580_s23_qp_11.pdf");
        assert_eq!(safe_file_name("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(safe_file_name("dir\\file.pdf").unwrap(), "file.pdf");
        assert!(safe_file_name("..").is_none());
        assert!(safe_file_name("dir/").is_none());
    }

    #[test]
    fn claim_unique_path_suffixes_duplicates() {
        let mut taken = HashSet::new();
        let first = claim_unique_path(PathBuf::from("/job/S/2023/qp.pdf"), &mut taken);
        let second = claim_unique_path(PathBuf::from("/job/S/2023/qp.pdf"), &mut taken);
        let third = claim_unique_path(PathBuf::from("/job/S/2023/qp.pdf"), &mut taken);

        assert_eq!(first, PathBuf::from("/job/S/2023/qp.pdf"));
        assert_eq!(second, PathBuf::from("/job/S/2023/qp (1).pdf"));
        assert_eq!(third, PathBuf::from("/job/S/2023/qp (2).pdf"));
    }

    #[test]
    fn claim_unique_path_without_extension() {
        let mut taken = HashSet::new();
        claim_unique_path(PathBuf::from("/job/readme"), &mut taken);
        let second = claim_unique_path(PathBuf::from("/job/readme"), &mut taken);
        assert_eq!(second, PathBuf::from("/job/readme (1)"));
    }
}
