//! Projects the on-disk `AlbumList` + file-set records into the virtual
//! namespace a caller lists and globs over: `gallery`,
//! `.trash`, one entry per local album (nested by path convention via
//! slashes in the decrypted name), and albums owned by someone else under
//! `shared/<name>`.

use std::collections::{HashMap, HashSet};

use crate::glob::GlobEntry;
use crate::sanitize::{disambiguate, sanitize_name};
use crate::types::{FileSet, SetKey};

pub const GALLERY: &str = "gallery";
pub const TRASH: &str = ".trash";
pub const SHARED_PREFIX: &str = "shared";

/// One local album, already decrypted, as input to namespace building.
pub struct AlbumView {
    pub album_id: String,
    pub decrypted_name: String,
    pub is_owner: bool,
    pub is_shared: bool,
}

/// The built namespace: full path -> set key for albums, plus the flat
/// listing [`glob::glob`] operates over.
pub struct Namespace {
    pub album_path_to_id: HashMap<String, String>,
    pub entries: Vec<GlobEntry>,
}

/// Build the namespace tree from the local album list and the file sets
/// keyed by [`SetKey::record_name`].
pub fn build(albums: &[AlbumView], file_sets: &HashMap<SetKey, FileSet>) -> Namespace {
    let mut album_path_to_id = HashMap::new();
    let mut dir_paths: HashSet<String> = HashSet::new();
    let mut entries = Vec::new();

    entries.push(GlobEntry { path: GALLERY.to_string(), is_dir: true, file_id: None });
    entries.push(GlobEntry { path: TRASH.to_string(), is_dir: true, file_id: None });
    dir_paths.insert(GALLERY.to_string());
    dir_paths.insert(TRASH.to_string());

    // sort albums so sibling-name collisions disambiguate deterministically
    // in a stable, caller-visible order (by album id, itself random but
    // fixed once assigned).
    let mut sorted: Vec<&AlbumView> = albums.iter().collect();
    sorted.sort_by(|a, b| a.album_id.cmp(&b.album_id));

    for album in sorted {
        let mut segments: Vec<String> = album
            .decrypted_name
            .split('/')
            .map(sanitize_name)
            .collect();
        if !album.is_owner && album.is_shared {
            segments.insert(0, SHARED_PREFIX.to_string());
        }

        let mut path_so_far = String::new();
        for (i, seg) in segments.iter().enumerate() {
            let is_leaf = i == segments.len() - 1;
            let parent = path_so_far.clone();
            let mut candidate = if parent.is_empty() { seg.clone() } else { format!("{parent}/{seg}") };

            if dir_paths.contains(&candidate) {
                if is_leaf {
                    // two albums map to the exact same full path: disambiguate
                    // the later one (sorted order above keeps this stable).
                    let siblings_taken: HashSet<String> = dir_paths
                        .iter()
                        .filter(|p| sibling_of(p, &parent))
                        .cloned()
                        .collect();
                    candidate = disambiguate(&candidate, &siblings_taken);
                } else {
                    // an existing implicit directory on the path; reuse it.
                }
            }

            dir_paths.insert(candidate.clone());
            if !entries.iter().any(|e| e.path == candidate) {
                entries.push(GlobEntry { path: candidate.clone(), is_dir: true, file_id: None });
            }
            path_so_far = candidate;
        }

        album_path_to_id.insert(path_so_far.clone(), album.album_id.clone());
    }

    // File entries are keyed by file id, not name: the decrypted filename
    // lives inside the sealed header, so resolving it requires the caller's
    // key material. `build` only lays down the directory skeleton; callers
    // add resolved files one at a time via [`insert_file`] once headers are
    // open, which is also where per-directory name collisions are caught.
    let _ = file_sets;

    Namespace { album_path_to_id, entries }
}

/// Insert a resolved (decrypted, sanitized) file name into a namespace
/// already built by [`build`], disambiguating against siblings in the
/// same directory.
pub fn insert_file(ns: &mut Namespace, dir_path: &str, file_id: &str, sanitized_name: &str) -> String {
    let taken: HashSet<String> = ns
        .entries
        .iter()
        .filter(|e| sibling_of(&e.path, dir_path))
        .map(|e| e.path.rsplit('/').next().unwrap_or(&e.path).to_string())
        .collect();
    let final_name = disambiguate(sanitized_name, &taken);
    let full_path = if dir_path.is_empty() { final_name.clone() } else { format!("{dir_path}/{final_name}") };
    ns.entries.push(GlobEntry { path: full_path.clone(), is_dir: false, file_id: Some(file_id.to_string()) });
    full_path
}

fn sibling_of(path: &str, parent: &str) -> bool {
    match path.rfind('/') {
        Some(idx) => &path[..idx] == parent,
        None => parent.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gallery_and_trash_always_present() {
        let ns = build(&[], &HashMap::new());
        let names: Vec<&str> = ns.entries.iter().map(|e| e.path.as_str()).collect();
        assert!(names.contains(&"gallery"));
        assert!(names.contains(&".trash"));
    }

    #[test]
    fn nested_album_path_creates_intermediate_directories() {
        let albums = vec![AlbumView {
            album_id: "id1".into(),
            decrypted_name: "a/b/c/d".into(),
            is_owner: true,
            is_shared: false,
        }];
        let ns = build(&albums, &HashMap::new());
        let names: HashSet<&str> = ns.entries.iter().map(|e| e.path.as_str()).collect();
        for expect in ["a", "a/b", "a/b/c", "a/b/c/d"] {
            assert!(names.contains(expect), "missing {expect}");
        }
        assert_eq!(ns.album_path_to_id.get("a/b/c/d"), Some(&"id1".to_string()));
    }

    #[test]
    fn shared_non_owner_album_nests_under_shared_prefix() {
        let albums = vec![AlbumView {
            album_id: "id1".into(),
            decrypted_name: "alpha".into(),
            is_owner: false,
            is_shared: true,
        }];
        let ns = build(&albums, &HashMap::new());
        assert!(ns.album_path_to_id.contains_key("shared/alpha"));
    }

    #[test]
    fn colliding_album_names_get_disambiguated() {
        let albums = vec![
            AlbumView { album_id: "id1".into(), decrypted_name: "alpha".into(), is_owner: true, is_shared: false },
            AlbumView { album_id: "id2".into(), decrypted_name: "alpha".into(), is_owner: true, is_shared: false },
        ];
        let ns = build(&albums, &HashMap::new());
        assert!(ns.album_path_to_id.contains_key("alpha"));
        assert!(ns.album_path_to_id.contains_key("alpha (1)"));
    }
}
