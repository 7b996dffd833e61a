//! Glob matching over the namespace tree: slash-separated
//! patterns, each element a shell-style glob (`*`, `?`, `[abc]`,
//! `\`-escape), with `match_dot`/`recursive`/`exact_match`/
//! `exact_match_except_last` options.

#[derive(Clone, Copy, Debug, Default)]
pub struct GlobOptions {
    pub match_dot: bool,
    pub recursive: bool,
    pub exact_match: bool,
    pub exact_match_except_last: bool,
}

/// One entry in a flattened namespace projection: a full slash-separated
/// path plus whether it names a directory (album/gallery/trash/shared
/// container) or a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobEntry {
    pub path: String,
    pub is_dir: bool,
    pub file_id: Option<String>,
}

/// Match `entries` against `pattern`, honoring `opts`. Results are sorted
/// by filename ascending; a directory and a file sharing a name sort the
/// directory first.
pub fn glob(entries: &[GlobEntry], pattern: &str, opts: &GlobOptions) -> Vec<GlobEntry> {
    let pattern_segs: Vec<&str> = pattern.split('/').collect();
    let mut out: Vec<GlobEntry> = Vec::new();

    for e in entries {
        let segs: Vec<&str> = e.path.split('/').collect();
        if !matches_path(&pattern_segs, &segs, opts) {
            continue;
        }
        out.push(e.clone());
        if opts.recursive && e.is_dir {
            let prefix = format!("{}/", e.path);
            for other in entries {
                if other.path.starts_with(&prefix) {
                    out.push(other.clone());
                }
            }
        }
    }

    out.sort_by(|a, b| {
        let a_name = a.path.rsplit('/').next().unwrap_or(&a.path);
        let b_name = b.path.rsplit('/').next().unwrap_or(&b.path);
        a_name.cmp(b_name).then_with(|| match (a.is_dir, b.is_dir) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => a.path.cmp(&b.path),
        })
    });
    out.dedup_by(|a, b| a.path == b.path);
    out
}

fn matches_path(pattern_segs: &[&str], path_segs: &[&str], opts: &GlobOptions) -> bool {
    if opts.exact_match {
        return pattern_segs == path_segs;
    }
    if pattern_segs.len() != path_segs.len() {
        return false;
    }
    let last = pattern_segs.len().saturating_sub(1);
    for (i, (p, s)) in pattern_segs.iter().zip(path_segs.iter()).enumerate() {
        let allow_wildcards = !opts.exact_match_except_last || i == last;
        if !match_element(p, s, allow_wildcards, opts.match_dot) {
            return false;
        }
    }
    true
}

fn match_element(pattern: &str, name: &str, allow_wildcards: bool, match_dot: bool) -> bool {
    if !allow_wildcards {
        return pattern == name;
    }
    if !match_dot && name.starts_with('.') && pattern_has_leading_wildcard(pattern) {
        return false;
    }
    glob_match(pattern.as_bytes(), name.as_bytes())
}

fn pattern_has_leading_wildcard(pattern: &str) -> bool {
    matches!(pattern.chars().next(), Some('*') | Some('?'))
}

/// Shell-style glob matcher supporting `*`, `?`, `[abc]`/`[a-z]`/`[!abc]`,
/// and `\`-escapes, via straightforward recursive backtracking.
fn glob_match(pattern: &[u8], name: &[u8]) -> bool {
    match (pattern.first(), name.first()) {
        (None, None) => true,
        (Some(b'*'), _) => {
            // try consuming zero chars of name, then progressively more.
            if glob_match(&pattern[1..], name) {
                return true;
            }
            if !name.is_empty() && glob_match(pattern, &name[1..]) {
                return true;
            }
            false
        }
        (Some(b'?'), Some(_)) => glob_match(&pattern[1..], &name[1..]),
        (Some(b'['), Some(&c)) => match parse_class(&pattern[1..]) {
            Some((matched_class, rest)) if matched_class.matches(c) => glob_match(rest, &name[1..]),
            _ => false,
        },
        (Some(b'\\'), Some(&c)) if pattern.len() > 1 => pattern[1] == c && glob_match(&pattern[2..], &name[1..]),
        (Some(&p), Some(&c)) => p == c && glob_match(&pattern[1..], &name[1..]),
        _ => false,
    }
}

struct CharClass<'a> {
    negate: bool,
    body: &'a [u8],
}

impl<'a> CharClass<'a> {
    fn matches(&self, c: u8) -> bool {
        let mut i = 0;
        let mut found = false;
        while i < self.body.len() {
            if i + 2 < self.body.len() && self.body[i + 1] == b'-' {
                if self.body[i] <= c && c <= self.body[i + 2] {
                    found = true;
                }
                i += 3;
            } else {
                if self.body[i] == c {
                    found = true;
                }
                i += 1;
            }
        }
        found != self.negate
    }
}

fn parse_class(rest: &[u8]) -> Option<(CharClass<'_>, &[u8])> {
    let (negate, rest) = match rest.first() {
        Some(b'!') => (true, &rest[1..]),
        _ => (false, rest),
    };
    let end = rest.iter().position(|&b| b == b']')?;
    Some((CharClass { negate, body: &rest[..end] }, &rest[end + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<GlobEntry> {
        // insertion order deliberately unsorted — glob() is responsible
        // for sorting, not the caller.
        vec![
            GlobEntry { path: "gallery".into(), is_dir: true, file_id: None },
            GlobEntry { path: "gallery/image000.jpg".into(), is_dir: false, file_id: Some("a".into()) },
            GlobEntry { path: "gallery/image001.jpg".into(), is_dir: false, file_id: Some("b".into()) },
            GlobEntry { path: ".trash".into(), is_dir: true, file_id: None },
            GlobEntry { path: ".trash/image002.jpg".into(), is_dir: false, file_id: Some("c".into()) },
            GlobEntry { path: "a".into(), is_dir: true, file_id: None },
            GlobEntry { path: "a/b".into(), is_dir: true, file_id: None },
            GlobEntry { path: "a/b/photo.jpg".into(), is_dir: false, file_id: Some("d".into()) },
        ]
    }

    #[test]
    fn star_matches_any_suffix() {
        let out = glob(&entries(), "gallery/*", &GlobOptions::default());
        let names: Vec<&str> = out.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(names, vec!["gallery/image000.jpg", "gallery/image001.jpg"]);
    }

    #[test]
    fn exact_match_requires_literal_equality() {
        let opts = GlobOptions { exact_match: true, ..Default::default() };
        let out = glob(&entries(), "gallery/image000.jpg", &opts);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, "gallery/image000.jpg");

        let out2 = glob(&entries(), "gallery/*", &opts);
        assert!(out2.is_empty());
    }

    #[test]
    fn match_dot_false_blocks_wildcard_on_dotfile() {
        let opts = GlobOptions { match_dot: false, ..Default::default() };
        let out = glob(&entries(), "*", &opts);
        assert!(!out.iter().any(|e| e.path == ".trash"));
    }

    #[test]
    fn match_dot_true_allows_wildcard_on_dotfile() {
        let opts = GlobOptions { match_dot: true, ..Default::default() };
        let out = glob(&entries(), "*", &opts);
        assert!(out.iter().any(|e| e.path == ".trash"));
    }

    #[test]
    fn bracket_class_matches_range() {
        let out = glob(&entries(), "gallery/image00[0-1].jpg", &GlobOptions::default());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn results_sorted_ascending_by_filename() {
        let out = glob(&entries(), "gallery/*", &GlobOptions::default());
        assert_eq!(out[0].path, "gallery/image000.jpg");
        assert_eq!(out[1].path, "gallery/image001.jpg");
    }
}
