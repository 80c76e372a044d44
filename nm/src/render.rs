//! Reproducible text rendering for `VIEW -l` and `VIEWFOLDER` (spec §4.1).

use crate::catalog::FileEntry;

/// Direct children of `folder` are entries whose filename has `folder` as a
/// prefix followed by exactly one more path segment.
fn direct_children<'a>(entries: &'a [FileEntry], folder: &str) -> Vec<&'a FileEntry> {
    let prefix = if folder.is_empty() { String::new() } else { format!("{folder}/") };
    entries
        .iter()
        .filter(|e| {
            e.filename
                .strip_prefix(prefix.as_str())
                .map(|rest| !rest.is_empty() && !rest.contains('/'))
                .unwrap_or(false)
        })
        .collect()
}

fn leaf_name(filename: &str) -> &str {
    filename.rsplit('/').next().unwrap_or(filename)
}

/// Folders before files; alphabetical by leaf name within each group.
fn ordered_children<'a>(entries: &'a [FileEntry], folder: &str) -> Vec<&'a FileEntry> {
    let mut kids = direct_children(entries, folder);
    kids.sort_by(|a, b| {
        b.is_folder
            .cmp(&a.is_folder)
            .then_with(|| leaf_name(&a.filename).cmp(leaf_name(&b.filename)))
    });
    kids
}

/// Box-drawing tree under `folder`, matching §4.1's prefix rules exactly.
pub fn render_folder_tree(entries: &[FileEntry], folder: &str) -> Vec<String> {
    let mut out = Vec::new();
    render_level(entries, folder, "", &mut out);
    out
}

fn render_level(entries: &[FileEntry], folder: &str, prefix: &str, out: &mut Vec<String>) {
    let kids = ordered_children(entries, folder);
    let n = kids.len();
    for (i, kid) in kids.into_iter().enumerate() {
        let is_last = i == n - 1;
        let branch = if is_last { "└── " } else { "├── " };
        let name = leaf_name(&kid.filename);
        if kid.is_folder {
            out.push(format!("{prefix}{branch}[DIR] {name}"));
            let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
            render_level(entries, &kid.filename, &child_prefix, out);
        } else {
            out.push(format!("{prefix}{branch}{name}"));
        }
    }
}

/// Fixed-width `VIEW -l` table row, stats fetched from SS by the caller.
pub fn format_view_row(e: &FileEntry, size: u64, words: u64, chars: u64) -> String {
    format!(
        "{:<32} {:<12} {:>10} {:>8} {:>8}",
        e.filename, e.owner, size, words, chars
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, is_folder: bool) -> FileEntry {
        FileEntry {
            filename: name.to_string(),
            owner: "alice".to_string(),
            is_folder,
            ss_ip: "127.0.0.1".to_string(),
            ss_client_port: 8000,
            readers: vec![],
            writers: vec![],
            created_time: 0,
            modified_time: 0,
            last_access_time: 0,
            word_count: 0,
            char_count: 0,
        }
    }

    #[test]
    fn tree_orders_folders_before_files_alphabetically() {
        let entries = vec![
            entry("docs/z.txt", false),
            entry("docs/sub", true),
            entry("docs/a.txt", false),
        ];
        let tree = render_folder_tree(&entries, "docs");
        assert_eq!(tree[0], "├── [DIR] sub");
        assert_eq!(tree[1], "├── a.txt");
        assert_eq!(tree[2], "└── z.txt");
    }

    #[test]
    fn nested_children_get_continuation_prefix() {
        let entries = vec![entry("docs/sub", true), entry("docs/sub/inner.txt", false)];
        let tree = render_folder_tree(&entries, "docs");
        assert_eq!(tree[0], "└── [DIR] sub");
        assert_eq!(tree[1], "    └── inner.txt");
    }
}
