//! Filename validation cosmetics (§1 lists this as an out-of-scope helper,
//! consumed as a valid/invalid check). Grounded on `is_valid_filename` in
//! `original_source/nm/src/main.c`: alphanumeric plus `. - _ /`, no spaces,
//! must carry an extension.

pub fn is_valid_filename(name: &str) -> bool {
    if name.is_empty() || name.contains(' ') {
        return false;
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | '/'))
    {
        return false;
    }
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => true,
        _ => false,
    }
}

/// Folder paths don't require an extension, but still forbid spaces and
/// invalid characters.
pub fn is_valid_folder_path(name: &str) -> bool {
    if name.is_empty() || name.contains(' ') || name.starts_with('/') {
        return false;
    }
    name.chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | '/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_spaces_and_missing_extension() {
        assert!(!is_valid_filename("has space.txt"));
        assert!(!is_valid_filename("noext"));
        assert!(!is_valid_filename(""));
        assert!(!is_valid_filename(".hidden"));
        assert!(!is_valid_filename("trailing."));
    }

    #[test]
    fn accepts_reasonable_names() {
        assert!(is_valid_filename("notes.txt"));
        assert!(is_valid_filename("docs/essay.md"));
        assert!(is_valid_filename("a-b_c.v2.txt"));
    }
}
