//! Validation of user-chosen knowledge base and file names.

/// Characters that may not appear in knowledge base or file names.
pub const FORBIDDEN_NAME_CHARS: &[char] = &['?', ',', '"', '/', '\\', '*', '<', '>', '|'];

/// File extensions accepted by the Markdown import endpoint.
pub const IMPORT_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

/// Image extensions accepted by the upload endpoint.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

/// Returns `true` if `name` is non-blank and free of forbidden characters.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty() && !name.contains(FORBIDDEN_NAME_CHARS)
}

/// Splits an uploaded file name into stem and lower-cased extension.
///
/// Only the final path component is considered, so client-supplied
/// directories are ignored.
#[must_use]
pub fn split_extension(file_name: &str) -> Option<(&str, String)> {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    Some((stem, ext.to_ascii_lowercase()))
}

/// Returns the stem of an importable document name, or `None` if the
/// extension is not one of [`IMPORT_EXTENSIONS`].
#[must_use]
pub fn import_stem(file_name: &str) -> Option<&str> {
    let (stem, ext) = split_extension(file_name)?;
    IMPORT_EXTENSIONS.contains(&ext.as_str()).then_some(stem)
}

/// Returns `true` if `file_name` has one of the [`IMAGE_EXTENSIONS`].
#[must_use]
pub fn is_image_name(file_name: &str) -> bool {
    split_extension(file_name).is_some_and(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Returns `true` if `segment` is safe to use as a single path component.
#[must_use]
pub fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0'])
}

/// MIME type for a served image, derived from its extension.
#[must_use]
pub fn image_content_type(file_name: &str) -> &'static str {
    match split_extension(file_name).map(|(_, ext)| ext).as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_forbidden_char_is_rejected() {
        for c in FORBIDDEN_NAME_CHARS {
            assert!(!is_valid_name(&format!("a{c}b")), "accepted {c:?}");
        }
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("   "));
    }

    #[test]
    fn ordinary_names_pass() {
        assert!(is_valid_name("Rust notes"));
        assert!(is_valid_name("读书笔记-2024"));
        assert!(is_valid_name("a.b_c"));
    }

    #[test]
    fn import_accepts_markdown_and_text() {
        assert_eq!(import_stem("guide.md"), Some("guide"));
        assert_eq!(import_stem("guide.MARKDOWN"), Some("guide"));
        assert_eq!(import_stem("dir/notes.txt"), Some("notes"));
        assert_eq!(import_stem("report.pdf"), None);
        assert_eq!(import_stem("README"), None);
        assert_eq!(import_stem(".md"), None);
    }

    #[test]
    fn image_extensions() {
        assert!(is_image_name("a.PNG"));
        assert!(is_image_name("photo.jpeg"));
        assert!(!is_image_name("script.svg"));
        assert_eq!(image_content_type("x.jpg"), "image/jpeg");
        assert_eq!(image_content_type("x.gif"), "image/gif");
        assert_eq!(image_content_type("x"), "application/octet-stream");
    }

    #[test]
    fn path_segments() {
        assert!(is_plain_segment("1700000000_cat.png"));
        assert!(!is_plain_segment(".."));
        assert!(!is_plain_segment("a/b"));
        assert!(!is_plain_segment("a\\b"));
        assert!(!is_plain_segment(""));
    }
}
