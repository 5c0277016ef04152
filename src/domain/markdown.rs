//! Image-link rewriting for stored Markdown documents.
//!
//! On disk a document references its images relative to its own
//! directory (`images/<name>`). Clients receive the same document with
//! those links pointing at the image endpoint
//! (`<prefix>/<index_id>/<file_id>/<name>`), and edited documents coming
//! back from clients are rewritten the other way before being stored.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Matches `![alt](url)` and `![alt](url "title")`.
static IMAGE_LINK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"!\[(.*?)\]\((.*?)(?: "(.*?)")?\)"#).ok());

/// Directory, relative to a document, that holds its images.
pub const IMAGE_DIR: &str = "images";

fn render(caps: &Captures<'_>, url: &str) -> String {
    let alt = caps.get(1).map_or("", |m| m.as_str());
    match caps.get(3) {
        Some(title) => format!("![{alt}]({url} \"{}\")", title.as_str()),
        None => format!("![{alt}]({url})"),
    }
}

fn file_name_of(path: &str) -> &str {
    path.rsplit(['/', '\\'])
        .find(|s| !s.is_empty())
        .unwrap_or(path)
}

fn is_remote(url: &str) -> bool {
    url.contains("://") || url.starts_with("data:")
}

fn rewrite<'a>(markdown: &'a str, map: impl Fn(&str) -> Option<String>) -> Cow<'a, str> {
    let Some(re) = IMAGE_LINK.as_ref() else {
        return Cow::Borrowed(markdown);
    };
    re.replace_all(markdown, |caps: &Captures<'_>| {
        let url = caps.get(2).map_or("", |m| m.as_str());
        match map(url) {
            Some(new_url) => render(caps, &new_url),
            None => caps.get(0).map_or(String::new(), |m| m.as_str().to_string()),
        }
    })
}

/// Rewrites local image links to URLs served by the image endpoint.
///
/// Remote (`scheme://`) and `data:` URLs are left untouched. `index_segment`
/// is the knowledge base id, or `share` for share snapshots.
#[must_use]
pub fn to_web_links<'a>(
    markdown: &'a str,
    prefix: &str,
    index_segment: &str,
    file_segment: &str,
) -> Cow<'a, str> {
    let prefix = prefix.trim_end_matches('/');
    rewrite(markdown, |url| {
        if url.is_empty() || is_remote(url) {
            return None;
        }
        Some(format!(
            "{prefix}/{index_segment}/{file_segment}/{}",
            file_name_of(url)
        ))
    })
}

/// Rewrites image-endpoint URLs back to document-relative `images/` paths.
///
/// Links that do not start with `prefix` are left untouched.
#[must_use]
pub fn to_local_links<'a>(markdown: &'a str, prefix: &str) -> Cow<'a, str> {
    let prefix = prefix.trim_end_matches('/');
    rewrite(markdown, |url| {
        let rest = url.strip_prefix(prefix)?;
        if !rest.starts_with('/') {
            return None;
        }
        Some(format!("{IMAGE_DIR}/{}", file_name_of(rest)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "http://localhost:8086/images";

    #[test]
    fn local_links_become_urls() {
        let md = "# Title\n\n![cat](images/cat.png)\n\ntext";
        let out = to_web_links(md, PREFIX, "idx", "fid");
        assert_eq!(
            out,
            "# Title\n\n![cat](http://localhost:8086/images/idx/fid/cat.png)\n\ntext"
        );
    }

    #[test]
    fn titles_and_backslashes_are_handled() {
        let md = r#"![church](images\image10.png "a church")"#;
        let out = to_web_links(md, PREFIX, "idx", "fid");
        assert_eq!(
            out,
            r#"![church](http://localhost:8086/images/idx/fid/image10.png "a church")"#
        );
    }

    #[test]
    fn remote_links_are_kept() {
        let md = "![x](https://example.com/x.png) ![y](data:image/png;base64,AAAA)";
        assert_eq!(to_web_links(md, PREFIX, "i", "f"), md);
    }

    #[test]
    fn server_urls_become_local() {
        let md = "a ![cat](http://localhost:8086/images/idx/fid/cat.png) b";
        assert_eq!(to_local_links(md, PREFIX), "a ![cat](images/cat.png) b");
    }

    #[test]
    fn foreign_urls_are_not_localised() {
        let md = "![x](https://cdn.example.com/images/x.png)";
        assert_eq!(to_local_links(md, PREFIX), md);
    }

    #[test]
    fn documents_without_images_are_borrowed() {
        let md = "plain text";
        assert!(matches!(to_web_links(md, PREFIX, "i", "f"), Cow::Borrowed(_)));
    }

    #[test]
    fn links_survive_a_read_edit_cycle() {
        let md = "![a](images/a.png)\n![b](images/b.gif \"t\")";
        let web = to_web_links(md, PREFIX, "i", "f");
        assert_eq!(to_local_links(&web, PREFIX), md);
    }
}
