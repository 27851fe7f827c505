//! Best-effort reversal of the way HTTrack names the files it saves.
//!
//! HTTrack stores `http://host/path` as `host/path`, saves directory URLs
//! as `index.html`, percent-escapes some characters and, for query
//! strings, appends a hash to the file name. Only the first three can
//! be undone; a query string is lost for good.

use url::Url;

const DIRECTORY_INDEX: &str = "index.html";

/// # Make a logged local path relative to the mirror root
///
/// HTTrack logs absolute paths under its output directory. When that
/// directory is unknown, or the mirror has since been moved, the last
/// occurrence of the mirror directory's own name is used as the anchor.
#[must_use]
pub fn relative_local_path(
    local_path: &str,
    output_dir: Option<&str>,
    mirror_name: Option<&str>,
) -> Option<String> {
    let local_path = local_path.replace('\\', "/");

    if let Some(relative) = output_dir.and_then(|output_dir| return local_path.strip_prefix(output_dir)) {
        return Some(relative.to_owned());
    }
    if let Some(mirror_name) = mirror_name {
        let anchor = format!("/{mirror_name}/");
        if let Some(position) = local_path.rfind(&anchor) {
            return Some(local_path[position + anchor.len()..].to_owned());
        }
    }
    if local_path.starts_with('/') || local_path.get(1..3) == Some(":/") {
        return None;
    }
    return Some(local_path.trim_start_matches("./").to_owned());
}

/// Decode `%XX` escapes, leaving malformed escapes untouched.
#[must_use]
pub fn percent_decode(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut position = 0;
    while position < bytes.len() {
        if bytes[position] == b'%' {
            let escape = path
                .get(position + 1..position + 3)
                .and_then(|hex| return u8::from_str_radix(hex, 16).ok());
            if let Some(byte) = escape {
                decoded.push(byte);
                position += 3;
                continue;
            }
        }
        decoded.push(bytes[position]);
        position += 1;
    }
    return String::from_utf8_lossy(&decoded).into_owned();
}

/// # Guess a URL from a mirror-relative path
///
/// The first segment must look like a host name. HTTrack writes a port
/// as `host_port`.
#[must_use]
pub fn url_from_local_path(relative_path: &str) -> Option<String> {
    let (host_segment, path) = relative_path.split_once('/')?;
    let host = match host_segment.rsplit_once('_') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|byte| return byte.is_ascii_digit()) => {
            format!("{name}:{port}")
        }
        _ => host_segment.to_owned(),
    };
    if !(host.contains('.') || host.starts_with("localhost")) {
        return None;
    }

    let path = percent_decode(path);
    let path = match path.strip_suffix(DIRECTORY_INDEX) {
        Some(directory) if directory.is_empty() || directory.ends_with('/') => directory.to_owned(),
        _ => path,
    };

    let url = Url::parse(&format!("http://{host}/{path}")).ok()?;
    url.host_str()?;
    return Some(url.to_string());
}

/// # Where a mirror serves a file
///
/// `prefix` must end in `/`. A `#` or `?` in the path is part of the
/// file name, so it is escaped rather than read as a fragment or query.
#[must_use]
pub fn prefixed_url(prefix: &Url, relative_path: &str) -> Option<String> {
    let escaped = relative_path.replace('#', "%23").replace('?', "%3F");
    return prefix
        .join(&format!("./{escaped}"))
        .ok()
        .map(|url| return url.to_string());
}

/// Whether a path names something HTTrack would have saved as HTML.
#[must_use]
pub fn is_html_path(relative_path: &str) -> bool {
    let lowercase = relative_path.to_ascii_lowercase();
    return lowercase.ends_with(".html") || lowercase.ends_with(".htm");
}

/// Mime type from the file extension, for files the cache log does not cover.
#[must_use]
pub fn mime_from_extension(relative_path: &str) -> &'static str {
    let extension = relative_path
        .rsplit_once('.')
        .map(|(_, extension)| return extension.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "html" | "htm" => return "text/html",
        "css" => return "text/css",
        "js" => return "application/javascript",
        "json" => return "application/json",
        "txt" => return "text/plain",
        "xml" => return "application/xml",
        "png" => return "image/png",
        "jpg" | "jpeg" => return "image/jpeg",
        "gif" => return "image/gif",
        "svg" => return "image/svg+xml",
        "ico" => return "image/x-icon",
        "pdf" => return "application/pdf",
        "woff" => return "font/woff",
        "woff2" => return "font/woff2",
        _ => return "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::{mime_from_extension, percent_decode, prefixed_url, relative_local_path, url_from_local_path};
    use url::Url;
    use pretty_assertions::assert_eq;

    #[test]
    fn relative_paths() {
        assert_eq!(
            relative_local_path("/srv/mirror/example.org/index.html", Some("/srv/mirror/"), None).as_deref(),
            Some("example.org/index.html")
        );
        // the mirror was moved after crawling
        assert_eq!(
            relative_local_path("/old/place/mirror/example.org/a.css", Some("/srv/mirror/"), Some("mirror")).as_deref(),
            Some("example.org/a.css")
        );
        assert_eq!(
            relative_local_path("C:\\Mirrors\\site\\example.org\\a.css", Some("C:/Mirrors/site/"), None).as_deref(),
            Some("example.org/a.css")
        );
        assert_eq!(
            relative_local_path("example.org/a.css", None, None).as_deref(),
            Some("example.org/a.css")
        );
        assert_eq!(relative_local_path("/elsewhere/a.css", None, Some("mirror")), None);
    }

    #[test]
    fn percent_decoding() {
        assert_eq!(percent_decode("a%20b%2Fc"), "a b/c");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }

    #[test]
    fn urls_from_paths() {
        let test_cases = [
            ("example.org/index.html", Some("http://example.org/")),
            ("example.org/docs/index.html", Some("http://example.org/docs/")),
            ("example.org/docs/page.html", Some("http://example.org/docs/page.html")),
            ("example.org/my%20file.pdf", Some("http://example.org/my%20file.pdf")),
            ("localhost_8080/a.txt", Some("http://localhost:8080/a.txt")),
            ("notahost/a.txt", None),
            ("toplevel.txt", None),
        ];
        for (path, expected) in test_cases {
            assert_eq!(url_from_local_path(path).as_deref(), expected, "{path}");
        }
    }

    #[test]
    fn mime_guesses() {
        assert_eq!(mime_from_extension("a/b/style.CSS"), "text/css");
        assert_eq!(mime_from_extension("a/b/README"), "application/octet-stream");
    }

    #[test]
    fn prefixed_urls_keep_the_whole_file_name() {
        let prefix = Url::parse("http://mirror.example/archive/").unwrap();
        assert_eq!(
            prefixed_url(&prefix, "example.org/index.html").as_deref(),
            Some("http://mirror.example/archive/example.org/index.html")
        );
        assert_eq!(
            prefixed_url(&prefix, "example.org/notes#1?.html").as_deref(),
            Some("http://mirror.example/archive/example.org/notes%231%3F.html")
        );
    }
}
