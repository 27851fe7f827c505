//! Undo HTTrack's link rewriting in saved HTML.
//!
//! HTTrack turns every link it followed into a relative link to the
//! local copy. When the original markup is gone, the best that can be
//! done is to point those links back at the URLs the local files stand
//! for. This is a textual substitution over `href` and `src` attributes,
//! not an HTML parse, and some links will be missed.

use crate::{
    correlator::{Correlator, mangling},
    httrack::{decode_latin1, encode_latin1},
};
use regex::{Captures, Regex};
use url::Url;

const LINK_GRAMMAR: &str = r#"(?i)\b(?P<attribute>href|src)\s*=\s*(?:"(?P<double>[^"]*)"|'(?P<single>[^']*)')"#;

pub struct LinkRewriter<'table, 'log> {
    correlator: &'table Correlator<'log>,
    /// Where links to files that cannot be resolved are pointed instead.
    redirect_prefix: Option<&'table Url>,
    grammar: Regex,
}
impl<'table, 'log> LinkRewriter<'table, 'log> {
    /// # Errors
    ///
    /// Returns a `regex::Error` if the link grammar fails to compile.
    pub fn new(
        correlator: &'table Correlator<'log>,
        redirect_prefix: Option<&'table Url>,
    ) -> Result<Self, regex::Error> {
        return Ok(Self {
            correlator,
            redirect_prefix,
            grammar: Regex::new(LINK_GRAMMAR)?,
        });
    }

    /// Rewrite the local links of the page saved at `relative_path`.
    #[must_use]
    pub fn rewrite(&self, relative_path: &str, page: &[u8]) -> Vec<u8> {
        let text = decode_latin1(page);
        let rewritten = self.grammar.replace_all(&text, |captures: &Captures| {
            let (link, quote) = match (captures.name("double"), captures.name("single")) {
                (Some(link), _) => (link.as_str(), '"'),
                (None, Some(link)) => (link.as_str(), '\''),
                (None, None) => return captures[0].to_owned(),
            };
            let Some(original) = self.original_link(relative_path, link) else {
                return captures[0].to_owned();
            };
            return format!("{}={quote}{original}{quote}", &captures["attribute"]);
        });
        return encode_latin1(&rewritten);
    }

    fn original_link(&self, relative_path: &str, link: &str) -> Option<String> {
        let (link_path, fragment) = match link.find(['#', '?']) {
            Some(position) => link.split_at(position),
            None => (link, ""),
        };
        let target = resolve_local_link(relative_path, link_path)?;

        if let Some(url) = self.correlator.url_for_path(&target) {
            return Some(format!("{url}{fragment}"));
        }
        let prefix = self.redirect_prefix?;
        let rewritten = mangling::prefixed_url(prefix, &target)?;
        return Some(format!("{rewritten}{fragment}"));
    }
}

/// Resolve a relative link against the directory of the page it is in.
/// Absolute, scheme-qualified and fragment-only links are left alone.
fn resolve_local_link(page_path: &str, link_path: &str) -> Option<String> {
    if link_path.is_empty() || link_path.starts_with('/') || link_path.contains(':') {
        return None;
    }
    let mut segments: Vec<&str> = page_path.split('/').collect();
    segments.pop();
    for segment in link_path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            name => segments.push(name),
        }
    }
    if segments.is_empty() {
        return None;
    }
    return Some(segments.join("/"));
}
