//! Splitting a buffered multipart body into parts.
//!
//! Works on raw bytes: the delimiter and the header/content separator are
//! located with a plain subslice search, so binary file content survives
//! unchanged as long as it does not itself contain the delimiter line.

use std::sync::LazyLock;

use regex::Regex;

static NAME_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bname="([^"]+)""#).expect("valid name pattern"));
static FILENAME_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bfilename="([^"]+)""#).expect("valid filename pattern"));

const HEADER_SEPARATOR: &[u8] = b"\r\n\r\n";
const CLOSING_MARKER: &[u8] = b"--";

/// One segment of a multipart body, borrowed from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part<'a> {
    /// Raw part header block.
    pub headers: &'a [u8],
    /// Content between the blank line and the next delimiter.
    pub content: &'a [u8],
}

impl<'a> Part<'a> {
    /// The `name`/`filename` attributes of this part's Content-Disposition line.
    pub fn disposition(&self) -> Option<Disposition> {
        let headers = String::from_utf8_lossy(self.headers);
        headers
            .split("\r\n")
            .find(|line| {
                line.split_once(':')
                    .is_some_and(|(name, _)| name.trim().eq_ignore_ascii_case("Content-Disposition"))
            })
            .map(Disposition::parse)
    }

    /// Content with the line break that precedes the next delimiter removed.
    pub fn trimmed_content(&self) -> &'a [u8] {
        self.content.strip_suffix(b"\r\n").unwrap_or(self.content)
    }
}

/// Attributes extracted from a Content-Disposition header line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Disposition {
    pub name: Option<String>,
    pub filename: Option<String>,
}

impl Disposition {
    pub fn parse(line: &str) -> Self {
        let capture = |re: &Regex| re.captures(line).map(|c| c[1].to_string());
        Self {
            name: capture(&NAME_ATTR),
            filename: capture(&FILENAME_ATTR),
        }
    }
}

/// Split `body` on `--<boundary>` and return every well-formed part.
///
/// The preamble before the first delimiter and the closing `--` segment are
/// dropped, as are segments without a blank line between headers and content.
pub fn split_parts<'a>(body: &'a [u8], boundary: &str) -> Vec<Part<'a>> {
    let delimiter = format!("--{}", boundary);

    split_on(body, delimiter.as_bytes())
        .into_iter()
        .skip(1)
        .filter(|segment| segment.trim_ascii() != CLOSING_MARKER)
        .filter_map(|segment| {
            let at = find(segment, HEADER_SEPARATOR)?;
            Some(Part {
                headers: segment[..at].trim_ascii(),
                content: &segment[at + HEADER_SEPARATOR.len()..],
            })
        })
        .collect()
}

/// Position of the first occurrence of `needle` in `haystack`.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Literal (non-pattern) split of a byte slice.
fn split_on<'a>(mut haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut pieces = Vec::new();
    while let Some(at) = find(haystack, needle) {
        pieces.push(&haystack[..at]);
        haystack = &haystack[at + needle.len()..];
    }
    pieces.push(haystack);
    pieces
}
