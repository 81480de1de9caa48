//! Streaming decoder turning a dump byte stream into page records.

use std::io::{self, BufRead};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors produced while decoding a dump stream.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// I/O error from the underlying stream.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The stream ended in the middle of a `<page>` element.
    #[error("unexpected end of stream inside <page>")]
    Truncated,

    /// A page closed without one of its required child elements.
    #[error("page is missing its <{0}> element")]
    MissingElement(&'static str),

    /// An element did not close on the line it opened on.
    #[error("malformed <{0}> element")]
    MalformedElement(&'static str),

    /// The page timestamp is not a valid RFC 3339 date.
    #[error("invalid timestamp {value:?}: {source}")]
    Timestamp {
        /// The raw timestamp text.
        value: String,
        /// Underlying parse error.
        #[source]
        source: chrono::ParseError,
    },
}

/// A single page decoded from a dump stream.
///
/// The record carries no identifier; the loader assigns one at insert time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    /// Last modification time of the page.
    pub updated_at: DateTime<Utc>,
    /// Page title.
    pub title: String,
    /// Page body markup.
    pub text: String,
}

/// A lazy, forward-only source of page records.
///
/// `Ok(Some(_))` yields the next record, `Ok(None)` is the normal end of
/// stream, and `Err(_)` is terminal: callers must stop pulling after an
/// error. Implementations other than the dump decoder can be substituted
/// wherever records are consumed.
pub trait RecordSource {
    /// Advances the source and returns the next record, if any.
    fn next_record(&mut self) -> Result<Option<PageRecord>, DecodeError>;
}

/// Decodes `<page>` elements from a decompressed dump stream.
///
/// The dump export writes one element per line except for `<text>`, which
/// spans lines; this decoder leans on that shape instead of pulling in a
/// full XML parser. Only the first `<timestamp>` of a page is used, so the
/// record reflects the page's latest revision.
pub struct PageDecoder<R> {
    reader: R,
    line: String,
}

impl<R: BufRead> PageDecoder<R> {
    /// Wraps a decompressed dump stream.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }

    /// Reads the next line into the internal buffer. Returns `false` at
    /// end of stream.
    fn next_line(&mut self) -> Result<bool, DecodeError> {
        self.line.clear();
        Ok(self.reader.read_line(&mut self.line)? != 0)
    }

    /// Collects a `<text>` body, which may span many lines.
    fn collect_text(&mut self, opening: String) -> Result<String, DecodeError> {
        // Self-closing form: the page has an empty body.
        if opening.trim_end().ends_with("/>") {
            return Ok(String::new());
        }

        let start = opening
            .find('>')
            .ok_or(DecodeError::MalformedElement("text"))?;
        let mut body = opening[start + 1..].to_string();

        loop {
            if let Some(end) = body.find("</text>") {
                body.truncate(end);
                return Ok(unescape(&body));
            }
            if !self.next_line()? {
                return Err(DecodeError::Truncated);
            }
            body.push_str(&self.line);
        }
    }
}

impl<R: BufRead> RecordSource for PageDecoder<R> {
    fn next_record(&mut self) -> Result<Option<PageRecord>, DecodeError> {
        // Skip ahead to the next page element; everything between pages
        // (site info, closing tags) is irrelevant here.
        loop {
            if !self.next_line()? {
                return Ok(None);
            }
            if self.line.trim_start().starts_with("<page>") {
                break;
            }
        }

        let mut title = None;
        let mut updated_at = None;
        let mut text = None;

        loop {
            if !self.next_line()? {
                return Err(DecodeError::Truncated);
            }
            let elem = self.line.trim();
            if elem.starts_with("</page>") {
                break;
            }

            if title.is_none() && elem.starts_with("<title>") {
                title = Some(unescape(element_text(elem, "title")?));
            } else if updated_at.is_none() && elem.starts_with("<timestamp>") {
                let raw = element_text(elem, "timestamp")?;
                let parsed = DateTime::parse_from_rfc3339(raw).map_err(|source| {
                    DecodeError::Timestamp {
                        value: raw.to_string(),
                        source,
                    }
                })?;
                updated_at = Some(parsed.with_timezone(&Utc));
            } else if text.is_none() && elem.starts_with("<text") {
                // Keep the trailing newline: the body starts on this line
                // and may continue over the following ones.
                let opening = self.line.trim_start().to_string();
                text = Some(self.collect_text(opening)?);
            }
        }

        Ok(Some(PageRecord {
            updated_at: updated_at.ok_or(DecodeError::MissingElement("timestamp"))?,
            title: title.ok_or(DecodeError::MissingElement("title"))?,
            text: text.ok_or(DecodeError::MissingElement("text"))?,
        }))
    }
}

/// Extracts the text between `<tag>` and `</tag>` on a single line.
fn element_text<'a>(line: &'a str, tag: &'static str) -> Result<&'a str, DecodeError> {
    let rest = &line[tag.len() + 2..];
    rest.find("</")
        .map(|end| &rest[..end])
        .ok_or(DecodeError::MalformedElement(tag))
}

/// Resolves the XML entities the dump export emits.
fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&amp;", "&")
}
