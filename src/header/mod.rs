//! Header Extractor (§4.A).
//!
//! Locates a delimited `<!-- LinkedDoc RDF -->` ... `<!-- End LinkedDoc RDF
//! -->` block inside the leading region of a file and splits it into the
//! prose that precedes the opening marker (within the header's own comment
//! delimiter) and the triple text between the markers.
//!
//! The opening comment-block delimiter itself is never load-bearing — only
//! the marker lines are. This lets the same extractor work across source
//! families (`/* ... */`, `<!-- ... -->`, `# ...`) without knowing what
//! language a file is written in, matching the Non-goal in `spec.md` §1
//! ("the core does not execute or parse the host programming languages").

use thiserror::Error;

const OPEN_MARKER: &str = "<!-- LinkedDoc RDF -->";
const CLOSE_MARKER: &str = "<!-- End LinkedDoc RDF -->";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("header block has no closing marker within the scan window")]
    UnterminatedHeader,
}

/// The result of a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedHeader {
    /// Prose preceding the opening marker, trimmed of the surrounding
    /// comment delimiter's own syntax as best-effort (the delimiter itself
    /// is not authoritative, so this is cosmetic only).
    pub prose: String,
    pub triple_block: String,
}

/// Bounded scan: only the first `scan_window_bytes` bytes of `content` are
/// searched for a header. Returns `None` when no opening marker is found
/// in that window — "no header" per §4.A's contract, not an error.
pub fn extract_header(content: &[u8], scan_window_bytes: usize) -> Result<Option<ExtractedHeader>, HeaderError> {
    let window_len = content.len().min(scan_window_bytes);
    let window = String::from_utf8_lossy(&content[..window_len]);

    let Some(open_idx) = window.find(OPEN_MARKER) else {
        return Ok(None);
    };

    let prose = window[..open_idx].to_string();
    let after_open = &window[open_idx + OPEN_MARKER.len()..];

    let Some(close_idx) = after_open.find(CLOSE_MARKER) else {
        // A closing marker that appears before the opening marker belongs to
        // some earlier, unrelated block (or stray text) — it does not
        // terminate *this* opener. Per §4.A/§8 that's "header-not-found",
        // indistinguishable from a file with no header at all, not an
        // unterminated header.
        if prose.contains(CLOSE_MARKER) {
            return Ok(None);
        }
        return Err(HeaderError::UnterminatedHeader);
    };

    let triple_block = after_open[..close_idx].to_string();

    Ok(Some(ExtractedHeader { prose, triple_block }))
}
