//! Splitting a body that holds several concatenated documents.

/// Every document starts with this keyword at the beginning of a line.
pub const DOCUMENT_START: &str = "network-status-version ";

/// Lazy, order-preserving iterator over the documents in `body`.
///
/// Each yielded slice runs from one `network-status-version` line to the
/// next (or to the end of the body). Text before the first document start
/// is yielded as its own slice so the caller can reject it.
pub fn split_documents(body: &str) -> SplitDocuments<'_> {
    SplitDocuments { rest: body }
}

pub struct SplitDocuments<'a> {
    rest: &'a str,
}

impl<'a> Iterator for SplitDocuments<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.trim().is_empty() {
            self.rest = "";
            return None;
        }
        // Search from offset 1 so the current document's own start line is skipped.
        let next_start = self
            .rest
            .get(1..)
            .and_then(|tail| tail.find(&format!("\n{DOCUMENT_START}")))
            .map(|pos| pos + 2);
        let (doc, rest) = match next_start {
            Some(pos) => self.rest.split_at(pos),
            None => (self.rest, ""),
        };
        self.rest = rest;
        Some(doc)
    }
}
