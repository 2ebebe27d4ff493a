//! Parsing of `postqueue -p` output.
//!
//! `postqueue` has no structured output mode, so the sidecars depend on the
//! textual listing. The string matching lives in this one function so the
//! assumptions are pinned by the tests below rather than scattered through
//! request handlers.

use serde::Serialize;

/// Marker line `postqueue -p` prints when nothing is queued.
const EMPTY_QUEUE_MARKER: &str = "Mail queue is empty";

/// Number of non-message lines in a non-empty listing (column header and
/// the trailing `-- N Kbytes in M Requests.` summary).
const SURROUNDING_LINES: usize = 2;

/// How many lines to retain as a sample in verbose reports.
const SAMPLE_LINES: usize = 5;

/// Parsed form of a `postqueue -p` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueListing {
    /// Whether the queue reported itself empty.
    pub empty: bool,

    /// Total number of lines in the listing.
    pub line_count: usize,

    /// Rough number of queued entries (lines minus header and summary).
    /// This over-counts multi-recipient entries; it is a health heuristic,
    /// not an accounting figure.
    pub message_estimate: usize,

    /// The first few lines of the listing, for verbose status reports.
    pub sample: Vec<String>,
}

/// Parse the raw standard output of `postqueue -p`.
#[must_use]
pub fn parse_queue_listing(output: &str) -> QueueListing {
    let trimmed = output.trim();
    let empty = trimmed.contains(EMPTY_QUEUE_MARKER);
    let lines: Vec<&str> = trimmed.lines().collect();
    let line_count = lines.len();

    let message_estimate = if empty {
        0
    } else {
        line_count.saturating_sub(SURROUNDING_LINES)
    };

    let sample = lines
        .iter()
        .take(SAMPLE_LINES)
        .map(|line| (*line).to_string())
        .collect();

    QueueListing {
        empty,
        line_count,
        message_estimate,
        sample,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const EMPTY_OUTPUT: &str = "Mail queue is empty\n";

    const ONE_MESSAGE_OUTPUT: &str = "\
-Queue ID-  --Size-- ----Arrival Time---- -Sender/Recipient-------
B1F5C2001*      4523 Tue Aug  4 09:15:22  sender@example.com
                                          recipient@example.net

-- 4 Kbytes in 1 Request.";

    #[test]
    fn test_empty_queue() {
        let listing = parse_queue_listing(EMPTY_OUTPUT);
        assert!(listing.empty);
        assert_eq!(listing.message_estimate, 0);
        assert_eq!(listing.line_count, 1);
    }

    #[test]
    fn test_single_message_queue() {
        let listing = parse_queue_listing(ONE_MESSAGE_OUTPUT);
        assert!(!listing.empty);
        assert_eq!(listing.line_count, 5);
        assert_eq!(listing.message_estimate, 3);
        assert_eq!(
            listing.sample[0],
            "-Queue ID-  --Size-- ----Arrival Time---- -Sender/Recipient-------"
        );
        assert_eq!(listing.sample.len(), 5);
    }

    #[test]
    fn test_blank_output() {
        let listing = parse_queue_listing("");
        assert!(!listing.empty);
        assert_eq!(listing.line_count, 0);
        assert_eq!(listing.message_estimate, 0);
        assert!(listing.sample.is_empty());
    }
}
