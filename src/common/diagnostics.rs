//! Soft-defect accounting.
//!
//! Legacy writers frequently produce records that end a few bytes early,
//! string pools cut short, or attribute ids no reader knows. None of these
//! abort decoding: the engine resynchronizes and reports the defect here.
//! The first occurrence of each [`DiagnosticKind`] is logged at `warn`
//! level, repeats at `debug`, so a damaged document does not flood the log.

use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Category of a soft decoding defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticKind {
    /// An inner record was still open when an outer one was closed
    UnclosedRecord,
    /// A record was closed before all of its bytes were read
    UnparsedRecordData,
    /// More bytes were read than the record declared
    RecordOverread,
    /// A close request did not match any open record
    UnbalancedClose,
    /// A deferred-size record has no entry in the size table
    UnknownRecordSize,
    /// Records were still open when the zone finished
    UnbalancedRecords,
    /// A flag zone was closed before its bytes were read
    FlagZoneUnderread,
    /// More bytes were read than the flag zone declared
    FlagZoneOverread,
    /// A flag zone declared more bytes than its enclosing record holds
    FlagZoneOverflow,
    /// `close_flag_zone` was called with no flag zone open
    NoOpenFlagZone,
    /// The string pool ended before its declared count
    TruncatedStringPool,
    /// A second string pool replaced the first one
    StringPoolReread,
    /// A pool name index is out of range
    BadPoolName,
    /// A charset identifier has no known decoder
    UnknownCharset,
    /// Version-map entries were declared in decreasing version order
    VersionMapOrder,
    /// A version-map entry duplicates an already known version
    DuplicateVersionMap,
    /// An attribute id cannot be translated into the reader's id space
    UnknownWhich,
    /// An item table declared a different number of items than stored
    ItemCountMismatch,
    /// A surrogate does not resolve to a stored item
    UnresolvedSurrogate,
}

impl DiagnosticKind {
    /// Short stable name used in log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::UnclosedRecord => "unclosed-record",
            DiagnosticKind::UnparsedRecordData => "unparsed-record-data",
            DiagnosticKind::RecordOverread => "record-overread",
            DiagnosticKind::UnbalancedClose => "unbalanced-close",
            DiagnosticKind::UnknownRecordSize => "unknown-record-size",
            DiagnosticKind::UnbalancedRecords => "unbalanced-records",
            DiagnosticKind::FlagZoneUnderread => "flag-zone-underread",
            DiagnosticKind::FlagZoneOverread => "flag-zone-overread",
            DiagnosticKind::FlagZoneOverflow => "flag-zone-overflow",
            DiagnosticKind::NoOpenFlagZone => "no-open-flag-zone",
            DiagnosticKind::TruncatedStringPool => "truncated-string-pool",
            DiagnosticKind::StringPoolReread => "string-pool-reread",
            DiagnosticKind::BadPoolName => "bad-pool-name",
            DiagnosticKind::UnknownCharset => "unknown-charset",
            DiagnosticKind::VersionMapOrder => "version-map-order",
            DiagnosticKind::DuplicateVersionMap => "duplicate-version-map",
            DiagnosticKind::UnknownWhich => "unknown-which",
            DiagnosticKind::ItemCountMismatch => "item-count-mismatch",
            DiagnosticKind::UnresolvedSurrogate => "unresolved-surrogate",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counter and log throttle for soft defects.
///
/// One sink belongs to each [`RecordZone`](crate::zone::RecordZone); the
/// caller can supply its own or take it back after decoding to inspect
/// what went wrong.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    counts: BTreeMap<DiagnosticKind, usize>,
    verbose: bool,
}

impl Diagnostics {
    /// Create an empty sink.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Log every occurrence at `warn` instead of only the first one.
    #[inline]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Record a defect and log it.
    pub fn report(&mut self, kind: DiagnosticKind, zone: &str, offset: u64, detail: impl fmt::Display) {
        let count = self.bump(kind);
        if count == 1 || self.verbose {
            warn!(kind = kind.as_str(), zone, offset, "{detail}");
        } else {
            debug!(kind = kind.as_str(), zone, offset, count, "{detail}");
        }
    }

    /// Record a defect that only deserves a `debug` line.
    pub fn note(&mut self, kind: DiagnosticKind, zone: &str, offset: u64, detail: impl fmt::Display) {
        let count = self.bump(kind);
        debug!(kind = kind.as_str(), zone, offset, count, "{detail}");
    }

    fn bump(&mut self, kind: DiagnosticKind) -> usize {
        let count = self.counts.entry(kind).or_insert(0);
        *count += 1;
        *count
    }

    /// Number of defects recorded for a kind.
    #[inline]
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Total number of defects recorded.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// True when nothing has been reported.
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterator over `(kind, count)` pairs in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (DiagnosticKind, usize)> + '_ {
        self.counts.iter().map(|(&kind, &count)| (kind, count))
    }

    /// Forget all recorded defects.
    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_per_kind() {
        let mut diag = Diagnostics::new();
        assert!(diag.is_clean());

        diag.report(DiagnosticKind::UnparsedRecordData, "test", 4, "first");
        diag.report(DiagnosticKind::UnparsedRecordData, "test", 8, "second");
        diag.note(DiagnosticKind::BadPoolName, "test", 0, "quiet");

        assert_eq!(diag.count(DiagnosticKind::UnparsedRecordData), 2);
        assert_eq!(diag.count(DiagnosticKind::BadPoolName), 1);
        assert_eq!(diag.count(DiagnosticKind::UnknownWhich), 0);
        assert_eq!(diag.total(), 3);

        let kinds: Vec<_> = diag.iter().map(|(kind, _)| kind).collect();
        assert_eq!(
            kinds,
            vec![DiagnosticKind::UnparsedRecordData, DiagnosticKind::BadPoolName]
        );

        diag.clear();
        assert!(diag.is_clean());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(DiagnosticKind::UnknownWhich.to_string(), "unknown-which");
        assert_eq!(DiagnosticKind::RecordOverread.as_str(), "record-overread");
    }
}
