//! Run counters for an ingestion pass

use std::collections::BTreeMap;
use std::fmt;

/// Outcome counts of one ingestion run
///
/// Every listed entry ends up in exactly one bucket: skipped (unsupported
/// type), stored (wavetable or preset), or one of the failure counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStatistics {
    /// Entries returned by the source across all prefixes (deduplicated)
    pub listed: u64,
    /// Entries whose extension no parser claims
    pub skipped: u64,
    pub wavetables: u64,
    pub presets: u64,
    /// Prefixes the source failed to list
    pub list_failures: u64,
    pub fetch_failures: u64,
    pub parse_failures: u64,
    /// Parse failures by error kind (structural, encoding, markup)
    pub parse_failures_by_kind: BTreeMap<&'static str, u64>,
    /// Transactions committed
    pub batches: u64,
}

impl IngestStatistics {
    pub fn stored(&self) -> u64 {
        self.wavetables + self.presets
    }

    /// Every per-asset or per-prefix failure (never includes store failures,
    /// which abort the run instead)
    pub fn failures(&self) -> u64 {
        self.list_failures + self.fetch_failures + self.parse_failures
    }

    pub(crate) fn record_parse_failure(&mut self, kind: &'static str) {
        self.parse_failures += 1;
        *self.parse_failures_by_kind.entry(kind).or_insert(0) += 1;
    }
}

impl fmt::Display for IngestStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} listed, {} stored ({} wavetables, {} presets), {} skipped, {} failed \
             ({} list, {} fetch, {} parse)",
            self.listed,
            self.stored(),
            self.wavetables,
            self.presets,
            self.skipped,
            self.failures(),
            self.list_failures,
            self.fetch_failures,
            self.parse_failures
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_totals() {
        let mut stats = IngestStatistics {
            list_failures: 1,
            fetch_failures: 2,
            ..Default::default()
        };
        stats.record_parse_failure("structural");
        stats.record_parse_failure("structural");
        stats.record_parse_failure("markup");

        assert_eq!(stats.failures(), 6);
        assert_eq!(stats.parse_failures_by_kind["structural"], 2);
        assert_eq!(stats.parse_failures_by_kind["markup"], 1);
    }
}
