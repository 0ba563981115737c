//! Classification of reference/target output pairs.
//!
//! Statuses are decided in a fixed priority order:
//! error, reference empty, target fallback, match, mismatch.
//! Equality is decided on the normalized display form, so a raw byte
//! sequence and look-alike text (e.g. `0x1b` and the literal `ESC`) compare
//! equal. Errors are recognised by result variant, not by text.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::exec::RawResult;
use crate::matrix::TestCase;
use crate::normalize::{EMPTY_MARKER, normalize};
use crate::target::TargetDescriptor;

/// Outcome of one test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Error,
    SkippedReferenceEmpty,
    SkippedTargetFallback,
    Match,
    Mismatch,
}

impl Status {
    pub const ALL: [Self; 5] = [
        Self::Error,
        Self::SkippedReferenceEmpty,
        Self::SkippedTargetFallback,
        Self::Match,
        Self::Mismatch,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::SkippedReferenceEmpty => "skipped_reference_empty",
            Self::SkippedTargetFallback => "skipped_target_fallback",
            Self::Match => "match",
            Self::Mismatch => "mismatch",
        }
    }

    #[must_use]
    pub const fn is_match(self) -> bool {
        matches!(self, Self::Match)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized output, remembering whether it came from a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedOutput {
    Text(String),
    Error(String),
}

impl NormalizedOutput {
    #[must_use]
    pub fn display(&self) -> &str {
        match self {
            Self::Text(text) | Self::Error(text) => text,
        }
    }

    #[must_use]
    pub fn into_display(self) -> String {
        match self {
            Self::Text(text) | Self::Error(text) => text,
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl From<&RawResult> for NormalizedOutput {
    fn from(raw: &RawResult) -> Self {
        let text = normalize(raw);
        if raw.is_error() {
            Self::Error(text)
        } else {
            Self::Text(text)
        }
    }
}

/// Apply the classification policy to one pair of normalized outputs.
#[must_use]
pub fn classify(
    reference: &NormalizedOutput,
    target: &NormalizedOutput,
    descriptor: &dyn TargetDescriptor,
) -> Status {
    classify_with(reference, target, |text| descriptor.is_fallback_output(text))
}

/// [`classify`] with an explicit fallback predicate.
pub fn classify_with(
    reference: &NormalizedOutput,
    target: &NormalizedOutput,
    is_fallback: impl Fn(&str) -> bool,
) -> Status {
    if reference.is_error() || target.is_error() {
        Status::Error
    } else if reference.display() == EMPTY_MARKER {
        Status::SkippedReferenceEmpty
    } else if is_fallback(target.display()) {
        Status::SkippedTargetFallback
    } else if reference.display() == target.display() {
        Status::Match
    } else {
        Status::Mismatch
    }
}

/// One classified test case.
///
/// The raw results are kept alongside their display forms; only the
/// display forms reach the results file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedResult {
    pub case: TestCase,
    pub status: Status,
    pub reference_raw: RawResult,
    pub target_raw: RawResult,
    pub reference_out: String,
    pub target_out: String,
}

impl ClassifiedResult {
    /// Normalize and classify raw outputs for `case`.
    #[must_use]
    pub fn from_raw(
        case: TestCase,
        reference_raw: RawResult,
        target_raw: RawResult,
        descriptor: &dyn TargetDescriptor,
    ) -> Self {
        let reference = NormalizedOutput::from(&reference_raw);
        let target = NormalizedOutput::from(&target_raw);
        let status = classify(&reference, &target, descriptor);
        Self {
            case,
            status,
            reference_raw,
            target_raw,
            reference_out: reference.into_display(),
            target_out: target.into_display(),
        }
    }

    #[must_use]
    pub fn combo(&self) -> String {
        self.case.describe()
    }
}

/// Per-key "everything matched so far" flags.
///
/// Once a key fails it stays failed for the rest of the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyStatusAggregate {
    keys: BTreeMap<String, bool>,
}

impl KeyStatusAggregate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: &str, status: Status) {
        let passing = self.keys.entry(key.to_string()).or_insert(true);
        *passing &= status.is_match();
    }

    /// `None` if no case for `key` has been recorded.
    #[must_use]
    pub fn is_passing(&self, key: &str) -> Option<bool> {
        self.keys.get(key).copied()
    }

    pub fn failed_keys(&self) -> impl Iterator<Item = &str> {
        self.keys
            .iter()
            .filter(|(_, passing)| !**passing)
            .map(|(key, _)| key.as_str())
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.keys.values().filter(|passing| !**passing).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Per-status counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub matches: usize,
    pub mismatches: usize,
    pub skipped_reference_empty: usize,
    pub skipped_target_fallback: usize,
    pub errors: usize,
}

impl Summary {
    pub fn record(&mut self, status: Status) {
        self.total += 1;
        let counter = match status {
            Status::Error => &mut self.errors,
            Status::SkippedReferenceEmpty => &mut self.skipped_reference_empty,
            Status::SkippedTargetFallback => &mut self.skipped_target_fallback,
            Status::Match => &mut self.matches,
            Status::Mismatch => &mut self.mismatches,
        };
        *counter += 1;
    }

    #[must_use]
    pub fn from_results(results: &[ClassifiedResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.record(result.status);
        }
        summary
    }
}
