//! Property-based tests for classification and the per-key aggregate.

use proptest::prelude::*;

use keydiff_core::classify::{
    KeyStatusAggregate, NormalizedOutput, Status, Summary, classify, classify_with,
};
use keydiff_core::exec::{InvocationError, RawResult};
use keydiff_core::normalize::normalize_bytes;
use keydiff_core::target::VteTarget;

// =============================================================================
// Strategies
// =============================================================================

fn arb_text() -> impl Strategy<Value = NormalizedOutput> {
    prop_oneof![
        2 => Just(NormalizedOutput::Text("[EMPTY]".to_string())),
        1 => Just(NormalizedOutput::Text("[LEGACY_FALLBACK]".to_string())),
        2 => Just(NormalizedOutput::Text("a".to_string())),
        5 => proptest::collection::vec(any::<u8>(), 0..8)
            .prop_map(|bytes| NormalizedOutput::Text(normalize_bytes(&bytes))),
    ]
}

fn arb_output() -> impl Strategy<Value = NormalizedOutput> {
    prop_oneof![
        8 => arb_text(),
        1 => Just(NormalizedOutput::Error("[ERROR: Command timed out after 2s]".to_string())),
        1 => "[a-z ]{0,12}".prop_map(|s| NormalizedOutput::Error(format!("[ERROR: {s}]"))),
    ]
}

fn arb_status() -> impl Strategy<Value = Status> {
    prop::sample::select(Status::ALL.to_vec())
}

// =============================================================================
// Classification
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn priority_order_holds(reference in arb_output(), target in arb_output()) {
        let vte = VteTarget::new("vte_tester");
        let status = classify(&reference, &target, &vte);
        let expected = if reference.is_error() || target.is_error() {
            Status::Error
        } else if reference.display() == "[EMPTY]" {
            Status::SkippedReferenceEmpty
        } else if target.display() == "[EMPTY]" || target.display() == "[LEGACY_FALLBACK]" {
            Status::SkippedTargetFallback
        } else if reference.display() == target.display() {
            Status::Match
        } else {
            Status::Mismatch
        };
        prop_assert_eq!(status, expected);
    }

    #[test]
    fn errors_are_never_mismatches(reference in arb_output(), target in arb_output()) {
        let status = classify_with(&reference, &target, |_| false);
        if reference.is_error() || target.is_error() {
            prop_assert_eq!(status, Status::Error);
        }
        if status == Status::Mismatch {
            prop_assert!(!reference.is_error() && !target.is_error());
            prop_assert_ne!(reference.display(), target.display());
        }
    }

    #[test]
    fn equal_text_never_mismatches(output in arb_text()) {
        let status = classify_with(&output, &output.clone(), |_| false);
        prop_assert_ne!(status, Status::Mismatch);
    }

    #[test]
    fn failed_results_always_classify_as_error(bytes in proptest::collection::vec(any::<u8>(), 0..8)) {
        let reference = NormalizedOutput::from(&RawResult::Output(bytes));
        let target = NormalizedOutput::from(&RawResult::Failed(InvocationError::NonZeroExit {
            code: Some(1),
            stderr: String::new(),
        }));
        prop_assert_eq!(classify_with(&reference, &target, |_| true), Status::Error);
    }
}

// =============================================================================
// Aggregate and counters
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn aggregate_never_recovers(statuses in proptest::collection::vec(arb_status(), 1..50)) {
        let mut agg = KeyStatusAggregate::new();
        let mut failed = false;
        for status in statuses {
            agg.record("a", status);
            failed |= status != Status::Match;
            prop_assert_eq!(agg.is_passing("a"), Some(!failed));
        }
    }

    #[test]
    fn summary_counts_partition_total(statuses in proptest::collection::vec(arb_status(), 0..100)) {
        let mut summary = Summary::default();
        for status in &statuses {
            summary.record(*status);
        }
        prop_assert_eq!(summary.total, statuses.len());
        prop_assert_eq!(
            summary.matches
                + summary.mismatches
                + summary.errors
                + summary.skipped_reference_empty
                + summary.skipped_target_fallback,
            statuses.len()
        );
    }
}
