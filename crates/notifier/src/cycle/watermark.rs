//! Watermark filtering and advancement
//!
//! Pure functions, so the rules that decide what gets notified can be
//! tested without any I/O.
//!
//! Both functions are order-independent: each candidate is judged on its own
//! receipt time, and the advance is computed from aggregates (max delivered,
//! min failed) over the whole set.

use crate::models::{MessageCandidate, Watermark};

/// Whether a message received at `received_at` still needs a notification
///
/// With no stored watermark every message is new.
pub fn is_new(received_at: i64, watermark: Option<Watermark>) -> bool {
    watermark.is_none_or(|w| w.admits(received_at))
}

/// Keep only the candidates received strictly after the watermark
///
/// Input order is preserved; no candidate's verdict depends on another's.
pub fn select_new(
    candidates: Vec<MessageCandidate>,
    watermark: Option<Watermark>,
) -> Vec<MessageCandidate> {
    candidates
        .into_iter()
        .filter(|c| is_new(c.received_at, watermark))
        .collect()
}

/// Result of one dispatch attempt, as far as the watermark cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub received_at: i64,
    pub delivered: bool,
}

impl DispatchOutcome {
    pub fn delivered(received_at: i64) -> Self {
        Self {
            received_at,
            delivered: true,
        }
    }

    pub fn failed(received_at: i64) -> Self {
        Self {
            received_at,
            delivered: false,
        }
    }
}

/// Compute the watermark to persist after all dispatches have settled
///
/// Advances to the newest delivered receipt time, but never to or past the
/// oldest failed one: a failed message must still be new next cycle. The
/// result never moves below `current`.
///
/// Returns `current` unchanged when nothing was delivered.
pub fn advance(current: Option<Watermark>, outcomes: &[DispatchOutcome]) -> Option<Watermark> {
    let newest_delivered = outcomes
        .iter()
        .filter(|o| o.delivered)
        .map(|o| o.received_at)
        .max();
    let oldest_failed = outcomes
        .iter()
        .filter(|o| !o.delivered)
        .map(|o| o.received_at)
        .min();

    let Some(mut target) = newest_delivered else {
        return current;
    };
    if let Some(failed_at) = oldest_failed {
        target = target.min(failed_at.saturating_sub(1));
    }

    match current {
        Some(w) => Some(w.max(Watermark(target))),
        None => Some(Watermark(target)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(times: &[i64]) -> Vec<MessageCandidate> {
        times
            .iter()
            .enumerate()
            .map(|(i, &t)| MessageCandidate::new(format!("m{}", i), t))
            .collect()
    }

    fn times(cs: &[MessageCandidate]) -> Vec<i64> {
        let mut t: Vec<i64> = cs.iter().map(|c| c.received_at).collect();
        t.sort();
        t
    }

    #[test]
    fn test_filter_is_strictly_greater() {
        assert!(is_new(151, Some(Watermark(150))));
        assert!(!is_new(150, Some(Watermark(150))));
        assert!(is_new(i64::MIN, None));
    }

    #[test]
    fn test_select_new_ignores_order() {
        let watermark = Some(Watermark(150));
        let orders: [&[i64]; 4] = [
            &[100, 200, 50, 300],
            &[50, 100, 200, 300],
            &[300, 200, 100, 50],
            &[100, 50, 300, 200],
        ];
        for order in orders {
            let new = select_new(candidates(order), watermark);
            assert_eq!(times(&new), vec![200, 300], "order {:?}", order);
        }
    }

    #[test]
    fn test_select_new_first_run_keeps_everything() {
        let new = select_new(candidates(&[1000, 2000]), None);
        assert_eq!(times(&new), vec![1000, 2000]);
    }

    #[test]
    fn test_advance_to_newest_delivered() {
        let outcomes = [DispatchOutcome::delivered(200), DispatchOutcome::delivered(300)];
        assert_eq!(advance(Some(Watermark(150)), &outcomes), Some(Watermark(300)));
        assert_eq!(advance(None, &outcomes), Some(Watermark(300)));
    }

    #[test]
    fn test_advance_nothing_delivered_keeps_current() {
        assert_eq!(advance(Some(Watermark(150)), &[]), Some(Watermark(150)));
        assert_eq!(advance(None, &[]), None);
        let failed = [DispatchOutcome::failed(500)];
        assert_eq!(advance(Some(Watermark(150)), &failed), Some(Watermark(150)));
        assert_eq!(advance(None, &failed), None);
    }

    #[test]
    fn test_advance_pinned_before_failure() {
        // Failure on the older message pins below it
        let outcomes = [DispatchOutcome::failed(1000), DispatchOutcome::delivered(2000)];
        assert_eq!(advance(None, &outcomes), Some(Watermark(999)));

        // Failure on the newer message does not hold back the older one
        let outcomes = [DispatchOutcome::delivered(1000), DispatchOutcome::failed(2000)];
        assert_eq!(advance(None, &outcomes), Some(Watermark(1000)));
    }

    #[test]
    fn test_advance_pin_never_regresses() {
        let outcomes = [DispatchOutcome::failed(151), DispatchOutcome::delivered(400)];
        assert_eq!(advance(Some(Watermark(150)), &outcomes), Some(Watermark(150)));
    }

    #[test]
    fn test_advance_ignores_outcome_order() {
        let mut outcomes = vec![
            DispatchOutcome::delivered(300),
            DispatchOutcome::failed(250),
            DispatchOutcome::delivered(200),
            DispatchOutcome::failed(400),
        ];
        let expected = advance(Some(Watermark(100)), &outcomes);
        assert_eq!(expected, Some(Watermark(249)));
        outcomes.reverse();
        assert_eq!(advance(Some(Watermark(100)), &outcomes), expected);
    }
}
