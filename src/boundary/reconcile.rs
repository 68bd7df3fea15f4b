//! Interval reconciliation: turns overlapping scored candidates into an
//! ordered, disjoint list.

/// A scored, inclusive interval that can be reconciled against its neighbours.
pub trait Span: Sized {
    fn start(&self) -> usize;
    fn end(&self) -> usize;
    fn confidence(&self) -> f64;

    /// Whether an overlapping neighbour describes the same thing and should be
    /// folded into `self` rather than competing with it.
    fn should_merge(&self, other: &Self) -> bool;

    fn merge(self, other: Self) -> Self;
}

/// Sorts by start and walks the list once. A span starting inside the current
/// one is merged when [`Span::should_merge`] agrees, otherwise only the
/// higher-confidence span survives. The result never overlaps.
pub fn reconcile<T: Span>(mut spans: Vec<T>) -> Vec<T> {
    spans.sort_by(|a, b| {
        a.start()
            .cmp(&b.start())
            .then_with(|| b.confidence().total_cmp(&a.confidence()))
    });

    let mut reconciled = Vec::with_capacity(spans.len());
    let mut remaining = spans.into_iter();
    let Some(mut current) = remaining.next() else {
        return reconciled;
    };

    for next in remaining {
        if next.start() > current.end() {
            reconciled.push(current);
            current = next;
            continue;
        }

        if current.should_merge(&next) {
            current = current.merge(next);
        } else if next.confidence() > current.confidence() {
            current = next;
        }
    }

    reconciled.push(current);
    reconciled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Scored {
        start: usize,
        end: usize,
        confidence: f64,
        label: &'static str,
    }

    fn scored(start: usize, end: usize, confidence: f64, label: &'static str) -> Scored {
        Scored {
            start,
            end,
            confidence,
            label,
        }
    }

    impl Span for Scored {
        fn start(&self) -> usize {
            self.start
        }

        fn end(&self) -> usize {
            self.end
        }

        fn confidence(&self) -> f64 {
            self.confidence
        }

        fn should_merge(&self, other: &Self) -> bool {
            self.label == other.label
        }

        fn merge(self, other: Self) -> Self {
            Scored {
                start: self.start.min(other.start),
                end: self.end.max(other.end),
                confidence: self.confidence.max(other.confidence),
                label: self.label,
            }
        }
    }

    fn assert_disjoint(spans: &[Scored]) {
        for pair in spans.windows(2) {
            assert!(
                pair[0].end < pair[1].start,
                "spans overlap: {:?} / {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(reconcile(Vec::<Scored>::new()).is_empty());
    }

    #[test]
    fn disjoint_spans_are_sorted_and_kept() {
        let spans = vec![scored(5, 9, 0.4, "b"), scored(0, 4, 0.9, "a")];
        let reconciled = reconcile(spans);
        assert_eq!(reconciled.len(), 2);
        assert_eq!(reconciled[0].start, 0);
        assert_eq!(reconciled[1].start, 5);
    }

    #[test]
    fn overlapping_compatible_spans_merge() {
        let spans = vec![scored(0, 4, 0.7, "a"), scored(3, 8, 0.8, "a")];
        let reconciled = reconcile(spans);
        assert_eq!(reconciled, vec![scored(0, 8, 0.8, "a")]);
    }

    #[test]
    fn overlapping_incompatible_spans_keep_higher_confidence() {
        let spans = vec![
            scored(0, 4, 0.6, "a"),
            scored(2, 6, 0.9, "b"),
            scored(5, 7, 0.3, "c"),
        ];
        let reconciled = reconcile(spans);
        assert_eq!(reconciled, vec![scored(2, 6, 0.9, "b")]);
    }

    #[test]
    fn lower_confidence_intruder_is_dropped() {
        let spans = vec![scored(0, 9, 0.8, "a"), scored(4, 12, 0.5, "b")];
        let reconciled = reconcile(spans);
        assert_eq!(reconciled, vec![scored(0, 9, 0.8, "a")]);
    }

    #[test]
    fn same_start_prefers_higher_confidence_first() {
        let spans = vec![scored(3, 3, 0.2, "x"), scored(3, 5, 0.7, "y")];
        let reconciled = reconcile(spans);
        assert_eq!(reconciled, vec![scored(3, 5, 0.7, "y")]);
    }

    #[test]
    fn output_never_overlaps() {
        let spans = vec![
            scored(0, 3, 0.5, "a"),
            scored(1, 2, 0.6, "b"),
            scored(2, 7, 0.55, "a"),
            scored(8, 8, 0.1, "c"),
            scored(6, 10, 0.9, "d"),
            scored(11, 14, 0.4, "d"),
        ];
        assert_disjoint(&reconcile(spans));
    }
}
