//! Delivery tag bookkeeping for publisher confirms

use tokio::sync::watch;
use tracing::debug;

/// Tracks the delivery tags of publishes awaiting broker confirmation.
///
/// Tags are appended in publish order, so `unconfirmed` is always
/// sorted ascending with no duplicates. The outstanding count is
/// mirrored into a watch channel so a handle can await emptiness
/// without touching entity state.
#[derive(Debug)]
pub(crate) struct ConfirmLedger {
    next_delivery_tag: u64,
    unconfirmed: Vec<u64>,
    outstanding: watch::Sender<usize>,
}

impl ConfirmLedger {
    pub(crate) fn new() -> (Self, watch::Receiver<usize>) {
        let (outstanding, watch_rx) = watch::channel(0);
        (
            Self {
                next_delivery_tag: 0,
                unconfirmed: Vec::new(),
                outstanding,
            },
            watch_rx,
        )
    }

    /// Arms tag tracking. Idempotent: a second call does not reset an
    /// in-progress counter.
    pub(crate) fn arm(&mut self) {
        if self.next_delivery_tag == 0 {
            self.next_delivery_tag = 1;
        }
    }

    /// Records the tag for one publish. Must run before the publish
    /// frame is sent so the tag matches the broker's view of ordering.
    /// Does nothing until [`arm`](Self::arm) has been called.
    pub(crate) fn record_publish(&mut self) {
        if self.next_delivery_tag == 0 {
            return;
        }
        self.unconfirmed.push(self.next_delivery_tag);
        self.next_delivery_tag += 1;
        self.publish_count();
    }

    /// Applies a broker ack and reports whether the unconfirmed set is
    /// now empty.
    ///
    /// Tag zero confirms everything outstanding. An unknown tag is a
    /// broker re-ack or stale confirm and is ignored without reporting
    /// emptiness.
    pub(crate) fn apply_ack(&mut self, delivery_tag: u64, multiple: bool) -> bool {
        if delivery_tag == 0 {
            self.unconfirmed.clear();
        } else {
            let Some(index) = self
                .unconfirmed
                .iter()
                .position(|tag| *tag == delivery_tag)
            else {
                debug!(delivery_tag, "ack for an unknown delivery tag ignored");
                return false;
            };
            if multiple {
                self.unconfirmed.drain(..=index);
            } else {
                self.unconfirmed.remove(index);
            }
        }
        self.publish_count();
        self.unconfirmed.is_empty()
    }

    /// Records a broker nack. Nacked tags stay in the unconfirmed set;
    /// only acks resolve tags.
    pub(crate) fn apply_nack(&mut self, delivery_tag: u64, multiple: bool) {
        debug!(delivery_tag, multiple, "publish rejected by the broker");
    }

    pub(crate) fn unconfirmed(&self) -> &[u64] {
        &self.unconfirmed
    }

    fn publish_count(&self) {
        self.outstanding.send_replace(self.unconfirmed.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armed_with(publishes: usize) -> (ConfirmLedger, watch::Receiver<usize>) {
        let (mut ledger, watch_rx) = ConfirmLedger::new();
        ledger.arm();
        for _ in 0..publishes {
            ledger.record_publish();
        }
        (ledger, watch_rx)
    }

    #[test]
    fn test_tags_count_from_one_in_publish_order() {
        let (ledger, _watch) = armed_with(3);
        assert_eq!(ledger.unconfirmed(), &[1, 2, 3]);
    }

    #[test]
    fn test_unarmed_ledger_records_nothing() {
        let (mut ledger, _watch) = ConfirmLedger::new();
        ledger.record_publish();
        assert!(ledger.unconfirmed().is_empty());
    }

    #[test]
    fn test_arm_is_idempotent() {
        let (mut ledger, _watch) = armed_with(2);
        ledger.arm();
        ledger.record_publish();
        assert_eq!(ledger.unconfirmed(), &[1, 2, 3]);
    }

    #[test]
    fn test_single_ack_removes_exactly_one_tag() {
        let (mut ledger, _watch) = armed_with(3);
        assert!(!ledger.apply_ack(2, false));
        assert_eq!(ledger.unconfirmed(), &[1, 3]);
    }

    #[test]
    fn test_multiple_ack_removes_the_prefix() {
        let (mut ledger, _watch) = armed_with(4);
        assert!(!ledger.apply_ack(3, true));
        assert_eq!(ledger.unconfirmed(), &[4]);
        assert!(ledger.apply_ack(4, false));
    }

    #[test]
    fn test_ack_zero_clears_everything() {
        let (mut ledger, _watch) = armed_with(5);
        assert!(ledger.apply_ack(0, false));
        assert!(ledger.unconfirmed().is_empty());
    }

    #[test]
    fn test_ack_zero_on_empty_set_still_reports_empty() {
        let (mut ledger, _watch) = armed_with(0);
        assert!(ledger.apply_ack(0, true));
    }

    #[test]
    fn test_unknown_tag_is_ignored() {
        let (mut ledger, _watch) = armed_with(2);
        assert!(!ledger.apply_ack(9, false));
        assert_eq!(ledger.unconfirmed(), &[1, 2]);
    }

    #[test]
    fn test_nack_leaves_the_tag_in_place() {
        let (mut ledger, _watch) = armed_with(2);
        ledger.apply_nack(1, false);
        assert_eq!(ledger.unconfirmed(), &[1, 2]);
    }

    #[test]
    fn test_watch_mirrors_outstanding_count() {
        let (mut ledger, watch_rx) = armed_with(3);
        assert_eq!(*watch_rx.borrow(), 3);
        ledger.apply_ack(2, true);
        assert_eq!(*watch_rx.borrow(), 1);
        ledger.apply_ack(3, false);
        assert_eq!(*watch_rx.borrow(), 0);
    }

    #[test]
    fn test_tags_stay_sorted_without_duplicates() {
        let (mut ledger, _watch) = armed_with(6);
        ledger.apply_ack(2, false);
        ledger.apply_ack(4, true);
        ledger.record_publish();
        ledger.record_publish();

        let tags = ledger.unconfirmed();
        assert!(tags.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(tags, &[5, 6, 7, 8]);
    }
}
