//! Per-link diagnostics: per-node delivery counters, aggregate traffic counters
//! and liveness. Every counter is a wrapping `u16` read with clear-on-read semantics.
use embassy_time::{Duration, Instant};

use crate::core::MAX_NODES;

const NODES: usize = MAX_NODES as usize;

/// Delivery counters for one remote node since the previous read.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxStatus {
    /// Frames that passed the CRC check.
    pub good: u16,
    /// Frames inferred missing from gaps in the sequence numbers.
    pub lost: u16,
}

impl RxStatus {
    /// Frames the node sent during the period, delivered or not.
    pub fn total(&self) -> u16 {
        self.good.wrapping_add(self.lost)
    }
}

/// Aggregate traffic counters since the previous read.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStatus {
    /// Raw bytes fed to the decoder.
    pub rx_bytes: u16,
    /// Raw bytes handed to the transport.
    pub tx_bytes: u16,
    /// Valid frames received.
    pub rx_datagrams: u16,
    /// Frames completed with `end()`.
    pub tx_datagrams: u16,
}

#[derive(Debug)]
pub(crate) struct LinkStats {
    last_seq: [Option<u8>; NODES],
    nodes: [RxStatus; NODES],
    totals: LinkStatus,
    last_rx: Option<Instant>,
    alive: bool,
}

impl LinkStats {
    pub(crate) const fn new() -> Self {
        Self {
            last_seq: [None; NODES],
            nodes: [RxStatus { good: 0, lost: 0 }; NODES],
            totals: LinkStatus {
                rx_bytes: 0,
                tx_bytes: 0,
                rx_datagrams: 0,
                tx_datagrams: 0,
            },
            last_rx: None,
            alive: false,
        }
    }

    /// Account a valid frame, counting the frames skipped before it. Frames from
    /// nodes outside the address space are not accounted.
    pub(crate) fn record_frame(&mut self, node: u8, sequence: u8, now: Instant) {
        let index = usize::from(node);
        let (Some(last_seq), Some(status)) =
            (self.last_seq.get_mut(index), self.nodes.get_mut(index))
        else {
            return;
        };
        let lost = match *last_seq {
            Some(last) => sequence.wrapping_sub(last.wrapping_add(1)),
            None => 0,
        };
        *last_seq = Some(sequence);

        status.good = status.good.wrapping_add(1);
        status.lost = status.lost.wrapping_add(u16::from(lost));

        self.totals.rx_datagrams = self.totals.rx_datagrams.wrapping_add(1);
        self.last_rx = Some(now);
        self.alive = true;

        #[cfg(feature = "defmt")]
        if lost > 0 {
            defmt::debug!(
                "node {}: {} frame(s) lost before seq {}",
                node,
                lost,
                sequence
            );
        }
    }

    pub(crate) fn add_rx_bytes(&mut self, count: usize) {
        self.totals.rx_bytes = self.totals.rx_bytes.wrapping_add(count as u16);
    }

    pub(crate) fn add_tx_bytes(&mut self, count: usize) {
        self.totals.tx_bytes = self.totals.tx_bytes.wrapping_add(count as u16);
    }

    pub(crate) fn add_tx_datagram(&mut self) {
        self.totals.tx_datagrams = self.totals.tx_datagrams.wrapping_add(1);
    }

    /// Liveness at `now`; the flag drops for good once the window elapsed.
    pub(crate) fn check_alive(&mut self, now: Instant, timeout: Duration) -> bool {
        if self.alive {
            if let Some(last) = self.last_rx {
                if now.saturating_duration_since(last) > timeout {
                    self.alive = false;
                }
            }
        }
        self.alive
    }

    /// Counters of `node`, cleared; an unknown node reads as empty.
    pub(crate) fn take_rx_status(&mut self, node: u8) -> RxStatus {
        self.nodes
            .get_mut(usize::from(node))
            .map(core::mem::take)
            .unwrap_or_default()
    }

    pub(crate) fn take_link_status(&mut self) -> LinkStatus {
        core::mem::take(&mut self.totals)
    }
}
