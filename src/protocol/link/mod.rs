//! Datagram link: one per physical byte transport, shared by every logical
//! sender and receiver on it.
//!
//! The transmit side is a mutex-arbitrated frame writer: a [`Transmission`]
//! guard holds the transmit lock from the first to the last byte of a frame, so
//! frames from concurrent senders never interleave on the wire. The receive side
//! feeds raw bytes through a [`FrameDecoder`] and dispatches valid frames to a
//! [`LinkHandler`], while per-node statistics and liveness are kept up to date.
//!
//! ## Timing Constants
//!
//! These constants define the default timing behaviour of a link. Each of them
//! can be overridden through [`LinkConfig`].
use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::RawMutex, Mutex as BlockingMutex};
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_time::{Duration, Instant};
use futures_util::{future::select, future::Either, pin_mut};

use crate::core::{address_marker, is_valid_node, BREAK, MAX_NODES, MIN_RX_CAPACITY};
use crate::error::{ConfigError, LinkError, TxError};
use crate::protocol::frame::decoder::{FrameDecoder, RxEvent};
use crate::protocol::frame::encoder::FrameEncoder;

pub mod channel_transport;
pub mod stats;
pub mod traits;
pub mod transmission;

pub use channel_transport::ChannelTransport;
pub use stats::{LinkStatus, RxStatus};
pub use transmission::Transmission;
use stats::LinkStats;
use traits::{link_clock::LinkClock, link_handler::LinkHandler, link_transport::LinkTransport};

/// Window after the last valid frame during which the link counts as alive (ms).
///
/// A peer sending a heartbeat every 500 ms can miss two of them before the
/// link is declared dead.
pub const LIVENESS_TIMEOUT_MS: u64 = 1500;

/// Transmit idle time after which the next frame opens with a break (ms).
///
/// Back-to-back frames share a single break: the closing break of one frame is
/// the opening break of the next. After an idle period the receiver may have
/// lost sync (noise, reset, cable plugged in mid-stream), so a fresh break is
/// sent to force it back to the addressing state.
pub const RESYNC_IDLE_MS: u64 = 500;

/// Diagnostic code carried by the panic raised when a blocking transmit start
/// cannot obtain the link within [`LinkConfig::lock_timeout`].
pub const PANIC_MUTEX: u8 = 3;

const NODES: usize = MAX_NODES as usize;

//==================================================================================LinkConfig
/// Static parameters of a link.
///
/// ```rust,ignore
/// use dglink::protocol::link::LinkConfig;
/// use embassy_time::Duration;
///
/// let config = LinkConfig::new(1)
///     .with_min_inter_delay(Duration::from_millis(2))
///     .with_lock_timeout(Duration::from_millis(200));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// Local node id. `0` receives every frame and is the default transmit target.
    pub node: u8,
    /// Minimum spacing between the end of one frame and the start of the next.
    pub min_inter_delay: Duration,
    /// See [`RESYNC_IDLE_MS`].
    pub resync_idle: Duration,
    /// See [`LIVENESS_TIMEOUT_MS`].
    pub liveness_timeout: Duration,
    /// Upper bound for a blocking start to obtain the link. `None` waits forever.
    pub lock_timeout: Option<Duration>,
}

impl LinkConfig {
    pub const fn new(node: u8) -> Self {
        Self {
            node,
            min_inter_delay: Duration::from_ticks(0),
            resync_idle: Duration::from_millis(RESYNC_IDLE_MS),
            liveness_timeout: Duration::from_millis(LIVENESS_TIMEOUT_MS),
            lock_timeout: None,
        }
    }

    pub fn with_min_inter_delay(mut self, delay: Duration) -> Self {
        self.min_inter_delay = delay;
        self
    }

    pub fn with_resync_idle(mut self, idle: Duration) -> Self {
        self.resync_idle = idle;
        self
    }

    pub fn with_liveness_timeout(mut self, timeout: Duration) -> Self {
        self.liveness_timeout = timeout;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

//==================================================================================Link
/// Transmit-side state, owned by whoever holds the transmit lock.
pub(crate) struct TxState<T> {
    pub(crate) transport: T,
    pub(crate) encoder: FrameEncoder,
    /// A frame was started and not ended.
    pub(crate) busy: bool,
    pub(crate) last_tx: Option<Instant>,
    sequences: [u8; NODES],
}

/// A datagram link over transport `T`, timed by `C`, dispatching to `H`, with an
/// `RX`-byte receive assembly buffer.
///
/// Every operation takes `&self`: share the link between tasks with a
/// `static` or a reference.
pub struct Link<M: RawMutex, T: LinkTransport, C: LinkClock, H: LinkHandler, const RX: usize> {
    config: LinkConfig,
    pub(crate) clock: C,
    tx: Mutex<M, TxState<T>>,
    rx: BlockingMutex<M, RefCell<FrameDecoder<RX>>>,
    pub(crate) stats: BlockingMutex<M, RefCell<LinkStats>>,
    handler: BlockingMutex<M, RefCell<H>>,
}

impl<M, T, C, H, const RX: usize> Link<M, T, C, H, RX>
where
    M: RawMutex,
    T: LinkTransport,
    C: LinkClock,
    H: LinkHandler,
{
    const RX_CAPACITY_OK: () = assert!(
        RX >= MIN_RX_CAPACITY,
        "receive assembly buffer is smaller than MIN_RX_CAPACITY"
    );

    /// Build a link. Fails when the local node is outside the node id space.
    pub fn new(config: LinkConfig, transport: T, clock: C, handler: H) -> Result<Self, ConfigError> {
        #[allow(clippy::let_unit_value)]
        let () = Self::RX_CAPACITY_OK;

        if !is_valid_node(config.node) {
            return Err(ConfigError::InvalidNode { node: config.node });
        }

        #[cfg(feature = "defmt")]
        defmt::info!("link up as node {} ({} byte assembly buffer)", config.node, RX);

        Ok(Self {
            config,
            clock,
            tx: Mutex::new(TxState {
                transport,
                encoder: FrameEncoder::new(),
                busy: false,
                last_tx: None,
                sequences: [0; NODES],
            }),
            rx: BlockingMutex::new(RefCell::new(FrameDecoder::new(config.node))),
            stats: BlockingMutex::new(RefCell::new(LinkStats::new())),
            handler: BlockingMutex::new(RefCell::new(handler)),
        })
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Run `f` with exclusive access to the registered handler.
    pub fn with_handler<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        self.handler.lock(|handler| f(&mut handler.borrow_mut()))
    }

    //==================================================================================Transmit
    /// Start a frame to the link's own node, waiting for the link if needed.
    ///
    /// # Panics
    ///
    /// When [`LinkConfig::lock_timeout`] is set and the link stays held longer
    /// than that, with code [`PANIC_MUTEX`].
    pub async fn transmit_start(
        &self,
        header: u8,
    ) -> Result<Transmission<'_, M, T, C, H, RX>, TxError<T::Error>> {
        self.transmit_start_to(self.config.node, header).await
    }

    /// Start a frame to `node`, waiting for the link if needed.
    ///
    /// # Panics
    ///
    /// See [`transmit_start`](Self::transmit_start).
    pub async fn transmit_start_to(
        &self,
        node: u8,
        header: u8,
    ) -> Result<Transmission<'_, M, T, C, H, RX>, TxError<T::Error>> {
        if !is_valid_node(node) {
            return Err(TxError::InvalidNode { node });
        }
        let state = self.lock_tx().await;
        self.open(state, node, header).await
    }

    /// Start a frame to the link's own node, failing with [`TxError::Busy`] when
    /// another transmission holds the link.
    pub async fn try_transmit_start(
        &self,
        header: u8,
    ) -> Result<Transmission<'_, M, T, C, H, RX>, TxError<T::Error>> {
        self.try_transmit_start_to(self.config.node, header).await
    }

    /// Start a frame to `node` without waiting for the link.
    pub async fn try_transmit_start_to(
        &self,
        node: u8,
        header: u8,
    ) -> Result<Transmission<'_, M, T, C, H, RX>, TxError<T::Error>> {
        if !is_valid_node(node) {
            return Err(TxError::InvalidNode { node });
        }
        let state = self.tx.try_lock().map_err(|_| TxError::Busy)?;
        self.open(state, node, header).await
    }

    async fn lock_tx(&self) -> MutexGuard<'_, M, TxState<T>> {
        let Some(timeout) = self.config.lock_timeout else {
            return self.tx.lock().await;
        };

        let lock = self.tx.lock();
        let expiry = self.clock.delay(timeout);
        pin_mut!(lock, expiry);

        match select(lock, expiry).await {
            Either::Left((state, _)) => state,
            Either::Right(_) => {
                #[cfg(feature = "defmt")]
                defmt::error!("blocking start timed out on node {}", self.config.node);

                panic!("PANIC({:#x}): blocking start timed out", PANIC_MUTEX)
            }
        }
    }

    async fn open<'l>(
        &'l self,
        mut state: MutexGuard<'l, M, TxState<T>>,
        node: u8,
        header: u8,
    ) -> Result<Transmission<'l, M, T, C, H, RX>, TxError<T::Error>> {
        if let Some(last) = state.last_tx {
            let elapsed = self.clock.now().saturating_duration_since(last);
            if elapsed < self.config.min_inter_delay {
                self.clock.delay(self.config.min_inter_delay - elapsed).await;
            }
        }

        let now = self.clock.now();
        let resync = state.busy
            || state
                .last_tx
                .map_or(true, |last| now.saturating_duration_since(last) > self.config.resync_idle);

        let slot = &mut state.sequences[usize::from(node)];
        let sequence = *slot;
        *slot = sequence.wrapping_add(1);

        state.transport.begin_transmission();
        state.encoder.reset();
        state.busy = true;

        #[cfg(feature = "defmt")]
        defmt::trace!(
            "tx start to node {} seq {} header {:#x} (break: {})",
            node,
            sequence,
            header,
            resync
        );

        let mut transmission = Transmission::new(self, state);
        if resync {
            transmission.write_raw(&BREAK).await?;
        }
        transmission
            .write_escaped(&[address_marker(node), sequence])
            .await?;
        transmission.write_escaped(&[header]).await?;
        Ok(transmission)
    }

    pub(crate) fn report(&self, error: &LinkError) {
        #[cfg(feature = "defmt")]
        defmt::warn!("link error {}: {}", error.reason(), error.code());

        self.with_handler(|handler| handler.on_error(error));
    }

    //==================================================================================Receive
    /// Feed raw received bytes, dispatching frames and errors to the registered handler.
    ///
    /// The handler must not call back into `receive_bytes` on the same link.
    pub fn receive_bytes(&self, bytes: &[u8]) {
        self.handler
            .lock(|handler| self.receive_bytes_with(bytes, &mut *handler.borrow_mut()));
    }

    /// Feed raw received bytes, dispatching frames and errors to `handler`
    /// instead of the registered one.
    pub fn receive_bytes_with<R: LinkHandler + ?Sized>(&self, bytes: &[u8], handler: &mut R) {
        let now = self.clock.now();
        self.stats
            .lock(|stats| stats.borrow_mut().add_rx_bytes(bytes.len()));

        self.rx.lock(|rx| {
            let mut decoder = rx.borrow_mut();
            for &byte in bytes {
                match decoder.feed(byte) {
                    Some(RxEvent::Frame(frame)) => {
                        self.stats.lock(|stats| {
                            stats
                                .borrow_mut()
                                .record_frame(frame.node, frame.sequence, now)
                        });
                        handler.on_frame(frame.node, frame.data);
                    }
                    Some(RxEvent::Error(error)) => {
                        #[cfg(feature = "defmt")]
                        defmt::warn!("link error {}: {}", error.reason(), error.code());

                        handler.on_error(&error);
                    }
                    None => {}
                }
            }
        });
    }

    //==================================================================================Status
    /// Whether a valid frame arrived within the liveness window.
    pub fn is_alive(&self) -> bool {
        let now = self.clock.now();
        self.stats.lock(|stats| {
            stats
                .borrow_mut()
                .check_alive(now, self.config.liveness_timeout)
        })
    }

    /// Delivery counters for `node` since the previous call, then cleared.
    pub fn rx_status(&self, node: u8) -> RxStatus {
        self.stats
            .lock(|stats| stats.borrow_mut().take_rx_status(node))
    }

    /// Aggregate traffic counters since the previous call, then cleared.
    pub fn link_status(&self) -> LinkStatus {
        self.stats.lock(|stats| stats.borrow_mut().take_link_status())
    }
}
