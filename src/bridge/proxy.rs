//! Console bridge main loop.

use std::future::Future;
use std::io::{self, Write};
use std::pin::Pin;
use std::sync::Arc;

use tokio::time::MissedTickBehavior;

use crate::core::error::{BridgeError, Result};
use crate::core::frame::{CanMessage, ConsoleChannel, MAX_PAYLOAD};
use crate::core::logging::{trace_frame, PacketDirection};
use crate::core::traits::{
    CanBus, ConnectionState, ConsoleSource, Diagnostics, FrameListener, ReadOutcome,
};

use super::config::BridgeConfig;
use super::notifier::Notifier;
use super::stats::BridgeStats;
use super::stdio::StdoutForwarder;

/// Result of one outbound poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    /// Source had nothing ready; no frame sent.
    Idle,
    /// One frame carrying this many bytes was sent.
    Sent(usize),
    /// Source reached end of input.
    Closed,
}

/// Next frame taken from the source.
enum Polled {
    Idle,
    Closed,
    Frame(CanMessage, usize),
}

/// How a burst of outbound sends ended.
enum Pumped {
    Idle,
    Closed,
    Shutdown,
}

/// Bidirectional console bridge over one CAN bus.
pub struct ConsoleBridge<B: CanBus + ?Sized = dyn CanBus> {
    config: BridgeConfig,
    bus: Arc<B>,
    listeners: Vec<Arc<dyn FrameListener>>,
    notifier: Option<Notifier>,
    stats: Arc<BridgeStats>,
    state: ConnectionState,
}

impl<B: CanBus + ?Sized + 'static> ConsoleBridge<B> {
    /// Create a bridge over an already opened bus.
    pub fn new(config: BridgeConfig, bus: Arc<B>) -> Self {
        Self {
            config,
            bus,
            listeners: Vec::new(),
            notifier: None,
            stats: Arc::new(BridgeStats::new()),
            state: ConnectionState::Disconnected,
        }
    }

    /// Write device console output into `out`.
    pub fn forward_to<W: Write + Send + 'static>(&mut self, out: W) -> &mut Self {
        let forwarder = StdoutForwarder::new(out, Arc::clone(&self.stats));
        self.listeners.push(Arc::new(forwarder));
        self
    }

    /// Register an additional receive listener.
    ///
    /// Listeners added after [`start`](Self::start) are not seen by the
    /// running notifier.
    pub fn add_listener(&mut self, listener: Arc<dyn FrameListener>) -> &mut Self {
        self.listeners.push(listener);
        self
    }

    /// Start the receive notifier. Calling it twice is a no-op.
    pub fn start(&mut self) -> Result<()> {
        if self.notifier.is_some() {
            return Ok(());
        }
        if self.listeners.is_empty() {
            #[cfg(feature = "tracing-support")]
            tracing::warn!("No frame listeners registered; received frames are discarded");
        }

        self.notifier = Some(Notifier::spawn(
            Arc::clone(&self.bus),
            self.listeners.clone(),
            self.config.rx_poll_interval(),
            Arc::clone(&self.stats),
        ));
        self.state = ConnectionState::Connected;

        #[cfg(feature = "tracing-support")]
        tracing::info!("Console bridge started on {}", self.bus.name());

        Ok(())
    }

    fn poll_source<S: ConsoleSource + ?Sized>(&self, source: &mut S) -> Result<Polled> {
        if self.state == ConnectionState::Error {
            return Err(BridgeError::NotConnected);
        }

        let mut buf = [0u8; MAX_PAYLOAD];

        let n = match source.try_read(&mut buf)? {
            ReadOutcome::Idle => return Ok(Polled::Idle),
            ReadOutcome::Closed => return Ok(Polled::Closed),
            ReadOutcome::Data(n) => n.min(MAX_PAYLOAD),
        };

        let frame = CanMessage::console(ConsoleChannel::ToDevice, &buf[..n])
            .ok_or_else(|| BridgeError::config("console frame out of range"))?;
        trace_frame(PacketDirection::Send, &frame);

        Ok(Polled::Frame(frame, n))
    }

    /// Poll `source` once and send whatever it produced as one frame.
    ///
    /// Fails with [`BridgeError::NotConnected`] once a fatal error has ended
    /// the bridge.
    pub fn pump_once<S: ConsoleSource + ?Sized>(&self, source: &mut S) -> Result<PumpOutcome> {
        match self.poll_source(source)? {
            Polled::Idle => Ok(PumpOutcome::Idle),
            Polled::Closed => Ok(PumpOutcome::Closed),
            Polled::Frame(frame, n) => {
                self.bus.send(&frame)?;
                self.stats.record_sent(n);
                Ok(PumpOutcome::Sent(n))
            }
        }
    }

    /// Send frames for as long as `source` has input ready.
    ///
    /// `CanBus::send` may block on a full transmit queue, so each send runs
    /// on the blocking pool and races `shutdown`. A send still pending at
    /// shutdown is abandoned.
    async fn pump_ready<S, F>(&self, source: &mut S, shutdown: &mut Pin<&mut F>) -> Result<Pumped>
    where
        S: ConsoleSource,
        F: Future<Output = ()>,
    {
        loop {
            let (frame, n) = match self.poll_source(source)? {
                Polled::Idle => return Ok(Pumped::Idle),
                Polled::Closed => return Ok(Pumped::Closed),
                Polled::Frame(frame, n) => (frame, n),
            };

            let bus = Arc::clone(&self.bus);
            let send = tokio::task::spawn_blocking(move || bus.send(&frame));

            tokio::select! {
                _ = shutdown.as_mut() => return Ok(Pumped::Shutdown),
                joined = send => {
                    joined.map_err(|e| BridgeError::Send(io::Error::new(io::ErrorKind::Other, e)))??;
                    self.stats.record_sent(n);
                }
            }
        }
    }

    /// Run until `shutdown` completes or sending fails.
    ///
    /// Input is drained while it is ready and polled again on the next tick
    /// once idle. End of input on `source` only stops the outbound
    /// direction; device output keeps flowing until shutdown. The notifier
    /// is stopped before returning in every case.
    pub async fn run<S, F>(&mut self, mut source: S, shutdown: F) -> Result<()>
    where
        S: ConsoleSource,
        F: Future<Output = ()>,
    {
        self.start()?;

        tokio::pin!(shutdown);
        let mut interval = tokio::time::interval(self.config.stdin_poll_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stdin_open = true;

        let result = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    #[cfg(feature = "tracing-support")]
                    tracing::info!("Shutdown requested");
                    break Ok(());
                }
                _ = interval.tick(), if stdin_open => {}
            }

            match self.pump_ready(&mut source, &mut shutdown).await {
                Ok(Pumped::Idle) => {}
                Ok(Pumped::Closed) => {
                    #[cfg(feature = "tracing-support")]
                    tracing::info!("Input closed; forwarding device output only");
                    stdin_open = false;
                }
                Ok(Pumped::Shutdown) => {
                    #[cfg(feature = "tracing-support")]
                    tracing::info!("Shutdown requested while sending");
                    break Ok(());
                }
                Err(e) if !e.is_fatal() => {
                    #[cfg(feature = "tracing-support")]
                    tracing::warn!("Console bridge error: {}", e);
                    self.stats.record_error(&e);
                }
                Err(e) => {
                    #[cfg(feature = "tracing-support")]
                    tracing::error!("Console bridge failed: {}", e);
                    self.stats.record_error(&e);
                    self.state = ConnectionState::Error;
                    break Err(e);
                }
            }
        };

        self.stop().await;
        result
    }

    /// Stop the receive notifier.
    pub async fn stop(&mut self) {
        if let Some(mut notifier) = self.notifier.take() {
            notifier.stop().await;

            #[cfg(feature = "tracing-support")]
            tracing::info!("Console bridge stopped on {}", self.bus.name());
        }
        if self.state != ConnectionState::Error {
            self.state = ConnectionState::Disconnected;
        }
    }

    /// Current state.
    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    /// Shared counters.
    pub fn stats(&self) -> &Arc<BridgeStats> {
        &self.stats
    }

    /// Underlying bus.
    pub fn bus(&self) -> &Arc<B> {
        &self.bus
    }

    /// Bridge configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Snapshot for logging or a status command.
    pub fn diagnostics(&self) -> Diagnostics {
        let snap = self.stats.snapshot();

        let mut diag = Diagnostics::new(self.bus.name());
        diag.connection_state = self.state;
        diag.read_count = snap.frames_received;
        diag.write_count = snap.frames_sent;
        diag.error_count = snap.error_count;
        diag.last_error = self.stats.last_error();
        diag.extra = serde_json::json!({
            "interface": self.config.interface,
            "channel": self.config.channel,
            "bitrate_bps": self.config.bitrate_bps(),
            "stats": snap,
        });
        diag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::Mutex;
    use std::time::Duration;

    use embedded_can::Frame;

    use crate::bus::VirtualBus;
    use crate::core::frame::{FROM_DEVICE_ID, TO_DEVICE_ID};

    enum Step {
        Idle,
        Data(Vec<u8>),
    }

    /// Source replaying a fixed script, then reporting end of input.
    struct Scripted {
        steps: VecDeque<Step>,
    }

    impl Scripted {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: steps.into(),
            }
        }
    }

    impl ConsoleSource for Scripted {
        fn try_read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
            match self.steps.pop_front() {
                None => Ok(ReadOutcome::Closed),
                Some(Step::Idle) => Ok(ReadOutcome::Idle),
                Some(Step::Data(bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        self.steps.push_front(Step::Data(bytes[n..].to_vec()));
                    }
                    Ok(ReadOutcome::Data(n))
                }
            }
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> Vec<u8> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FailingBus;

    impl CanBus for FailingBus {
        fn name(&self) -> &str {
            "failing"
        }

        fn send(&self, _frame: &CanMessage) -> Result<()> {
            Err(BridgeError::Send(io::Error::new(
                io::ErrorKind::Other,
                "no buffer space available",
            )))
        }

        fn try_recv(&self) -> Result<Option<CanMessage>> {
            Ok(None)
        }
    }

    /// Bus whose send blocks the calling thread, like a full transmit queue.
    struct StallingBus(Duration);

    impl CanBus for StallingBus {
        fn name(&self) -> &str {
            "stalling"
        }

        fn send(&self, _frame: &CanMessage) -> Result<()> {
            std::thread::sleep(self.0);
            Ok(())
        }

        fn try_recv(&self) -> Result<Option<CanMessage>> {
            Ok(None)
        }
    }

    fn bridge_on(channel: &str) -> (ConsoleBridge<VirtualBus>, VirtualBus) {
        let config = BridgeConfig::new("virtual").with_channel(channel);
        let host = Arc::new(VirtualBus::open(channel));
        let device = VirtualBus::open(channel);
        (ConsoleBridge::new(config, host), device)
    }

    fn drain(bus: &VirtualBus) -> Vec<CanMessage> {
        std::iter::from_fn(|| bus.try_recv().unwrap()).collect()
    }

    async fn until(mut cond: impl FnMut() -> bool) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[test]
    fn test_stdin_chunk_becomes_one_frame() {
        let (bridge, device) = bridge_on("proxy-one-frame");
        let mut source = Scripted::new(vec![Step::Data(vec![0x01, 0x02, 0x03])]);

        assert_eq!(bridge.pump_once(&mut source).unwrap(), PumpOutcome::Sent(3));

        let frames = drain(&device);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_extended());
        assert_eq!(frames[0].raw_id(), TO_DEVICE_ID);
        assert_eq!(frames[0].data(), &[0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_idle_sends_nothing() {
        let (bridge, device) = bridge_on("proxy-idle");
        let mut source = Scripted::new(vec![Step::Idle]);

        assert_eq!(bridge.pump_once(&mut source).unwrap(), PumpOutcome::Idle);
        assert!(drain(&device).is_empty());
        assert_eq!(bridge.stats().snapshot().frames_sent, 0);
    }

    #[test]
    fn test_long_input_is_split_into_eight_byte_frames() {
        let (bridge, device) = bridge_on("proxy-split");
        let payload: Vec<u8> = (0..10).collect();
        let mut source = Scripted::new(vec![Step::Data(payload.clone())]);

        assert_eq!(bridge.pump_once(&mut source).unwrap(), PumpOutcome::Sent(8));
        assert_eq!(bridge.pump_once(&mut source).unwrap(), PumpOutcome::Sent(2));
        assert_eq!(bridge.pump_once(&mut source).unwrap(), PumpOutcome::Closed);

        let frames = drain(&device);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data(), &payload[..8]);
        assert_eq!(frames[1].data(), &payload[8..]);
        assert_eq!(bridge.stats().snapshot().bytes_to_device, 10);
    }

    #[test]
    fn test_end_of_input_sends_nothing() {
        let (bridge, device) = bridge_on("proxy-eof");
        let mut source = Scripted::new(Vec::new());

        assert_eq!(bridge.pump_once(&mut source).unwrap(), PumpOutcome::Closed);
        assert!(drain(&device).is_empty());
    }

    #[tokio::test]
    async fn test_device_output_reaches_stdout() {
        let (mut bridge, device) = bridge_on("proxy-inbound");
        let out = SharedBuf::default();
        bridge.forward_to(out.clone());

        device
            .send(&CanMessage::extended(FROM_DEVICE_ID, &[0xAA]).unwrap())
            .unwrap();
        device
            .send(&CanMessage::standard(0x123, &[0x55]).unwrap())
            .unwrap();

        let watched = out.clone();
        let stats = Arc::clone(bridge.stats());
        bridge
            .run(Scripted::new(Vec::new()), async move {
                until(|| stats.snapshot().frames_received == 2).await;
            })
            .await
            .unwrap();

        assert_eq!(watched.contents(), vec![0xAA]);
        let snap = bridge.stats().snapshot();
        assert_eq!(snap.frames_forwarded, 1);
        assert_eq!(snap.frames_ignored, 1);
        assert_eq!(bridge.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_run_forwards_both_directions() {
        let (mut bridge, device) = bridge_on("proxy-both");
        let out = SharedBuf::default();
        bridge.forward_to(out.clone());

        device
            .send(&CanMessage::extended(FROM_DEVICE_ID, b"> ").unwrap())
            .unwrap();

        let source = Scripted::new(vec![Step::Idle, Step::Data(b"help\n".to_vec())]);
        let watched = out.clone();
        let stats = Arc::clone(bridge.stats());
        bridge
            .run(source, async move {
                until(|| stats.snapshot().frames_sent == 1 && !watched.contents().is_empty())
                    .await;
            })
            .await
            .unwrap();

        assert_eq!(out.contents(), b"> ");
        let frames = drain(&device);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data(), b"help\n");
    }

    #[tokio::test]
    async fn test_send_failure_ends_run() {
        let config = BridgeConfig::new("virtual");
        let mut bridge = ConsoleBridge::new(config, Arc::new(FailingBus));
        let source = Scripted::new(vec![Step::Data(vec![1])]);

        let result = bridge
            .run(source, tokio::time::sleep(Duration::from_secs(5)))
            .await;

        assert!(matches!(result, Err(BridgeError::Send(_))));
        assert_eq!(bridge.connection_state(), ConnectionState::Error);
        assert_eq!(bridge.stats().snapshot().error_count, 1);
        assert!(bridge.diagnostics().last_error.is_some());

        let mut source = Scripted::new(vec![Step::Data(vec![2])]);
        assert!(matches!(
            bridge.pump_once(&mut source),
            Err(BridgeError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_is_not_held_up_by_stalled_send() {
        let config = BridgeConfig::new("virtual");
        let bus = Arc::new(StallingBus(Duration::from_millis(1500)));
        let mut bridge = ConsoleBridge::new(config, bus);
        let source = Scripted::new(vec![Step::Data(vec![0x03])]);

        let started = std::time::Instant::now();
        bridge
            .run(source, tokio::time::sleep(Duration::from_millis(20)))
            .await
            .unwrap();

        assert!(
            started.elapsed() < Duration::from_millis(500),
            "run returned after {:?}",
            started.elapsed()
        );
        assert_eq!(bridge.stats().snapshot().frames_sent, 0);
        assert_eq!(bridge.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_ready_input_is_drained_within_one_tick() {
        let channel = "proxy-drain";
        let config = BridgeConfig::new("virtual")
            .with_channel(channel)
            .with_poll_interval(Duration::from_secs(3600));
        let host = Arc::new(VirtualBus::open(channel));
        let device = VirtualBus::open(channel);
        let mut bridge = ConsoleBridge::new(config, host);

        // Only the first tick fires within the test, so every chunk has to
        // go out on it.
        let source = Scripted::new(vec![
            Step::Data(vec![1; 8]),
            Step::Data(vec![2; 8]),
            Step::Data(vec![3; 4]),
            Step::Idle,
        ]);
        let stats = Arc::clone(bridge.stats());
        bridge
            .run(source, async move {
                until(|| stats.snapshot().frames_sent == 3).await;
            })
            .await
            .unwrap();

        let frames = drain(&device);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].data(), &[3; 4]);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let (mut bridge, _device) = bridge_on("proxy-start");
        bridge.start().unwrap();
        bridge.start().unwrap();
        assert!(bridge.connection_state().is_connected());
        bridge.stop().await;
        assert_eq!(bridge.connection_state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_diagnostics() {
        let (bridge, _device) = bridge_on("proxy-diag");
        let diag = bridge.diagnostics();
        assert_eq!(diag.bus, "virtual:proxy-diag");
        assert_eq!(diag.connection_state, ConnectionState::Disconnected);
        assert_eq!(diag.extra["bitrate_bps"], 500_000);
        assert_eq!(diag.extra["stats"]["frames_sent"], 0);
    }

    #[test]
    fn test_dyn_bus() {
        let config = BridgeConfig::new("virtual").with_channel("proxy-dyn");
        let bus = crate::bus::open(&config).unwrap();
        let bridge: ConsoleBridge = ConsoleBridge::new(config, bus);
        assert_eq!(bridge.bus().name(), "virtual:proxy-dyn");
    }
}
