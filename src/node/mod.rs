//! Relay node runtime.
//!
//! Owns the statistics engine, drives the periodic-task scheduler from a
//! single poll loop, and talks to the mesh transport through narrow traits
//! so the radio stack stays an external collaborator:
//! - [`MeshTransport`] - outbound sends, reporting per-send signal quality
//! - [`TransportObserver`] - inbound event notifications from the transport
//! - [`TemperatureProbe`] / [`StatusIndicator`] - optional local hardware

pub mod scheduler;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

use crate::config::{Config, NodeRole};
use crate::report::{DeviceIdentity, ReportComposer};
use crate::stats::arc::Digest;
use crate::stats::clock::{Clock, SystemClock};
use crate::stats::{self, ForwardDirection, PeerId, SharedStats};
use scheduler::Scheduler;

/// Logical channel the ARC digest is addressed to.
pub const SENSOR_ID_ARC: u8 = 98;
/// Logical channel for inbound command messages.
pub const SENSOR_ID_CMND: u8 = 96;
/// Logical channel for keep-alive messages.
pub const SENSOR_ID_HELLO: u8 = 95;
/// Logical channel for temperature readings.
pub const SENSOR_ID_TEMP: u8 = 41;

/// Power-on sentinel some temperature probes report before the first
/// conversion completes; such readings are discarded.
const INVALID_TEMPERATURE: i32 = 85;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport not connected")]
    NotConnected,
    #[error("send failed: {0}")]
    Send(String),
}

/// Outbound half of the mesh transport.
///
/// `send` blocks until the link-layer send attempt completes and returns the
/// signal-quality value the radio reported for it, which the caller feeds to
/// the statistics engine exactly once.
pub trait MeshTransport: Send {
    fn send(&mut self, sensor: u8, payload: &str) -> Result<i32, TransportError>;
}

/// Optional polled temperature sensor.
pub trait TemperatureProbe: Send {
    /// Latest reading in degrees Celsius, or `None` when unavailable.
    fn reading(&mut self) -> Option<f32>;
}

/// Local status indicator driven with a sub-second blink pattern.
pub trait StatusIndicator: Send {
    fn set_active(&mut self, on: bool);
}

/// Indicator that goes nowhere.
pub struct NullIndicator;

impl StatusIndicator for NullIndicator {
    fn set_active(&mut self, _on: bool) {}
}

/// Inbound event notifications delivered by the transport.
///
/// The transport always calls through this interface; every method has a
/// no-op default body so implementations override only what they observe.
/// `on_message_received` fires for traffic addressed to this node,
/// `on_forward_preview` for traffic passing through on its way to the
/// parent; for any one message the transport fires exactly one of the two.
pub trait TransportObserver: Send + Sync {
    fn on_message_received(&self, peer: PeerId) {
        let _ = peer;
    }

    fn on_forward_preview(&self, origin: PeerId) {
        let _ = origin;
    }

    /// A send the transport performed autonomously (e.g. relaying) has
    /// completed, with the signal quality the radio reported for it.
    fn on_message_sent(&self, next_hop: PeerId, signal: i32) {
        let _ = (next_hop, signal);
    }

    fn on_forward_traffic(&self, direction: ForwardDirection) {
        let _ = direction;
    }

    fn on_transmit_error(&self) {}

    /// A text command arrived on the command channel.
    fn on_command(&self, text: &str) {
        let _ = text;
    }
}

/// Observer that discards every event.
pub struct NullObserver;

impl TransportObserver for NullObserver {}

/// The telemetry engine's observer implementation; registered with the
/// transport at startup. Every counter mutation goes through the shared
/// statistics mutex, so callbacks may interleave with the poll loop.
pub struct TelemetryObserver {
    stats: SharedStats,
}

impl TelemetryObserver {
    pub fn new(stats: SharedStats) -> Self {
        Self { stats }
    }
}

impl TransportObserver for TelemetryObserver {
    fn on_message_received(&self, peer: PeerId) {
        stats::lock(&self.stats).on_received(peer);
    }

    fn on_forward_preview(&self, origin: PeerId) {
        stats::lock(&self.stats).on_received(origin);
    }

    fn on_message_sent(&self, next_hop: PeerId, signal: i32) {
        stats::lock(&self.stats).on_sent(next_hop, signal);
    }

    fn on_forward_traffic(&self, direction: ForwardDirection) {
        stats::lock(&self.stats).on_forward_traffic(direction);
    }

    fn on_transmit_error(&self) {
        stats::lock(&self.stats).on_error();
    }

    fn on_command(&self, text: &str) {
        info!("Execute command '{}'", text);
    }
}

/// Periodic work driven by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskKind {
    ArcReport,
    KeepAlive,
    TemperaturePoll,
    IndicatorToggle,
}

/// Main relay node runtime that coordinates all operations.
pub struct RelayNode {
    config: Config,
    stats: SharedStats,
    composer: ReportComposer,
    observer: Arc<TelemetryObserver>,
    transport: Option<Box<dyn MeshTransport>>,
    probe: Option<Box<dyn TemperatureProbe>>,
    indicator: Box<dyn StatusIndicator>,
    scheduler: Scheduler<TaskKind>,
    started: Instant,
    restart_tx: mpsc::UnboundedSender<()>,
    restart_rx: mpsc::UnboundedReceiver<()>,
}

impl RelayNode {
    /// Create a new relay node instance
    pub fn new(config: Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Like [`RelayNode::new`] with an explicit wall clock.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let stats = stats::shared(clock);
        let identity = DeviceIdentity::from_config(&config);
        let composer = ReportComposer::new(identity, stats.clone());
        let observer = Arc::new(TelemetryObserver::new(stats.clone()));

        let mut sched = Scheduler::new();
        sched.add(TaskKind::ArcReport, secs_to_ms(config.reporting.arc_interval_secs), 0);
        // keep-alives announce the relay to its parent; a gateway has none
        if config.node.role == NodeRole::Repeater {
            sched.add(
                TaskKind::KeepAlive,
                secs_to_ms(config.reporting.keep_alive_interval_secs),
                0,
            );
        }
        if config.sensor.enabled {
            sched.add(
                TaskKind::TemperaturePoll,
                secs_to_ms(config.reporting.temperature_interval_secs),
                0,
            );
        }
        sched.add(
            TaskKind::IndicatorToggle,
            config.reporting.indicator_interval_ms.min(u32::MAX as u64) as u32,
            0,
        );

        let (restart_tx, restart_rx) = mpsc::unbounded_channel();
        Ok(RelayNode {
            config,
            stats,
            composer,
            observer,
            transport: None,
            probe: None,
            indicator: Box::new(NullIndicator),
            scheduler: sched,
            started: Instant::now(),
            restart_tx,
            restart_rx,
        })
    }

    /// Attach the mesh transport used for outbound reports.
    pub fn attach_transport(&mut self, transport: Box<dyn MeshTransport>) {
        self.transport = Some(transport);
    }

    pub fn attach_probe(&mut self, probe: Box<dyn TemperatureProbe>) {
        self.probe = Some(probe);
    }

    pub fn attach_indicator(&mut self, indicator: Box<dyn StatusIndicator>) {
        self.indicator = indicator;
    }

    /// Observer to register with the transport for inbound events.
    pub fn observer(&self) -> Arc<dyn TransportObserver> {
        self.observer.clone()
    }

    pub fn stats(&self) -> SharedStats {
        self.stats.clone()
    }

    pub fn composer(&self) -> ReportComposer {
        self.composer.clone()
    }

    /// Handle the web surface uses to request a process restart.
    pub fn restart_handle(&self) -> mpsc::UnboundedSender<()> {
        self.restart_tx.clone()
    }

    /// Milliseconds since node start as a wrapping monotonic counter.
    fn uptime_ms(&self) -> u32 {
        self.started.elapsed().as_millis() as u32
    }

    /// Run the node main loop until shutdown or restart is requested.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "node '{}' up as {:?}, id {} parent {}",
            self.config.node.hostname,
            self.config.node.role,
            self.config.node.node_id,
            self.config.node.parent_id
        );

        // One digest right after bring-up so the controller sees us early
        self.emit_arc_digest();

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
                restart = self.restart_rx.recv() => {
                    if restart.is_some() {
                        info!("Restart requested, leaving main loop");
                        break;
                    }
                }
                _ = sleep(Duration::from_millis(25)) => {}
            }

            self.tick(self.uptime_ms());
        }

        info!("node '{}' shut down", self.config.node.hostname);
        Ok(())
    }

    /// Evaluate the scheduler against a monotonic millisecond counter and
    /// run whatever came due. `run` drives this from real uptime; tests can
    /// drive it with a synthetic counter.
    pub fn tick(&mut self, now_ms: u32) {
        for task in self.scheduler.poll(now_ms) {
            self.fire(task, now_ms);
        }
    }

    fn fire(&mut self, task: TaskKind, now_ms: u32) {
        match task {
            TaskKind::ArcReport => self.emit_arc_digest(),
            TaskKind::KeepAlive => self.emit_keep_alive(now_ms),
            TaskKind::TemperaturePoll => self.poll_temperature(),
            TaskKind::IndicatorToggle => self.drive_indicator(now_ms),
        }
    }

    /// Emit the compact ARC digest to its logical channel.
    fn emit_arc_digest(&mut self) {
        let payload = Digest::from(stats::lock(&self.stats).arc_aggregate()).to_string();
        if self.send(SENSOR_ID_ARC, &payload) {
            info!("ARC: {}", payload);
        }
    }

    fn emit_keep_alive(&mut self, now_ms: u32) {
        let payload = now_ms.to_string();
        if self.send(SENSOR_ID_HELLO, &payload) {
            debug!("keep-alive @ {}ms", now_ms);
        }
    }

    fn poll_temperature(&mut self) {
        let Some(probe) = &mut self.probe else { return };
        let Some(t) = probe.reading() else {
            debug!("temperature probe returned no reading");
            return;
        };
        if t as i32 == INVALID_TEMPERATURE {
            return;
        }
        let payload = format!("{t:.1}");
        if self.send(SENSOR_ID_TEMP, &payload) {
            info!("Temperature {}°C", payload);
        }
    }

    fn drive_indicator(&mut self, now_ms: u32) {
        // ~1s cycle with a short on-phase
        let phase = now_ms & 0x3FF;
        self.indicator.set_active(phase < 50);
    }

    /// Send a payload over the transport and fold the completed send into
    /// the statistics, once. Returns true when the send went out.
    fn send(&mut self, sensor: u8, payload: &str) -> bool {
        let Some(transport) = &mut self.transport else {
            debug!("no transport attached, dropping payload for sensor {}", sensor);
            return false;
        };
        match transport.send(sensor, payload) {
            Ok(signal) => {
                let next_hop = self.config.node.parent_id;
                stats::lock(&self.stats).on_sent(next_hop, signal);
                true
            }
            Err(e) => {
                warn!("send to sensor {} failed: {}", sensor, e);
                stats::lock(&self.stats).on_error();
                false
            }
        }
    }

    /// Show node status
    pub fn show_status(&self) {
        let snapshot = stats::lock(&self.stats).snapshot();
        let role = match self.config.node.role {
            NodeRole::Repeater => "repeater",
            NodeRole::Gateway => "gateway",
        };
        let payload = serde_json::json!({
            "hostname": self.config.node.hostname,
            "role": role,
            "node_id": self.config.node.node_id,
            "parent_id": self.config.node.parent_id,
            "transport": self.transport.is_some(),
            "web": self.config.web.enabled,
            "rx": snapshot.link.received,
            "tx": snapshot.link.sent,
            "errors": snapshot.link.errors,
            "arc": {
                "packets": snapshot.arc.packets,
                "retries": snapshot.arc.retries,
                "success": snapshot.arc.success_rate,
            },
            "elapsed_secs": snapshot.elapsed_secs,
        });
        println!("{}", payload);
    }
}

fn secs_to_ms(secs: u64) -> u32 {
    secs.saturating_mul(1000).min(u32::MAX as u64) as u32
}
