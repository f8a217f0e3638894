//! # Link Multiplexer
//!
//! The single-task event loop that owns every descriptor and all mutable
//! downlink state.
//!
//! Each iteration waits (with a short timeout, so queue draining and
//! reporting make progress even on a quiet link) for one ready source,
//! ingests it, and then arbitrates the downlink: a pending telemetry flush
//! is always served before any video packet - control-plane data must
//! never starve behind the bulk video stream. The `biased` select order
//! (serial, uplink, video input, timeout) encodes the same priority on the
//! ingestion side.
//!
//! Error policy: losing the flight controller link (serial read/write, or
//! the ground uplink that feeds it) is unrecoverable and terminates the
//! loop. Everything else - would-block, video EOF, queue-full drops, short
//! video sends - is transient and handled locally.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{DownlinkError, Result};
use crate::link::LinkStatus;
use crate::mavlink::batch::TelemetryBatch;
use crate::mavlink::framer::MavlinkFramer;
use crate::telemetry::{format_status_line, CpuMonitor};
use crate::video::packetizer::VideoPacketizer;
use crate::video::recorder::VideoRecorder;

/// Readiness wait timeout; bounds iteration latency on a quiet link
const POLL_TIMEOUT: Duration = Duration::from_millis(1);

/// Serial read buffer size
const SERIAL_BUF_SIZE: usize = 2048;

/// Uplink datagram buffer size
const UPLINK_BUF_SIZE: usize = 2048;

/// Video pipe read buffer size
const VIDEO_BUF_SIZE: usize = 65536;

/// Outcome of one readiness wait
enum Event {
    Serial(usize),
    Uplink(usize),
    Video(usize),
    VideoEof,
    Idle,
}

/// Telemetry flush arbitration state
///
/// `due` is raised at ingestion time; the serialized buffer is built at
/// transmit time and retained across iterations when the socket would
/// block, so a stalled link never loses a drained batch.
#[derive(Debug, Default)]
pub(crate) struct FlushState {
    due: bool,
    buffered: Option<Bytes>,
}

impl FlushState {
    /// Whether a flush is waiting for the next arbitration step
    pub(crate) fn is_due(&self) -> bool {
        self.due
    }

    pub(crate) fn mark_due(&mut self) {
        self.due = true;
    }
}

/// The downlink event loop and all state it owns
pub struct LinkMux<S, V> {
    serial: S,
    video_in: V,
    video_sock: UdpSocket,
    telemetry_sock: UdpSocket,
    status_sock: UdpSocket,
    framer: MavlinkFramer,
    batch: TelemetryBatch,
    packetizer: VideoPacketizer,
    recorder: Option<VideoRecorder>,
    status: LinkStatus,
    flush: FlushState,
    armed: bool,
    report_interval: Duration,
    cpu: CpuMonitor,
}

impl<S, V> LinkMux<S, V>
where
    S: AsyncRead + AsyncWrite + Unpin,
    V: AsyncRead + Unpin,
{
    /// Build the multiplexer: connect the three ground sockets and size
    /// both queues from the configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `serial` - Flight controller byte stream (serial port)
    /// * `video_in` - Elementary stream source (the camera pipe)
    pub async fn connect(config: &Config, serial: S, video_in: V) -> Result<Self> {
        let target = config.link.target_ip.as_str();
        let video_sock = connect_udp(target, config.link.video_port).await?;
        let telemetry_sock = connect_udp(target, config.link.telemetry_port).await?;
        let status_sock = connect_udp(target, config.link.status_port).await?;

        let recorder = if config.record.enabled {
            Some(VideoRecorder::create(
                config.record.path.as_ref(),
                config.record.max_file_size_mb * 1024 * 1024,
            )?)
        } else {
            None
        };

        Ok(Self {
            serial,
            video_in,
            video_sock,
            telemetry_sock,
            status_sock,
            framer: MavlinkFramer::new(),
            batch: TelemetryBatch::new(
                config.telemetry.fifo_messages,
                config.telemetry.flush_bytes,
                config.telemetry.urgent_msg_id,
            ),
            packetizer: VideoPacketizer::new(
                config.video.max_payload,
                config.video.tx_fifo_bytes,
                config.video.max_unit_bytes,
            ),
            recorder,
            status: LinkStatus::default(),
            flush: FlushState::default(),
            armed: false,
            report_interval: Duration::from_secs(config.report.interval_s),
            cpu: CpuMonitor::new(),
        })
    }

    /// Run the event loop until a fatal I/O error
    ///
    /// Never returns `Ok`: the loop runs for the process lifetime and the
    /// only exit is an unrecoverable error on the flight controller link
    /// or the telemetry flush path.
    pub async fn run(&mut self) -> Result<()> {
        let mut serial_buf = vec![0u8; SERIAL_BUF_SIZE];
        let mut uplink_buf = vec![0u8; UPLINK_BUF_SIZE];
        let mut video_buf = vec![0u8; VIDEO_BUF_SIZE];
        let mut video_eof = false;
        let mut next_report = Instant::now() + self.report_interval;

        info!("Link multiplexer running (report every {:?})", self.report_interval);

        loop {
            let event = tokio::select! {
                biased;

                r = self.serial.read(&mut serial_buf) => {
                    let n = r.map_err(|e| {
                        DownlinkError::Serial(format!("flight controller read failed: {}", e))
                    })?;
                    Event::Serial(n)
                }

                r = self.telemetry_sock.recv(&mut uplink_buf) => {
                    let n = r.map_err(|e| {
                        DownlinkError::Link(format!("ground uplink read failed: {}", e))
                    })?;
                    Event::Uplink(n)
                }

                r = self.video_in.read(&mut video_buf), if !video_eof => {
                    match r.map_err(DownlinkError::Io)? {
                        0 => Event::VideoEof,
                        n => Event::Video(n),
                    }
                }

                _ = tokio::time::sleep(POLL_TIMEOUT) => Event::Idle,
            };

            let idle = matches!(event, Event::Idle);
            match event {
                Event::Serial(n) => ingest_telemetry(
                    &mut self.framer,
                    &mut self.batch,
                    &mut self.flush,
                    &mut self.status,
                    &mut self.armed,
                    &serial_buf[..n],
                ),
                Event::Uplink(n) => {
                    self.serial.write_all(&uplink_buf[..n]).await.map_err(|e| {
                        DownlinkError::Serial(format!("flight controller write failed: {}", e))
                    })?;
                    self.status.mavlink_rx += n as u64;
                }
                Event::Video(n) => {
                    self.packetizer.input_stream(&video_buf[..n]);
                    if let Some(recorder) = self.recorder.as_mut() {
                        recorder.ingest(&video_buf[..n], self.armed)?;
                    }
                }
                Event::VideoEof => {
                    warn!("Video input reached EOF, continuing without a live video source");
                    video_eof = true;
                }
                Event::Idle => {}
            }

            // Arbitration runs every iteration, independent of readiness
            service_downlink(
                &mut self.batch,
                &mut self.packetizer,
                &mut self.flush,
                &self.telemetry_sock,
                &self.video_sock,
                &mut self.status,
            )?;

            // Reporting only piggybacks on timeout iterations, like the
            // queue-drain pass it summarizes
            if idle && Instant::now() >= next_report {
                self.report();
                next_report = Instant::now() + self.report_interval;
            }
        }
    }

    /// Flush state that must not be lost at process exit
    ///
    /// The recorder holds up to one write block in memory; exiting during
    /// an armed flight would otherwise discard the tail of the recording.
    pub fn shutdown(&mut self) -> Result<()> {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.flush(self.armed)?;
        }
        Ok(())
    }

    /// Emit the periodic status line and datagram, then reset counters
    fn report(&mut self) {
        self.status.video_tx = self.packetizer.bytes_outputted();
        self.status.video_dropped = self.packetizer.bytes_dropped();
        self.packetizer.clear_io_status();

        info!("{}", format_status_line(&self.status, self.armed));

        let framer_stats = self.framer.stats();
        if framer_stats.discarded > 0 {
            debug!(
                "Framer discarded {} corrupt frames ({} parsed)",
                framer_stats.discarded, framer_stats.messages
            );
        }
        self.framer.reset_stats();

        let air = self.cpu.sample();
        debug!("CPU load {:3.0}%   CPU temp {:.1}C", air.cpu_load, air.cpu_temp);
        if let Err(e) = self.status_sock.try_send(&air.encode()) {
            if e.kind() != io::ErrorKind::WouldBlock {
                warn!("Status datagram send failed: {}", e);
            }
        }

        self.status.clear();
    }
}

/// Bind an ephemeral local port and connect it to the ground station
async fn connect_udp(target: &str, port: u16) -> Result<UdpSocket> {
    let sock = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(|e| DownlinkError::Link(format!("UDP bind failed: {}", e)))?;
    sock.connect((target, port)).await.map_err(|e| {
        DownlinkError::Link(format!("UDP connect to {}:{} failed: {}", target, port, e))
    })?;
    Ok(sock)
}

/// Ingest serial bytes: frame, batch, and raise the flush flag
///
/// Rejected messages are counted against `mavlink_dropped` by payload
/// bytes; an urgent message raises the flush flag even when it was itself
/// rejected, the queued batch still deserves priority.
pub(crate) fn ingest_telemetry(
    framer: &mut MavlinkFramer,
    batch: &mut TelemetryBatch,
    flush: &mut FlushState,
    status: &mut LinkStatus,
    armed: &mut bool,
    bytes: &[u8],
) {
    for msg in framer.feed(bytes) {
        if let Some(is_armed) = msg.heartbeat_armed() {
            if *armed != is_armed {
                info!("Flight controller {}", if is_armed { "ARMED" } else { "DISARMED" });
            }
            *armed = is_armed;
        }

        let payload_len = msg.payload_len() as u64;
        if !batch.try_push(msg.clone()) {
            status.mavlink_dropped += payload_len;
            warn!("Telemetry batch full, dropping message id {}", msg.id);
        }

        if batch.flush_due(&msg) {
            flush.mark_due();
        }
    }
}

/// One arbitration pass: telemetry flush strictly precedes video
///
/// When a flush is due the batch is drained (or the retained buffer from a
/// stalled previous attempt is reused) and sent as one datagram; video is
/// not touched that iteration. Otherwise the video queue drains until
/// empty or the first incomplete send, which leaves the head packet queued
/// for retry.
pub(crate) fn service_downlink(
    batch: &mut TelemetryBatch,
    packetizer: &mut VideoPacketizer,
    flush: &mut FlushState,
    telemetry_sock: &UdpSocket,
    video_sock: &UdpSocket,
    status: &mut LinkStatus,
) -> Result<()> {
    if flush.due {
        if flush.buffered.is_none() && batch.is_empty() {
            flush.due = false;
            return Ok(());
        }
        let buf = match flush.buffered.take() {
            Some(retained) => retained,
            None => batch.drain(),
        };

        match telemetry_sock.try_send(&buf) {
            Ok(n) if n == buf.len() => {
                status.mavlink_tx += n as u64;
                // The batch may have refilled past the threshold while a
                // retained buffer waited out a stalled socket; keep the
                // flush armed so that backlog drains next pass
                flush.due = batch.backlog_due();
            }
            Ok(n) => {
                warn!("Short telemetry send ({} of {} bytes), retrying", n, buf.len());
                flush.buffered = Some(buf);
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                flush.buffered = Some(buf);
            }
            Err(e) => {
                return Err(DownlinkError::Link(format!("telemetry flush failed: {}", e)));
            }
        }
        return Ok(());
    }

    loop {
        let (len, sent) = {
            let Some(packet) = packetizer.get_tx_package() else {
                break;
            };
            (packet.len(), video_sock.try_send(packet.data()))
        };

        match sent {
            Ok(n) if n == len => packetizer.next_tx_package(),
            Ok(n) => {
                warn!("Short video send ({} of {} bytes)", n, len);
                break;
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => {
                // Transient on a best-effort link (e.g. ICMP-refused while
                // the ground station restarts); the head packet is retried
                debug!("Video send failed: {}", e);
                break;
            }
        }
    }
    Ok(())
}
