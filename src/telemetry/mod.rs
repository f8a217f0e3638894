//! # Status Telemetry Module
//!
//! The periodic status report collaborators: CPU load and temperature
//! sampling, the fixed-layout status datagram, and the human-readable
//! status line.
//!
//! Sampling reads `/proc/stat` and the thermal zone sysfs node; on
//! platforms or containers where those are absent the values degrade to
//! zero rather than failing, this is reporting, not flight-critical data.

use std::fs;

use tracing::warn;

use crate::link::LinkStatus;

/// Thermal zone sysfs node (millidegrees Celsius)
const THERMAL_ZONE_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

/// CPU time accounting source
const PROC_STAT_PATH: &str = "/proc/stat";

/// Fixed-layout status record sent to the ground once per report interval
///
/// Wire layout: `cpu_load: f32 LE`, `cpu_temp: f32 LE` - 8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AirStatus {
    /// CPU load since the previous sample, percent
    pub cpu_load: f32,
    /// CPU temperature, degrees Celsius
    pub cpu_temp: f32,
}

impl AirStatus {
    /// Encoded datagram size
    pub const ENCODED_LEN: usize = 8;

    /// Serialize for the status socket
    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut buf = [0u8; Self::ENCODED_LEN];
        buf[..4].copy_from_slice(&self.cpu_load.to_le_bytes());
        buf[4..].copy_from_slice(&self.cpu_temp.to_le_bytes());
        buf
    }

    /// Deserialize a status datagram (ground-side helper)
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::ENCODED_LEN {
            return None;
        }
        Some(Self {
            cpu_load: f32::from_le_bytes(buf[..4].try_into().ok()?),
            cpu_temp: f32::from_le_bytes(buf[4..8].try_into().ok()?),
        })
    }
}

/// CPU load/temperature sampler
///
/// Load is computed from the delta of `/proc/stat` jiffies between
/// consecutive samples, so the first sample after startup reports the load
/// since boot.
#[derive(Debug, Default)]
pub struct CpuMonitor {
    /// user, nice, system, idle jiffies at the previous sample
    last: [f64; 4],
}

impl CpuMonitor {
    /// Create a monitor with zeroed history
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample CPU load and temperature
    pub fn sample(&mut self) -> AirStatus {
        AirStatus {
            cpu_load: self.sample_load(),
            cpu_temp: sample_temp(),
        }
    }

    fn sample_load(&mut self) -> f32 {
        let now = match read_cpu_times() {
            Some(times) => times,
            None => {
                warn!("Could not read {}", PROC_STAT_PATH);
                return 0.0;
            }
        };

        let busy = (now[0] + now[1] + now[2]) - (self.last[0] + self.last[1] + self.last[2]);
        let total = now.iter().sum::<f64>() - self.last.iter().sum::<f64>();
        self.last = now;

        if total > 0.0 {
            (busy / total * 100.0) as f32
        } else {
            0.0
        }
    }
}

/// First four jiffy counters of the aggregate cpu line
fn read_cpu_times() -> Option<[f64; 4]> {
    let stat = fs::read_to_string(PROC_STAT_PATH).ok()?;
    let line = stat.lines().next()?;
    let mut fields = line.split_whitespace();
    if fields.next()? != "cpu" {
        return None;
    }

    let mut times = [0.0f64; 4];
    for slot in times.iter_mut() {
        *slot = fields.next()?.parse().ok()?;
    }
    Some(times)
}

/// CPU temperature in degrees Celsius, 0.0 when unavailable
fn sample_temp() -> f32 {
    match fs::read_to_string(THERMAL_ZONE_PATH) {
        Ok(raw) => raw.trim().parse::<f32>().map(|md| md / 1000.0).unwrap_or(0.0),
        Err(_) => 0.0,
    }
}

/// Format the periodic status line
///
/// One line per report interval with the six values the operator watches:
/// telemetry tx/rx/dropped, video tx/dropped, and the armed state.
pub fn format_status_line(status: &LinkStatus, armed: bool) -> String {
    format!(
        "Status:   Mavlink (tx|rx|dropped): {:7.2}KB | {:6}B | {:7.2}KB   Video (tx|dropped): {:7.2}MB | {:7.2}MB   FC={}",
        status.mavlink_tx as f64 / 1024.0,
        status.mavlink_rx,
        status.mavlink_dropped as f64 / 1024.0,
        status.video_tx as f64 / (1024.0 * 1024.0),
        status.video_dropped as f64 / (1024.0 * 1024.0),
        if armed { "ARMED" } else { "DISARMED" },
    )
}
