//! Time-navigation frame listing.
//!
//! The consuming plugin discovers available radar frames through a
//! RainViewer v2 `weather-maps.json` payload. The upstream provider only
//! serves "now", so the listing is synthesized: past frames at 10-minute
//! spacing all resolve to the same live layer, and nowcast/satellite
//! entries carry opaque ids the plugin echoes back in tile URLs.

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Frame spacing, in seconds. RainViewer publishes on a 10-minute cadence
/// and the plugin assumes it.
pub const FRAME_INTERVAL_SECS: i64 = 600;

/// Number of past radar frames advertised.
pub const PAST_FRAMES: i64 = 4;

/// Number of nowcast (forecast) radar frames advertised.
pub const NOWCAST_FRAMES: i64 = 2;

/// One navigable frame.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Frame {
    pub time: i64,
    pub path: String,
}

/// Radar frame groups.
#[derive(Debug, Clone, Serialize)]
pub struct RadarFrames {
    pub past: Vec<Frame>,
    pub nowcast: Vec<Frame>,
}

/// Satellite frame groups.
#[derive(Debug, Clone, Serialize)]
pub struct SatelliteFrames {
    pub infrared: Vec<Frame>,
}

/// The complete RainViewer v2 listing payload.
#[derive(Debug, Clone, Serialize)]
pub struct FrameListing {
    pub version: &'static str,
    pub generated: i64,
    pub host: String,
    pub radar: RadarFrames,
    pub satellite: SatelliteFrames,
}

impl FrameListing {
    /// Build the listing for the given Unix timestamp.
    ///
    /// Deterministic: the same `now` and `host` always produce the same
    /// payload, ids included, so replicas answer identically.
    pub fn generate(now: i64, host: &str) -> Self {
        let aligned = (now / FRAME_INTERVAL_SECS) * FRAME_INTERVAL_SECS;

        let past = (0..PAST_FRAMES)
            .rev()
            .map(|i| {
                let t = aligned - i * FRAME_INTERVAL_SECS;
                Frame {
                    time: t,
                    path: format!("/v2/radar/{}", t),
                }
            })
            .collect();

        let nowcast = (1..=NOWCAST_FRAMES)
            .map(|i| {
                let t = aligned + i * FRAME_INTERVAL_SECS;
                Frame {
                    time: t,
                    path: format!("/v2/radar/nowcast_{}", opaque_id("nowcast", t)),
                }
            })
            .collect();

        let infrared = (0..PAST_FRAMES)
            .rev()
            .map(|i| {
                let t = aligned - i * FRAME_INTERVAL_SECS;
                Frame {
                    time: t,
                    path: format!("/v2/satellite/{}", opaque_id("satellite", t)),
                }
            })
            .collect();

        Self {
            version: "2.0",
            generated: now,
            host: host.to_string(),
            radar: RadarFrames { past, nowcast },
            satellite: SatelliteFrames { infrared },
        }
    }

    /// Build the listing for the current wall-clock time.
    pub fn now(host: &str) -> Self {
        Self::generate(Utc::now().timestamp(), host)
    }
}

/// A short stable hex id for a frame. The plugin treats these as opaque
/// tokens and echoes them back in tile requests.
fn opaque_id(kind: &str, timestamp: i64) -> String {
    let digest = Sha256::digest(format!("{}:{}", kind, timestamp).as_bytes());
    digest[..6].iter().map(|b| format!("{:02x}", b)).collect()
}
