//! Named performance profiles
//!
//! A profile turns a partially filled [`Tunables`] into a complete one:
//! defaults fill unset values, floors raise values below the profile's
//! minimum, then the profile's explicit switches are applied.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Default frame size (32 KB)
pub const DEFAULT_FRAME_SIZE: usize = 32 * 1024;

/// Largest frame size a single frame can carry
pub const MAX_FRAME_SIZE: usize = 65535;

/// Default receive/stream window (4 MB)
pub const DEFAULT_WINDOW: usize = 4 * 1024 * 1024;

/// Default TCP keepalive interval in seconds
pub const DEFAULT_KEEPALIVE_SECS: u64 = 15;

const MIB: usize = 1024 * 1024;

/// Per-frame payload compression; both peers must use the same mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMode {
    #[default]
    None,
    Snappy,
}

/// Resolved tuning knobs; numeric zero means "unset"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tunables {
    /// Bytes carried per frame
    pub frame_size: usize,
    /// Session receive window
    pub max_recv_window: usize,
    /// Per-stream receive window
    pub max_stream_window: usize,
    /// Kernel receive buffer (SO_RCVBUF)
    pub tcp_read_buffer: usize,
    /// Kernel send buffer (SO_SNDBUF)
    pub tcp_write_buffer: usize,
    /// TCP keepalive interval
    pub tcp_keepalive_secs: u64,
    /// Disable Nagle's algorithm
    pub tcp_nodelay: bool,
    pub compression: CompressionMode,
    /// Accepted for compatibility; the TCP transport ignores it
    pub fragment_enabled: bool,
    pub obfuscation_enabled: bool,
    /// Inject send-side jitter when obfuscating
    pub jitter_enabled: bool,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            frame_size: 0,
            max_recv_window: 0,
            max_stream_window: 0,
            tcp_read_buffer: 0,
            tcp_write_buffer: 0,
            tcp_keepalive_secs: 0,
            tcp_nodelay: true,
            compression: CompressionMode::None,
            fragment_enabled: false,
            obfuscation_enabled: true,
            jitter_enabled: true,
        }
    }
}

/// Known performance profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    #[default]
    Balanced,
    Aggressive,
    Performance,
    Stable,
    Latency,
}

/// Minimum values a profile enforces
#[derive(Debug, Clone, Copy, Default)]
struct Floors {
    frame_size: usize,
    window: usize,
    tcp_buffer: usize,
}

impl Profile {
    pub const ALL: [Profile; 5] = [
        Profile::Balanced,
        Profile::Aggressive,
        Profile::Performance,
        Profile::Stable,
        Profile::Latency,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Balanced => "balanced",
            Profile::Aggressive => "aggressive",
            Profile::Performance => "performance",
            Profile::Stable => "stable",
            Profile::Latency => "latency",
        }
    }

    /// Look up a profile, falling back to [`Profile::Balanced`]
    pub fn from_name(name: &str) -> Profile {
        name.parse().unwrap_or_else(|_| {
            warn!("Unknown profile '{}', using balanced", name);
            Profile::Balanced
        })
    }

    fn default_keepalive(self) -> u64 {
        match self {
            Profile::Aggressive | Profile::Performance | Profile::Latency => 5,
            Profile::Balanced | Profile::Stable => DEFAULT_KEEPALIVE_SECS,
        }
    }

    fn floors(self) -> Floors {
        match self {
            Profile::Aggressive | Profile::Performance => Floors {
                frame_size: 32 * 1024,
                window: 8 * MIB,
                tcp_buffer: 8 * MIB,
            },
            Profile::Latency => Floors {
                frame_size: 32 * 1024,
                ..Floors::default()
            },
            Profile::Balanced | Profile::Stable => Floors::default(),
        }
    }

    fn apply_overrides(self, t: &mut Tunables) {
        match self {
            Profile::Balanced => {}
            Profile::Aggressive | Profile::Stable => {
                t.jitter_enabled = false;
            }
            Profile::Performance => {
                t.obfuscation_enabled = false;
                t.fragment_enabled = false;
                t.compression = CompressionMode::None;
                t.jitter_enabled = false;
            }
            Profile::Latency => {
                t.tcp_nodelay = true;
                t.jitter_enabled = false;
            }
        }
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Profile::ALL
            .into_iter()
            .find(|p| p.as_str() == name)
            .ok_or_else(|| format!("unknown profile: {}", s))
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve `base` under the named profile
///
/// Never fails: unknown names resolve as `balanced`. Resolving an already
/// resolved value again yields the same value.
pub fn resolve(base: &Tunables, profile_name: &str) -> Tunables {
    resolve_profile(base, Profile::from_name(profile_name))
}

/// Resolve `base` under a known profile
pub fn resolve_profile(base: &Tunables, profile: Profile) -> Tunables {
    let mut t = base.clone();

    if t.frame_size == 0 {
        t.frame_size = DEFAULT_FRAME_SIZE;
    }
    if t.max_recv_window == 0 {
        t.max_recv_window = DEFAULT_WINDOW;
    }
    if t.max_stream_window == 0 {
        t.max_stream_window = DEFAULT_WINDOW;
    }
    if t.tcp_keepalive_secs == 0 {
        t.tcp_keepalive_secs = profile.default_keepalive();
    }

    let floors = profile.floors();
    t.frame_size = t.frame_size.max(floors.frame_size);
    t.max_recv_window = t.max_recv_window.max(floors.window);
    t.max_stream_window = t.max_stream_window.max(floors.window);
    t.tcp_read_buffer = t.tcp_read_buffer.max(floors.tcp_buffer);
    t.tcp_write_buffer = t.tcp_write_buffer.max(floors.tcp_buffer);

    profile.apply_overrides(&mut t);

    t.frame_size = t.frame_size.min(MAX_FRAME_SIZE);
    t
}
