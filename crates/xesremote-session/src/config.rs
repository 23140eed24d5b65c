use std::time::Duration;

/// Backend endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "wss://codedynamic.xueersi.com/api/compileapi/ws/run";

/// Interval between liveness frames once the session is open.
pub const DEFAULT_LIVENESS_INTERVAL: Duration = Duration::from_secs(10);

/// Upgrade response header naming the backend node that served the connection.
pub const DEFAULT_HOST_HEADER: &str = "x-host";

/// Reported by `Session::host` when the upgrade response carried no usable host header.
pub const UNKNOWN_HOST: &str = "unknown";

const DEFAULT_COMMAND_CAPACITY: usize = 64;

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket endpoint of the backend.
    pub endpoint: String,
    /// Interval between liveness frames while open.
    pub liveness_interval: Duration,
    /// Upgrade response header read by `Session::host`.
    pub host_header: String,
    /// Maximum queued send requests before `Session::send` waits for room.
    pub command_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            liveness_interval: DEFAULT_LIVENESS_INTERVAL,
            host_header: DEFAULT_HOST_HEADER.to_string(),
            command_capacity: DEFAULT_COMMAND_CAPACITY,
        }
    }
}
