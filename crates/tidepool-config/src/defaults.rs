use camino::Utf8PathBuf;
use std::env;

#[cfg(unix)]
use libc::geteuid;

use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// Host the TCP listener binds to by default.
pub const DEFAULT_TCP_HOST: &str = "127.0.0.1";

/// Default TCP port, matching the PostgreSQL convention.
pub const DEFAULT_TCP_PORT: u16 = 5432;

/// File name of the Unix domain socket.
pub const SOCKET_FILE_NAME: &str = ".s.PGSQL.5432";

/// File name of the engine database inside the data directory.
pub const ENGINE_FILE_NAME: &str = "tidepool.sqlite3";

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the daemon.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Default logging format for the daemon.
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Endpoint used when no listener is configured: TCP on `127.0.0.1:5432`.
pub fn default_listen_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp(DEFAULT_TCP_HOST, DEFAULT_TCP_PORT)
}

/// Endpoint for the Unix socket deployment variant.
///
/// The socket lives in a per-user directory under the system temporary
/// directory, e.g. `/tmp/tidepool/uid-1000/.s.PGSQL.5432`.
pub fn default_unix_endpoint() -> SocketEndpoint {
    let mut base = temp_base_directory();
    base.push("tidepool");
    #[cfg(unix)]
    base.push(user_namespace());
    SocketEndpoint::unix(base.join(SOCKET_FILE_NAME))
}

fn temp_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn user_namespace() -> String {
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}
