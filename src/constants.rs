//! Shared constants for the CLI application
//!
//! This module contains global constants used across the application to ensure
//! consistency and avoid magic strings.

/// Name of the root command, used in usage lines and help output
pub const ROOT_COMMAND: &str = "socket";

/// Default base URL of the Socket API
pub const DEFAULT_API_BASE_URL: &str = "https://api.socket.dev/v0/";

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default connection timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// User agent string
pub const USER_AGENT: &str = concat!("socket-cli/", env!("CARGO_PKG_VERSION"));

/// Environment variable holding an API key that overrides the stored one
pub const ENV_API_KEY: &str = "SOCKET_SECURITY_API_KEY";

/// Environment variable overriding the API base URL
pub const ENV_API_BASE_URL: &str = "SOCKET_CLI_API_BASE_URL";

/// Environment variable holding an HTTP(S) proxy for API calls
pub const ENV_API_PROXY: &str = "SOCKET_SECURITY_API_PROXY";

/// Environment variable overriding where the shadow executables live
pub const ENV_SHADOW_DIR: &str = "SOCKET_CLI_SHADOW_DIR";

/// Shell alias lines installed by `socket wrapper --enable`
pub const WRAPPER_ALIASES: [&str; 2] = ["alias npm=\"socket npm\"", "alias npx=\"socket npx\""];
