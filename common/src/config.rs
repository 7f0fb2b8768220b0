//! Connection settings for the three backends.
//!
//! Defaults mirror a stock local install: an msfrpcd on the loopback
//! interface and a gvmd reachable through its unix socket.

pub const DEFAULT_MSF_USERNAME: &str = "msf";
pub const DEFAULT_MSF_SERVER: &str = "127.0.0.1";
pub const DEFAULT_MSF_PORT: u16 = 55553;

pub const DEFAULT_GVM_HOST: &str = "127.0.0.1";
pub const DEFAULT_GVM_PORT: u16 = 9390;
pub const DEFAULT_GVM_SOCKET: &str = "/run/gvmd/gvmd.sock";

/// Credentials for the exploitation-framework RPC service.
#[derive(Debug, Clone)]
pub struct MsfCredentials {
    pub password: String,
    pub username: String,
    pub server: String,
    pub port: u16,
    pub ssl: bool,
}

impl MsfCredentials {
    /// Credentials with every field but the password at its default.
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            username: DEFAULT_MSF_USERNAME.to_string(),
            server: DEFAULT_MSF_SERVER.to_string(),
            port: DEFAULT_MSF_PORT,
            ssl: false,
        }
    }
}

/// Credentials for the vulnerability-management service.
///
/// `host` doubles as the endpoint selector: a value containing a `/` is
/// treated as a gvmd unix-socket path, anything else as a TCP host.
#[derive(Debug, Clone)]
pub struct GvmCredentials {
    pub host: String,
    pub username: String,
    pub password: String,
}

impl Default for GvmCredentials {
    fn default() -> Self {
        Self {
            host: DEFAULT_GVM_HOST.to_string(),
            username: String::new(),
            password: String::new(),
        }
    }
}
