use thiserror::Error;

use crate::module::ModuleKind;

pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the console engine and the backend clients.
///
/// Every variant up to [`Error::SessionNotFound`] is caught at the command
/// boundary and rendered as a one-line message; the remaining variants carry
/// transport-level failures.
#[derive(Error, Debug)]
pub enum Error {
    /// Establishing or re-opening a backend link failed. Recoverable, the
    /// operator retries the login/credentials command.
    #[error("connection to {backend} failed: {reason}")]
    Connection {
        backend: &'static str,
        reason: String,
    },

    /// A privileged operation was issued before a login established the
    /// exploitation-framework connection.
    #[error("not logged into the metasploit server")]
    ServiceUnavailable,

    /// An option or execution operation was issued with no module of the
    /// required kind selected.
    #[error("{0} not selected")]
    NoModuleSelected(ModuleKind),

    /// The backend rejected the module name passed to a use operation.
    #[error("invalid {kind}: {name}")]
    InvalidModuleName { kind: ModuleKind, name: String },

    /// The backend rejected the payload attached to an execution.
    #[error("the selected payload was rejected by the backend")]
    InvalidPayload,

    /// A scan-config name did not resolve to any known configuration.
    #[error("config name not found: {0}")]
    ConfigNotFound(String),

    #[error("first port {first} is greater than last port {last}")]
    PortRangeInvalid { first: u16, last: u16 },

    /// A scan was requested while no hosts were registered.
    #[error("no hosts registered to scan")]
    NoHostsRegistered,

    /// A positional reference exceeded the current list length. Distinct
    /// from [`Error::NoHostsRegistered`]: the collection exists but the
    /// index is stale or wrong.
    #[error("index {index} is out of range for a list of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("session {0} does not exist")]
    SessionNotFound(u32),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The backend answered with something the client could not decode.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The backend reported a failure the engine has no dedicated variant
    /// for; the message is surfaced verbatim.
    #[error("backend error: {0}")]
    Backend(String),
}
