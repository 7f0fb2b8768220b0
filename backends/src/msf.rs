//! Exploitation-framework RPC facade.
//!
//! [`MsfRpc`] is the seam the console engine drives; [`rpc::MsfRpcClient`]
//! implements it over the framework's msgpack-RPC HTTP endpoint. The
//! connection is established eagerly on an explicit login through a
//! [`MsfConnector`].

mod rpc;

use std::collections::BTreeMap;

use redops_common::Result;
use redops_common::config::MsfCredentials;
use redops_common::module::ModuleKind;

pub use rpc::{MsfRpcClient, RpcConnector};

pub type SessionId = u32;

/// A module as the backend declares it: its kind, its name and the
/// option names it accepts together with their backend-side values.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDescriptor {
    pub kind: ModuleKind,
    pub name: String,
    pub options: BTreeMap<String, String>,
}

/// The payload attached to an execution: module name plus the operator's
/// option overrides for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadSelection {
    pub name: String,
    pub options: BTreeMap<String, String>,
}

/// Handle returned by a successful execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionResult {
    pub job_id: Option<u64>,
    pub uuid: Option<String>,
}

/// One live session as reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub id: SessionId,
    pub session_type: String,
    pub info: String,
    pub tunnel_peer: String,
}

/// Backend primitives of the exploitation-framework RPC service.
///
/// All calls are blocking round-trips. Implementations map backend
/// rejections onto the engine error taxonomy: an unknown module name
/// becomes [`redops_common::Error::InvalidModuleName`], a rejected
/// payload [`redops_common::Error::InvalidPayload`] and an unknown
/// session id [`redops_common::Error::SessionNotFound`].
pub trait MsfRpc {
    fn module_names(&mut self, kind: ModuleKind) -> Result<Vec<String>>;

    fn module_descriptor(&mut self, kind: ModuleKind, name: &str) -> Result<ModuleDescriptor>;

    fn compatible_payloads(&mut self, exploit: &str) -> Result<Vec<String>>;

    fn execute_module(
        &mut self,
        kind: ModuleKind,
        name: &str,
        options: &BTreeMap<String, String>,
        payload: Option<&PayloadSelection>,
    ) -> Result<ExecutionResult>;

    fn sessions(&mut self) -> Result<Vec<SessionSummary>>;

    fn session_write(&mut self, id: SessionId, data: &str) -> Result<()>;

    fn session_read(&mut self, id: SessionId) -> Result<String>;
}

/// Eagerly opens a connection to the RPC service from explicit login
/// credentials.
pub trait MsfConnector {
    type Client: MsfRpc;

    fn connect(&self, credentials: &MsfCredentials) -> Result<Self::Client>;
}
