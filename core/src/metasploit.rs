//! Engine for the exploitation-framework backend: connection gate,
//! module selection, option mutation and execution dispatch.

use std::collections::BTreeMap;

use tracing::info;

use redops_backends::msf::{
    ExecutionResult, MsfConnector, MsfRpc, PayloadSelection, SessionId, SessionSummary,
};
use redops_common::config::MsfCredentials;
use redops_common::module::ModuleKind;
use redops_common::{Error, Result};

use crate::module::SelectedModule;
use crate::session::SessionShell;

/// Holds the one connection to the exploitation service plus the module
/// selection state. Every operation that needs the connection or a
/// selected module checks the precondition explicitly and reports its
/// absence; nothing is silently defaulted.
pub struct MetasploitEngine<C: MsfConnector> {
    connector: C,
    client: Option<C::Client>,
    exploit: Option<SelectedModule>,
    payload: Option<SelectedModule>,
}

impl<C: MsfConnector> MetasploitEngine<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            client: None,
            exploit: None,
            payload: None,
        }
    }

    /// Eagerly opens the RPC connection; it is reused for the rest of the
    /// process lifetime.
    pub fn login(&mut self, credentials: &MsfCredentials) -> Result<()> {
        let client = self.connector.connect(credentials)?;
        self.client = Some(client);
        info!(target: "redops::msf", server = %credentials.server, port = credentials.port, "logged in");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    fn client(&mut self) -> Result<&mut C::Client> {
        self.client.as_mut().ok_or(Error::ServiceUnavailable)
    }

    fn slot(&self, kind: ModuleKind) -> &Option<SelectedModule> {
        match kind {
            ModuleKind::Exploit => &self.exploit,
            ModuleKind::Payload => &self.payload,
        }
    }

    fn slot_mut(&mut self, kind: ModuleKind) -> &mut Option<SelectedModule> {
        match kind {
            ModuleKind::Exploit => &mut self.exploit,
            ModuleKind::Payload => &mut self.payload,
        }
    }

    /// The active module of the given kind.
    pub fn current_module(&self, kind: ModuleKind) -> Result<&SelectedModule> {
        self.slot(kind).as_ref().ok_or(Error::NoModuleSelected(kind))
    }

    pub fn module_names(&mut self, kind: ModuleKind) -> Result<Vec<String>> {
        self.client()?.module_names(kind)
    }

    /// Selects a module; the backend validates the name.
    pub fn use_module(&mut self, kind: ModuleKind, name: &str) -> Result<()> {
        let descriptor = self.client()?.module_descriptor(kind, name)?;
        info!(target: "redops::msf", %kind, name, "module selected");
        *self.slot_mut(kind) = Some(SelectedModule::new(descriptor));
        Ok(())
    }

    /// Partial option read on the active module of `kind`.
    pub fn module_options(
        &self,
        kind: ModuleKind,
        names: &[String],
    ) -> Result<BTreeMap<String, String>> {
        Ok(self.current_module(kind)?.options(names))
    }

    /// Best-effort option merge on the active module of `kind`.
    pub fn set_module_options(
        &mut self,
        kind: ModuleKind,
        updates: &BTreeMap<String, String>,
    ) -> Result<()> {
        let module = self
            .slot_mut(kind)
            .as_mut()
            .ok_or(Error::NoModuleSelected(kind))?;
        module.set_options(updates);
        Ok(())
    }

    /// Payloads compatible with the active exploit.
    pub fn exploit_payloads(&mut self) -> Result<Vec<String>> {
        let exploit = self.current_module(ModuleKind::Exploit)?.name().to_string();
        self.client()?.compatible_payloads(&exploit)
    }

    /// Executes the active exploit. The selected payload is attached only
    /// when `use_payload` is set and a payload is actually selected;
    /// otherwise the exploit runs standalone.
    pub fn execute(&mut self, use_payload: bool) -> Result<ExecutionResult> {
        let exploit = self.current_module(ModuleKind::Exploit)?;
        let name = exploit.name().to_string();
        let options = exploit.overrides().clone();
        let payload = if use_payload {
            self.payload.as_ref().map(|payload| PayloadSelection {
                name: payload.name().to_string(),
                options: payload.overrides().clone(),
            })
        } else {
            None
        };
        self.client()?
            .execute_module(ModuleKind::Exploit, &name, &options, payload.as_ref())
    }

    pub fn sessions(&mut self) -> Result<Vec<SessionSummary>> {
        self.client()?.sessions()
    }

    /// Opens an interactive shell over one live session.
    pub fn session_shell(&mut self, id: SessionId) -> Result<SessionShell<'_, C::Client>> {
        let known = self.sessions()?.iter().any(|session| session.id == id);
        if !known {
            return Err(Error::SessionNotFound(id));
        }
        Ok(SessionShell::new(self.client()?, id))
    }
}
