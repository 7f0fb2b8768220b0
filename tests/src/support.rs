#![cfg(test)]
//! Hand-rolled fake backends recording every call they receive.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use redops_backends::gmp::{
    ReportFormat, ReportRecord, ScanConfig, TargetRecord, TaskRecord, VulnManager,
};
use redops_backends::msf::{
    ExecutionResult, ModuleDescriptor, MsfConnector, MsfRpc, PayloadSelection, SessionId,
    SessionSummary,
};
use redops_backends::nmap::{PortScanner, ScanReport, ScannedHost};
use redops_common::config::{GvmCredentials, MsfCredentials};
use redops_common::module::ModuleKind;
use redops_common::{Error, Result};

#[derive(Default)]
pub struct MsfState {
    pub connects: Vec<MsfCredentials>,
    pub refuse_connect: bool,
    pub exploits: Vec<String>,
    pub payloads: Vec<String>,
    pub modules: Vec<ModuleDescriptor>,
    pub compatible: Vec<String>,
    pub executions: Vec<Execution>,
    pub sessions: Vec<SessionSummary>,
    pub written: Vec<(SessionId, String)>,
    pub replies: Vec<String>,
}

pub struct Execution {
    pub kind: ModuleKind,
    pub name: String,
    pub options: BTreeMap<String, String>,
    pub payload: Option<PayloadSelection>,
}

/// Shares its state with every clone, so tests keep a handle after the
/// engine takes ownership of the client.
#[derive(Clone, Default)]
pub struct FakeMsf {
    pub state: Rc<RefCell<MsfState>>,
}

impl FakeMsf {
    pub fn with_modules(modules: Vec<ModuleDescriptor>) -> Self {
        let fake = Self::default();
        fake.state.borrow_mut().modules = modules;
        fake
    }
}

impl MsfRpc for FakeMsf {
    fn module_names(&mut self, kind: ModuleKind) -> Result<Vec<String>> {
        let state = self.state.borrow();
        Ok(match kind {
            ModuleKind::Exploit => state.exploits.clone(),
            ModuleKind::Payload => state.payloads.clone(),
        })
    }

    fn module_descriptor(&mut self, kind: ModuleKind, name: &str) -> Result<ModuleDescriptor> {
        self.state
            .borrow()
            .modules
            .iter()
            .find(|module| module.kind == kind && module.name == name)
            .cloned()
            .ok_or(Error::InvalidModuleName {
                kind,
                name: name.to_string(),
            })
    }

    fn compatible_payloads(&mut self, _exploit: &str) -> Result<Vec<String>> {
        Ok(self.state.borrow().compatible.clone())
    }

    fn execute_module(
        &mut self,
        kind: ModuleKind,
        name: &str,
        options: &BTreeMap<String, String>,
        payload: Option<&PayloadSelection>,
    ) -> Result<ExecutionResult> {
        self.state.borrow_mut().executions.push(Execution {
            kind,
            name: name.to_string(),
            options: options.clone(),
            payload: payload.cloned(),
        });
        Ok(ExecutionResult {
            job_id: Some(7),
            uuid: Some("uuid-7".to_string()),
        })
    }

    fn sessions(&mut self) -> Result<Vec<SessionSummary>> {
        Ok(self.state.borrow().sessions.clone())
    }

    fn session_write(&mut self, id: SessionId, data: &str) -> Result<()> {
        self.state.borrow_mut().written.push((id, data.to_string()));
        Ok(())
    }

    fn session_read(&mut self, _id: SessionId) -> Result<String> {
        let mut state = self.state.borrow_mut();
        if state.replies.is_empty() {
            Ok(String::new())
        } else {
            Ok(state.replies.remove(0))
        }
    }
}

pub struct FakeConnector {
    pub client: FakeMsf,
}

impl FakeConnector {
    pub fn new(client: FakeMsf) -> Self {
        Self { client }
    }
}

impl MsfConnector for FakeConnector {
    type Client = FakeMsf;

    fn connect(&self, credentials: &MsfCredentials) -> Result<FakeMsf> {
        {
            let mut state = self.client.state.borrow_mut();
            if state.refuse_connect {
                return Err(Error::Connection {
                    backend: "metasploit",
                    reason: "connection refused".to_string(),
                });
            }
            state.connects.push(credentials.clone());
        }
        Ok(self.client.clone())
    }
}

#[derive(Default)]
pub struct ScanState {
    pub calls: Vec<ScanCall>,
}

pub struct ScanCall {
    pub ip: String,
    pub ports: Option<String>,
    pub arguments: Option<String>,
}

#[derive(Clone, Default)]
pub struct FakeScanner {
    pub state: Rc<RefCell<ScanState>>,
}

impl PortScanner for FakeScanner {
    fn scan(&self, ip: &str, ports: Option<&str>, arguments: Option<&str>) -> Result<ScanReport> {
        self.state.borrow_mut().calls.push(ScanCall {
            ip: ip.to_string(),
            ports: ports.map(str::to_string),
            arguments: arguments.map(str::to_string),
        });
        Ok(report_for(ip))
    }
}

pub fn report_for(ip: &str) -> ScanReport {
    ScanReport {
        command: format!("nmap -oX - {ip}"),
        hosts: vec![ScannedHost {
            address: ip.to_string(),
            hostname: None,
            state: "up".to_string(),
            ports: Vec::new(),
        }],
    }
}

#[derive(Default)]
pub struct VulnState {
    pub open: bool,
    pub opens: Vec<GvmCredentials>,
    pub closes: usize,
    pub configs: Vec<ScanConfig>,
    pub targets: Vec<TargetRecord>,
    pub created_targets: Vec<(String, String)>,
    pub created_tasks: Vec<CreatedTask>,
    pub started_tasks: Vec<String>,
    pub tasks: Vec<TaskRecord>,
    pub formats: Vec<ReportFormat>,
    pub reports: Vec<ReportRecord>,
    pub report_content: String,
    pub downloads: Vec<(String, String)>,
    pub fail_list_tasks: bool,
}

pub struct CreatedTask {
    pub name: String,
    pub config_id: String,
    pub target_id: String,
}

#[derive(Clone, Default)]
pub struct FakeVuln {
    pub state: Rc<RefCell<VulnState>>,
}

impl FakeVuln {
    /// Every privileged call must land between `open` and `close`.
    fn guard(&self) -> Result<()> {
        if self.state.borrow().open {
            Ok(())
        } else {
            Err(Error::ServiceUnavailable)
        }
    }
}

impl VulnManager for FakeVuln {
    fn open(&mut self, credentials: &GvmCredentials) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.open = true;
        state.opens.push(credentials.clone());
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state.borrow_mut();
        state.open = false;
        state.closes += 1;
    }

    fn list_configs(&mut self) -> Result<Vec<ScanConfig>> {
        self.guard()?;
        Ok(self.state.borrow().configs.clone())
    }

    fn create_target(&mut self, name: &str, hosts: &str) -> Result<String> {
        self.guard()?;
        let mut state = self.state.borrow_mut();
        state
            .created_targets
            .push((name.to_string(), hosts.to_string()));
        Ok(format!("target-{}", state.created_targets.len()))
    }

    fn list_targets(&mut self) -> Result<Vec<TargetRecord>> {
        self.guard()?;
        Ok(self.state.borrow().targets.clone())
    }

    fn create_task(&mut self, name: &str, config_id: &str, target_id: &str) -> Result<String> {
        self.guard()?;
        let mut state = self.state.borrow_mut();
        state.created_tasks.push(CreatedTask {
            name: name.to_string(),
            config_id: config_id.to_string(),
            target_id: target_id.to_string(),
        });
        Ok(format!("task-{}", state.created_tasks.len()))
    }

    fn start_task(&mut self, task_id: &str) -> Result<()> {
        self.guard()?;
        self.state
            .borrow_mut()
            .started_tasks
            .push(task_id.to_string());
        Ok(())
    }

    fn list_tasks(&mut self) -> Result<Vec<TaskRecord>> {
        self.guard()?;
        let state = self.state.borrow();
        if state.fail_list_tasks {
            return Err(Error::Backend("task listing failed".to_string()));
        }
        Ok(state.tasks.clone())
    }

    fn list_report_formats(&mut self) -> Result<Vec<ReportFormat>> {
        self.guard()?;
        Ok(self.state.borrow().formats.clone())
    }

    fn list_reports(&mut self) -> Result<Vec<ReportRecord>> {
        self.guard()?;
        Ok(self.state.borrow().reports.clone())
    }

    fn download_report(&mut self, report_id: &str, format_id: &str) -> Result<String> {
        self.guard()?;
        let mut state = self.state.borrow_mut();
        state
            .downloads
            .push((report_id.to_string(), format_id.to_string()));
        Ok(state.report_content.clone())
    }
}
