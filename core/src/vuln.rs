//! Engine for the vulnerability-management backend: scoped connection
//! acquisition, resource indexing, task dispatch and report retrieval.

use std::path::PathBuf;

use tracing::info;

use redops_backends::gmp::{ReportFormat, ReportRecord, ScanConfig, TargetRecord, VulnManager};
use redops_common::config::GvmCredentials;
use redops_common::{Error, Result};

/// Config used when a scan is requested without an explicit one.
pub const DEFAULT_CONFIG_NAME: &str = "Host Discovery";

/// A task with its progress rendered for display: the bare status once
/// the task is no longer running, `status: N%` while it is.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskStatus {
    pub id: String,
    pub name: String,
    pub progress: String,
}

/// Holds the manager credentials and the positional resource indexes.
///
/// Every listing operation re-fetches its list from the backend and
/// replaces the index in full; operator-facing numeric references
/// resolve against the most recent listing.
pub struct VulnEngine<G: VulnManager> {
    client: G,
    credentials: GvmCredentials,
    configs: Vec<ScanConfig>,
    targets: Vec<TargetRecord>,
    formats: Vec<ReportFormat>,
    reports: Vec<ReportRecord>,
}

impl<G: VulnManager> VulnEngine<G> {
    pub fn new(client: G) -> Self {
        Self {
            client,
            credentials: GvmCredentials::default(),
            configs: Vec::new(),
            targets: Vec::new(),
            formats: Vec::new(),
            reports: Vec::new(),
        }
    }

    pub fn set_host(&mut self, host: &str) {
        self.credentials.host = host.to_string();
    }

    pub fn set_username(&mut self, username: &str) {
        self.credentials.username = username.to_string();
    }

    pub fn set_password(&mut self, password: &str) {
        self.credentials.password = password.to_string();
    }

    pub fn credentials(&self) -> &GvmCredentials {
        &self.credentials
    }

    /// Scoped acquisition: the connection is opened before the operation
    /// and closed on every exit path, including failures.
    fn with_session<T>(&mut self, operation: impl FnOnce(&mut G) -> Result<T>) -> Result<T> {
        self.client.open(&self.credentials)?;
        let result = operation(&mut self.client);
        self.client.close();
        result
    }

    /// Names of the available scan configs; refreshes the config index.
    pub fn list_configs(&mut self) -> Result<Vec<String>> {
        self.configs = self.with_session(|client| client.list_configs())?;
        Ok(self
            .configs
            .iter()
            .map(|config| config.name.clone())
            .collect())
    }

    /// Registers a new target; name and host list are both the host.
    pub fn add_target(&mut self, host: &str) -> Result<()> {
        let id = self.with_session(|client| client.create_target(host, host))?;
        self.targets.push(TargetRecord {
            id,
            hosts: host.to_string(),
        });
        Ok(())
    }

    /// Hosts of the registered targets; refreshes the target index.
    pub fn list_targets(&mut self) -> Result<Vec<String>> {
        self.targets = self.with_session(|client| client.list_targets())?;
        Ok(self
            .targets
            .iter()
            .map(|target| target.hosts.clone())
            .collect())
    }

    /// Creates and starts a scan task for the target at `target_index`.
    ///
    /// The config name resolves by case-sensitive exact match across the
    /// full config list, defaulting to [`DEFAULT_CONFIG_NAME`]; the task
    /// is named after the target's hosts. Returns the new task id.
    pub fn scan(&mut self, target_index: usize, config_name: Option<&str>) -> Result<String> {
        let target = self
            .targets
            .get(target_index)
            .cloned()
            .ok_or(Error::IndexOutOfRange {
                index: target_index,
                len: self.targets.len(),
            })?;
        let wanted = config_name.unwrap_or(DEFAULT_CONFIG_NAME).to_string();

        let (configs, task_id) = self.with_session(|client| {
            let configs = client.list_configs()?;
            let config = configs
                .iter()
                .find(|config| config.name == wanted)
                .ok_or_else(|| Error::ConfigNotFound(wanted.clone()))?;
            let name = format!("Scan of IP {}", target.hosts);
            let task_id = client.create_task(&name, &config.id, &target.id)?;
            client.start_task(&task_id)?;
            Ok((configs, task_id))
        })?;

        self.configs = configs;
        info!(target: "redops::vuln", task = %task_id, "scan task started");
        Ok(task_id)
    }

    pub fn tasks(&mut self) -> Result<Vec<TaskStatus>> {
        let tasks = self.with_session(|client| client.list_tasks())?;
        Ok(tasks
            .into_iter()
            .map(|task| TaskStatus {
                progress: progress_label(task.progress, &task.status),
                id: task.id,
                name: task.name,
            })
            .collect())
    }

    /// `name: summary` lines; refreshes the format index.
    pub fn report_formats(&mut self) -> Result<Vec<String>> {
        self.formats = self.with_session(|client| client.list_report_formats())?;
        Ok(self
            .formats
            .iter()
            .map(|format| format!("{}: {}", format.name, format.summary))
            .collect())
    }

    /// One line per report; refreshes the report index.
    pub fn reports(&mut self) -> Result<Vec<String>> {
        self.reports = self.with_session(|client| client.list_reports())?;
        Ok(self
            .reports
            .iter()
            .map(|report| {
                format!(
                    "Task {}, created at {}",
                    report.task_name, report.creation_time
                )
            })
            .collect())
    }

    /// Downloads a report selected by positional references and writes it
    /// to `<path>.<extension>`; returns the written path.
    pub fn download_report(
        &mut self,
        report_index: usize,
        format_index: usize,
        path: &str,
    ) -> Result<PathBuf> {
        let report = self
            .reports
            .get(report_index)
            .cloned()
            .ok_or(Error::IndexOutOfRange {
                index: report_index,
                len: self.reports.len(),
            })?;
        let format = self
            .formats
            .get(format_index)
            .cloned()
            .ok_or(Error::IndexOutOfRange {
                index: format_index,
                len: self.formats.len(),
            })?;

        let content = self.with_session(|client| client.download_report(&report.id, &format.id))?;
        let destination = PathBuf::from(format!("{path}.{}", format.extension));
        std::fs::write(&destination, content)?;
        Ok(destination)
    }
}

fn progress_label(progress: i32, status: &str) -> String {
    if progress < 0 {
        status.to_string()
    } else {
        format!("{status}: {progress}%")
    }
}
