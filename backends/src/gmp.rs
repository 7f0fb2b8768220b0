//! Vulnerability-management service facade (GMP protocol).
//!
//! [`VulnManager`] is the seam the engine drives with scoped acquisition
//! semantics: `open` before every privileged operation, `close` afterwards
//! on every exit path. [`GmpClient`] speaks GMP XML over the manager's
//! unix socket or a plain TCP port; commands are written as single
//! elements and each response is deserialized straight off the stream.

use std::io::{self, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::os::unix::net::UnixStream;

use quick_xml::escape::escape;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use redops_common::config::{DEFAULT_GVM_PORT, GvmCredentials};
use redops_common::{Error, Result};

/// A scan configuration as listed by the manager.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    pub id: String,
    pub name: String,
}

/// A registered scan target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetRecord {
    pub id: String,
    pub hosts: String,
}

/// A scan task with its current state. `progress` is `-1` once the task
/// has left the running state.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub id: String,
    pub name: String,
    pub status: String,
    pub progress: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportFormat {
    pub id: String,
    pub name: String,
    pub summary: String,
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRecord {
    pub id: String,
    pub task_name: String,
    pub creation_time: String,
}

/// Backend primitives of the vulnerability-management service.
///
/// Implementations hold no open transport between calls: the engine
/// wraps every operation in an `open`/`close` pair.
pub trait VulnManager {
    fn open(&mut self, credentials: &GvmCredentials) -> Result<()>;

    /// Tears the connection down; infallible so it can run on error paths.
    fn close(&mut self);

    fn list_configs(&mut self) -> Result<Vec<ScanConfig>>;

    /// Returns the identifier of the created target.
    fn create_target(&mut self, name: &str, hosts: &str) -> Result<String>;

    fn list_targets(&mut self) -> Result<Vec<TargetRecord>>;

    /// Returns the identifier of the created task.
    fn create_task(&mut self, name: &str, config_id: &str, target_id: &str) -> Result<String>;

    fn start_task(&mut self, task_id: &str) -> Result<()>;

    fn list_tasks(&mut self) -> Result<Vec<TaskRecord>>;

    fn list_report_formats(&mut self) -> Result<Vec<ReportFormat>>;

    fn list_reports(&mut self) -> Result<Vec<ReportRecord>>;

    /// Returns the rendered report content in the requested format.
    fn download_report(&mut self, report_id: &str, format_id: &str) -> Result<String>;
}

/// GMP XML client over a unix or TCP socket.
#[derive(Default)]
pub struct GmpClient {
    connection: Option<GmpConnection>,
}

impl GmpClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn connection(&mut self) -> Result<&mut GmpConnection> {
        self.connection.as_mut().ok_or(Error::ServiceUnavailable)
    }
}

impl VulnManager for GmpClient {
    fn open(&mut self, credentials: &GvmCredentials) -> Result<()> {
        self.close();

        let stream = GmpStream::connect(&credentials.host)?;
        let reader = BufReader::new(stream.try_clone().map_err(|err| connection_error(err.to_string()))?);
        let mut connection = GmpConnection { reader, writer: stream };

        let command = format!(
            "<authenticate><credentials><username>{}</username><password>{}</password></credentials></authenticate>",
            escape(credentials.username.as_str()),
            escape(credentials.password.as_str()),
        );
        let reply: XmlStatusOnly = connection.request(&command)?;
        if !reply.status.starts_with('2') {
            return Err(connection_error(format!(
                "authentication failed: {} {}",
                reply.status, reply.status_text
            )));
        }

        debug!(target: "redops::gmp", host = %credentials.host, "session opened");
        self.connection = Some(connection);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.writer.shutdown();
        }
    }

    fn list_configs(&mut self) -> Result<Vec<ScanConfig>> {
        let reply: XmlGetConfigs = self.connection()?.request("<get_configs/>")?;
        ensure_ok(&reply.status, &reply.status_text, "get_configs")?;
        Ok(reply
            .configs
            .into_iter()
            .map(|config| ScanConfig {
                id: config.id,
                name: config.name,
            })
            .collect())
    }

    fn create_target(&mut self, name: &str, hosts: &str) -> Result<String> {
        let command = format!(
            "<create_target><name>{}</name><hosts>{}</hosts></create_target>",
            escape(name),
            escape(hosts),
        );
        let reply: XmlCreated = self.connection()?.request(&command)?;
        ensure_ok(&reply.status, &reply.status_text, "create_target")?;
        reply
            .id
            .ok_or_else(|| Error::Protocol("create_target reply carried no id".to_string()))
    }

    fn list_targets(&mut self) -> Result<Vec<TargetRecord>> {
        let reply: XmlGetTargets = self.connection()?.request("<get_targets/>")?;
        ensure_ok(&reply.status, &reply.status_text, "get_targets")?;
        Ok(reply
            .targets
            .into_iter()
            .map(|target| TargetRecord {
                id: target.id,
                hosts: target.hosts.unwrap_or_default(),
            })
            .collect())
    }

    fn create_task(&mut self, name: &str, config_id: &str, target_id: &str) -> Result<String> {
        let command = format!(
            "<create_task><name>{}</name><config id=\"{}\"/><target id=\"{}\"/></create_task>",
            escape(name),
            escape(config_id),
            escape(target_id),
        );
        let reply: XmlCreated = self.connection()?.request(&command)?;
        ensure_ok(&reply.status, &reply.status_text, "create_task")?;
        reply
            .id
            .ok_or_else(|| Error::Protocol("create_task reply carried no id".to_string()))
    }

    fn start_task(&mut self, task_id: &str) -> Result<()> {
        let command = format!("<start_task task_id=\"{}\"/>", escape(task_id));
        let reply: XmlStatusOnly = self.connection()?.request(&command)?;
        ensure_ok(&reply.status, &reply.status_text, "start_task")
    }

    fn list_tasks(&mut self) -> Result<Vec<TaskRecord>> {
        let reply: XmlGetTasks = self.connection()?.request("<get_tasks/>")?;
        ensure_ok(&reply.status, &reply.status_text, "get_tasks")?;
        Ok(reply
            .tasks
            .into_iter()
            .map(|task| TaskRecord {
                id: task.id,
                name: task.name,
                status: task.status,
                progress: task
                    .progress
                    .and_then(|progress| progress.value)
                    .and_then(|text| text.trim().parse().ok())
                    .unwrap_or(-1),
            })
            .collect())
    }

    fn list_report_formats(&mut self) -> Result<Vec<ReportFormat>> {
        let reply: XmlGetReportFormats = self.connection()?.request("<get_report_formats/>")?;
        ensure_ok(&reply.status, &reply.status_text, "get_report_formats")?;
        Ok(reply
            .formats
            .into_iter()
            .map(|format| ReportFormat {
                id: format.id,
                name: format.name,
                summary: format.summary.unwrap_or_default(),
                extension: format.extension.unwrap_or_default(),
            })
            .collect())
    }

    fn list_reports(&mut self) -> Result<Vec<ReportRecord>> {
        let reply: XmlGetReports = self.connection()?.request("<get_reports/>")?;
        ensure_ok(&reply.status, &reply.status_text, "get_reports")?;
        Ok(reply
            .reports
            .into_iter()
            .map(|report| {
                let inner = report.report.unwrap_or_default();
                let task = report.task.or(inner.task).unwrap_or_default();
                ReportRecord {
                    id: report.id,
                    task_name: task.name.unwrap_or_default(),
                    creation_time: report
                        .creation_time
                        .or(inner.creation_time)
                        .unwrap_or_default(),
                }
            })
            .collect())
    }

    fn download_report(&mut self, report_id: &str, format_id: &str) -> Result<String> {
        let command = format!(
            "<get_reports report_id=\"{}\" format_id=\"{}\" details=\"1\"/>",
            escape(report_id),
            escape(format_id),
        );
        let reply: XmlDownload = self.connection()?.request(&command)?;
        ensure_ok(&reply.status, &reply.status_text, "get_reports")?;
        Ok(reply
            .report
            .and_then(|report| report.content)
            .unwrap_or_default())
    }
}

fn connection_error(reason: String) -> Error {
    Error::Connection {
        backend: "gvm",
        reason,
    }
}

fn ensure_ok(status: &str, status_text: &str, command: &'static str) -> Result<()> {
    if status.starts_with('2') {
        Ok(())
    } else {
        Err(Error::Backend(format!(
            "{command} failed: {status} {status_text}"
        )))
    }
}

enum GmpStream {
    Tcp(TcpStream),
    Unix(UnixStream),
}

impl GmpStream {
    /// A host containing `/` is a gvmd unix-socket path, anything else a
    /// TCP host on the default manager port.
    fn connect(host: &str) -> Result<Self> {
        if host.contains('/') {
            UnixStream::connect(host)
                .map(GmpStream::Unix)
                .map_err(|err| connection_error(format!("{host}: {err}")))
        } else {
            TcpStream::connect((host, DEFAULT_GVM_PORT))
                .map(GmpStream::Tcp)
                .map_err(|err| connection_error(format!("{host}: {err}")))
        }
    }

    fn try_clone(&self) -> io::Result<Self> {
        match self {
            GmpStream::Tcp(stream) => stream.try_clone().map(GmpStream::Tcp),
            GmpStream::Unix(stream) => stream.try_clone().map(GmpStream::Unix),
        }
    }

    fn shutdown(&self) {
        let _ = match self {
            GmpStream::Tcp(stream) => stream.shutdown(Shutdown::Both),
            GmpStream::Unix(stream) => stream.shutdown(Shutdown::Both),
        };
    }
}

impl Read for GmpStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            GmpStream::Tcp(stream) => stream.read(buf),
            GmpStream::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for GmpStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            GmpStream::Tcp(stream) => stream.write(buf),
            GmpStream::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            GmpStream::Tcp(stream) => stream.flush(),
            GmpStream::Unix(stream) => stream.flush(),
        }
    }
}

struct GmpConnection {
    reader: BufReader<GmpStream>,
    writer: GmpStream,
}

impl GmpConnection {
    fn request<T: DeserializeOwned>(&mut self, command: &str) -> Result<T> {
        self.writer.write_all(command.as_bytes())?;
        self.writer.flush()?;
        quick_xml::de::from_reader(&mut self.reader)
            .map_err(|err| Error::Protocol(format!("gmp response: {err}")))
    }
}

#[derive(Debug, Deserialize)]
struct XmlStatusOnly {
    #[serde(rename = "@status")]
    status: String,
    #[serde(rename = "@status_text", default)]
    status_text: String,
}

#[derive(Debug, Deserialize)]
struct XmlCreated {
    #[serde(rename = "@status")]
    status: String,
    #[serde(rename = "@status_text", default)]
    status_text: String,
    #[serde(rename = "@id")]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XmlGetConfigs {
    #[serde(rename = "@status")]
    status: String,
    #[serde(rename = "@status_text", default)]
    status_text: String,
    #[serde(rename = "config", default)]
    configs: Vec<XmlConfig>,
}

#[derive(Debug, Deserialize)]
struct XmlConfig {
    #[serde(rename = "@id")]
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct XmlGetTargets {
    #[serde(rename = "@status")]
    status: String,
    #[serde(rename = "@status_text", default)]
    status_text: String,
    #[serde(rename = "target", default)]
    targets: Vec<XmlTarget>,
}

#[derive(Debug, Deserialize)]
struct XmlTarget {
    #[serde(rename = "@id")]
    id: String,
    hosts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XmlGetTasks {
    #[serde(rename = "@status")]
    status: String,
    #[serde(rename = "@status_text", default)]
    status_text: String,
    #[serde(rename = "task", default)]
    tasks: Vec<XmlTask>,
}

#[derive(Debug, Deserialize)]
struct XmlTask {
    #[serde(rename = "@id")]
    id: String,
    name: String,
    status: String,
    progress: Option<XmlProgress>,
}

/// The progress element mixes a bare percentage with per-host children;
/// only the leading text node is of interest here.
#[derive(Debug, Deserialize)]
struct XmlProgress {
    #[serde(rename = "$text", default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XmlGetReportFormats {
    #[serde(rename = "@status")]
    status: String,
    #[serde(rename = "@status_text", default)]
    status_text: String,
    #[serde(rename = "report_format", default)]
    formats: Vec<XmlReportFormat>,
}

#[derive(Debug, Deserialize)]
struct XmlReportFormat {
    #[serde(rename = "@id")]
    id: String,
    name: String,
    summary: Option<String>,
    extension: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XmlGetReports {
    #[serde(rename = "@status")]
    status: String,
    #[serde(rename = "@status_text", default)]
    status_text: String,
    #[serde(rename = "report", default)]
    reports: Vec<XmlReportEnvelope>,
}

#[derive(Debug, Deserialize)]
struct XmlReportEnvelope {
    #[serde(rename = "@id")]
    id: String,
    task: Option<XmlReportTask>,
    creation_time: Option<String>,
    report: Option<XmlInnerReport>,
}

#[derive(Debug, Default, Deserialize)]
struct XmlInnerReport {
    task: Option<XmlReportTask>,
    creation_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct XmlReportTask {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XmlDownload {
    #[serde(rename = "@status")]
    status: String,
    #[serde(rename = "@status_text", default)]
    status_text: String,
    report: Option<XmlDownloadReport>,
}

#[derive(Debug, Deserialize)]
struct XmlDownloadReport {
    #[serde(rename = "$text", default)]
    content: Option<String>,
}
