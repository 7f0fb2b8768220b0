//! Port/service scanner facade.
//!
//! [`PortScanner`] is the seam the scan engine drives. The shipped
//! implementation runs the `nmap` binary with XML output on stdout and
//! parses the report; one invocation per scanned host, blocking until the
//! scan finishes.

use std::path::PathBuf;
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::debug;

use redops_common::{Error, Result};

/// Service/version detection is on by default, matching the scanner's
/// behavior when no script-engine arguments are registered.
pub const DEFAULT_ARGUMENTS: &str = "-sV";

/// One blocking scan of a single host.
pub trait PortScanner {
    /// `ports` is a port spec (`"N"` or `"N-M"`); `arguments` replaces the
    /// default argument string when given (script-engine flags etc.).
    fn scan(&self, ip: &str, ports: Option<&str>, arguments: Option<&str>) -> Result<ScanReport>;
}

/// Parsed scan result, cached on the host that was scanned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub command: String,
    pub hosts: Vec<ScannedHost>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScannedHost {
    pub address: String,
    pub hostname: Option<String>,
    pub state: String,
    pub ports: Vec<PortReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortReport {
    pub port: u16,
    pub protocol: String,
    pub state: String,
    pub service: Option<String>,
    pub product: Option<String>,
    pub version: Option<String>,
}

/// Runs the system `nmap` binary and parses its `-oX -` report.
pub struct NmapCommandScanner {
    binary: PathBuf,
}

impl NmapCommandScanner {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for NmapCommandScanner {
    fn default() -> Self {
        Self::new("nmap")
    }
}

impl PortScanner for NmapCommandScanner {
    fn scan(&self, ip: &str, ports: Option<&str>, arguments: Option<&str>) -> Result<ScanReport> {
        let arguments = arguments.unwrap_or(DEFAULT_ARGUMENTS);
        let extra = shlex::split(arguments)
            .unwrap_or_else(|| arguments.split_whitespace().map(str::to_string).collect());

        let mut command = Command::new(&self.binary);
        command.arg("-oX").arg("-");
        if let Some(ports) = ports {
            command.arg("-p").arg(ports);
        }
        command.args(&extra);
        command.arg(ip);

        debug!(target: "redops::nmap", ip, ?ports, arguments, "running scan");
        let output = command.output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Backend(format!(
                "nmap exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let fallback = format!("{} {}", self.binary.display(), ip);
        parse_report(&String::from_utf8_lossy(&output.stdout), fallback)
    }
}

fn parse_report(xml: &str, fallback_command: String) -> Result<ScanReport> {
    let run: XmlNmapRun =
        quick_xml::de::from_str(xml).map_err(|err| Error::Protocol(format!("nmap xml: {err}")))?;

    let hosts = run
        .hosts
        .into_iter()
        .map(|host| {
            let address = host
                .addresses
                .iter()
                .find(|address| address.addrtype.starts_with("ip"))
                .or_else(|| host.addresses.first())
                .map(|address| address.addr.clone())
                .unwrap_or_default();
            ScannedHost {
                address,
                hostname: host
                    .hostnames
                    .and_then(|names| names.hostnames.into_iter().next())
                    .map(|hostname| hostname.name),
                state: host.status.state,
                ports: host
                    .ports
                    .map(|ports| ports.ports.into_iter().map(PortReport::from).collect())
                    .unwrap_or_default(),
            }
        })
        .collect();

    let command = if run.args.is_empty() {
        fallback_command
    } else {
        run.args
    };
    Ok(ScanReport { command, hosts })
}

impl From<XmlPort> for PortReport {
    fn from(port: XmlPort) -> Self {
        let service = port.service.unwrap_or_default();
        Self {
            port: port.portid,
            protocol: port.protocol,
            state: port.state.state,
            service: service.name,
            product: service.product,
            version: service.version,
        }
    }
}

#[derive(Debug, Deserialize)]
struct XmlNmapRun {
    #[serde(rename = "@args", default)]
    args: String,
    #[serde(rename = "host", default)]
    hosts: Vec<XmlHost>,
}

#[derive(Debug, Deserialize)]
struct XmlHost {
    status: XmlStatus,
    #[serde(rename = "address", default)]
    addresses: Vec<XmlAddress>,
    hostnames: Option<XmlHostnames>,
    ports: Option<XmlPorts>,
}

#[derive(Debug, Deserialize)]
struct XmlStatus {
    #[serde(rename = "@state")]
    state: String,
}

#[derive(Debug, Deserialize)]
struct XmlAddress {
    #[serde(rename = "@addr")]
    addr: String,
    #[serde(rename = "@addrtype", default)]
    addrtype: String,
}

#[derive(Debug, Deserialize)]
struct XmlHostnames {
    #[serde(rename = "hostname", default)]
    hostnames: Vec<XmlHostname>,
}

#[derive(Debug, Deserialize)]
struct XmlHostname {
    #[serde(rename = "@name")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct XmlPorts {
    #[serde(rename = "port", default)]
    ports: Vec<XmlPort>,
}

#[derive(Debug, Deserialize)]
struct XmlPort {
    #[serde(rename = "@protocol")]
    protocol: String,
    #[serde(rename = "@portid")]
    portid: u16,
    state: XmlPortState,
    service: Option<XmlService>,
}

#[derive(Debug, Deserialize)]
struct XmlPortState {
    #[serde(rename = "@state")]
    state: String,
}

#[derive(Debug, Default, Deserialize)]
struct XmlService {
    #[serde(rename = "@name")]
    name: Option<String>,
    #[serde(rename = "@product")]
    product: Option<String>,
    #[serde(rename = "@version")]
    version: Option<String>,
}
