//! Engine for the port/service scanner backend: host bookkeeping,
//! script chaining and synchronous scan dispatch with result caching.

use std::fmt;

use tracing::info;

use redops_backends::nmap::{PortScanner, ScanReport};
use redops_common::{Error, Result};

/// A scan target registered by the operator.
///
/// The id is the insertion index; hosts are never removed, so ids stay
/// stable for the process lifetime.
#[derive(Debug, Clone)]
pub struct Host {
    pub id: usize,
    pub ip: String,
    pub ports: Option<String>,
    pub results: Option<ScanReport>,
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id: {}\n{}", self.id, self.ip)?;
        if let Some(ports) = &self.ports {
            write!(f, ":{ports}")?;
        }
        Ok(())
    }
}

/// One script-engine entry, applied to all subsequent scans.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub name: String,
    pub args: Option<String>,
}

impl Script {
    /// The form in which the entry lands in the scanner's script list.
    pub fn rendered(&self) -> String {
        match &self.args {
            Some(args) => format!("{} --script-args '{}'", self.name, args),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered())
    }
}

/// Holds the registered hosts and scripts and runs blocking scans
/// through the scanner facade.
pub struct ScanEngine<S: PortScanner> {
    scanner: S,
    hosts: Vec<Host>,
    scripts: Vec<Script>,
}

impl<S: PortScanner> ScanEngine<S> {
    pub fn new(scanner: S) -> Self {
        Self {
            scanner,
            hosts: Vec::new(),
            scripts: Vec::new(),
        }
    }

    /// Registers a host. An empty IP registers nothing; a backward port
    /// range is rejected before the host is stored.
    pub fn add_host(
        &mut self,
        ip: &str,
        first_port: Option<u16>,
        last_port: Option<u16>,
    ) -> Result<Option<&Host>> {
        if ip.is_empty() {
            return Ok(None);
        }
        let ports = port_spec(first_port, last_port)?;
        let id = self.hosts.len();
        self.hosts.push(Host {
            id,
            ip: ip.to_string(),
            ports,
            results: None,
        });
        Ok(self.hosts.last())
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    /// Scans one host, defaulting to the most recently added.
    ///
    /// The result is cached on the host; a host that already carries
    /// results is not scanned again, the cached report is returned.
    pub fn scan_host(&mut self, id: Option<usize>) -> Result<&ScanReport> {
        let Self {
            scanner,
            hosts,
            scripts,
        } = self;

        if hosts.is_empty() {
            return Err(Error::NoHostsRegistered);
        }
        let len = hosts.len();
        let index = id.unwrap_or(len - 1);
        let host = hosts
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })?;

        if host.results.is_none() {
            let arguments = script_arguments(scripts);
            info!(target: "redops::scan", ip = %host.ip, ports = ?host.ports, "scanning");
            host.results = Some(scanner.scan(&host.ip, host.ports.as_deref(), arguments.as_deref())?);
        }
        host.results
            .as_ref()
            .ok_or_else(|| Error::Backend("scan produced no report".to_string()))
    }

    /// Cached results, either for every host in registration order or for
    /// an explicit list of host ids.
    pub fn host_results(
        &self,
        all_hosts: bool,
        ids: &[usize],
    ) -> Result<Vec<Option<&ScanReport>>> {
        if all_hosts {
            return Ok(self.hosts.iter().map(|host| host.results.as_ref()).collect());
        }
        ids.iter()
            .map(|&index| {
                self.hosts
                    .get(index)
                    .map(|host| host.results.as_ref())
                    .ok_or(Error::IndexOutOfRange {
                        index,
                        len: self.hosts.len(),
                    })
            })
            .collect()
    }

    /// Registers a script for all subsequent scans.
    pub fn add_script(&mut self, name: &str, params: &[String]) {
        let args = if params.is_empty() {
            None
        } else {
            Some(params.join(" "))
        };
        self.scripts.push(Script {
            name: name.to_string(),
            args,
        });
    }

    pub fn scripts(&self) -> &[Script] {
        &self.scripts
    }
}

fn port_spec(first: Option<u16>, last: Option<u16>) -> Result<Option<String>> {
    match (first, last) {
        (Some(first), Some(last)) if first > last => Err(Error::PortRangeInvalid { first, last }),
        (Some(first), Some(last)) => Ok(Some(format!("{first}-{last}"))),
        (Some(first), None) => Ok(Some(first.to_string())),
        // A lone last port cannot form a range and is ignored.
        (None, _) => Ok(None),
    }
}

/// Comma-joins the registered scripts into one script-engine argument
/// string; `None` when no scripts are registered.
fn script_arguments(scripts: &[Script]) -> Option<String> {
    if scripts.is_empty() {
        return None;
    }
    let joined = scripts
        .iter()
        .map(Script::rendered)
        .collect::<Vec<_>>()
        .join(",");
    Some(format!("-sV --script {joined}"))
}
