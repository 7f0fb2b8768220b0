use std::fs;

use clap::Subcommand;

use redops_common::Error;

use crate::commands::{OperatorConsole, fail};
use crate::terminal::{print, spinner};

/// Where the scanner's script engine keeps its scripts.
const SCRIPT_DIR: &str = "/usr/share/nmap/scripts";

#[derive(Debug, Subcommand)]
pub enum NmapCommands {
    /// Add a host to be scanned. A range of ports can be given to reduce
    /// the scanning.
    AddHost {
        #[arg(value_name = "IP")]
        host_ip: String,
        /// Single port to scan, or first port of a range
        #[arg(short = 'f', long = "first-port", value_name = "port")]
        first_port: Option<u16>,
        /// Last port of a range; needs --first-port
        #[arg(short = 'l', long = "last-port", value_name = "port")]
        last_port: Option<u16>,
    },
    /// Runs a new scan against the given host id (default: last added).
    ScanHost {
        #[arg(value_name = "ID")]
        host_id: Option<usize>,
    },
    /// List the hosts previously added.
    ListHosts,
    /// Display the results of scanned hosts.
    ShowHostResults {
        /// Show all the results
        #[arg(long = "all-hosts")]
        all_hosts: bool,
        /// Host id of a scanned host; can be passed multiple times
        #[arg(short = 'H', long = "host", value_name = "id")]
        host_ids: Vec<usize>,
    },
    /// Add a script from the scanner's script engine to be used.
    AddScript {
        script: String,
        /// Parameter of the script chosen
        #[arg(short = 'p', value_name = "name=value")]
        params: Vec<String>,
    },
    /// List the scripts from the script engine available.
    ListScripts,
}

pub fn run(console: &mut OperatorConsole, command: NmapCommands) {
    match command {
        NmapCommands::AddHost {
            host_ip,
            first_port,
            last_port,
        } => match console.scanner.add_host(&host_ip, first_port, last_port) {
            Ok(Some(host)) => print::success(&format!("Added: {host}")),
            Ok(None) => {}
            Err(err) => fail(err),
        },
        NmapCommands::ScanHost { host_id } => {
            let progress = spinner::start("Scanning...".to_string());
            let result = console.scanner.scan_host(host_id);
            progress.finish_and_clear();
            match result {
                Ok(report) => print::report(report),
                Err(err) => fail_scan(err),
            }
        }
        NmapCommands::ListHosts => {
            for host in console.scanner.hosts() {
                print::line(&host.to_string());
            }
        }
        NmapCommands::ShowHostResults {
            all_hosts,
            host_ids,
        } => match console.scanner.host_results(all_hosts, &host_ids) {
            Ok(results) => {
                for result in results {
                    match result {
                        Some(report) => print::report(report),
                        None => print::line("(not scanned yet)"),
                    }
                }
            }
            Err(err) => fail_scan(err),
        },
        NmapCommands::AddScript { script, params } => {
            console.scanner.add_script(&script, &params);
            print::success(&format!("Script added: {script}"));
            if !params.is_empty() {
                print::line(&format!("With params: {}", params.join(" ")));
            }
        }
        NmapCommands::ListScripts => list_scripts(),
    }
}

fn fail_scan(err: Error) {
    match err {
        Error::IndexOutOfRange { .. } => print::error("Invalid host id"),
        other => fail(other),
    }
}

fn list_scripts() {
    match fs::read_dir(SCRIPT_DIR) {
        Ok(entries) => {
            let mut scripts: Vec<String> = entries
                .filter_map(|entry| entry.ok())
                .filter_map(|entry| entry.file_name().into_string().ok())
                .filter(|name| name.ends_with(".nse"))
                .collect();
            scripts.sort();
            for script in scripts {
                print::line(&script);
            }
        }
        Err(err) => print::error(&format!("could not read {SCRIPT_DIR}: {err}")),
    }
}
