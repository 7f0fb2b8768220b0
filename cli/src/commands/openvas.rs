use clap::Subcommand;

use redops_common::Result;

use crate::commands::{OperatorConsole, fail};
use crate::terminal::{print, prompt};

#[derive(Debug, Subcommand)]
pub enum OpenvasCommands {
    /// Set different credentials values.
    Credentials {
        /// Greenbone server IP, or gvmd socket path, to connect to
        #[arg(short = 'H', long = "host", value_name = "IP")]
        host: Option<String>,
        /// Username in the Greenbone server
        #[arg(short = 'u', value_name = "username")]
        username: Option<String>,
        /// Password in the Greenbone server
        #[arg(short = 'p', value_name = "password")]
        password: Option<String>,
    },
    /// Run a new scan. With --configs, list the configurations available.
    Scan {
        /// List the configurations available to scan
        #[arg(long = "configs")]
        configs: bool,
        /// Choose a configuration before running the scan
        #[arg(long = "with-config")]
        with_config: bool,
    },
    /// List the targets available. With --create, create a new target.
    Targets {
        /// Create a new target
        #[arg(long = "create", value_name = "IP")]
        create: Option<String>,
    },
    /// List tasks and their current status.
    Tasks,
    /// List the reports available; --formats also lists the formats,
    /// --download prompts for a report to save.
    Reports {
        #[arg(long)]
        formats: bool,
        #[arg(long)]
        download: bool,
    },
}

pub fn run(console: &mut OperatorConsole, command: OpenvasCommands) {
    match command {
        OpenvasCommands::Credentials {
            host,
            username,
            password,
        } => {
            if let Some(password) = password {
                console.vuln.set_password(&password);
            }
            if let Some(username) = username {
                console.vuln.set_username(&username);
            }
            if let Some(host) = host {
                console.vuln.set_host(&host);
            }
            print::success("Ok");
        }
        OpenvasCommands::Scan {
            configs,
            with_config,
        } => {
            if configs {
                list(console.vuln.list_configs());
            } else {
                scan(console, with_config);
            }
        }
        OpenvasCommands::Targets { create } => match create {
            Some(host) => match console.vuln.add_target(&host) {
                Ok(()) => print::success("Ok"),
                Err(err) => fail(err),
            },
            None => list(console.vuln.list_targets()),
        },
        OpenvasCommands::Tasks => match console.vuln.tasks() {
            Ok(tasks) => {
                for task in tasks {
                    print::line(&format!(
                        "{}.\nScan ID: {}\nScan progress: {}\n",
                        task.name, task.id, task.progress
                    ));
                }
            }
            Err(err) => fail(err),
        },
        OpenvasCommands::Reports { formats, download } => reports(console, formats, download),
    }
}

fn list(result: Result<Vec<String>>) {
    match result {
        Ok(entries) => {
            for entry in entries {
                print::line(&entry);
            }
        }
        Err(err) => fail(err),
    }
}

fn enumerate(entries: &[String]) {
    for (index, entry) in entries.iter().enumerate() {
        print::line(&format!("{index} -> {entry}"));
    }
}

fn scan(console: &mut OperatorConsole, with_config: bool) {
    let targets = match console.vuln.list_targets() {
        Ok(targets) => targets,
        Err(err) => return fail(err),
    };
    enumerate(&targets);
    let Some(target) = prompt::index("Choose the target to scan") else {
        return;
    };

    let config = if with_config {
        let configs = match console.vuln.list_configs() {
            Ok(configs) => configs,
            Err(err) => return fail(err),
        };
        enumerate(&configs);
        let Some(choice) = prompt::index("Choose the configuration to use") else {
            return;
        };
        match configs.get(choice) {
            Some(name) => Some(name.clone()),
            None => return print::error("Invalid configuration id"),
        }
    } else {
        None
    };

    match console.vuln.scan(target, config.as_deref()) {
        Ok(task) => print::success(&format!("Scan task {task} started")),
        Err(err) => fail(err),
    }
}

fn reports(console: &mut OperatorConsole, formats: bool, download: bool) {
    if download {
        let reports = match console.vuln.reports() {
            Ok(reports) => reports,
            Err(err) => return fail(err),
        };
        if reports.is_empty() {
            return print::info("No reports available.");
        }
        let format_lines = match console.vuln.report_formats() {
            Ok(format_lines) => format_lines,
            Err(err) => return fail(err),
        };
        enumerate(&format_lines);
        let Some(format_index) = prompt::index("Choose the format to save") else {
            return;
        };
        enumerate(&reports);
        let Some(report_index) = prompt::index("Choose the report to save") else {
            return;
        };
        let default_path = default_report_path();
        let path = prompt::line_with_default(
            "Enter file name in which to save the report",
            &default_path,
        );
        match console.vuln.download_report(report_index, format_index, &path) {
            Ok(destination) => {
                print::success(&format!("Report saved to {}", destination.display()));
            }
            Err(err) => fail(err),
        }
        return;
    }

    if formats {
        list(console.vuln.report_formats());
    }
    list(console.vuln.reports());
}

fn default_report_path() -> String {
    std::env::var("HOME")
        .map(|home| format!("{home}/report"))
        .unwrap_or_else(|_| "report".to_string())
}
