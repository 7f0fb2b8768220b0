use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Subcommand;

use redops_backends::msf::SessionId;
use redops_common::config::MsfCredentials;
use redops_common::module::ModuleKind;
use redops_core::options::OptionTokens;

use crate::commands::{OperatorConsole, fail};
use crate::terminal::print;

#[derive(Debug, Subcommand)]
pub enum MetasploitCommands {
    /// Log into the metasploit server. A msfrpcd must be active to
    /// interact with the framework.
    Login {
        password: String,
        /// Username used to authenticate to msfrpcd (default: msf)
        #[arg(short = 'u', value_name = "username")]
        username: Option<String>,
        /// Remote server IP address hosting msfrpcd (default: 127.0.0.1)
        #[arg(short = 's', value_name = "IP")]
        server: Option<String>,
        /// Remote msfrpcd port to connect to (default: 55553)
        #[arg(short = 'p', value_name = "port")]
        port: Option<u16>,
        /// Enable ssl connection
        #[arg(long)]
        ssl: bool,
    },
    /// List active sessions and interact with them.
    Sessions {
        /// List all active sessions
        #[arg(short = 'l', long = "list")]
        list: bool,
        /// Interact with the given session
        #[arg(short = 'i', long = "interact", value_name = "ID")]
        session_id: Option<SessionId>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ExploitCommands {
    /// List metasploit exploits available.
    List,
    /// Choose exploit to use.
    Use { exploit: String },
    /// Display and modify information about exploit options.
    Options {
        /// Set option values instead of reading them
        #[arg(long)]
        modify: bool,
        /// Option name to read, or name=value to set with --modify
        #[arg(short = 'o', long = "op", value_name = "option[=value]")]
        options: Vec<String>,
    },
    /// List the payloads that can be used with the exploit selected.
    Payloads,
    /// Execute the exploit selected and configured. With --payload the
    /// selected payload is attached, if any.
    Execute {
        /// Execute with the selected payload
        #[arg(long = "payload")]
        use_payload: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum PayloadCommands {
    /// Choose payload to use.
    Use { payload: String },
    /// Display and modify information about payload options.
    Options {
        /// Set option values instead of reading them
        #[arg(long)]
        modify: bool,
        /// Option name to read, or name=value to set with --modify
        #[arg(short = 'o', long = "op", value_name = "option[=value]")]
        options: Vec<String>,
    },
}

pub fn metasploit(
    console: &mut OperatorConsole,
    command: MetasploitCommands,
    interrupted: &Arc<AtomicBool>,
) {
    match command {
        MetasploitCommands::Login {
            password,
            username,
            server,
            port,
            ssl,
        } => {
            let mut credentials = MsfCredentials::new(password);
            if let Some(username) = username {
                credentials.username = username;
            }
            if let Some(server) = server {
                credentials.server = server;
            }
            if let Some(port) = port {
                credentials.port = port;
            }
            credentials.ssl = ssl;

            match console.metasploit.login(&credentials) {
                Ok(()) => print::success("Logged in"),
                Err(err) => fail(err),
            }
        }
        MetasploitCommands::Sessions { list, session_id } => {
            if list {
                list_sessions(console);
            } else if let Some(id) = session_id {
                interact(console, id, interrupted);
            }
        }
    }
}

fn list_sessions(console: &mut OperatorConsole) {
    match console.metasploit.sessions() {
        Ok(sessions) if sessions.is_empty() => print::info("No active sessions"),
        Ok(sessions) => {
            for session in sessions {
                print::line(&format!(
                    "{}  {}  {}  {}",
                    session.id, session.session_type, session.info, session.tunnel_peer
                ));
            }
        }
        Err(err) => fail(err),
    }
}

fn interact(console: &mut OperatorConsole, id: SessionId, interrupted: &Arc<AtomicBool>) {
    let flag = Arc::clone(interrupted);
    let result = console.metasploit.session_shell(id).and_then(|mut shell| {
        let stdin = io::stdin();
        shell.run(stdin.lock(), io::stdout(), move || {
            flag.swap(false, Ordering::SeqCst)
        })
    });
    if let Err(err) = result {
        fail(err);
    }
}

pub fn exploit(console: &mut OperatorConsole, command: ExploitCommands) {
    match command {
        ExploitCommands::List => match console.metasploit.module_names(ModuleKind::Exploit) {
            Ok(names) => {
                for name in names {
                    print::line(&name);
                }
            }
            Err(err) => fail(err),
        },
        ExploitCommands::Use { exploit } => {
            if let Err(err) = console.metasploit.use_module(ModuleKind::Exploit, &exploit) {
                fail(err);
            }
        }
        ExploitCommands::Options { modify, options } => {
            module_options(console, ModuleKind::Exploit, modify, &options);
        }
        ExploitCommands::Payloads => match console.metasploit.exploit_payloads() {
            Ok(payloads) => {
                for payload in payloads {
                    print::line(&payload);
                }
            }
            Err(err) => fail(err),
        },
        ExploitCommands::Execute { use_payload } => {
            match console.metasploit.execute(use_payload) {
                Ok(result) => {
                    let job = result
                        .job_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    let uuid = result.uuid.unwrap_or_default();
                    print::success(&format!("Execution started, job {job} uuid {uuid}"));
                }
                Err(err) => fail(err),
            }
        }
    }
}

pub fn payload(console: &mut OperatorConsole, command: PayloadCommands) {
    match command {
        PayloadCommands::Use { payload } => {
            if let Err(err) = console.metasploit.use_module(ModuleKind::Payload, &payload) {
                fail(err);
            }
        }
        PayloadCommands::Options { modify, options } => {
            module_options(console, ModuleKind::Payload, modify, &options);
        }
    }
}

/// One invocation is either all reads or all writes, decided by the
/// --modify flag; tokens on the wrong side of the split are ignored.
fn module_options(
    console: &mut OperatorConsole,
    kind: ModuleKind,
    modify: bool,
    tokens: &[String],
) {
    let tokens = OptionTokens::classify(tokens.iter().map(String::as_str));
    let result = if modify {
        console.metasploit.set_module_options(kind, &tokens.writes)
    } else {
        console
            .metasploit
            .module_options(kind, &tokens.reads)
            .map(|options| {
                for (name, value) in options {
                    print::line(&format!("{name} = {value}"));
                }
            })
    };
    if let Err(err) = result {
        fail(err);
    }
}
