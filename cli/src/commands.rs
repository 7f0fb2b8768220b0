pub mod metasploit;
pub mod nmap;
pub mod openvas;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::{Parser, Subcommand};

use redops_backends::gmp::GmpClient;
use redops_backends::msf::RpcConnector;
use redops_backends::nmap::NmapCommandScanner;
use redops_common::Error;
use redops_core::Console;

use crate::terminal::print;
use metasploit::{ExploitCommands, MetasploitCommands, PayloadCommands};
use nmap::NmapCommands;
use openvas::OpenvasCommands;

/// The concrete console the shell drives.
pub type OperatorConsole = Console<RpcConnector, NmapCommandScanner, GmpClient>;

/// Whether the shell keeps running after a command.
#[derive(Debug, PartialEq)]
pub enum Flow {
    Continue,
    Exit,
}

/// One line of shell input, parsed as a command tree.
#[derive(Parser)]
#[command(name = "redops", multicall = true)]
pub struct ShellCommand {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Commands to interact with the metasploit framework
    #[command(subcommand)]
    Metasploit(MetasploitCommands),
    /// Commands to list, use and configure exploits
    #[command(subcommand)]
    Exploit(ExploitCommands),
    /// Commands to list, use and configure payloads
    #[command(subcommand)]
    Payload(PayloadCommands),
    /// Commands to interact with the nmap tool
    #[command(subcommand)]
    Nmap(NmapCommands),
    /// Commands to interact with openvas services
    #[command(subcommand)]
    Openvas(OpenvasCommands),
    /// Leave the console
    #[command(alias = "quit")]
    Exit,
}

pub fn dispatch(
    console: &mut OperatorConsole,
    command: Commands,
    interrupted: &Arc<AtomicBool>,
) -> Flow {
    match command {
        Commands::Metasploit(command) => metasploit::metasploit(console, command, interrupted),
        Commands::Exploit(command) => metasploit::exploit(console, command),
        Commands::Payload(command) => metasploit::payload(console, command),
        Commands::Nmap(command) => nmap::run(console, command),
        Commands::Openvas(command) => openvas::run(console, command),
        Commands::Exit => return Flow::Exit,
    }
    Flow::Continue
}

/// Renders an engine error as the console's one-line message. Nothing
/// from the engine propagates as a crash.
pub(crate) fn fail(err: Error) {
    let message = match &err {
        Error::ServiceUnavailable => "First, log into metasploit server.".to_string(),
        Error::NoModuleSelected(kind) => format!("{kind} not selected."),
        Error::InvalidModuleName { kind, .. } => format!("Invalid {kind}."),
        Error::InvalidPayload => "Invalid payload".to_string(),
        Error::ConfigNotFound(_) => "Config name not found".to_string(),
        Error::PortRangeInvalid { .. } => "First port must be lower than last port".to_string(),
        Error::NoHostsRegistered => "Add hosts first".to_string(),
        Error::SessionNotFound(_) => "Session does not exist".to_string(),
        Error::Connection { backend, .. } => {
            format!("Verify {backend} server connection settings.")
        }
        other => other.to_string(),
    };
    print::error(&message);
}
