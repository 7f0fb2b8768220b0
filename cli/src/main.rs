mod commands;
mod terminal;

use std::io::{self, ErrorKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use console::Term;

use redops_backends::gmp::GmpClient;
use redops_backends::msf::RpcConnector;
use redops_backends::nmap::NmapCommandScanner;
use redops_core::Console;

use commands::{Flow, ShellCommand};
use terminal::{banner, logging, print};

const PROMPT: &str = "redops>> ";

fn main() -> anyhow::Result<()> {
    logging::init();
    banner::print();

    // SIGINT only raises a flag: a pending interrupt aborts the current
    // interaction and falls back to the prompt instead of killing the
    // process.
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&interrupted);
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;
    }

    let mut console = Console::new(RpcConnector, NmapCommandScanner::default(), GmpClient::new());
    let term = Term::stdout();
    let stdin = io::stdin();

    loop {
        term.write_str(PROMPT)?;
        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
        if interrupted.swap(false, Ordering::SeqCst) {
            continue;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(tokens) = shlex::split(line) else {
            print::error("Unbalanced quoting in command line");
            continue;
        };
        match ShellCommand::try_parse_from(&tokens) {
            Ok(shell) => {
                if commands::dispatch(&mut console, shell.command, &interrupted) == Flow::Exit {
                    break;
                }
            }
            Err(err) => {
                let _ = err.print();
            }
        }
    }

    Ok(())
}
