use std::io;

use console::Term;

use crate::terminal::print;

/// Prompts until the operator enters a number. `None` when input closes.
pub fn index(label: &str) -> Option<usize> {
    let term = Term::stdout();
    let stdin = io::stdin();
    loop {
        term.write_str(&format!("{label}: ")).ok()?;
        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => return None,
            Ok(_) => {}
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.parse() {
            Ok(value) => return Some(value),
            Err(_) => print::error("Enter a valid number"),
        }
    }
}

/// Prompts for one line, falling back to `default` on empty input.
pub fn line_with_default(label: &str, default: &str) -> String {
    let term = Term::stdout();
    if term.write_str(&format!("{label} [{default}]: ")).is_err() {
        return default.to_string();
    }
    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
        Ok(bytes) if bytes > 0 && !line.trim().is_empty() => line.trim().to_string(),
        _ => default.to_string(),
    }
}
