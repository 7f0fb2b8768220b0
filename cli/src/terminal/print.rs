use colored::*;

use redops_backends::nmap::ScanReport;

pub fn line(msg: &str) {
    println!("{msg}");
}

pub fn info(msg: &str) {
    println!("{} {}", "[*]".yellow().bold(), msg);
}

pub fn success(msg: &str) {
    println!("{} {}", "[+]".green().bold(), msg);
}

pub fn error(msg: &str) {
    println!("{} {}", "[-]".red().bold(), msg);
}

/// Scan reports render as pretty JSON, like the raw result maps the
/// backends hand back.
pub fn report(report: &ScanReport) {
    match serde_json::to_string_pretty(report) {
        Ok(rendered) => println!("{rendered}"),
        Err(err) => error(&format!("could not render report: {err}")),
    }
}
