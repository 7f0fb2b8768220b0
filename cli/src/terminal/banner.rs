use colored::*;

const BANNER: &str = r#"
    ____  __________  ____  ____  _____
   / __ \/ ____/ __ \/ __ \/ __ \/ ___/
  / /_/ / __/ / / / / / / / /_/ /\__ \
 / _, _/ /___/ /_/ / /_/ / ____/___/ /
/_/ |_/_____/_____/\____/_/    /____/
"#;

pub fn print() {
    println!("{}", BANNER.blue().bold());
    println!(
        "{}",
        format!(
            "v{}  operator console for metasploit / nmap / gvm",
            env!("CARGO_PKG_VERSION")
        )
        .bright_black()
    );
    println!();
}
