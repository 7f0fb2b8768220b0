//! The console engine: per-backend state machines mediating between
//! short operator commands and the ordered protocol interactions the
//! backends require.

pub mod console;
pub mod metasploit;
pub mod module;
pub mod options;
pub mod scan;
pub mod session;
pub mod vuln;

pub use console::Console;
