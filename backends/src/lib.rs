//! Client-side facades for the three remote security-tooling backends.
//!
//! Each module exposes a trait seam the engine depends on, plus a thin
//! concrete client speaking the backend's native protocol. The engine
//! never touches a transport directly.

pub mod gmp;
pub mod msf;
pub mod nmap;
