//! The one engine instance the command layer holds.

use redops_backends::gmp::VulnManager;
use redops_backends::msf::MsfConnector;
use redops_backends::nmap::PortScanner;

use crate::metasploit::MetasploitEngine;
use crate::scan::ScanEngine;
use crate::vuln::VulnEngine;

/// One connection per backend, owned exclusively for the process
/// lifetime. Constructed once by the outer command layer and passed
/// down; there is no ambient global state.
pub struct Console<C: MsfConnector, S: PortScanner, G: VulnManager> {
    pub metasploit: MetasploitEngine<C>,
    pub scanner: ScanEngine<S>,
    pub vuln: VulnEngine<G>,
}

impl<C: MsfConnector, S: PortScanner, G: VulnManager> Console<C, S, G> {
    pub fn new(connector: C, scanner: S, vuln_client: G) -> Self {
        Self {
            metasploit: MetasploitEngine::new(connector),
            scanner: ScanEngine::new(scanner),
            vuln: VulnEngine::new(vuln_client),
        }
    }
}
