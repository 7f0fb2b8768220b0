use std::fmt;

/// The two selectable module kinds on the exploitation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    Exploit,
    Payload,
}

impl ModuleKind {
    /// Wire name understood by the RPC service.
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleKind::Exploit => "exploit",
            ModuleKind::Payload => "payload",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
