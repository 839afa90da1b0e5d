use std::fmt;

/// OPC UA status code. The top two bits carry the severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StatusCode(pub u32);

const SEVERITY_MASK: u32 = 0xC000_0000;
const UNCERTAIN_BIT: u32 = 0x4000_0000;
const BAD_BIT: u32 = 0x8000_0000;

/// Well-known codes with symbolic names.
const KNOWN: &[(u32, &str)] = &[
    (0x0000_0000, "Good"),
    (0x4000_0000, "Uncertain"),
    (0x4090_0000, "UncertainLastUsableValue"),
    (0x8000_0000, "Bad"),
    (0x8001_0000, "BadUnexpectedError"),
    (0x8002_0000, "BadInternalError"),
    (0x8005_0000, "BadCommunicationError"),
    (0x800A_0000, "BadTimeout"),
    (0x8031_0000, "BadNoCommunication"),
    (0x8032_0000, "BadWaitingForInitialData"),
    (0x8034_0000, "BadNodeIdUnknown"),
    (0x808D_0000, "BadOutOfService"),
];

impl StatusCode {
    pub const GOOD: StatusCode = StatusCode(0);
    pub const UNCERTAIN: StatusCode = StatusCode(UNCERTAIN_BIT);
    pub const BAD: StatusCode = StatusCode(BAD_BIT);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_good(self) -> bool {
        self.0 & SEVERITY_MASK == 0
    }

    pub fn is_uncertain(self) -> bool {
        self.0 & SEVERITY_MASK == UNCERTAIN_BIT
    }

    pub fn is_bad(self) -> bool {
        self.0 & BAD_BIT != 0
    }

    /// Symbolic name for well-known codes.
    pub fn symbol(self) -> Option<&'static str> {
        KNOWN.iter().find(|(c, _)| *c == self.0).map(|(_, n)| *n)
    }
}

impl From<u32> for StatusCode {
    fn from(v: u32) -> Self {
        StatusCode(v)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.symbol() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}
