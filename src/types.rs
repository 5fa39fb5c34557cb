#![allow(clippy::uninlined_format_args)]

#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

/// An ordered sequence of records in OS enumeration order
pub type ConnectionTable<T> = Vec<T>;

/// Transport protocol of a connection table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum Protocol {
    /// User Datagram Protocol
    Udp,
    /// Transmission Control Protocol
    Tcp,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Udp => write!(f, "UDP"),
            Self::Tcp => write!(f, "TCP"),
        }
    }
}

/// A textual IPv4 address together with a host-order port
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct AddressInfo {
    address: String,
    port: u16,
}

impl AddressInfo {
    #[must_use]
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }

    /// Dotted-decimal address
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Port in host byte order
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl std::fmt::Display for AddressInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// The process that owns a socket
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct OwnerProcessInfo {
    pid: u32,
    name: String,
}

impl OwnerProcessInfo {
    #[must_use]
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
        }
    }

    /// Process ID as reported by the connection table
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Executable image name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for OwnerProcessInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <PID: {}>", self.name, self.pid)
    }
}

/// Symbolic TCP connection states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum TcpState {
    Closed,
    Listen,
    SynSent,
    SynRcvd,
    Established,
    FinWait1,
    FinWait2,
    CloseWait,
    Closing,
    LastAck,
    TimeWait,
    DeleteTcb,
}

impl TcpState {
    /// Every state, in `MIB_TCP_STATE` order
    pub const ALL: [Self; 12] = [
        Self::Closed,
        Self::Listen,
        Self::SynSent,
        Self::SynRcvd,
        Self::Established,
        Self::FinWait1,
        Self::FinWait2,
        Self::CloseWait,
        Self::Closing,
        Self::LastAck,
        Self::TimeWait,
        Self::DeleteTcb,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Closed => "CLOSED",
            Self::Listen => "LISTEN",
            Self::SynSent => "SYN_SENT",
            Self::SynRcvd => "SYN_RCVD",
            Self::Established => "ESTABLISHED",
            Self::FinWait1 => "FIN_WAIT1",
            Self::FinWait2 => "FIN_WAIT2",
            Self::CloseWait => "CLOSE_WAIT",
            Self::Closing => "CLOSING",
            Self::LastAck => "LAST_ACK",
            Self::TimeWait => "TIME_WAIT",
            Self::DeleteTcb => "DELETE_TCB",
        }
    }
}

impl std::fmt::Display for TcpState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Name reported for a state code outside the known enumeration
pub const UNKNOWN_TCP_STATE: &str = "<UNKNOWN-TCP-STATE>";

/// A TCP state as reported by the OS: the raw code plus its decoded meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct TcpConnectionState {
    code: u32,
    state: Option<TcpState>,
}

impl TcpConnectionState {
    #[must_use]
    pub const fn new(code: u32, state: Option<TcpState>) -> Self {
        Self { code, state }
    }

    /// The raw code exactly as the OS reported it
    #[must_use]
    pub const fn code(&self) -> u32 {
        self.code
    }

    /// The decoded state, `None` for codes outside the enumeration
    #[must_use]
    pub const fn state(&self) -> Option<TcpState> {
        self.state
    }

    /// Symbolic name, or [`UNKNOWN_TCP_STATE`]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self.state {
            Some(state) => state.name(),
            None => UNKNOWN_TCP_STATE,
        }
    }
}

impl std::fmt::Display for TcpConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name(), self.code)
    }
}
