//! Decoding of raw connection-table fields
//!
//! Connection tables hand out addresses, ports and TCP states in the
//! encodings the kernel uses internally. The functions here turn them into
//! the values shown to users. All of them are total: any input decodes.

use std::net::Ipv4Addr;

use crate::types::{AddressInfo, TcpConnectionState, TcpState};

/// An IPv4 endpoint in the layout connection tables expose it.
///
/// `addr` holds the four octets in network order as they sit in memory, so
/// its numeric value depends on host endianness. `port` carries the port in
/// network order in its low 16 bits; the upper bits are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawEndpoint {
    pub addr: u32,
    pub port: u32,
}

impl RawEndpoint {
    #[must_use]
    pub const fn new(addr: u32, port: u32) -> Self {
        Self { addr, port }
    }

    /// Pack a decoded address back into table layout
    #[must_use]
    pub fn from_parts(ip: Ipv4Addr, port: u16) -> Self {
        Self {
            addr: u32::from_ne_bytes(ip.octets()),
            port: u32::from(port.to_be()),
        }
    }
}

/// Dotted-decimal text for a raw table address
#[must_use]
pub fn decode_address(raw: u32) -> String {
    Ipv4Addr::from(raw.to_ne_bytes()).to_string()
}

/// Host-order port for a raw table port
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn decode_port(raw: u32) -> u16 {
    u16::from_be((raw & 0xFFFF) as u16)
}

#[must_use]
pub fn decode_endpoint(raw: RawEndpoint) -> AddressInfo {
    AddressInfo::new(decode_address(raw.addr), decode_port(raw.port))
}

/// Windows `MIB_TCP_STATE`
const MIB_STATES: &[(u32, TcpState)] = &[
    (1, TcpState::Closed),
    (2, TcpState::Listen),
    (3, TcpState::SynSent),
    (4, TcpState::SynRcvd),
    (5, TcpState::Established),
    (6, TcpState::FinWait1),
    (7, TcpState::FinWait2),
    (8, TcpState::CloseWait),
    (9, TcpState::Closing),
    (10, TcpState::LastAck),
    (11, TcpState::TimeWait),
    (12, TcpState::DeleteTcb),
];

/// Linux `include/net/tcp_states.h`. `TCP_NEW_SYN_RECV` (12) has no counterpart.
const LINUX_STATES: &[(u32, TcpState)] = &[
    (1, TcpState::Established),
    (2, TcpState::SynSent),
    (3, TcpState::SynRcvd),
    (4, TcpState::FinWait1),
    (5, TcpState::FinWait2),
    (6, TcpState::TimeWait),
    (7, TcpState::Closed),
    (8, TcpState::CloseWait),
    (9, TcpState::LastAck),
    (10, TcpState::Listen),
    (11, TcpState::Closing),
];

/// BSD `netinet/tcp_fsm.h`
const DARWIN_STATES: &[(u32, TcpState)] = &[
    (0, TcpState::Closed),
    (1, TcpState::Listen),
    (2, TcpState::SynSent),
    (3, TcpState::SynRcvd),
    (4, TcpState::Established),
    (5, TcpState::CloseWait),
    (6, TcpState::FinWait1),
    (7, TcpState::Closing),
    (8, TcpState::LastAck),
    (9, TcpState::FinWait2),
    (10, TcpState::TimeWait),
];

/// Maps raw TCP state codes to symbolic states.
///
/// Every OS numbers the TCP state machine differently, so the codec is
/// selected by the numbering of the table being decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpStateCodec {
    /// Windows IP Helper numbering
    Mib,
    /// Linux kernel numbering, as found in `/proc/net/tcp`
    Linux,
    /// BSD numbering used by Darwin's `libproc`
    Darwin,
}

impl TcpStateCodec {
    /// The numbering of the build target
    #[cfg(target_os = "windows")]
    pub const NATIVE: Self = Self::Mib;
    #[cfg(target_os = "linux")]
    pub const NATIVE: Self = Self::Linux;
    #[cfg(target_os = "macos")]
    pub const NATIVE: Self = Self::Darwin;
    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    pub const NATIVE: Self = Self::Mib;

    const fn table(self) -> &'static [(u32, TcpState)] {
        match self {
            Self::Mib => MIB_STATES,
            Self::Linux => LINUX_STATES,
            Self::Darwin => DARWIN_STATES,
        }
    }

    /// Decode a raw state code. Unknown codes keep their value and decode to no state.
    #[must_use]
    pub fn decode(self, code: u32) -> TcpConnectionState {
        let state = self
            .table()
            .iter()
            .find(|(raw, _)| *raw == code)
            .map(|(_, state)| *state);
        TcpConnectionState::new(code, state)
    }

    /// The raw code this numbering uses for `state`, if it has one
    #[must_use]
    pub fn encode(self, state: TcpState) -> Option<u32> {
        self.table()
            .iter()
            .find(|(_, known)| *known == state)
            .map(|(raw, _)| *raw)
    }
}
