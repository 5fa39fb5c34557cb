use crate::socket::{ConnectionRecord, ConnectionsCollector};
use crate::types::{AddressInfo, ConnectionTable, OwnerProcessInfo, Protocol, TcpConnectionState};
use crate::Result;

#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

/// A TCP connection endpoint, its state, and the process holding it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct TcpConnectionRecord {
    local: AddressInfo,
    remote: AddressInfo,
    state: TcpConnectionState,
    owner: OwnerProcessInfo,
}

impl TcpConnectionRecord {
    /// Create a new TCP record
    #[must_use]
    pub const fn new(
        local: AddressInfo,
        remote: AddressInfo,
        state: TcpConnectionState,
        owner: OwnerProcessInfo,
    ) -> Self {
        Self {
            local,
            remote,
            state,
            owner,
        }
    }

    /// Get the remote endpoint. Listening sockets report `0.0.0.0:0`.
    #[must_use]
    pub const fn remote(&self) -> &AddressInfo {
        &self.remote
    }

    /// Get the connection state
    #[must_use]
    pub const fn state(&self) -> TcpConnectionState {
        self.state
    }
}

impl ConnectionRecord for TcpConnectionRecord {
    const PROTOCOL: Protocol = Protocol::Tcp;

    fn collect() -> Result<ConnectionTable<Self>> {
        ConnectionsCollector::collect_tcp_connections_info()
    }

    fn local(&self) -> &AddressInfo {
        &self.local
    }

    fn owner(&self) -> &OwnerProcessInfo {
        &self.owner
    }
}

impl std::fmt::Display for TcpConnectionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "*** [TCP]:")?;
        writeln!(f, "\tLocal address: {}", self.local)?;
        writeln!(f, "\tRemote address: {}", self.remote)?;
        writeln!(f, "\tState: {}", self.state)?;
        writeln!(f, "\tOwner: {}", self.owner)?;
        writeln!(f)
    }
}
