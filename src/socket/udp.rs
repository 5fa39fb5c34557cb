use crate::socket::{ConnectionRecord, ConnectionsCollector};
use crate::types::{AddressInfo, ConnectionTable, OwnerProcessInfo, Protocol};
use crate::Result;

#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

/// A UDP socket binding and the process holding it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct UdpConnectionRecord {
    local: AddressInfo,
    owner: OwnerProcessInfo,
}

impl UdpConnectionRecord {
    /// Create a new UDP record
    #[must_use]
    pub const fn new(local: AddressInfo, owner: OwnerProcessInfo) -> Self {
        Self { local, owner }
    }
}

impl ConnectionRecord for UdpConnectionRecord {
    const PROTOCOL: Protocol = Protocol::Udp;

    fn collect() -> Result<ConnectionTable<Self>> {
        ConnectionsCollector::collect_udp_connections_info()
    }

    fn local(&self) -> &AddressInfo {
        &self.local
    }

    fn owner(&self) -> &OwnerProcessInfo {
        &self.owner
    }
}

impl std::fmt::Display for UdpConnectionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "*** [UDP]:")?;
        writeln!(f, "\tAddress: {}", self.local)?;
        writeln!(f, "\tOwner: {}", self.owner)?;
        writeln!(f)
    }
}
