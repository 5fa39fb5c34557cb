//! Connection enumeration
//!
//! This module provides cross-platform access to the host's IPv4 TCP and UDP
//! connection tables, with every row attributed to the process that owns it.

pub mod collector;
pub mod mib;
pub mod reader;
pub mod tcp;
pub mod udp;

pub use collector::{ConnectionSource, ConnectionsCollector};
pub use reader::{ConnectionTableReader, RawTcpRow, RawUdpRow, TableSource};
pub use tcp::TcpConnectionRecord;
pub use udp::UdpConnectionRecord;

use crate::types::{AddressInfo, ConnectionTable, OwnerProcessInfo, Protocol};
use crate::Result;

/// Common trait for the record types of a connection table
pub trait ConnectionRecord: Sized {
    /// Protocol of the table this record belongs to
    const PROTOCOL: Protocol;

    /// Collect the host's current table of this record type
    ///
    /// # Errors
    /// Returns an error if the OS query fails or any row's owner cannot be resolved
    fn collect() -> Result<ConnectionTable<Self>>;

    /// Get the local endpoint of this connection
    fn local(&self) -> &AddressInfo;

    /// Get the process that owns this connection
    fn owner(&self) -> &OwnerProcessInfo;

    /// Check if this connection belongs to a specific process
    fn belongs_to_process(&self, pid: u32) -> bool {
        self.owner().pid() == pid
    }
}
