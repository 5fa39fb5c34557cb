use crate::process::ProcessLookup;
use crate::socket::{ConnectionTableReader, TableSource, TcpConnectionRecord, UdpConnectionRecord};
use crate::types::ConnectionTable;
use crate::Result;

/// Anything that can produce the host's connection tables
pub trait ConnectionSource {
    /// # Errors
    /// Returns an error if the UDP table cannot be collected
    fn udp_connections(&self) -> Result<ConnectionTable<UdpConnectionRecord>>;

    /// # Errors
    /// Returns an error if the TCP table cannot be collected
    fn tcp_connections(&self) -> Result<ConnectionTable<TcpConnectionRecord>>;
}

/// Entry point for collecting the host's connection tables.
///
/// Stateless: every call queries the OS from scratch and nothing is retried.
///
/// ```no_run
/// use connview::ConnectionsCollector;
///
/// let udp = ConnectionsCollector::collect_udp_connections_info()?;
/// let tcp = ConnectionsCollector::collect_tcp_connections_info()?;
/// println!("{} UDP bindings, {} TCP connections", udp.len(), tcp.len());
/// # Ok::<(), connview::CollectionError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionsCollector;

impl ConnectionsCollector {
    /// Collect every IPv4 UDP binding with its owning process
    ///
    /// # Errors
    /// Returns an error if the OS query fails or any row's owner cannot be resolved
    pub fn collect_udp_connections_info() -> Result<ConnectionTable<UdpConnectionRecord>> {
        ConnectionTableReader::native().collect_udp()
    }

    /// Collect every IPv4 TCP connection with its state and owning process
    ///
    /// # Errors
    /// Returns an error if the OS query fails or any row's owner cannot be resolved
    pub fn collect_tcp_connections_info() -> Result<ConnectionTable<TcpConnectionRecord>> {
        ConnectionTableReader::native().collect_tcp()
    }
}

impl ConnectionSource for ConnectionsCollector {
    fn udp_connections(&self) -> Result<ConnectionTable<UdpConnectionRecord>> {
        Self::collect_udp_connections_info()
    }

    fn tcp_connections(&self) -> Result<ConnectionTable<TcpConnectionRecord>> {
        Self::collect_tcp_connections_info()
    }
}

impl<S: TableSource, R: ProcessLookup> ConnectionSource for ConnectionTableReader<S, R> {
    fn udp_connections(&self) -> Result<ConnectionTable<UdpConnectionRecord>> {
        self.collect_udp()
    }

    fn tcp_connections(&self) -> Result<ConnectionTable<TcpConnectionRecord>> {
        self.collect_tcp()
    }
}
