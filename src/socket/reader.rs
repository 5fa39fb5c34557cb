//! Normalization of raw connection-table rows into records

use std::collections::HashMap;

use log::{debug, trace};

use crate::codec::{decode_endpoint, RawEndpoint, TcpStateCodec};
use crate::platform::{NativeResolver, NativeTableSource};
use crate::process::ProcessLookup;
use crate::socket::{TcpConnectionRecord, UdpConnectionRecord};
use crate::types::{ConnectionTable, OwnerProcessInfo};
use crate::Result;

/// One row of the OS UDP table, still in table encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawUdpRow {
    pub local: RawEndpoint,
    pub pid: u32,
}

/// One row of the OS TCP table, still in table encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTcpRow {
    pub local: RawEndpoint,
    pub remote: RawEndpoint,
    pub state: u32,
    pub pid: u32,
}

/// Source of raw connection-table rows
#[cfg_attr(test, mockall::automock)]
pub trait TableSource {
    /// Read the current IPv4 UDP table
    ///
    /// # Errors
    /// Returns an error if the OS query fails
    fn udp_rows(&self) -> Result<Vec<RawUdpRow>>;

    /// Read the current IPv4 TCP table
    ///
    /// # Errors
    /// Returns an error if the OS query fails
    fn tcp_rows(&self) -> Result<Vec<RawTcpRow>>;
}

/// Reads connection tables and turns each row into a record.
///
/// A collection call either yields every row of the table or fails: if any
/// owner cannot be resolved, no records are returned.
#[derive(Debug, Clone)]
pub struct ConnectionTableReader<S = NativeTableSource, R = NativeResolver> {
    source: S,
    resolver: R,
    states: TcpStateCodec,
}

impl ConnectionTableReader {
    /// Reader over the build target's tables and process list
    #[must_use]
    pub fn native() -> Self {
        Self::new(NativeTableSource::default(), NativeResolver::default())
    }
}

impl<S: TableSource, R: ProcessLookup> ConnectionTableReader<S, R> {
    /// Create a reader that decodes TCP states with the native numbering
    pub fn new(source: S, resolver: R) -> Self {
        Self {
            source,
            resolver,
            states: TcpStateCodec::NATIVE,
        }
    }

    /// Decode TCP states with `states` instead of the native numbering
    #[must_use]
    pub fn with_state_codec(mut self, states: TcpStateCodec) -> Self {
        self.states = states;
        self
    }

    /// Collect every UDP record
    ///
    /// # Errors
    /// Returns an error if the OS query fails or any row's owner cannot be resolved
    pub fn collect_udp(&self) -> Result<ConnectionTable<UdpConnectionRecord>> {
        let rows = self.source.udp_rows()?;
        debug!("UDP table has {} rows", rows.len());

        let mut owners = OwnerCache::new(&self.resolver);
        rows.into_iter()
            .map(|row| {
                trace!("UDP row {row:?}");
                Ok(UdpConnectionRecord::new(
                    decode_endpoint(row.local),
                    owners.owner(row.pid)?,
                ))
            })
            .collect()
    }

    /// Collect every TCP record
    ///
    /// # Errors
    /// Returns an error if the OS query fails or any row's owner cannot be resolved
    pub fn collect_tcp(&self) -> Result<ConnectionTable<TcpConnectionRecord>> {
        let rows = self.source.tcp_rows()?;
        debug!("TCP table has {} rows", rows.len());

        let mut owners = OwnerCache::new(&self.resolver);
        rows.into_iter()
            .map(|row| {
                trace!("TCP row {row:?}");
                Ok(TcpConnectionRecord::new(
                    decode_endpoint(row.local),
                    decode_endpoint(row.remote),
                    self.states.decode(row.state),
                    owners.owner(row.pid)?,
                ))
            })
            .collect()
    }
}

/// Per-call pid → name memo. Dropped when the collection call returns.
struct OwnerCache<'a, R> {
    resolver: &'a R,
    names: HashMap<u32, String>,
}

impl<'a, R: ProcessLookup> OwnerCache<'a, R> {
    fn new(resolver: &'a R) -> Self {
        Self {
            resolver,
            names: HashMap::new(),
        }
    }

    fn owner(&mut self, pid: u32) -> Result<OwnerProcessInfo> {
        if let Some(name) = self.names.get(&pid) {
            return Ok(OwnerProcessInfo::new(pid, name.clone()));
        }

        let name = self.resolver.process_name(pid)?;
        self.names.insert(pid, name.clone());
        Ok(OwnerProcessInfo::new(pid, name))
    }
}
