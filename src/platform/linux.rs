use std::collections::HashMap;
use std::net::SocketAddr;

use log::{debug, warn};
use procfs::process::{all_processes, FDTarget};
use procfs::ProcError;

use crate::codec::RawEndpoint;
use crate::process::ProcessLookup;
use crate::socket::{RawTcpRow, RawUdpRow, TableSource};
use crate::types::Protocol;
use crate::{CollectionError, Result};

fn table_error(table: Protocol, err: ProcError) -> CollectionError {
    match err {
        ProcError::Io(err, _) => CollectionError::query_io(table, &err),
        ProcError::PermissionDenied(_) => CollectionError::query_failed(table, libc::EACCES),
        ProcError::NotFound(_) => CollectionError::query_failed(table, libc::ENOENT),
        other => CollectionError::QueryFailed {
            table,
            code: -1,
            message: other.to_string(),
        },
    }
}

fn v4_endpoint(addr: SocketAddr) -> Option<RawEndpoint> {
    match addr {
        SocketAddr::V4(v4) => Some(RawEndpoint::from_parts(*v4.ip(), v4.port())),
        SocketAddr::V6(_) => None,
    }
}

/// Socket inode to owning pid, built from every readable `/proc/<pid>/fd`.
///
/// Processes that vanish or deny access are skipped. A socket shared across a
/// fork is attributed to the first process found holding it.
fn socket_owners() -> Result<HashMap<u64, u32>> {
    let processes =
        all_processes().map_err(|e| CollectionError::snapshot_unavailable(e.to_string()))?;

    let mut owners = HashMap::new();
    for process in processes.flatten() {
        let Ok(pid) = u32::try_from(process.pid()) else {
            continue;
        };
        let Ok(fds) = process.fd() else {
            continue;
        };
        for fd in fds.flatten() {
            if let FDTarget::Socket(inode) = fd.target {
                owners.entry(inode).or_insert(pid);
            }
        }
    }
    Ok(owners)
}

/// Keep only rows whose socket inode has a known owner.
///
/// Rows without one are counted and reported once per table at `warn`.
fn attributed<E, R>(
    table: Protocol,
    entries: &[E],
    owners: &HashMap<u64, u32>,
    mut row: impl FnMut(&E, u32) -> Option<R>,
    inode_of: impl Fn(&E) -> u64,
) -> Vec<R> {
    let mut rows = Vec::with_capacity(entries.len());
    let mut omitted = 0usize;
    for entry in entries {
        let inode = inode_of(entry);
        match owners.get(&inode) {
            Some(&pid) => rows.extend(row(entry, pid)),
            None => {
                debug!("{table} socket inode {inode} has no visible owner");
                omitted += 1;
            }
        }
    }
    if omitted > 0 {
        warn!("{table}: {omitted} sockets have no visible owner and were omitted");
    }
    rows
}

/// Connection tables read from `/proc/net/{udp,tcp}`.
///
/// Those files carry no pid column, so owners are found by matching socket
/// inodes against every process's open descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcNetTables;

impl TableSource for ProcNetTables {
    fn udp_rows(&self) -> Result<Vec<RawUdpRow>> {
        let entries = procfs::net::udp().map_err(|e| table_error(Protocol::Udp, e))?;
        let owners = socket_owners()?;
        Ok(attributed(
            Protocol::Udp,
            &entries,
            &owners,
            |entry, pid| {
                Some(RawUdpRow {
                    local: v4_endpoint(entry.local_address)?,
                    pid,
                })
            },
            |entry| entry.inode,
        ))
    }

    fn tcp_rows(&self) -> Result<Vec<RawTcpRow>> {
        let entries = procfs::net::tcp().map_err(|e| table_error(Protocol::Tcp, e))?;
        let owners = socket_owners()?;
        Ok(attributed(
            Protocol::Tcp,
            &entries,
            &owners,
            |entry, pid| {
                Some(RawTcpRow {
                    local: v4_endpoint(entry.local_address)?,
                    remote: v4_endpoint(entry.remote_address)?,
                    state: u32::from(entry.state.to_u8()),
                    pid,
                })
            },
            |entry| entry.inode,
        ))
    }
}

/// Resolves names from `/proc/<pid>/stat`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcfsResolver;

impl ProcessLookup for ProcfsResolver {
    fn process_name(&self, pid: u32) -> Result<String> {
        let processes =
            all_processes().map_err(|e| CollectionError::snapshot_unavailable(e.to_string()))?;

        processes
            .flatten()
            .find(|process| u32::try_from(process.pid()).is_ok_and(|p| p == pid))
            .and_then(|process| process.stat().ok())
            .map(|stat| stat.comm)
            .ok_or(CollectionError::process_not_found(pid))
    }
}
