use libproc::file_info::{pidfdinfo, ListFDs, ProcFDType};
use libproc::libproc::bsd_info::BSDInfo;
use libproc::net_info::{InSockInfo, SocketFDInfo, SocketInfoKind};
use libproc::proc_pid::{listpidinfo, pidinfo};
use libproc::processes::{pids_by_type, ProcFilter};
use log::{debug, trace};

use crate::codec::RawEndpoint;
use crate::process::ProcessLookup;
use crate::socket::{RawTcpRow, RawUdpRow, TableSource};
use crate::types::Protocol;
use crate::{CollectionError, Result};

#[allow(clippy::cast_sign_loss)]
fn local_endpoint(info: &InSockInfo) -> RawEndpoint {
    // SAFETY: only IPv4 sockets reach here, so the v4 arm of the union is live.
    let addr = unsafe { info.insi_laddr.ina_46.i46a_addr4.s_addr };
    RawEndpoint::new(addr, info.insi_lport as u32)
}

#[allow(clippy::cast_sign_loss)]
fn remote_endpoint(info: &InSockInfo) -> RawEndpoint {
    // SAFETY: as in `local_endpoint`.
    let addr = unsafe { info.insi_faddr.ina_46.i46a_addr4.s_addr };
    RawEndpoint::new(addr, info.insi_fport as u32)
}

/// Visit every IPv4 socket of `protocol` held by any process.
///
/// Processes that exit or deny access mid-walk are skipped.
fn for_each_socket(protocol: Protocol, mut visit: impl FnMut(u32, &SocketFDInfo)) -> Result<()> {
    let pids =
        pids_by_type(ProcFilter::All).map_err(|e| CollectionError::query_io(protocol, &e))?;
    let wanted = match protocol {
        Protocol::Udp => libc::IPPROTO_UDP,
        Protocol::Tcp => libc::IPPROTO_TCP,
    };
    let kind_matches = |kind: SocketInfoKind| match protocol {
        Protocol::Udp => matches!(kind, SocketInfoKind::In),
        Protocol::Tcp => matches!(kind, SocketInfoKind::Tcp),
    };

    for pid in pids {
        let Ok(pid_i32) = i32::try_from(pid) else {
            continue;
        };
        let Ok(bsd_info) = pidinfo::<BSDInfo>(pid_i32, 0) else {
            trace!("pid {pid} not inspectable");
            continue;
        };
        let Ok(fds) = listpidinfo::<ListFDs>(pid_i32, bsd_info.pbi_nfiles as usize) else {
            continue;
        };

        for fd in fds {
            if !matches!(ProcFDType::from(fd.proc_fdtype), ProcFDType::Socket) {
                continue;
            }
            let Ok(socket) = pidfdinfo::<SocketFDInfo>(pid_i32, fd.proc_fd) else {
                continue;
            };
            let psi = &socket.psi;
            if psi.soi_family == libc::AF_INET
                && psi.soi_protocol == wanted
                && kind_matches(SocketInfoKind::from(psi.soi_kind))
            {
                visit(pid, &socket);
            }
        }
    }
    Ok(())
}

/// Connection tables assembled from per-process socket descriptors.
///
/// Darwin has no system-wide table with owners attached, so every process's
/// descriptors are inspected through `libproc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LibprocTables;

impl TableSource for LibprocTables {
    fn udp_rows(&self) -> Result<Vec<RawUdpRow>> {
        let mut rows = Vec::new();
        for_each_socket(Protocol::Udp, |pid, socket| {
            // SAFETY: `soi_kind` is In, so `pri_in` is the live arm.
            let info = unsafe { &socket.psi.soi_proto.pri_in };
            rows.push(RawUdpRow {
                local: local_endpoint(info),
                pid,
            });
        })?;
        debug!("found {} UDP sockets", rows.len());
        Ok(rows)
    }

    fn tcp_rows(&self) -> Result<Vec<RawTcpRow>> {
        let mut rows = Vec::new();
        for_each_socket(Protocol::Tcp, |pid, socket| {
            // SAFETY: `soi_kind` is Tcp, so `pri_tcp` is the live arm.
            let tcp = unsafe { &socket.psi.soi_proto.pri_tcp };
            #[allow(clippy::cast_sign_loss)]
            let state = tcp.tcpsi_state as u32;
            rows.push(RawTcpRow {
                local: local_endpoint(&tcp.tcpsi_ini),
                remote: remote_endpoint(&tcp.tcpsi_ini),
                state,
                pid,
            });
        })?;
        debug!("found {} TCP sockets", rows.len());
        Ok(rows)
    }
}

/// Resolves names with `proc_name`
#[derive(Debug, Clone, Copy, Default)]
pub struct LibprocResolver;

impl ProcessLookup for LibprocResolver {
    fn process_name(&self, pid: u32) -> Result<String> {
        let pids = pids_by_type(ProcFilter::All)
            .map_err(|e| CollectionError::snapshot_unavailable(e.to_string()))?;
        if !pids.contains(&pid) {
            return Err(CollectionError::process_not_found(pid));
        }

        let pid_i32 = i32::try_from(pid).map_err(|_| CollectionError::process_not_found(pid))?;
        libproc::proc_pid::name(pid_i32).map_err(|e| {
            trace!("proc_name({pid}) failed: {e}");
            CollectionError::process_not_found(pid)
        })
    }
}
