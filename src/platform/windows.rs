use std::io;
use std::ptr;

use log::trace;
use winapi::shared::iprtrmib::{TCP_TABLE_OWNER_PID_ALL, UDP_TABLE_OWNER_PID};
use winapi::shared::minwindef::{FALSE, TRUE, ULONG};
use winapi::shared::ws2def::AF_INET;
use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
use winapi::um::iphlpapi::{GetExtendedTcpTable, GetExtendedUdpTable};
use winapi::um::tlhelp32::{
    CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W, TH32CS_SNAPPROCESS,
};
use winapi::um::winnt::HANDLE;

use crate::process::{image_name_from_wide, ProcessLookup};
use crate::socket::mib::{MibTables, SizedTableQuery};
use crate::{CollectionError, Result};

#[allow(clippy::cast_sign_loss)]
const INET: ULONG = AF_INET as ULONG;

/// `GetExtendedUdpTable` for IPv4 with owning pids
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtendedUdpQuery;

impl SizedTableQuery for ExtendedUdpQuery {
    fn query(&self, buffer: Option<&mut [u8]>, size: &mut u32) -> u32 {
        let table = buffer.map_or(ptr::null_mut(), |b| b.as_mut_ptr().cast());
        // SAFETY: `table` is null or points to at least `*size` writable bytes.
        unsafe { GetExtendedUdpTable(table, size, FALSE, INET, UDP_TABLE_OWNER_PID, 0) }
    }
}

/// `GetExtendedTcpTable` for IPv4 with owning pids, every state
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtendedTcpQuery;

impl SizedTableQuery for ExtendedTcpQuery {
    fn query(&self, buffer: Option<&mut [u8]>, size: &mut u32) -> u32 {
        let table = buffer.map_or(ptr::null_mut(), |b| b.as_mut_ptr().cast());
        // SAFETY: `table` is null or points to at least `*size` writable bytes.
        unsafe { GetExtendedTcpTable(table, size, TRUE, INET, TCP_TABLE_OWNER_PID_ALL, 0) }
    }
}

pub type IpHelperTables = MibTables<ExtendedUdpQuery, ExtendedTcpQuery>;

/// Toolhelp process snapshot, closed on drop
struct Snapshot(HANDLE);

impl Snapshot {
    fn take() -> Result<Self> {
        // SAFETY: no pointers are passed.
        let handle = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) };
        if handle == INVALID_HANDLE_VALUE {
            return Err(CollectionError::snapshot_unavailable(
                io::Error::last_os_error().to_string(),
            ));
        }
        Ok(Self(handle))
    }

    /// Walk the snapshot until `visit` returns a value
    fn find_map<T>(&self, mut visit: impl FnMut(&PROCESSENTRY32W) -> Option<T>) -> Option<T> {
        // SAFETY: PROCESSENTRY32W is plain data; zero is a valid bit pattern.
        let mut entry: PROCESSENTRY32W = unsafe { std::mem::zeroed() };
        entry.dwSize = u32::try_from(std::mem::size_of::<PROCESSENTRY32W>()).unwrap_or(u32::MAX);

        // SAFETY: the handle is open and `entry.dwSize` is set.
        let mut more = unsafe { Process32FirstW(self.0, &mut entry) } != FALSE;
        while more {
            if let Some(found) = visit(&entry) {
                return Some(found);
            }
            // SAFETY: as above.
            more = unsafe { Process32NextW(self.0, &mut entry) } != FALSE;
        }
        None
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        // SAFETY: the handle came from CreateToolhelp32Snapshot and is closed once.
        unsafe { CloseHandle(self.0) };
    }
}

/// Resolves names from a Toolhelp snapshot taken per lookup
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolhelpResolver;

impl ProcessLookup for ToolhelpResolver {
    fn process_name(&self, pid: u32) -> Result<String> {
        let snapshot = Snapshot::take()?;
        let name = snapshot.find_map(|entry| {
            (entry.th32ProcessID == pid).then(|| image_name_from_wide(&entry.szExeFile))
        });

        trace!("pid {pid} resolved to {name:?}");
        name.ok_or(CollectionError::process_not_found(pid))
    }
}
