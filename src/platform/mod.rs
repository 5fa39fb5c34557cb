//! Per-OS table sources and process resolvers

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "linux")]
pub use linux::{ProcNetTables as NativeTableSource, ProcfsResolver as NativeResolver};

#[cfg(target_os = "macos")]
pub use macos::{LibprocResolver as NativeResolver, LibprocTables as NativeTableSource};

#[cfg(target_os = "windows")]
pub use windows::{IpHelperTables as NativeTableSource, ToolhelpResolver as NativeResolver};

#[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
compile_error!("connection collection is not implemented for this OS");
