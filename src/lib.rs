#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Connview
//!
//! Lists the host's IPv4 TCP and UDP connections together with the process
//! that owns each one.
//!
//! This crate reads the operating system's connection tables on Linux, macOS,
//! and Windows and normalizes every row:
//! - Addresses as dotted-decimal text, ports in host order
//! - TCP states decoded from the platform's numbering, raw code kept
//! - Owning pid resolved to an executable name
//!
//! ## Quick Start
//!
//! ```no_run
//! use connview::{ConnectionRecord, ConnectionsCollector};
//!
//! for record in ConnectionsCollector::collect_tcp_connections_info()? {
//!     println!("{} {} -> {}", record.state(), record.local(), record.remote());
//! }
//!
//! let udp = ConnectionsCollector::collect_udp_connections_info()?;
//! println!("UDP bindings: {}", udp.len());
//! # Ok::<(), connview::CollectionError>(())
//! ```
//!
//! A collection call either returns the complete table or fails with a
//! [`CollectionError`]; there are no partial results.
//!
//! ## Features
//!
//! - `serde-support` - Enable serialization support for all data structures

mod error;
mod platform;
mod types;

pub mod app;
pub mod codec;
pub mod process;
pub mod report;
pub mod socket;

pub use error::{CollectionError, Result};
pub use types::{
    AddressInfo, ConnectionTable, OwnerProcessInfo, Protocol, TcpConnectionState, TcpState,
    UNKNOWN_TCP_STATE,
};

pub use codec::TcpStateCodec;
pub use platform::{NativeResolver, NativeTableSource};
pub use process::ProcessLookup;
pub use socket::{
    ConnectionRecord, ConnectionSource, ConnectionTableReader, ConnectionsCollector,
    TcpConnectionRecord, UdpConnectionRecord,
};
