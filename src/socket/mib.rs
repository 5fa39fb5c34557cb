//! IP Helper style connection tables
//!
//! `GetExtendedUdpTable` and `GetExtendedTcpTable` cannot be told how big
//! their result is up front. The caller first asks with no buffer to learn
//! the size, then asks again with a buffer of that size. The result is a
//! `MIB_*TABLE_OWNER_PID`: a `u32` row count followed by fixed-size rows of
//! `u32` fields.
//!
//! Nothing here touches the OS directly; the platform module supplies the
//! primitive through [`SizedTableQuery`].

use log::{debug, warn};

use crate::codec::RawEndpoint;
use crate::socket::reader::{RawTcpRow, RawUdpRow, TableSource};
use crate::types::Protocol;
use crate::{CollectionError, Result};

/// `NO_ERROR`
pub const NO_ERROR: u32 = 0;
/// `ERROR_INSUFFICIENT_BUFFER`
pub const ERROR_INSUFFICIENT_BUFFER: u32 = 122;

/// Size of the `dwNumEntries` header
pub const TABLE_HEADER_LEN: usize = 4;
/// `MIB_UDPROW_OWNER_PID`: local addr, local port, pid
pub const UDP_ROW_LEN: usize = 12;
/// `MIB_TCPROW_OWNER_PID`: state, local addr, local port, remote addr, remote port, pid
pub const TCP_ROW_LEN: usize = 24;

/// An OS table query that reports its required buffer size
pub trait SizedTableQuery {
    /// Run the query once.
    ///
    /// `buffer` is `None` for the sizing call. On return `size` holds the number
    /// of bytes the table needs. Returns the OS status code.
    fn query(&self, buffer: Option<&mut [u8]>, size: &mut u32) -> u32;
}

/// Fetch a complete table with the two-call size negotiation.
///
/// The status of the sizing call is informational only; the second call
/// decides success.
///
/// # Errors
/// `QueryFailed` carrying the OS status if the data call does not succeed.
pub fn fetch_table<Q: SizedTableQuery + ?Sized>(query: &Q, table: Protocol) -> Result<Vec<u8>> {
    let mut size = 0u32;
    match query.query(None, &mut size) {
        NO_ERROR | ERROR_INSUFFICIENT_BUFFER => {}
        status => warn!("{table} table sizing call returned unexpected status {status}"),
    }

    let len = (size as usize).max(TABLE_HEADER_LEN);
    debug!("{table} table needs {len} bytes");

    let mut buffer = vec![0u8; len];
    let mut size = u32::try_from(len).unwrap_or(u32::MAX);
    let status = query.query(Some(&mut buffer), &mut size);
    if status != NO_ERROR {
        #[allow(clippy::cast_possible_wrap)]
        let code = status as i32;
        return Err(CollectionError::query_failed(table, code));
    }

    Ok(buffer)
}

fn field(row: &[u8], index: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&row[index * 4..index * 4 + 4]);
    u32::from_ne_bytes(word)
}

/// Split a table buffer into exactly the number of rows its header declares
fn rows(buffer: &[u8], row_len: usize, table: Protocol) -> Result<std::slice::ChunksExact<'_, u8>> {
    if buffer.len() < TABLE_HEADER_LEN {
        return Err(CollectionError::TruncatedTable {
            table,
            expected: TABLE_HEADER_LEN,
            actual: buffer.len(),
        });
    }

    let count = field(buffer, 0) as usize;
    let body = &buffer[TABLE_HEADER_LEN..];
    let expected = count.saturating_mul(row_len);
    if body.len() < expected {
        return Err(CollectionError::TruncatedTable {
            table,
            expected,
            actual: body.len(),
        });
    }

    Ok(body[..expected].chunks_exact(row_len))
}

/// Decode a `MIB_UDPTABLE_OWNER_PID`
///
/// # Errors
/// `TruncatedTable` if the buffer holds fewer rows than declared.
pub fn parse_udp_table(buffer: &[u8]) -> Result<Vec<RawUdpRow>> {
    Ok(rows(buffer, UDP_ROW_LEN, Protocol::Udp)?
        .map(|row| RawUdpRow {
            local: RawEndpoint::new(field(row, 0), field(row, 1)),
            pid: field(row, 2),
        })
        .collect())
}

/// Decode a `MIB_TCPTABLE_OWNER_PID`
///
/// # Errors
/// `TruncatedTable` if the buffer holds fewer rows than declared.
pub fn parse_tcp_table(buffer: &[u8]) -> Result<Vec<RawTcpRow>> {
    Ok(rows(buffer, TCP_ROW_LEN, Protocol::Tcp)?
        .map(|row| RawTcpRow {
            state: field(row, 0),
            local: RawEndpoint::new(field(row, 1), field(row, 2)),
            remote: RawEndpoint::new(field(row, 3), field(row, 4)),
            pid: field(row, 5),
        })
        .collect())
}

/// A [`TableSource`] over a pair of sized table queries
#[derive(Debug, Clone, Default)]
pub struct MibTables<U, T> {
    udp: U,
    tcp: T,
}

impl<U, T> MibTables<U, T> {
    pub const fn new(udp: U, tcp: T) -> Self {
        Self { udp, tcp }
    }
}

impl<U: SizedTableQuery, T: SizedTableQuery> TableSource for MibTables<U, T> {
    fn udp_rows(&self) -> Result<Vec<RawUdpRow>> {
        parse_udp_table(&fetch_table(&self.udp, Protocol::Udp)?)
    }

    fn tcp_rows(&self) -> Result<Vec<RawTcpRow>> {
        parse_tcp_table(&fetch_table(&self.tcp, Protocol::Tcp)?)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::net::Ipv4Addr;

    use super::*;
    use crate::codec::TcpStateCodec;
    use crate::process::MockProcessLookup;
    use crate::socket::ConnectionTableReader;

    /// Builds a table buffer: row count, then each row's fields
    fn table_bytes(rows: &[&[u32]]) -> Vec<u8> {
        let mut bytes = u32::try_from(rows.len()).unwrap().to_ne_bytes().to_vec();
        for row in rows {
            for value in *row {
                bytes.extend_from_slice(&value.to_ne_bytes());
            }
        }
        bytes
    }

    fn addr(ip: [u8; 4]) -> u32 {
        u32::from_ne_bytes(ip)
    }

    fn port(port: u16) -> u32 {
        u32::from(port.to_be())
    }

    /// Plays back a fixed table, recording the sizes it was asked with
    struct FakeQuery {
        table: Vec<u8>,
        sizing_status: u32,
        data_status: u32,
        calls: Cell<u32>,
        data_sizes: RefCell<Vec<usize>>,
    }

    impl FakeQuery {
        fn new(table: Vec<u8>) -> Self {
            Self {
                table,
                sizing_status: ERROR_INSUFFICIENT_BUFFER,
                data_status: NO_ERROR,
                calls: Cell::new(0),
                data_sizes: RefCell::new(Vec::new()),
            }
        }

        fn sizing_status(mut self, status: u32) -> Self {
            self.sizing_status = status;
            self
        }

        fn data_status(mut self, status: u32) -> Self {
            self.data_status = status;
            self
        }
    }

    impl SizedTableQuery for FakeQuery {
        fn query(&self, buffer: Option<&mut [u8]>, size: &mut u32) -> u32 {
            self.calls.set(self.calls.get() + 1);
            let needed = u32::try_from(self.table.len()).unwrap();
            match buffer {
                None => {
                    *size = needed;
                    self.sizing_status
                }
                Some(buf) => {
                    self.data_sizes.borrow_mut().push(buf.len());
                    if self.data_status != NO_ERROR {
                        return self.data_status;
                    }
                    buf[..self.table.len()].copy_from_slice(&self.table);
                    *size = needed;
                    NO_ERROR
                }
            }
        }
    }

    fn resolver_with(names: &'static [(u32, &'static str)]) -> MockProcessLookup {
        let mut resolver = MockProcessLookup::new();
        resolver.expect_process_name().returning(move |pid| {
            names
                .iter()
                .find(|(known, _)| *known == pid)
                .map(|(_, name)| (*name).to_string())
                .ok_or(CollectionError::process_not_found(pid))
        });
        resolver
    }

    #[test]
    fn test_fetch_allocates_reported_size() {
        let table = table_bytes(&[&[addr([0, 0, 0, 0]), port(53), 4]]);
        let query = FakeQuery::new(table.clone());

        let buffer = fetch_table(&query, Protocol::Udp).unwrap();

        assert_eq!(query.calls.get(), 2);
        assert_eq!(*query.data_sizes.borrow(), [table.len()]);
        assert_eq!(buffer, table);
    }

    #[test]
    fn test_sizing_status_is_informational() {
        let table = table_bytes(&[]);
        for status in [NO_ERROR, ERROR_INSUFFICIENT_BUFFER, 87] {
            let query = FakeQuery::new(table.clone()).sizing_status(status);
            assert!(fetch_table(&query, Protocol::Tcp).is_ok(), "status {status}");
        }
    }

    #[test]
    fn test_zero_size_still_allocates_header() {
        struct EmptyQuery;
        impl SizedTableQuery for EmptyQuery {
            fn query(&self, buffer: Option<&mut [u8]>, size: &mut u32) -> u32 {
                *size = 0;
                match buffer {
                    None => NO_ERROR,
                    Some(buf) => {
                        assert_eq!(buf.len(), TABLE_HEADER_LEN);
                        NO_ERROR
                    }
                }
            }
        }

        let buffer = fetch_table(&EmptyQuery, Protocol::Udp).unwrap();
        assert!(parse_udp_table(&buffer).unwrap().is_empty());
    }

    #[test]
    fn test_data_call_failure_is_tagged_udp() {
        let query = FakeQuery::new(table_bytes(&[])).data_status(ERROR_INSUFFICIENT_BUFFER);

        match fetch_table(&query, Protocol::Udp) {
            Err(CollectionError::QueryFailed { table, code, .. }) => {
                assert_eq!(table, Protocol::Udp);
                assert_eq!(code, 122);
            }
            other => panic!("expected QueryFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_data_call_failure_is_tagged_tcp() {
        let query = FakeQuery::new(table_bytes(&[])).data_status(87);

        let err = fetch_table(&query, Protocol::Tcp).unwrap_err();
        assert!(matches!(
            err,
            CollectionError::QueryFailed {
                table: Protocol::Tcp,
                code: 87,
                ..
            }
        ));
        assert!(err.to_string().starts_with("[ TCP Collect Error]"));
    }

    #[test]
    fn test_parse_udp_rows() {
        let buffer = table_bytes(&[
            &[addr([127, 0, 0, 1]), port(53), 100],
            &[addr([0, 0, 0, 0]), port(5353), 200],
        ]);

        let rows = parse_udp_table(&buffer).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].local, RawEndpoint::from_parts(Ipv4Addr::LOCALHOST, 53));
        assert_eq!(rows[0].pid, 100);
        assert_eq!(rows[1].pid, 200);
    }

    #[test]
    fn test_parse_tcp_field_order() {
        let buffer = table_bytes(&[&[
            5,
            addr([10, 0, 0, 2]),
            port(443),
            addr([93, 184, 216, 34]),
            port(51000),
            321,
        ]]);

        let rows = parse_tcp_table(&buffer).unwrap();

        assert_eq!(
            rows,
            [RawTcpRow {
                local: RawEndpoint::from_parts(Ipv4Addr::new(10, 0, 0, 2), 443),
                remote: RawEndpoint::from_parts(Ipv4Addr::new(93, 184, 216, 34), 51000),
                state: 5,
                pid: 321,
            }]
        );
    }

    #[test]
    fn test_trailing_bytes_beyond_count_are_ignored() {
        let mut buffer = table_bytes(&[&[addr([1, 2, 3, 4]), port(1), 1]]);
        buffer.extend_from_slice(&[0xAA; UDP_ROW_LEN * 3]);

        assert_eq!(parse_udp_table(&buffer).unwrap().len(), 1);
    }

    #[test]
    fn test_truncated_table_is_rejected() {
        let mut buffer = table_bytes(&[&[0; 6], &[0; 6]]);
        buffer.truncate(TABLE_HEADER_LEN + TCP_ROW_LEN + 8);

        match parse_tcp_table(&buffer) {
            Err(CollectionError::TruncatedTable {
                table,
                expected,
                actual,
            }) => {
                assert_eq!(table, Protocol::Tcp);
                assert_eq!(expected, 2 * TCP_ROW_LEN);
                assert_eq!(actual, TCP_ROW_LEN + 8);
            }
            other => panic!("expected TruncatedTable, got {other:?}"),
        }
    }

    #[test]
    fn test_reader_over_empty_mib_tables() {
        let source = MibTables::new(
            FakeQuery::new(table_bytes(&[])),
            FakeQuery::new(table_bytes(&[])),
        );
        let reader = ConnectionTableReader::new(source, resolver_with(&[]));

        assert!(reader.collect_udp().unwrap().is_empty());
        assert!(reader.collect_tcp().unwrap().is_empty());
    }

    #[test]
    fn test_reader_reports_failing_table() {
        let source = MibTables::new(
            FakeQuery::new(table_bytes(&[])).data_status(87),
            FakeQuery::new(table_bytes(&[])).data_status(5),
        );
        let reader = ConnectionTableReader::new(source, resolver_with(&[]));

        let udp = reader.collect_udp().unwrap_err();
        let tcp = reader.collect_tcp().unwrap_err();
        assert_eq!(udp.table(), Some(Protocol::Udp));
        assert_eq!(tcp.table(), Some(Protocol::Tcp));
    }

    #[test]
    fn test_reader_over_mib_tcp_table() {
        let tcp = table_bytes(&[&[
            5,
            addr([127, 0, 0, 1]),
            port(8080),
            addr([127, 0, 0, 1]),
            port(54321),
            1234,
        ]]);
        let source = MibTables::new(FakeQuery::new(table_bytes(&[])), FakeQuery::new(tcp));
        let reader = ConnectionTableReader::new(source, resolver_with(&[(1234, "demo.exe")]))
            .with_state_codec(TcpStateCodec::Mib);

        let records = reader.collect_tcp().unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].to_string(),
            "*** [TCP]:\n\
             \tLocal address: 127.0.0.1:8080\n\
             \tRemote address: 127.0.0.1:54321\n\
             \tState: ESTABLISHED(5)\n\
             \tOwner: demo.exe <PID: 1234>\n\n"
        );
    }

    #[test]
    fn test_reader_mixed_owners_fail_whole_udp_table() {
        let udp = table_bytes(&[
            &[addr([0, 0, 0, 0]), port(67), 1],
            &[addr([0, 0, 0, 0]), port(68), 2],
        ]);
        let source = MibTables::new(FakeQuery::new(udp), FakeQuery::new(table_bytes(&[])));
        let reader = ConnectionTableReader::new(source, resolver_with(&[(1, "dhcpd")]));

        assert!(matches!(
            reader.collect_udp(),
            Err(CollectionError::ProcessNotFound { pid: 2 })
        ));
    }
}
