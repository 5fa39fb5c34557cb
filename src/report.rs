//! Text report of a connection table

use std::fmt::Display;
use std::io::{self, Write};

use crate::socket::ConnectionRecord;

/// Write `records` as one framed table.
///
/// An empty table is reported with a single notice line; otherwise the
/// records are written between a header and a footer naming the protocol.
///
/// # Errors
/// Returns an error if writing to `out` fails
pub fn write_table<T, W>(out: &mut W, records: &[T]) -> io::Result<()>
where
    T: ConnectionRecord + Display,
    W: Write + ?Sized,
{
    let protocol = T::PROTOCOL;
    if records.is_empty() {
        return writeln!(out, "\t**** The {protocol} connection table is empty. ****\n");
    }

    writeln!(out, "\t**** The {protocol} connection table:")?;
    for record in records {
        write!(out, "{record}")?;
    }
    writeln!(out, "\t**** End of {protocol} connection table.\n")
}
