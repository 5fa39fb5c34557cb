//! Command-line front end

use std::ffi::OsStr;
use std::io::{self, Write};

use log::info;

use crate::report::write_table;
use crate::socket::ConnectionSource;
use crate::CollectionError;

/// Usage text printed for no or unrecognized arguments
pub const USAGE: &str = "\
The connview application.

Available usage modes: udp | tcp | all.
\tWhere: 'udp' or 'tcp' will print the matching connection table with the owning processes.
\tThe 'all' mode will print both of them (udp, then tcp).
";

/// What a run should print
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Usage,
    Udp,
    Tcp,
    All,
}

impl Mode {
    /// Pick the mode from the positional arguments.
    ///
    /// Exactly one of `udp`, `tcp` or `all` selects a table; anything else,
    /// including an argument that is not valid UTF-8, prints usage.
    #[must_use]
    pub fn from_args<S: AsRef<OsStr>>(args: &[S]) -> Self {
        match args {
            [arg] => match arg.as_ref().to_str() {
                Some("udp") => Self::Udp,
                Some("tcp") => Self::Tcp,
                Some("all") => Self::All,
                _ => Self::Usage,
            },
            _ => Self::Usage,
        }
    }
}

/// Failure of a whole run
#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Collection(#[from] CollectionError),

    #[error("failed to write report: {0}")]
    Output(#[from] io::Error),
}

/// One invocation of the CLI
#[derive(Debug, Clone, Copy)]
pub struct Application {
    mode: Mode,
}

impl Application {
    #[must_use]
    pub const fn new(mode: Mode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Collect the selected tables from `source` and report them to `out`
    ///
    /// # Errors
    /// Returns the first collection or output error; nothing after it is printed
    pub fn run<C, W>(&self, source: &C, out: &mut W) -> Result<(), RunError>
    where
        C: ConnectionSource + ?Sized,
        W: Write + ?Sized,
    {
        info!("running in {:?} mode", self.mode);
        match self.mode {
            Mode::Usage => writeln!(out, "{USAGE}")?,
            Mode::Udp => write_table(out, &source.udp_connections()?)?,
            Mode::Tcp => write_table(out, &source.tcp_connections()?)?,
            Mode::All => {
                write_table(out, &source.udp_connections()?)?;
                write_table(out, &source.tcp_connections()?)?;
            }
        }
        out.flush()?;
        Ok(())
    }
}
