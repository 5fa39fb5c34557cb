//! connview: print the host's connection tables with their owning processes

use std::ffi::OsString;
use std::io;
use std::process::ExitCode;

use clap::Parser;
use connview::app::{Application, Mode};
use connview::ConnectionsCollector;

#[derive(Parser)]
#[command(name = "connview")]
#[command(about = "Show IPv4 TCP/UDP connections and the processes that own them", long_about = None)]
#[command(version)]
struct Cli {
    /// Table to print: udp, tcp or all
    #[arg(allow_hyphen_values = true)]
    args: Vec<OsString>,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let app = Application::new(Mode::from_args(&cli.args));

    let stdout = io::stdout();
    match app.run(&ConnectionsCollector, &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
