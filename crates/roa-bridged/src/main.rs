use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match roa_bridged::run_bridge() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(io::stderr(), "{}: {error}", env!("CARGO_PKG_NAME"));
            ExitCode::FAILURE
        }
    }
}
