//! Binary entrypoint for the terminal output summary plugin.

use std::io::{self, BufReader, Write};
use std::process::ExitCode;

use speakline_plugin_summary::run;
use speakline_plugin_summary::telemetry::route_panics_to_tracing;

fn main() -> ExitCode {
    route_panics_to_tracing();

    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    match run(std::env::args_os(), &mut reader, &mut writer) {
        Ok(status) => status.into(),
        Err(error) => {
            writeln!(io::stderr().lock(), "{error}").ok();
            ExitCode::FAILURE
        }
    }
}
