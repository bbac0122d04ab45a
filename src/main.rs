//! zbundle - Command-line tool for bundling and minifying static assets

use std::process::ExitCode;

use zbundle::cli;

fn main() -> ExitCode {
    cli::run()
}
