use std::fmt;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "speedsheet")]
#[command(about = "Run a speed test and push the result to a Google Sheets spreadsheet")]
#[command(version)]
pub struct Cli {
    /// Do not output normal status messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Console status output, silenced by `--quiet`. Fatal errors are not
/// routed through this and always reach stderr.
pub struct Status {
    quiet: bool,
}

impl Status {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn line(&self, message: impl fmt::Display) {
        if !self.quiet {
            println!("{message}");
        }
    }
}
