//! Command-line flags. Parsing stays a thin shim over [`crate::config`]:
//! just enough to locate the config file and optionally override the log
//! level, per spec.md's explicit CLI/file-format non-goal.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "rdns", about = "A caching, recursive/forwarding DNS resolver")]
pub struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, env = "RDNS_CONFIG")]
    pub config: Option<String>,

    /// Overrides `log_level` from the config file.
    #[arg(short, long, env = "RDNS_DEBUG")]
    pub debug: bool,

    /// Print the default configuration as JSON and exit.
    #[arg(long)]
    pub print_default_config: bool,
}

impl Cli {
    pub fn effective_log_level(&self, configured: &str) -> String {
        if self.debug {
            "debug".to_string()
        } else {
            configured.to_string()
        }
    }
}
