use clap::Parser;

use crate::config::Overrides;

#[derive(Debug, Parser)]
#[command(name = "forwarder", about = "Metrics store that forwards every upload to a remote-write receiver")]
pub struct Cli {
    /// Extra configuration file, layered over `forwarder.toml` and the environment.
    #[arg(long)]
    pub config: Option<String>,

    #[arg(long)]
    pub http_bind: Option<String>,

    #[arg(long)]
    pub forward_url: Option<String>,

    /// Print the resolved bind address and exit.
    #[arg(long)]
    pub print_bind: bool,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config: self.config.clone(),
            http_bind: self.http_bind.clone(),
            forward_url: self.forward_url.clone(),
        }
    }
}
