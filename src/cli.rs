use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "edgeprobe")]
#[command(version = concat!("Ver:", env!("CARGO_PKG_VERSION")))]
#[command(about = "CDN edge-cache behavioral verification harness")]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short = 'c', long = "config", default_value = "edgeprobe.toml")]
    pub config: PathBuf,

    /// Validate configuration and exit
    #[arg(long = "check")]
    pub check: bool,

    /// Which declared TTL tier to verify
    #[arg(long = "ttl", value_enum, default_value_t = TtlTier::Short)]
    pub ttl: TtlTier,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlTier {
    Short,
    Long,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
