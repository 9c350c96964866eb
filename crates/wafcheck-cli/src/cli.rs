use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "wafcheck",
    about = "Provision the AWS WAF Terraform example, check it, and tear it down",
    version
)]
pub struct Cli {
    /// Harness config file. Defaults to ./wafcheck.yml when present.
    #[arg(long, env = "WAFCHECK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Region to provision in, overriding the config file.
    #[arg(long, global = true)]
    pub region: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Init, validate and apply the example, then destroy it.
    Run {
        /// Reuse a fixed 6-character suffix instead of a random one.
        #[arg(long)]
        suffix: Option<String>,

        /// Leave the resources running. Remove them later with `destroy`.
        #[arg(long)]
        keep: bool,
    },

    /// Print the availability zones of the region.
    Zones,

    /// Build the provisioning request and print it without applying.
    Request {
        #[arg(long)]
        suffix: Option<String>,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Destroy a run that was kept with `run --keep`.
    Destroy {
        #[arg(long)]
        suffix: String,
    },
}
