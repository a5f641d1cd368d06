//! Print or write the default configuration.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use rotor_engine::RotorConfig;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write the configuration to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    let config = RotorConfig::default();
    match args.output {
        Some(path) => {
            config
                .save(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote default configuration to {}", path.display());
        }
        None => print!("{}", config.to_toml()?),
    }
    Ok(())
}
