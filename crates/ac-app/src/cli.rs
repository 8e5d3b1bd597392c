use std::path::PathBuf;

use clap::Parser;

/// audiocnn — trains a CNN audio classifier from a YAML configuration.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Fichier de configuration YAML.
    #[arg(short, long, default_value = "./config.yml")]
    pub config: PathBuf,

    /// Checkpoint path, overrides `runtime.checkpoint`.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["audiocnn"]);
        assert_eq!(cli.config, PathBuf::from("./config.yml"));
        assert!(cli.output.is_none());
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn overrides() {
        let cli = Cli::parse_from([
            "audiocnn",
            "--config",
            "runs/esc.yml",
            "-o",
            "out/esc.mpk",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.config, PathBuf::from("runs/esc.yml"));
        assert_eq!(cli.output, Some(PathBuf::from("out/esc.mpk")));
        assert_eq!(cli.log_level, "debug");
    }
}
