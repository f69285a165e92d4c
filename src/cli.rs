//! Command-line definitions.

use crate::config::AppConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Watch local directories and ship new files to FTP/SFTP targets.
#[derive(Parser, Debug)]
#[command(name = "uplifter", version)]
pub struct Cli {
    /// Config file (default: ./uplifter.toml when present).
    #[arg(short, long, env = "UPLIFTER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Settings store path, overriding `[store] path`.
    #[arg(long, env = "UPLIFTER_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// Log filter, overriding `[logging] level`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit JSON log lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the watcher until interrupted.
    Run(RunArgs),
    /// Create, list and select instances.
    #[command(subcommand)]
    Instance(InstanceCommand),
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Do not refresh instances when the settings file changes.
    #[arg(long)]
    pub no_reload: bool,

    /// Serialise uploads per instance with a queue of this size.
    #[arg(long, value_name = "CAPACITY")]
    pub serial: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum InstanceCommand {
    /// Register a new instance and make it active.
    Add(AddInstanceArgs),
    /// Show every instance.
    List {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Make an existing instance the active one.
    Activate { id: u32 },
}

#[derive(Args, Debug, Clone, Default)]
pub struct AddInstanceArgs {
    /// Directory to watch.
    #[arg(long)]
    pub directory: PathBuf,
    /// Extension filter including the dot, e.g. `.csv`.
    #[arg(long, default_value = ".*")]
    pub extension: String,
    #[arg(long)]
    pub name: Option<String>,
    /// Start with the watcher disabled.
    #[arg(long)]
    pub disabled: bool,

    #[arg(long)]
    pub ftp_server: Option<String>,
    #[arg(long)]
    pub ftp_port: Option<u16>,
    #[arg(long)]
    pub ftp_user: Option<String>,
    #[arg(long, env = "UPLIFTER_FTP_PASSWORD", hide_env_values = true)]
    pub ftp_password: Option<String>,
    #[arg(long)]
    pub ftp_folder: Option<String>,

    /// Upload over SFTP instead of FTP.
    #[arg(long)]
    pub sftp: bool,
    #[arg(long)]
    pub sftp_host: Option<String>,
    #[arg(long)]
    pub sftp_port: Option<u16>,
    #[arg(long)]
    pub sftp_user: Option<String>,
    #[arg(long, env = "UPLIFTER_SFTP_PASSWORD", hide_env_values = true)]
    pub sftp_password: Option<String>,
    #[arg(long)]
    pub sftp_key: Option<String>,
    #[arg(long)]
    pub sftp_path: Option<String>,
}

impl Cli {
    /// Fold command-line overrides into the loaded config.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(store) = &self.store {
            config.store.path = store.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.log_json {
            config.logging.json = true;
        }
        if let Command::Run(RunArgs {
            serial: Some(capacity),
            ..
        }) = &self.command
        {
            config.dispatch.mode = crate::config::DispatchModeName::Serial;
            config.dispatch.queue_capacity = *capacity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatchModeName;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "uplifter",
            "--store",
            "/srv/s.json",
            "--log-level",
            "debug",
            "run",
            "--serial",
            "3",
        ])
        .unwrap();
        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.store.path, PathBuf::from("/srv/s.json"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.dispatch.mode, DispatchModeName::Serial);
        assert_eq!(config.dispatch.queue_capacity, 3);
    }

    #[test]
    fn test_instance_add_parses() {
        let cli = Cli::try_parse_from([
            "uplifter",
            "instance",
            "add",
            "--directory",
            "/data/drop",
            "--extension",
            ".csv",
            "--ftp-server",
            "ftp.corp.test",
            "--ftp-folder",
            "/in",
        ])
        .unwrap();
        match cli.command {
            Command::Instance(InstanceCommand::Add(args)) => {
                assert_eq!(args.directory, PathBuf::from("/data/drop"));
                assert_eq!(args.extension, ".csv");
                assert_eq!(args.ftp_folder.as_deref(), Some("/in"));
                assert!(!args.sftp);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
