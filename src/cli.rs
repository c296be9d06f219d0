use std::{ffi::OsString, path::PathBuf};

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use tracing::debug;

use crate::{
    config::{Config, ConfigError},
    serial::BaudRate,
};

/// The command line interface for the serial relay.
#[derive(Parser, Debug)]
#[command(author, version, about, subcommand_negates_reqs = true)]
pub struct Cli {
    /// Baud rate of the serial device, 9600 or 115200.
    #[arg(short, long, default_value_t = BaudRate::default())]
    pub baud: BaudRate,

    /// Path to the serial device, e.g. /dev/ttyUSB0.
    #[arg(short, long, required = true)]
    pub device: Option<String>,

    /// Path to a configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(long)]
    pub debug: bool,

    /// Mirror serial output to stdout.
    #[arg(long)]
    pub local_echo: bool,

    /// Send a line feed after messages starting with a carriage return.
    #[arg(long)]
    pub cr_to_crlf: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Commands available in the command line interface.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Examples for user convenience.
    #[command(subcommand)]
    Examples(Examples),
}

/// Helpful examples for users.
#[derive(Subcommand, Debug, Clone)]
pub enum Examples {
    /// Show an example of a configuration file's contents.
    Config,
}

/// Why the command line did not lead to a run.
#[derive(Debug)]
pub enum CliExit {
    /// Nothing was given at all.
    Usage,

    /// Something was off, or help/version was asked for.
    Invalid(clap::Error),
}

impl CliExit {
    /// The process exit code for this outcome.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliExit::Usage => 100,
            CliExit::Invalid(e) => match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => 100,
                _ => 255,
            },
        }
    }

    /// Tell the user about it.
    pub fn report(&self) {
        match self {
            CliExit::Usage => {
                let mut command = Cli::command();
                eprintln!("{}", command.render_usage());
                eprintln!("See --help for more.");
            }
            CliExit::Invalid(e) => {
                // Printing can only fail if the terminal is gone.
                let _ = e.print();
            }
        }
    }
}

impl Cli {
    /// Parse the given arguments, the first being the program name.
    pub fn from_args<I, T>(args: I) -> Result<Self, CliExit>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args = args.into_iter().map(Into::into).collect::<Vec<OsString>>();

        if args.len() <= 1 {
            return Err(CliExit::Usage);
        }

        <Self as Parser>::try_parse_from(args).map_err(CliExit::Invalid)
    }

    /// The configuration to run with.
    ///
    /// Starts from the config file if one was given, otherwise the defaults.
    /// Flags given on the command line are added on top.
    pub fn config(&self) -> Result<Config, ConfigError> {
        let mut config = if let Some(config_path) = &self.config {
            debug!(?config_path, "Config from path");
            Config::new_from_path(config_path)?
        } else {
            debug!("Default config");
            Config::default()
        };

        config.options.debug |= self.debug;
        config.options.local_echo |= self.local_echo;
        config.options.translate_cr_to_crlf |= self.cr_to_crlf;

        config.validate()?;

        Ok(config)
    }
}

/// Carry out a subcommand.
pub fn handle_command(command: Commands) -> Result<(), ConfigError> {
    match command {
        Commands::Examples(Examples::Config) => {
            println!("{}", Config::example().serialize_pretty()?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, CliExit> {
        Cli::from_args(std::iter::once("serial-relay").chain(args.iter().copied()))
    }

    #[test]
    fn cli_is_sane() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_arguments_is_usage() {
        let exit = parse(&[]).unwrap_err();

        assert_eq!(exit.exit_code(), 100);
    }

    #[test]
    fn device_and_baud() {
        let cli = parse(&["-d", "/dev/ttyUSB0", "-b", "9600"]).unwrap();

        assert_eq!(cli.device.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(cli.baud, BaudRate::B9600);
    }

    #[test]
    fn baud_defaults_to_115200() {
        let cli = parse(&["-d", "/dev/ttyACM0"]).unwrap();

        assert_eq!(cli.baud, BaudRate::B115200);
    }

    #[test]
    fn unsupported_baud_is_rejected() {
        let exit = parse(&["-d", "/dev/ttyACM0", "-b", "57600"]).unwrap_err();

        assert_eq!(exit.exit_code(), 255);
    }

    #[test]
    fn device_is_required() {
        let exit = parse(&["-b", "9600"]).unwrap_err();

        assert_eq!(exit.exit_code(), 255);
    }

    #[test]
    fn unknown_option_is_rejected() {
        let exit = parse(&["-d", "/dev/ttyACM0", "--fast"]).unwrap_err();

        assert_eq!(exit.exit_code(), 255);
    }

    #[test]
    fn help_and_version_are_fine() {
        assert_eq!(parse(&["--help"]).unwrap_err().exit_code(), 0);
        assert_eq!(parse(&["--version"]).unwrap_err().exit_code(), 0);
    }

    #[test]
    fn examples_need_no_device() {
        let cli = parse(&["examples", "config"]).unwrap();

        assert!(cli.device.is_none());
        assert!(matches!(
            cli.command,
            Some(Commands::Examples(Examples::Config))
        ));
    }

    #[test]
    fn flags_are_added_to_config() {
        let cli = parse(&["-d", "/dev/ttyACM0", "--local-echo", "--cr-to-crlf"]).unwrap();

        let config = cli.config().unwrap();

        assert!(config.options.local_echo);
        assert!(config.options.translate_cr_to_crlf);
        assert!(!config.options.debug);
        assert_eq!(config.port, 8000);
    }
}
