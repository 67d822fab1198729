use clap::{Arg, Command};
use std::ffi::OsString;
use std::path::PathBuf;

pub const EXPORT_COMMAND: &str = "tofile";
/// Hidden counterpart of [`EXPORT_COMMAND`] selected by the re-executed child.
pub const INNER_EXPORT_COMMAND: &str = "_tofile";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// `swagger tofile`, run by the user.
    Export,
    /// `swagger _tofile`, run only by the re-executed child.
    ExportInner,
}

#[derive(Debug)]
pub struct Config {
    pub command: CommandKind,
    pub configuration_file: PathBuf,
}

fn configuration_file_arg(help: &'static str) -> Arg {
    Arg::new("configurationfile")
        .value_name("FILE")
        .help(help)
        .value_parser(clap::value_parser!(PathBuf))
        .required(true)
}

pub fn build_cli() -> Command {
    Command::new("swagger")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Swagger command line tools: export OpenAPI documents from an application")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new(EXPORT_COMMAND)
                .about("Retrieves Swagger from a startup module and writes it to file")
                .arg(configuration_file_arg("Configuration file for the settings")),
        )
        .subcommand(
            Command::new(INNER_EXPORT_COMMAND)
                .hide(true)
                .arg(configuration_file_arg("Configuration file for the settings")),
        )
}

pub fn parse_args() -> Result<Config, clap::Error> {
    parse_args_from(std::env::args_os())
}

pub fn parse_args_from<I, T>(args: I) -> Result<Config, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_cli().try_get_matches_from(args)?;

    let (command, sub_matches) = match matches.subcommand() {
        Some((EXPORT_COMMAND, sub)) => (CommandKind::Export, sub),
        Some((INNER_EXPORT_COMMAND, sub)) => (CommandKind::ExportInner, sub),
        _ => unreachable!("subcommand_required is set"),
    };

    let configuration_file = sub_matches
        .get_one::<PathBuf>("configurationfile")
        .cloned()
        .expect("configurationfile is required");

    Ok(Config {
        command,
        configuration_file,
    })
}
