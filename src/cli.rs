use crate::handlers::ToolParams;
use crate::request::{Action, DEFAULT_CA_PATH, Request};
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about = "icinga2 pki wrapper", long_about = None)]
#[command(next_line_help = true)]
pub struct Cli {
    #[arg(value_enum, help = "pki workflow to run", value_name = "ACTION")]
    pub action: Action,
    #[arg(
        long,
        visible_alias = "cn",
        help = "common name; also the base name of the key, csr and crt files",
        value_name = "STRING"
    )]
    pub common_name: Option<String>,
    #[arg(
        short,
        long,
        help = "replace an existing CA or files belonging to the common name"
    )]
    pub force: bool,
    #[arg(
        long,
        env = "ICINGA2_PKI_CA_PATH",
        default_value = DEFAULT_CA_PATH,
        help = "icinga2 CA directory",
        value_name = "DIR",
        value_hint = clap::ValueHint::DirPath,
    )]
    pub ca_path: PathBuf,
    #[arg(
        long,
        env = "ICINGA2_PKI_SALT",
        hide_env_values = true,
        help = "ticket salt",
        value_name = "STRING"
    )]
    pub salt: Option<String>,
    #[arg(
        long,
        env = "ICINGA2_PKI_BINARY",
        default_value = "icinga2",
        help = "icinga2 executable, looked up on PATH unless it contains a '/'",
        value_name = "NAME",
        value_hint = clap::ValueHint::CommandName,
    )]
    pub binary: String,
    #[arg(
        long,
        default_value = None,
        value_parser = humantime::parse_duration,
        help = "give up on an icinga2 run after this long",
        value_name = "DURATION",
    )]
    pub timeout: Option<std::time::Duration>,
    #[arg(long, help = "pretty-print the JSON outcome")]
    pub pretty: bool,
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "more logging on stderr (repeatable)"
    )]
    pub verbose: u8,
}

impl Cli {
    pub fn as_request(&self) -> Request {
        Request {
            common_name: self.common_name.clone(),
            force: self.force,
            ca_path: self.ca_path.clone(),
            salt: self.salt.clone(),
            ..Request::new(self.action)
        }
    }

    pub fn tool_params(&self) -> ToolParams<'_> {
        ToolParams {
            binary: &self.binary,
            timeout: self.timeout,
        }
    }

    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
