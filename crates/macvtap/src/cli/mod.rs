//! Plugin harness: CNI environment in, JSON result out.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::Result;
use macvtap_common::{MacvtapError, MacvtapResult};
use macvtap_network::LinkManager;
use serde::Serialize;

use crate::commands::{self, CmdArgs};
use crate::result::{CniResult, ErrorResult, VersionInfo};

/// macvtap - CNI plugin attaching macvtap interfaces to containers
#[derive(Parser, Debug)]
#[command(name = "macvtap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Operation to perform (ADD, DEL, CHECK, VERSION)
    #[arg(long, env = "CNI_COMMAND")]
    pub command: Option<String>,

    /// Container ID
    #[arg(long, env = "CNI_CONTAINERID")]
    pub container_id: Option<String>,

    /// Path to the container network namespace, empty for none
    #[arg(long, env = "CNI_NETNS")]
    pub netns: Option<OsString>,

    /// Interface name to create inside the container
    #[arg(long, env = "CNI_IFNAME")]
    pub ifname: Option<String>,

    /// Extra arguments as KEY=VALUE pairs separated by ';'
    #[arg(long = "cni-args", env = "CNI_ARGS")]
    pub args: Option<String>,

    /// Log output format (logs go to stderr)
    #[arg(long, env = "MACVTAP_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// CNI command verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Attach an interface.
    Add,
    /// Detach an interface.
    Del,
    /// Verify an attachment.
    Check,
    /// Report supported versions.
    Version,
}

impl FromStr for Command {
    type Err = MacvtapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADD" => Ok(Self::Add),
            "DEL" => Ok(Self::Del),
            "CHECK" => Ok(Self::Check),
            "VERSION" => Ok(Self::Version),
            other => Err(MacvtapError::InvalidEnvironment {
                message: format!("unknown CNI_COMMAND: {other}"),
            }),
        }
    }
}

/// What a successful command prints.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Output {
    /// `ADD` result.
    Result(CniResult),
    /// `VERSION` report.
    Version(VersionInfo),
}

impl Cli {
    /// Run the requested command against `links`, reading the configuration
    /// from stdin and writing the outcome to stdout.
    ///
    /// # Errors
    ///
    /// Only fails if stdout cannot be written; plugin errors are reported on
    /// stdout with a failing exit code.
    pub async fn execute<M: LinkManager>(self, links: &M) -> Result<ExitCode> {
        let outcome = self.run(links, std::io::stdin().lock()).await;

        let mut stdout = std::io::stdout().lock();
        let code = match outcome {
            Ok(Some(output)) => {
                serde_json::to_writer(&mut stdout, &output)?;
                writeln!(stdout)?;
                ExitCode::SUCCESS
            }
            // DEL and CHECK succeed with empty output.
            Ok(None) => ExitCode::SUCCESS,
            Err(err) => {
                tracing::error!(code = err.cni_code(), %err, "Command failed");
                serde_json::to_writer(&mut stdout, &ErrorResult::from(&err))?;
                writeln!(stdout)?;
                ExitCode::FAILURE
            }
        };
        stdout.flush()?;
        Ok(code)
    }

    /// Dispatch the command, reading the configuration from `stdin`.
    ///
    /// # Errors
    ///
    /// Returns the plugin error of the command.
    pub async fn run<M: LinkManager>(
        self,
        links: &M,
        stdin: impl Read,
    ) -> MacvtapResult<Option<Output>> {
        let command: Command = self
            .command
            .as_deref()
            .ok_or_else(|| MacvtapError::InvalidEnvironment {
                message: "CNI_COMMAND env variable missing".to_string(),
            })?
            .parse()?;

        if command == Command::Version {
            return Ok(Some(Output::Version(VersionInfo::current())));
        }

        let args = self.into_cmd_args(command, stdin)?;
        match command {
            Command::Add => Ok(Some(Output::Result(commands::attach(links, &args).await?))),
            Command::Del => commands::detach(links, &args).await.map(|()| None),
            Command::Check => commands::check(&args).map(|()| None),
            Command::Version => Ok(None),
        }
    }

    fn into_cmd_args(self, command: Command, mut stdin: impl Read) -> MacvtapResult<CmdArgs> {
        let container_id = required(self.container_id, "CNI_CONTAINERID")?;
        let if_name = required(self.ifname, "CNI_IFNAME")?;
        let netns = self
            .netns
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        if netns.is_none() && command != Command::Del {
            return Err(missing("CNI_NETNS"));
        }

        let mut stdin_data = Vec::new();
        stdin.read_to_end(&mut stdin_data)?;

        Ok(CmdArgs {
            container_id,
            netns,
            if_name,
            args: self.args,
            stdin_data,
        })
    }
}

fn required(value: Option<String>, name: &str) -> MacvtapResult<String> {
    value.filter(|v| !v.is_empty()).ok_or_else(|| missing(name))
}

fn missing(name: &str) -> MacvtapError {
    MacvtapError::InvalidEnvironment {
        message: format!("{name} env variable missing"),
    }
}
