//! Command-line argument parsing for the chatwire CLI.

use thiserror::Error;

/// Options of a one-shot chat run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunArgs {
    /// Prompt words joined with single spaces
    pub prompt: String,
    pub model: Option<String>,
    pub thinking: Option<bool>,
    /// Overrides the configured API origin
    pub base_url: Option<String>,
    /// Read the prompt from stdin instead of the arguments
    pub stdin: bool,
}

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// List the conversations stored on the server
    Sessions { base_url: Option<String> },
    /// Send a prompt and stream the reply (default)
    Run(RunArgs),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CliError {
    #[error("missing value for {0}")]
    MissingValue(String),
    #[error("unknown option: {0}")]
    UnknownOption(String),
    #[error("no prompt given")]
    EmptyPrompt,
}

pub const USAGE: &str = "\
Usage: chatwire [OPTIONS] <PROMPT>...
       chatwire --sessions [--base-url <URL>]

Options:
  -m, --model <MODEL>   Model to forward with the run
      --thinking        Ask for reasoning output
      --no-thinking     Ask for no reasoning output
      --base-url <URL>  API origin (default: $CHATWIRE_API_BASE_URL)
      --stdin           Read the prompt from standard input
      --sessions        List server conversations and exit
  -h, --help            Show this help
  -V, --version         Show version information";

/// Parse command-line arguments into a [`CliCommand`].
///
/// The first item is the program name. Everything after `--` is prompt text.
///
/// # Examples
///
/// ```
/// use chatwire::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["chatwire".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()), Ok(CliCommand::Version));
/// ```
pub fn parse_args<I>(args: I) -> Result<CliCommand, CliError>
where
    I: Iterator<Item = String>,
{
    let mut run = RunArgs::default();
    let mut words: Vec<String> = Vec::new();
    let mut sessions = false;

    let mut args = args.skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => return Ok(CliCommand::Version),
            "--help" | "-h" => return Ok(CliCommand::Help),
            "--sessions" => sessions = true,
            "--model" | "-m" => run.model = Some(value(&arg, args.next())?),
            "--base-url" => run.base_url = Some(value(&arg, args.next())?),
            "--thinking" => run.thinking = Some(true),
            "--no-thinking" => run.thinking = Some(false),
            "--stdin" => run.stdin = true,
            "--" => {
                words.extend(args.by_ref());
            }
            other if other.starts_with('-') && other.len() > 1 => {
                return Err(CliError::UnknownOption(other.to_string()));
            }
            _ => words.push(arg),
        }
    }

    if sessions {
        return Ok(CliCommand::Sessions {
            base_url: run.base_url,
        });
    }

    run.prompt = words.join(" ");
    if run.prompt.trim().is_empty() && !run.stdin {
        return Err(CliError::EmptyPrompt);
    }
    Ok(CliCommand::Run(run))
}

fn value(flag: &str, next: Option<String>) -> Result<String, CliError> {
    next.ok_or_else(|| CliError::MissingValue(flag.to_string()))
}
