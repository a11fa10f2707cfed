use chatwire::cli::{
    list_sessions, parse_args, run_chat, version_line, CliCommand, RunArgs, EXIT_STOPPED, USAGE,
};
use chatwire::client::ChatClient;
use chatwire::config::ClientConfig;
use chatwire::session::SendOutcome;

use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use std::io::Read;
use tracing_subscriber::EnvFilter;

/// Default log filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "chatwire=info";

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn client_config(base_url: Option<&str>) -> ClientConfig {
    let config = ClientConfig::from_env();
    match base_url {
        Some(origin) => config.with_api_origin(origin),
        None => config,
    }
}

fn read_prompt(args: &RunArgs) -> Result<String> {
    if !args.stdin {
        return Ok(args.prompt.clone());
    }
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .wrap_err("Failed to read prompt from stdin")?;

    let prompt = match args.prompt.trim() {
        "" => input,
        prefix => format!("{}\n\n{}", prefix, input),
    };
    if prompt.trim().is_empty() {
        bail!("no prompt given");
    }
    Ok(prompt)
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let command = match parse_args(std::env::args()) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    match command {
        CliCommand::Version => {
            println!("{}", version_line());
            return Ok(());
        }
        CliCommand::Help => {
            println!("{}", USAGE);
            return Ok(());
        }
        _ => {}
    }

    init_tracing();
    let runtime = tokio::runtime::Runtime::new()?;

    match command {
        CliCommand::Sessions { base_url } => {
            let client = ChatClient::new(client_config(base_url.as_deref()));
            if let Err(e) = runtime.block_on(list_sessions(client)) {
                eprintln!("{}", e.user_message());
                std::process::exit(1);
            }
        }
        CliCommand::Run(args) => {
            let prompt = read_prompt(&args)?;
            let client = ChatClient::new(client_config(args.base_url.as_deref()));
            let outcome = runtime.block_on(run_chat(client, &args, &prompt, Vec::new()));
            match outcome {
                SendOutcome::Completed => {}
                // The printer has already written the run error to stderr.
                SendOutcome::RunFailed { .. } => std::process::exit(1),
                SendOutcome::Stopped => {
                    eprintln!("Generation stopped");
                    std::process::exit(EXIT_STOPPED);
                }
                SendOutcome::Failed(e) => {
                    eprintln!("{} ({})", e.user_message(), e.error_code());
                    std::process::exit(1);
                }
            }
        }
        CliCommand::Version | CliCommand::Help => {}
    }

    Ok(())
}
