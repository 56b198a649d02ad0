//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use parkside_cli::CliError;

fn main() {
    pretty_env_logger::init();
    if let Err(err) = parkside_cli::run() {
        if let CliError::ArgumentParsing(clap_err) = &err
            && !clap_err.use_stderr()
        {
            clap_err.exit();
        }
        match serde_json::to_string_pretty(&err.to_payload()) {
            Ok(payload) => eprintln!("{payload}"),
            Err(_) => eprintln!("parkside: {err}"),
        }
        std::process::exit(1);
    }
}
