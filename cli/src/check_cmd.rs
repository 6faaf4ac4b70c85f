use clap::Args;
use modelcall_core::parse_command;

use crate::EXIT_INVALID;
use crate::report_error;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Command text, e.g. `Gemini.gemini-pro.generateContent("hi")`.
    pub command: String,
}

/// Parse only. Prints the command as JSON on success.
pub fn run(args: CheckArgs) -> anyhow::Result<i32> {
    match parse_command(&args.command) {
        Ok(command) => {
            println!("{}", serde_json::to_string_pretty(&command)?);
            Ok(0)
        }
        Err(err) => {
            report_error(&format!("Invalid command: {err}"));
            Ok(EXIT_INVALID)
        }
    }
}
