use clap::Args;
use modelcall_core::CatalogHandle;
use modelcall_core::RunOutcome;
use modelcall_core::Session;

use crate::Backend;
use crate::EXIT_FAILED;
use crate::EXIT_INVALID;
use crate::report_error;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Command text, e.g. `Gemini.gemini-pro.generateContent("hi")`.
    pub command: String,
}

pub async fn run(backend: &Backend, args: RunArgs) -> anyhow::Result<i32> {
    let mut session = Session::new(
        &backend.config.provider,
        backend.completer(),
        CatalogHandle::new(backend.config.provider.as_str()),
    );
    let cursor = args.command.chars().count();
    session.set_text(args.command, cursor);

    let outcome = session.run(&backend.registry).await;
    let code = match &outcome {
        RunOutcome::Output(_) => {
            println!("{outcome}");
            0
        }
        RunOutcome::Empty | RunOutcome::Rejected(_) => {
            report_error(&outcome.to_string());
            EXIT_INVALID
        }
        RunOutcome::Failed(_) => {
            report_error(&outcome.to_string());
            EXIT_FAILED
        }
    };
    Ok(code)
}
