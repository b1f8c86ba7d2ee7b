use std::io::Write;
use std::process::ExitCode;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use wish::config::{ERROR_MESSAGE, Invocation, LOG_ENV};
use wish::error::report_error;
use wish::{Interpreter, ShellError};

fn main() -> ExitCode {
    // Silent unless asked for: stderr is reserved for the fixed error message.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("off")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let invocation = match Invocation::from_args(&args) {
        Ok(invocation) => invocation,
        Err(err) => {
            report_error(&mut std::io::stderr(), &err);
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(?invocation, "starting");

    let mut sh: Interpreter = Interpreter::default();
    let outcome = match invocation {
        Invocation::Interactive => sh.repl(),
        Invocation::Batch(path) => sh.run_batch(&path).map_err(anyhow::Error::from),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Shell errors were reported where they happened.
            if err.downcast_ref::<ShellError>().is_none() {
                tracing::error!(error = %err, "input failed");
                let _ = std::io::stderr().write_all(ERROR_MESSAGE.as_bytes());
            }
            ExitCode::FAILURE
        }
    }
}
