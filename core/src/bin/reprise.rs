//! Reprise binary
//!
//! The process main thread runs the main-thread dispatcher; the tokio
//! runtime and everything it serves live on a second thread. When the
//! runtime finishes it drops the last dispatcher handle and the
//! dispatcher loop returns.

use std::process::ExitCode;

use clap::Parser;
use reprise_core::cli::{self, Cli};
use reprise_core::engine::MainThreadDispatcher;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli::load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let (dispatcher, handle) = MainThreadDispatcher::new();
    let handle = config.execution.main_thread_dispatcher.then_some(handle);
    let max_blocking_threads = config.execution.max_blocking_threads;

    let runtime_thread = std::thread::Builder::new()
        .name("reprise-runtime".to_string())
        .spawn(move || -> anyhow::Result<bool> {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .max_blocking_threads(max_blocking_threads)
                .build()?;
            runtime.block_on(cli::run(cli, config, handle))
        });

    let runtime_thread = match runtime_thread {
        Ok(thread) => thread,
        Err(e) => {
            eprintln!("Error: failed to start runtime thread: {}", e);
            return ExitCode::FAILURE;
        }
    };

    dispatcher.run();

    match runtime_thread.join() {
        Ok(Ok(true)) => ExitCode::SUCCESS,
        Ok(Ok(false)) => ExitCode::FAILURE,
        Ok(Err(e)) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
        Err(_) => {
            eprintln!("Error: runtime thread panicked");
            ExitCode::FAILURE
        }
    }
}
