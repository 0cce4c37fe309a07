mod cli;
mod logging;
mod ncds;
mod netconf_server;
mod server;
mod signal;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;

use crate::cli::{Config, Outcome};
use crate::ncds::Library;
use crate::signal::{Deferred, Shutdown};

/// Detaches from the controlling terminal, keeping the working directory.
fn daemonize() -> anyhow::Result<()> {
    nix::unistd::daemon(true, false).context("Going to background failed")
}

fn run(config: Config) -> anyhow::Result<()> {
    let deferred = Deferred::block()?;
    if config.daemonize {
        daemonize()?;
    }

    // after daemonizing: the runtime's threads would not survive the fork.
    // The bootstrap blocks this thread, the signal listener runs on a worker.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create runtime")?;

    runtime.block_on(async move {
        let shutdown = Arc::new(Shutdown::new());
        signal::listen(Arc::clone(&shutdown))?;
        deferred.release()?;

        let mut library = Library::new();
        server::run(&mut library, &config, &shutdown).await?;
        log::debug!("shutdown complete");
        Ok::<(), anyhow::Error>(())
    })
}

fn main() -> ExitCode {
    let config = match cli::parse_from(std::env::args_os()) {
        Outcome::Run(config) => config,
        Outcome::Exit(text) => {
            print!("{}", text);
            return ExitCode::SUCCESS;
        }
    };

    if let Err(e) = logging::init(config.verbosity, config.daemonize) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
