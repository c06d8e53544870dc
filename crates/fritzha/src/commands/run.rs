//! The polling loop: start, run until interrupted, shut down.

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use fritzha_core::{Poller, RunOptions, open_sinks};

use crate::cli::RunArgs;
use crate::error::CliError;

pub async fn handle(args: &RunArgs, config: Option<&Path>) -> Result<(), CliError> {
    let (loaded, poller_config) = super::load(config)?;
    let sinks = open_sinks(&loaded.config.sink_settings()?)?;
    if sinks.is_empty() {
        warn!("neither InfluxOutput nor csvOutput is enabled, measurements are discarded");
    }

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            let signal = shutdown_signal().await;
            info!(signal, "shutdown requested, stopping");
            cancel.cancel();
        }
    });

    let mut poller = match Poller::start(&poller_config, sinks).await {
        Ok(poller) => poller,
        Err(e) => {
            watcher.abort();
            error!(error = %e, fatal = true, "startup failed");
            return Err(e.into());
        }
    };

    let options = RunOptions {
        once: args.test,
        service: args.service,
    };
    let result = poller.run(options, &cancel).await;
    poller.close().await;
    watcher.abort();

    let stats = result?;
    info!(
        cycles = stats.cycles,
        failures = stats.failures,
        "fritzha stopped"
    );
    Ok(())
}

/// Resolve on Ctrl-C or, on Unix, SIGTERM. Returns the signal's name.
///
/// Never resolves if no handler could be installed.
async fn shutdown_signal() -> &'static str {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => "SIGINT",
        () = terminate => "SIGTERM",
    }
}
