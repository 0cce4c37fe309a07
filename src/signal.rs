//! Two-strike shutdown: the first termination signal asks the main loop to
//! stop, the second one ends the process on the spot.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Context;
use futures::future::select_all;
use futures::FutureExt;
use nix::sys::signal::{SigSet, Signal};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Signals that request shutdown.
pub(crate) const HANDLED: [Signal; 4] = [
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGABRT,
    Signal::SIGTERM,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Strike {
    First,
    Repeated,
}

#[derive(Debug)]
pub(crate) struct Shutdown {
    strikes: AtomicUsize,
    tx: watch::Sender<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Shutdown {
            strikes: AtomicUsize::new(0),
            tx,
        }
    }

    pub(crate) fn strike(&self) -> Strike {
        if self.strikes.fetch_add(1, Ordering::SeqCst) == 0 {
            self.tx.send_replace(true);
            Strike::First
        } else {
            Strike::Repeated
        }
    }

    pub(crate) fn is_requested(&self) -> bool {
        self.strikes.load(Ordering::SeqCst) > 0
    }

    /// Resolves once shutdown has been requested.
    pub(crate) async fn requested(&self) {
        let mut rx = self.tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Holds the handled signals back on the calling thread until [`listen`]
/// has installed its handlers. Threads spawned meanwhile inherit the mask.
pub(crate) struct Deferred(SigSet);

impl Deferred {
    pub(crate) fn block() -> anyhow::Result<Self> {
        let mut set = SigSet::empty();
        for sig in HANDLED {
            set.add(sig);
        }
        set.thread_block().context("failed to block signals")?;
        Ok(Deferred(set))
    }

    /// Lets pending and future signals through to the installed handlers.
    pub(crate) fn release(self) -> anyhow::Result<()> {
        self.0.thread_unblock().context("failed to unblock signals")
    }
}

/// Feeds the handled signals into `shutdown`. A repeated strike exits the
/// process with failure status.
pub(crate) fn listen(shutdown: Arc<Shutdown>) -> anyhow::Result<JoinHandle<()>> {
    relay(shutdown, || {
        log::logger().flush();
        std::process::exit(1);
    })
}

fn relay<F>(shutdown: Arc<Shutdown>, on_repeat: F) -> anyhow::Result<JoinHandle<()>>
where
    F: Fn() + Send + 'static,
{
    let mut streams = vec![];
    for sig in HANDLED {
        let stream = signal(SignalKind::from_raw(sig as i32))
            .with_context(|| format!("failed to set up {} handler", sig))?;
        streams.push((sig, stream));
    }

    Ok(tokio::spawn(async move {
        loop {
            let (sig, _, _) = select_all(streams.iter_mut().map(|(sig, stream)| {
                let sig = *sig;
                Box::pin(async move {
                    stream.recv().await;
                    sig
                })
            }))
            .await;

            // signals delivered together count one strike each
            let mut received = vec![sig];
            for (sig, stream) in streams.iter_mut() {
                if stream.recv().now_or_never().is_some() {
                    received.push(*sig);
                }
            }

            for sig in received {
                log::debug!("Signal {} received.", sig);
                match shutdown.strike() {
                    Strike::First => log::info!("{} received, shutting down", sig),
                    Strike::Repeated => {
                        log::error!("Hey! I need some time, be patient next time!");
                        on_repeat();
                    }
                }
            }
        }
    }))
}
