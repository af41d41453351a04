//! Fail-fast panic handling.
//!
//! A panic on any thread is logged and reported on a watch channel; the
//! serve loop treats that as fatal, shuts the listener down and exits 1.

use tokio::sync::watch;

/// Receives the first panic message.
#[derive(Debug, Clone)]
pub struct CrashSignal {
    rx: watch::Receiver<Option<String>>,
}

impl CrashSignal {
    /// Wait until something panics and return its message.
    pub async fn crashed(&mut self) -> String {
        match self.rx.wait_for(Option::is_some).await {
            Ok(message) => message.clone().unwrap_or_default(),
            // Sender lives in the hook, which is never dropped
            Err(_) => std::future::pending().await,
        }
    }
}

/// Report panics through a [`CrashSignal`] in addition to the default hook.
pub fn install() -> CrashSignal {
    let (tx, rx) = watch::channel(None);
    let previous = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |info| {
        let message = info.to_string();
        tracing::error!("PANIC: {}", message);
        previous(info);

        tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(message.clone());
                true
            } else {
                false
            }
        });
    }));

    CrashSignal { rx }
}
