use std::sync::{
    Arc, OnceLock,
    atomic::{AtomicBool, Ordering},
};

use log::warn;
use tokio::signal;

/// A sticky stop request, polled by the estimation loops.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process wide instance.
    pub fn global() -> &'static Interrupt {
        static GLOBAL: OnceLock<Interrupt> = OnceLock::new();
        GLOBAL.get_or_init(Interrupt::new)
    }

    /// Requests every loop polling this flag to stop. Cannot be undone.
    pub fn raise(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_raised(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Raises this flag once the process receives ctrl-c.
    ///
    /// Must be called from within a tokio runtime.
    pub fn listen_ctrl_c(&self) {
        let this = self.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                warn!("caught interrupt, stopping at the next pass");
                this.raise();
            }
        });
    }
}
