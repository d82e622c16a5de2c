use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::lock::{Lease, LockError, LockService};

pub const GLOBAL_MUTEX_NAME: &str = "global-wallets-mutex";
const WALLET_MUTEX_PREFIX: &str = "wallet-mutex:";

/// How much of the ledger a single transfer locks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LockScope {
    /// One lock for every transfer in the cluster.
    #[default]
    Global,
    /// One lock per wallet, taken for both sides of a transfer in lexicographic order.
    WalletPair
}

/// Locks held for one transfer, released in reverse order of acquisition.
///
/// Dropping the guard without calling [`HeldLocks::release`] (for example when the
/// owning future is cancelled) hands the release to a background task.
pub struct HeldLocks<L: LockService> {
    service: Arc<L>,
    leases: Vec<Lease>
}

impl<L: LockService> HeldLocks<L> {
    pub async fn release(mut self) -> Result<(), LockError> {
        let leases = std::mem::take(&mut self.leases);
        release_all(self.service.as_ref(), leases).await
    }
}

impl<L: LockService> Drop for HeldLocks<L> {
    fn drop(&mut self) {
        if self.leases.is_empty() {
            return;
        }

        let leases = std::mem::take(&mut self.leases);
        let service = self.service.clone();

        match Handle::try_current() {
            Ok(runtime) => {
                warn!("Releasing {} abandoned lock(s) in the background", leases.len());
                runtime.spawn(async move {
                    // Failures are logged by release_all.
                    let _ = release_all(service.as_ref(), leases).await;
                });
            }
            Err(_) => warn!("No runtime to release {} abandoned lock(s), they expire with their ttl", leases.len())
        }
    }
}

async fn release_all<L: LockService>(service: &L, leases: Vec<Lease>) -> Result<(), LockError> {
    let mut outcome = Ok(());

    for lease in leases.into_iter().rev() {
        debug!("Releasing lock [{}]", lease.name);

        if let Err(error) = service.release(lease).await {
            warn!("{error}");
            outcome = Err(error);
        }
    }

    outcome
}

pub struct DistributedMutex<L> {
    service: Arc<L>,
    scope: LockScope,
    ttl: Duration
}

impl<L: LockService> DistributedMutex<L> {
    pub fn new(service: Arc<L>, scope: LockScope, ttl: Duration) -> Self {
        Self { service, scope, ttl }
    }

    /// Names of the locks guarding a transfer, in acquisition order.
    pub fn lock_names(&self, source_wallet: &str, destination_wallet: &str) -> Vec<String> {
        match self.scope {
            LockScope::Global => vec![GLOBAL_MUTEX_NAME.to_string()],
            LockScope::WalletPair => {
                let (first, second) = if source_wallet <= destination_wallet {
                    (source_wallet, destination_wallet)
                } else {
                    (destination_wallet, source_wallet)
                };

                let mut names = vec![format!("{WALLET_MUTEX_PREFIX}{first}")];

                if first != second {
                    names.push(format!("{WALLET_MUTEX_PREFIX}{second}"));
                }

                names
            }
        }
    }

    pub async fn acquire(&self, source_wallet: &str, destination_wallet: &str) -> Result<HeldLocks<L>, LockError> {
        let mut held = HeldLocks { service: self.service.clone(), leases: Vec::new() };

        for name in self.lock_names(source_wallet, destination_wallet) {
            debug!("Acquiring lock [{name}]");

            match self.service.acquire(&name, self.ttl).await {
                Ok(lease) => held.leases.push(lease),
                Err(error) => {
                    // Failures here are already logged by release.
                    let _ = held.release().await;
                    return Err(error);
                }
            }
        }

        Ok(held)
    }

    pub async fn release(&self, held: HeldLocks<L>) -> Result<(), LockError> {
        held.release().await
    }
}
