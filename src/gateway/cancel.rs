use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::debug;

/// Cooperative cancellation signal shared between a request and whoever may
/// supersede it.
#[derive(Clone)]
pub struct CancellationToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called, immediately if it already was.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so `wait_for` only returns on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Logical grouping of cancellable requests: a new request on a channel
/// supersedes the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel(&'static str);

impl Channel {
    pub const AUTOCOMPLETE: Channel = Channel("autocomplete");
    pub const SEARCH: Channel = Channel("search");
    pub const SUGGESTIONS: Channel = Channel("suggestions");
    pub const CURRENT_MEAL: Channel = Channel("current-meal");

    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug)]
struct Registration {
    ticket: u64,
    token: CancellationToken,
}

/// The request currently holding a channel. Dropping it releases the
/// channel, so an aborted request no longer reads as in flight.
#[derive(Debug)]
pub struct Ticket {
    pub channel: Channel,
    pub id: u64,
    pub token: CancellationToken,
    registry: ChannelRegistry,
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.registry.release(self.channel, self.id);
    }
}

/// Channel -> in-flight request registry. The lock is never held across
/// an await.
#[derive(Debug, Clone, Default)]
pub struct ChannelRegistry {
    entries: Arc<Mutex<HashMap<Channel, Registration>>>,
    next_ticket: Arc<AtomicU64>,
}

impl ChannelRegistry {
    fn entries(&self) -> MutexGuard<'_, HashMap<Channel, Registration>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim `channel` for a new request, cancelling whatever held it.
    pub fn claim(&self, channel: Channel) -> Ticket {
        let id = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let previous = self.entries().insert(
            channel,
            Registration {
                ticket: id,
                token: token.clone(),
            },
        );
        if let Some(prev) = previous {
            if !prev.token.is_cancelled() {
                debug!(%channel, superseded = prev.ticket, by = id, "superseding in-flight request");
                prev.token.cancel();
            }
        }
        Ticket {
            channel,
            id,
            token,
            registry: self.clone(),
        }
    }

    /// Drop the registration if ticket `id` still owns `channel`.
    fn release(&self, channel: Channel, id: u64) {
        let mut entries = self.entries();
        if entries.get(&channel).is_some_and(|r| r.ticket == id) {
            entries.remove(&channel);
        }
    }

    pub fn cancel(&self, channel: Channel) {
        if let Some(reg) = self.entries().remove(&channel) {
            debug!(%channel, ticket = reg.ticket, "cancelling in-flight request");
            reg.token.cancel();
        }
    }

    pub fn cancel_all(&self) {
        for (channel, reg) in self.entries().drain() {
            debug!(%channel, ticket = reg.ticket, "cancelling in-flight request on teardown");
            reg.token.cancel();
        }
    }

    pub fn in_flight(&self, channel: Channel) -> bool {
        self.entries().contains_key(&channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_cancels_previous_holder() {
        let registry = ChannelRegistry::default();
        let first = registry.claim(Channel::AUTOCOMPLETE);
        let second = registry.claim(Channel::AUTOCOMPLETE);
        assert!(first.token.is_cancelled());
        assert!(!second.token.is_cancelled());
    }

    #[test]
    fn channels_are_independent() {
        let registry = ChannelRegistry::default();
        let typeahead = registry.claim(Channel::AUTOCOMPLETE);
        let _search = registry.claim(Channel::SEARCH);
        assert!(!typeahead.token.is_cancelled());
    }

    #[test]
    fn stale_release_keeps_newer_registration() {
        let registry = ChannelRegistry::default();
        let first = registry.claim(Channel::SUGGESTIONS);
        let second = registry.claim(Channel::SUGGESTIONS);
        drop(first);
        assert!(registry.in_flight(Channel::SUGGESTIONS));
        drop(second);
        assert!(!registry.in_flight(Channel::SUGGESTIONS));
    }

    #[tokio::test]
    async fn aborted_holder_releases_its_channel() {
        let registry = ChannelRegistry::default();
        let holder = {
            let registry = registry.clone();
            tokio::spawn(async move {
                let _ticket = registry.claim(Channel::CURRENT_MEAL);
                std::future::pending::<()>().await;
            })
        };
        while !registry.in_flight(Channel::CURRENT_MEAL) {
            tokio::task::yield_now().await;
        }

        holder.abort();
        assert!(holder.await.unwrap_err().is_cancelled());
        assert!(!registry.in_flight(Channel::CURRENT_MEAL));
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let token = CancellationToken::new();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        token.cancel();
        waiter.await.expect("waiter should finish");
        assert!(token.is_cancelled());
    }
}
