//! Keeps the index in sync with persistence lifecycle events.

use crate::{client::SolrClient, error::SolrResult, mapping::Indexable};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Persistence lifecycle events relevant to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// The entity was inserted.
    PostPersist,
    /// The entity was updated.
    PostUpdate,
    /// The entity is about to be deleted.
    PreRemove,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LifecycleEvent::PostPersist => "postPersist",
            LifecycleEvent::PostUpdate => "postUpdate",
            LifecycleEvent::PreRemove => "preRemove",
        })
    }
}

/// Reacts to lifecycle events of entities of type `E`.
#[async_trait]
pub trait LifecycleListener<E: Indexable>: Send + Sync {
    /// Handle one event.
    async fn on_event(&self, event: LifecycleEvent, entity: &E) -> SolrResult<()>;
}

/// Indexes persisted and updated entities and removes deleted ones.
///
/// The switch is shared between clones, so disabling one clone disables
/// them all.
#[derive(Clone)]
pub struct IndexListener {
    client: SolrClient,
    enabled: Arc<AtomicBool>,
}

impl IndexListener {
    /// Create an enabled listener.
    pub fn new(client: SolrClient) -> Self {
        Self {
            client,
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Whether events are forwarded to the index.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Resume forwarding events.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    /// Ignore events, e.g. during bulk imports.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    /// Forward an event to the index.
    pub async fn handle<E: Indexable>(&self, event: LifecycleEvent, entity: &E) -> SolrResult<()> {
        if !self.is_enabled() {
            debug!("Index listener disabled, ignoring {}", event);
            return Ok(());
        }

        debug!("{} on {}", event, std::any::type_name::<E>());
        match event {
            LifecycleEvent::PostPersist => self.client.add_document(entity).await.map(|_| ()),
            LifecycleEvent::PostUpdate => self.client.update_document(entity).await.map(|_| ()),
            LifecycleEvent::PreRemove => self.client.remove_document(entity).await,
        }
    }
}

#[async_trait]
impl<E: Indexable> LifecycleListener<E> for IndexListener {
    async fn on_event(&self, event: LifecycleEvent, entity: &E) -> SolrResult<()> {
        self.handle(event, entity).await
    }
}

impl fmt::Debug for IndexListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexListener")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
