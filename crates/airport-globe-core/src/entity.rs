//! Point entities and the ordered, uniquely-keyed collection that owns them

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use thiserror::Error;

use crate::event::Event;
use crate::geodesy::Cartesian3;
use crate::marker::Marker;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EntityError {
    #[error("An entity with id {0} already exists in this collection")]
    DuplicateId(EntityId),
}

/// Unique identifier for an entity within one collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A renderable marker placed on the globe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointEntity {
    pub id: EntityId,
    /// Label shown next to the marker
    pub name: String,
    /// ECEF position in metres
    pub position: Cartesian3,
    pub marker: Marker,
}

/// Payload of [`EntityCollection::collection_changed`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionChange {
    pub added: Vec<EntityId>,
    pub removed: Vec<EntityId>,
}

impl CollectionChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Default)]
struct Entities {
    ordered: Vec<PointEntity>,
    index: HashMap<EntityId, usize>,
}

impl Entities {
    fn reindex(&mut self) {
        self.index = self
            .ordered
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
    }
}

#[derive(Debug, Default)]
struct Notifications {
    suspend_count: u32,
    pending: CollectionChange,
}

/// Ordered collection of [`PointEntity`] keyed by [`EntityId`]
///
/// Every mutation raises `collection_changed` immediately, unless events are
/// suspended: then changes accumulate and are raised once when the last
/// [`resume_events`](Self::resume_events) balances the suspends.
#[derive(Debug, Default)]
pub struct EntityCollection {
    entities: RwLock<Entities>,
    notifications: Mutex<Notifications>,
    collection_changed: Event<EntityCollection, CollectionChange>,
}

impl EntityCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raised with the ids added and removed since the last notification
    pub fn collection_changed(&self) -> &Event<EntityCollection, CollectionChange> {
        &self.collection_changed
    }

    /// Add an entity; ids must be unique
    pub fn add(&self, entity: PointEntity) -> Result<(), EntityError> {
        let id = entity.id.clone();
        {
            let mut entities = self.entities.write().unwrap_or_else(|e| e.into_inner());
            if entities.index.contains_key(&id) {
                return Err(EntityError::DuplicateId(id));
            }
            let position = entities.ordered.len();
            entities.index.insert(id.clone(), position);
            entities.ordered.push(entity);
        }

        self.record(CollectionChange {
            added: vec![id],
            removed: Vec::new(),
        });
        Ok(())
    }

    /// Remove the entity with `id`. Returns false if it was not present.
    pub fn remove_by_id(&self, id: &EntityId) -> bool {
        {
            let mut entities = self.entities.write().unwrap_or_else(|e| e.into_inner());
            let Some(position) = entities.index.remove(id) else {
                return false;
            };
            entities.ordered.remove(position);
            entities.reindex();
        }

        self.record(CollectionChange {
            added: Vec::new(),
            removed: vec![id.clone()],
        });
        true
    }

    /// Remove every entity
    pub fn remove_all(&self) {
        let removed: Vec<EntityId> = {
            let mut entities = self.entities.write().unwrap_or_else(|e| e.into_inner());
            entities.index.clear();
            entities.ordered.drain(..).map(|e| e.id).collect()
        };

        if !removed.is_empty() {
            self.record(CollectionChange {
                added: Vec::new(),
                removed,
            });
        }
    }

    pub fn get_by_id(&self, id: &EntityId) -> Option<PointEntity> {
        let entities = self.entities.read().unwrap_or_else(|e| e.into_inner());
        entities
            .index
            .get(id)
            .map(|&position| entities.ordered[position].clone())
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .index
            .contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entities.read().unwrap_or_else(|e| e.into_inner()).ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all entities in insertion order
    pub fn values(&self) -> Vec<PointEntity> {
        self.entities
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .ordered
            .clone()
    }

    /// Entity ids in insertion order
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .ordered
            .iter()
            .map(|e| e.id.clone())
            .collect()
    }

    /// Defer `collection_changed` until the matching [`resume_events`](Self::resume_events)
    pub fn suspend_events(&self) {
        let mut notifications = self.notifications.lock().unwrap_or_else(|e| e.into_inner());
        notifications.suspend_count += 1;
    }

    /// Balance one [`suspend_events`](Self::suspend_events); when none remain,
    /// raise the accumulated change (if any)
    pub fn resume_events(&self) {
        let pending = {
            let mut notifications = self.notifications.lock().unwrap_or_else(|e| e.into_inner());
            if notifications.suspend_count == 0 {
                tracing::warn!("resume_events called without a matching suspend_events");
                return;
            }
            notifications.suspend_count -= 1;
            if notifications.suspend_count > 0 {
                return;
            }
            std::mem::take(&mut notifications.pending)
        };

        if !pending.is_empty() {
            self.collection_changed.raise(self, &pending);
        }
    }

    fn record(&self, change: CollectionChange) {
        {
            let mut notifications = self.notifications.lock().unwrap_or_else(|e| e.into_inner());
            if notifications.suspend_count > 0 {
                let pending = &mut notifications.pending;
                for id in change.removed {
                    // An add followed by a remove inside one batch cancels out
                    if let Some(i) = pending.added.iter().position(|a| *a == id) {
                        pending.added.remove(i);
                    } else {
                        pending.removed.push(id);
                    }
                }
                pending.added.extend(change.added);
                return;
            }
        }

        self.collection_changed.raise(self, &change);
    }
}
