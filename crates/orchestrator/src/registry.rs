//! Built services and the names still waiting to be built.

use std::collections::HashMap;
use std::sync::Arc;

use crate::service::{same_instance, Service};

struct RegisteredService {
    service: Arc<dyn Service>,
    /// Discovery order, breaks priority ties.
    sequence: u64,
}

/// Name-keyed registry of live services plus the pending set.
///
/// A name is either built or pending, never both: inserting a service
/// removes its name from the pending set, and removing a service puts the
/// name back.
#[derive(Default)]
pub struct ServiceRegistry {
    services: HashMap<String, RegisteredService>,
    pending: Vec<String>,
    next_sequence: u64,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every service and every pending name.
    pub fn clear(&mut self) {
        self.services.clear();
        self.pending.clear();
    }

    /// Expect `name` to be built. Returns `false` if it is already pending
    /// or already built.
    pub fn mark_pending(&mut self, name: &str) -> bool {
        if self.services.contains_key(name) || self.is_pending(name) {
            return false;
        }
        self.pending.push(name.to_string());
        true
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.pending.iter().any(|p| p == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Whether a builder for `name` may run: the name is pending or it is
    /// being rebuilt.
    pub fn accepts_builder_for(&self, name: &str) -> bool {
        self.contains(name) || self.is_pending(name)
    }

    /// Register `service` under `name`, returning the instance it replaced.
    pub fn insert(&mut self, name: &str, service: Arc<dyn Service>) -> Option<Arc<dyn Service>> {
        self.pending.retain(|p| p != name);
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.services
            .insert(name.to_string(), RegisteredService { service, sequence })
            .map(|previous| previous.service)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Service>> {
        self.services.get(name).map(|entry| &entry.service)
    }

    /// Remove `name` from the registry and mark it pending again.
    pub fn remove_to_pending(&mut self, name: &str) -> Option<Arc<dyn Service>> {
        let removed = self.services.remove(name)?;
        self.pending.push(name.to_string());
        Some(removed.service)
    }

    /// Like [`remove_to_pending`](Self::remove_to_pending), but only when the
    /// registry holds this exact instance.
    pub fn remove_instance(&mut self, service: &Arc<dyn Service>) -> bool {
        let name = service.name();
        match self.services.get(name) {
            Some(entry) if same_instance(&entry.service, service) => {
                self.remove_to_pending(name);
                true
            }
            _ => false,
        }
    }

    /// Move every built service back to pending.
    pub fn clear_services(&mut self) {
        let mut names: Vec<(u64, String)> = self
            .services
            .drain()
            .map(|(name, entry)| (entry.sequence, name))
            .collect();
        names.sort();
        self.pending.extend(names.into_iter().map(|(_, name)| name));
    }

    /// Services by ascending priority, ties in discovery order.
    pub fn start_order(&self) -> Vec<Arc<dyn Service>> {
        let mut entries: Vec<&RegisteredService> = self.services.values().collect();
        entries.sort_by_key(|entry| (entry.service.priority(), entry.sequence));
        entries
            .into_iter()
            .map(|entry| Arc::clone(&entry.service))
            .collect()
    }

    /// Exact reverse of [`start_order`](Self::start_order).
    pub fn stop_order(&self) -> Vec<Arc<dyn Service>> {
        let mut order = self.start_order();
        order.reverse();
        order
    }

    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
