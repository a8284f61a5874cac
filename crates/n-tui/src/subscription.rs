// SPDX-License-Identifier: MIT
//
// Handler registries.
//
// The writer's resize hook and the decoder's event handlers are both plain
// lists of boxed closures with an explicit subscribe/unsubscribe interface.
// Handlers run in registration order. Ids are never reused within one
// registry, so a stale id can only ever miss and never removes someone
// else's handler.

/// Handle returned when registering a handler; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Ordered list of handlers keyed by [`SubscriptionId`].
pub struct Subscribers<H> {
    next: u64,
    entries: Vec<(SubscriptionId, H)>,
}

impl<H> Subscribers<H> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: 0,
            entries: Vec::new(),
        }
    }

    /// Register a handler at the end of the list.
    pub fn add(&mut self, handler: H) -> SubscriptionId {
        let id = SubscriptionId(self.next);
        self.next += 1;
        self.entries.push((id, handler));
        id
    }

    /// Remove a handler. Returns `false` if `id` was not registered.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    /// Handlers in registration order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut H> {
        self.entries.iter_mut().map(|(_, handler)| handler)
    }

    /// Drop every handler.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<H> Default for Subscribers<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> std::fmt::Debug for Subscribers<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Subscribers({})", self.entries.len())
    }
}
