//! Slotted resource store with capacity accounting and access control.
//!
//! A store owns a fixed-length array of slots, each holding zero or one
//! stack of a single resource. All mutation goes through the store's own
//! operations so the derived weight/volume totals stay consistent with the
//! slot contents after every call.
//!
//! Failure semantics: every mutating operation returns a bool and a `false`
//! means no state changed, with one documented exception — [`ResourceStore::remove`]
//! clamps an over-request and succeeds with what was present. The strict
//! variant [`ResourceStore::remove_exact`] is what the production admission
//! path uses.

use fabworks_logic::access::{mode_allows_modify, mode_allows_view, AccessMode};
use fabworks_logic::catalog::{Catalog, ResourceId};
use serde::{Deserialize, Serialize};

/// One occupied slot: a resource and how many units it holds.
///
/// A stack with quantity 0 never exists; reaching zero empties the slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStack {
    pub resource: ResourceId,
    pub quantity: u32,
    /// Index of the slot this stack occupies.
    pub slot: usize,
}

/// Observable store mutations, drained by the host after each operation.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    SlotChanged(usize),
    AggregateChanged { weight: f32, volume: f32 },
    /// Occupancy crossed the slot count (true = became full).
    FullChanged(bool),
    Added { resource: ResourceId, quantity: u32 },
    Removed { resource: ResourceId, quantity: u32 },
    Reordered,
}

/// Slotted container of resource stacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceStore {
    slots: Vec<Option<ResourceStack>>,
    /// Who may view/mutate contents.
    pub access: AccessMode,
    /// Stable identity of the controlling owner, if any.
    pub owner_id: Option<String>,
    /// When set, only these resources are accepted.
    pub accept_list: Option<Vec<ResourceId>>,
    /// Carry weight limit; `None` = unlimited.
    pub max_weight: Option<f32>,
    /// Carry volume limit; `None` = unlimited.
    pub max_volume: Option<f32>,
    current_weight: f32,
    current_volume: f32,
    #[serde(skip)]
    events: Vec<StoreEvent>,
}

impl ResourceStore {
    pub fn new(max_slots: usize) -> Self {
        Self {
            slots: vec![None; max_slots],
            access: AccessMode::Public,
            owner_id: None,
            accept_list: None,
            max_weight: None,
            max_volume: None,
            current_weight: 0.0,
            current_volume: 0.0,
            events: Vec::new(),
        }
    }

    pub fn with_access(mut self, access: AccessMode) -> Self {
        self.access = access;
        self
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn with_accept_list(mut self, accepted: Vec<ResourceId>) -> Self {
        self.accept_list = Some(accepted);
        self
    }

    pub fn with_limits(mut self, max_weight: Option<f32>, max_volume: Option<f32>) -> Self {
        self.max_weight = max_weight;
        self.max_volume = max_volume;
        self
    }

    // ---------- Queries ----------

    pub fn max_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, slot: usize) -> Option<&ResourceStack> {
        self.slots.get(slot).and_then(|s| s.as_ref())
    }

    pub fn slots(&self) -> &[Option<ResourceStack>] {
        &self.slots
    }

    pub fn occupied_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(|s| s.is_some())
    }

    pub fn find_free_slot(&self) -> Option<usize> {
        self.slots.iter().position(|s| s.is_none())
    }

    /// First slot holding `resource` with room left to merge into.
    pub fn find_stackable_slot(&self, catalog: &Catalog, resource: &ResourceId) -> Option<usize> {
        if !catalog.is_stackable(resource) {
            return None;
        }
        let max_stack = catalog.max_stack_of(resource);
        self.slots.iter().position(|s| {
            s.as_ref()
                .map(|stack| stack.resource == *resource && stack.quantity < max_stack)
                .unwrap_or(false)
        })
    }

    /// First slot holding `resource`, regardless of room.
    pub fn find_slot_with(&self, resource: &ResourceId) -> Option<usize> {
        self.slots.iter().position(|s| {
            s.as_ref().map(|stack| stack.resource == *resource).unwrap_or(false)
        })
    }

    /// Total units of `resource` across all slots.
    pub fn count_of(&self, resource: &ResourceId) -> u64 {
        self.slots
            .iter()
            .flatten()
            .filter(|stack| stack.resource == *resource)
            .map(|stack| stack.quantity as u64)
            .sum()
    }

    /// Total units across all slots, all resources.
    pub fn total_quantity(&self) -> u64 {
        self.slots.iter().flatten().map(|s| s.quantity as u64).sum()
    }

    pub fn can_accept(&self, resource: &ResourceId) -> bool {
        match &self.accept_list {
            Some(list) => list.contains(resource),
            None => true,
        }
    }

    pub fn current_weight(&self) -> f32 {
        self.current_weight
    }

    pub fn current_volume(&self) -> f32 {
        self.current_volume
    }

    // ---------- Access control ----------

    /// `requester_id` is the requester's resolved controlling identity
    /// (`None` when the requester is gone or has no identity).
    pub fn can_view(&self, requester_id: Option<&str>) -> bool {
        mode_allows_view(self.access, self.is_owner(requester_id))
    }

    pub fn can_modify(&self, requester_id: Option<&str>) -> bool {
        mode_allows_modify(self.access, self.is_owner(requester_id))
    }

    fn is_owner(&self, requester_id: Option<&str>) -> bool {
        match (&self.owner_id, requester_id) {
            (Some(owner), Some(req)) => owner == req,
            _ => false,
        }
    }

    // ---------- Mutations ----------

    /// Add `quantity` units, preferring to merge into the first compatible
    /// stack with room, else the first free slot. Fails without effect when
    /// the allow-list rejects the resource, a carry limit would be exceeded,
    /// or no slot can take the whole quantity.
    pub fn add(&mut self, catalog: &Catalog, resource: &ResourceId, quantity: u32) -> bool {
        if quantity == 0 || !self.can_accept(resource) {
            return false;
        }

        if let Some(max) = self.max_weight {
            if self.current_weight + catalog.weight_of(resource) * quantity as f32 > max {
                return false;
            }
        }
        if let Some(max) = self.max_volume {
            if self.current_volume + catalog.volume_of(resource) * quantity as f32 > max {
                return false;
            }
        }

        let was_full = self.is_full();
        let max_stack = catalog.max_stack_of(resource);

        let merge_slot = self.find_stackable_slot(catalog, resource).filter(|&i| {
            self.slots[i]
                .as_ref()
                .map(|s| s.quantity + quantity <= max_stack)
                .unwrap_or(false)
        });

        let slot = match merge_slot.or_else(|| self.find_free_slot()) {
            Some(slot) => slot,
            None => return false,
        };

        match &mut self.slots[slot] {
            Some(stack) => stack.quantity += quantity,
            empty => {
                *empty = Some(ResourceStack {
                    resource: resource.clone(),
                    quantity,
                    slot,
                });
            }
        }

        self.events.push(StoreEvent::Added {
            resource: resource.clone(),
            quantity,
        });
        self.events.push(StoreEvent::SlotChanged(slot));
        self.recompute_aggregates(catalog);
        self.emit_full_transition(was_full);
        true
    }

    /// Remove up to `quantity` units from a slot. An over-request is clamped
    /// to what is present and still succeeds; only a bad index, an empty
    /// slot, or a zero quantity fails.
    pub fn remove(&mut self, catalog: &Catalog, slot: usize, quantity: u32) -> bool {
        if quantity == 0 || self.get(slot).is_none() {
            return false;
        }
        let present = self.slots[slot].as_ref().map(|s| s.quantity).unwrap_or(0);
        self.take_from_slot(catalog, slot, quantity.min(present));
        true
    }

    /// Strict removal: fails without effect when the slot holds fewer than
    /// `quantity` units. Used where exact accounting matters.
    pub fn remove_exact(&mut self, catalog: &Catalog, slot: usize, quantity: u32) -> bool {
        if quantity == 0 {
            return false;
        }
        match self.get(slot) {
            Some(stack) if stack.quantity >= quantity => {
                self.take_from_slot(catalog, slot, quantity);
                true
            }
            _ => false,
        }
    }

    /// Remove from the first slot holding `resource`.
    pub fn remove_by_id(&mut self, catalog: &Catalog, resource: &ResourceId, quantity: u32) -> bool {
        match self.find_slot_with(resource) {
            Some(slot) => self.remove(catalog, slot, quantity),
            None => false,
        }
    }

    fn take_from_slot(&mut self, catalog: &Catalog, slot: usize, quantity: u32) {
        let was_full = self.is_full();
        let resource = {
            let stack = self.slots[slot].as_mut().expect("occupied slot");
            stack.quantity -= quantity;
            let resource = stack.resource.clone();
            if stack.quantity == 0 {
                self.slots[slot] = None;
            }
            resource
        };

        self.events.push(StoreEvent::Removed { resource, quantity });
        self.events.push(StoreEvent::SlotChanged(slot));
        self.recompute_aggregates(catalog);
        self.emit_full_transition(was_full);
    }

    /// Move a stack between two slots of this store: merge when the
    /// destination is stack-compatible, swap otherwise.
    pub fn move_stack(&mut self, catalog: &Catalog, from: usize, to: usize) -> bool {
        if from == to || from >= self.slots.len() || to >= self.slots.len() {
            return false;
        }
        if self.slots[from].is_none() {
            return false;
        }

        let compatible = match (&self.slots[from], &self.slots[to]) {
            (Some(a), Some(b)) => a.resource == b.resource && catalog.is_stackable(&a.resource),
            _ => false,
        };

        if compatible {
            let moved = self.slots[from].take().expect("occupied slot");
            let dest = self.slots[to].as_mut().expect("occupied slot");
            dest.quantity += moved.quantity;
        } else {
            self.slots.swap(from, to);
            for idx in [from, to] {
                if let Some(stack) = self.slots[idx].as_mut() {
                    stack.slot = idx;
                }
            }
        }

        self.events.push(StoreEvent::SlotChanged(from));
        self.events.push(StoreEvent::SlotChanged(to));
        true
    }

    /// Move one stack into another store, atomically with respect to the
    /// pair: either both sides update or neither. An occupied explicit
    /// destination slot fails over to the first free slot.
    pub fn transfer_to(
        &mut self,
        catalog: &Catalog,
        from: usize,
        other: &mut ResourceStore,
        to: Option<usize>,
    ) -> bool {
        let stack = match self.get(from) {
            Some(stack) => stack.clone(),
            None => return false,
        };
        if !other.can_accept(&stack.resource) {
            return false;
        }

        let dest = match to {
            Some(i) if i >= other.slots.len() => return false,
            Some(i) if other.slots[i].is_none() => Some(i),
            _ => other.find_free_slot(),
        };
        let dest = match dest {
            Some(dest) => dest,
            None => return false,
        };

        if let Some(max) = other.max_weight {
            if other.current_weight + catalog.weight_of(&stack.resource) * stack.quantity as f32 > max {
                return false;
            }
        }
        if let Some(max) = other.max_volume {
            if other.current_volume + catalog.volume_of(&stack.resource) * stack.quantity as f32 > max {
                return false;
            }
        }

        // All checks passed; commit both sides.
        let other_was_full = other.is_full();
        self.take_from_slot(catalog, from, stack.quantity);
        other.slots[dest] = Some(ResourceStack {
            resource: stack.resource.clone(),
            quantity: stack.quantity,
            slot: dest,
        });
        other.events.push(StoreEvent::Added {
            resource: stack.resource,
            quantity: stack.quantity,
        });
        other.events.push(StoreEvent::SlotChanged(dest));
        other.recompute_aggregates(catalog);
        other.emit_full_transition(other_was_full);
        true
    }

    /// Split `split_quantity` units off a stack into a free slot. Never
    /// round-trips through remove+add, so totals hold throughout.
    pub fn split(&mut self, slot: usize, split_quantity: u32) -> bool {
        let (resource, present) = match self.get(slot) {
            Some(stack) => (stack.resource.clone(), stack.quantity),
            None => return false,
        };
        if split_quantity == 0 || split_quantity >= present {
            return false;
        }
        let free = match self.find_free_slot() {
            Some(free) => free,
            None => return false,
        };

        self.slots[slot].as_mut().expect("occupied slot").quantity -= split_quantity;
        self.slots[free] = Some(ResourceStack {
            resource,
            quantity: split_quantity,
            slot: free,
        });

        let was_full = false; // a free slot existed, so the store was not full
        self.events.push(StoreEvent::SlotChanged(slot));
        self.events.push(StoreEvent::SlotChanged(free));
        self.emit_full_transition(was_full);
        true
    }

    /// Change the slot count. Refuses to shrink below the highest occupied
    /// slot so no stack is dropped.
    pub fn resize(&mut self, new_max_slots: usize) -> bool {
        let highest_occupied = self
            .slots
            .iter()
            .rposition(|s| s.is_some())
            .map(|i| i + 1)
            .unwrap_or(0);
        if new_max_slots < highest_occupied {
            return false;
        }
        self.slots.resize(new_max_slots, None);
        self.events.push(StoreEvent::Reordered);
        true
    }

    /// Sort occupied stacks by catalog display name, empties last.
    pub fn sort_by_name(&mut self, catalog: &Catalog) {
        let mut occupied: Vec<ResourceStack> = self.slots.iter_mut().filter_map(|s| s.take()).collect();
        occupied.sort_by(|a, b| catalog.name_of(&a.resource).cmp(catalog.name_of(&b.resource)));
        for (idx, mut stack) in occupied.into_iter().enumerate() {
            stack.slot = idx;
            self.slots[idx] = Some(stack);
        }
        self.events.push(StoreEvent::Reordered);
    }

    // ---------- Events / aggregates ----------

    /// Drain pending events for the host to observe.
    pub fn drain_events(&mut self) -> Vec<StoreEvent> {
        std::mem::take(&mut self.events)
    }

    /// Recompute weight/volume totals from slot contents. Called after every
    /// mutation and after load.
    pub fn recompute_aggregates(&mut self, catalog: &Catalog) {
        let mut weight = 0.0;
        let mut volume = 0.0;
        for stack in self.slots.iter().flatten() {
            weight += catalog.weight_of(&stack.resource) * stack.quantity as f32;
            volume += catalog.volume_of(&stack.resource) * stack.quantity as f32;
        }
        if weight != self.current_weight || volume != self.current_volume {
            self.current_weight = weight;
            self.current_volume = volume;
            self.events.push(StoreEvent::AggregateChanged { weight, volume });
        }
    }

    fn emit_full_transition(&mut self, was_full: bool) {
        let now_full = self.is_full();
        if now_full != was_full {
            self.events.push(StoreEvent::FullChanged(now_full));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabworks_logic::catalog::ResourceDef;

    fn test_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.insert("wood", ResourceDef::new("Wood", 2.0, 1.0));
        catalog.insert("stone", ResourceDef::new("Stone", 5.0, 2.0));
        catalog.insert("anvil", ResourceDef::new("Anvil", 50.0, 20.0).unstackable());
        catalog
    }

    fn id(s: &str) -> ResourceId {
        ResourceId::from(s)
    }

    #[test]
    fn stack_and_merge_scenario() {
        let catalog = test_catalog();
        let mut store = ResourceStore::new(2);

        assert!(store.add(&catalog, &id("wood"), 5));
        assert_eq!(store.get(0).unwrap().quantity, 5);

        // Merges into slot 0 instead of taking the free slot.
        assert!(store.add(&catalog, &id("wood"), 3));
        assert_eq!(store.get(0).unwrap().quantity, 8);
        assert!(store.get(1).is_none());

        assert!(store.add(&catalog, &id("stone"), 1));
        assert_eq!(store.get(1).unwrap().quantity, 1);

        // Full, but stone still merges.
        assert!(store.add(&catalog, &id("stone"), 1));
        assert_eq!(store.get(1).unwrap().quantity, 2);
    }

    #[test]
    fn add_fails_when_no_slot_and_no_merge() {
        let catalog = test_catalog();
        let mut store = ResourceStore::new(1);
        assert!(store.add(&catalog, &id("wood"), 1));
        assert!(!store.add(&catalog, &id("stone"), 1));
        assert_eq!(store.count_of(&id("stone")), 0);
    }

    #[test]
    fn unstackable_never_merges() {
        let catalog = test_catalog();
        let mut store = ResourceStore::new(2);
        assert!(store.add(&catalog, &id("anvil"), 1));
        assert!(store.add(&catalog, &id("anvil"), 1));
        assert_eq!(store.occupied_slots(), 2);
        // Store now full, third anvil has nowhere to go.
        assert!(!store.add(&catalog, &id("anvil"), 1));
    }

    #[test]
    fn allow_list_rejects_before_mutation() {
        let catalog = test_catalog();
        let mut store = ResourceStore::new(4).with_accept_list(vec![id("wood")]);
        assert!(store.add(&catalog, &id("wood"), 1));
        assert!(!store.add(&catalog, &id("stone"), 1));
        assert_eq!(store.total_quantity(), 1);
    }

    #[test]
    fn weight_limit_blocks_add() {
        let catalog = test_catalog();
        let mut store = ResourceStore::new(4).with_limits(Some(10.0), None);
        assert!(store.add(&catalog, &id("wood"), 5)); // 10.0 exactly
        assert!(!store.add(&catalog, &id("wood"), 1));
        assert_eq!(store.count_of(&id("wood")), 5);
    }

    #[test]
    fn weight_volume_invariant_holds() {
        let catalog = test_catalog();
        let mut store = ResourceStore::new(4);
        store.add(&catalog, &id("wood"), 3);
        store.add(&catalog, &id("stone"), 2);
        store.remove(&catalog, 0, 1);

        let expected_weight = 2.0 * 2.0 + 5.0 * 2.0;
        let expected_volume = 2.0 * 1.0 + 2.0 * 2.0;
        assert!((store.current_weight() - expected_weight).abs() < 1e-5);
        assert!((store.current_volume() - expected_volume).abs() < 1e-5);
    }

    #[test]
    fn remove_clamps_over_request() {
        let catalog = test_catalog();
        let mut store = ResourceStore::new(2);
        store.add(&catalog, &id("wood"), 3);

        assert!(store.remove(&catalog, 0, 10));
        assert!(store.get(0).is_none());
        assert_eq!(store.total_quantity(), 0);
    }

    #[test]
    fn remove_exact_refuses_over_request() {
        let catalog = test_catalog();
        let mut store = ResourceStore::new(2);
        store.add(&catalog, &id("wood"), 3);

        assert!(!store.remove_exact(&catalog, 0, 4));
        assert_eq!(store.get(0).unwrap().quantity, 3);
        assert!(store.remove_exact(&catalog, 0, 3));
        assert!(store.get(0).is_none());
    }

    #[test]
    fn remove_invalid_inputs_fail() {
        let catalog = test_catalog();
        let mut store = ResourceStore::new(2);
        store.add(&catalog, &id("wood"), 3);

        assert!(!store.remove(&catalog, 5, 1)); // bad index
        assert!(!store.remove(&catalog, 1, 1)); // empty slot
        assert!(!store.remove(&catalog, 0, 0)); // zero quantity
        assert_eq!(store.total_quantity(), 3);
    }

    #[test]
    fn move_merges_compatible_stacks() {
        let catalog = test_catalog();
        let mut store = ResourceStore::new(3);
        store.add(&catalog, &id("wood"), 4);
        store.split(0, 1);

        assert!(store.move_stack(&catalog, 1, 0));
        assert_eq!(store.get(0).unwrap().quantity, 4);
        assert!(store.get(1).is_none());
    }

    #[test]
    fn move_swaps_incompatible_stacks() {
        let catalog = test_catalog();
        let mut store = ResourceStore::new(2);
        store.add(&catalog, &id("wood"), 2);
        store.add(&catalog, &id("stone"), 1);

        assert!(store.move_stack(&catalog, 0, 1));
        assert_eq!(store.get(0).unwrap().resource, id("stone"));
        assert_eq!(store.get(1).unwrap().resource, id("wood"));
        assert_eq!(store.get(1).unwrap().slot, 1);
    }

    #[test]
    fn move_rejects_same_or_invalid_index() {
        let catalog = test_catalog();
        let mut store = ResourceStore::new(2);
        store.add(&catalog, &id("wood"), 2);
        assert!(!store.move_stack(&catalog, 0, 0));
        assert!(!store.move_stack(&catalog, 0, 9));
        assert!(!store.move_stack(&catalog, 1, 0)); // empty source
    }

    #[test]
    fn split_requires_room_and_sane_quantity() {
        let catalog = test_catalog();
        let mut store = ResourceStore::new(2);
        store.add(&catalog, &id("wood"), 5);

        assert!(!store.split(0, 0));
        assert!(!store.split(0, 5)); // >= current quantity
        assert!(store.split(0, 2));
        assert_eq!(store.get(0).unwrap().quantity, 3);
        assert_eq!(store.get(1).unwrap().quantity, 2);
    }

    #[test]
    fn split_with_no_free_slot_leaves_stack_unchanged() {
        let catalog = test_catalog();
        let mut store = ResourceStore::new(2);
        store.add(&catalog, &id("wood"), 5);
        store.add(&catalog, &id("stone"), 1);

        assert!(!store.split(0, 2));
        assert_eq!(store.get(0).unwrap().quantity, 5);
    }

    #[test]
    fn transfer_is_atomic_and_conserves() {
        let catalog = test_catalog();
        let mut a = ResourceStore::new(2);
        let mut b = ResourceStore::new(2);
        a.add(&catalog, &id("wood"), 5);

        let before = a.total_quantity() + b.total_quantity();
        assert!(a.transfer_to(&catalog, 0, &mut b, None));
        assert_eq!(a.total_quantity() + b.total_quantity(), before);
        assert!(a.get(0).is_none());
        assert_eq!(b.get(0).unwrap().quantity, 5);
    }

    #[test]
    fn transfer_fails_over_to_free_slot() {
        let catalog = test_catalog();
        let mut a = ResourceStore::new(2);
        let mut b = ResourceStore::new(2);
        a.add(&catalog, &id("wood"), 2);
        b.add(&catalog, &id("stone"), 1);

        // Slot 0 in b is occupied; the stack lands in slot 1.
        assert!(a.transfer_to(&catalog, 0, &mut b, Some(0)));
        assert_eq!(b.get(1).unwrap().resource, id("wood"));
    }

    #[test]
    fn transfer_rejected_by_allow_list_touches_nothing() {
        let catalog = test_catalog();
        let mut a = ResourceStore::new(2);
        let mut b = ResourceStore::new(2).with_accept_list(vec![id("stone")]);
        a.add(&catalog, &id("wood"), 2);

        assert!(!a.transfer_to(&catalog, 0, &mut b, None));
        assert_eq!(a.get(0).unwrap().quantity, 2);
        assert_eq!(b.total_quantity(), 0);
    }

    #[test]
    fn transfer_to_full_destination_fails() {
        let catalog = test_catalog();
        let mut a = ResourceStore::new(1);
        let mut b = ResourceStore::new(1);
        a.add(&catalog, &id("wood"), 2);
        b.add(&catalog, &id("stone"), 1);

        assert!(!a.transfer_to(&catalog, 0, &mut b, None));
        assert_eq!(a.get(0).unwrap().quantity, 2);
    }

    #[test]
    fn full_event_toggles_on_crossing() {
        let catalog = test_catalog();
        let mut store = ResourceStore::new(1);
        store.add(&catalog, &id("wood"), 1);
        let events = store.drain_events();
        assert!(events.contains(&StoreEvent::FullChanged(true)));

        store.remove(&catalog, 0, 1);
        let events = store.drain_events();
        assert!(events.contains(&StoreEvent::FullChanged(false)));
    }

    #[test]
    fn resize_refuses_to_drop_stacks() {
        let catalog = test_catalog();
        let mut store = ResourceStore::new(4);
        store.add(&catalog, &id("wood"), 1);
        store.add(&catalog, &id("stone"), 1);

        assert!(!store.resize(1));
        assert!(store.resize(2));
        assert!(store.resize(8));
        assert_eq!(store.max_slots(), 8);
    }

    #[test]
    fn sort_by_name_orders_occupied_first() {
        let catalog = test_catalog();
        let mut store = ResourceStore::new(4);
        store.add(&catalog, &id("wood"), 1);
        store.add(&catalog, &id("stone"), 1);
        store.remove(&catalog, 0, 1);
        store.add(&catalog, &id("anvil"), 1);

        store.sort_by_name(&catalog);
        assert_eq!(store.get(0).unwrap().resource, id("anvil"));
        assert_eq!(store.get(1).unwrap().resource, id("stone"));
        assert!(store.get(2).is_none());
    }

    #[test]
    fn access_modes_gate_requesters() {
        let store = ResourceStore::new(1)
            .with_access(AccessMode::Private)
            .with_owner("alice");

        assert!(store.can_view(Some("alice")));
        assert!(store.can_modify(Some("alice")));
        assert!(!store.can_view(Some("bob")));
        assert!(!store.can_modify(Some("bob")));
        assert!(!store.can_modify(None));
    }
}
