use crate::agents::vehicle::{CarID, Vehicle};
use indexmap::IndexMap;
use std::ops::{Deref, DerefMut};

/// Just a storage for vehicles used across the scheduler.
///
/// This wraps an internal IndexMap<CarID, Vehicle> but hides the
/// concrete map type from end-users, allowing to evolve internals without
/// breaking public APIs. It implements Deref/DerefMut to the underlying map
/// so it can be passed to functions that expect
/// `&IndexMap<CarID, Vehicle>` or `&mut IndexMap<CarID, Vehicle>`.
#[derive(Debug, Default)]
pub struct VehiclesStorage(IndexMap<CarID, Vehicle>);

impl VehiclesStorage {
    /// Create empty vehicles storage
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Insert a vehicle by its id (vehicle.id is used as the key)
    pub fn insert_vehicle(&mut self, vehicle: Vehicle) {
        let id = vehicle.id;
        self.0.insert(id, vehicle);
    }

    /// Number of vehicles
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether storage is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Immutable iterator over (&CarID, &Vehicle)
    pub fn iter(&self) -> indexmap::map::Iter<'_, CarID, Vehicle> {
        self.0.iter()
    }

    /// Mutable iterator over (&CarID, &mut Vehicle)
    pub fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, CarID, Vehicle> {
        self.0.iter_mut()
    }

    /// Convenience: values iterator
    pub fn values(&self) -> indexmap::map::Values<'_, CarID, Vehicle> {
        self.0.values()
    }

    /// Convenience: mutable values iterator
    pub fn values_mut(&mut self) -> indexmap::map::ValuesMut<'_, CarID, Vehicle> {
        self.0.values_mut()
    }
}

// Allow transparent access to IndexMap API and deref-coercions in function calls
impl Deref for VehiclesStorage {
    type Target = IndexMap<CarID, Vehicle>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl DerefMut for VehiclesStorage {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_preserves_order() {
        let mut storage = VehiclesStorage::new();
        for id in [3, 1, 2] {
            storage.insert_vehicle(Vehicle::new(id).with_max_speed(2).build());
        }
        let order: Vec<CarID> = storage.keys().copied().collect();
        assert_eq!(vec![3, 1, 2], order, "Storage must keep insertion order");
        assert_eq!(3, storage.len());
        assert!(storage.get(&1).is_some());
    }
}
