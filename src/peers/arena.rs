//! Generational storage for package snapshots.
//!
//! File peer links point into this arena through [`FileRef`]s. Removing a
//! snapshot bumps its slot generation, so every id or reference issued for
//! the old occupant resolves to `None` afterwards, including when the slot
//! is reused.

use crate::model::{FileEntry, FileRef, PackageSnapshot, SnapshotId};

#[derive(Debug)]
struct Slot {
    generation: u32,
    value: Option<PackageSnapshot>,
}

#[derive(Debug, Default)]
pub(crate) struct SnapshotArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl SnapshotArena {
    pub(crate) fn insert(&mut self, snapshot: PackageSnapshot) -> SnapshotId {
        self.live += 1;
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.slots[slot as usize];
            entry.value = Some(snapshot);
            return SnapshotId {
                slot,
                generation: entry.generation,
            };
        }

        let slot = u32::try_from(self.slots.len()).expect("snapshot arena exceeds u32 slots");
        self.slots.push(Slot {
            generation: 0,
            value: Some(snapshot),
        });
        SnapshotId {
            slot,
            generation: 0,
        }
    }

    pub(crate) fn get(&self, id: SnapshotId) -> Option<&PackageSnapshot> {
        self.slots
            .get(id.slot as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.value.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: SnapshotId) -> Option<&mut PackageSnapshot> {
        self.slots
            .get_mut(id.slot as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.value.as_mut())
    }

    pub(crate) fn file(&self, fref: FileRef) -> Option<&FileEntry> {
        self.get(fref.snapshot).and_then(|s| s.file(fref.position))
    }

    pub(crate) fn file_mut(&mut self, fref: FileRef) -> Option<&mut FileEntry> {
        self.get_mut(fref.snapshot)
            .and_then(|s| s.file_mut(fref.position))
    }

    /// Take a snapshot out of the arena, invalidating its id.
    pub(crate) fn remove(&mut self, id: SnapshotId) -> Option<PackageSnapshot> {
        let slot = self.slots.get_mut(id.slot as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.slot);
        self.live -= 1;
        Some(value)
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BuildSide, PackageMetadata};
    use std::sync::Arc;

    fn snapshot(name: &str) -> PackageSnapshot {
        PackageSnapshot::new(
            Arc::new(PackageMetadata::new(name, "1.0", "1")),
            BuildSide::After,
        )
        .with_files(vec![FileEntry::new(format!("/usr/bin/{name}"))])
    }

    #[test]
    fn test_removed_ids_do_not_resolve() {
        let mut arena = SnapshotArena::default();
        let id = arena.insert(snapshot("foo"));
        let fref = FileRef {
            snapshot: id,
            position: 0,
        };
        assert!(arena.file(fref).is_some());

        let removed = arena.remove(id).expect("present");
        assert_eq!(removed.name(), "foo");
        assert!(arena.get(id).is_none());
        assert!(arena.file(fref).is_none());
        assert!(arena.remove(id).is_none());
        assert_eq!(arena.len(), 0);
    }

    #[test]
    fn test_reused_slot_gets_new_generation() {
        let mut arena = SnapshotArena::default();
        let old = arena.insert(snapshot("foo"));
        arena.remove(old);
        let new = arena.insert(snapshot("bar"));

        assert_eq!(old.slot, new.slot);
        assert_ne!(old.generation, new.generation);
        assert!(arena.get(old).is_none());
        assert_eq!(arena.get(new).map(PackageSnapshot::name), Some("bar"));
        assert_eq!(arena.len(), 1);
    }
}
