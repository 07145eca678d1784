//! Per-category handle maps

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use ash::vk::Handle;

/// One tracked object: its payload plus bookkeeping shared by every category
#[derive(Debug, Clone, Default)]
pub struct ObjectEntry<T> {
    /// Creation sequence number within the category
    pub seq: u64,
    /// Set when the object is used inside the recording window
    pub referenced_in_trim: bool,
    /// Category payload
    pub info: T,
}

/// Handle → entry map for one object category
///
/// An entry exists exactly while its handle is live. Cloning the map clones
/// every payload, so a clone never shares storage with the original.
#[derive(Debug, Clone)]
pub struct ObjectMap<H, T> {
    entries: HashMap<H, ObjectEntry<T>>,
    next_seq: u64,
}

impl<H, T> Default for ObjectMap<H, T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<H, T> ObjectMap<H, T>
where
    H: Handle + Copy + Eq + Hash,
{
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `handle` with a zero-initialized payload
    ///
    /// Adding a live handle again is API misuse; release builds log it and
    /// start over with a fresh entry.
    pub fn add(&mut self, handle: H) -> &mut ObjectEntry<T>
    where
        T: Default,
    {
        self.insert(handle, T::default())
    }

    /// Start tracking `handle` with the given payload
    pub fn insert(&mut self, handle: H, info: T) -> &mut ObjectEntry<T> {
        let seq = self.next_seq;
        self.next_seq += 1;

        let entry = ObjectEntry {
            seq,
            referenced_in_trim: false,
            info,
        };

        match self.entries.entry(handle) {
            Entry::Occupied(mut occupied) => {
                debug_assert!(false, "handle {:#x} added twice", handle.as_raw());
                log::warn!("Handle {:#x} added while still live, replacing its entry", handle.as_raw());
                occupied.insert(entry);
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => vacant.insert(entry),
        }
    }

    /// Look up a live handle
    pub fn get(&self, handle: H) -> Option<&ObjectEntry<T>> {
        self.entries.get(&handle)
    }

    /// Look up a live handle for mutation
    pub fn get_mut(&mut self, handle: H) -> Option<&mut ObjectEntry<T>> {
        self.entries.get_mut(&handle)
    }

    /// Stop tracking `handle`, dropping everything its entry owns
    pub fn remove(&mut self, handle: H) -> Option<ObjectEntry<T>> {
        self.entries.remove(&handle)
    }

    /// Whether `handle` is live
    pub fn contains(&self, handle: H) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no object is live
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate live objects in map order
    pub fn iter(&self) -> impl Iterator<Item = (H, &ObjectEntry<T>)> {
        self.entries.iter().map(|(handle, entry)| (*handle, entry))
    }

    /// Live handles in map order
    pub fn handles(&self) -> Vec<H> {
        self.entries.keys().copied().collect()
    }

    /// Live objects in the order they were created
    pub fn in_creation_order(&self) -> Vec<(H, &ObjectEntry<T>)> {
        let mut ordered: Vec<_> = self.iter().collect();
        ordered.sort_by_key(|(_, entry)| entry.seq);
        ordered
    }

    /// Drop every entry matching `predicate` and return the removed handles
    pub fn remove_where<F>(&mut self, mut predicate: F) -> Vec<H>
    where
        F: FnMut(H, &ObjectEntry<T>) -> bool,
    {
        let doomed: Vec<H> = self
            .entries
            .iter()
            .filter(|(handle, entry)| predicate(**handle, entry))
            .map(|(handle, _)| *handle)
            .collect();

        for handle in &doomed {
            self.entries.remove(handle);
        }
        doomed
    }

    /// Set the referenced flag, returning whether the handle was live
    pub fn mark_referenced(&mut self, handle: H) -> bool {
        self.entries
            .get_mut(&handle)
            .map(|entry| entry.referenced_in_trim = true)
            .is_some()
    }

    /// Clear the referenced flag on every entry
    pub fn clear_referenced(&mut self) {
        for entry in self.entries.values_mut() {
            entry.referenced_in_trim = false;
        }
    }

    /// Number of entries never referenced since the flags were cleared
    pub fn unreferenced_count(&self) -> usize {
        self.entries.values().filter(|e| !e.referenced_in_trim).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Payload {
        data: Vec<u32>,
    }

    #[test]
    fn test_add_get_remove() {
        let mut map: ObjectMap<vk::Buffer, Payload> = ObjectMap::new();
        let handle = vk::Buffer::from_raw(1);

        map.add(handle).info.data.push(5);
        assert!(map.contains(handle));
        assert_eq!(map.get(handle).unwrap().info.data, vec![5]);

        let removed = map.remove(handle).unwrap();
        assert_eq!(removed.info.data, vec![5]);
        assert!(map.is_empty());
        assert!(map.remove(handle).is_none());
    }

    #[test]
    fn test_creation_order_survives_removal() {
        let mut map: ObjectMap<vk::Image, Payload> = ObjectMap::new();
        for raw in [30, 10, 20] {
            map.add(vk::Image::from_raw(raw));
        }
        map.remove(vk::Image::from_raw(10));
        map.add(vk::Image::from_raw(5));

        let order: Vec<u64> = map
            .in_creation_order()
            .into_iter()
            .map(|(handle, _)| handle.as_raw())
            .collect();
        assert_eq!(order, vec![30, 20, 5]);
    }

    #[test]
    fn test_remove_where() {
        let mut map: ObjectMap<vk::Fence, u32> = ObjectMap::new();
        for raw in 1..=4 {
            map.insert(vk::Fence::from_raw(raw), u32::try_from(raw).unwrap());
        }

        let mut removed: Vec<u64> = map
            .remove_where(|_, entry| entry.info % 2 == 0)
            .into_iter()
            .map(Handle::as_raw)
            .collect();
        removed.sort_unstable();
        assert_eq!(removed, vec![2, 4]);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_referenced_flags() {
        let mut map: ObjectMap<vk::Sampler, ()> = ObjectMap::new();
        map.add(vk::Sampler::from_raw(1));
        map.add(vk::Sampler::from_raw(2));

        assert!(map.mark_referenced(vk::Sampler::from_raw(1)));
        assert!(!map.mark_referenced(vk::Sampler::from_raw(3)));
        assert_eq!(map.unreferenced_count(), 1);

        map.clear_referenced();
        assert_eq!(map.unreferenced_count(), 2);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut map: ObjectMap<vk::Buffer, Payload> = ObjectMap::new();
        let handle = vk::Buffer::from_raw(9);
        map.add(handle).info.data = vec![1, 2, 3];

        let copy = map.clone();
        map.get_mut(handle).unwrap().info.data.clear();
        map.remove(handle);

        assert_eq!(copy.get(handle).unwrap().info.data, vec![1, 2, 3]);
    }
}
