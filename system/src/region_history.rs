use crate::message::GeofenceRegion;
use std::collections::VecDeque;

pub const REGION_HISTORY_CAPACITY: usize = 5;

/// The last few regions drawn by the host, oldest first. Eviction follows
/// insertion order only.
#[derive(Debug, Clone)]
pub struct RegionHistory {
    regions: VecDeque<GeofenceRegion>,
}

impl RegionHistory {
    pub fn new() -> Self {
        Self {
            regions: VecDeque::with_capacity(REGION_HISTORY_CAPACITY),
        }
    }

    /// Returns the evicted region, if any.
    pub fn push(&mut self, region: GeofenceRegion) -> Option<GeofenceRegion> {
        self.regions.push_back(region);
        let evicted = if self.regions.len() > REGION_HISTORY_CAPACITY {
            self.regions.pop_front()
        } else {
            None
        };
        debug_assert!(self.regions.len() <= REGION_HISTORY_CAPACITY);
        evicted
    }

    pub fn clear(&mut self) {
        self.regions.clear();
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeofenceRegion> {
        self.regions.iter()
    }

    pub fn to_vec(&self) -> Vec<GeofenceRegion> {
        self.regions.iter().cloned().collect()
    }
}

impl Default for RegionHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a RegionHistory {
    type Item = &'a GeofenceRegion;
    type IntoIter = std::collections::vec_deque::Iter<'a, GeofenceRegion>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.iter()
    }
}
