use serde::{Deserialize, Serialize};

/// One echo reported by a detection algorithm. `distance == 0` means "no detection".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub distance: f32,
    pub intensity: i32,
}

impl Detection {
    pub const NONE: Detection = Detection {
        distance: 0.0,
        intensity: 0,
    };

    pub fn new(distance: f32, intensity: i32) -> Self {
        Self {
            distance,
            intensity,
        }
    }

    pub fn is_none(&self) -> bool {
        self.distance == 0.0
    }
}

/// Fixed-capacity detection slots for one channel and frame.
///
/// Capacity is set at construction and never changes; unwritten slots hold
/// [`Detection::NONE`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSet {
    slots: Vec<Detection>,
}

impl DetectionSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![Detection::NONE; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn clear(&mut self) {
        self.slots.fill(Detection::NONE);
    }

    /// Writes into the first free slot; returns `false` when the set is full.
    pub fn push(&mut self, detection: Detection) -> bool {
        match self.slots.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = detection;
                true
            }
            None => false,
        }
    }

    /// Overwrites slot `index`; out-of-range writes are refused.
    pub fn set(&mut self, index: usize, detection: Detection) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = detection;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, index: usize) -> Option<&Detection> {
        self.slots.get(index)
    }

    /// Number of non-sentinel slots.
    pub fn count(&self) -> usize {
        self.slots.iter().filter(|d| !d.is_none()).count()
    }

    pub fn as_slice(&self) -> &[Detection] {
        &self.slots
    }

    pub fn live(&self) -> impl Iterator<Item = &Detection> {
        self.slots.iter().filter(|d| !d.is_none())
    }

    pub fn copy_from(&mut self, other: &DetectionSet) {
        for (slot, value) in self.slots.iter_mut().zip(other.slots.iter().copied().chain(
            std::iter::repeat(Detection::NONE),
        )) {
            *slot = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_stops_at_capacity() {
        let mut set = DetectionSet::with_capacity(2);
        assert!(set.push(Detection::new(1.0, 10)));
        assert!(set.push(Detection::new(2.0, 10)));
        assert!(!set.push(Detection::new(3.0, 10)));
        assert_eq!(set.count(), 2);
    }

    #[test]
    fn clear_restores_sentinels() {
        let mut set = DetectionSet::with_capacity(3);
        set.push(Detection::new(4.0, 1));
        set.clear();
        assert!(set.as_slice().iter().all(Detection::is_none));
        assert!(!set.set(3, Detection::new(1.0, 1)));
    }

    #[test]
    fn copy_from_pads_with_sentinel() {
        let mut small = DetectionSet::with_capacity(1);
        small.push(Detection::new(7.0, 3));
        let mut large = DetectionSet::with_capacity(3);
        large.push(Detection::new(1.0, 1));
        large.push(Detection::new(2.0, 1));
        large.copy_from(&small);
        assert_eq!(large.count(), 1);
        assert_eq!(large.get(0).map(|d| d.distance), Some(7.0));
    }
}
