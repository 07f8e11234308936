use crate::sensor_interface::DetectionSet;

/// Per-channel ring of the last `historicSize` detection sets.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionHistory {
    frames: Vec<DetectionSet>,
    index: usize,
    recorded: usize,
}

impl DetectionHistory {
    pub fn new(historic_size: usize, max_detections: usize) -> Self {
        Self {
            frames: vec![DetectionSet::with_capacity(max_detections); historic_size.max(1)],
            index: 0,
            recorded: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Slot that the next `record` writes.
    pub fn history_index(&self) -> usize {
        self.index
    }

    pub fn frames_recorded(&self) -> usize {
        self.recorded
    }

    /// Stores one frame's detections and advances the ring.
    pub fn record(&mut self, detections: &DetectionSet) {
        self.frames[self.index].copy_from(detections);
        self.index = (self.index + 1) % self.frames.len();
        self.recorded += 1;
    }

    /// `age == 0` is the most recent frame.
    pub fn frame_back(&self, age: usize) -> Option<&DetectionSet> {
        if age >= self.frames.len() {
            return None;
        }
        let depth = self.frames.len();
        self.frames.get((self.index + depth - 1 - age) % depth)
    }

    pub fn clear(&mut self) {
        self.frames.iter_mut().for_each(DetectionSet::clear);
        self.index = 0;
        self.recorded = 0;
    }
}
