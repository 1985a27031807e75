//! Rolling landmark window with recency-weighted averaging.
//!
//! Damps frame-to-frame jitter before classification. Frames are kept in
//! arrival order; once full, the oldest frame is evicted on every push.

use std::collections::VecDeque;

use crate::types::Landmark;

pub const DEFAULT_CAPACITY: usize = 10;
pub const DEFAULT_MIN_FRAMES: usize = 3;
pub const DEFAULT_VISIBILITY_GATE: f32 = 0.2;

/// Bounded FIFO of recent landmark frames.
#[derive(Debug, Clone)]
pub struct SmoothingBuffer {
    frames: VecDeque<Vec<Landmark>>,
    capacity: usize,
    min_frames: usize,
    visibility_gate: f32,
}

impl Default for SmoothingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_MIN_FRAMES, DEFAULT_VISIBILITY_GATE)
    }
}

impl SmoothingBuffer {
    /// `capacity` and `min_frames` are raised to at least 1.
    pub fn new(capacity: usize, min_frames: usize, visibility_gate: f32) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity + 1),
            capacity,
            min_frames: min_frames.max(1),
            visibility_gate,
        }
    }

    pub fn push(&mut self, frame: Vec<Landmark>) {
        self.frames.push_back(frame);
        while self.frames.len() > self.capacity {
            self.frames.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True once enough history is buffered for [`average`](Self::average).
    pub fn is_ready(&self) -> bool {
        self.frames.len() >= self.min_frames
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Iterate buffered frames from oldest to newest.
    pub fn frames(&self) -> impl Iterator<Item = &[Landmark]> {
        self.frames.iter().map(|f| f.as_slice())
    }

    /// Recency-weighted average frame, or `None` while history is insufficient.
    ///
    /// The frame at position `i` (0 = oldest) carries weight `(i + 1) / len`.
    /// Samples at or below the visibility gate are excluded outright; an index
    /// with no surviving sample averages to `{0, 0, 0, 0}`. The output length
    /// follows the newest frame.
    pub fn average(&self) -> Option<Vec<Landmark>> {
        if !self.is_ready() {
            return None;
        }
        let newest = self.frames.back()?;
        let len = self.frames.len() as f32;

        let averaged = (0..newest.len())
            .map(|idx| {
                let mut sum = Landmark::default();
                let mut weight_sum = 0.0f32;

                for (i, frame) in self.frames.iter().enumerate() {
                    let Some(lm) = frame.get(idx) else {
                        continue;
                    };
                    if lm.visibility <= self.visibility_gate {
                        continue;
                    }
                    let w = (i + 1) as f32 / len;
                    sum.x += lm.x * w;
                    sum.y += lm.y * w;
                    sum.z += lm.z * w;
                    sum.visibility += lm.visibility * w;
                    weight_sum += w;
                }

                if weight_sum > 0.0 {
                    Landmark::new(
                        sum.x / weight_sum,
                        sum.y / weight_sum,
                        sum.z / weight_sum,
                        sum.visibility / weight_sum,
                    )
                } else {
                    Landmark::default()
                }
            })
            .collect();

        Some(averaged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_at(x: f32, visibility: f32) -> Vec<Landmark> {
        vec![Landmark::new(x, x * 2.0, 0.0, visibility); 2]
    }

    #[test]
    fn test_no_average_before_three_frames() {
        let mut buf = SmoothingBuffer::default();
        assert!(buf.average().is_none());
        buf.push(frame_at(0.1, 1.0));
        buf.push(frame_at(0.2, 1.0));
        assert!(buf.average().is_none(), "two frames must not produce output");
        buf.push(frame_at(0.3, 1.0));
        assert!(buf.average().is_some());
    }

    #[test]
    fn test_capacity_evicts_oldest_first() {
        let mut buf = SmoothingBuffer::default();
        for i in 0..11 {
            buf.push(frame_at(i as f32, 1.0));
        }
        assert_eq!(buf.len(), 10);
        let first = buf.frames().next().unwrap();
        assert_eq!(first[0].x, 1.0, "frame 0 should have been evicted");
    }

    #[test]
    fn test_recency_weighting() {
        let mut buf = SmoothingBuffer::default();
        buf.push(frame_at(0.0, 1.0));
        buf.push(frame_at(0.0, 1.0));
        buf.push(frame_at(3.0, 1.0));
        // weights 1/3, 2/3, 3/3 -> (3 * 1) / (6/3) = 1.5
        let avg = buf.average().unwrap();
        assert!((avg[0].x - 1.5).abs() < 1e-5, "x = {}", avg[0].x);
        assert!((avg[0].y - 3.0).abs() < 1e-5, "y = {}", avg[0].y);
        assert!((avg[0].visibility - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_low_visibility_samples_excluded() {
        let mut buf = SmoothingBuffer::default();
        buf.push(frame_at(0.5, 0.9));
        buf.push(frame_at(100.0, 0.2));
        buf.push(frame_at(0.5, 0.9));
        let avg = buf.average().unwrap();
        assert!(
            (avg[0].x - 0.5).abs() < 1e-5,
            "gated sample leaked into average: {}",
            avg[0].x
        );
        assert!((avg[0].visibility - 0.9).abs() < 1e-5);
    }

    #[test]
    fn test_all_samples_gated_yields_zero_point() {
        let mut buf = SmoothingBuffer::default();
        for _ in 0..3 {
            buf.push(frame_at(0.7, 0.1));
        }
        let avg = buf.average().unwrap();
        assert_eq!(avg[0], Landmark::default());
    }

    #[test]
    fn test_output_length_follows_newest_frame() {
        let mut buf = SmoothingBuffer::default();
        buf.push(vec![Landmark::new(1.0, 1.0, 1.0, 1.0)]);
        buf.push(vec![Landmark::new(1.0, 1.0, 1.0, 1.0)]);
        buf.push(vec![Landmark::new(1.0, 1.0, 1.0, 1.0); 3]);
        let avg = buf.average().unwrap();
        assert_eq!(avg.len(), 3);
        assert!((avg[2].x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_clear_resets_history() {
        let mut buf = SmoothingBuffer::default();
        for _ in 0..5 {
            buf.push(frame_at(0.1, 1.0));
        }
        buf.clear();
        assert!(buf.is_empty());
        assert!(!buf.is_ready());
    }
}
