use chrono::{DateTime, Utc};

use crate::queue::Sample;

/// The retained history the detector runs over.
///
/// Grows one sample at a time and only shrinks from the front through
/// [`Window::trim`].
#[derive(Debug, Default)]
pub struct Window {
    samples: Vec<Sample>,
}

impl Window {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Split into the value sequence and the parallel timestamp sequence.
    pub fn split(&self) -> (Vec<f64>, Vec<DateTime<Utc>>) {
        self.samples
            .iter()
            .map(|s| (s.value(), s.timestamp()))
            .unzip()
    }

    /// Drop history according to the change points found in this window and
    /// return the index the retained part starts at.
    pub fn trim(&mut self, change_points: &[usize]) -> usize {
        let start = trim_start(self.samples.len(), change_points);
        self.samples.drain(..start);
        start
    }
}

/// Where the retained window starts after a detection pass.
///
/// Without change points the back half is kept, starting at
/// `(len - 1) / 2`. Otherwise the window restarts at the last change point.
pub fn trim_start(len: usize, change_points: &[usize]) -> usize {
    match change_points.last() {
        Some(&last) => last.min(len.saturating_sub(1)),
        None => len.saturating_sub(1) / 2,
    }
}
