// Fixed-window filters for the sensor front-ends: a median stage for
// outlier rejection and a mean stage for smoothing.

use heapless::Vec;

/// Sliding median over the last `N` samples.
///
/// The window fills on the first `N` pushes; until then the median is
/// computed over the partial window, so early reads are usable but noisier.
pub struct MedianFilter<T, const N: usize> {
    window: Vec<T, N>,
}

impl<T: Copy + Ord, const N: usize> MedianFilter<T, N> {
    pub fn new() -> Self {
        Self { window: Vec::new() }
    }

    pub fn push(&mut self, value: T) {
        if self.window.push(value).is_err() {
            self.window.remove(0);
            let _ = self.window.push(value);
        }
    }

    /// Middle value of the sorted window, `None` before the first push.
    pub fn filtered(&self) -> Option<T> {
        if self.window.is_empty() {
            return None;
        }
        let mut sorted = self.window.clone();
        sorted.sort_unstable();
        Some(sorted[sorted.len() / 2])
    }

    pub fn is_warmed_up(&self) -> bool {
        self.window.is_full()
    }
}

impl<T: Copy + Ord, const N: usize> Default for MedianFilter<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Sliding arithmetic mean over the last `N` samples.
pub struct MeanFilter<const N: usize> {
    window: Vec<u32, N>,
}

impl<const N: usize> MeanFilter<N> {
    pub fn new() -> Self {
        Self { window: Vec::new() }
    }

    pub fn push(&mut self, value: u32) {
        if self.window.push(value).is_err() {
            self.window.remove(0);
            let _ = self.window.push(value);
        }
    }

    /// Average of the current window, `None` before the first push.
    pub fn filtered(&self) -> Option<u32> {
        if self.window.is_empty() {
            return None;
        }
        let sum: u64 = self.window.iter().map(|&v| u64::from(v)).sum();
        Some((sum / self.window.len() as u64) as u32)
    }

    pub fn is_warmed_up(&self) -> bool {
        self.window.is_full()
    }
}

impl<const N: usize> Default for MeanFilter<N> {
    fn default() -> Self {
        Self::new()
    }
}
