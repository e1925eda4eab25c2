//! Point-update, range-minimum tree over `f64` values.

/// Iterative segment tree answering half-open range minima.
#[derive(Debug, Clone)]
pub struct MinSegmentTree {
    size: usize,
    tree: Vec<f64>,
}

impl MinSegmentTree {
    /// A tree of `len` slots, all holding `f64::INFINITY`.
    #[must_use]
    pub fn new(len: usize) -> Self {
        let size = len.max(1);
        Self {
            size,
            tree: vec![f64::INFINITY; 2 * size],
        }
    }

    /// Number of slots.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.size
    }

    /// Whether the tree has no slots. Always false; kept for symmetry with `len`.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    fn at(&self, position: usize) -> f64 {
        self.tree.get(position).copied().unwrap_or(f64::INFINITY)
    }

    /// Overwrite slot `index` with `value`.
    pub fn update(&mut self, index: usize, value: f64) {
        let mut position = index + self.size;
        let Some(slot) = self.tree.get_mut(position) else {
            return;
        };
        *slot = value;
        while position > 1 {
            position >>= 1;
            let min = self.at(2 * position).min(self.at(2 * position + 1));
            if let Some(parent) = self.tree.get_mut(position) {
                *parent = min;
            }
        }
    }

    /// Minimum over slots `from..to`, or infinity for an empty range.
    #[must_use]
    pub fn query(&self, from: usize, to: usize) -> f64 {
        let mut result = f64::INFINITY;
        let mut left = from.min(self.size) + self.size;
        let mut right = to.min(self.size) + self.size;
        while left < right {
            if left & 1 == 1 {
                result = result.min(self.at(left));
                left += 1;
            }
            if right & 1 == 1 {
                right -= 1;
                result = result.min(self.at(right));
            }
            left >>= 1;
            right >>= 1;
        }
        result
    }
}
