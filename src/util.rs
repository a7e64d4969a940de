use crate::math::TV;
use std::ops::Range;

/// `n` evenly spaced values from `start` to `end`, both inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> impl Iterator<Item = f64> {
    let step = if n > 1 {
        (end - start) / (n - 1) as f64
    } else {
        0.
    };
    (0..n).map(move |i| start + step * i as f64)
}

pub trait RangeExt<const D: usize> {
    fn size(&self) -> TV<D>;

    fn center(&self) -> TV<D>;

    fn contains_point(&self, x: &TV<D>) -> bool;
}

impl<const D: usize> RangeExt<D> for Range<TV<D>> {
    fn size(&self) -> TV<D> {
        self.end - self.start
    }

    fn center(&self) -> TV<D> {
        0.5 * (self.start + self.end)
    }

    /// Note that this does _not_ treat the range as exclusive, and returns true at `self.end`.
    fn contains_point(&self, x: &TV<D>) -> bool {
        (0..D).all(|d| self.start[d] <= x[d] && x[d] <= self.end[d])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace() {
        let xs = linspace(-1., 1., 5).collect::<Vec<_>>();
        assert_eq!(xs, vec![-1., -0.5, 0., 0.5, 1.]);
        assert_eq!(linspace(3., 4., 1).collect::<Vec<_>>(), vec![3.]);
        assert_eq!(linspace(3., 4., 0).count(), 0);
    }

    #[test]
    fn test_range_ext() {
        let range = TV::<2>::new(0., 1.)..TV::<2>::new(2., 2.);
        assert_eq!(range.size(), TV::<2>::new(2., 1.));
        assert_eq!(range.center(), TV::<2>::new(1., 1.5));
        assert!(range.contains_point(&TV::<2>::new(2., 1.)));
        assert!(!range.contains_point(&TV::<2>::new(0.5, 0.5)));
    }
}
