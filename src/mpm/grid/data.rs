use crate::math::{coord_to_index, index_to_coord, T, TV, UV};

/// Stores the metadata associated with the `MpmGrid`
#[derive(Debug, Clone, PartialEq)]
pub struct GridData<const D: usize> {
    /// The total number of cells in the grid
    pub num_cells: usize,
    /// The number of nodes in each direction
    pub size: UV<D>,
    /// The grid spacing
    pub h: T,
    /// Reciprocal of the grid spacing, for efficient computation
    pub one_over_h: T,
}

impl<const D: usize> GridData<D> {
    /// Creates a grid with `size` nodes per axis. The domain spanned by the nodes starts at the
    /// origin and ends at `(size - 1) * h`.
    pub fn new(h: T, size: UV<D>) -> GridData<D> {
        GridData {
            num_cells: size.iter().product(),
            size,
            h,
            one_over_h: 1. / h,
        }
    }

    pub fn coord_to_pos(&self, coord: &UV<D>) -> TV<D> {
        coord.map(|i| i as T) * self.h
    }

    pub fn coord_to_index(&self, coord: &UV<D>) -> usize {
        coord_to_index(coord, &self.size)
    }

    pub fn index_to_coord(&self, i: usize) -> UV<D> {
        index_to_coord(i, &self.size)
    }

    pub fn coord_in_grid(&self, coord: &UV<D>) -> bool {
        (0..D).all(|d| coord[d] < self.size[d])
    }

    /// The position of the last node along each axis.
    pub fn upper_bound(&self) -> TV<D> {
        self.coord_to_pos(&self.size.map(|n| n - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_positions() {
        let grid = GridData::new(0.5, UV::<2>::new(4, 3));
        assert_eq!(grid.num_cells, 12);
        assert_eq!(grid.coord_to_pos(&UV::<2>::new(2, 1)), TV::<2>::new(1., 0.5));
        assert_eq!(grid.upper_bound(), TV::<2>::new(1.5, 1.));
        assert!(grid.coord_in_grid(&UV::<2>::new(3, 2)));
        assert!(!grid.coord_in_grid(&UV::<2>::new(3, 3)));
    }
}
