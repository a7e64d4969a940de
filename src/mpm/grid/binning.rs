/// Particles grouped by the grid node their stencil starts at.
///
/// Built with a stable counting sort: count the particles of every node, turn the counts into
/// offsets with an exclusive prefix sum, then scatter the particle indices. Within a bin,
/// particles keep their original (ascending) order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleBins {
    /// `cell_start[i]..cell_start[i + 1]` is the range of `order` holding the particles of node `i`.
    cell_start: Vec<usize>,
    /// Particle indices, sorted by bin.
    order: Vec<usize>,
}

impl ParticleBins {
    /// Sorts the particles into `num_cells` bins. `keys[p]` is the bin of particle `p`, and must
    /// be less than `num_cells`.
    pub fn new(keys: &[usize], num_cells: usize) -> Self {
        let mut cell_start = vec![0; num_cells + 1];
        for &key in keys {
            cell_start[key + 1] += 1;
        }
        for i in 0..num_cells {
            cell_start[i + 1] += cell_start[i];
        }

        let mut next = cell_start.clone();
        let mut order = vec![0; keys.len()];
        for (p, &key) in keys.iter().enumerate() {
            order[next[key]] = p;
            next[key] += 1;
        }

        ParticleBins { cell_start, order }
    }

    pub fn num_cells(&self) -> usize {
        self.cell_start.len() - 1
    }

    /// The particles in the bin of node `cell`, in ascending order.
    pub fn particles(&self, cell: usize) -> &[usize] {
        &self.order[self.cell_start[cell]..self.cell_start[cell + 1]]
    }
}
