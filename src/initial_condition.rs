use crate::math::{index_to_coord, T, TV, UV};
use crate::mpm::particles::MpmParticles;
use crate::util::RangeExt;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Something that can seed an instance with undeformed particles (`C = 0`, `F = I`).
pub trait InitialCondition<const D: usize> {
    fn add_particles(&self, particles: &mut MpmParticles<D>);
}

/// A jittered lattice of particles filling an axis-aligned box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block<const D: usize> {
    pub size: Range<TV<D>>,
    pub spacing: T,
    /// Every particle is displaced by up to `jitter / 2` along each axis.
    pub jitter: T,
    pub velocity: TV<D>,
}

impl<const D: usize> Default for Block<D> {
    fn default() -> Self {
        Block {
            size: TV::from_element(0.3)..TV::from_element(0.6),
            spacing: 0.02,
            jitter: 0.02 / 8.,
            velocity: TV::zeros(),
        }
    }
}

impl<const D: usize> InitialCondition<D> for Block<D> {
    fn add_particles(&self, particles: &mut MpmParticles<D>) {
        let mut rng = StdRng::from_seed([0; 32]);

        let min = self.size.start;
        let counts: UV<D> = (self.size.size() / self.spacing).map(|x| x.ceil().max(0.) as usize);
        let total: usize = counts.iter().product();

        for i in 0..total {
            let idx = index_to_coord(i, &counts);
            let pos = idx.map(|i| i as T) * self.spacing + min;

            let rand = TV::<D>::from_fn(|_, _| rng.gen::<T>());
            let jitter = (rand - TV::from_element(0.5)) * self.jitter;

            particles.add_particle(pos + jitter, self.velocity);
        }
    }
}

/// Particles sampled uniformly inside a ball, by rejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sphere<const D: usize> {
    pub num_particles: usize,
    pub center: TV<D>,
    pub radius: T,
    pub velocity: TV<D>,
}

impl<const D: usize> Default for Sphere<D> {
    fn default() -> Self {
        Sphere {
            num_particles: 5000,
            center: TV::from_element(0.5),
            radius: 0.25,
            velocity: TV::zeros(),
        }
    }
}

impl<const D: usize> InitialCondition<D> for Sphere<D> {
    fn add_particles(&self, particles: &mut MpmParticles<D>) {
        let mut rng = StdRng::from_seed([0; 32]);

        for _ in 0..self.num_particles {
            let pos = loop {
                let rand = TV::<D>::from_fn(|_, _| rng.gen::<T>());
                let pos = rand * 2. - TV::from_element(1.);

                if pos.magnitude_squared() < 1. {
                    break pos * self.radius + self.center;
                }
            };

            particles.add_particle(pos, self.velocity);
        }
    }
}
