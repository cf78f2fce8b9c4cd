use std::ops::{Index, IndexMut};

use glam::{Vec2, Vec3};
use num_complex::Complex32;
use rayon::prelude::*;

use crate::error::{OceanError, Result};

/// Square, row-major N x N buffer. Texel `(x, z)` lives at `z * N + x`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    size: usize,
    data: Vec<T>,
}

impl<T: Clone> Grid<T> {
    /// Allocate a grid filled with `value`, reporting allocation failure instead of aborting.
    pub fn new(size: usize, value: T) -> Result<Self> {
        let len = size
            .checked_mul(size)
            .ok_or(OceanError::ResourceExhaustion { bytes: usize::MAX })?;

        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| OceanError::ResourceExhaustion {
            bytes: len.saturating_mul(std::mem::size_of::<T>()),
        })?;
        data.resize(len, value);

        Ok(Self { size, data })
    }
}

impl<T: Clone + Default + Send> Grid<T> {
    /// Build a grid row by row in parallel from a per-texel function.
    pub fn from_fn<F>(size: usize, f: F) -> Result<Self>
    where
        F: Fn(usize, usize) -> T + Sync,
    {
        let mut grid = Self::new(size, T::default())?;
        grid.par_rows_mut().enumerate().for_each(|(z, row)| {
            for (x, texel) in row.iter_mut().enumerate() {
                *texel = f(x, z);
            }
        });
        Ok(grid)
    }
}

impl<T> Grid<T> {
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn get(&self, x: usize, z: usize) -> Option<&T> {
        if x < self.size && z < self.size {
            self.data.get(z * self.size + x)
        } else {
            None
        }
    }

    /// Texel with both coordinates wrapped onto the tile.
    pub fn wrapped(&self, x: isize, z: isize) -> &T {
        let n = self.size as isize;
        let x = x.rem_euclid(n) as usize;
        let z = z.rem_euclid(n) as usize;
        &self.data[z * self.size + x]
    }

    /// Coordinates of the point reflection `(-x, -z)` modulo N.
    pub fn mirror(&self, x: usize, z: usize) -> (usize, usize) {
        ((self.size - x) % self.size, (self.size - z) % self.size)
    }

    pub fn par_rows_mut(&mut self) -> rayon::slice::ChunksExactMut<'_, T>
    where
        T: Send,
    {
        self.data.par_chunks_exact_mut(self.size)
    }

    /// Write the transpose of `self` into `out`, which must have the same size.
    pub fn transpose_into(&self, out: &mut Grid<T>)
    where
        T: Copy + Send + Sync,
    {
        debug_assert_eq!(self.size, out.size);
        let n = self.size;
        let src = &self.data;
        out.par_rows_mut().enumerate().for_each(|(z, row)| {
            for (x, texel) in row.iter_mut().enumerate() {
                *texel = src[x * n + z];
            }
        });
    }
}

impl<T> Index<(usize, usize)> for Grid<T> {
    type Output = T;

    fn index(&self, (x, z): (usize, usize)) -> &T {
        &self.data[z * self.size + x]
    }
}

impl<T> IndexMut<(usize, usize)> for Grid<T> {
    fn index_mut(&mut self, (x, z): (usize, usize)) -> &mut T {
        &mut self.data[z * self.size + x]
    }
}

/// Values that can be checked for NaN / infinity
pub trait Finite {
    fn is_finite_value(&self) -> bool;
}

impl Finite for f32 {
    fn is_finite_value(&self) -> bool {
        self.is_finite()
    }
}

impl Finite for Complex32 {
    fn is_finite_value(&self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }
}

impl Finite for Vec2 {
    fn is_finite_value(&self) -> bool {
        self.is_finite()
    }
}

impl Finite for Vec3 {
    fn is_finite_value(&self) -> bool {
        self.is_finite()
    }
}

impl<T: Finite + Sync> Grid<T> {
    /// First texel (in row-major order) holding a NaN or infinity.
    pub fn first_non_finite(&self) -> Option<(usize, usize)> {
        self.data
            .par_iter()
            .position_first(|v| !v.is_finite_value())
            .map(|i| (i % self.size, i / self.size))
    }
}
