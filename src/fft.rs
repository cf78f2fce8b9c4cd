//! Separable 2D FFT built from radix-2 butterflies.
//!
//! The inverse transform uses `e^{+i}` and is unnormalized, so a spectrum of
//! physical wave amplitudes sums directly into heights. The forward transform
//! uses `e^{-i}` and carries the `1/N^2` factor, making forward-then-inverse an
//! identity.

use num_complex::Complex32;
use rayon::prelude::*;
use std::f64::consts::PI;

use crate::error::{OceanError, Result};
use crate::grid::Grid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Inverse,
}

/// One half of the separable 2D transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Horizontal,
    Vertical,
}

/// Precomputed twiddles and bit-reversal table for one transform length
#[derive(Debug, Clone)]
pub struct FftPlan {
    size: usize,
    stages: u32,
    twiddles: Vec<Complex32>, // e^{-2 pi i j / N}, j < N/2
    bit_reverse: Vec<usize>,
}

impl FftPlan {
    pub fn new(size: usize) -> Result<Self> {
        if size < 2 || !size.is_power_of_two() {
            return Err(OceanError::config(
                "resolution",
                format!("FFT length must be a power of two >= 2, got {size}"),
            ));
        }
        let stages = size.trailing_zeros();

        // Twiddles evaluated in f64 then rounded once
        let twiddles = (0..size / 2)
            .map(|j| {
                let angle = -2.0 * PI * j as f64 / size as f64;
                let (s, c) = angle.sin_cos();
                Complex32::new(c as f32, s as f32)
            })
            .collect();

        let bit_reverse = (0..size)
            .map(|i| i.reverse_bits() >> (usize::BITS - stages))
            .collect();

        Ok(Self {
            size,
            stages,
            twiddles,
            bit_reverse,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of butterfly stages, log2(N)
    pub fn stages(&self) -> u32 {
        self.stages
    }

    /// In-place unnormalized 1D transform of `data`, whose length must equal the plan size.
    pub fn process(&self, data: &mut [Complex32], direction: Direction) {
        let n = self.size;
        debug_assert_eq!(data.len(), n);

        for (i, &j) in self.bit_reverse.iter().enumerate() {
            if i < j {
                data.swap(i, j);
            }
        }

        let mut half = 1;
        while half < n {
            let len = half * 2;
            let stride = n / len;
            for start in (0..n).step_by(len) {
                for k in 0..half {
                    let twiddle = match direction {
                        Direction::Forward => self.twiddles[k * stride],
                        Direction::Inverse => self.twiddles[k * stride].conj(),
                    };
                    let a = data[start + k];
                    let b = data[start + k + half] * twiddle;
                    data[start + k] = a + b;
                    data[start + k + half] = a - b;
                }
            }
            half = len;
        }
    }
}

/// 2D transform over N x N grids, owning the transpose buffer used by the vertical pass
#[derive(Debug, Clone)]
pub struct Fft2d {
    plan: FftPlan,
    scratch: Grid<Complex32>,
}

impl Fft2d {
    pub fn new(size: usize) -> Result<Self> {
        let plan = FftPlan::new(size)?;
        let scratch = Grid::new(size, Complex32::new(0.0, 0.0))?;
        Ok(Self { plan, scratch })
    }

    pub fn size(&self) -> usize {
        self.plan.size()
    }

    /// Transform every row (horizontal) or every column (vertical) of `grid`.
    ///
    /// Rows, and columns, are independent and run in parallel.
    pub fn run_pass(&mut self, grid: &mut Grid<Complex32>, pass: Pass, direction: Direction) {
        let plan = &self.plan;
        match pass {
            Pass::Horizontal => {
                grid.par_rows_mut().for_each(|row| plan.process(row, direction));
            }
            Pass::Vertical => {
                grid.transpose_into(&mut self.scratch);
                self.scratch
                    .par_rows_mut()
                    .for_each(|column| plan.process(column, direction));
                self.scratch.transpose_into(grid);
            }
        }
    }

    /// Frequency to spatial domain: sum_k F(k) e^{+i 2 pi k x / N}, unnormalized.
    pub fn inverse(&mut self, grid: &mut Grid<Complex32>) -> Result<()> {
        self.check_size(grid)?;
        self.run_pass(grid, Pass::Horizontal, Direction::Inverse);
        self.run_pass(grid, Pass::Vertical, Direction::Inverse);
        Ok(())
    }

    /// Spatial to frequency domain, scaled by 1/N^2.
    pub fn forward(&mut self, grid: &mut Grid<Complex32>) -> Result<()> {
        self.check_size(grid)?;
        self.run_pass(grid, Pass::Horizontal, Direction::Forward);
        self.run_pass(grid, Pass::Vertical, Direction::Forward);

        let scale = 1.0 / (self.size() * self.size()) as f32;
        grid.as_mut_slice().par_iter_mut().for_each(|c| *c *= scale);
        Ok(())
    }

    fn check_size(&self, grid: &Grid<Complex32>) -> Result<()> {
        if grid.size() != self.size() {
            return Err(OceanError::config(
                "resolution",
                format!("grid is {0}x{0} but the FFT was planned for {1}x{1}", grid.size(), self.size()),
            ));
        }
        Ok(())
    }
}
