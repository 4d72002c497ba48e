//! Stochastic pixel noise.
//!
//! Provides the four noise models used for robustness sweeps:
//! - Additive Gaussian noise with a fixed standard deviation
//! - Salt-and-pepper impulses driven by a single uniform draw per pixel
//! - Poisson (shot-like) noise scaled by an intensity factor
//! - Multiplicative speckle noise
//!
//! # Randomness
//!
//! Every function takes an explicit random source. Noise fields are filled
//! in parallel over row chunks; the chunk generators are seeded from one
//! `u64` drawn from the caller's source, so a pinned caller seed gives the
//! same output regardless of how rayon schedules the chunks.

use ndarray::{Array3, ArrayViewMut3, Axis};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal, Poisson, StandardNormal};
use rayon::prelude::*;

use crate::error::{DegradeError, Result};
use crate::frame::{Frame, MAX_CODE};

/// Rows handed to each parallel worker.
const CHUNK_ROWS: usize = 64;

/// Build a portable seeded generator, or a randomly seeded one.
pub fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed.unwrap_or(rand::rng().next_u64()))
}

/// Process an `(height, width, channel)` array in parallel row chunks with
/// deterministic seeding.
///
/// Each chunk gets its own generator seeded from `seed` plus the chunk
/// index, so results do not depend on thread scheduling.
///
/// # Arguments
/// * `array` - The array to process
/// * `seed` - Base seed for the chunk generators
/// * `chunk_rows` - Optional rows per chunk. Defaults to 64 if None.
/// * `processor` - Closure that processes each chunk with its own generator
///
/// # Returns
/// The processed array
pub fn process_rows_in_parallel<F>(
    mut array: Array3<f64>,
    seed: u64,
    chunk_rows: Option<usize>,
    processor: F,
) -> Array3<f64>
where
    F: Fn(&mut ArrayViewMut3<f64>, &mut ChaCha8Rng) + Send + Sync,
{
    let chunk_rows = chunk_rows.unwrap_or(CHUNK_ROWS).max(1);

    array
        .axis_chunks_iter_mut(Axis(0), chunk_rows)
        .into_par_iter()
        .enumerate()
        .for_each(|(chunk_idx, mut chunk)| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(chunk_idx as u64));
            processor(&mut chunk, &mut rng);
        });

    array
}

/// Add zero-mean Gaussian noise with standard deviation `sigma` (code
/// units). A non-positive sigma returns the input unchanged.
pub fn add_gaussian_noise<R>(frame: &Frame, sigma: f64, rng: &mut R) -> Result<Frame>
where
    R: RngCore + ?Sized,
{
    if sigma <= 0.0 {
        return Ok(frame.clone());
    }
    let normal = Normal::new(0.0, sigma)
        .map_err(|_| DegradeError::out_of_range("sigma", sigma, 0.0, f64::MAX))?;

    let noisy = process_rows_in_parallel(frame.to_f64(), rng.next_u64(), None, |chunk, rng| {
        chunk
            .iter_mut()
            .for_each(|v| *v += normal.sample(rng));
    });
    Ok(Frame::quantize(&noisy))
}

/// Salt-and-pepper noise.
///
/// One uniform `u` is drawn per pixel: `u < fraction` turns the pixel white,
/// `u > 1 - fraction` turns it black. Each side affects about `fraction` of
/// the pixels.
pub fn add_salt_pepper_noise<R>(frame: &Frame, fraction: f64, rng: &mut R) -> Result<Frame>
where
    R: RngCore + ?Sized,
{
    if !(0.0..=0.5).contains(&fraction) {
        return Err(DegradeError::out_of_range("fraction", fraction, 0.0, 0.5));
    }
    if fraction == 0.0 {
        return Ok(frame.clone());
    }

    let noisy = process_rows_in_parallel(frame.to_f64(), rng.next_u64(), None, |chunk, rng| {
        for mut row in chunk.outer_iter_mut() {
            for mut pixel in row.outer_iter_mut() {
                let u: f64 = rng.random();
                if u < fraction {
                    pixel.fill(MAX_CODE);
                } else if u > 1.0 - fraction {
                    pixel.fill(0.0);
                }
            }
        }
    });
    Ok(Frame::quantize(&noisy))
}

/// Poisson noise: each value `v` becomes `Poisson(v * k) / k` with
/// `k = intensity * 0.1`.
///
/// Zero intensity returns the input, and zero-valued samples stay zero.
pub fn add_poisson_noise<R>(frame: &Frame, intensity: f64, rng: &mut R) -> Result<Frame>
where
    R: RngCore + ?Sized,
{
    if intensity.is_nan() || intensity < 0.0 {
        return Err(DegradeError::out_of_range(
            "intensity",
            intensity,
            0.0,
            f64::MAX,
        ));
    }
    if intensity == 0.0 {
        return Ok(frame.clone());
    }
    let k = intensity * 0.1;

    let noisy = process_rows_in_parallel(frame.to_f64(), rng.next_u64(), None, |chunk, rng| {
        chunk.iter_mut().for_each(|v| {
            let lambda = *v * k;
            *v = if lambda <= 0.0 {
                0.0
            } else {
                match Poisson::new(lambda) {
                    Ok(poisson) => poisson.sample(rng) / k,
                    Err(_) => *v,
                }
            };
        });
    });
    Ok(Frame::quantize(&noisy))
}

/// Multiplicative speckle: `v + v * n * sigma / 100`, `n ~ N(0, 1)`.
pub fn add_speckle_noise<R>(frame: &Frame, sigma: f64, rng: &mut R) -> Result<Frame>
where
    R: RngCore + ?Sized,
{
    if sigma.is_nan() || sigma < 0.0 {
        return Err(DegradeError::out_of_range("sigma", sigma, 0.0, f64::MAX));
    }
    if sigma == 0.0 {
        return Ok(frame.clone());
    }

    let noisy = process_rows_in_parallel(frame.to_f64(), rng.next_u64(), None, |chunk, rng| {
        chunk.iter_mut().for_each(|v| {
            let n: f64 = StandardNormal.sample(rng);
            *v += *v * n * sigma / 100.0;
        });
    });
    Ok(Frame::quantize(&noisy))
}
