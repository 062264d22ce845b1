//! Sample-rate conversion by Kaiser-windowed sinc interpolation.

use crate::error::{AnalysisError, Result};

/// Number of sinc zero-crossings on each side of the kernel centre.
const SINC_LOBES: usize = 8;

/// Kaiser beta: ~60 dB stopband attenuation, plenty for pitch estimation.
const KAISER_BETA: f64 = 6.0;

/// Kernel table entries per input sample of distance.
const TABLE_OVERSAMPLING: usize = 512;

/// Resample `input` from `from_rate` to `to_rate`.
///
/// When downsampling, the sinc kernel is stretched so its cutoff sits at the
/// target Nyquist frequency; this keeps energy above 4 kHz from folding back
/// into the pitch range when going to 8 kHz.
pub fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == 0 || to_rate == 0 {
        return Err(AnalysisError::InvalidParameter(format!(
            "cannot resample from {from_rate} Hz to {to_rate} Hz"
        )));
    }
    if input.is_empty() {
        return Ok(Vec::new());
    }
    if from_rate == to_rate {
        return Ok(input.to_vec());
    }

    let step = from_rate as f64 / to_rate as f64;
    let output_len = ((input.len() as u64 * to_rate as u64).div_ceil(from_rate as u64)) as usize;

    // Cutoff relative to the input Nyquist (1.0 = no band limiting).
    let cutoff = (to_rate as f64 / from_rate as f64).min(1.0);
    let half_width = (SINC_LOBES as f64 / cutoff).ceil() as isize;
    let kernel = KernelTable::new(cutoff, half_width as usize);

    let mut output = Vec::with_capacity(output_len);
    for i in 0..output_len {
        let pos = i as f64 * step;
        let center = pos.floor() as isize;

        let mut acc = 0.0f64;
        let mut weight_sum = 0.0f64;

        let lo = (center - half_width + 1).max(0);
        let hi = (center + half_width).min(input.len() as isize - 1);
        for idx in lo..=hi {
            let w = kernel.at(pos - idx as f64);
            acc += input[idx as usize] as f64 * w;
            weight_sum += w;
        }

        // Normalize to preserve DC gain
        if weight_sum.abs() > 1e-10 {
            acc /= weight_sum;
        }
        output.push(acc as f32);
    }

    Ok(output)
}

/// Windowed-sinc kernel sampled once per call and linearly interpolated,
/// so no Bessel or sine evaluation happens per tap.
struct KernelTable {
    values: Vec<f64>,
}

impl KernelTable {
    fn new(cutoff: f64, half_width: usize) -> Self {
        let len = half_width * TABLE_OVERSAMPLING + 1;
        let values = (0..len)
            .map(|j| kaiser_sinc(j as f64 / TABLE_OVERSAMPLING as f64, cutoff, half_width))
            .collect();
        Self { values }
    }

    /// Kernel weight at distance `x` (in input samples); zero past the edge.
    fn at(&self, x: f64) -> f64 {
        let pos = x.abs() * TABLE_OVERSAMPLING as f64;
        let j = pos.floor() as usize;
        match (self.values.get(j), self.values.get(j + 1)) {
            (Some(&a), Some(&b)) => a + (pos - j as f64) * (b - a),
            (Some(&a), None) => a,
            _ => 0.0,
        }
    }
}

/// Kaiser-windowed sinc with its cutoff at `cutoff` times the input Nyquist.
fn kaiser_sinc(x: f64, cutoff: f64, half_width: usize) -> f64 {
    let t = x / half_width as f64;
    if t.abs() > 1.0 {
        return 0.0;
    }
    let window = bessel_i0(KAISER_BETA * (1.0 - t * t).sqrt()) / bessel_i0(KAISER_BETA);
    cutoff * sinc(cutoff * x) * window
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-10 {
        1.0
    } else {
        let pi_x = std::f64::consts::PI * x;
        pi_x.sin() / pi_x
    }
}

/// Modified Bessel function of the first kind, order zero (power series).
fn bessel_i0(x: f64) -> f64 {
    let mut sum = 1.0f64;
    let mut term = 1.0f64;
    let half_x = x * 0.5;

    for k in 1..=25 {
        term *= (half_x / k as f64) * (half_x / k as f64);
        sum += term;
        if term < sum * 1e-16 {
            break;
        }
    }

    sum
}
