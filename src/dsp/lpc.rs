//! Linear predictive coding: autocorrelation, Levinson-Durbin, and the
//! roots of the prediction polynomial.

use std::f64::consts::PI;

use rustfft::num_complex::Complex64;

/// Why an LPC fit produced nothing usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpcFailure {
    /// Zero-energy input: the autocorrelation at lag 0 is not positive.
    ZeroEnergy,
    /// The recursion's prediction error went non-positive (ill-conditioned).
    Unstable,
    /// A coefficient came out NaN or infinite.
    NonFinite,
}

/// Autocorrelation of `signal` for lags 0..=`order`.
pub fn autocorrelation(signal: &[f64], order: usize) -> Vec<f64> {
    let n = signal.len();
    (0..=order)
        .map(|lag| {
            if lag >= n {
                return 0.0;
            }
            signal[lag..]
                .iter()
                .zip(signal)
                .map(|(a, b)| a * b)
                .sum()
        })
        .collect()
}

/// Levinson-Durbin recursion.
///
/// Returns the prediction polynomial `[1, a1, ..., ap]` for
/// A(z) = 1 + a1*z^-1 + ... + ap*z^-p.
pub fn levinson_durbin(r: &[f64], order: usize) -> Result<Vec<f64>, LpcFailure> {
    if r.len() < order + 1 || !(r[0] > 0.0) {
        return Err(LpcFailure::ZeroEnergy);
    }

    let mut a = vec![0.0f64; order + 1];
    a[0] = 1.0;
    let mut e = r[0];

    for i in 1..=order {
        let mut acc = r[i];
        for j in 1..i {
            acc += a[j] * r[i - j];
        }
        let k = -acc / e;

        let prev = a.clone();
        a[i] = k;
        for j in 1..i {
            a[j] = prev[j] + k * prev[i - j];
        }

        e *= 1.0 - k * k;
        if !(e > 0.0) {
            return Err(LpcFailure::Unstable);
        }
    }

    if a.iter().any(|c| !c.is_finite()) {
        return Err(LpcFailure::NonFinite);
    }
    Ok(a)
}

/// LPC polynomial of `order` for one (already windowed) frame.
pub fn lpc_coefficients(frame: &[f64], order: usize) -> Result<Vec<f64>, LpcFailure> {
    let r = autocorrelation(frame, order);
    levinson_durbin(&r, order)
}

/// Roots of a polynomial given highest-degree coefficient first,
/// `poly[0]*z^n + poly[1]*z^(n-1) + ... + poly[n]`, via Durand-Kerner.
///
/// The LPC polynomial `[1, a1, ..., ap]` is already in this order once
/// multiplied through by z^p.
pub fn polynomial_roots(poly: &[f64]) -> Result<Vec<Complex64>, LpcFailure> {
    let degree = poly.len().saturating_sub(1);
    if degree == 0 {
        return Ok(Vec::new());
    }
    let lead = poly[0];
    if lead.abs() < 1e-300 {
        return Err(LpcFailure::NonFinite);
    }
    let monic: Vec<f64> = poly.iter().map(|c| c / lead).collect();

    // Start on a circle just inside the unit circle; the angular offset
    // breaks the symmetry that would stall real-coefficient polynomials.
    let mut roots: Vec<Complex64> = (0..degree)
        .map(|k| Complex64::from_polar(0.9, 2.0 * PI * (k as f64 + 0.25) / degree as f64))
        .collect();

    const MAX_ITER: usize = 500;
    const TOL: f64 = 1e-10;

    for _ in 0..MAX_ITER {
        let mut max_step = 0.0f64;
        for i in 0..degree {
            let mut denom = Complex64::new(1.0, 0.0);
            for j in 0..degree {
                if i != j {
                    denom *= roots[i] - roots[j];
                }
            }
            let delta = if denom.norm() < 1e-14 {
                Complex64::new(1e-6, 1e-6)
            } else {
                poly_eval(&monic, roots[i]) / denom
            };
            roots[i] -= delta;
            max_step = max_step.max(delta.norm());
        }
        if max_step < TOL {
            break;
        }
    }

    if roots.iter().any(|z| !z.re.is_finite() || !z.im.is_finite()) {
        return Err(LpcFailure::NonFinite);
    }
    Ok(roots)
}

/// Horner evaluation, highest degree first.
fn poly_eval(poly: &[f64], z: Complex64) -> Complex64 {
    poly.iter()
        .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * z + Complex64::new(c, 0.0))
}

/// Candidate formant frequencies (Hz, ascending) from LPC roots.
///
/// Only roots on or above the real axis are kept, so each complex-conjugate
/// pair contributes a single frequency.
pub fn root_frequencies(roots: &[Complex64], sample_rate: u32) -> Vec<f64> {
    let mut freqs: Vec<f64> = roots
        .iter()
        .filter(|z| z.im >= 0.0)
        .map(|z| z.arg() * sample_rate as f64 / (2.0 * PI))
        .collect();
    freqs.sort_by(|a, b| a.total_cmp(b));
    freqs
}
