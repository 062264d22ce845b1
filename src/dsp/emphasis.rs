use std::borrow::Cow;

/// Standard speech pre-emphasis coefficient.
pub const PRE_EMPHASIS_COEF: f32 = 0.97;

/// Apply first-order pre-emphasis: y[n] = x[n] - 0.97 * x[n-1].
///
/// Pre-emphasis tilts the spectrum upwards (about +6 dB/octave), which
/// compensates for the natural roll-off of the glottal source and makes
/// the higher formants of high-pitched voices easier to see.
///
/// When `enabled` is false the input is handed back borrowed and untouched.
/// The first output sample equals the first input sample.
pub fn apply_pre_emphasis(samples: &[f32], enabled: bool) -> Cow<'_, [f32]> {
    if !enabled || samples.is_empty() {
        return Cow::Borrowed(samples);
    }

    let mut out = Vec::with_capacity(samples.len());
    out.push(samples[0]);
    out.extend(
        samples
            .windows(2)
            .map(|pair| pair[1] - PRE_EMPHASIS_COEF * pair[0]),
    );

    Cow::Owned(out)
}
