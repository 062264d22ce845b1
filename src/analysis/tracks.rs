use serde::Serialize;

/// Time-stamped F0 values (Hz, NaN where unvoiced or undetected).
///
/// Grows by appending chunk results during progressive analysis; values
/// already appended are never rewritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct F0Track {
    pub times: Vec<f64>,
    pub values: Vec<f32>,
}

impl F0Track {
    pub fn append(&mut self, times: &[f64], values: &[f32]) {
        let n = times.len().min(values.len());
        self.times.extend_from_slice(&times[..n]);
        self.values.extend_from_slice(&values[..n]);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.times.clear();
        self.values.clear();
    }

    /// Finite values only.
    pub fn voiced_values(&self) -> Vec<f32> {
        self.values.iter().copied().filter(|v| v.is_finite()).collect()
    }

    pub fn voiced_fraction(&self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.voiced_values().len() as f32 / self.values.len() as f32
    }

    pub fn mean(&self) -> Option<f32> {
        let voiced = self.voiced_values();
        if voiced.is_empty() {
            return None;
        }
        Some(voiced.iter().sum::<f32>() / voiced.len() as f32)
    }

    /// (min, max) over finite values.
    pub fn range(&self) -> Option<(f32, f32)> {
        self.voiced_values().into_iter().fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

/// RMS energy per analysis frame. Frame `i` sits at
/// `i * hop_length / sample_rate` seconds; no explicit time stamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntensityTrack {
    pub values: Vec<f32>,
}

impl IntensityTrack {
    pub fn append(&mut self, values: &[f32]) {
        self.values.extend_from_slice(values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn frame_time(index: usize, hop_length: usize, sample_rate: u32) -> f64 {
        (index * hop_length) as f64 / sample_rate as f64
    }

    pub fn peak(&self) -> Option<f32> {
        self.values.iter().copied().reduce(f32::max)
    }

    /// Index of the loudest frame (the first one on ties).
    pub fn peak_frame(&self) -> Option<usize> {
        self.values
            .iter()
            .enumerate()
            .reduce(|best, cur| if cur.1 > best.1 { cur } else { best })
            .map(|(i, _)| i)
    }
}

/// Formants of one analysis frame.
///
/// `frequencies` lists F1, F2, ... in band order; a band with no candidate
/// is simply missing, so the list may be shorter than four.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormantPoint {
    /// Sample offset of the frame centre within the full buffer.
    pub sample_position: usize,
    pub frequencies: Vec<f64>,
}

impl FormantPoint {
    pub fn time(&self, sample_rate: u32) -> f64 {
        self.sample_position as f64 / sample_rate as f64
    }
}
