//! Overlapping chunk windows for progressive analysis.

use std::ops::Range;

use crate::dsp::framing;

/// One analysis window over the signal.
///
/// Frame indices refer to the centred frame grid of the whole signal
/// (frame `i` at sample `i * hop_length`), the same grid the spectrogram
/// uses, so chunk results can be appended without re-timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    /// First sample of the window (inclusive).
    pub start: usize,
    /// One past the last sample, clamped to the signal length.
    pub end: usize,
    /// Distance to the next chunk's start.
    pub step: usize,
    /// Global frames centred inside the window, overlap included.
    pub frames: Range<usize>,
    /// Leading frames of `frames` that belong to this chunk alone: those
    /// centred in `[start, start + step)`, or every remaining frame for the
    /// last chunk. At most `ceil(step / hop_length)`.
    pub frames_to_emit: usize,
}

impl Chunk {
    /// Global indices of the frames this chunk emits.
    pub fn emitted_frames(&self) -> Range<usize> {
        self.frames.start..self.frames.start + self.frames_to_emit
    }
}

/// Lazily enumerates chunk windows in increasing start order.
///
/// Windows are `chunk_size` long and start every `step` samples, where
/// `step = chunk_size - overlap`. A non-positive step (overlap at or above
/// the chunk size) falls back to one hop so the walk always advances.
///
/// Emitted frame ranges of consecutive chunks are contiguous and together
/// cover every frame of the signal exactly once, whether or not `step` is
/// a multiple of the hop.
#[derive(Debug, Clone)]
pub struct ChunkPlanner {
    total_samples: usize,
    total_frames: usize,
    chunk_size: usize,
    step: usize,
    hop_length: usize,
    current: usize,
    index: usize,
}

impl ChunkPlanner {
    pub fn new(
        total_samples: usize,
        chunk_size_ms: u32,
        overlap_ms: u32,
        sample_rate: u32,
        hop_length: usize,
    ) -> Self {
        let hop_length = hop_length.max(1);
        let chunk_size = ms_to_samples(chunk_size_ms, sample_rate);
        let overlap = ms_to_samples(overlap_ms, sample_rate);

        let step = if chunk_size > overlap {
            chunk_size - overlap
        } else {
            log::warn!(
                "chunk overlap ({overlap_ms} ms) is not below chunk size ({chunk_size_ms} ms); \
                 stepping by one hop ({hop_length} samples)"
            );
            hop_length
        };

        Self {
            total_samples,
            total_frames: framing::frame_count(total_samples, hop_length),
            // A window shorter than the step would leave gaps.
            chunk_size: chunk_size.max(step),
            step,
            hop_length,
            current: 0,
            index: 0,
        }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Total number of chunks the planner yields from the start.
    pub fn chunk_count(&self) -> usize {
        self.total_samples.div_ceil(self.step)
    }

    /// First global frame centred at or after `sample`, or the frame count
    /// once `sample` reaches the end of the signal.
    fn frame_at_or_after(&self, sample: usize) -> usize {
        if sample >= self.total_samples {
            self.total_frames
        } else {
            sample.div_ceil(self.hop_length).min(self.total_frames)
        }
    }
}

impl Iterator for ChunkPlanner {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.current >= self.total_samples {
            return None;
        }

        let start = self.current;
        let end = (start + self.chunk_size).min(self.total_samples);
        let first = self.frame_at_or_after(start);
        let analysed_end = self.frame_at_or_after(end);
        let emit_end = self.frame_at_or_after(start + self.step).min(analysed_end);

        let chunk = Chunk {
            index: self.index,
            start,
            end,
            step: self.step,
            frames: first..analysed_end,
            frames_to_emit: emit_end.saturating_sub(first),
        };

        self.current += self.step;
        self.index += 1;
        Some(chunk)
    }
}

fn ms_to_samples(ms: u32, sample_rate: u32) -> usize {
    (ms as f64 / 1000.0 * sample_rate as f64).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn covered(chunks: &[Chunk], total: usize) -> bool {
        let mut covered = vec![false; total];
        for c in chunks {
            for slot in &mut covered[c.start..c.end] {
                *slot = true;
            }
        }
        covered.iter().all(|&c| c)
    }

    #[test]
    fn basic_plan() {
        // 1 s chunks with 250 ms overlap at 1 kHz over 2.5 s
        let chunks: Vec<Chunk> = ChunkPlanner::new(2500, 1000, 250, 1000, 10).collect();
        let starts: Vec<usize> = chunks.iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![0, 750, 1500, 2250]);
        assert_eq!(chunks[0].end, 1000);
        assert_eq!(chunks[3].end, 2500);
        assert!(chunks.iter().all(|c| c.step == 750));
        let emitted: Vec<usize> = chunks.iter().map(|c| c.frames_to_emit).collect();
        // 251 frames in total; the last chunk takes the frame on sample 2500
        assert_eq!(emitted, vec![75, 75, 75, 26]);
        assert_eq!(chunks[0].frames, 0..100);
        assert_eq!(chunks[3].frames, 225..251);
        assert_eq!(chunks.iter().map(|c| c.index).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn frames_to_emit_follows_grid() {
        let chunks: Vec<Chunk> = ChunkPlanner::new(10_000, 1000, 0, 1000, 300).collect();
        // Frames on 0, 300, 600, 900 belong to the first second
        assert_eq!(chunks[0].emitted_frames(), 0..4);
        // 1200, 1500, 1800
        assert_eq!(chunks[1].emitted_frames(), 4..7);
        assert!(chunks.iter().all(|c| c.frames_to_emit <= 4)); // ceil(1000 / 300)
    }

    #[test]
    fn emitted_frames_tile_the_grid() {
        // 44.1 kHz, 3 s chunks with 500 ms overlap: step 110250 is not a
        // multiple of the 64-sample hop
        for (total, size, overlap, rate, hop) in [
            (44100 * 20, 3000, 500, 44100, 64),
            (44100 * 7 + 13, 3000, 500, 44100, 64),
            (16000 * 3, 1000, 230, 16000, 128),
            (12_800, 100, 0, 16000, 128),
            (5000, 7, 0, 44100, 64),
        ] {
            let chunks: Vec<Chunk> = ChunkPlanner::new(total, size, overlap, rate, hop).collect();
            let mut next = 0;
            for c in &chunks {
                assert_eq!(c.emitted_frames().start, next, "gap before chunk {}", c.index);
                assert!(c.emitted_frames().end <= c.frames.end);
                next = c.emitted_frames().end;
            }
            assert_eq!(next, framing::frame_count(total, hop), "total {total} hop {hop}");
        }
    }

    #[test]
    fn chunk_count_matches_iteration() {
        for total in [1, 999, 1000, 1001, 7777] {
            let planner = ChunkPlanner::new(total, 500, 100, 1000, 16);
            let expected = planner.chunk_count();
            assert_eq!(planner.count(), expected, "total {total}");
        }
    }

    #[test]
    fn covers_signal_without_gaps() {
        for total in [1, 17, 999, 1000, 1001, 12_345] {
            for (size, overlap) in [(100, 0), (100, 30), (250, 249), (40, 80)] {
                let chunks: Vec<Chunk> =
                    ChunkPlanner::new(total, size, overlap, 1000, 7).collect();
                assert!(covered(&chunks, total), "gap for total={total} size={size}");
                assert!(chunks.iter().all(|c| c.end <= total));
            }
        }
    }

    #[test]
    fn starts_strictly_increase() {
        let chunks: Vec<Chunk> = ChunkPlanner::new(44100 * 3, 700, 200, 44100, 64).collect();
        assert!(chunks.windows(2).all(|w| w[1].start > w[0].start));
    }

    #[test]
    fn overlap_not_below_size_steps_by_hop() {
        for overlap in [500, 800] {
            let planner = ChunkPlanner::new(5000, 500, overlap, 1000, 64);
            assert_eq!(planner.step(), 64);
            let chunks: Vec<Chunk> = planner.collect();
            assert_eq!(chunks.len(), 5000usize.div_ceil(64));
            assert!(chunks.iter().all(|c| c.frames_to_emit == 1));
            assert_eq!(chunks.last().map(|c| c.emitted_frames()), Some(78..79));
            assert!(covered(&chunks, 5000));
        }
    }

    #[test]
    fn empty_signal_yields_nothing() {
        assert_eq!(ChunkPlanner::new(0, 1000, 100, 16000, 160).count(), 0);
    }
}
