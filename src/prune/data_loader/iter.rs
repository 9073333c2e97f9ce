//! Iterator over calibration batches.

/// Lazy, finite, non-restartable sequence of calibration batches.
///
/// Every batch holds exactly `batch_size` samples; each sample is cut to at
/// most `max_sequence_length` characters just before its batch is yielded.
#[derive(Debug)]
pub struct CalibrationBatches {
    samples: std::vec::IntoIter<String>,
    batch_size: usize,
    max_sequence_length: usize,
}

impl CalibrationBatches {
    /// `samples.len()` must be a multiple of `batch_size`.
    pub(crate) fn new(samples: Vec<String>, batch_size: usize, max_sequence_length: usize) -> Self {
        debug_assert!(batch_size > 0 && samples.len() % batch_size == 0);
        Self {
            samples: samples.into_iter(),
            batch_size,
            max_sequence_length,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl Iterator for CalibrationBatches {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.samples.len() < self.batch_size {
            return None;
        }
        let batch = self
            .samples
            .by_ref()
            .take(self.batch_size)
            .map(|mut text| {
                truncate_chars(&mut text, self.max_sequence_length);
                text
            })
            .collect();
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.samples.len() / self.batch_size;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CalibrationBatches {}

/// Cut `text` to at most `max_chars` Unicode scalar values
pub fn truncate_chars(text: &mut String, max_chars: usize) {
    if let Some((byte_index, _)) = text.char_indices().nth(max_chars) {
        text.truncate(byte_index);
    }
}
