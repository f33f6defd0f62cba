use crate::foundation::error::{ExportError, ExportResult};

/// Outcome of offering a frame index to a [`FrameSequencer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Encode the frame with this presentation timestamp (codec time base).
    Accept {
        /// Timestamp assigned to the frame.
        pts: i64,
    },
    /// Same index as the previous call; the frame is a repeat and must not be encoded.
    Skip,
}

/// Per-export frame counter.
///
/// Callers feed non-decreasing frame indices starting at 0. Each new index is accepted with the
/// next timestamp (1, 2, 3, ...); a repeated index is skipped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameSequencer {
    last_input_index: Option<i64>,
    last_pts: i64,
}

impl FrameSequencer {
    /// Create a sequencer in its initial state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp of the most recently accepted frame (0 before any).
    pub fn last_pts(&self) -> i64 {
        self.last_pts
    }

    /// Index passed to the last successful call.
    pub fn last_input_index(&self) -> Option<i64> {
        self.last_input_index
    }

    /// Decide whether `input_index` is a new frame.
    ///
    /// Negative or decreasing indices are rejected without changing any state.
    pub fn admit(&mut self, input_index: i64) -> ExportResult<Admission> {
        if input_index < 0 {
            return Err(ExportError::sequence(format!(
                "frame index must not be negative, got {input_index}"
            )));
        }
        match self.last_input_index {
            Some(last) if input_index == last => return Ok(Admission::Skip),
            Some(last) if input_index < last => {
                return Err(ExportError::sequence(format!(
                    "frame index {input_index} follows {last}; indices must not decrease"
                )));
            }
            _ => {}
        }
        self.last_input_index = Some(input_index);
        self.last_pts += 1;
        Ok(Admission::Accept { pts: self.last_pts })
    }

    /// Return to the initial state so a new export starts at timestamp 1 again.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/sequencer.rs"]
mod tests;
