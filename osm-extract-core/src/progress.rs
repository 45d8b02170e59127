//! Byte-based progress reporting across passes.

use log::info;

const STEP_PERCENT: u64 = 10;

/// Tracks how far a multi-pass run has progressed.
///
/// The denominator is the input size times the number of passes, so the
/// percentage climbs steadily across all passes.
#[derive(Debug)]
pub struct Progress {
    passes: usize,
    pass: usize,
    input_size: Option<u64>,
    reported_step: u64,
}

impl Progress {
    /// Progress for `passes` passes over an input of `input_size` bytes.
    #[must_use]
    pub const fn new(passes: usize, input_size: Option<u64>) -> Self {
        Self {
            passes,
            pass: 0,
            input_size,
            reported_step: 0,
        }
    }

    /// Announce the next pass.
    pub fn begin_pass(&mut self, label: &str, input: &str) {
        self.pass += 1;
        info!(
            "Pass {}/{} ({label}): reading {input}",
            self.pass, self.passes
        );
    }

    /// Percentage completed given `offset` bytes read in the current pass.
    #[must_use]
    pub fn percent(&self, offset: u64) -> Option<u64> {
        let size = self.input_size.filter(|&size| size > 0)?;
        let passes = u64::try_from(self.passes.max(1)).ok()?;
        let completed = u64::try_from(self.pass.saturating_sub(1)).ok()?;
        let done = completed.saturating_mul(size).saturating_add(offset.min(size));
        let total = passes.saturating_mul(size);
        Some(done.saturating_mul(100) / total)
    }

    /// Record `offset` bytes read in the current pass, logging each step.
    pub fn update(&mut self, offset: u64) {
        let Some(percent) = self.percent(offset) else {
            return;
        };
        let step = percent / STEP_PERCENT;
        if step > self.reported_step {
            self.reported_step = step;
            info!("Progress: {percent}%");
        }
    }
}
