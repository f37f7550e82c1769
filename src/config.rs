//! Memory layout and output formatting of a shell.

use crate::arena::align_down;
use crate::error::ErrorKind;
use crate::record::BUCKET_LEN;

/// How the shell's buffer is split between its five regions.
///
/// A region gets `total * ratio / granularity` bytes, rounded down to the
/// pointer size. The ratios must add up to `granularity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLayout {
    pub granularity: usize,
    pub arguments: usize,
    pub strings: usize,
    pub nodes: usize,
    pub buckets: usize,
    pub output: usize,
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self {
            granularity: 128,
            arguments: 16,
            strings: 48,
            nodes: 32,
            buckets: 8,
            output: 24,
        }
    }
}

/// Region sizes in bytes, in the order they are carved out of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regions {
    pub arguments: usize,
    pub strings: usize,
    pub nodes: usize,
    pub buckets: usize,
    pub output: usize,
}

impl Regions {
    pub fn total(&self) -> usize {
        self.arguments + self.strings + self.nodes + self.buckets + self.output
    }
}

impl MemoryLayout {
    pub fn validate(&self) -> Result<(), ErrorKind> {
        let sum = [
            self.arguments,
            self.strings,
            self.nodes,
            self.buckets,
            self.output,
        ]
        .iter()
        .try_fold(0usize, |acc, &ratio| acc.checked_add(ratio));
        match sum {
            Some(sum) if self.granularity > 0 && sum == self.granularity => Ok(()),
            _ => Err(ErrorKind::BadMemoryConfig),
        }
    }

    /// Sizes of each region for a buffer of `total` bytes.
    pub fn regions(&self, total: usize) -> Result<Regions, ErrorKind> {
        self.validate()?;
        if total == 0 {
            return Err(ErrorKind::NullBuffer);
        }
        if u32::try_from(total).is_err() {
            return Err(ErrorKind::BufferTooLarge);
        }

        let size = |ratio: usize| {
            total
                .checked_mul(ratio)
                .map(|n| align_down(n / self.granularity))
                .ok_or(ErrorKind::BufferTooLarge)
        };
        let regions = Regions {
            arguments: size(self.arguments)?,
            strings: size(self.strings)?,
            nodes: size(self.nodes)?,
            buckets: size(self.buckets)?,
            output: size(self.output)?,
        };

        let empty = [
            regions.arguments,
            regions.strings,
            regions.nodes,
            regions.output,
        ]
        .contains(&0);
        if empty || regions.buckets < BUCKET_LEN {
            return Err(ErrorKind::BufferTooSmall);
        }
        Ok(regions)
    }
}

/// Everything that can be tuned on a [`Shell`](crate::Shell).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub layout: MemoryLayout,
    /// Written between two arguments by `echo` and `env`.
    pub separator: String,
    /// Written after the last argument by `echo` and `env`.
    pub terminator: String,
    /// Zero the environment memory on `clear` instead of only resetting it.
    pub secure_clear: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            layout: MemoryLayout::default(),
            separator: " ".to_string(),
            terminator: "\n".to_string(),
            secure_clear: false,
        }
    }
}
