//! Runtime materialization settings.
//!
//! ```ignore
//! let config = BucketConfig::default()
//!     .mmap_low_threshold(8 * 1024)
//!     .buffer_chunk_size(16 * 1024);
//! config.validate()?;
//!
//! // or by name, e.g. from a config file
//! let mut config = BucketConfig::default();
//! config.set_option("mmap_enabled", "off")?;
//! ```

use eyre::{bail, ensure, Result, WrapErr};

use super::constants::{
    DEFAULT_BUFFER_CHUNK_SIZE, DEFAULT_MMAP_ENABLED, DEFAULT_MMAP_HIGH_LIMIT,
    DEFAULT_MMAP_LOW_THRESHOLD,
};

/// Tunables of the materialization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketConfig {
    pub mmap_low_threshold: u64,
    pub mmap_high_limit: u64,
    pub buffer_chunk_size: usize,
    pub mmap_enabled: bool,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            mmap_low_threshold: DEFAULT_MMAP_LOW_THRESHOLD,
            mmap_high_limit: DEFAULT_MMAP_HIGH_LIMIT,
            buffer_chunk_size: DEFAULT_BUFFER_CHUNK_SIZE,
            mmap_enabled: DEFAULT_MMAP_ENABLED,
        }
    }
}

impl BucketConfig {
    /// Names accepted by [`set_option`](Self::set_option).
    pub const OPTIONS: [&'static str; 4] = [
        "mmap_low_threshold",
        "mmap_high_limit",
        "buffer_chunk_size",
        "mmap_enabled",
    ];

    pub fn mmap_low_threshold(mut self, bytes: u64) -> Self {
        self.mmap_low_threshold = bytes;
        self
    }

    pub fn mmap_high_limit(mut self, bytes: u64) -> Self {
        self.mmap_high_limit = bytes;
        self
    }

    pub fn buffer_chunk_size(mut self, bytes: usize) -> Self {
        self.buffer_chunk_size = bytes;
        self
    }

    pub fn mmap_enabled(mut self, enabled: bool) -> Self {
        self.mmap_enabled = enabled;
        self
    }

    /// Checks the relationships documented in [`constants`](super::constants).
    ///
    /// A high limit at or below the low threshold is accepted only when
    /// mapping is disabled, since it would otherwise disable mapping silently.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.buffer_chunk_size > 0,
            "buffer_chunk_size must be non-zero"
        );

        if self.mmap_enabled {
            ensure!(
                self.mmap_low_threshold < self.mmap_high_limit,
                "mmap_low_threshold {} must be below mmap_high_limit {}",
                self.mmap_low_threshold,
                self.mmap_high_limit
            );
        }

        Ok(())
    }

    /// Sets one option by name. Values are byte counts for the size options
    /// and `true/false/on/off/1/0` for `mmap_enabled`.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<()> {
        let value = value.trim();

        match name {
            "mmap_low_threshold" => {
                self.mmap_low_threshold = parse_bytes(name, value)?;
            }
            "mmap_high_limit" => {
                self.mmap_high_limit = parse_bytes(name, value)?;
            }
            "buffer_chunk_size" => {
                let bytes = parse_bytes(name, value)?;
                self.buffer_chunk_size = usize::try_from(bytes)
                    .wrap_err_with(|| format!("buffer_chunk_size {} does not fit usize", bytes))?;
            }
            "mmap_enabled" => {
                self.mmap_enabled = parse_flag(value)
                    .wrap_err_with(|| format!("invalid value for option '{}'", name))?;
            }
            _ => bail!(
                "unknown option '{}' (expected one of: {})",
                name,
                Self::OPTIONS.join(", ")
            ),
        }

        Ok(())
    }
}

fn parse_bytes(name: &str, value: &str) -> Result<u64> {
    value
        .replace('_', "")
        .parse::<u64>()
        .wrap_err_with(|| format!("invalid byte count '{}' for option '{}'", value, name))
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        other => bail!("expected a boolean, got '{}'", other),
    }
}
