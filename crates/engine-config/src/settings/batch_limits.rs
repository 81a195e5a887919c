use crate::settings::error::SettingsError;

pub const DEFAULT_MAX_RECORDS: usize = 200;
pub const DEFAULT_MAX_BYTES: usize = 500_000;

/// Thresholds at which a running batch is flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_records: usize,
    pub max_bytes: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

impl BatchLimits {
    pub fn new(max_records: usize, max_bytes: usize) -> Self {
        Self {
            max_records,
            max_bytes,
        }
    }

    /// The record count limit is inclusive, the byte limit must be exceeded.
    pub fn is_full(&self, records: usize, bytes: usize) -> bool {
        records >= self.max_records || bytes > self.max_bytes
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_records == 0 {
            return Err(SettingsError::InvalidBatchLimits(
                "record limit must be at least 1".into(),
            ));
        }
        if self.max_bytes == 0 {
            return Err(SettingsError::InvalidBatchLimits(
                "byte limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_thresholds() {
        let limits = BatchLimits::default();
        assert!(!limits.is_full(199, 500_000));
        assert!(limits.is_full(200, 10));
        assert!(limits.is_full(1, 500_001));
    }

    #[test]
    fn test_zero_limits_are_rejected() {
        assert!(BatchLimits::new(0, 10).validate().is_err());
        assert!(BatchLimits::new(10, 0).validate().is_err());
        assert!(BatchLimits::new(1, 1).validate().is_ok());
    }
}
