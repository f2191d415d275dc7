//! Vector configuration parameters.

use std::error::Error;
use std::fmt;

/// Configuration for an [`AtomicVector`](crate::AtomicVector).
///
/// Validated at construction; immutable afterwards.
#[derive(Clone, Debug)]
pub struct VectorConfig {
    /// Number of per-thread counters in the vector's sensitive section.
    ///
    /// Default: 128. Must be a power of two in `[1, 65536]`. Wider
    /// sections spread readers over more counters (less contention on
    /// `read`) at the cost of a longer scan on every `write` that
    /// replaces a value.
    pub section_slots: usize,
}

impl VectorConfig {
    /// Default sensitive-section width.
    pub const DEFAULT_SECTION_SLOTS: usize = 128;

    /// Upper bound on the sensitive-section width.
    pub const MAX_SECTION_SLOTS: usize = 1 << 16;

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.section_slots == 0 || self.section_slots > Self::MAX_SECTION_SLOTS {
            return Err(ConfigError::SectionSlotsOutOfRange {
                configured: self.section_slots,
            });
        }
        if !self.section_slots.is_power_of_two() {
            return Err(ConfigError::SectionSlotsNotPowerOfTwo {
                configured: self.section_slots,
            });
        }
        Ok(())
    }

    /// Validate and freeze this configuration.
    pub fn validated(self) -> Result<ValidatedConfig, ConfigError> {
        self.validate()?;
        Ok(ValidatedConfig(self))
    }
}

/// A [`VectorConfig`] that has passed [`validate`](VectorConfig::validate).
///
/// Vectors built from one cannot fail, so callers that create many
/// vectors from a single configuration check it once up front.
#[derive(Clone, Debug, Default)]
pub struct ValidatedConfig(VectorConfig);

impl ValidatedConfig {
    /// The checked configuration.
    pub fn get(&self) -> &VectorConfig {
        &self.0
    }
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            section_slots: Self::DEFAULT_SECTION_SLOTS,
        }
    }
}

/// Errors detected during [`VectorConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `section_slots` is zero or above [`VectorConfig::MAX_SECTION_SLOTS`].
    SectionSlotsOutOfRange {
        /// The configured width.
        configured: usize,
    },
    /// `section_slots` is not a power of two.
    SectionSlotsNotPowerOfTwo {
        /// The configured width.
        configured: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SectionSlotsOutOfRange { configured } => write!(
                f,
                "section_slots {configured} is outside [1, {}]",
                VectorConfig::MAX_SECTION_SLOTS
            ),
            Self::SectionSlotsNotPowerOfTwo { configured } => {
                write!(f, "section_slots {configured} is not a power of two")
            }
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = VectorConfig::default();
        assert_eq!(config.section_slots, 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_and_oversized_widths_rejected() {
        for slots in [0, VectorConfig::MAX_SECTION_SLOTS * 2] {
            let config = VectorConfig {
                section_slots: slots,
            };
            assert_eq!(
                config.validate(),
                Err(ConfigError::SectionSlotsOutOfRange { configured: slots })
            );
        }
    }

    #[test]
    fn non_power_of_two_rejected() {
        let config = VectorConfig { section_slots: 96 };
        assert_eq!(
            config.validate(),
            Err(ConfigError::SectionSlotsNotPowerOfTwo { configured: 96 })
        );
    }

    #[test]
    fn validated_keeps_settings_and_rejects_bad_widths() {
        let valid = VectorConfig { section_slots: 8 }.validated().unwrap();
        assert_eq!(valid.get().section_slots, 8);
        assert_eq!(
            VectorConfig { section_slots: 6 }.validated().unwrap_err(),
            ConfigError::SectionSlotsNotPowerOfTwo { configured: 6 }
        );
        assert_eq!(
            ValidatedConfig::default().get().section_slots,
            VectorConfig::DEFAULT_SECTION_SLOTS
        );
    }

    #[test]
    fn single_slot_is_allowed() {
        assert!(VectorConfig { section_slots: 1 }.validate().is_ok());
    }
}
