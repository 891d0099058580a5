//! The settings surface named as an opaque collaborator by the design.
//!
//! `Settings` is intentionally a plain struct with a [`Default`] impl and a
//! [`Settings::validate`] pass: no builder DSL, no external configuration
//! crate, just fields the core reads directly.

use std::path::PathBuf;

use log::warn;

use crate::error::ProfileError;
use crate::graph::ScopeMode;

/// Time unit used when rendering timing components.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimingUnit {
    Sec,
    Milli,
    Micro,
    Nano,
}

impl TimingUnit {
    /// Multiplier turning seconds into this unit.
    pub fn scale(self) -> f64 {
        match self {
            TimingUnit::Sec => 1.0,
            TimingUnit::Milli => 1.0e3,
            TimingUnit::Micro => 1.0e6,
            TimingUnit::Nano => 1.0e9,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimingUnit::Sec => "sec",
            TimingUnit::Milli => "ms",
            TimingUnit::Micro => "us",
            TimingUnit::Nano => "ns",
        }
    }
}

/// Memory unit used when rendering memory components.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MemoryUnit {
    Kb,
    Mb,
    Gb,
}

impl MemoryUnit {
    /// Multiplier turning bytes into this unit.
    pub fn scale(self) -> f64 {
        match self {
            MemoryUnit::Kb => 1.0 / 1024.0,
            MemoryUnit::Mb => 1.0 / (1024.0 * 1024.0),
            MemoryUnit::Gb => 1.0 / (1024.0 * 1024.0 * 1024.0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MemoryUnit::Kb => "KB",
            MemoryUnit::Mb => "MB",
            MemoryUnit::Gb => "GB",
        }
    }
}

/// Recognized, process-wide settings read by the core.
///
/// This is not the full settings surface such a tool would carry in
/// production (that surface is out of scope, per the design); it is the
/// subset the call-graph store, aggregator, and reporter actually consult.
#[derive(Clone, Debug)]
pub struct Settings {
    pub enabled: bool,
    pub max_depth: usize,
    pub flat_profile: bool,
    pub timeline_profile: bool,
    pub collapse_threads: bool,
    pub max_thread_bookmarks: usize,
    pub precision: usize,
    pub width: usize,
    pub scientific: bool,
    pub timing_units: TimingUnit,
    pub memory_units: MemoryUnit,
    pub stack_clearing: bool,
    pub output_path: PathBuf,
    pub output_prefix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            enabled: true,
            max_depth: usize::MAX,
            flat_profile: false,
            timeline_profile: false,
            collapse_threads: true,
            max_thread_bookmarks: 64,
            precision: 6,
            width: 15,
            scientific: false,
            timing_units: TimingUnit::Sec,
            memory_units: MemoryUnit::Kb,
            stack_clearing: true,
            output_path: PathBuf::from("./perfgraph-output/"),
            output_prefix: String::new(),
        }
    }
}

impl Settings {
    /// The default scope, derived from `flat_profile`/`timeline_profile`.
    ///
    /// `flat_profile` and `timeline_profile` are mutually exclusive; if both
    /// are set this is a configuration error and `TREE` wins, matching
    /// "falls back to default" from the error design.
    pub fn default_scope(&self) -> ScopeMode {
        match (self.flat_profile, self.timeline_profile) {
            (true, false) => ScopeMode::Flat,
            (false, true) => ScopeMode::Timeline,
            (false, false) => ScopeMode::Tree,
            (true, true) => {
                warn!(
                    "settings: `flat_profile` and `timeline_profile` both set, \
                     falling back to TREE scope"
                );
                ScopeMode::Tree
            }
        }
    }

    /// Validates the current values, logging and resetting any that are out
    /// of range, and returning one [`ProfileError::Configuration`] per field
    /// corrected. Never blocks startup: invalid settings degrade to defaults
    /// whether or not the caller inspects the returned corrections.
    pub fn validate(&mut self) -> Vec<ProfileError> {
        let defaults = Settings::default();
        let mut corrections = Vec::new();
        if self.precision > 20 {
            warn!(
                "settings: `precision` = {} is unreasonably large, resetting to {}",
                self.precision, defaults.precision
            );
            corrections.push(ProfileError::Configuration {
                key: "precision",
                reason: format!("{} exceeds the maximum of 20", self.precision),
            });
            self.precision = defaults.precision;
        }
        if self.width == 0 {
            warn!("settings: `width` = 0 is invalid, resetting to {}", defaults.width);
            corrections.push(ProfileError::Configuration {
                key: "width",
                reason: "0 would render every value unreadably narrow".to_string(),
            });
            self.width = defaults.width;
        }
        if self.max_thread_bookmarks == 0 {
            warn!(
                "settings: `max_thread_bookmarks` = 0 would drop all stitching, resetting to {}",
                defaults.max_thread_bookmarks
            );
            corrections.push(ProfileError::Configuration {
                key: "max_thread_bookmarks",
                reason: "0 would prevent any worker thread from being stitched in".to_string(),
            });
            self.max_thread_bookmarks = defaults.max_thread_bookmarks;
        }
        corrections
    }

    /// Builds the output path for a given filename suffix (`%p`, `%r`, `%j`,
    /// `%m` placeholders are resolved by the caller before this is invoked;
    /// here we only join directory + prefix + tag).
    pub fn resolve_output_file(&self, tag: &str, ext: &str) -> Result<PathBuf, ProfileError> {
        if !self.output_path.exists() {
            std::fs::create_dir_all(&self.output_path).map_err(|source| ProfileError::Io {
                path: self.output_path.display().to_string(),
                source,
            })?;
        }
        let filename = format!("{}{}.{}", self.output_prefix, tag, ext);
        Ok(self.output_path.join(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_resets_invalid_fields_to_defaults_and_reports_each() {
        let mut settings = Settings {
            precision: 100,
            width: 0,
            max_thread_bookmarks: 0,
            ..Settings::default()
        };
        let corrections = settings.validate();
        assert_eq!(corrections.len(), 3);
        assert_eq!(settings.precision, Settings::default().precision);
        assert_eq!(settings.width, Settings::default().width);
        assert_eq!(settings.max_thread_bookmarks, Settings::default().max_thread_bookmarks);
    }

    #[test]
    fn validate_is_a_noop_for_already_valid_settings() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_empty());
    }

    #[test]
    fn both_flat_and_timeline_profile_falls_back_to_tree() {
        let settings = Settings {
            flat_profile: true,
            timeline_profile: true,
            ..Settings::default()
        };
        assert_eq!(settings.default_scope(), ScopeMode::Tree);
    }
}
