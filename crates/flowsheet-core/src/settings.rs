//! Solver settings for recycle-loop relaxation.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::stream::ASM1_WIDTH;

/// Tuning knobs for the fixed-point iteration over loop stages.
///
/// Missing fields in a serialized block take their default, so a flowsheet
/// can override just `max_iter` without restating the rest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Convergence threshold on the maximum absolute change of any tear edge
    /// entry between two sweeps. Default: 1e-6.
    pub tolerance: f64,
    /// Sweep cap per loop stage per time step. Default: 50.
    pub max_iter: usize,
    /// Under-relaxation factor in (0, 1]. Default: 0.5.
    pub relax: f64,
    /// Width of zero-valued defaults for edges without a declared width. Default: 21.
    pub stream_width: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        SolverSettings {
            tolerance: 1e-6,
            max_iter: 50,
            relax: 0.5,
            stream_width: ASM1_WIDTH,
        }
    }
}

impl SolverSettings {
    /// Checks every field against its valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(invalid("tolerance", format!("must be positive and finite, got {}", self.tolerance)));
        }
        if self.max_iter == 0 {
            return Err(invalid("max_iter", "must be at least 1".to_string()));
        }
        if !(self.relax > 0.0 && self.relax <= 1.0) {
            return Err(invalid("relax", format!("must lie in (0, 1], got {}", self.relax)));
        }
        if self.stream_width == 0 {
            return Err(invalid("stream_width", "must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn invalid(setting: &str, reason: String) -> ConfigError {
    ConfigError::InvalidSetting {
        setting: setting.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = SolverSettings::default();
        assert_eq!(settings.tolerance, 1e-6);
        assert_eq!(settings.max_iter, 50);
        assert_eq!(settings.relax, 0.5);
        assert_eq!(settings.stream_width, 21);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        let cases = [
            SolverSettings { relax: 0.0, ..Default::default() },
            SolverSettings { relax: 1.5, ..Default::default() },
            SolverSettings { max_iter: 0, ..Default::default() },
            SolverSettings { tolerance: -1.0, ..Default::default() },
            SolverSettings { tolerance: f64::NAN, ..Default::default() },
            SolverSettings { stream_width: 0, ..Default::default() },
        ];
        for settings in cases {
            assert!(
                matches!(settings.validate(), Err(ConfigError::InvalidSetting { .. })),
                "accepted {:?}",
                settings
            );
        }
    }

    #[test]
    fn partial_block_keeps_other_defaults() {
        let settings: SolverSettings = serde_json::from_str(r#"{"relax": 0.8}"#).unwrap();
        assert_eq!(settings.relax, 0.8);
        assert_eq!(settings.max_iter, 50);
    }
}
