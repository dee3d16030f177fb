//! Score validation
//!
//! cmi5 is stricter than xAPI about scores: `min`, `max` and `raw` must be
//! integers, `scaled` must lie in `[0, 1]`, and a `raw` value is only
//! meaningful between an explicit `min` and `max`. Validation is a pure
//! predicate; it never mutates or clamps the score.

use super::types::Score;
use crate::error::ValidationError;

fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0
}

impl Score {
    /// Check the score's internal consistency
    ///
    /// Returns the specific failed rule as a [`ValidationError`]; has no
    /// side effects.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(min) = self.min
            && !is_integral(min)
        {
            return Err(ValidationError::MinNotInteger);
        }
        if let Some(max) = self.max
            && !is_integral(max)
        {
            return Err(ValidationError::MaxNotInteger);
        }

        if let Some(scaled) = self.scaled {
            if !scaled.is_finite() {
                return Err(ValidationError::ScaledNotANumber(scaled));
            }
            if !(0.0..=1.0).contains(&scaled) {
                return Err(ValidationError::ScaledOutOfRange(scaled));
            }
        }

        if let Some(raw) = self.raw {
            if !is_integral(raw) {
                return Err(ValidationError::RawNotInteger);
            }
            let min = self.min.ok_or(ValidationError::RawWithoutMin)?;
            let max = self.max.ok_or(ValidationError::RawWithoutMax)?;
            if raw < min {
                return Err(ValidationError::RawBelowMin);
            }
            if raw > max {
                return Err(ValidationError::RawAboveMax);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_score_is_valid() {
        assert!(Score::default().validate().is_ok());
    }

    #[test]
    fn scaled_in_range_is_valid() {
        assert!(Score::scaled(0.0).validate().is_ok());
        assert!(Score::scaled(0.85).validate().is_ok());
        assert!(Score::scaled(1.0).validate().is_ok());
    }

    #[test]
    fn scaled_out_of_range_is_rejected() {
        assert!(matches!(
            Score::scaled(-0.1).validate(),
            Err(ValidationError::ScaledOutOfRange(_))
        ));
        assert!(matches!(
            Score::scaled(1.1).validate(),
            Err(ValidationError::ScaledOutOfRange(_))
        ));
    }

    #[test]
    fn scaled_nan_is_rejected() {
        assert!(matches!(
            Score::scaled(f64::NAN).validate(),
            Err(ValidationError::ScaledNotANumber(_))
        ));
    }

    #[test]
    fn fractional_min_or_max_is_rejected() {
        let score = Score {
            min: Some(0.5),
            ..Score::default()
        };
        assert!(matches!(
            score.validate(),
            Err(ValidationError::MinNotInteger)
        ));

        let score = Score {
            max: Some(99.9),
            ..Score::default()
        };
        assert!(matches!(
            score.validate(),
            Err(ValidationError::MaxNotInteger)
        ));
    }

    #[test]
    fn raw_requires_min_and_max() {
        let score = Score {
            raw: Some(50.0),
            ..Score::default()
        };
        assert!(matches!(
            score.validate(),
            Err(ValidationError::RawWithoutMin)
        ));

        let score = Score {
            raw: Some(50.0),
            min: Some(0.0),
            ..Score::default()
        };
        assert!(matches!(
            score.validate(),
            Err(ValidationError::RawWithoutMax)
        ));
    }

    #[test]
    fn raw_must_lie_between_min_and_max() {
        let base = Score {
            min: Some(0.0),
            max: Some(100.0),
            ..Score::default()
        };

        let ok = Score {
            raw: Some(50.0),
            ..base
        };
        assert!(ok.validate().is_ok());

        let below = Score {
            raw: Some(-1.0),
            ..base
        };
        assert!(matches!(
            below.validate(),
            Err(ValidationError::RawBelowMin)
        ));

        let above = Score {
            raw: Some(101.0),
            ..base
        };
        assert!(matches!(
            above.validate(),
            Err(ValidationError::RawAboveMax)
        ));
    }

    #[test]
    fn fractional_raw_is_rejected() {
        let score = Score {
            raw: Some(50.5),
            min: Some(0.0),
            max: Some(100.0),
            ..Score::default()
        };
        assert!(matches!(
            score.validate(),
            Err(ValidationError::RawNotInteger)
        ));
    }
}
