use anyhow::{bail, Result};

use crate::model::{Phase, PhaseDates};

/// Trim a capability or milestone name, rejecting blank ones.
pub fn validate_name(kind: &str, name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        bail!("{kind} name must not be empty");
    }
    Ok(trimmed.to_string())
}

/// Describe ordering oddities in a schedule: phases ending before they
/// start, and phases starting before the previous one ends.
///
/// These are advisory only; plans are stored exactly as entered.
pub fn phase_warnings(phases: &PhaseDates) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut previous: Option<Phase> = None;
    for (phase, range) in phases.ranges() {
        if range.is_reversed() {
            warnings.push(format!("{phase} ends before it starts ({range})"));
        }
        if let Some(prev) = previous {
            let prev_range = phases.range(prev);
            if range.start < prev_range.end {
                warnings.push(format!("{phase} starts before {prev} ends"));
            }
        }
        previous = Some(phase);
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::{midnight, DateRange};
    use chrono::NaiveDate;

    #[test]
    fn valid_names() {
        assert_eq!(validate_name("capability", "Payments").unwrap(), "Payments");
        assert_eq!(validate_name("capability", "  Spaced  ").unwrap(), "Spaced");
    }

    #[test]
    fn invalid_names() {
        assert!(validate_name("capability", "").is_err());
        assert!(validate_name("milestone", "   ").is_err());
    }

    #[test]
    fn sequential_schedule_has_no_warnings() {
        let dates = PhaseDates::sequential(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert!(phase_warnings(&dates).is_empty());
    }

    #[test]
    fn reversed_and_overlapping_phases_warn() {
        let mut dates = PhaseDates::sequential(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        let d = |m, day| midnight(NaiveDate::from_ymd_opt(2025, m, day).unwrap());
        dates.set_range(Phase::Design, DateRange::new(d(1, 15), d(1, 10)));
        let warnings = phase_warnings(&dates);
        assert!(warnings.iter().any(|w| w.starts_with("Design ends before it starts")));
        assert!(warnings.iter().any(|w| w == "Design starts before Requirements ends"));
    }
}
