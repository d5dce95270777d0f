use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::OnlineCourseError;

/// Enrollment category. The stored values are the ones the course
/// catalogue has always used, including the upper-case beta marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnrollmentMode {
    #[default]
    #[serde(rename = "audit")]
    Audit,
    #[serde(rename = "honor")]
    Honor,
    #[serde(rename = "BETA")]
    Beta,
}

impl EnrollmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentMode::Audit => "audit",
            EnrollmentMode::Honor => "honor",
            EnrollmentMode::Beta => "BETA",
        }
    }
}

impl fmt::Display for EnrollmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrollmentMode {
    type Err = OnlineCourseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audit" => Ok(EnrollmentMode::Audit),
            "honor" => Ok(EnrollmentMode::Honor),
            "BETA" => Ok(EnrollmentMode::Beta),
            other => Err(OnlineCourseError::InvalidMode(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stored_values() {
        assert_eq!("audit".parse::<EnrollmentMode>(), Ok(EnrollmentMode::Audit));
        assert_eq!("honor".parse::<EnrollmentMode>(), Ok(EnrollmentMode::Honor));
        assert_eq!("BETA".parse::<EnrollmentMode>(), Ok(EnrollmentMode::Beta));
    }

    #[test]
    fn rejects_unknown_mode() {
        let err = "beta".parse::<EnrollmentMode>().unwrap_err();
        assert_eq!(err, OnlineCourseError::InvalidMode("beta".to_string()));
    }

    #[test]
    fn default_is_audit() {
        assert_eq!(EnrollmentMode::default(), EnrollmentMode::Audit);
        assert_eq!(EnrollmentMode::Honor.to_string(), "honor");
    }
}
