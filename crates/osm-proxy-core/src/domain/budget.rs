use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// A named, independently tracked rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Budget {
    /// Calls this service allows its own clients.
    Backend,
    /// Calls the upstream service allows this service.
    Osm,
}

impl Budget {
    pub const ALL: [Budget; 2] = [Budget::Backend, Budget::Osm];

    pub fn as_str(&self) -> &'static str {
        match self {
            Budget::Backend => "backend",
            Budget::Osm => "osm",
        }
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Budget {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backend" => Ok(Budget::Backend),
            "osm" => Ok(Budget::Osm),
            other => Err(DomainError::UnknownBudget(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_budgets() {
        assert_eq!("backend".parse::<Budget>().unwrap(), Budget::Backend);
        assert_eq!("osm".parse::<Budget>().unwrap(), Budget::Osm);
    }

    #[test]
    fn test_parse_unknown_budget() {
        let err = "github".parse::<Budget>().unwrap_err();
        assert!(matches!(err, DomainError::UnknownBudget(name) if name == "github"));
    }

    #[test]
    fn test_display_matches_wire_name() {
        for budget in Budget::ALL {
            assert_eq!(budget.to_string().parse::<Budget>().unwrap(), budget);
        }
    }
}
