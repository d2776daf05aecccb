use serde::{Deserialize, Serialize};

use shopfloor_core::DomainError;

/// Production order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionOrderStatus {
    Planned,
    Released,
    InProgress,
    Completed,
    Cancelled,
}

impl ProductionOrderStatus {
    pub const ALL: [ProductionOrderStatus; 5] = [
        ProductionOrderStatus::Planned,
        ProductionOrderStatus::Released,
        ProductionOrderStatus::InProgress,
        ProductionOrderStatus::Completed,
        ProductionOrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductionOrderStatus::Planned => "planned",
            ProductionOrderStatus::Released => "released",
            ProductionOrderStatus::InProgress => "in_progress",
            ProductionOrderStatus::Completed => "completed",
            ProductionOrderStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled orders accept no further changes.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProductionOrderStatus::Completed | ProductionOrderStatus::Cancelled
        )
    }

    /// The single forward step from this status, if any.
    pub fn next(&self) -> Option<ProductionOrderStatus> {
        match self {
            ProductionOrderStatus::Planned => Some(ProductionOrderStatus::Released),
            ProductionOrderStatus::Released => Some(ProductionOrderStatus::InProgress),
            ProductionOrderStatus::InProgress => Some(ProductionOrderStatus::Completed),
            ProductionOrderStatus::Completed | ProductionOrderStatus::Cancelled => None,
        }
    }

    /// Allowed-transition table.
    ///
    /// Forward one step at a time, or to `cancelled` from any non-terminal
    /// status. Self-transitions are never allowed.
    pub fn can_transition_to(&self, target: ProductionOrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        target == ProductionOrderStatus::Cancelled || self.next() == Some(target)
    }
}

impl core::fmt::Display for ProductionOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ProductionOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductionOrderStatus::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                DomainError::validation(
                    "status",
                    "must be one of: planned, released, in_progress, completed, cancelled",
                )
            })
    }
}

/// Scheduling priority of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::Low, Priority::Medium, Priority::High, Priority::Urgent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl core::fmt::Display for Priority {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Priority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                DomainError::validation("priority", "must be one of: low, medium, high, urgent")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::ProductionOrderStatus::*;
    use super::*;

    #[test]
    fn transition_table_is_exact() {
        let allowed = [
            (Planned, Released),
            (Planned, Cancelled),
            (Released, InProgress),
            (Released, Cancelled),
            (InProgress, Completed),
            (InProgress, Cancelled),
        ];

        for from in ProductionOrderStatus::ALL {
            for to in ProductionOrderStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn terminal_states_are_absorbing() {
        assert!(Completed.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(!Completed.can_transition_to(Released));
        assert!(!Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn status_parses_snake_case() {
        assert_eq!("in_progress".parse::<ProductionOrderStatus>().unwrap(), InProgress);
        assert!("in-progress".parse::<ProductionOrderStatus>().is_err());
    }

    #[test]
    fn priority_defaults_to_medium() {
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!("URGENT".parse::<Priority>().unwrap(), Priority::Urgent);
    }
}
