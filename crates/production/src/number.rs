//! Human-readable order numbers: `PO-<year>-<seq>`.

use serde::{Deserialize, Serialize};

use shopfloor_core::DomainError;

/// Highest sequence that still fits the four-digit format.
pub const MAX_SEQUENCE: u32 = 9999;

const PREFIX: &str = "PO-";

/// A validated order number such as `PO-2025-0042`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber {
    year: i32,
    sequence: u32,
}

impl OrderNumber {
    pub fn new(year: i32, sequence: u32) -> Result<Self, DomainError> {
        if !(1000..=9999).contains(&year) {
            return Err(DomainError::validation("order_number", "year must have four digits"));
        }
        if sequence == 0 || sequence > MAX_SEQUENCE {
            return Err(DomainError::validation(
                "order_number",
                "sequence must be between 1 and 9999",
            ));
        }
        Ok(Self { year, sequence })
    }

    /// The number following `last` in `year` (or the first of the year).
    ///
    /// Fails with `Conflict` once the year's sequence space is used up.
    pub fn next_after(year: i32, last: Option<u32>) -> Result<Self, DomainError> {
        let sequence = last.unwrap_or(0) + 1;
        if sequence > MAX_SEQUENCE {
            return Err(DomainError::conflict(format!(
                "order number sequence for {year} is exhausted"
            )));
        }
        Self::new(year, sequence)
    }

    pub fn parse(value: &str) -> Result<Self, DomainError> {
        let invalid = || DomainError::validation("order_number", "expected PO-<year>-<4-digit sequence>");

        let rest = value.strip_prefix(PREFIX).ok_or_else(invalid)?;
        let (year, seq) = rest.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || seq.len() != 4 {
            return Err(invalid());
        }
        if !year.bytes().chain(seq.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let seq: u32 = seq.parse().map_err(|_| invalid())?;
        Self::new(year, seq)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl core::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{PREFIX}{}-{:04}", self.year, self.sequence)
    }
}

impl core::str::FromStr for OrderNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrderNumber> for String {
    fn from(value: OrderNumber) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_number_of_the_year() {
        let n = OrderNumber::next_after(2025, None).unwrap();
        assert_eq!(n.to_string(), "PO-2025-0001");
    }

    #[test]
    fn continues_after_last() {
        let n = OrderNumber::next_after(2025, Some(41)).unwrap();
        assert_eq!(n.to_string(), "PO-2025-0042");
    }

    #[test]
    fn exhausted_sequence_is_conflict() {
        assert!(matches!(
            OrderNumber::next_after(2025, Some(MAX_SEQUENCE)),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn rejects_malformed_numbers() {
        for bad in ["PO-25-0001", "PO-2025-1", "SO-2025-0001", "PO-2025-00a1", "PO-2025-0000", "PO-2025"] {
            assert!(OrderNumber::parse(bad).is_err(), "{bad}");
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: every generated number matches `PO-<year>-<4 digits>`
        /// and parses back to the same year and sequence.
        #[test]
        fn generated_numbers_match_format(year in 1000i32..=9999, last in 0u32..MAX_SEQUENCE) {
            let n = OrderNumber::next_after(year, Some(last)).unwrap();
            let text = n.to_string();

            prop_assert_eq!(text.len(), "PO-2025-0001".len());
            let prefix = format!("PO-{year}-");
            prop_assert!(text.starts_with(&prefix));

            let parsed = OrderNumber::parse(&text).unwrap();
            prop_assert_eq!(parsed.year(), year);
            prop_assert_eq!(parsed.sequence(), last + 1);
        }
    }
}
