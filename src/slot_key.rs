use std::fmt;

/// Separator used by stored schedule snapshots, e.g. `Teacher1-3-월`.
pub const DELIMITER: char = '-';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotKeyError {
    #[error("slot key component must not be empty")]
    EmptyComponent,
    #[error("slot key component {0:?} contains the '-' delimiter")]
    ContainsDelimiter(String),
}

/// One timetable coordinate: whose row, which period, which day.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    pub occupant: String,
    pub period_id: String,
    pub day: String,
}

impl SlotKey {
    /// Builds a key that is guaranteed to survive `decode(encode(..))`.
    pub fn new(occupant: &str, period_id: &str, day: &str) -> Result<Self, SlotKeyError> {
        for part in [occupant, period_id, day] {
            if part.is_empty() {
                return Err(SlotKeyError::EmptyComponent);
            }
            if part.contains(DELIMITER) {
                return Err(SlotKeyError::ContainsDelimiter(part.to_string()));
            }
        }
        Ok(Self {
            occupant: occupant.to_string(),
            period_id: period_id.to_string(),
            day: day.to_string(),
        })
    }

    pub fn parse(key: &str) -> Option<Self> {
        let (occupant, period_id, day) = decode(key)?;
        Some(Self {
            occupant,
            period_id,
            day,
        })
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(&self.occupant, &self.period_id, &self.day))
    }
}

pub fn encode(occupant: &str, period_id: &str, day: &str) -> String {
    format!("{occupant}{DELIMITER}{period_id}{DELIMITER}{day}")
}

/// Splits a key into exactly three non-empty parts. Anything else is `None`.
pub fn decode(key: &str) -> Option<(String, String, String)> {
    let mut parts = key.split(DELIMITER);
    let occupant = parts.next()?;
    let period_id = parts.next()?;
    let day = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    if occupant.is_empty() || period_id.is_empty() || day.is_empty() {
        return None;
    }
    Some((occupant.to_string(), period_id.to_string(), day.to_string()))
}
