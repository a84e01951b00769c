//! Class-name grammar (`ABBREVIATION DIGITS [SUFFIX]`, e.g. `DP3`, `RTT6a`)
//! and the level transitions built on it.
//!
//! A number transition keeps the level and moves the ordinal (`DP3` → `DP4`).
//! A class transition moves to the adjacent level and restarts at 1
//! (`DP3a` → `PL1a`). Committing a transition is the store's job; see
//! `db::rename_class`.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDefinition {
    pub id: String,
    pub abbreviation: String,
    pub full_name: String,
    pub order: u32,
}

impl LevelDefinition {
    fn new(order: u32, abbreviation: &str, full_name: &str) -> Self {
        Self {
            id: abbreviation.to_ascii_lowercase(),
            abbreviation: abbreviation.to_string(),
            full_name: full_name.to_string(),
            order,
        }
    }
}

pub fn default_levels() -> Vec<LevelDefinition> {
    vec![
        LevelDefinition::new(1, "DP", "Dr. Phonics"),
        LevelDefinition::new(2, "PL", "Pre Let's"),
        LevelDefinition::new(3, "RTT", "Ready To Talk"),
        LevelDefinition::new(4, "LT", "Let's Talk"),
        LevelDefinition::new(5, "RTS", "Ready To Speak"),
        LevelDefinition::new(6, "LS", "Let's Speak"),
        LevelDefinition::new(7, "LE", "Let's Express"),
        LevelDefinition::new(8, "KW", "Kopi Wang"),
        LevelDefinition::new(9, "PJ", "Pre Junior"),
        LevelDefinition::new(10, "JP", "Junior Plus"),
        LevelDefinition::new(11, "MEC", "Middle School English Course"),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedClassName {
    pub level_abbr: String,
    pub number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<char>,
}

impl fmt::Display for ParsedClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.level_abbr, self.number)?;
        if let Some(s) = self.suffix {
            write!(f, "{s}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassNameError {
    #[error("class name is empty")]
    Empty,
    #[error("class name {0:?} does not start with a level abbreviation")]
    MissingAbbreviation(String),
    #[error("class name {0:?} has no level number")]
    MissingNumber(String),
    #[error("class name {0:?} has an invalid level number")]
    InvalidNumber(String),
    #[error("class name {0:?} has unexpected trailing text")]
    TrailingText(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LevelError {
    #[error(transparent)]
    InvalidName(#[from] ClassNameError),
    #[error("level number is already at the maximum ({0})")]
    AtMaxNumber(u32),
    #[error("level number is already at 1")]
    AtMinNumber,
    #[error("class not registered in level settings: {0}")]
    NotRegistered(String),
    #[error("{0} is already the highest level")]
    AtTopLevel(String),
    #[error("{0} is already the lowest level")]
    AtBottomLevel(String),
}

pub fn parse_class_name(name: &str) -> Result<ParsedClassName, ClassNameError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ClassNameError::Empty);
    }

    let abbr_len = name
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(name.len());
    if abbr_len == 0 {
        return Err(ClassNameError::MissingAbbreviation(name.to_string()));
    }
    let (abbr, rest) = name.split_at(abbr_len);

    let digits_len = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_len == 0 {
        return Err(ClassNameError::MissingNumber(name.to_string()));
    }
    let (digits, rest) = rest.split_at(digits_len);
    let number: u32 = digits
        .parse()
        .map_err(|_| ClassNameError::InvalidNumber(name.to_string()))?;
    if number == 0 {
        return Err(ClassNameError::InvalidNumber(name.to_string()));
    }

    let mut tail = rest.chars();
    let suffix = match (tail.next(), tail.next()) {
        (None, _) => None,
        (Some(c), None) if c.is_ascii_alphabetic() => Some(c),
        _ => return Err(ClassNameError::TrailingText(name.to_string())),
    };

    Ok(ParsedClassName {
        level_abbr: abbr.to_string(),
        number,
        suffix,
    })
}

pub fn build_class_name(parsed: &ParsedClassName) -> String {
    parsed.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransitionKind {
    NumberUp,
    NumberDown,
    ClassUp,
    ClassDown,
}

impl TransitionKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "numberUp" => Some(Self::NumberUp),
            "numberDown" => Some(Self::NumberDown),
            "classUp" => Some(Self::ClassUp),
            "classDown" => Some(Self::ClassDown),
            _ => None,
        }
    }
}

/// A proposed rename, not yet committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenamePlan {
    pub old_name: String,
    pub new_name: String,
    pub kind: TransitionKind,
}

/// Ordered level list plus the ordinal ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelTaxonomy {
    levels: Vec<LevelDefinition>,
    max_number: u32,
}

impl Default for LevelTaxonomy {
    fn default() -> Self {
        Self::new(default_levels(), 6)
    }
}

impl LevelTaxonomy {
    pub fn new(mut levels: Vec<LevelDefinition>, max_number: u32) -> Self {
        levels.sort_by_key(|l| l.order);
        Self { levels, max_number }
    }

    pub fn levels(&self) -> &[LevelDefinition] {
        &self.levels
    }

    pub fn max_number(&self) -> u32 {
        self.max_number
    }

    /// Orders and abbreviations must both be unique for transitions to be well defined.
    pub fn check_order(&self) -> Result<(), String> {
        for pair in self.levels.windows(2) {
            if pair[0].order == pair[1].order {
                return Err(format!(
                    "levels {} and {} share order {}",
                    pair[0].abbreviation, pair[1].abbreviation, pair[0].order
                ));
            }
        }
        for (i, level) in self.levels.iter().enumerate() {
            if level.abbreviation.is_empty()
                || !level.abbreviation.chars().all(|c| c.is_ascii_alphabetic())
            {
                return Err(format!(
                    "level abbreviation {:?} must be ASCII letters",
                    level.abbreviation
                ));
            }
            if self.levels[..i]
                .iter()
                .any(|l| l.abbreviation == level.abbreviation)
            {
                return Err(format!("duplicate level abbreviation {}", level.abbreviation));
            }
        }
        Ok(())
    }

    fn position(&self, abbr: &str) -> Option<usize> {
        self.levels.iter().position(|l| l.abbreviation == abbr)
    }

    pub fn is_valid_level(&self, name: &str) -> bool {
        parse_class_name(name)
            .ok()
            .and_then(|p| self.position(&p.level_abbr))
            .is_some()
    }

    pub fn is_max_level(&self, name: &str) -> bool {
        parse_class_name(name)
            .ok()
            .and_then(|p| self.position(&p.level_abbr))
            .map(|i| i + 1 == self.levels.len())
            .unwrap_or(false)
    }

    pub fn is_min_level(&self, name: &str) -> bool {
        parse_class_name(name)
            .ok()
            .and_then(|p| self.position(&p.level_abbr))
            .map(|i| i == 0)
            .unwrap_or(false)
    }

    pub fn can_number_level_up(&self, name: &str) -> bool {
        parse_class_name(name)
            .map(|p| p.number < self.max_number)
            .unwrap_or(false)
    }

    pub fn can_number_level_down(&self, name: &str) -> bool {
        parse_class_name(name)
            .map(|p| p.number > 1)
            .unwrap_or(false)
    }

    pub fn number_level_up(&self, name: &str) -> Result<String, LevelError> {
        let mut p = parse_class_name(name)?;
        if p.number >= self.max_number {
            return Err(LevelError::AtMaxNumber(self.max_number));
        }
        p.number += 1;
        Ok(build_class_name(&p))
    }

    pub fn number_level_down(&self, name: &str) -> Result<String, LevelError> {
        let mut p = parse_class_name(name)?;
        if p.number <= 1 {
            return Err(LevelError::AtMinNumber);
        }
        p.number -= 1;
        Ok(build_class_name(&p))
    }

    pub fn class_level_up(&self, name: &str) -> Result<String, LevelError> {
        let p = parse_class_name(name)?;
        let idx = self
            .position(&p.level_abbr)
            .ok_or_else(|| LevelError::NotRegistered(p.level_abbr.clone()))?;
        let next = self
            .levels
            .get(idx + 1)
            .ok_or_else(|| LevelError::AtTopLevel(p.level_abbr.clone()))?;
        Ok(build_class_name(&ParsedClassName {
            level_abbr: next.abbreviation.clone(),
            number: 1,
            suffix: p.suffix,
        }))
    }

    pub fn class_level_down(&self, name: &str) -> Result<String, LevelError> {
        let p = parse_class_name(name)?;
        let idx = self
            .position(&p.level_abbr)
            .ok_or_else(|| LevelError::NotRegistered(p.level_abbr.clone()))?;
        if idx == 0 {
            return Err(LevelError::AtBottomLevel(p.level_abbr));
        }
        Ok(build_class_name(&ParsedClassName {
            level_abbr: self.levels[idx - 1].abbreviation.clone(),
            number: 1,
            suffix: p.suffix,
        }))
    }

    pub fn plan_transition(&self, name: &str, kind: TransitionKind) -> Result<RenamePlan, LevelError> {
        let new_name = match kind {
            TransitionKind::NumberUp => self.number_level_up(name)?,
            TransitionKind::NumberDown => self.number_level_down(name)?,
            TransitionKind::ClassUp => self.class_level_up(name)?,
            TransitionKind::ClassDown => self.class_level_down(name)?,
        };
        Ok(RenamePlan {
            old_name: name.trim().to_string(),
            new_name,
            kind,
        })
    }
}
