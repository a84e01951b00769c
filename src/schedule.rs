use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Full schedule table as pushed by storage: slot key → cell.
pub type Snapshot = BTreeMap<String, ScheduleCell>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    #[serde(rename = "월")]
    Mon,
    #[serde(rename = "화")]
    Tue,
    #[serde(rename = "수")]
    Wed,
    #[serde(rename = "목")]
    Thu,
    #[serde(rename = "금")]
    Fri,
    #[serde(rename = "토")]
    Sat,
    #[serde(rename = "일")]
    Sun,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    pub const STANDARD: [Weekday; 5] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ];

    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.code() == code)
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Mon => "월",
            Self::Tue => "화",
            Self::Wed => "수",
            Self::Thu => "목",
            Self::Fri => "금",
            Self::Sat => "토",
            Self::Sun => "일",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_weekend(self) -> bool {
        matches!(self, Self::Sat | Self::Sun)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodDef {
    pub id: u32,
    pub label: String,
    pub time: String,
}

impl PeriodDef {
    fn new(id: u32, start: &str, end: &str) -> Self {
        Self {
            id,
            label: format!("{id}교시"),
            time: format!("{start}~{end}"),
        }
    }
}

/// Standard ten-period weekday table.
pub fn standard_periods() -> Vec<PeriodDef> {
    vec![
        PeriodDef::new(1, "14:20", "15:00"),
        PeriodDef::new(2, "15:00", "15:40"),
        PeriodDef::new(3, "15:40", "16:20"),
        PeriodDef::new(4, "16:20", "17:00"),
        PeriodDef::new(5, "17:00", "17:40"),
        PeriodDef::new(6, "17:40", "18:20"),
        PeriodDef::new(7, "18:20", "19:15"),
        PeriodDef::new(8, "19:15", "20:10"),
        PeriodDef::new(9, "20:10", "21:05"),
        PeriodDef::new(10, "21:05", "22:00"),
    ]
}

/// Another class sharing the exact slot of a cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedStub {
    pub class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher: Option<String>,
    #[serde(default)]
    pub emphasis: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleCell {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher: Option<String>,
    #[serde(default)]
    pub emphasis: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merged: Vec<MergedStub>,
}

impl ScheduleCell {
    /// Merged stubs with blanks, self references and repeated names removed.
    pub fn distinct_merged(&self) -> Vec<MergedStub> {
        let mut seen: Vec<&str> = Vec::new();
        if let Some(own) = self.class_name.as_deref() {
            seen.push(own);
        }
        let mut out = Vec::new();
        for stub in &self.merged {
            let name = stub.class_name.trim();
            if name.is_empty() || seen.contains(&name) {
                continue;
            }
            seen.push(name);
            out.push(stub.clone());
        }
        out
    }

    /// Rewrites every reference to `old` (primary or stub). Returns the number of hits.
    pub fn rename_class(&mut self, old: &str, new: &str) -> usize {
        let mut hits = 0;
        if self.class_name.as_deref() == Some(old) {
            self.class_name = Some(new.to_string());
            hits += 1;
        }
        for stub in &mut self.merged {
            if stub.class_name == old {
                stub.class_name = new.to_string();
                hits += 1;
            }
        }
        hits
    }
}

/// Every class named anywhere in the snapshot, merged stubs included.
pub fn class_names(snapshot: &Snapshot) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for cell in snapshot.values() {
        if let Some(name) = cell.class_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            out.insert(name.to_string());
        }
        for stub in &cell.merged {
            let name = stub.class_name.trim();
            if !name.is_empty() {
                out.insert(name.to_string());
            }
        }
    }
    out
}
