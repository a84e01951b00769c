use crate::taxonomy::{default_levels, LevelDefinition, LevelTaxonomy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const FALLBACK_BG: &str = "#6B7280";
pub const LIGHT_TEXT: &str = "#ffffff";
pub const DARK_TEXT: &str = "#374151";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_name: Option<String>,
    /// Hidden teachers keep their cells on screen but never count as a
    /// class's teacher or room holder.
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomGroup {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub class_ids: Vec<String>,
    #[serde(default)]
    pub compress_periods: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherColor {
    pub bg: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimetableConfig {
    pub first_period: u32,
    pub last_period: u32,
    /// Adjacent period pairs `(keep, folded)` merged for compressed groups.
    pub compressed_pairs: Vec<(u32, u32)>,
    pub max_level_number: u32,
    pub levels: Vec<LevelDefinition>,
    pub teachers: Vec<Teacher>,
    pub custom_groups: Vec<CustomGroup>,
    pub default_colors: BTreeMap<String, TeacherColor>,
}

impl Default for TimetableConfig {
    fn default() -> Self {
        Self {
            first_period: 1,
            last_period: 10,
            compressed_pairs: vec![(5, 6)],
            max_level_number: 6,
            levels: default_levels(),
            teachers: Vec::new(),
            custom_groups: Vec::new(),
            default_colors: BTreeMap::new(),
        }
    }
}

impl TimetableConfig {
    pub fn taxonomy(&self) -> LevelTaxonomy {
        LevelTaxonomy::new(self.levels.clone(), self.max_level_number)
    }

    pub fn find_teacher(&self, name: &str) -> Option<&Teacher> {
        self.teachers
            .iter()
            .find(|t| t.name == name || t.alt_name.as_deref() == Some(name))
    }

    pub fn is_hidden_teacher(&self, name: &str) -> bool {
        self.find_teacher(name).map(|t| t.hidden).unwrap_or(false)
    }

    /// Group containing the class. Members are matched by id, or by name for
    /// groups saved before classes had ids.
    pub fn group_for_class(&self, class_id: Option<&str>, class_name: &str) -> Option<&CustomGroup> {
        self.custom_groups.iter().find(|g| {
            g.class_ids
                .iter()
                .any(|c| Some(c.as_str()) == class_id || c == class_name)
        })
    }

    pub fn teacher_color(&self, name: &str) -> TeacherColor {
        if let Some(bg) = self.find_teacher(name).and_then(|t| t.bg_color.clone()) {
            let text = self
                .find_teacher(name)
                .and_then(|t| t.text_color.clone())
                .unwrap_or_else(|| LIGHT_TEXT.to_string());
            return TeacherColor { bg, text };
        }
        if let Some(c) = self.default_colors.get(name) {
            return c.clone();
        }
        TeacherColor {
            bg: FALLBACK_BG.to_string(),
            text: LIGHT_TEXT.to_string(),
        }
    }

    /// Config sanity checks applied before a patched config is saved.
    pub fn validate(&self) -> Result<(), String> {
        if self.first_period == 0 || self.first_period > self.last_period {
            return Err("firstPeriod must be >= 1 and <= lastPeriod".into());
        }
        if self.max_level_number == 0 {
            return Err("maxLevelNumber must be >= 1".into());
        }
        for (keep, folded) in &self.compressed_pairs {
            if folded != &(keep + 1) {
                return Err(format!(
                    "compressedPairs entry ({keep}, {folded}) is not an adjacent pair"
                ));
            }
        }
        self.taxonomy().check_order()
    }
}

/// Readable text colour for a `#rrggbb` background.
pub fn contrast_text_color(bg: Option<&str>) -> &'static str {
    let Some(hex) = bg.and_then(|s| s.strip_prefix('#')) else {
        return DARK_TEXT;
    };
    if hex.len() != 6 || !hex.is_ascii() {
        return DARK_TEXT;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let (Some(r), Some(g), Some(b)) = (channel(0), channel(2), channel(4)) else {
        return DARK_TEXT;
    };
    let luminance = (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000;
    if luminance > 128 {
        DARK_TEXT
    } else {
        LIGHT_TEXT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teacher(name: &str) -> Teacher {
        Teacher {
            id: name.to_lowercase(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn teacher_color_prefers_roster_then_defaults() {
        let mut cfg = TimetableConfig::default();
        cfg.teachers.push(Teacher {
            bg_color: Some("#ff0000".into()),
            text_color: Some("#ffffff".into()),
            ..teacher("김선생")
        });
        cfg.teachers.push(Teacher {
            alt_name: Some("John".into()),
            bg_color: Some("#00ff00".into()),
            ..teacher("존")
        });
        cfg.default_colors.insert(
            "Teacher1".into(),
            TeacherColor {
                bg: "#3B82F6".into(),
                text: "#ffffff".into(),
            },
        );

        assert_eq!(cfg.teacher_color("김선생").bg, "#ff0000");
        assert_eq!(
            cfg.teacher_color("John"),
            TeacherColor {
                bg: "#00ff00".into(),
                text: "#ffffff".into()
            }
        );
        assert_eq!(cfg.teacher_color("Teacher1").bg, "#3B82F6");
        assert_eq!(cfg.teacher_color("Unknown").bg, FALLBACK_BG);
    }

    #[test]
    fn contrast_picks_dark_text_on_light_backgrounds() {
        assert_eq!(contrast_text_color(Some("#ffffff")), DARK_TEXT);
        assert_eq!(contrast_text_color(Some("#fef08a")), DARK_TEXT);
        assert_eq!(contrast_text_color(Some("#000000")), LIGHT_TEXT);
        assert_eq!(contrast_text_color(Some("#1e3a5f")), LIGHT_TEXT);
        assert_eq!(contrast_text_color(None), DARK_TEXT);
        assert_eq!(contrast_text_color(Some("invalid")), DARK_TEXT);
    }

    #[test]
    fn validate_rejects_non_adjacent_pairs() {
        let mut cfg = TimetableConfig::default();
        assert!(cfg.validate().is_ok());
        cfg.compressed_pairs = vec![(5, 7)];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: TimetableConfig =
            serde_json::from_value(serde_json::json!({ "lastPeriod": 8 })).expect("config");
        assert_eq!(cfg.last_period, 8);
        assert_eq!(cfg.first_period, 1);
        assert_eq!(cfg.max_level_number, 6);
        assert_eq!(cfg.levels.len(), default_levels().len());
    }
}
