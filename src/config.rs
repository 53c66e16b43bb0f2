use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE: &str = "rosterd.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TableNaming {
    /// One table per class: `{class}`.
    PerClass,
    /// One table per class and purpose: `{class}_{purpose}`.
    PerPurpose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Attendance,
    Scores,
}

/// What to do with stored attendance values when a date column is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttendanceOnLoad {
    /// Keep stored values, fill only missing cells with Present.
    Preserve,
    /// Start every open from all-Present, discarding stored values for that date.
    ResetToPresent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColumnNames {
    pub seat: String,
    pub name: String,
    pub gender: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            seat: "seat".to_string(),
            name: "name".to_string(),
            gender: "gender".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenderLabels {
    pub male: String,
    pub female: String,
}

impl Default for GenderLabels {
    fn default() -> Self {
        Self {
            male: "male".to_string(),
            female: "female".to_string(),
        }
    }
}

/// Text written into the sheet for each attendance state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttendanceLabels {
    pub present: String,
    pub late: String,
    pub absent: String,
    pub excused: String,
}

impl Default for AttendanceLabels {
    fn default() -> Self {
        Self {
            present: "Present".to_string(),
            late: "Late".to_string(),
            absent: "Absent".to_string(),
            excused: "Excused".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub classes: Vec<String>,
    pub table_naming: TableNaming,
    pub attendance_suffix: String,
    pub scores_suffix: String,
    pub columns: ColumnNames,
    pub gender_labels: GenderLabels,
    pub attendance_labels: AttendanceLabels,
    pub attendance_on_load: AttendanceOnLoad,
    pub suggested_items: Vec<String>,
    pub custom_item_default: String,
    pub preview_cache_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            classes: ["402", "601", "602", "603", "604"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            table_naming: TableNaming::PerPurpose,
            attendance_suffix: "attendance".to_string(),
            scores_suffix: "scores".to_string(),
            columns: ColumnNames::default(),
            gender_labels: GenderLabels::default(),
            attendance_labels: AttendanceLabels::default(),
            attendance_on_load: AttendanceOnLoad::Preserve,
            suggested_items: [
                "Fitness - 800m",
                "Fitness - Curl-ups",
                "Fitness - Standing long jump",
                "Fitness - Sit and reach",
                "Daily grade",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            custom_item_default: "Custom test".to_string(),
            preview_cache_secs: 0,
        }
    }
}

impl Config {
    pub fn table_name(&self, class_id: &str, purpose: Purpose) -> String {
        match self.table_naming {
            TableNaming::PerClass => class_id.to_string(),
            TableNaming::PerPurpose => {
                let suffix = match purpose {
                    Purpose::Attendance => &self.attendance_suffix,
                    Purpose::Scores => &self.scores_suffix,
                };
                format!("{}_{}", class_id, suffix)
            }
        }
    }

    pub fn has_class(&self, class_id: &str) -> bool {
        self.classes.iter().any(|c| c == class_id)
    }
}

/// Reads `rosterd.json` from the workspace. A missing file means defaults.
pub fn load_config(workspace: &Path) -> anyhow::Result<Config> {
    let path = workspace.join(CONFIG_FILE);
    if !path.is_file() {
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {}", path.to_string_lossy()))
}
