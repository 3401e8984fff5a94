//! Request and response bodies.

use model_registry::{Cell, CellKind, Frame};
use serde::{Deserialize, Serialize};

/// Model input columns and the kind of value each carries, in frame order.
pub const COLUMNS: [(&str, CellKind); 9] = [
    ("Age", CellKind::Integer),
    ("Gender", CellKind::String),
    ("Class", CellKind::String),
    ("Study_Hours_Per_Day", CellKind::Float),
    ("Attendance_Percentage", CellKind::Float),
    ("Parental_Education", CellKind::String),
    ("Internet_Access", CellKind::String),
    ("Extracurricular_Activities", CellKind::String),
    ("Previous_Year_Score", CellKind::Float),
];

/// One student's attributes. Unknown fields are ignored; integers are accepted
/// for float fields but not the reverse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    #[serde(rename = "Age")]
    pub age: i64,
    #[serde(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "Class")]
    pub class: String,
    #[serde(rename = "Study_Hours_Per_Day")]
    pub study_hours_per_day: f64,
    /// Expected 0..=100, not enforced.
    #[serde(rename = "Attendance_Percentage")]
    pub attendance_percentage: f64,
    #[serde(rename = "Parental_Education")]
    pub parental_education: String,
    #[serde(rename = "Internet_Access")]
    pub internet_access: String,
    #[serde(rename = "Extracurricular_Activities")]
    pub extracurricular_activities: String,
    #[serde(rename = "Previous_Year_Score")]
    pub previous_year_score: f64,
}

impl StudentRecord {
    /// One-row frame with the columns of [`COLUMNS`].
    pub fn into_frame(self) -> Frame {
        let cells: [Cell; 9] = [
            Cell::Int(self.age),
            Cell::Str(self.gender),
            Cell::Str(self.class),
            Cell::Float(self.study_hours_per_day),
            Cell::Float(self.attendance_percentage),
            Cell::Str(self.parental_education),
            Cell::Str(self.internet_access),
            Cell::Str(self.extracurricular_activities),
            Cell::Float(self.previous_year_score),
        ];
        Frame::single_row(COLUMNS.into_iter().map(|(name, _)| name).zip(cells))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub predicted_final_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
}

impl LivenessResponse {
    pub fn running() -> Self { Self { status: "API is running".to_string() } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}
