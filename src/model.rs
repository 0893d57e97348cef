use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Faculty,
    Student,
    Parent,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "faculty" => Some(Role::Faculty),
            "student" => Some(Role::Student),
            "parent" => Some(Role::Parent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    /// Only moved through `Store::post_coin_transaction`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    coins: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    /// Fixture fields this crate does not interpret (department, year, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn coins(&self) -> i64 {
        self.coins.unwrap_or(0)
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    /// Leaves the balance untouched and returns `None` when the result
    /// would not fit in an `i64`.
    pub(crate) fn apply_coin_delta(&mut self, delta: i64) -> Option<i64> {
        let next = self.coins().checked_add(delta)?;
        self.coins = Some(next);
        Some(next)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: String,
    #[serde(default)]
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub faculty_id: String,
    #[serde(default)]
    pub total_students: u32,
    #[serde(default)]
    pub room: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Ai,
    Manual,
}

impl Method {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ai" => Some(Method::Ai),
            "manual" => Some(Method::Manual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
}

impl AttendanceStatus {
    pub fn label(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Late => "Late",
            AttendanceStatus::Absent => "Absent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub class_id: String,
    pub date: String,
    #[serde(default)]
    pub present_student_ids: Vec<String>,
    #[serde(default)]
    pub absent_student_ids: Vec<String>,
    #[serde(default)]
    pub late_student_ids: Vec<String>,
    pub method: Method,
    #[serde(default)]
    pub saved_by: String,
    #[serde(default)]
    pub timestamp: String,
}

impl AttendanceRecord {
    pub fn status_of(&self, student_id: &str) -> Option<AttendanceStatus> {
        if self.present_student_ids.iter().any(|s| s == student_id) {
            Some(AttendanceStatus::Present)
        } else if self.late_student_ids.iter().any(|s| s == student_id) {
            Some(AttendanceStatus::Late)
        } else if self.absent_student_ids.iter().any(|s| s == student_id) {
            Some(AttendanceStatus::Absent)
        } else {
            None
        }
    }

    pub fn involves(&self, student_id: &str) -> bool {
        self.status_of(student_id).is_some()
    }
}

pub const SOURCE_ATTENDANCE: &str = "attendance";
pub const SOURCE_PURCHASE: &str = "purchase";
pub const SOURCE_BONUS: &str = "bonus";
pub const SOURCE_OPENING: &str = "opening";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinTransaction {
    pub date: String,
    pub amount: i64,
    pub source: String,
    #[serde(default)]
    pub class_id: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinHistory {
    pub student_id: String,
    #[serde(default)]
    pub transactions: Vec<CoinTransaction>,
}

impl CoinHistory {
    /// `None` when the amounts overflow an `i64`.
    pub fn checked_sum(&self) -> Option<i64> {
        self.transactions
            .iter()
            .try_fold(0i64, |acc, t| acc.checked_add(t.amount))
    }

    pub fn sum(&self) -> i64 {
        self.transactions
            .iter()
            .fold(0i64, |acc, t| acc.saturating_add(t.amount))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveApplication {
    pub id: String,
    pub student_id: String,
    #[serde(default)]
    pub student_name: String,
    pub class_id: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub details: String,
    pub start_date: String,
    pub end_date: String,
    pub status: LeaveStatus,
    #[serde(default)]
    pub submitted_at: String,
    #[serde(default)]
    pub faculty_comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreItem {
    pub id: String,
    pub name: String,
    pub price: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub student_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub coins: i64,
    #[serde(default)]
    pub achievements: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Seed dataset as shipped with the dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub classes: Vec<Class>,
    #[serde(default)]
    pub attendance_records: Vec<AttendanceRecord>,
    #[serde(default)]
    pub leave_applications: Vec<LeaveApplication>,
    #[serde(default)]
    pub leaderboard: Vec<LeaderboardEntry>,
    #[serde(default)]
    pub store_items: Vec<StoreItem>,
    #[serde(default)]
    pub coin_history: Vec<CoinHistory>,
}

/// The mutable subset written under `attendanceData`. A missing key means the
/// collection was never persisted and the fixture copy stands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendance_records: Option<Vec<AttendanceRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leave_applications: Option<Vec<LeaveApplication>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coin_history: Option<Vec<CoinHistory>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<User>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_keeps_unknown_fixture_fields() {
        let raw = json!({
            "id": "s1",
            "name": "Asha",
            "role": "student",
            "classId": "c1",
            "coins": 40,
            "department": "CSE"
        });
        let user: User = serde_json::from_value(raw.clone()).expect("parse user");
        assert_eq!(user.coins(), 40);
        assert_eq!(user.extra.get("department"), Some(&json!("CSE")));
        assert_eq!(serde_json::to_value(&user).expect("encode"), raw);
    }

    #[test]
    fn record_without_late_set_parses() {
        let rec: AttendanceRecord = serde_json::from_value(json!({
            "id": "att1",
            "classId": "c1",
            "date": "2024-01-15",
            "presentStudentIds": ["s1"],
            "absentStudentIds": ["s2"],
            "method": "manual"
        }))
        .expect("parse record");
        assert!(rec.late_student_ids.is_empty());
        assert_eq!(rec.status_of("s1"), Some(AttendanceStatus::Present));
        assert_eq!(rec.status_of("s2"), Some(AttendanceStatus::Absent));
        assert_eq!(rec.status_of("s9"), None);
    }

    #[test]
    fn delta_omits_missing_collections() {
        let delta = PersistedDelta {
            users: Some(vec![]),
            ..Default::default()
        };
        let v = serde_json::to_value(&delta).expect("encode");
        assert_eq!(v, json!({ "users": [] }));
    }
}
