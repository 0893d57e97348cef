use crate::error::LedgerResult;
use crate::model::{AttendanceRecord, CoinHistory, LeaveApplication, User};
use crate::store::Store;
use anyhow::Context;
use serde::Serialize;
use std::path::Path;

const UNKNOWN: &str = "Unknown";

/// One row per marked student per record: present, then late, then absent.
pub fn attendance_csv(store: &Store) -> anyhow::Result<String> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record(["Date", "Class", "Student", "Status"])?;
    for rec in store.attendance_records() {
        let class_name = store
            .class(&rec.class_id)
            .map(|c| c.name.as_str())
            .unwrap_or(UNKNOWN);
        let marks = [
            (&rec.present_student_ids, "Present"),
            (&rec.late_student_ids, "Late"),
            (&rec.absent_student_ids, "Absent"),
        ];
        for (ids, status) in marks {
            for id in ids {
                let student = store.user(id).map(|u| u.name.as_str()).unwrap_or(UNKNOWN);
                w.write_record([rec.date.as_str(), class_name, student, status])?;
            }
        }
    }
    let bytes = w
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush csv writer: {}", e.error()))?;
    String::from_utf8(bytes).context("csv output was not utf-8")
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDump {
    pub user: User,
    pub attendance: Vec<AttendanceRecord>,
    pub leaves: Vec<LeaveApplication>,
    pub coin_history: Option<CoinHistory>,
}

pub fn student_dump(store: &Store, student_id: &str) -> LedgerResult<StudentDump> {
    let user = store.require_student(student_id)?.clone();
    let attendance = store
        .attendance_records()
        .iter()
        .filter(|r| r.involves(student_id))
        .cloned()
        .collect();
    let leaves = store
        .leave_applications()
        .iter()
        .filter(|l| l.student_id == student_id)
        .cloned()
        .collect();
    Ok(StudentDump {
        user,
        attendance,
        leaves,
        coin_history: store.history_for(student_id).cloned(),
    })
}

pub fn write_out(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write {}", path.to_string_lossy()))
}
