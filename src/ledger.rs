use crate::coins;
use crate::error::{LedgerError, LedgerResult};
use crate::model::{AttendanceRecord, AttendanceStatus, Method, SOURCE_ATTENDANCE};
use crate::store::Store;
use serde::Serialize;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct SessionInput<'a> {
    pub class_id: &'a str,
    pub present: &'a [String],
    pub absent: &'a [String],
    pub late: &'a [String],
    pub method: Method,
    pub recorder_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutcome {
    pub record: AttendanceRecord,
    pub coins_awarded: i64,
    pub credited_students: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttendanceStats {
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    /// Present plus late.
    pub attended: usize,
    pub total: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRow {
    pub record_id: String,
    pub date: String,
    pub class_id: String,
    pub class_name: String,
    pub status: &'static str,
    pub method: Method,
}

/// Appends one attendance session and credits every present or late
/// student `award` coins.
pub fn record_session(
    store: &mut Store,
    input: SessionInput<'_>,
    award: i64,
) -> LedgerResult<SessionOutcome> {
    store.require_class(input.class_id)?;
    store.require_user(input.recorder_id)?;

    let roster: HashSet<&str> = store
        .roster(input.class_id)
        .into_iter()
        .map(|u| u.id.as_str())
        .collect();
    let mut seen: HashSet<&str> = HashSet::new();
    for id in input
        .present
        .iter()
        .chain(input.absent)
        .chain(input.late)
        .map(String::as_str)
    {
        if !seen.insert(id) {
            return Err(LedgerError::OverlappingSets(id.to_string()));
        }
        if !roster.contains(id) {
            return Err(LedgerError::NotOnRoster {
                class_id: input.class_id.to_string(),
                student_id: id.to_string(),
            });
        }
    }

    if award > 0 {
        for student_id in input.present.iter().chain(input.late) {
            let coins = store.require_student(student_id)?.coins();
            if coins.checked_add(award).is_none() {
                return Err(LedgerError::BalanceOverflow {
                    student_id: student_id.clone(),
                    amount: award,
                });
            }
        }
    }

    let now = chrono::Utc::now();
    let record = AttendanceRecord {
        id: format!("att-{}", Uuid::new_v4()),
        class_id: input.class_id.to_string(),
        date: now.date_naive().to_string(),
        present_student_ids: input.present.to_vec(),
        absent_student_ids: input.absent.to_vec(),
        late_student_ids: input.late.to_vec(),
        method: input.method,
        saved_by: input.recorder_id.to_string(),
        timestamp: now.to_rfc3339(),
    };
    store.push_attendance_record(record.clone());

    let mut credited = 0usize;
    if award > 0 {
        for student_id in input.present.iter().chain(input.late) {
            coins::award(
                store,
                student_id,
                award,
                SOURCE_ATTENDANCE,
                Some(input.class_id),
            )?;
            credited += 1;
        }
    }

    info!(
        record_id = %record.id,
        class_id = input.class_id,
        present = input.present.len(),
        absent = input.absent.len(),
        late = input.late.len(),
        method = ?input.method,
        "attendance recorded"
    );

    Ok(SessionOutcome {
        coins_awarded: award.max(0).saturating_mul(credited as i64),
        credited_students: credited,
        record,
    })
}

/// Late marks are reported on their own but count as attended.
pub fn compute_attendance(store: &Store, student_id: &str) -> AttendanceStats {
    let mut present = 0usize;
    let mut absent = 0usize;
    let mut late = 0usize;
    for rec in store.attendance_records() {
        match rec.status_of(student_id) {
            Some(AttendanceStatus::Present) => present += 1,
            Some(AttendanceStatus::Late) => late += 1,
            Some(AttendanceStatus::Absent) => absent += 1,
            None => {}
        }
    }
    let total = present + absent + late;
    AttendanceStats {
        present,
        absent,
        late,
        attended: present + late,
        total,
        percentage: percentage(present + late, total),
    }
}

/// Half-up rounding of `100 * attended / total`; 0 when nothing was recorded.
pub fn percentage(attended: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((200 * attended + total) / (2 * total)) as u32
}

/// The student's sessions, newest date first. Same-day sessions keep the
/// later-recorded one on top.
pub fn student_history(store: &Store, student_id: &str) -> Vec<HistoryRow> {
    let mut rows: Vec<(usize, HistoryRow)> = store
        .attendance_records()
        .iter()
        .enumerate()
        .filter_map(|(idx, rec)| {
            let status = rec.status_of(student_id)?;
            let class_name = store
                .class(&rec.class_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| "Unknown".to_string());
            Some((
                idx,
                HistoryRow {
                    record_id: rec.id.clone(),
                    date: rec.date.clone(),
                    class_id: rec.class_id.clone(),
                    class_name,
                    status: status.label(),
                    method: rec.method,
                },
            ))
        })
        .collect();
    rows.sort_by(|(ia, a), (ib, b)| b.date.cmp(&a.date).then(ib.cmp(ia)));
    rows.into_iter().map(|(_, r)| r).collect()
}

pub fn class_history<'a>(store: &'a Store, class_id: &str) -> Vec<&'a AttendanceRecord> {
    let mut recs: Vec<(usize, &AttendanceRecord)> = store
        .attendance_records()
        .iter()
        .enumerate()
        .filter(|(_, r)| r.class_id == class_id)
        .collect();
    recs.sort_by(|(ia, a), (ib, b)| b.date.cmp(&a.date).then(ib.cmp(ia)));
    recs.into_iter().map(|(_, r)| r).collect()
}

pub fn records_on<'a>(
    store: &'a Store,
    date: &str,
) -> impl Iterator<Item = &'a AttendanceRecord> + 'a {
    let date = date.to_string();
    store
        .attendance_records()
        .iter()
        .filter(move |r| r.date == date)
}
