use crate::error::{LedgerError, LedgerResult};
use crate::model::{LeaveApplication, LeaveStatus};
use crate::store::Store;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct LeaveRequest<'a> {
    pub student_id: &'a str,
    pub class_id: &'a str,
    pub reason: &'a str,
    pub details: &'a str,
    pub start_date: &'a str,
    pub end_date: &'a str,
}

fn parse_date(field: &str, raw: &str) -> LedgerResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        LedgerError::InvalidInput(format!("{} must be YYYY-MM-DD, got {:?}", field, raw))
    })
}

pub fn submit(store: &mut Store, req: LeaveRequest<'_>) -> LedgerResult<LeaveApplication> {
    let student_name = store.require_student(req.student_id)?.name.clone();
    let class_name = store.require_class(req.class_id)?.name.clone();
    let reason = req.reason.trim();
    if reason.is_empty() {
        return Err(LedgerError::InvalidInput("reason must not be empty".to_string()));
    }
    let start = parse_date("startDate", req.start_date)?;
    let end = parse_date("endDate", req.end_date)?;
    if start > end {
        return Err(LedgerError::InvalidInput(
            "startDate must not be after endDate".to_string(),
        ));
    }

    let application = LeaveApplication {
        id: format!("leave-{}", Uuid::new_v4()),
        student_id: req.student_id.to_string(),
        student_name,
        class_id: req.class_id.to_string(),
        class_name,
        reason: reason.to_string(),
        details: req.details.trim().to_string(),
        start_date: start.to_string(),
        end_date: end.to_string(),
        status: LeaveStatus::Pending,
        submitted_at: chrono::Utc::now().to_rfc3339(),
        faculty_comment: String::new(),
        approved_at: None,
        rejected_at: None,
    };
    store.push_leave(application.clone());
    info!(
        leave_id = %application.id,
        student_id = req.student_id,
        class_id = req.class_id,
        "leave submitted"
    );
    Ok(application)
}

pub fn parse_decision(raw: &str) -> LedgerResult<LeaveStatus> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "approved" | "approve" => Ok(LeaveStatus::Approved),
        "rejected" | "reject" => Ok(LeaveStatus::Rejected),
        other => Err(LedgerError::InvalidInput(format!(
            "decision must be approved or rejected, got {:?}",
            other
        ))),
    }
}

/// Moves a pending application to a terminal state. Anything not pending
/// is refused.
pub fn decide(
    store: &mut Store,
    application_id: &str,
    decision: LeaveStatus,
    comment: Option<&str>,
) -> LedgerResult<LeaveApplication> {
    if decision == LeaveStatus::Pending {
        return Err(LedgerError::InvalidInput(
            "decision must be approved or rejected".to_string(),
        ));
    }
    let app = store
        .leave_mut(application_id)
        .ok_or_else(|| LedgerError::LeaveNotFound(application_id.to_string()))?;
    if app.status != LeaveStatus::Pending {
        return Err(LedgerError::AlreadyDecided {
            id: app.id.clone(),
            status: app.status,
        });
    }

    let now = chrono::Utc::now().to_rfc3339();
    app.status = decision;
    app.faculty_comment = comment.map(str::trim).unwrap_or_default().to_string();
    match decision {
        LeaveStatus::Approved => app.approved_at = Some(now),
        LeaveStatus::Rejected => app.rejected_at = Some(now),
        LeaveStatus::Pending => {}
    }
    info!(leave_id = application_id, status = %decision, "leave decided");
    Ok(app.clone())
}

fn newest_first<'a, I>(apps: I) -> Vec<LeaveApplication>
where
    I: Iterator<Item = (usize, &'a LeaveApplication)>,
{
    let mut v: Vec<(Option<DateTime<FixedOffset>>, usize, &LeaveApplication)> = apps
        .map(|(idx, a)| (DateTime::parse_from_rfc3339(&a.submitted_at).ok(), idx, a))
        .collect();
    // Unparseable stamps sink to the bottom; index breaks ties.
    v.sort_by(|(ta, ia, _), (tb, ib, _)| tb.cmp(ta).then(ib.cmp(ia)));
    v.into_iter().map(|(_, _, a)| a.clone()).collect()
}

pub fn for_student(store: &Store, student_id: &str) -> Vec<LeaveApplication> {
    newest_first(
        store
            .leave_applications()
            .iter()
            .enumerate()
            .filter(|(_, l)| l.student_id == student_id),
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct FacultyLeaves {
    pub pending: Vec<LeaveApplication>,
    pub all: Vec<LeaveApplication>,
}

/// Applications for classes the faculty member teaches.
pub fn for_faculty(store: &Store, faculty_id: &str) -> FacultyLeaves {
    let class_ids: Vec<&str> = store
        .classes()
        .iter()
        .filter(|c| c.faculty_id == faculty_id)
        .map(|c| c.id.as_str())
        .collect();
    let all = newest_first(
        store
            .leave_applications()
            .iter()
            .enumerate()
            .filter(|(_, l)| class_ids.contains(&l.class_id.as_str())),
    );
    let pending = all
        .iter()
        .filter(|l| l.status == LeaveStatus::Pending)
        .cloned()
        .collect();
    FacultyLeaves { pending, all }
}

pub fn pending_count(store: &Store) -> usize {
    store
        .leave_applications()
        .iter()
        .filter(|l| l.status == LeaveStatus::Pending)
        .count()
}
