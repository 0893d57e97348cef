use crate::coins;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{self, AttendanceStats};
use crate::model::{LeaveStatus, Role};
use crate::store::Store;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyDashboard {
    pub class_count: usize,
    pub total_students: u32,
    pub sessions_today: usize,
    pub pending_leaves: usize,
}

pub fn faculty(store: &Store, faculty_id: &str, today: &str) -> LedgerResult<FacultyDashboard> {
    let user = store.require_user(faculty_id)?;
    if user.role != Role::Faculty {
        return Err(LedgerError::InvalidInput(format!("{} is not faculty", faculty_id)));
    }
    let classes: Vec<_> = store
        .classes()
        .iter()
        .filter(|c| c.faculty_id == faculty_id)
        .collect();
    Ok(FacultyDashboard {
        class_count: classes.len(),
        total_students: classes
            .iter()
            .fold(0u32, |acc, c| acc.saturating_add(c.total_students)),
        sessions_today: ledger::records_on(store, today).count(),
        pending_leaves: crate::leave::pending_count(store),
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDashboard {
    pub attendance: AttendanceStats,
    pub coins: i64,
    pub rank: Option<usize>,
    pub pending_leaves: usize,
}

pub fn student(store: &Store, student_id: &str) -> LedgerResult<StudentDashboard> {
    let coins = coins::balance(store, student_id)?;
    let board = coins::leaderboard(store);
    Ok(StudentDashboard {
        attendance: ledger::compute_attendance(store, student_id),
        coins,
        rank: coins::rank_of(&board, student_id),
        pending_leaves: store
            .leave_applications()
            .iter()
            .filter(|l| l.student_id == student_id && l.status == LeaveStatus::Pending)
            .count(),
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildOverview {
    pub student_id: String,
    pub name: String,
    pub class_name: Option<String>,
    pub attendance: AttendanceStats,
    pub coins: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentDashboard {
    pub children: Vec<ChildOverview>,
    /// Mean of the children's percentages, rounded; 0 without children.
    pub average_attendance: u32,
    pub pending_leaves: usize,
}

pub fn parent(store: &Store, parent_id: &str) -> LedgerResult<ParentDashboard> {
    let user = store.require_user(parent_id)?;
    if user.role != Role::Parent {
        return Err(LedgerError::InvalidInput(format!("{} is not a parent", parent_id)));
    }
    // Child ids that no longer resolve to a student are skipped.
    let children: Vec<ChildOverview> = user
        .children
        .iter()
        .filter_map(|id| store.user(id).filter(|u| u.is_student()))
        .map(|child| ChildOverview {
            student_id: child.id.clone(),
            name: child.name.clone(),
            class_name: child
                .class_id
                .as_deref()
                .and_then(|cid| store.class(cid))
                .map(|c| c.name.clone()),
            attendance: ledger::compute_attendance(store, &child.id),
            coins: child.coins(),
        })
        .collect();
    let average_attendance = if children.is_empty() {
        0
    } else {
        let sum: u32 = children.iter().map(|c| c.attendance.percentage).sum();
        ledger::percentage(sum as usize, children.len() * 100)
    };
    let pending_leaves = store
        .leave_applications()
        .iter()
        .filter(|l| l.status == LeaveStatus::Pending)
        .filter(|l| children.iter().any(|c| c.student_id == l.student_id))
        .count();
    Ok(ParentDashboard {
        children,
        average_attendance,
        pending_leaves,
    })
}
