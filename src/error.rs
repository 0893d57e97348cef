use crate::model::LeaveStatus;
use serde_json::json;
use thiserror::Error;

/// Domain failures raised by the ledgers and the leave workflow.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("class not found: {0}")]
    ClassNotFound(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("student not found: {0}")]
    StudentNotFound(String),

    #[error("store item not found: {0}")]
    ItemNotFound(String),

    #[error("leave application not found: {0}")]
    LeaveNotFound(String),

    #[error("student {student_id} is not on the roster of class {class_id}")]
    NotOnRoster {
        class_id: String,
        student_id: String,
    },

    #[error("student {0} is listed in more than one attendance set")]
    OverlappingSets(String),

    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: i64, available: i64 },

    #[error("leave application {id} is already {status}")]
    AlreadyDecided { id: String, status: LeaveStatus },

    #[error("coin amount {amount} would overflow the balance of {student_id}")]
    BalanceOverflow { student_id: String, amount: i64 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("detection {requested} was superseded by {latest}")]
    StaleDetection { requested: u64, latest: u64 },

    #[error("detection {0} is still processing")]
    DetectionPending(u64),

    #[error("no detection is buffered")]
    NoDetection,
}

impl LedgerError {
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::ClassNotFound(_)
            | LedgerError::UserNotFound(_)
            | LedgerError::StudentNotFound(_)
            | LedgerError::ItemNotFound(_)
            | LedgerError::LeaveNotFound(_) => "not_found",
            LedgerError::NotOnRoster { .. } => "not_on_roster",
            LedgerError::OverlappingSets(_) => "overlapping_sets",
            LedgerError::InsufficientBalance { .. } => "insufficient_balance",
            LedgerError::AlreadyDecided { .. } => "already_decided",
            LedgerError::BalanceOverflow { .. } | LedgerError::InvalidInput(_) => "bad_params",
            LedgerError::StaleDetection { .. } => "stale_detection",
            LedgerError::DetectionPending(_) => "detection_pending",
            LedgerError::NoDetection => "no_detection",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            LedgerError::ClassNotFound(id) => Some(json!({ "kind": "class", "id": id })),
            LedgerError::UserNotFound(id) => Some(json!({ "kind": "user", "id": id })),
            LedgerError::StudentNotFound(id) => Some(json!({ "kind": "student", "id": id })),
            LedgerError::ItemNotFound(id) => Some(json!({ "kind": "storeItem", "id": id })),
            LedgerError::LeaveNotFound(id) => Some(json!({ "kind": "leaveApplication", "id": id })),
            LedgerError::NotOnRoster {
                class_id,
                student_id,
            } => Some(json!({ "classId": class_id, "studentId": student_id })),
            LedgerError::InsufficientBalance { needed, available } => {
                Some(json!({ "needed": needed, "available": available }))
            }
            LedgerError::BalanceOverflow { student_id, amount } => {
                Some(json!({ "studentId": student_id, "amount": amount }))
            }
            LedgerError::AlreadyDecided { status, .. } => Some(json!({ "status": status })),
            LedgerError::StaleDetection { latest, .. } => Some(json!({ "latest": latest })),
            _ => None,
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
