use crate::error::{LedgerError, LedgerResult};
use crate::model::{
    AttendanceRecord, Class, CoinHistory, CoinTransaction, Fixture, LeaderboardEntry,
    LeaveApplication, PersistedDelta, StoreItem, User, SOURCE_OPENING,
};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// In-memory state for one workspace. Components take it as `&Store` or
/// `&mut Store`; nothing holds it globally.
#[derive(Debug, Clone, Default)]
pub struct Store {
    users: Vec<User>,
    classes: Vec<Class>,
    attendance_records: Vec<AttendanceRecord>,
    leave_applications: Vec<LeaveApplication>,
    coin_history: Vec<CoinHistory>,
    leaderboard: Vec<LeaderboardEntry>,
    store_items: Vec<StoreItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCounts {
    pub users: usize,
    pub classes: usize,
    pub attendance_records: usize,
    pub leave_applications: usize,
    pub store_items: usize,
}

/// Reads the fixture. Missing or unparseable files degrade to an empty
/// dataset so the dashboard can still start.
pub fn load_fixture(path: &Path) -> Fixture {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "fixture unreadable, starting empty");
            return Fixture::default();
        }
    };
    match serde_json::from_str::<Fixture>(&text) {
        Ok(f) => {
            info!(
                path = %path.display(),
                users = f.users.len(),
                classes = f.classes.len(),
                records = f.attendance_records.len(),
                "fixture loaded"
            );
            f
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "fixture malformed, starting empty");
            Fixture::default()
        }
    }
}

/// Union of two collections keyed by `key`. Persisted entries win and keep
/// their order; fixture entries the delta never saw are appended.
pub fn reconcile_by_key<T, F>(persisted: Vec<T>, fixture: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let seen: HashSet<String> = persisted.iter().map(|v| key(v).to_string()).collect();
    let mut out = persisted;
    for item in fixture {
        if !seen.contains(key(&item)) {
            out.push(item);
        }
    }
    out
}

impl Store {
    pub fn from_fixture(fixture: Fixture) -> Self {
        Self::restore(fixture, None)
    }

    pub fn restore(fixture: Fixture, delta: Option<PersistedDelta>) -> Self {
        let delta = delta.unwrap_or_default();
        let users = match delta.users {
            Some(p) => reconcile_by_key(p, fixture.users, |u| u.id.as_str()),
            None => fixture.users,
        };
        let attendance_records = match delta.attendance_records {
            Some(p) => reconcile_by_key(p, fixture.attendance_records, |r| r.id.as_str()),
            None => fixture.attendance_records,
        };
        let leave_applications = match delta.leave_applications {
            Some(p) => reconcile_by_key(p, fixture.leave_applications, |l| l.id.as_str()),
            None => fixture.leave_applications,
        };
        let coin_history = match delta.coin_history {
            Some(p) => reconcile_by_key(p, fixture.coin_history, |h| h.student_id.as_str()),
            None => fixture.coin_history,
        };

        let mut store = Store {
            users,
            classes: fixture.classes,
            attendance_records,
            leave_applications,
            coin_history,
            leaderboard: fixture.leaderboard,
            store_items: fixture.store_items,
        };
        store.record_opening_balances();
        store
    }

    /// Seeded balances usually arrive without history. Book the difference
    /// so every balance equals its transaction sum from here on.
    fn record_opening_balances(&mut self) {
        let today = chrono::Utc::now().date_naive().to_string();
        let drifts: Vec<(String, i64)> = self
            .users
            .iter()
            .filter(|u| u.is_student())
            .filter_map(|u| {
                let booked = match self.coin_history.iter().find(|h| h.student_id == u.id) {
                    Some(h) => h.checked_sum(),
                    None => Some(0),
                };
                let Some(drift) = booked.and_then(|b| u.coins().checked_sub(b)) else {
                    warn!(
                        student_id = %u.id,
                        "coin history out of range, no opening balance booked"
                    );
                    return None;
                };
                (drift != 0).then(|| (u.id.clone(), drift))
            })
            .collect();
        for (student_id, drift) in drifts {
            self.history_entry(&student_id).transactions.push(CoinTransaction {
                date: today.clone(),
                amount: drift,
                source: SOURCE_OPENING.to_string(),
                class_id: None,
                description: "Opening balance".to_string(),
            });
        }
    }

    fn history_entry(&mut self, student_id: &str) -> &mut CoinHistory {
        let idx = match self
            .coin_history
            .iter()
            .position(|h| h.student_id == student_id)
        {
            Some(i) => i,
            None => {
                self.coin_history.push(CoinHistory {
                    student_id: student_id.to_string(),
                    transactions: Vec::new(),
                });
                self.coin_history.len() - 1
            }
        };
        &mut self.coin_history[idx]
    }

    pub fn delta(&self) -> PersistedDelta {
        PersistedDelta {
            attendance_records: Some(self.attendance_records.clone()),
            leave_applications: Some(self.leave_applications.clone()),
            coin_history: Some(self.coin_history.clone()),
            users: Some(self.users.clone()),
        }
    }

    pub fn counts(&self) -> StoreCounts {
        StoreCounts {
            users: self.users.len(),
            classes: self.classes.len(),
            attendance_records: self.attendance_records.len(),
            leave_applications: self.leave_applications.len(),
            store_items: self.store_items.len(),
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn classes(&self) -> &[Class] {
        &self.classes
    }

    pub fn attendance_records(&self) -> &[AttendanceRecord] {
        &self.attendance_records
    }

    pub fn leave_applications(&self) -> &[LeaveApplication] {
        &self.leave_applications
    }

    pub fn leaderboard(&self) -> &[LeaderboardEntry] {
        &self.leaderboard
    }

    pub fn store_items(&self) -> &[StoreItem] {
        &self.store_items
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn require_user(&self, id: &str) -> LedgerResult<&User> {
        self.user(id)
            .ok_or_else(|| LedgerError::UserNotFound(id.to_string()))
    }

    pub fn require_student(&self, id: &str) -> LedgerResult<&User> {
        self.user(id)
            .filter(|u| u.is_student())
            .ok_or_else(|| LedgerError::StudentNotFound(id.to_string()))
    }

    pub fn class(&self, id: &str) -> Option<&Class> {
        self.classes.iter().find(|c| c.id == id)
    }

    pub fn require_class(&self, id: &str) -> LedgerResult<&Class> {
        self.class(id)
            .ok_or_else(|| LedgerError::ClassNotFound(id.to_string()))
    }

    pub fn item(&self, id: &str) -> Option<&StoreItem> {
        self.store_items.iter().find(|i| i.id == id)
    }

    pub fn history_for(&self, student_id: &str) -> Option<&CoinHistory> {
        self.coin_history.iter().find(|h| h.student_id == student_id)
    }

    /// Students enrolled in `class_id`, in fixture order.
    pub fn roster(&self, class_id: &str) -> Vec<&User> {
        self.users
            .iter()
            .filter(|u| u.is_student() && u.class_id.as_deref() == Some(class_id))
            .collect()
    }

    pub(crate) fn push_attendance_record(&mut self, record: AttendanceRecord) {
        self.attendance_records.push(record);
    }

    pub(crate) fn push_leave(&mut self, application: LeaveApplication) {
        self.leave_applications.push(application);
    }

    pub(crate) fn leave_mut(&mut self, id: &str) -> Option<&mut LeaveApplication> {
        self.leave_applications.iter_mut().find(|l| l.id == id)
    }

    /// Sole path that changes a balance: the delta and its history entry
    /// are applied together. Returns the new balance.
    pub(crate) fn post_coin_transaction(
        &mut self,
        student_id: &str,
        tx: CoinTransaction,
    ) -> LedgerResult<i64> {
        let user = self
            .users
            .iter_mut()
            .find(|u| u.id == student_id && u.is_student())
            .ok_or_else(|| LedgerError::StudentNotFound(student_id.to_string()))?;
        let balance = user
            .apply_coin_delta(tx.amount)
            .ok_or_else(|| LedgerError::BalanceOverflow {
                student_id: student_id.to_string(),
                amount: tx.amount,
            })?;
        self.history_entry(student_id).transactions.push(tx);
        Ok(balance)
    }

    /// Identity fields only; role and coins are not editable here.
    pub(crate) fn update_profile(
        &mut self,
        user_id: &str,
        patch: &ProfilePatch,
    ) -> LedgerResult<&User> {
        let user = self
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| LedgerError::UserNotFound(user_id.to_string()))?;
        if let Some(name) = &patch.name {
            let t = name.trim();
            if t.is_empty() {
                return Err(LedgerError::InvalidInput("name must not be empty".to_string()));
            }
            user.name = t.to_string();
        }
        if let Some(email) = &patch.email {
            user.email = Some(email.trim().to_string());
        }
        if let Some(phone) = &patch.phone {
            user.phone = Some(phone.trim().to_string());
        }
        Ok(&*user)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}
