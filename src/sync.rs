use crate::db;
use crate::model::{PersistedDelta, User};
use crate::store::{load_fixture, Store};
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info, warn};

pub const DATA_KEY: &str = "attendanceData";
pub const SESSION_KEY: &str = "currentUser";
pub const DARK_MODE_KEY: &str = "darkMode";

/// Reads the persisted delta. A value that fails to parse is logged and
/// treated as absent rather than aborting the restore.
pub fn load_delta(conn: &Connection) -> Option<PersistedDelta> {
    let raw = match db::kv_get(conn, DATA_KEY) {
        Ok(v) => v?,
        Err(e) => {
            warn!(error = %e, "failed to read persisted delta");
            return None;
        }
    };
    match serde_json::from_str::<PersistedDelta>(&raw) {
        Ok(delta) => Some(delta),
        Err(e) => {
            warn!(error = %e, "persisted delta malformed, ignoring");
            None
        }
    }
}

/// Loads the fixture and overlays whatever the workspace persisted.
/// Returns the store and whether a delta was applied.
pub fn open_store(conn: &Connection, fixture_path: &Path) -> (Store, bool) {
    let fixture = load_fixture(fixture_path);
    let delta = load_delta(conn);
    let restored = delta.is_some();
    let store = Store::restore(fixture, delta);
    info!(restored, counts = ?store.counts(), "store opened");
    (store, restored)
}

/// Flushes the mutable subset. Failures are logged; the in-memory mutation
/// has already happened and stands.
pub fn persist(conn: &Connection, store: &Store) {
    let encoded = match serde_json::to_string(&store.delta()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "failed to encode store delta");
            return;
        }
    };
    match db::kv_set(conn, DATA_KEY, &encoded) {
        Ok(()) => debug!(bytes = encoded.len(), "store delta persisted"),
        Err(e) => warn!(error = %e, "failed to persist store delta"),
    }
}

/// Drops the persisted delta and session, then rebuilds from the fixture.
pub fn reset(conn: &Connection, fixture_path: &Path) -> anyhow::Result<Store> {
    db::kv_remove(conn, DATA_KEY)?;
    db::kv_remove(conn, SESSION_KEY)?;
    info!("persisted delta and session cleared");
    Ok(Store::from_fixture(load_fixture(fixture_path)))
}

pub fn save_session_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    db::kv_set(conn, SESSION_KEY, &serde_json::to_string(user)?)
}

pub fn load_session_user(conn: &Connection) -> Option<User> {
    let raw = match db::kv_get(conn, SESSION_KEY) {
        Ok(v) => v?,
        Err(e) => {
            warn!(error = %e, "failed to read session");
            return None;
        }
    };
    match serde_json::from_str::<User>(&raw) {
        Ok(u) => Some(u),
        Err(e) => {
            warn!(error = %e, "session record malformed, discarding");
            let _ = db::kv_remove(conn, SESSION_KEY);
            None
        }
    }
}

pub fn clear_session(conn: &Connection) -> anyhow::Result<()> {
    db::kv_remove(conn, SESSION_KEY)
}

pub fn dark_mode(conn: &Connection) -> bool {
    matches!(db::kv_get(conn, DARK_MODE_KEY), Ok(Some(v)) if v.trim() == "true")
}

pub fn set_dark_mode(conn: &Connection, on: bool) -> anyhow::Result<()> {
    db::kv_set(conn, DARK_MODE_KEY, if on { "true" } else { "false" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coins;
    use crate::ledger;
    use crate::model::Method;
    use crate::store::tests::demo_fixture;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> std::path::PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    fn write_fixture(ws: &Path) -> std::path::PathBuf {
        let p = ws.join("fakeData.json");
        std::fs::write(&p, serde_json::to_string(&demo_fixture()).expect("encode"))
            .expect("write fixture");
        p
    }

    #[test]
    fn persist_then_reload_reproduces_mutable_collections() {
        let ws = temp_dir("attendanced-sync-roundtrip");
        let fixture = write_fixture(&ws);
        let conn = db::open_db(&ws).expect("open db");

        let (mut store, restored) = open_store(&conn, &fixture);
        assert!(!restored);
        ledger::record_session(
            &mut store,
            ledger::SessionInput {
                class_id: "c1",
                present: &["s1".to_string(), "s2".to_string()],
                absent: &["s3".to_string()],
                late: &[],
                method: Method::Manual,
                recorder_id: "f1",
            },
            5,
        )
        .expect("record");
        coins::spend(&mut store, "s4", "i1").expect("spend");
        persist(&conn, &store);

        let (reloaded, restored) = open_store(&conn, &fixture);
        assert!(restored);
        assert_eq!(reloaded.delta(), store.delta());

        drop(conn);
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn malformed_delta_falls_back_to_fixture() {
        let ws = temp_dir("attendanced-sync-malformed");
        let fixture = write_fixture(&ws);
        let conn = db::open_db(&ws).expect("open db");
        db::kv_set(&conn, DATA_KEY, "{not json").expect("seed garbage");

        let (store, restored) = open_store(&conn, &fixture);
        assert!(!restored);
        assert_eq!(store.users().len(), 6);

        drop(conn);
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn reset_clears_delta_and_session() {
        let ws = temp_dir("attendanced-sync-reset");
        let fixture = write_fixture(&ws);
        let conn = db::open_db(&ws).expect("open db");
        let (mut store, _) = open_store(&conn, &fixture);
        coins::award(&mut store, "s1", 7, "bonus", None).expect("award");
        persist(&conn, &store);
        let user = store.user("s1").cloned().expect("s1");
        save_session_user(&conn, &user).expect("session");

        let fresh = reset(&conn, &fixture).expect("reset");
        assert_eq!(fresh.user("s1").map(|u| u.coins()), Some(0));
        assert!(load_session_user(&conn).is_none());
        assert!(load_delta(&conn).is_none());

        drop(conn);
        let _ = std::fs::remove_dir_all(ws);
    }

    #[test]
    fn dark_mode_defaults_off() {
        let ws = temp_dir("attendanced-sync-theme");
        let conn = db::open_db(&ws).expect("open db");
        assert!(!dark_mode(&conn));
        set_dark_mode(&conn, true).expect("set");
        assert!(dark_mode(&conn));

        drop(conn);
        let _ = std::fs::remove_dir_all(ws);
    }
}
