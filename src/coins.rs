use crate::error::{LedgerError, LedgerResult};
use crate::model::{CoinTransaction, LeaderboardEntry, SOURCE_PURCHASE};
use crate::store::Store;
use serde::Serialize;
use tracing::info;

fn today() -> String {
    chrono::Utc::now().date_naive().to_string()
}

/// Credits a student. The balance moves only together with a new
/// transaction row.
pub fn award(
    store: &mut Store,
    student_id: &str,
    amount: i64,
    source: &str,
    class_id: Option<&str>,
) -> LedgerResult<i64> {
    if amount <= 0 {
        return Err(LedgerError::InvalidInput(format!(
            "award amount must be positive, got {}",
            amount
        )));
    }
    let source = source.trim();
    if source.is_empty() {
        return Err(LedgerError::InvalidInput("source must not be empty".to_string()));
    }
    let balance = store.post_coin_transaction(
        student_id,
        CoinTransaction {
            date: today(),
            amount,
            source: source.to_string(),
            class_id: class_id.map(str::to_string),
            description: format!("Earned {} coins for {}", amount, source),
        },
    )?;
    info!(student_id, amount, source, balance, "coins awarded");
    Ok(balance)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub item_id: String,
    pub item_name: String,
    pub price: i64,
    pub balance: i64,
}

/// Buys a catalog item. Refused with no state change when the balance
/// does not cover the price.
pub fn spend(store: &mut Store, student_id: &str, item_id: &str) -> LedgerResult<Purchase> {
    let item = store
        .item(item_id)
        .cloned()
        .ok_or_else(|| LedgerError::ItemNotFound(item_id.to_string()))?;
    let available = store.require_student(student_id)?.coins();
    if available < item.price {
        return Err(LedgerError::InsufficientBalance {
            needed: item.price,
            available,
        });
    }
    let debit = item
        .price
        .checked_neg()
        .ok_or_else(|| LedgerError::BalanceOverflow {
            student_id: student_id.to_string(),
            amount: item.price,
        })?;
    let balance = store.post_coin_transaction(
        student_id,
        CoinTransaction {
            date: today(),
            amount: debit,
            source: SOURCE_PURCHASE.to_string(),
            class_id: None,
            description: format!("Purchased {}", item.name),
        },
    )?;
    info!(student_id, item_id, price = item.price, balance, "store purchase");
    Ok(Purchase {
        item_id: item.id,
        item_name: item.name,
        price: item.price,
        balance,
    })
}

pub fn balance(store: &Store, student_id: &str) -> LedgerResult<i64> {
    Ok(store.require_student(student_id)?.coins())
}

/// Transactions newest first; same-day rows keep the later one on top.
pub fn history(store: &Store, student_id: &str) -> Vec<CoinTransaction> {
    let Some(h) = store.history_for(student_id) else {
        return Vec::new();
    };
    let mut rows: Vec<(usize, &CoinTransaction)> = h.transactions.iter().enumerate().collect();
    rows.sort_by(|(ia, a), (ib, b)| b.date.cmp(&a.date).then(ib.cmp(ia)));
    rows.into_iter().map(|(_, t)| t.clone()).collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    pub rank: usize,
    #[serde(flatten)]
    pub entry: LeaderboardEntry,
}

/// Fixture leaderboard with coins refreshed from live balances, richest
/// first.
pub fn leaderboard(store: &Store) -> Vec<RankedEntry> {
    let mut entries: Vec<LeaderboardEntry> = store
        .leaderboard()
        .iter()
        .cloned()
        .map(|mut e| {
            if let Some(u) = store.user(&e.student_id).filter(|u| u.is_student()) {
                e.coins = u.coins();
                if e.name.is_empty() {
                    e.name = u.name.clone();
                }
            }
            e
        })
        .collect();
    entries.sort_by(|a, b| b.coins.cmp(&a.coins));
    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| RankedEntry { rank: i + 1, entry })
        .collect()
}

pub fn rank_of(board: &[RankedEntry], student_id: &str) -> Option<usize> {
    board
        .iter()
        .find(|r| r.entry.student_id == student_id)
        .map(|r| r.rank)
}
