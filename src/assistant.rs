use crate::coins;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger;
use crate::store::Store;
use rand::Rng;
use serde::Serialize;

const IMPROVE_TIPS: &str = "Here are some tips to improve your attendance: \
1) Set reminders for your classes, 2) Plan your schedule in advance, \
3) Communicate with faculty if you have conflicts, \
4) Use the AI attendance system for quick check-ins.";

const LEAVE_HOW_TO: &str = "To submit a leave application, go to the Leave Application \
page in your sidebar. Fill out the form with your reason, dates, and details. \
Your faculty will review and approve/reject the application.";

pub const FALLBACK_REPLIES: [&str; 3] = [
    "I'm here to help with attendance, coins, and leave applications. \
Could you please rephrase your question?",
    "That's an interesting question! I can help you with attendance tracking, \
coin management, and leave applications.",
    "I'm a smart assistant focused on attendance management. \
Try asking about your attendance percentage, coins, or leave applications.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Intent {
    AttendancePercentage,
    Coins,
    ImproveAttendance,
    LeaveHowTo,
    Rank,
    Fallback,
}

impl Intent {
    /// First matching rule wins, so "improve my attendance percentage"
    /// is answered with the percentage.
    pub fn classify(message: &str) -> Intent {
        let m = message.to_lowercase();
        if m.contains("attendance") && m.contains("percentage") {
            Intent::AttendancePercentage
        } else if m.contains("coin") {
            Intent::Coins
        } else if m.contains("improve") && m.contains("attendance") {
            Intent::ImproveAttendance
        } else if m.contains("leave") && (m.contains("submit") || m.contains("application")) {
            Intent::LeaveHowTo
        } else if m.contains("leaderboard") || m.contains("rank") {
            Intent::Rank
        } else {
            Intent::Fallback
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub intent: Intent,
    pub reply: String,
}

/// Answers a student's question from live attendance, balance and rank.
pub fn answer<R: Rng>(
    rng: &mut R,
    store: &Store,
    student_id: &str,
    message: &str,
) -> LedgerResult<Reply> {
    store.require_student(student_id)?;
    let message = message.trim();
    if message.is_empty() {
        return Err(LedgerError::InvalidInput("message must not be empty".to_string()));
    }
    let intent = Intent::classify(message);
    let reply = match intent {
        Intent::AttendancePercentage => {
            let stats = ledger::compute_attendance(store, student_id);
            format!(
                "Your current attendance percentage is {}%. You have attended {} classes \
and missed {} classes.",
                stats.percentage, stats.attended, stats.absent
            )
        }
        Intent::Coins => format!(
            "You currently have {} coins! You earn coins by attending classes regularly. \
Visit the coin store to spend them on badges and other items.",
            coins::balance(store, student_id)?
        ),
        Intent::ImproveAttendance => IMPROVE_TIPS.to_string(),
        Intent::LeaveHowTo => LEAVE_HOW_TO.to_string(),
        Intent::Rank => match coins::rank_of(&coins::leaderboard(store), student_id) {
            Some(rank) => format!(
                "You are currently ranked #{} on the leaderboard! Keep attending classes \
to earn more coins and climb higher.",
                rank
            ),
            None => "You're not on the leaderboard yet. Attend more classes to earn coins \
and get ranked!"
                .to_string(),
        },
        Intent::Fallback => FALLBACK_REPLIES[rng.gen_range(0..FALLBACK_REPLIES.len())].to_string(),
    };
    Ok(Reply { intent, reply })
}
