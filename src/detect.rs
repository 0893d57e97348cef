use crate::error::{LedgerError, LedgerResult};
use rand::Rng;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Split of a roster into faces "seen" and not seen by the camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub class_id: String,
    pub present: Vec<String>,
    pub absent: Vec<String>,
}

#[derive(Debug, Clone)]
struct Buffered {
    generation: u64,
    ready_at: Instant,
    outcome: Detection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Poll {
    Processing {
        #[serde(rename = "remainingMs")]
        remaining_ms: u64,
    },
    Ready { detection: Detection },
    Stale { latest: u64 },
    Idle,
}

/// Hands out a generation per request; only the latest generation's
/// result can be read or committed.
#[derive(Debug, Default)]
pub struct Detector {
    generation: u64,
    buffered: Option<Buffered>,
}

pub fn sample<R: Rng>(rng: &mut R, class_id: &str, roster: &[String], hit_rate: f64) -> Detection {
    let mut present = Vec::new();
    let mut absent = Vec::new();
    for id in roster {
        if rng.gen_bool(hit_rate.clamp(0.0, 1.0)) {
            present.push(id.clone());
        } else {
            absent.push(id.clone());
        }
    }
    Detection {
        class_id: class_id.to_string(),
        present,
        absent,
    }
}

impl Detector {
    pub fn latest(&self) -> u64 {
        self.generation
    }

    /// Starts a new detection, superseding any earlier one.
    pub fn start<R: Rng>(
        &mut self,
        rng: &mut R,
        class_id: &str,
        roster: &[String],
        hit_rate: f64,
        delay: Duration,
    ) -> u64 {
        self.start_at(Instant::now(), rng, class_id, roster, hit_rate, delay)
    }

    fn start_at<R: Rng>(
        &mut self,
        now: Instant,
        rng: &mut R,
        class_id: &str,
        roster: &[String],
        hit_rate: f64,
        delay: Duration,
    ) -> u64 {
        self.generation += 1;
        if let Some(prev) = &self.buffered {
            debug!(superseded = prev.generation, "dropping earlier detection");
        }
        self.buffered = Some(Buffered {
            generation: self.generation,
            ready_at: now + delay,
            outcome: sample(rng, class_id, roster, hit_rate),
        });
        info!(generation = self.generation, class_id, roster = roster.len(), "detection started");
        self.generation
    }

    pub fn poll(&self, generation: u64) -> Poll {
        self.poll_at(Instant::now(), generation)
    }

    fn poll_at(&self, now: Instant, generation: u64) -> Poll {
        if generation != self.generation {
            return Poll::Stale {
                latest: self.generation,
            };
        }
        let Some(b) = &self.buffered else {
            return Poll::Idle;
        };
        if now < b.ready_at {
            return Poll::Processing {
                remaining_ms: (b.ready_at - now).as_millis() as u64,
            };
        }
        Poll::Ready {
            detection: b.outcome.clone(),
        }
    }

    /// Removes and returns the buffered result if `generation` is current
    /// and its delay has elapsed.
    pub fn take(&mut self, generation: u64) -> LedgerResult<Detection> {
        self.take_at(Instant::now(), generation)
    }

    fn take_at(&mut self, now: Instant, generation: u64) -> LedgerResult<Detection> {
        if generation != self.generation {
            return Err(LedgerError::StaleDetection {
                requested: generation,
                latest: self.generation,
            });
        }
        let ready = match &self.buffered {
            None => return Err(LedgerError::NoDetection),
            Some(b) => now >= b.ready_at,
        };
        if !ready {
            return Err(LedgerError::DetectionPending(generation));
        }
        self.buffered
            .take()
            .map(|b| b.outcome)
            .ok_or(LedgerError::NoDetection)
    }

    pub fn cancel(&mut self) -> bool {
        let had = self.buffered.take().is_some();
        if had {
            info!(generation = self.generation, "detection cancelled");
        }
        had
    }
}
