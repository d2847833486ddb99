use super::{CoordinatorConfig, CoordinatorResponse, Error, MergedPopulation, PartialSnapshot};
use crate::models::{Population, select_top_individuals};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;
use tracing::instrument;
use uuid::Uuid;

struct Pending {
    ticket: u64,
    request_id: Uuid,
    snapshot: PartialSnapshot,
    submitted_at: DateTime<Utc>,
    reply: oneshot::Sender<String>,
}

/// Takes a caller's submission back out of the pending queue when its
/// `submit` future ends, whether it timed out or was dropped.
struct Withdrawal<'a> {
    pending: &'a Mutex<Vec<Pending>>,
    ticket: u64,
}

impl Withdrawal<'_> {
    /// False when a quorum already claimed the submission.
    fn withdraw(&self) -> bool {
        let mut pending = self.pending.lock();
        match pending.iter().position(|caller| caller.ticket == self.ticket) {
            Some(position) => {
                pending.remove(position);
                true
            }
            None => false,
        }
    }
}

impl Drop for Withdrawal<'_> {
    fn drop(&mut self) {
        if self.withdraw() {
            tracing::debug!(ticket = self.ticket, "Abandoned submission withdrawn");
        }
    }
}

/// Merges partial populations from concurrent solver instances.
///
/// Submissions are buffered until `quorum` of them are pending. The merged
/// result is sent to every caller of that quorum.
pub struct Coordinator {
    config: CoordinatorConfig,
    pending: Mutex<Vec<Pending>>,
    tickets: AtomicU64,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Result<Self, Error> {
        if config.quorum == 0 {
            return Err(Error::InvalidQuorum);
        }
        Ok(Self {
            config,
            pending: Mutex::new(Vec::new()),
            tickets: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Number of callers currently waiting for a quorum.
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Same as [`Coordinator::submit`] for a serialized snapshot.
    pub async fn submit_json(
        &self,
        request_id: Uuid,
        body: &str,
    ) -> Result<CoordinatorResponse, Error> {
        let snapshot: PartialSnapshot = serde_json::from_str(body)?;
        self.submit(request_id, snapshot).await
    }

    #[instrument(level = "info", skip(self, snapshot), fields(request_id = %request_id, generation = snapshot.generation, population_size = snapshot.population.len()))]
    pub async fn submit(
        &self,
        request_id: Uuid,
        snapshot: PartialSnapshot,
    ) -> Result<CoordinatorResponse, Error> {
        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed);
        let (reply, mut response) = oneshot::channel();
        let withdrawal = Withdrawal {
            pending: &self.pending,
            ticket,
        };

        let quorum = {
            let mut pending = self.pending.lock();
            pending.push(Pending {
                ticket,
                request_id,
                snapshot,
                submitted_at: Utc::now(),
                reply,
            });

            if pending.len() >= self.config.quorum {
                Some(std::mem::take(&mut *pending))
            } else {
                None
            }
        };

        if let Some(quorum) = quorum {
            let merged = self.merge(&quorum)?;
            for caller in quorum {
                // A caller that gave up has dropped its receiver
                let _ = caller.reply.send(merged.clone());
            }
        }

        match tokio::time::timeout(self.config.timeout, &mut response).await {
            Ok(Ok(merged)) => Ok(CoordinatorResponse::Merged(merged)),
            Ok(Err(_)) => Err(Error::MergeAborted),
            Err(_) => {
                if withdrawal.withdraw() {
                    tracing::warn!(request_id = %request_id, "Quorum not reached before timeout");
                    Ok(CoordinatorResponse::TimedOut(format!(
                        "Timed out after {}ms waiting for {} submissions",
                        self.config.timeout.as_millis(),
                        self.config.quorum
                    )))
                } else {
                    // A quorum claimed this caller just as the timeout fired
                    response
                        .await
                        .map(CoordinatorResponse::Merged)
                        .map_err(|_| Error::MergeAborted)
                }
            }
        }
    }

    #[instrument(level = "debug", skip(self, quorum), fields(quorum = quorum.len()))]
    fn merge(&self, quorum: &[Pending]) -> Result<String, Error> {
        let keep = self.config.keep.unwrap_or_else(|| {
            quorum
                .iter()
                .map(|caller| caller.snapshot.population.len())
                .max()
                .unwrap_or(0)
        });

        let combined: Population = quorum
            .iter()
            .flat_map(|caller| caller.snapshot.population.individuals().iter().cloned())
            .collect::<Vec<_>>()
            .into();

        for caller in quorum {
            tracing::debug!(
                request_id = %caller.request_id,
                waited_ms = (Utc::now() - caller.submitted_at).num_milliseconds(),
                "Merging submission"
            );
        }

        let merged = MergedPopulation {
            request_ids: quorum.iter().map(|caller| caller.request_id).collect(),
            generation: quorum
                .iter()
                .map(|caller| caller.snapshot.generation)
                .max()
                .unwrap_or(0),
            population: select_top_individuals(keep, &combined).into(),
            merged_at: Utc::now(),
        };

        Ok(serde_json::to_string(&merged)?)
    }
}
