use crate::domain::model::{DeliveryAttempt, Destination, RunSummary};
use crate::domain::ports::{CandidateSource, PhotoSender};
use crate::utils::error::{BotError, Result};
use rand::seq::IndexedRandom;
use std::collections::HashSet;
use std::time::Duration;

/// 排除名單與數量上限
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFilter {
    pub exclude: HashSet<String>,
    pub max_destinations: Option<usize>,
}

impl RunFilter {
    /// `max` 為 0 表示不限制；空白的識別碼會被忽略
    pub fn new<I, S>(exclude: I, max: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            exclude: exclude
                .into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            max_destinations: (max > 0).then_some(max),
        }
    }

    /// 先排除，再套用上限
    pub fn select<'a>(&self, destinations: &'a [Destination]) -> Vec<&'a Destination> {
        let kept = destinations
            .iter()
            .filter(|d| !self.exclude.contains(&d.id));
        match self.max_destinations {
            Some(max) => kept.take(max).collect(),
            None => kept.collect(),
        }
    }
}

enum Step {
    Delivered(DeliveryAttempt),
    NotDelivered(DeliveryAttempt),
    NothingFound,
}

pub struct BroadcastEngine<S: CandidateSource, D: PhotoSender> {
    source: S,
    sender: D,
    destination_pause: Duration,
}

impl<S: CandidateSource, D: PhotoSender> BroadcastEngine<S, D> {
    pub fn new(source: S, sender: D) -> Self {
        Self {
            source,
            sender,
            destination_pause: Duration::from_secs(1),
        }
    }

    pub fn with_destination_pause(mut self, pause: Duration) -> Self {
        self.destination_pause = pause;
        self
    }

    async fn process(&self, destination: &Destination) -> Result<Step> {
        let candidates = self.source.search(destination).await?;
        if candidates.is_empty() {
            tracing::warn!("   ⚠️ {}: no images found", destination.label);
            return Ok(Step::NothingFound);
        }

        // ThreadRng 不能跨越 await
        let candidate = {
            let mut rng = rand::rng();
            candidates.choose(&mut rng).cloned()
        }
        .ok_or_else(|| BotError::ProcessingError {
            message: "empty candidate list".to_string(),
        })?;

        if candidate.image_url.is_empty() {
            return Err(BotError::ProcessingError {
                message: format!("{}: chosen candidate has no image URL", destination.label),
            });
        }

        let outcome = self.sender.send(destination, &candidate).await;
        let attempt = DeliveryAttempt {
            destination_id: destination.id.clone(),
            candidate,
            outcome,
        };

        tokio::time::sleep(self.destination_pause).await;

        if outcome.is_delivered() {
            Ok(Step::Delivered(attempt))
        } else {
            Ok(Step::NotDelivered(attempt))
        }
    }

    pub async fn run(&self, destinations: &[Destination], filter: &RunFilter) -> RunSummary {
        let mut summary = RunSummary::default();

        for (index, destination) in filter.select(destinations).into_iter().enumerate() {
            tracing::info!("🔎 {}. Looking for a painting for {}", index + 1, destination.label);
            summary.processed.push(destination.id.clone());

            match self.process(destination).await {
                Ok(Step::Delivered(attempt)) => {
                    summary.sent += 1;
                    summary.attempts.push(attempt);
                }
                Ok(Step::NotDelivered(attempt)) => {
                    tracing::debug!("{} ended with {:?}", attempt.destination_id, attempt.outcome);
                    summary.errors += 1;
                    summary.attempts.push(attempt);
                }
                Ok(Step::NothingFound) => summary.errors += 1,
                Err(e) => {
                    tracing::error!(
                        "   ❌ {}: failed while processing: {}\n{:?}",
                        destination.label,
                        e,
                        e
                    );
                    summary.errors += 1;
                }
            }
        }

        tracing::info!("📊 Total: sent {}, errors {}", summary.sent, summary.errors);
        summary
    }
}
