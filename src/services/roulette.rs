use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    config::FlowSettings,
    dao::{models::WinnerClaim, quiz_service::QuizService},
    state::session::Prize,
};

/// Decides and persists prize outcomes.
pub struct RouletteEngine {
    service: Arc<dyn QuizService>,
    winner_cap: u32,
    honor_only_probability: f64,
}

impl RouletteEngine {
    /// Engine using the cap and odds from `settings`.
    pub fn new(service: Arc<dyn QuizService>, settings: &FlowSettings) -> Self {
        Self {
            service,
            winner_cap: settings.winner_cap,
            honor_only_probability: settings.honor_only_probability,
        }
    }

    /// Current winner count, or `None` when the service cannot tell.
    pub async fn current_winner_count(&self) -> Option<u32> {
        match self.service.get_winner_count().await {
            Ok(count) => Some(count),
            Err(err) => {
                warn!(error = %err, "failed to read winner count");
                None
            }
        }
    }

    /// Draw a prize with a uniform random roll.
    pub async fn draw(&self, winner_count: Option<u32>, claim: WinnerClaim) -> Prize {
        let roll = rand::random::<f64>();
        self.draw_with_roll(winner_count, roll, claim).await
    }

    /// Draw a prize for a given roll in `[0, 1)`.
    ///
    /// An unknown winner count is treated as over the cap.
    pub async fn draw_with_roll(
        &self,
        winner_count: Option<u32>,
        roll: f64,
        claim: WinnerClaim,
    ) -> Prize {
        let Some(count) = winner_count else {
            return Prize::HonorOnly;
        };
        if count > self.winner_cap {
            info!(count, cap = self.winner_cap, "winner cap reached; honor only");
            return Prize::HonorOnly;
        }
        if roll < self.honor_only_probability {
            return Prize::HonorOnly;
        }

        match self.service.increment_winner_count(claim).await {
            Ok(ordinal) => {
                info!(ordinal, "physical prize awarded");
                Prize::Physical {
                    ordinal: Some(ordinal),
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to increment winner count; announcing without ordinal");
                Prize::Physical { ordinal: None }
            }
        }
    }
}

impl Prize {
    /// In-character announcement shown once the wheel settles.
    pub fn announcement(&self) -> String {
        match self {
            Prize::HonorOnly => {
                "The wheel has spoken: you earned the Delfos honor badge. Well played!".to_string()
            }
            Prize::Physical {
                ordinal: Some(ordinal),
            } => format!(
                "Jackpot! You won a physical prize. You are winner #{ordinal}, collect it at the booth."
            ),
            Prize::Physical { ordinal: None } => {
                "Jackpot! You won a physical prize, collect it at the booth.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeQuizService, Op, instant_settings};

    fn engine(fake: Arc<FakeQuizService>) -> RouletteEngine {
        RouletteEngine::new(fake, &instant_settings())
    }

    #[tokio::test]
    async fn over_the_cap_is_always_honor_only() {
        let fake = FakeQuizService::new().with_winner_count(41);
        let roulette = engine(fake.clone());

        for roll in [0.0, 0.5, 0.69, 0.7, 0.99] {
            let prize = roulette
                .draw_with_roll(Some(41), roll, WinnerClaim::default())
                .await;
            assert_eq!(prize, Prize::HonorOnly);
        }
        assert_eq!(fake.count(Op::IncrementWinnerCount), 0);
    }

    #[tokio::test]
    async fn low_roll_is_honor_only_without_increment() {
        let fake = FakeQuizService::new();
        let prize = engine(fake.clone())
            .draw_with_roll(Some(3), 0.2, WinnerClaim::default())
            .await;
        assert_eq!(prize, Prize::HonorOnly);
        assert_eq!(fake.count(Op::IncrementWinnerCount), 0);
    }

    #[tokio::test]
    async fn high_roll_awards_a_numbered_prize() {
        let fake = FakeQuizService::new().with_winner_count(40);
        let prize = engine(fake.clone())
            .draw_with_roll(Some(40), 0.95, WinnerClaim::default())
            .await;
        assert_eq!(prize, Prize::Physical { ordinal: Some(41) });
        assert_eq!(fake.winner_count(), 41);
        assert!(prize.announcement().contains("#41"));
    }

    #[tokio::test]
    async fn increment_failure_drops_the_ordinal() {
        let fake = FakeQuizService::new().failing(Op::IncrementWinnerCount);
        let prize = engine(fake)
            .draw_with_roll(Some(1), 0.9, WinnerClaim::default())
            .await;
        assert_eq!(prize, Prize::Physical { ordinal: None });
        assert!(!prize.announcement().contains('#'));
    }

    #[tokio::test]
    async fn unknown_count_fails_closed() {
        let fake = FakeQuizService::new().failing(Op::GetWinnerCount);
        let roulette = engine(fake.clone());
        let count = roulette.current_winner_count().await;
        assert_eq!(count, None);
        assert_eq!(
            roulette.draw(count, WinnerClaim::default()).await,
            Prize::HonorOnly
        );
        assert_eq!(fake.count(Op::IncrementWinnerCount), 0);
    }
}
