//! Entry point for user requests.

use host::{NotificationChannel, Subscription};
use mcp::{ProgressToken, ServerNotification};
use tracing::{Instrument, info, info_span};

use crate::Result;
use crate::client::NotificationLogger;
use crate::driver::Driver;
use crate::model::{Backend, Message};
use crate::tools::ToolHost;
use crate::turn::{ActiveTurns, Turn, TurnState};

/// Everything a finished Turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub token: ProgressToken,
    pub text: String,
    pub messages: Vec<Message>,
    pub states: Vec<TurnState>,
    /// Notifications the tool host sent for this Turn, in arrival order.
    pub notifications: Vec<ServerNotification>,
}

/// Runs each user request as its own Turn under a fresh progress token.
pub struct Orchestrator<B, H> {
    driver: Driver<B, H>,
    channel: NotificationChannel,
    turns: ActiveTurns,
    logger: NotificationLogger,
}

impl<B: Backend, H: ToolHost> Orchestrator<B, H> {
    /// `channel` must be the sink the tool host emits into and `turns` the
    /// registry shared with the sampling handler.
    pub fn new(driver: Driver<B, H>, channel: NotificationChannel, turns: ActiveTurns) -> Self {
        Self {
            driver,
            channel,
            turns,
            logger: NotificationLogger,
        }
    }

    pub fn driver(&self) -> &Driver<B, H> {
        &self.driver
    }

    /// Answer `user_text`.
    pub async fn handle(&self, user_text: &str) -> Result<String> {
        self.run(user_text).await.map(|outcome| outcome.text)
    }

    /// Answer `user_text`, keeping the Turn's history, state trace and
    /// notifications.
    pub async fn run(&self, user_text: &str) -> Result<TurnOutcome> {
        let mut turn = Turn::new(user_text);
        let token = turn.token.clone();
        let span = info_span!("turn", %token);

        let subscription = self.channel.subscribe(token.clone());
        self.turns.register(&turn);
        let release = TurnRelease {
            turns: &self.turns,
            driver: &self.driver,
            token: &token,
        };
        info!(parent: &span, "turn started");

        let (result, notifications) = self
            .drive(&mut turn, subscription)
            .instrument(span.clone())
            .await;

        drop(release);
        info!(parent: &span, state = ?turn.state(), notifications = notifications.len(), "turn finished");

        let text = result?;
        Ok(TurnOutcome {
            token,
            text,
            states: turn.states(),
            messages: turn.messages,
            notifications,
        })
    }

    async fn drive(
        &self,
        turn: &mut Turn,
        mut subscription: Subscription,
    ) -> (Result<String>, Vec<ServerNotification>) {
        let mut notifications = Vec::new();
        let result = {
            let driver = self.driver.run(turn);
            tokio::pin!(driver);
            loop {
                tokio::select! {
                    result = &mut driver => break result,
                    Some(notification) = subscription.recv() => {
                        self.logger.log(&notification);
                        notifications.push(notification);
                    }
                }
            }
        };

        for notification in subscription.close() {
            self.logger.log(&notification);
            notifications.push(notification);
        }
        (result, notifications)
    }
}

/// Forgets a Turn's bookkeeping when dropped, so an abandoned Turn is
/// cleaned up the same way as a finished one.
struct TurnRelease<'a, B: Backend, H: ToolHost> {
    turns: &'a ActiveTurns,
    driver: &'a Driver<B, H>,
    token: &'a ProgressToken,
}

impl<B: Backend, H: ToolHost> Drop for TurnRelease<'_, B, H> {
    fn drop(&mut self) {
        self.turns.remove(self.token);
        self.driver.release(self.token);
    }
}
