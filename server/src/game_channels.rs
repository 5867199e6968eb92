use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// Events pushed to a game's spectator room.
#[derive(Debug, Clone)]
pub enum PushEvent {
    /// A completed tick: the "client"-dialect board dump plus any `/move`
    /// errors collected this turn, keyed by snake id.
    Update {
        board: Value,
        errors: HashMap<String, String>,
        viewers: u64,
    },
    /// Emitted once on `finish_game`, naming the child/clone game to follow.
    Redirect { game_id: Uuid },
    ViewerCount { count: u64 },
    Message { text: String },
    /// Reported to the initiating client only; never broadcast to the room.
    Error { message: String },
}

/// One broadcast channel per live game, created lazily on first subscribe.
#[derive(Debug, Clone)]
pub struct GameChannels {
    channels: Arc<RwLock<HashMap<Uuid, broadcast::Sender<PushEvent>>>>,
}

impl Default for GameChannels {
    fn default() -> Self {
        Self::new()
    }
}

impl GameChannels {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn subscribe(&self, game_id: Uuid) -> broadcast::Receiver<PushEvent> {
        let mut channels = self.channels.write().await;

        if let Some(sender) = channels.get(&game_id) {
            sender.subscribe()
        } else {
            let (sender, receiver) = broadcast::channel(256);
            channels.insert(game_id, sender);
            receiver
        }
    }

    pub async fn notify(&self, game_id: Uuid, event: PushEvent) {
        let channels = self.channels.read().await;

        if let Some(sender) = channels.get(&game_id) {
            // Ignore errors - they mean no receivers are listening.
            let _ = sender.send(event);
        }
    }

    /// Call periodically or when a game ends; removes the channel only if
    /// no receivers remain.
    pub async fn cleanup(&self, game_id: Uuid) {
        let mut channels = self.channels.write().await;

        if let Some(sender) = channels.get(&game_id) {
            if sender.receiver_count() == 0 {
                channels.remove(&game_id);
                tracing::debug!(game_id = %game_id, "removed game channel, no subscribers");
            }
        }
    }

    pub async fn remove(&self, game_id: Uuid) {
        let mut channels = self.channels.write().await;
        channels.remove(&game_id);
        tracing::debug!(game_id = %game_id, "removed game channel");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(turn: &str) -> PushEvent {
        PushEvent::Update {
            board: serde_json::json!({ "turn": turn }),
            errors: HashMap::new(),
            viewers: 0,
        }
    }

    #[tokio::test]
    async fn subscribe_creates_channel() {
        let channels = GameChannels::new();
        let game_id = Uuid::new_v4();
        let _receiver = channels.subscribe(game_id).await;
        assert!(channels.channels.read().await.contains_key(&game_id));
    }

    #[tokio::test]
    async fn notify_reaches_subscriber() {
        let channels = GameChannels::new();
        let game_id = Uuid::new_v4();
        let mut receiver = channels.subscribe(game_id).await;

        channels.notify(game_id, update("5")).await;

        match receiver.recv().await.unwrap() {
            PushEvent::Update { board, .. } => assert_eq!(board["turn"], "5"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cleanup_removes_channel_with_no_receivers() {
        let channels = GameChannels::new();
        let game_id = Uuid::new_v4();
        {
            let _receiver = channels.subscribe(game_id).await;
        }
        channels.cleanup(game_id).await;
        assert!(!channels.channels.read().await.contains_key(&game_id));
    }

    #[tokio::test]
    async fn cleanup_preserves_active_channel() {
        let channels = GameChannels::new();
        let game_id = Uuid::new_v4();
        let _receiver = channels.subscribe(game_id).await;
        channels.cleanup(game_id).await;
        assert!(channels.channels.read().await.contains_key(&game_id));
    }

    #[tokio::test]
    async fn multiple_games_are_isolated() {
        let channels = GameChannels::new();
        let game_1 = Uuid::new_v4();
        let game_2 = Uuid::new_v4();

        let mut receiver_1 = channels.subscribe(game_1).await;
        let mut receiver_2 = channels.subscribe(game_2).await;

        channels.notify(game_1, update("1")).await;
        channels.notify(game_2, update("100")).await;

        match receiver_1.recv().await.unwrap() {
            PushEvent::Update { board, .. } => assert_eq!(board["turn"], "1"),
            other => panic!("unexpected event: {other:?}"),
        }
        match receiver_2.recv().await.unwrap() {
            PushEvent::Update { board, .. } => assert_eq!(board["turn"], "100"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn notify_without_subscribers_does_not_panic() {
        let channels = GameChannels::new();
        channels.notify(Uuid::new_v4(), update("1")).await;
    }

    #[tokio::test]
    async fn remove_drops_channel_immediately() {
        let channels = GameChannels::new();
        let game_id = Uuid::new_v4();
        let _receiver = channels.subscribe(game_id).await;
        channels.remove(game_id).await;
        assert!(!channels.channels.read().await.contains_key(&game_id));
    }
}
