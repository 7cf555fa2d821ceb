use std::collections::BTreeMap;
use std::sync::Arc;

use database::{
    retry_with_backoff, DatabaseError, ErrorKind, NewSession, PlayerRecord, PresetRecord,
    ScoreStore, SessionRecord, StatisticsOverview, StatisticsRow,
};
use itertools::Itertools;
use scoring::{dealer_for, policy_for, ranked_outcome, SessionView};
use tokio::sync::watch;
use types::{
    FinalSummary, GameType, LifecycleEvent, Outcome, PlayerId, PlayerStatistics, RoundEntry,
    RoundRecord, SessionId, SessionState,
};

use crate::hub::Topics;
use crate::locks::KeyedLocks;
use crate::{KeeperConfig, KeeperError};

pub type ViewReceiver = watch::Receiver<Option<Arc<SessionView>>>;

fn report(action: &str, err: &KeeperError) {
    match err.kind() {
        ErrorKind::StorageFailure => tracing::error!(error = %err, "Failed to {action}"),
        _ => tracing::warn!(error = %err, "Rejected {action}"),
    }
}

/// Orchestrates sessions on top of a [`ScoreStore`]: validates rounds
/// against the game's policy, rebuilds views from persisted rows after every
/// mutation, finishes games when the termination rule fires and folds them
/// into the statistics.
///
/// Mutations of one session are serialized on a per-session async mutex.
/// Statistics folds lock the affected players in ascending id order.
pub struct ScoreKeeper<S> {
    store: Arc<S>,
    config: KeeperConfig,
    session_locks: KeyedLocks<SessionId>,
    player_locks: KeyedLocks<PlayerId>,
    views: Topics<SessionId, Option<Arc<SessionView>>>,
    paused: Topics<GameType, Vec<SessionRecord>>,
    statistics: Topics<GameType, Vec<StatisticsRow>>,
}

impl<S: ScoreStore + 'static> ScoreKeeper<S> {
    pub fn new(store: S, config: KeeperConfig) -> Self {
        Self {
            store: Arc::new(store),
            config,
            session_locks: KeyedLocks::new(),
            player_locks: KeyedLocks::new(),
            views: Topics::default(),
            paused: Topics::default(),
            statistics: Topics::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &KeeperConfig {
        &self.config
    }

    // Sessions

    pub async fn start_game(
        &self,
        game_type: GameType,
        players: &[PlayerId],
    ) -> Result<SessionView, KeeperError> {
        self.open_session(game_type, players)
            .await
            .inspect_err(|e| report("start game", e))
    }

    /// Records a round under an explicit number. The newest round may be
    /// re-entered to correct it.
    pub async fn enter_round(
        &self,
        id: SessionId,
        round: RoundRecord,
    ) -> Result<SessionView, KeeperError> {
        let _guard = self.session_locks.lock(&id).await;
        self.record_round(id, round)
            .await
            .inspect_err(|e| report("enter round", e))
    }

    /// Records a round numbered after the newest one.
    pub async fn enter_next_round(
        &self,
        id: SessionId,
        entries: BTreeMap<PlayerId, RoundEntry>,
    ) -> Result<SessionView, KeeperError> {
        let _guard = self.session_locks.lock(&id).await;
        let result: Result<_, KeeperError> = async {
            let view = self.load_view(id).await?;
            let round = RoundRecord::new(view.next_round, entries);
            self.record_round(id, round).await
        }
        .await;
        result.inspect_err(|e| report("enter round", e))
    }

    pub async fn remove_last_round(&self, id: SessionId) -> Result<SessionView, KeeperError> {
        let _guard = self.session_locks.lock(&id).await;
        self.undo_round(id)
            .await
            .inspect_err(|e| report("remove last round", e))
    }

    /// Returns once every round entered before the call is durable.
    pub async fn pause(&self, id: SessionId) -> Result<SessionView, KeeperError> {
        let _guard = self.session_locks.lock(&id).await;
        self.change_state(id, LifecycleEvent::Pause)
            .await
            .inspect_err(|e| report("pause game", e))
    }

    /// Reloads the ledger and seats the dealer for the next round. Finished
    /// or missing sessions are reported as not found.
    pub async fn resume(&self, id: SessionId) -> Result<SessionView, KeeperError> {
        let _guard = self.session_locks.lock(&id).await;
        let result: Result<_, KeeperError> = async {
            let session = self.store.get_session(id).await?;
            if session.state.is_finished() {
                return Err(DatabaseError::SessionNotFound(id).into());
            }
            self.change_state(id, LifecycleEvent::Resume).await
        }
        .await;
        result.inspect_err(|e| report("resume game", e))
    }

    /// Ends a running game early; placement ranks players by total.
    pub async fn end_game(&self, id: SessionId) -> Result<SessionView, KeeperError> {
        let _guard = self.session_locks.lock(&id).await;
        let result: Result<_, KeeperError> = async {
            let view = self.load_view(id).await?;
            if view.state != SessionState::InProgress {
                return Err(DatabaseError::InvalidState {
                    session_id: id,
                    state: view.state,
                    event: LifecycleEvent::Finish,
                }
                .into());
            }
            let outcome = ranked_outcome(&view.standings);
            self.complete(view, outcome).await
        }
        .await;
        result.inspect_err(|e| report("end game", e))
    }

    /// Retries the statistics fold of a finished session whose earlier
    /// finalization failed, then purges it.
    pub async fn finalize_session(&self, id: SessionId) -> Result<FinalSummary, KeeperError> {
        let _guard = self.session_locks.lock(&id).await;
        let result: Result<_, KeeperError> = async {
            let view = self.load_view(id).await?;
            let outcome = match (&view.outcome, view.state) {
                (Some(outcome), SessionState::Finished) => outcome.clone(),
                _ => {
                    return Err(DatabaseError::InvalidState {
                        session_id: id,
                        state: view.state,
                        event: LifecycleEvent::Archive,
                    }
                    .into())
                }
            };
            let summary = view.final_summary(&outcome);
            self.finalize_and_purge(&summary).await?;
            Ok(summary)
        }
        .await;
        result.inspect_err(|e| report("finalize game", e))
    }

    /// Deletes the session and its ledger without touching statistics.
    pub async fn discard(&self, id: SessionId) -> Result<(), KeeperError> {
        let _guard = self.session_locks.lock(&id).await;
        let result: Result<_, KeeperError> = async {
            let session = self.store.get_session(id).await?;
            self.store.transition(id, LifecycleEvent::Discard).await?;
            self.views.publish(&id, None);
            self.views.close(&id);
            self.refresh_paused(session.game_type).await;
            tracing::info!(session = %id, game = %session.game_type, "Discarded session");
            Ok(())
        }
        .await;
        result.inspect_err(|e| report("discard game", e))
    }

    /// Seats a late joiner; they score from the next round on.
    pub async fn add_participant(
        &self,
        id: SessionId,
        player_id: PlayerId,
    ) -> Result<SessionView, KeeperError> {
        let _guard = self.session_locks.lock(&id).await;
        let result: Result<_, KeeperError> = async {
            self.store.get_player(player_id).await?;
            self.store.add_participant(id, player_id).await?;
            let view = self.reseat_dealer(id).await?;
            self.settle(view).await
        }
        .await;
        result.inspect_err(|e| report("add participant", e))
    }

    pub async fn remove_participant(
        &self,
        id: SessionId,
        player_id: PlayerId,
    ) -> Result<SessionView, KeeperError> {
        let _guard = self.session_locks.lock(&id).await;
        let result: Result<_, KeeperError> = async {
            self.store.remove_participant(id, player_id).await?;
            let view = self.reseat_dealer(id).await?;
            self.settle(view).await
        }
        .await;
        result.inspect_err(|e| report("remove participant", e))
    }

    pub async fn view(&self, id: SessionId) -> Result<SessionView, KeeperError> {
        self.load_view(id).await
    }

    pub async fn paused_sessions(
        &self,
        game_type: GameType,
    ) -> Result<Vec<SessionRecord>, KeeperError> {
        Ok(self
            .store
            .list_sessions(game_type, Some(SessionState::Paused))
            .await?)
    }

    // Subscriptions

    /// Receives a fresh view after every mutation of the session, and `None`
    /// once the session is gone.
    pub async fn subscribe_session(&self, id: SessionId) -> Result<ViewReceiver, KeeperError> {
        let _guard = self.session_locks.lock(&id).await;
        let view = self.load_view(id).await?;
        Ok(self.views.subscribe(id, Some(Arc::new(view))))
    }

    pub async fn subscribe_paused(
        &self,
        game_type: GameType,
    ) -> Result<watch::Receiver<Vec<SessionRecord>>, KeeperError> {
        let sessions = self.paused_sessions(game_type).await?;
        Ok(self.paused.subscribe(game_type, sessions))
    }

    pub async fn subscribe_statistics(
        &self,
        game_type: GameType,
    ) -> Result<watch::Receiver<Vec<StatisticsRow>>, KeeperError> {
        let rows = self.store.get_statistics(game_type).await?;
        Ok(self.statistics.subscribe(game_type, rows))
    }

    // Players

    pub async fn upsert_player(&self, name: &str) -> Result<PlayerRecord, KeeperError> {
        Ok(self.store.upsert_player(name).await?)
    }

    pub async fn list_players(&self) -> Result<Vec<PlayerRecord>, KeeperError> {
        Ok(self.store.list_players().await?)
    }

    pub async fn find_player(&self, name: &str) -> Result<PlayerRecord, KeeperError> {
        self.store
            .get_player_by_name(name)
            .await?
            .ok_or_else(|| DatabaseError::PlayerNotFound(name.to_string()).into())
    }

    pub async fn rename_player(&self, id: PlayerId, name: &str) -> Result<(), KeeperError> {
        self.store.rename_player(id, name).await?;
        self.refresh_all_statistics().await;
        Ok(())
    }

    pub async fn delete_player(&self, id: PlayerId) -> Result<(), KeeperError> {
        let _guard = self.player_locks.lock(&id).await;
        self.store
            .delete_player(id)
            .await
            .map_err(KeeperError::from)
            .inspect_err(|e| report("delete player", e))?;
        self.refresh_all_statistics().await;
        Ok(())
    }

    // Presets

    pub async fn create_preset(
        &self,
        game_type: GameType,
        name: &str,
        players: &[PlayerId],
    ) -> Result<PresetRecord, KeeperError> {
        Ok(self.store.create_preset(game_type, name, players).await?)
    }

    pub async fn list_presets(&self, game_type: GameType) -> Result<Vec<PresetRecord>, KeeperError> {
        Ok(self.store.list_presets(game_type).await?)
    }

    pub async fn delete_preset(&self, id: i64) -> Result<(), KeeperError> {
        Ok(self.store.delete_preset(id).await?)
    }

    // Statistics

    pub async fn statistics(&self, game_type: GameType) -> Result<Vec<StatisticsRow>, KeeperError> {
        Ok(self.store.get_statistics(game_type).await?)
    }

    pub async fn player_statistics(
        &self,
        player_id: PlayerId,
        game_type: GameType,
    ) -> Result<PlayerStatistics, KeeperError> {
        Ok(self
            .store
            .get_player_statistics(player_id, game_type)
            .await?
            .unwrap_or_else(|| PlayerStatistics::empty(player_id, game_type)))
    }

    pub async fn statistics_overview(
        &self,
        game_type: GameType,
    ) -> Result<StatisticsOverview, KeeperError> {
        Ok(self.store.statistics_overview(game_type).await?)
    }

    pub async fn reset_statistics(&self, game_type: GameType) -> Result<u64, KeeperError> {
        let reset = self
            .store
            .reset_all_stats(game_type)
            .await
            .map_err(KeeperError::from)
            .inspect_err(|e| report("reset statistics", e))?;
        self.refresh_statistics(game_type).await;
        Ok(reset)
    }

    // Internals, called with the session lock held.

    async fn open_session(
        &self,
        game_type: GameType,
        players: &[PlayerId],
    ) -> Result<SessionView, KeeperError> {
        if players.is_empty() {
            return Err(KeeperError::Input("a game needs at least one player".into()));
        }
        if !players.iter().all_unique() {
            return Err(KeeperError::Input("a player can only take one seat".into()));
        }
        for &player_id in players {
            self.store.get_player(player_id).await?;
        }

        let config = self.config.game_config(game_type, players.len());
        let policy = policy_for(&config);
        let session = self
            .store
            .create_session(&NewSession {
                config,
                players: players.to_vec(),
                round_origin: policy.round_origin(),
                dealer_id: dealer_for(players, 0),
            })
            .await?;
        let _guard = self.session_locks.lock(&session.id).await;
        self.store
            .transition(session.id, LifecycleEvent::Start)
            .await?;

        let view = self.load_view(session.id).await?;
        tracing::info!(
            session = %session.id,
            game = %game_type,
            players = players.len(),
            "Started game"
        );
        Ok(view)
    }

    async fn record_round(
        &self,
        id: SessionId,
        round: RoundRecord,
    ) -> Result<SessionView, KeeperError> {
        let session = self.store.get_session(id).await?;
        let seats = self.seats(id).await?;
        if round.entries.is_empty() {
            return Err(KeeperError::Input("a round needs at least one entry".into()));
        }
        if let Some(stranger) = round.entries.keys().find(|p| !seats.contains(p)) {
            return Err(KeeperError::Input(format!(
                "player {stranger} is not seated in session {id}"
            )));
        }

        let policy = policy_for(&session.config);
        policy.validate(&round)?;
        let round = match round.dealer {
            Some(_) => round,
            None => round.with_dealer(session.dealer_id),
        };

        let appended = self.store.append_round(id, &round).await?;
        tracing::debug!(session = %id, round = round.round_number, ?appended, "Recorded round");

        let view = self.reseat_dealer(id).await?;
        self.settle(view).await
    }

    async fn undo_round(&self, id: SessionId) -> Result<SessionView, KeeperError> {
        match self.store.remove_last_round(id).await? {
            Some(round_number) => {
                tracing::debug!(session = %id, round = round_number, "Removed round")
            }
            None => tracing::debug!(session = %id, "Nothing to undo"),
        }
        let view = self.reseat_dealer(id).await?;
        self.settle(view).await
    }

    async fn change_state(
        &self,
        id: SessionId,
        event: LifecycleEvent,
    ) -> Result<SessionView, KeeperError> {
        let state = self.store.transition(id, event).await?;
        let view = self.reseat_dealer(id).await?;
        self.publish_view(&view);
        self.refresh_paused(view.game_type).await;
        tracing::info!(session = %id, ?event, %state, "Session state changed");
        Ok(view)
    }

    /// Rebuilds the view and stores the dealer derived from the ledger.
    async fn reseat_dealer(&self, id: SessionId) -> Result<SessionView, KeeperError> {
        let view = self.load_view(id).await?;
        self.store.set_dealer(id, view.dealer).await?;
        Ok(view)
    }

    /// Finishes the game when its termination rule fired, otherwise publishes.
    async fn settle(&self, view: SessionView) -> Result<SessionView, KeeperError> {
        match (&view.outcome, view.state) {
            (Some(outcome), SessionState::InProgress) => {
                let outcome = outcome.clone();
                self.complete(view, outcome).await
            }
            _ => {
                self.publish_view(&view);
                Ok(view)
            }
        }
    }

    /// Marks the game finished, folds it into the statistics and purges it.
    /// The returned view is the final snapshot taken before the purge.
    async fn complete(
        &self,
        view: SessionView,
        outcome: Outcome,
    ) -> Result<SessionView, KeeperError> {
        let id = view.session_id;
        if !view.state.is_finished() {
            self.store.finish_session(id, &outcome).await?;
        }
        let finished = self.load_view(id).await?;
        self.publish_view(&finished);
        tracing::info!(
            session = %id,
            game = %finished.game_type,
            winners = ?outcome.winners,
            losers = ?outcome.losers,
            "Game over"
        );

        let outcome = finished.outcome.clone().unwrap_or(outcome);
        self.finalize_and_purge(&finished.final_summary(&outcome))
            .await?;
        Ok(finished)
    }

    async fn finalize_and_purge(&self, summary: &FinalSummary) -> Result<(), KeeperError> {
        let id = summary.session_id;
        {
            let _players = self
                .player_locks
                .lock_all(summary.players.iter().map(|p| p.player_id))
                .await;
            match self.finalize_with_retry(summary.clone()).await {
                Ok(()) => {}
                Err(DatabaseError::DuplicateFinalization(_)) => {
                    tracing::warn!(session = %id, "Statistics already folded, purging session");
                }
                Err(e) => {
                    tracing::error!(session = %id, error = %e, "Finalization failed, ledger kept");
                    return Err(e.into());
                }
            }
        }

        self.store.transition(id, LifecycleEvent::Archive).await?;
        self.views.publish(&id, None);
        self.views.close(&id);
        self.refresh_statistics(summary.game_type).await;
        Ok(())
    }

    async fn finalize_with_retry(&self, summary: FinalSummary) -> Result<(), DatabaseError> {
        let store = self.store.clone();
        let summary = Arc::new(summary);
        retry_with_backoff(
            move || {
                let store = store.clone();
                let summary = summary.clone();
                Box::pin(async move { store.finalize(&summary).await })
            },
            self.config.finalize_retries,
            self.config.finalize_delay(),
            DatabaseError::is_transient,
        )
        .await
    }

    async fn seats(&self, id: SessionId) -> Result<Vec<PlayerId>, KeeperError> {
        Ok(self
            .store
            .list_participants(id)
            .await?
            .into_iter()
            .map(|p| p.player_id)
            .collect())
    }

    async fn load_view(&self, id: SessionId) -> Result<SessionView, KeeperError> {
        let session = self.store.get_session(id).await?;
        let participants = self.store.list_participants(id).await?;
        let rounds = self.store.get_rounds(id).await?;
        let policy = policy_for(&session.config);

        let recorded = session.state.is_finished().then(|| {
            Outcome::new(
                participants
                    .iter()
                    .filter(|p| p.is_winner)
                    .map(|p| p.player_id)
                    .collect(),
                participants
                    .iter()
                    .filter(|p| p.is_loser)
                    .map(|p| p.player_id)
                    .collect(),
            )
        });
        let seats = participants.iter().map(|p| p.player_id).collect();
        Ok(SessionView::build(
            id,
            session.state,
            policy.as_ref(),
            seats,
            rounds,
            recorded,
        ))
    }

    fn publish_view(&self, view: &SessionView) {
        self.views
            .publish(&view.session_id, Some(Arc::new(view.clone())));
    }

    async fn refresh_paused(&self, game_type: GameType) {
        if !self.paused.is_watched(&game_type) {
            return;
        }
        match self.paused_sessions(game_type).await {
            Ok(sessions) => self.paused.publish(&game_type, sessions),
            Err(e) => report("refresh paused sessions", &e),
        }
    }

    async fn refresh_statistics(&self, game_type: GameType) {
        if !self.statistics.is_watched(&game_type) {
            return;
        }
        match self.store.get_statistics(game_type).await {
            Ok(rows) => self.statistics.publish(&game_type, rows),
            Err(e) => report("refresh statistics", &KeeperError::from(e)),
        }
    }

    async fn refresh_all_statistics(&self) {
        for game_type in GameType::ALL {
            self.refresh_statistics(game_type).await;
        }
    }
}
