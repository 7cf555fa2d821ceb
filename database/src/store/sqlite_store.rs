use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use types::{
    FinalSummary, GameConfig, GameType, LifecycleEvent, Outcome, ParseError, PlayerId,
    PlayerStatistics, RoundEntry, RoundRecord, SessionId, SessionState,
};
use uuid::Uuid;

use super::ScoreStore;
use crate::config::DatabaseConfig;
use crate::models::{
    AppendOutcome, NewSession, ParticipationRecord, PlayerRecord, PresetRecord, SessionRecord,
    StatisticsOverview, StatisticsRow,
};
use crate::DatabaseError;

/// Constraint violations are the caller's fault and never retried.
fn query_err(e: sqlx::Error) -> DatabaseError {
    match &e {
        sqlx::Error::Database(db)
            if db.is_unique_violation()
                || db.is_foreign_key_violation()
                || db.is_check_violation() =>
        {
            DatabaseError::InvalidInput(db.message().to_string())
        }
        _ => DatabaseError::Query(e.to_string()),
    }
}

fn decode_err(e: ParseError) -> DatabaseError {
    DatabaseError::Decode(e.to_string())
}

fn tx_err(e: sqlx::Error) -> DatabaseError {
    DatabaseError::Transaction(e.to_string())
}

fn parse_uuid(raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(DatabaseError::UuidParsing)
}

fn opt_uuid(raw: Option<String>) -> Result<Option<Uuid>, DatabaseError> {
    raw.as_deref().map(parse_uuid).transpose()
}

fn player_from_row(row: &SqliteRow) -> Result<PlayerRecord, DatabaseError> {
    let id: String = row.try_get("id").map_err(query_err)?;
    Ok(PlayerRecord {
        id: parse_uuid(&id)?,
        name: row.try_get("name").map_err(query_err)?,
        created_at: row.try_get("created_at").map_err(query_err)?,
    })
}

fn session_from_row(row: &SqliteRow) -> Result<SessionRecord, DatabaseError> {
    let id: i64 = row.try_get("id").map_err(query_err)?;
    let game_type: String = row.try_get("game_type").map_err(query_err)?;
    let state: String = row.try_get("state").map_err(query_err)?;
    let config: Vec<u8> = row.try_get("config").map_err(query_err)?;
    Ok(SessionRecord {
        id: SessionId::new(id),
        game_type: game_type.parse::<GameType>().map_err(decode_err)?,
        created_at: row.try_get("created_at").map_err(query_err)?,
        ended_at: row.try_get("ended_at").map_err(query_err)?,
        state: state.parse::<SessionState>().map_err(decode_err)?,
        dealer_id: opt_uuid(row.try_get("dealer_id").map_err(query_err)?)?,
        round_origin: row.try_get("round_origin").map_err(query_err)?,
        config: serde_json::from_slice::<GameConfig>(&config)?,
    })
}

fn participation_from_row(row: &SqliteRow) -> Result<ParticipationRecord, DatabaseError> {
    let session_id: i64 = row.try_get("session_id").map_err(query_err)?;
    let player_id: String = row.try_get("player_id").map_err(query_err)?;
    Ok(ParticipationRecord {
        session_id: SessionId::new(session_id),
        player_id: parse_uuid(&player_id)?,
        seat_index: row.try_get("seat_index").map_err(query_err)?,
        is_winner: row.try_get("is_winner").map_err(query_err)?,
        is_loser: row.try_get("is_loser").map_err(query_err)?,
    })
}

fn round_from_row(row: &SqliteRow) -> Result<RoundRecord, DatabaseError> {
    let payload: Vec<u8> = row.try_get("payload").map_err(query_err)?;
    let entries: BTreeMap<PlayerId, RoundEntry> = serde_json::from_slice(&payload)?;
    Ok(RoundRecord {
        round_number: row.try_get("round_number").map_err(query_err)?,
        dealer: opt_uuid(row.try_get("dealer_id").map_err(query_err)?)?,
        entries,
    })
}

fn statistics_from_row(row: &SqliteRow) -> Result<PlayerStatistics, DatabaseError> {
    let player_id: String = row.try_get("player_id").map_err(query_err)?;
    let game_type: String = row.try_get("game_type").map_err(query_err)?;
    Ok(PlayerStatistics {
        player_id: parse_uuid(&player_id)?,
        game_type: game_type.parse::<GameType>().map_err(decode_err)?,
        games_played: row.try_get("games_played").map_err(query_err)?,
        games_won: row.try_get("games_won").map_err(query_err)?,
        games_lost: row.try_get("games_lost").map_err(query_err)?,
        rounds_played: row.try_get("rounds_played").map_err(query_err)?,
        best_round: row.try_get("best_round").map_err(query_err)?,
        worst_round: row.try_get("worst_round").map_err(query_err)?,
        best_end: row.try_get("best_end").map_err(query_err)?,
        worst_end: row.try_get("worst_end").map_err(query_err)?,
        total_end: row.try_get("total_end").map_err(query_err)?,
        total_round_score: row.try_get("total_round_score").map_err(query_err)?,
    })
}

async fn load_session(
    conn: &mut SqliteConnection,
    id: SessionId,
) -> Result<SessionRecord, DatabaseError> {
    let row = sqlx::query("SELECT * FROM game_sessions WHERE id = ?")
        .bind(id.as_i64())
        .fetch_optional(&mut *conn)
        .await
        .map_err(query_err)?;
    match row {
        Some(row) => session_from_row(&row),
        None => Err(DatabaseError::SessionNotFound(id)),
    }
}

async fn load_statistics(
    conn: &mut SqliteConnection,
    player_id: PlayerId,
    game_type: GameType,
) -> Result<Option<PlayerStatistics>, DatabaseError> {
    let row = sqlx::query("SELECT * FROM player_statistics WHERE player_id = ? AND game_type = ?")
        .bind(player_id.to_string())
        .bind(game_type.as_str())
        .fetch_optional(&mut *conn)
        .await
        .map_err(query_err)?;
    row.as_ref().map(statistics_from_row).transpose()
}

async fn save_statistics(
    conn: &mut SqliteConnection,
    stats: &PlayerStatistics,
) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT OR REPLACE INTO player_statistics (player_id, game_type, games_played, games_won, games_lost, rounds_played, best_round, worst_round, best_end, worst_end, total_end, total_round_score) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind(stats.player_id.to_string())
    .bind(stats.game_type.as_str())
    .bind(stats.games_played)
    .bind(stats.games_won)
    .bind(stats.games_lost)
    .bind(stats.rounds_played)
    .bind(stats.best_round)
    .bind(stats.worst_round)
    .bind(stats.best_end)
    .bind(stats.worst_end)
    .bind(stats.total_end)
    .bind(stats.total_round_score)
    .execute(&mut *conn)
    .await
    .map_err(query_err)?;
    Ok(())
}

async fn purge_session(conn: &mut SqliteConnection, id: SessionId) -> Result<(), DatabaseError> {
    for statement in [
        "DELETE FROM round_records WHERE session_id = ?",
        "DELETE FROM player_participation WHERE session_id = ?",
        "DELETE FROM game_sessions WHERE id = ?",
    ] {
        sqlx::query(statement)
            .bind(id.as_i64())
            .execute(&mut *conn)
            .await
            .map_err(query_err)?;
    }
    Ok(())
}

/// Rejects ledger and roster edits unless the session is open for rounds.
fn ensure_open(session: &SessionRecord) -> Result<(), DatabaseError> {
    if session.state.accepts_rounds() {
        Ok(())
    } else {
        Err(DatabaseError::InvalidState {
            session_id: session.id,
            state: session.state,
            event: LifecycleEvent::LedgerChanged,
        })
    }
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens the pool described by `config` and brings the schema up to date.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let store = Self::new(config.create_pool().await?);
        store.run_migrations().await?;
        Ok(store)
    }

    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;
        tracing::debug!("Score database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ScoreStore for SqliteStore {
    async fn upsert_player(&self, name: &str) -> Result<PlayerRecord, DatabaseError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DatabaseError::InvalidInput(
                "player name must not be empty".to_string(),
            ));
        }
        sqlx::query("INSERT OR IGNORE INTO players (id, name, created_at) VALUES (?, ?, ?)")
            .bind(Uuid::new_v4().to_string())
            .bind(name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(query_err)?;
        self.get_player_by_name(name)
            .await?
            .ok_or_else(|| DatabaseError::PlayerNotFound(name.to_string()))
    }

    async fn get_player(&self, id: PlayerId) -> Result<PlayerRecord, DatabaseError> {
        let row = sqlx::query("SELECT id, name, created_at FROM players WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_err)?;
        match row {
            Some(row) => player_from_row(&row),
            None => Err(DatabaseError::PlayerNotFound(id.to_string())),
        }
    }

    async fn get_player_by_name(&self, name: &str) -> Result<Option<PlayerRecord>, DatabaseError> {
        let row = sqlx::query("SELECT id, name, created_at FROM players WHERE name = ?")
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_err)?;
        row.as_ref().map(player_from_row).transpose()
    }

    async fn list_players(&self) -> Result<Vec<PlayerRecord>, DatabaseError> {
        let rows = sqlx::query("SELECT id, name, created_at FROM players ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(query_err)?;
        rows.iter().map(player_from_row).collect()
    }

    async fn rename_player(&self, id: PlayerId, name: &str) -> Result<(), DatabaseError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DatabaseError::InvalidInput(
                "player name must not be empty".to_string(),
            ));
        }
        let mut tx = self.pool.begin().await.map_err(tx_err)?;
        let holder: Option<String> = sqlx::query_scalar("SELECT id FROM players WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *tx)
            .await
            .map_err(query_err)?;
        if holder.is_some_and(|holder| holder != id.to_string()) {
            return Err(DatabaseError::InvalidInput(format!(
                "player name {name:?} is already taken"
            )));
        }

        let result = sqlx::query("UPDATE players SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::PlayerNotFound(id.to_string()));
        }
        tx.commit().await.map_err(tx_err)?;
        Ok(())
    }

    async fn delete_player(&self, id: PlayerId) -> Result<(), DatabaseError> {
        let player_id = id.to_string();
        let mut tx = self.pool.begin().await.map_err(tx_err)?;

        for statement in [
            "DELETE FROM preset_players WHERE player_id = ?",
            "DELETE FROM player_participation WHERE player_id = ?",
            "DELETE FROM player_statistics WHERE player_id = ?",
            "UPDATE game_sessions SET dealer_id = NULL WHERE dealer_id = ?",
        ] {
            sqlx::query(statement)
                .bind(&player_id)
                .execute(&mut *tx)
                .await
                .map_err(query_err)?;
        }
        sqlx::query("DELETE FROM presets WHERE id NOT IN (SELECT preset_id FROM preset_players)")
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        let result = sqlx::query("DELETE FROM players WHERE id = ?")
            .bind(&player_id)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::PlayerNotFound(player_id));
        }

        tx.commit().await.map_err(tx_err)?;
        tracing::info!(player = %id, "Deleted player");
        Ok(())
    }

    async fn create_session(&self, new: &NewSession) -> Result<SessionRecord, DatabaseError> {
        let config_json = serde_json::to_vec(&new.config)?;
        let created_at = Utc::now();
        let mut tx = self.pool.begin().await.map_err(tx_err)?;

        let result = sqlx::query(
            "INSERT INTO game_sessions (game_type, created_at, state, dealer_id, round_origin, config) VALUES (?, ?, ?, ?, ?, ?)"
        )
        .bind(new.config.game_type().as_str())
        .bind(created_at)
        .bind(SessionState::Created.as_str())
        .bind(new.dealer_id.map(|id| id.to_string()))
        .bind(new.round_origin)
        .bind(config_json)
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;
        let id = SessionId::new(result.last_insert_rowid());

        for (seat, player_id) in new.players.iter().enumerate() {
            sqlx::query(
                "INSERT INTO player_participation (session_id, player_id, seat_index) VALUES (?, ?, ?)",
            )
            .bind(id.as_i64())
            .bind(player_id.to_string())
            .bind(seat as i64)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        }

        let session = load_session(&mut tx, id).await?;
        tx.commit().await.map_err(tx_err)?;
        Ok(session)
    }

    async fn get_session(&self, id: SessionId) -> Result<SessionRecord, DatabaseError> {
        let mut conn = self.pool.acquire().await.map_err(query_err)?;
        load_session(&mut conn, id).await
    }

    async fn list_sessions(
        &self,
        game_type: GameType,
        state: Option<SessionState>,
    ) -> Result<Vec<SessionRecord>, DatabaseError> {
        let state = state.map(|s| s.as_str());
        let rows = sqlx::query(
            "SELECT * FROM game_sessions WHERE game_type = ? AND (? IS NULL OR state = ?) ORDER BY created_at DESC, id DESC",
        )
        .bind(game_type.as_str())
        .bind(state)
        .bind(state)
        .fetch_all(&self.pool)
        .await
        .map_err(query_err)?;
        rows.iter().map(session_from_row).collect()
    }

    async fn transition(
        &self,
        id: SessionId,
        event: LifecycleEvent,
    ) -> Result<SessionState, DatabaseError> {
        let mut tx = self.pool.begin().await.map_err(tx_err)?;
        let session = load_session(&mut tx, id).await?;
        let next = session
            .state
            .apply(event)
            .map_err(|e| DatabaseError::from_transition(id, e))?;

        match next {
            SessionState::Deleted => purge_session(&mut tx, id).await?,
            SessionState::Finished => {
                sqlx::query("UPDATE game_sessions SET state = ?, ended_at = ? WHERE id = ?")
                    .bind(next.as_str())
                    .bind(Utc::now())
                    .bind(id.as_i64())
                    .execute(&mut *tx)
                    .await
                    .map_err(query_err)?;
            }
            _ => {
                sqlx::query("UPDATE game_sessions SET state = ? WHERE id = ?")
                    .bind(next.as_str())
                    .bind(id.as_i64())
                    .execute(&mut *tx)
                    .await
                    .map_err(query_err)?;
            }
        }

        tx.commit().await.map_err(tx_err)?;
        tracing::debug!(session = %id, from = %session.state, to = %next, "Session transition");
        Ok(next)
    }

    async fn set_dealer(
        &self,
        id: SessionId,
        dealer: Option<PlayerId>,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE game_sessions SET dealer_id = ? WHERE id = ?")
            .bind(dealer.map(|d| d.to_string()))
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(query_err)?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::SessionNotFound(id));
        }
        Ok(())
    }

    async fn finish_session(
        &self,
        id: SessionId,
        outcome: &Outcome,
    ) -> Result<SessionRecord, DatabaseError> {
        let mut tx = self.pool.begin().await.map_err(tx_err)?;
        let session = load_session(&mut tx, id).await?;
        let next = session
            .state
            .apply(LifecycleEvent::Finish)
            .map_err(|e| DatabaseError::from_transition(id, e))?;

        sqlx::query("UPDATE game_sessions SET state = ?, ended_at = ? WHERE id = ?")
            .bind(next.as_str())
            .bind(Utc::now())
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        let rows = sqlx::query("SELECT * FROM player_participation WHERE session_id = ?")
            .bind(id.as_i64())
            .fetch_all(&mut *tx)
            .await
            .map_err(query_err)?;
        for row in &rows {
            let participation = participation_from_row(row)?;
            sqlx::query(
                "UPDATE player_participation SET is_winner = ?, is_loser = ? WHERE session_id = ? AND player_id = ?",
            )
            .bind(outcome.is_winner(&participation.player_id))
            .bind(outcome.is_loser(&participation.player_id))
            .bind(id.as_i64())
            .bind(participation.player_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        }

        let session = load_session(&mut tx, id).await?;
        tx.commit().await.map_err(tx_err)?;
        Ok(session)
    }

    async fn add_participant(
        &self,
        id: SessionId,
        player_id: PlayerId,
    ) -> Result<ParticipationRecord, DatabaseError> {
        let mut tx = self.pool.begin().await.map_err(tx_err)?;
        let session = load_session(&mut tx, id).await?;
        ensure_open(&session)?;

        let seated: Option<i64> = sqlx::query_scalar(
            "SELECT seat_index FROM player_participation WHERE session_id = ? AND player_id = ?",
        )
        .bind(id.as_i64())
        .bind(player_id.to_string())
        .fetch_optional(&mut *tx)
        .await
        .map_err(query_err)?;
        if seated.is_some() {
            return Err(DatabaseError::InvalidInput(format!(
                "player {player_id} already plays in session {id}"
            )));
        }

        let seat: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(seat_index) + 1, 0) FROM player_participation WHERE session_id = ?",
        )
        .bind(id.as_i64())
        .fetch_one(&mut *tx)
        .await
        .map_err(query_err)?;

        sqlx::query(
            "INSERT INTO player_participation (session_id, player_id, seat_index) VALUES (?, ?, ?)",
        )
        .bind(id.as_i64())
        .bind(player_id.to_string())
        .bind(seat)
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        tx.commit().await.map_err(tx_err)?;
        Ok(ParticipationRecord {
            session_id: id,
            player_id,
            seat_index: seat as u32,
            is_winner: false,
            is_loser: false,
        })
    }

    async fn remove_participant(
        &self,
        id: SessionId,
        player_id: PlayerId,
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await.map_err(tx_err)?;
        let session = load_session(&mut tx, id).await?;
        ensure_open(&session)?;

        let seat: Option<i64> = sqlx::query_scalar(
            "SELECT seat_index FROM player_participation WHERE session_id = ? AND player_id = ?",
        )
        .bind(id.as_i64())
        .bind(player_id.to_string())
        .fetch_optional(&mut *tx)
        .await
        .map_err(query_err)?;
        let Some(seat) = seat else {
            return Err(DatabaseError::PlayerNotFound(player_id.to_string()));
        };

        sqlx::query("DELETE FROM player_participation WHERE session_id = ? AND player_id = ?")
            .bind(id.as_i64())
            .bind(player_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        sqlx::query(
            "UPDATE player_participation SET seat_index = seat_index - 1 WHERE session_id = ? AND seat_index > ?",
        )
        .bind(id.as_i64())
        .bind(seat)
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        tx.commit().await.map_err(tx_err)?;
        Ok(())
    }

    async fn list_participants(
        &self,
        id: SessionId,
    ) -> Result<Vec<ParticipationRecord>, DatabaseError> {
        let rows = sqlx::query(
            "SELECT * FROM player_participation WHERE session_id = ? ORDER BY seat_index",
        )
        .bind(id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(query_err)?;
        rows.iter().map(participation_from_row).collect()
    }

    async fn append_round(
        &self,
        id: SessionId,
        round: &RoundRecord,
    ) -> Result<AppendOutcome, DatabaseError> {
        let payload = serde_json::to_vec(&round.entries)?;
        let dealer = round.dealer.map(|d| d.to_string());
        let mut tx = self.pool.begin().await.map_err(tx_err)?;
        let session = load_session(&mut tx, id).await?;
        ensure_open(&session)?;

        let newest: Option<u32> =
            sqlx::query_scalar("SELECT MAX(round_number) FROM round_records WHERE session_id = ?")
                .bind(id.as_i64())
                .fetch_one(&mut *tx)
                .await
                .map_err(query_err)?;
        let expected = newest.map_or(session.round_origin, |n| n + 1);

        let outcome = if round.round_number == expected {
            sqlx::query(
                "INSERT INTO round_records (session_id, round_number, dealer_id, payload, created_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(id.as_i64())
            .bind(round.round_number)
            .bind(dealer)
            .bind(payload)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
            AppendOutcome::Appended
        } else if Some(round.round_number) == newest {
            sqlx::query(
                "UPDATE round_records SET dealer_id = ?, payload = ? WHERE session_id = ? AND round_number = ?",
            )
            .bind(dealer)
            .bind(payload)
            .bind(id.as_i64())
            .bind(round.round_number)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
            AppendOutcome::Replaced
        } else {
            return Err(DatabaseError::OutOfOrder {
                session_id: id,
                expected,
                got: round.round_number,
            });
        };

        let next = session
            .state
            .apply(LifecycleEvent::LedgerChanged)
            .map_err(|e| DatabaseError::from_transition(id, e))?;
        if next != session.state {
            sqlx::query("UPDATE game_sessions SET state = ? WHERE id = ?")
                .bind(next.as_str())
                .bind(id.as_i64())
                .execute(&mut *tx)
                .await
                .map_err(query_err)?;
        }

        tx.commit().await.map_err(tx_err)?;
        Ok(outcome)
    }

    async fn remove_last_round(&self, id: SessionId) -> Result<Option<u32>, DatabaseError> {
        let mut tx = self.pool.begin().await.map_err(tx_err)?;
        let session = load_session(&mut tx, id).await?;
        ensure_open(&session)?;

        let newest: Option<u32> =
            sqlx::query_scalar("SELECT MAX(round_number) FROM round_records WHERE session_id = ?")
                .bind(id.as_i64())
                .fetch_one(&mut *tx)
                .await
                .map_err(query_err)?;
        let Some(newest) = newest else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM round_records WHERE session_id = ? AND round_number = ?")
            .bind(id.as_i64())
            .bind(newest)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        tx.commit().await.map_err(tx_err)?;
        Ok(Some(newest))
    }

    async fn get_rounds(&self, id: SessionId) -> Result<Vec<RoundRecord>, DatabaseError> {
        let rows = sqlx::query(
            "SELECT round_number, dealer_id, payload FROM round_records WHERE session_id = ? ORDER BY round_number, id",
        )
        .bind(id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(query_err)?;
        rows.iter().map(round_from_row).collect()
    }

    async fn delete_all_rounds(&self, id: SessionId) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM round_records WHERE session_id = ?")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(query_err)?;
        Ok(result.rows_affected())
    }

    async fn finalize(&self, summary: &FinalSummary) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await.map_err(tx_err)?;

        // Claiming the session first takes the write lock before any statistics are read.
        let claimed = sqlx::query(
            "INSERT OR IGNORE INTO finalized_sessions (session_id, game_type, finalized_at) VALUES (?, ?, ?)",
        )
        .bind(summary.session_id.as_i64())
        .bind(summary.game_type.as_str())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;
        if claimed.rows_affected() == 0 {
            return Err(DatabaseError::DuplicateFinalization(summary.session_id));
        }

        for player in &summary.players {
            let mut stats = load_statistics(&mut tx, player.player_id, summary.game_type)
                .await?
                .unwrap_or_else(|| PlayerStatistics::empty(player.player_id, summary.game_type));
            stats.fold(player, summary.direction, summary.end_direction);
            save_statistics(&mut tx, &stats).await?;
        }

        tx.commit().await.map_err(tx_err)?;
        tracing::info!(
            session = %summary.session_id,
            game = %summary.game_type,
            players = summary.players.len(),
            "Finalized session statistics"
        );
        Ok(())
    }

    async fn is_finalized(&self, id: SessionId) -> Result<bool, DatabaseError> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT session_id FROM finalized_sessions WHERE session_id = ?")
                .bind(id.as_i64())
                .fetch_optional(&self.pool)
                .await
                .map_err(query_err)?;
        Ok(found.is_some())
    }

    async fn get_statistics(
        &self,
        game_type: GameType,
    ) -> Result<Vec<StatisticsRow>, DatabaseError> {
        let rows = sqlx::query(
            "SELECT s.*, p.name AS player_name FROM player_statistics s JOIN players p ON p.id = s.player_id WHERE s.game_type = ? ORDER BY s.games_won DESC, s.games_played DESC, p.name",
        )
        .bind(game_type.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(query_err)?;
        rows.iter()
            .map(|row| {
                Ok(StatisticsRow {
                    player_name: row.try_get("player_name").map_err(query_err)?,
                    stats: statistics_from_row(row)?,
                })
            })
            .collect()
    }

    async fn get_player_statistics(
        &self,
        player_id: PlayerId,
        game_type: GameType,
    ) -> Result<Option<PlayerStatistics>, DatabaseError> {
        let mut conn = self.pool.acquire().await.map_err(query_err)?;
        load_statistics(&mut conn, player_id, game_type).await
    }

    async fn statistics_overview(
        &self,
        game_type: GameType,
    ) -> Result<StatisticsOverview, DatabaseError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS players, COALESCE(SUM(games_played), 0) AS participations, COALESCE(SUM(games_won), 0) AS wins, COALESCE(SUM(rounds_played), 0) AS rounds_played FROM player_statistics WHERE game_type = ? AND games_played > 0",
        )
        .bind(game_type.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(query_err)?;
        let finalized: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM finalized_sessions WHERE game_type = ?")
                .bind(game_type.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(query_err)?;

        let count = |column: &str| -> Result<u32, DatabaseError> {
            let value: i64 = row.try_get(column).map_err(query_err)?;
            Ok(value as u32)
        };
        Ok(StatisticsOverview {
            players: count("players")?,
            finalized_sessions: finalized as u32,
            participations: count("participations")?,
            wins: count("wins")?,
            rounds_played: count("rounds_played")?,
        })
    }

    async fn reset_all_stats(&self, game_type: GameType) -> Result<u64, DatabaseError> {
        let mut tx = self.pool.begin().await.map_err(tx_err)?;
        let rows = sqlx::query("SELECT * FROM player_statistics WHERE game_type = ?")
            .bind(game_type.as_str())
            .fetch_all(&mut *tx)
            .await
            .map_err(query_err)?;
        for row in &rows {
            let mut stats = statistics_from_row(row)?;
            stats.reset();
            save_statistics(&mut tx, &stats).await?;
        }
        tx.commit().await.map_err(tx_err)?;
        tracing::info!(game = %game_type, players = rows.len(), "Reset statistics");
        Ok(rows.len() as u64)
    }

    async fn create_preset(
        &self,
        game_type: GameType,
        name: &str,
        players: &[PlayerId],
    ) -> Result<PresetRecord, DatabaseError> {
        let name = name.trim();
        if name.is_empty() || players.is_empty() {
            return Err(DatabaseError::InvalidInput(
                "a preset needs a name and at least one player".to_string(),
            ));
        }
        let mut tx = self.pool.begin().await.map_err(tx_err)?;
        let result = sqlx::query("INSERT INTO presets (game_type, name) VALUES (?, ?)")
            .bind(game_type.as_str())
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        let id = result.last_insert_rowid();

        for (position, player_id) in players.iter().enumerate() {
            let known: Option<String> = sqlx::query_scalar("SELECT id FROM players WHERE id = ?")
                .bind(player_id.to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(query_err)?;
            if known.is_none() {
                return Err(DatabaseError::PlayerNotFound(player_id.to_string()));
            }
            sqlx::query(
                "INSERT INTO preset_players (preset_id, player_id, position) VALUES (?, ?, ?)",
            )
            .bind(id)
            .bind(player_id.to_string())
            .bind(position as i64)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        }

        tx.commit().await.map_err(tx_err)?;
        Ok(PresetRecord {
            id,
            game_type,
            name: name.to_string(),
            players: players.to_vec(),
        })
    }

    async fn list_presets(&self, game_type: GameType) -> Result<Vec<PresetRecord>, DatabaseError> {
        let rows = sqlx::query("SELECT id, name FROM presets WHERE game_type = ? ORDER BY name")
            .bind(game_type.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(query_err)?;

        let mut presets = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("id").map_err(query_err)?;
            let player_ids: Vec<String> = sqlx::query_scalar(
                "SELECT player_id FROM preset_players WHERE preset_id = ? ORDER BY position",
            )
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(query_err)?;
            presets.push(PresetRecord {
                id,
                game_type,
                name: row.try_get("name").map_err(query_err)?,
                players: player_ids
                    .iter()
                    .map(|raw| parse_uuid(raw))
                    .collect::<Result<_, _>>()?,
            });
        }
        Ok(presets)
    }

    async fn delete_preset(&self, id: i64) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await.map_err(tx_err)?;
        sqlx::query("DELETE FROM preset_players WHERE preset_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        let result = sqlx::query("DELETE FROM presets WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::PresetNotFound(id));
        }
        tx.commit().await.map_err(tx_err)?;
        Ok(())
    }
}
