//! Plain-text rendering for the command line.

use std::collections::HashMap;

use database::{SessionRecord, StatisticsOverview, StatisticsRow};
use itertools::Itertools;
use scoring::SessionView;
use types::{Placement, PlayerId};

fn name_of(names: &HashMap<PlayerId, String>, id: &PlayerId) -> String {
    names
        .get(id)
        .cloned()
        .unwrap_or_else(|| id.to_string()[..8].to_string())
}

fn optional(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

pub fn render_view(view: &SessionView, names: &HashMap<PlayerId, String>) -> String {
    let mut lines = vec![format!(
        "{} {} ({}), next round {}",
        view.game_type, view.session_id, view.state, view.next_round
    )];
    for seat in &view.participants {
        let score = view.display_scores.get(seat).copied().unwrap_or(0);
        let rounds = view
            .rounds
            .iter()
            .map(|r| r.entry(seat).map_or_else(|| ".".to_string(), |e| e.to_string()))
            .join(" ");
        let marker = match view.outcome.as_ref().map(|o| o.placement(seat)) {
            Some(Placement::Winner) => " (winner)",
            Some(Placement::Loser) => " (loser)",
            _ if view.dealer.as_ref() == Some(seat) => " (deals)",
            _ => "",
        };
        lines.push(format!(
            "  {:<12} {:>5}  {rounds}{marker}",
            name_of(names, seat),
            score
        ));
    }
    lines.join("\n")
}

pub fn render_statistics(rows: &[StatisticsRow], overview: &StatisticsOverview) -> String {
    let mut lines = vec![format!(
        "{} players, {} games finalized, {} rounds",
        overview.players, overview.finalized_sessions, overview.rounds_played
    )];
    lines.push(format!(
        "  {:<12} {:>5} {:>4} {:>4} {:>6} {:>6} {:>6} {:>8}",
        "player", "games", "won", "lost", "best", "worst", "rounds", "avg end"
    ));
    for row in rows {
        let stats = &row.stats;
        lines.push(format!(
            "  {:<12} {:>5} {:>4} {:>4} {:>6} {:>6} {:>6} {:>8}",
            row.player_name,
            stats.games_played,
            stats.games_won,
            stats.games_lost,
            optional(stats.best_end),
            optional(stats.worst_end),
            stats.rounds_played,
            stats
                .average_end()
                .map_or_else(|| "-".to_string(), |avg| format!("{avg:.1}")),
        ));
    }
    lines.join("\n")
}

pub fn render_sessions(sessions: &[SessionRecord]) -> String {
    if sessions.is_empty() {
        return "no paused sessions".to_string();
    }
    sessions
        .iter()
        .map(|s| {
            format!(
                "{} {} started {}",
                s.id,
                s.game_type,
                s.created_at.format("%Y-%m-%d %H:%M")
            )
        })
        .join("\n")
}
