pub mod aggregator;
pub mod games;
pub mod input;
pub mod policy;
pub mod view;

pub use aggregator::{compute_standings, compute_totals, PlayerStanding, Standings};
pub use policy::{
    policy_for, ranked_outcome, PolicyError, RoundScore, ScoringPolicy, Termination,
};
pub use view::{dealer_for, SessionView};
