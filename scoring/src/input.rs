//! Parses typed round lines, one token per seated player.
//!
//! | game      | token examples            |
//! |-----------|---------------------------|
//! | Skyjo     | `12`, `-3`, `12*` (closed)|
//! | Dart      | `T20,D5,1`, `B`, `DB`, `0`|
//! | Schwimmen | `0`, `1`                  |
//! | Wizard    | `2/1` (bid/tricks)        |
//! | Rommé     | `35`, `0!` out, `0!!` hand|
//! | Flip7     | `23`, `27+` seven, `x`    |

use regex::{Captures, Regex};
use types::{
    round::BULL, DartThrow, DartTurn, GameType, Multiplier, PlayerId, RoundEntry, RoundRecord,
};

pub fn parse_round_line(
    game_type: GameType,
    line: &str,
    seats: &[PlayerId],
    round_number: u32,
) -> Result<RoundRecord, String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != seats.len() {
        return Err(format!(
            "Expected {} entries (one per player), got {}: {line:?}",
            seats.len(),
            tokens.len()
        ));
    }
    let entries = seats
        .iter()
        .zip(tokens)
        .map(|(&id, token)| parse_entry(game_type, token).map(|entry| (id, entry)))
        .collect::<Result<Vec<_>, String>>()?;
    Ok(RoundRecord::new(round_number, entries))
}

pub fn parse_entry(game_type: GameType, token: &str) -> Result<RoundEntry, String> {
    let token = token.trim().to_lowercase();
    let token = token.as_str();
    match game_type {
        GameType::Skyjo => {
            let caps = captures(r"^(?<points>-?\d+)(?<closed>\*)?$", token)?;
            Ok(RoundEntry::Skyjo {
                points: number(&caps, "points")?,
                closed_round: caps.name("closed").is_some(),
            })
        }
        GameType::Dart => parse_turn(token).map(RoundEntry::Dart),
        GameType::Schwimmen => {
            let caps = captures(r"^(?<lost>\d+)$", token)?;
            Ok(RoundEntry::Schwimmen {
                lives_lost: number(&caps, "lost")?,
            })
        }
        GameType::Wizard => {
            let caps = captures(r"^(?<bid>\d+)/(?<tricks>\d+)$", token)?;
            Ok(RoundEntry::Wizard {
                bid: number(&caps, "bid")?,
                tricks: number(&caps, "tricks")?,
            })
        }
        GameType::Romme => {
            let caps = captures(r"^(?<penalty>\d+)(?<out>!{1,2})?$", token)?;
            let out = caps.name("out").map(|m| m.as_str().len()).unwrap_or(0);
            Ok(RoundEntry::Romme {
                penalty: number(&caps, "penalty")?,
                went_out: out > 0,
                hand_romme: out == 2,
            })
        }
        GameType::Flip7 => {
            if token == "x" {
                return Ok(RoundEntry::Flip7 {
                    points: 0,
                    busted: true,
                    flip_seven: false,
                });
            }
            let caps = captures(r"^(?<points>\d+)(?<seven>\+)?$", token)?;
            Ok(RoundEntry::Flip7 {
                points: number(&caps, "points")?,
                busted: false,
                flip_seven: caps.name("seven").is_some(),
            })
        }
    }
}

fn parse_turn(token: &str) -> Result<DartTurn, String> {
    if token == "-" {
        return Ok(DartTurn::default());
    }
    let throw_re =
        Regex::new(r"^(?<mult>[sdt])?(?<segment>\d+|b|bull)$").expect("Valid dart throw regex");
    let throws = token
        .split(',')
        .map(|throw_str| {
            let Some(caps) = throw_re.captures(throw_str) else {
                return Err(format!("Unable to parse dart throw from {throw_str:?}"));
            };
            let multiplier = match caps.name("mult").map(|m| m.as_str()) {
                Some("d") => Multiplier::Double,
                Some("t") => Multiplier::Triple,
                _ => Multiplier::Single,
            };
            let segment = match caps.name("segment").map(|m| m.as_str()) {
                Some("b" | "bull") => BULL,
                _ => number(&caps, "segment")?,
            };
            let throw = DartThrow::new(segment, multiplier);
            if !throw.is_valid() {
                return Err(format!("{throw} is not on the board"));
            }
            Ok(throw)
        })
        .collect::<Result<Vec<_>, String>>()?;
    Ok(DartTurn::new(throws))
}

fn captures<'a>(pattern: &str, token: &'a str) -> Result<Captures<'a>, String> {
    let re = Regex::new(pattern).expect("Valid entry regex");
    re.captures(token)
        .ok_or_else(|| format!("Unable to parse entry from {token:?}"))
}

fn number<T: std::str::FromStr>(caps: &Captures, group: &str) -> Result<T, String> {
    let text = caps
        .name(group)
        .map(|m| m.as_str())
        .ok_or_else(|| format!("Missing {group}"))?;
    text.parse()
        .map_err(|_| format!("{text:?} is not a valid {group}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_parse_skyjo_line() {
        let seats = [Uuid::new_v4(), Uuid::new_v4()];
        let round = parse_round_line(GameType::Skyjo, "12* -3", &seats, 4).unwrap();
        assert_eq!(round.round_number, 4);
        assert_eq!(
            round.entry(&seats[0]),
            Some(&RoundEntry::Skyjo {
                points: 12,
                closed_round: true
            })
        );
        assert_eq!(round.entry(&seats[1]), Some(&RoundEntry::skyjo(-3)));
    }

    #[test]
    fn test_token_count_must_match_seats() {
        let seats = [Uuid::new_v4(), Uuid::new_v4()];
        assert!(parse_round_line(GameType::Skyjo, "12", &seats, 1).is_err());
    }

    #[test]
    fn test_parse_darts() {
        let entry = parse_entry(GameType::Dart, "T20,d5,B").unwrap();
        assert_eq!(
            entry,
            RoundEntry::Dart(DartTurn::new(vec![
                DartThrow::triple(20),
                DartThrow::double(5),
                DartThrow::single(BULL),
            ]))
        );
        assert_eq!(
            parse_entry(GameType::Dart, "db").unwrap(),
            RoundEntry::Dart(DartTurn::new(vec![DartThrow::double(BULL)]))
        );
        assert!(parse_entry(GameType::Dart, "tb").is_err());
        assert!(parse_entry(GameType::Dart, "q20").is_err());
    }

    #[test]
    fn test_parse_other_games() {
        assert_eq!(
            parse_entry(GameType::Wizard, "2/1").unwrap(),
            RoundEntry::Wizard { bid: 2, tricks: 1 }
        );
        assert_eq!(
            parse_entry(GameType::Romme, "0!!").unwrap(),
            RoundEntry::Romme {
                penalty: 0,
                went_out: true,
                hand_romme: true
            }
        );
        assert_eq!(
            parse_entry(GameType::Flip7, "X").unwrap(),
            RoundEntry::Flip7 {
                points: 0,
                busted: true,
                flip_seven: false
            }
        );
        assert_eq!(
            parse_entry(GameType::Flip7, "27+").unwrap(),
            RoundEntry::Flip7 {
                points: 27,
                busted: false,
                flip_seven: true
            }
        );
        assert_eq!(
            parse_entry(GameType::Schwimmen, "1").unwrap(),
            RoundEntry::Schwimmen { lives_lost: 1 }
        );
        assert!(parse_entry(GameType::Wizard, "2").is_err());
    }
}
