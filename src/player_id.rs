use sha2::{Digest, Sha256};

/// Generated ids start here to stay clear of the numeric ids the feed
/// assigns to teams and venues.
pub const GENERATED_ID_FLOOR: i64 = 1_000_000;
const GENERATED_ID_SPAN: i64 = 999_999_999;

/// Largest id `resolve_player_id` can produce.
pub const GENERATED_ID_CEILING: i64 = GENERATED_ID_FLOOR + GENERATED_ID_SPAN - 1;

/// Derive a stable numeric player id from the feed's arbitrary string key.
///
/// The scorecard endpoint keys players by non-numeric strings, so a
/// relational primary key has to be synthesized. Hash the key together
/// with the display name and owning team, take the first eight hex digits
/// of the digest and fold them into a bounded positive range. Identical
/// inputs always map to the same id; re-ingesting the same scorecard is a
/// no-op on the players table.
pub fn resolve_player_id(player_key: &str, player_name: &str, team_id: i64) -> i64 {
    let composite = format!("{player_key}_{player_name}_{team_id}");
    let digest = Sha256::digest(composite.as_bytes());
    let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    (prefix as i64) % GENERATED_ID_SPAN + GENERATED_ID_FLOOR
}

#[cfg(test)]
mod tests {
    use super::{GENERATED_ID_CEILING, GENERATED_ID_FLOOR, resolve_player_id};

    #[test]
    fn same_inputs_same_id() {
        let a = resolve_player_id("c-virat-kohli", "Virat Kohli", 2);
        let b = resolve_player_id("c-virat-kohli", "Virat Kohli", 2);
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_inputs_distinct_ids() {
        let a = resolve_player_id("c-virat-kohli", "Virat Kohli", 2);
        let b = resolve_player_id("c-rohit-sharma", "Rohit Sharma", 2);
        let c = resolve_player_id("c-virat-kohli", "Virat Kohli", 3);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn ids_stay_in_bounds() {
        for (key, name, team) in [
            ("", "", 0),
            ("x", "Unknown", -1),
            ("c-1", "A", i64::MAX),
            ("some-very-long-player-key-from-the-feed", "M S Dhoni", 9),
        ] {
            let id = resolve_player_id(key, name, team);
            assert!(id >= GENERATED_ID_FLOOR, "id {id} below floor");
            assert!(id <= GENERATED_ID_CEILING, "id {id} above ceiling");
        }
    }
}
