use ethers::prelude::abigen;

// Settlement surface of the betting pool contract.
//
// Result codes for `proposeResult`: 1 = home win, 2 = away win, 3 = draw.
// Game status codes returned by `games`: 0 = pending, 1 = active,
// 2 = finished, 3 = cancelled.

abigen!(
    BettingPool,
    r#"[
        function createGame(uint256 gameId, string homeTeam, string awayTeam, uint256 startTime) external
        function proposeResult(uint256 matchId, uint8 result, uint256 homeScore, uint256 awayScore) external
        function games(uint256 gameId) external view returns (uint256 id, string homeTeam, string awayTeam, uint256 startTime, uint8 status, uint8 result, uint256 totalBets)
        event GameCreated(uint256 indexed gameId, string homeTeam, string awayTeam, uint256 startTime)
        event GameResultSet(uint256 indexed gameId, uint8 result)
    ]"#
);

/// Human-readable name of a `games(id).status` code.
pub fn game_status_name(code: u8) -> &'static str {
    match code {
        0 => "PENDING",
        1 => "ACTIVE",
        2 => "FINISHED",
        3 => "CANCELLED",
        _ => "UNKNOWN",
    }
}

/// Human-readable name of a stored result code.
pub fn result_name(code: u8) -> &'static str {
    match code {
        1 => "HOME_WIN",
        2 => "AWAY_WIN",
        3 => "DRAW",
        _ => "NONE",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_result::Winner;

    #[test]
    fn result_names_agree_with_winner_codes() {
        for winner in [Winner::HomeWin, Winner::AwayWin, Winner::Draw] {
            assert_eq!(result_name(winner.code()), winner.to_string());
        }
        assert_eq!(result_name(0), "NONE");
    }

    #[test]
    fn status_names() {
        assert_eq!(game_status_name(2), "FINISHED");
        assert_eq!(game_status_name(9), "UNKNOWN");
    }
}
