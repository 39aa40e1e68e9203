//! Order and threshold properties of the result validator

use itertools::Itertools;
use matchday_oracle::match_result::{MatchResult, MatchStatus, Winner};
use matchday_oracle::ResultValidator;

fn result(home: u32, away: u32, source: &str) -> MatchResult {
    MatchResult {
        match_id: 42,
        home_team: "Home".into(),
        away_team: "Away".into(),
        home_score: home,
        away_score: away,
        status: MatchStatus::Finished,
        league: "Premier League".into(),
        season: "2024".into(),
        match_day: "Matchday 1".into(),
        timestamp: 0,
        source: source.into(),
    }
}

#[test]
fn outcome_does_not_depend_on_input_order() {
    let validator = ResultValidator::new(2);
    let results = vec![
        result(2, 1, "a"),
        result(1, 1, "b"),
        result(2, 1, "c"),
        result(0, 3, "d"),
        result(2, 1, "e"),
    ];

    let expected = validator.validate(&results).unwrap();
    for perm in results.iter().cloned().permutations(results.len()) {
        let outcome = validator.validate(&perm).unwrap();
        assert_eq!(outcome.score(), expected.score());
        assert_eq!(outcome.winner, expected.winner);
        assert_eq!(outcome.agreement_count, expected.agreement_count);
    }
    assert_eq!(expected.winner, Winner::HomeWin);
    assert_eq!(expected.agreement_count, 3);
}

#[test]
fn decision_iff_some_score_reaches_threshold() {
    let scores = [(0, 0), (1, 0), (0, 1), (1, 1)];
    // Every multiset of up to four reports over four distinct scores.
    for size in 0..=4 {
        for combo in scores.iter().combinations_with_replacement(size) {
            let results: Vec<MatchResult> = combo
                .iter()
                .enumerate()
                .map(|(i, (h, a))| result(*h, *a, &format!("p{}", i)))
                .collect();
            let counts = combo.iter().counts();
            let largest = counts.values().copied().max().unwrap_or(0);

            for threshold in 1..=3 {
                let outcome = ResultValidator::new(threshold).validate(&results);
                assert_eq!(
                    outcome.is_some(),
                    largest >= threshold,
                    "threshold {} on {:?}",
                    threshold,
                    combo
                );
                if let Some(outcome) = outcome {
                    assert_eq!(outcome.agreement_count, largest);
                    assert_eq!(counts[&&outcome.score()], largest);
                }
            }
        }
    }
}

#[test]
fn validating_twice_gives_the_same_outcome() {
    let validator = ResultValidator::default();
    let results = vec![result(0, 0, "a"), result(0, 0, "b"), result(1, 0, "c")];
    assert_eq!(validator.validate(&results), validator.validate(&results));
}
