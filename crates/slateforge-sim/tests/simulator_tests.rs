// Integration tests for the outcome simulator.
//
// Statistical checks use a fixed seed and a large trial count so the
// tolerances are many standard errors wide.

use slateforge_core::{Lineup, Player, PlayerId};
use slateforge_sim::{simulate, OutcomeSimulator, SimulationConfig, SimulationError};

// ===========================================================================
// Helpers
// ===========================================================================

fn pool() -> Vec<Player> {
    vec![
        Player::new(1, "Josh Allen", "QB", "BUF", 8000, 25.0),
        Player::new(2, "Stefon Diggs", "WR", "BUF", 7000, 20.0),
        Player::new(3, "Dalton Kincaid", "TE", "BUF", 5000, 12.0),
        Player::new(4, "James Cook", "RB", "BUF", 6000, 15.0),
        Player::new(21, "CMC", "RB", "SF", 9000, 27.0),
        Player::new(12, "Travis Kelce", "TE", "KC", 6500, 16.0).with_std_dev(8.0),
        Player::new(99, "Fixed", "DST", "DEN", 3000, 9.0).with_std_dev(0.0),
    ]
}

fn pick(pool: &[Player], ids: &[u64]) -> Lineup {
    Lineup::new(
        ids.iter()
            .map(|id| {
                pool.iter()
                    .find(|p| p.id == PlayerId(*id))
                    .cloned()
                    .expect("fixture id")
            })
            .collect(),
    )
}

fn seeded(iterations: u32, seed: u64) -> OutcomeSimulator {
    OutcomeSimulator::new(SimulationConfig::default().with_iterations(iterations).with_seed(seed))
}

// ===========================================================================
// Scenarios
// ===========================================================================

#[test]
fn mean_converges_to_projection_sum() {
    let players = pool();
    // 25 + 20 + 12 + 15 = 72, each with the default spread of 5
    let lineups = vec![pick(&players, &[1, 2, 3, 4])];

    let results = seeded(100_000, 42).simulate(&players, &lineups).unwrap();

    assert_eq!(results.len(), 1);
    let r = &results[0];
    assert!((r.avg_score - 72.0).abs() < 0.5, "avg_score = {}", r.avg_score);
    assert!(r.floor < r.avg_score && r.avg_score < r.ceiling);
}

#[test]
fn percentiles_and_win_probability_match_the_normal_model() {
    let players = pool();
    let lineups = vec![pick(&players, &[1, 2, 3, 4])];
    let mut config = SimulationConfig::default().with_iterations(100_000).with_seed(9);
    config.win_threshold = 80.0;

    let r = &OutcomeSimulator::new(config).simulate(&players, &lineups).unwrap()[0];

    // Sum of four independent N(., 5^2): sigma = 10
    let sigma = 10.0;
    assert!((r.ceiling - (72.0 + 1.6449 * sigma)).abs() < 0.5, "ceiling = {}", r.ceiling);
    assert!((r.floor - (72.0 - 1.6449 * sigma)).abs() < 0.5, "floor = {}", r.floor);
    // P(X > 80) = 1 - Phi(0.8)
    assert!((r.win_prob - 0.2119).abs() < 0.01, "win_prob = {}", r.win_prob);
}

#[test]
fn unknown_player_fails_the_whole_call() {
    let players = pool();
    let stranger = Player::new(999, "Stranger", "WR", "NYJ", 4000, 10.0);
    let lineups = vec![pick(&players, &[1, 2]), Lineup::new(vec![players[0].clone(), stranger])];

    let err = seeded(100, 1).simulate(&players, &lineups).unwrap_err();

    assert_eq!(
        err,
        SimulationError::UnknownPlayer {
            lineup_index: 1,
            player_id: PlayerId(999),
        }
    );
}

#[test]
fn zero_iterations_rejected() {
    let players = pool();
    let lineups = vec![pick(&players, &[1])];

    let err = simulate(&players, &lineups, 0).unwrap_err();
    assert_eq!(err, SimulationError::InvalidIterationCount(0));
}

#[test]
fn results_are_index_aligned_with_input() {
    let players = pool();
    let lineups = vec![
        pick(&players, &[99]),
        pick(&players, &[1, 2, 21, 12]),
        pick(&players, &[2]),
    ];

    let results = seeded(20_000, 3).simulate(&players, &lineups).unwrap();

    assert_eq!(results.len(), 3);
    for (i, r) in results.iter().enumerate() {
        assert_eq!(r.lineup_index, i);
        assert!(r.floor <= r.avg_score && r.avg_score <= r.ceiling);
    }
    assert_eq!(results[0].avg_score, 9.0);
    assert!((results[1].avg_score - 88.0).abs() < 0.5);
    assert!((results[2].avg_score - 20.0).abs() < 0.2);
}

#[test]
fn fixed_seed_is_reproducible() {
    let players = pool();
    let lineups = vec![pick(&players, &[1, 2]), pick(&players, &[21, 12])];

    let a = seeded(5_000, 1234).simulate(&players, &lineups).unwrap();
    let b = seeded(5_000, 1234).simulate(&players, &lineups).unwrap();
    let c = seeded(5_000, 4321).simulate(&players, &lineups).unwrap();

    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn plain_player_vectors_are_accepted() {
    let players = pool();
    let lineups: Vec<Vec<Player>> = vec![players[..2].to_vec()];

    let results = simulate(&players, &lineups, 1_000).unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].win_prob >= 0.0 && results[0].win_prob <= 1.0);
}
