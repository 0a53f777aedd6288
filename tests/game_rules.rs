use std::sync::Arc;

use ludo_sim::core::driver::play_ai_turn_with_roll;
use ludo_sim::core::path::{absolute_index, is_safe_square};
use ludo_sim::{Game, GameState, LearningAgent, PlayerColor, Position, StateKey};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn game_with(positions: [[Position; 4]; 4], turn: usize) -> Game {
    let state = GameState::from_positions(positions, turn).unwrap();
    Game::from_state(state, Arc::new(LearningAgent::new()))
}

#[test]
fn opening_six_releases_a_piece_and_keeps_the_turn() {
    let mut game = Game::new(Arc::new(LearningAgent::new()));
    assert_eq!(game.valid_moves(6), vec![0, 1, 2, 3]);

    let outcome = game.move_piece(0, 6, false).unwrap();
    game.advance_turn(6);

    assert_eq!(outcome.event.to, 0);
    assert_eq!(outcome.reward, 1.0);
    assert!(outcome.event.captures.is_empty());
    assert!(!outcome.event.won);
    assert_eq!(game.turn(), 0);
    assert_eq!(game.position(0, 0), Some(0));
    assert_eq!(game.agent().state_count(), 0);
}

#[test]
fn entering_the_home_stretch() {
    // Green's relative 38 is absolute 51, the cell Red would reach if the track continued
    assert_eq!(absolute_index(1, 38), Some(51));
    assert!(!is_safe_square(51));
    let mut game = game_with([[49, -1, -1, -1], [38, -1, -1, -1], [-1; 4], [-1; 4]], 0);

    let outcome = game.move_piece(0, 2, false).unwrap();
    assert_eq!(outcome.event.to, 51);
    assert!((outcome.reward - 6.1).abs() < 1e-9);
    assert!(outcome.event.captures.is_empty());
    assert_eq!(game.position(1, 0), Some(38));
}

#[test]
fn valid_moves_follow_the_release_and_overshoot_rules() {
    let layouts: [[Position; 4]; 5] = [
        [-1, -1, -1, -1],
        [0, 10, 50, 51],
        [-1, 52, 55, 57],
        [56, -1, 3, 44],
        [57, 57, 57, 51],
    ];
    for pieces in layouts {
        let game = game_with([pieces, [-1; 4], [-1; 4], [-1; 4]], 0);
        for roll in 1..=6u8 {
            let valid = game.valid_moves(roll);
            for (i, &pos) in pieces.iter().enumerate() {
                let expected = if pos == -1 { roll == 6 } else { pos + roll as Position <= 57 };
                assert_eq!(valid.contains(&i), expected, "pieces {:?} roll {} piece {}", pieces, roll, i);
            }
        }
    }
}

#[test]
fn capture_removes_every_opponent_on_the_cell() {
    // Absolute 30: player 0 relative 30, player 1 relative 17, player 2 relative 4, player 3 relative 43
    let mut game = game_with(
        [[25, -1, -1, -1], [17, 17, -1, -1], [4, 20, -1, -1], [43, -1, -1, 52]],
        0,
    );
    let outcome = game.move_piece(0, 5, false).unwrap();

    assert_eq!(outcome.event.captures.len(), 4);
    let expected = 1.0 + 30.0 * 0.1 + 4.0 * 50.0;
    assert!((outcome.reward - expected).abs() < 1e-9);
    assert_eq!(game.state().players()[1].pieces(), [-1, -1, -1, -1]);
    assert_eq!(game.state().players()[2].pieces(), [-1, 20, -1, -1]);
    assert_eq!(game.state().players()[3].pieces(), [-1, -1, -1, 52]);
}

#[test]
fn safe_squares_never_capture() {
    for safe in [8i8, 21, 34, 47] {
        // Player 0 lands on `safe`; player 2 sits on the same absolute cell
        let opponent_rel = (safe - 26).rem_euclid(52);
        let mut game = game_with([[safe - 3, -1, -1, -1], [-1; 4], [opponent_rel, -1, -1, -1], [-1; 4]], 0);
        let outcome = game.move_piece(0, 3, false).unwrap();
        assert!(outcome.event.captures.is_empty(), "captured on safe square {}", safe);
        assert_eq!(game.position(2, 0), Some(opponent_rel));
    }
}

#[test]
fn game_ends_exactly_on_the_fourth_piece() {
    let mut game = game_with([[-1; 4], [57, 57, 57, 52], [-1; 4], [-1; 4]], 1);
    for (roll, expect_over) in [(2, false), (2, false), (1, true)] {
        assert!(!game.game_over());
        let outcome = game.move_piece(3, roll, true).unwrap();
        game.advance_turn(6);
        assert_eq!(game.game_over(), expect_over);
        assert_eq!(outcome.event.won, expect_over);
    }
    assert_eq!(game.winner(), Some(PlayerColor::Green));
    assert!(game.valid_moves(6).is_empty());

    // Finishing move earned the home bonus
    let key = StateKey::new([57, 57, 57, 56], 1);
    let value = game.agent().value(&key, 3).unwrap();
    assert!((value - 0.5 * 106.7).abs() < 1e-9);
}

#[test]
fn turn_passes_unless_a_six_was_rolled() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut game = game_with([[10, -1, -1, -1], [10, -1, -1, -1], [10, -1, -1, -1], [10, -1, -1, -1]], 0);
    for roll in 1..=6u8 {
        let before = game.turn();
        play_ai_turn_with_roll(&mut game, roll, &mut rng, false).unwrap();
        let expected = if roll == 6 { before } else { (before + 1) % 4 };
        assert_eq!(game.turn(), expected, "roll {}", roll);
    }
}
