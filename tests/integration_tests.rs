//! Integration tests for the game session

use blockfall::core::{DropOutcome, GameConfig, GameState};
use blockfall::types::{GameAction, GamePhase, LockEvent, PieceKind, MAX_CELL_VALUE};

fn started_with(kind: PieceKind) -> GameState {
    let mut state = GameState::new(GameConfig::default().with_seed(12345)).unwrap();
    state.force_next(kind);
    assert!(state.start());
    state
}

fn fill_row_except(state: &mut GameState, y: i16, holes: &[i16]) {
    let board = state.board_mut();
    for x in 0..board.width() as i16 {
        if !holes.contains(&x) {
            board.set(x, y, 1);
        }
    }
}

fn drop_until_locked(state: &mut GameState) -> LockEvent {
    loop {
        match state.drop_one_row() {
            DropOutcome::Moved => continue,
            DropOutcome::Locked(event) => return event,
            DropOutcome::Ignored => panic!("drop ignored in phase {:?}", state.phase()),
        }
    }
}

#[test]
fn test_game_lifecycle() {
    let mut state = GameState::new(GameConfig::default()).unwrap();
    assert_eq!(state.phase(), GamePhase::NotStarted);
    assert!(state.active().is_none());

    assert!(state.start());
    assert_eq!(state.phase(), GamePhase::Running);
    assert!(state.active().is_some());
    assert!(!state.start());

    assert!(state.apply_action(GameAction::Pause));
    assert_eq!(state.phase(), GamePhase::Paused);
    assert!(!state.apply_action(GameAction::MoveLeft));
    assert!(state.apply_action(GameAction::Pause));
    assert_eq!(state.phase(), GamePhase::Running);
}

#[test]
fn test_o_piece_spawns_centered_and_rests_on_floor() {
    let mut state = started_with(PieceKind::O);
    let piece = state.active().unwrap();
    assert_eq!(piece.kind, PieceKind::O);
    assert_eq!(piece.pos.x, 5);
    assert_eq!(piece.pos.y, 0);

    let mut last_y;
    loop {
        last_y = state.active().unwrap().pos.y;
        if let DropOutcome::Locked(_) = state.drop_one_row() {
            break;
        }
    }
    assert_eq!(last_y, 18);
    assert_eq!(state.board().get(5, 18), Some(4));
    assert_eq!(state.board().get(6, 19), Some(4));
    assert_eq!(state.board().filled_count(), 4);
}

#[test]
fn test_single_row_clear_scores_base_and_shifts() {
    let mut state = started_with(PieceKind::O);
    fill_row_except(&mut state, 19, &[5, 6]);
    state.board_mut().set(0, 17, 3);

    let event = drop_until_locked(&mut state);
    assert_eq!(event, LockEvent { rows_cleared: 1, score_delta: 10 });
    assert_eq!(state.score(), 10);

    // The upper half of the O and the marker moved down one row.
    let board = state.board();
    assert_eq!(board.get(5, 19), Some(4));
    assert_eq!(board.get(6, 19), Some(4));
    assert_eq!(board.get(0, 18), Some(3));
    assert_eq!(board.filled_count(), 3);
}

#[test]
fn test_triple_clear_scores_seventy_then_multiplier_resets() {
    let mut state = started_with(PieceKind::O);
    fill_row_except(&mut state, 19, &[]);
    fill_row_except(&mut state, 18, &[]);
    fill_row_except(&mut state, 17, &[5, 6]);

    state.force_next(PieceKind::O);
    let event = drop_until_locked(&mut state);
    assert_eq!(event.rows_cleared, 3);
    assert_eq!(event.score_delta, 10 + 20 + 40);
    assert_eq!(state.score(), 70);

    // Leftover top half of the first O sits on row 19; complete that row
    // except the two leftmost columns and fill them with the next O.
    fill_row_except(&mut state, 19, &[0, 1, 5, 6]);
    for _ in 0..5 {
        assert!(state.apply_action(GameAction::MoveLeft));
    }
    assert!(!state.apply_action(GameAction::MoveLeft));

    let event = drop_until_locked(&mut state);
    assert_eq!(event, LockEvent { rows_cleared: 1, score_delta: 10 });
    assert_eq!(state.score(), 80);
}

#[test]
fn test_spawn_on_filled_top_is_game_over() {
    let mut state = GameState::new(GameConfig::default()).unwrap();
    fill_row_except(&mut state, 0, &[]);
    fill_row_except(&mut state, 1, &[]);

    state.start();
    assert_eq!(state.phase(), GamePhase::GameOver);
    // The colliding piece stays visible.
    assert!(state.active().is_some());

    let before = state.snapshot();
    for action in [
        GameAction::MoveLeft,
        GameAction::MoveRight,
        GameAction::RotateCw,
        GameAction::SoftDrop,
        GameAction::Pause,
    ] {
        assert!(!state.apply_action(action), "{:?}", action);
    }
    assert_eq!(state.drop_one_row(), DropOutcome::Ignored);
    assert!(!state.tick(10_000));
    assert_eq!(state.snapshot(), before);

    assert!(state.apply_action(GameAction::Restart));
    assert_eq!(state.phase(), GamePhase::Running);
    assert_eq!(state.board().filled_count(), 0);
}

#[test]
fn test_move_then_opposite_move_restores_x() {
    let mut state = started_with(PieceKind::T);
    let x = state.active().unwrap().pos.x;

    assert!(state.move_horizontal(1));
    assert!(state.move_horizontal(-1));
    assert_eq!(state.active().unwrap().pos.x, x);

    // Push into the wall; the rejected move is a no-op.
    while state.move_horizontal(-1) {}
    let at_wall = state.active().unwrap();
    assert!(!state.move_horizontal(-1));
    assert_eq!(state.active().unwrap(), at_wall);
}

#[test]
fn test_four_rotations_in_open_field() {
    let mut state = started_with(PieceKind::J);
    for _ in 0..5 {
        state.drop_one_row();
    }
    let before = state.active().unwrap();
    for _ in 0..4 {
        assert!(state.apply_action(GameAction::RotateCw));
    }
    assert_eq!(state.active().unwrap(), before);
}

#[test]
fn test_transition_is_pure() {
    let state = started_with(PieceKind::S);
    let next = state.transition(GameAction::MoveRight);

    assert_eq!(next.active().unwrap().pos.x, state.active().unwrap().pos.x + 1);
    assert_eq!(state.active().unwrap().pos.x, 5);
}

#[test]
fn test_cell_values_stay_in_range_over_long_play() {
    for seed in [1, 7, 99, 2024] {
        let mut state = GameState::new(GameConfig::default().with_seed(seed)).unwrap();
        state.start();

        let script = [
            GameAction::MoveLeft,
            GameAction::RotateCw,
            GameAction::SoftDrop,
            GameAction::MoveRight,
            GameAction::MoveRight,
            GameAction::RotateCcw,
            GameAction::SoftDrop,
        ];
        for step in 0..5_000 {
            state.apply_action(script[step % script.len()]);
            state.tick(17);
            assert!(state.board().cells().iter().all(|&v| v <= MAX_CELL_VALUE));
            if state.phase() == GamePhase::GameOver {
                break;
            }
        }
    }
}

#[test]
fn test_restricted_piece_set() {
    let mut config = GameConfig::default().with_seed(3);
    config.pieces = blockfall::core::parse_piece_set("O").unwrap();
    let mut state = GameState::new(config).unwrap();
    state.start();

    for _ in 0..10 {
        assert_eq!(state.active().unwrap().kind, PieceKind::O);
        drop_until_locked(&mut state);
        if state.phase() == GamePhase::GameOver {
            break;
        }
    }
}
