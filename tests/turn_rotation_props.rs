use battleship_arena::{Cell, GameState, Orientation, Phase, ShotResult, GRID_SIZE, SHIPS};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    /// Current participant misses a target picked by this seed.
    Miss(usize),
    /// The participant picked by this seed disconnects.
    Leave(usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => any::<usize>().prop_map(Step::Miss),
        1 => any::<usize>().prop_map(Step::Leave),
    ]
}

fn combat_game(n: usize) -> GameState {
    let names = (0..n).map(|i| format!("p{}", i)).collect();
    let mut game = GameState::new(names);
    while game.phase() == Phase::Placement {
        let current = game.current_player().unwrap();
        let ship = game.next_ship(current).unwrap();
        let row = SHIPS.iter().position(|s| *s == ship).unwrap();
        game.place_next_ship(ship, row, 0, Orientation::Horizontal)
            .unwrap();
    }
    game
}

fn successor(order: &[usize], who: usize) -> usize {
    let pos = order.iter().position(|&i| i == who).unwrap();
    order[(pos + 1) % order.len()]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn turn_pointer_follows_active_order(n in 2usize..=6, steps in prop::collection::vec(step(), 1..40)) {
        let mut game = combat_game(n);
        for step in steps {
            if game.phase() == Phase::Done {
                break;
            }
            let before: Vec<usize> = game.active_indices().to_vec();
            let current = game.current_player().unwrap();
            prop_assert!(before.contains(&current));

            match step {
                Step::Miss(seed) => {
                    let targets: Vec<usize> = before.iter().copied().filter(|&i| i != current).collect();
                    let target = targets[seed % targets.len()];
                    let board = game.board(target).unwrap();
                    let Some((r, c)) = (SHIPS.len()..GRID_SIZE)
                        .flat_map(|r| (0..GRID_SIZE).map(move |c| (r, c)))
                        .find(|&(r, c)| board.cell(r, c) == Some(Cell::Empty))
                    else {
                        continue;
                    };
                    prop_assert_eq!(game.fire(target, r, c), ShotResult::Miss);
                    prop_assert_eq!(game.current_player(), Some(successor(&before, current)));
                }
                Step::Leave(seed) => {
                    let leaver = before[seed % before.len()];
                    let continues = game.handle_disconnect(leaver);
                    prop_assert_eq!(continues, before.len() > 2);
                    if continues {
                        let expected = if leaver == current {
                            successor(&before, current)
                        } else {
                            current
                        };
                        prop_assert_eq!(game.current_player(), Some(expected));
                        prop_assert!(!game.is_active(leaver));
                    } else {
                        let survivor = before.iter().copied().find(|&i| i != leaver);
                        prop_assert_eq!(game.winner(), survivor);
                    }
                }
            }
        }
    }
}
