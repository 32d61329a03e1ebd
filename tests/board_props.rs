use battleship_arena::{Cell, ShipBoard, ShotResult, GRID_SIZE, SHIPS, TOTAL_SHIP_CELLS};
use proptest::prelude::*;
use rand::{rngs::SmallRng, Rng, SeedableRng};

fn random_fleet(seed: u64) -> ShipBoard {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut board = ShipBoard::new();
    for ship in SHIPS {
        let (r, c, orient) = board.random_placement(&mut rng, ship).unwrap();
        board.place_ship(ship, r, c, orient).unwrap();
    }
    board
}

fn ship_cells(board: &ShipBoard) -> usize {
    (0..GRID_SIZE)
        .flat_map(|r| (0..GRID_SIZE).map(move |c| (r, c)))
        .filter(|&(r, c)| matches!(board.cell(r, c), Some(Cell::Ship | Cell::ShipHit)))
        .count()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_fleet_never_overlaps(seed in any::<u64>()) {
        let board = random_fleet(seed);
        prop_assert_eq!(board.ships().len(), SHIPS.len());
        prop_assert_eq!(ship_cells(&board), TOTAL_SHIP_CELLS);
    }

    #[test]
    fn second_shot_is_already_shot(seed in any::<u64>(), row in 0..GRID_SIZE, col in 0..GRID_SIZE) {
        let mut board = random_fleet(seed);
        let first = board.receive_shot(row, col);
        prop_assert!(matches!(first, ShotResult::Miss | ShotResult::Hit | ShotResult::Sunk(_)));
        let cell_after = board.cell(row, col);
        prop_assert_eq!(board.receive_shot(row, col), ShotResult::AlreadyShot);
        prop_assert_eq!(board.cell(row, col), cell_after);
    }

    #[test]
    fn fleet_sinks_only_after_every_segment(seed in any::<u64>()) {
        let mut board = random_fleet(seed);
        let mut rng = SmallRng::seed_from_u64(seed ^ 0x5eed);
        let mut targets: Vec<(usize, usize)> = board
            .ships()
            .iter()
            .flat_map(|s| s.segments().to_vec())
            .collect();
        // shuffle
        for i in (1..targets.len()).rev() {
            let j = rng.random_range(0..=i);
            targets.swap(i, j);
        }
        let mut sunk = 0;
        for (n, &(r, c)) in targets.iter().enumerate() {
            prop_assert!(!board.all_ships_sunk());
            if let ShotResult::Sunk(_) = board.receive_shot(r, c) {
                sunk += 1;
            }
            prop_assert_eq!(board.all_ships_sunk(), n + 1 == targets.len());
        }
        prop_assert_eq!(sunk, SHIPS.len());
    }
}
