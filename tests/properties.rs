// Property tests for the stepper, the timeline store and the parser

use indexmap::IndexMap;
use mpl::grid::{
    stepper, EdgePolicy, Grid, Neighborhood, ParallelStepper, RayonBackend, RuleConfig, RuleMasks,
};
use mpl::interpreter::Interpreter;
use mpl::memory::Value;
use mpl::parser::ast::AstNode;
use mpl::parser::parse;
use mpl::snapshot::{Compression, PerformanceMetrics, Snapshot, TimelineDelta};
use proptest::prelude::*;

fn arb_grid(max_side: usize) -> impl Strategy<Value = Grid> {
    (1..=max_side, 1..=max_side).prop_flat_map(|(width, height)| {
        prop::collection::vec(0u8..=1, width * height).prop_map(move |cells| {
            Grid::from_cells(width, height, cells).expect("sized to fit")
        })
    })
}

fn arb_config() -> impl Strategy<Value = RuleConfig> {
    (
        prop::collection::vec(0u32..=8, 0..5),
        prop::collection::vec(0u32..=8, 0..5),
        prop::bool::ANY,
        prop::bool::ANY,
    )
        .prop_map(|(birth, survive, von_neumann, wrap)| {
            RuleConfig::new(
                RuleMasks::from_counts(&birth, &survive),
                if von_neumann {
                    Neighborhood::VonNeumann
                } else {
                    Neighborhood::Moore
                },
                if wrap { EdgePolicy::Wrap } else { EdgePolicy::Clip },
            )
        })
}

proptest! {
    #[test]
    fn step_is_deterministic(grid in arb_grid(16), config in arb_config()) {
        let first = stepper::step(&grid, &config);
        let second = stepper::step(&grid, &config);
        prop_assert_eq!(first.cells(), second.cells());
        prop_assert_eq!((first.width(), first.height()), (grid.width(), grid.height()));
        prop_assert!(first.cells().iter().all(|&c| c <= 1));
    }

    #[test]
    fn parallel_matches_cpu(grid in arb_grid(24), config in arb_config(), threads in 1usize..4) {
        // Band every grid, however small, so the row-split path is exercised
        let backend = RayonBackend::try_init(Some(threads))
            .map(|b| Box::new(b.with_serial_threshold(0)) as Box<dyn mpl::grid::ComputeBackend>);
        let mut parallel =
            ParallelStepper::with_backend(grid.width(), grid.height(), config, backend);
        prop_assert_eq!(parallel.step_grid(&grid), stepper::step(&grid, &config));
    }

    #[test]
    fn out_of_range_access_is_harmless(
        grid in arb_grid(8),
        x in -1_000i64..1_000,
        y in -1_000i64..1_000,
    ) {
        let mut grid = grid;
        let before = grid.clone();
        let inside = x >= 0 && y >= 0 && (x as usize) < grid.width() && (y as usize) < grid.height();
        prop_assert_eq!(grid.set(x, y, 1), inside);
        prop_assert_eq!(grid.get(x, y), if inside { 1 } else { 0 });
        if !inside {
            prop_assert_eq!(&grid, &before);
            prop_assert!(!grid.toggle(x, y));
        }
    }

    #[test]
    fn interpreter_ignores_off_grid_writes(x in -500i64..500, y in -500i64..500) {
        let (program, syntax) = parse(&format!("set({x}, {y}); toggle({y}, {x});"));
        prop_assert!(syntax.is_empty());
        let mut interpreter = Interpreter::default();
        prop_assert!(interpreter.execute_program(&program).is_empty());
        prop_assert!(interpreter.grid().population() <= 2);
    }

    #[test]
    fn timeline_reconstructs_every_frame(
        frames in prop::collection::vec(
            (prop::collection::vec(0u8..=1, 36), prop::collection::vec((0usize..4, 0i32..100), 0..4)),
            1..8,
        ),
        rle in prop::bool::ANY,
    ) {
        let compression = if rle { Compression::Rle } else { Compression::None };
        let mut timeline = TimelineDelta::new(compression);
        let mut originals = Vec::new();
        for (step, (cells, vars)) in frames.into_iter().enumerate() {
            let grid = Grid::from_cells(6, 6, cells).expect("6x6");
            let variables: IndexMap<String, Value> = vars
                .into_iter()
                .map(|(slot, n)| (format!("v{slot}"), Value::Number(f64::from(n))))
                .collect();
            let snapshot =
                Snapshot::new(step as u64, grid, variables, PerformanceMetrics::default());
            timeline.add_snapshot(snapshot.clone()).expect("within limit");
            originals.push(snapshot);
        }
        for (index, original) in originals.iter().enumerate() {
            let reconstructed = timeline.reconstruct_snapshot(index);
            prop_assert_eq!(reconstructed.as_ref(), Some(original));
        }
        prop_assert!(timeline.reconstruct_snapshot(originals.len()).is_none());
    }

    #[test]
    fn literals_survive_parsing(n in 0u32..1_000_000, s in "[a-zA-Z0-9 _]{0,16}") {
        let (program, syntax) = parse(&format!("var n = {n};\nvar s = \"{s}\";"));
        prop_assert!(syntax.is_empty(), "{:?}", syntax);
        let inits: Vec<&AstNode> = program
            .statements
            .iter()
            .filter_map(|stmt| match stmt {
                AstNode::VarDecl { init: Some(init), .. } => Some(init.as_ref()),
                _ => None,
            })
            .collect();
        prop_assert_eq!(inits.len(), 2);
        prop_assert!(matches!(inits[0], AstNode::NumberLiteral(v, _) if *v == f64::from(n)));
        prop_assert!(matches!(inits[1], AstNode::StringLiteral(text, _) if text == &s));
    }
}
