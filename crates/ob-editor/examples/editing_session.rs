//! Headless editing session driven against both backends.
//!
//! Scripts the same gesture sequence (generate, draw, drag, edit, delete)
//! through the bitmap and the scene-graph adapter and prints the resulting
//! store state, demonstrating that the engine is backend-agnostic.
//!
//! Run with `RUST_LOG=debug` to watch the reconciliation passes.

use ob_canvas::adapter::{CanvasAdapter, PointerInput};
use ob_canvas::overlay::PageRect;
use ob_canvas::{BitmapCanvas, SceneCanvas};
use ob_core::model::ObstaclePatch;
use ob_core::{EngineConfig, ObstacleId, ObstacleStore};
use ob_editor::engine::EditorEngine;
use std::time::Instant;

fn run_session(name: &str, adapter: Box<dyn CanvasAdapter>) {
    let mut config = EngineConfig::default();
    config.obstacle_count = 5;

    let mut engine = EditorEngine::new(
        ObstacleStore::seeded(7),
        adapter,
        config,
        PageRect::new(0.0, 0.0, 800.0, 800.0),
        Box::new(|id: ObstacleId| {
            println!("  confirm delete of {id}? yes");
            true
        }),
    )
    .expect("engine construction");

    let t0 = Instant::now();
    engine.start(None, t0).expect("start");
    println!("[{name}] generated {} obstacles", engine.store().len());

    // Draw a new rectangle from (600, 600) to (700, 660)
    let inputs = [
        PointerInput::Down { x: 600.0, y: 600.0 },
        PointerInput::Move { x: 700.0, y: 660.0 },
        PointerInput::Up { x: 700.0, y: 660.0 },
    ];
    for input in &inputs {
        engine.handle_input(input, t0).expect("input");
    }
    let drawn = engine.store().current().last().expect("drawn obstacle").clone();
    println!(
        "[{name}] drew {} at ({}, {}) size {}x{}",
        drawn.id, drawn.x, drawn.y, drawn.width, drawn.height
    );

    // Drag it 50 px right, 20 px down
    let inputs = [
        PointerInput::Down { x: 650.0, y: 630.0 },
        PointerInput::Move { x: 700.0, y: 650.0 },
        PointerInput::Up { x: 700.0, y: 650.0 },
    ];
    for input in &inputs {
        engine.handle_input(input, t0).expect("input");
    }
    let moved = engine.store().get(drawn.id).expect("dragged obstacle");
    println!("[{name}] dragged {} to ({}, {})", moved.id, moved.x, moved.y);

    // Edit via the form contract, then delete
    engine.open_edit_form(drawn.id);
    engine
        .apply_form_change(
            &ObstaclePatch {
                width: Some(42.0),
                ..Default::default()
            },
            t0,
        )
        .expect("form change");
    engine.submit_edit_form(t0).expect("submit");
    engine.delete_obstacle(Some(drawn.id), t0).expect("delete");
    println!("[{name}] {} obstacles remain after delete", engine.store().len());

    engine.dispose().expect("dispose");
}

fn main() {
    env_logger::init();
    run_session("bitmap", Box::new(BitmapCanvas::new()));
    run_session("scene", Box::new(SceneCanvas::new()));
}
