//! Synthetic warehouse floor plan.
//!
//! `COLS × ROWS` bays two metres apart.  Every row is an aisle; racks block
//! movement between rows except along three cross aisles (the two walls and
//! the middle).

use pt_core::{Point, VertexId};
use pt_graph::{PatrolGraph, PatrolGraphBuilder};

pub const COLS: u32 = 9;
pub const ROWS: u32 = 6;

const BAY_SPACING: f32 = 2.0;
/// Patrol speed, metres per tick.
const SPEED: f32 = 1.0;

fn cross_aisle(col: u32) -> bool {
    col == 0 || col == COLS / 2 || col == COLS - 1
}

pub fn build_floor() -> PatrolGraph {
    let mut b = PatrolGraphBuilder::with_capacity((COLS * ROWS) as usize, (4 * COLS * ROWS) as usize);
    for row in 0..ROWS {
        for col in 0..COLS {
            b.add_tagged_vertex(Point::new(col as f32 * BAY_SPACING, row as f32 * BAY_SPACING), row);
        }
    }
    let id = |col: u32, row: u32| VertexId(row * COLS + col);
    for row in 0..ROWS {
        for col in 0..COLS {
            if col + 1 < COLS {
                b.add_corridor_by_distance(id(col, row), id(col + 1, row), SPEED);
            }
            if row + 1 < ROWS && cross_aisle(col) {
                b.add_corridor_by_distance(id(col, row), id(col, row + 1), SPEED);
            }
        }
    }
    b.build()
}
