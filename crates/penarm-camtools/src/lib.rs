//! # PenArm CAM Tools
//!
//! The geometric half of the plotting pipeline:
//!
//! - **Join**: merge fragmented traced polylines into long strokes and smooth them
//! - **Optimizer**: order and orient strokes to cut pen-up travel
//! - **Simplify**: Ramer-Douglas-Peucker point reduction
//! - **Zigzag**: fill style for small closed shapes
//! - **G-code generation**: motion programs within a command budget

pub mod gcode_gen;
pub mod join;
pub mod optimizer;
pub mod simplify;
pub mod zigzag;

pub use gcode_gen::{command_count, generate_program, DrawingStyle, GeneratorConfig};
pub use join::{chain_strokes, join_strokes, smooth_stroke, JoinConfig, SPATIAL_INDEX_THRESHOLD};
pub use optimizer::{order_strokes, travel_distance};
pub use simplify::{simplify_stroke, simplify_strokes};
pub use zigzag::{fill_stroke, is_fillable, MIN_FILL_SPACING};
