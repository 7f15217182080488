//! Artwork to motion program planning.
//!
//! Join → order → map → generate. Every stage is synchronous and produces
//! new strokes; nothing here touches hardware.

use penarm_calibration::{ArtworkMapping, CalibrationFrame, DrawingArea};
use penarm_camtools::{
    generate_program, join_strokes, order_strokes, travel_distance, DrawingStyle,
};
use penarm_core::{Artwork, GeometryError, MotionProgram, Result, Stroke};
use penarm_settings::Config;

/// Result of planning an artwork
#[derive(Debug, Clone)]
pub struct DrawingPlan {
    /// The program to execute.
    pub program: MotionProgram,
    /// Ordered strokes in machine coordinates.
    pub strokes: Vec<Stroke>,
    /// Artwork to machine mapping used.
    pub mapping: ArtworkMapping,
    /// Strokes read from the artwork.
    pub raw_strokes: usize,
    /// Strokes after joining.
    pub joined_strokes: usize,
    /// Pen-up travel before ordering, artwork units.
    pub travel_before: f64,
    /// Pen-up travel after ordering, artwork units.
    pub travel_after: f64,
}

/// Plan an artwork for a calibrated frame.
pub fn plan_drawing(artwork: &Artwork, config: &Config, frame: &CalibrationFrame) -> Result<DrawingPlan> {
    config.validate()?;
    frame.validate()?;

    let raw = artwork.to_strokes()?;
    if raw.is_empty() {
        return Err(GeometryError::EmptyArtwork.into());
    }
    let joined = join_strokes(&raw, &config.join_config())?;
    if joined.is_empty() {
        return Err(GeometryError::EmptyArtwork.into());
    }

    let mapping = ArtworkMapping::new(frame, artwork.bounds()?);
    // Order in artwork space, starting from where the arm rests.
    let start = mapping.inverse(frame.resting.xy());
    let travel_before = travel_distance(&joined, Some(start));
    let ordered = order_strokes(&joined, Some(start));
    let travel_after = travel_distance(&ordered, Some(start));

    let strokes = mapping.map_strokes(&ordered)?;
    check_inside(&strokes, mapping.area())?;
    let program = generate_program(&strokes, &config.generator_config(frame.z_draw, frame.z_up))?;

    tracing::info!(
        "Planned {} strokes ({} raw) into {} commands, travel {:.1} -> {:.1}",
        strokes.len(),
        raw.len(),
        program.len(),
        travel_before,
        travel_after
    );

    Ok(DrawingPlan {
        program,
        strokes,
        mapping,
        raw_strokes: raw.len(),
        joined_strokes: joined.len(),
        travel_before,
        travel_after,
    })
}

/// Every machine point must stay on the calibrated rectangle.
fn check_inside(strokes: &[Stroke], area: &DrawingArea) -> Result<()> {
    for (index, stroke) in strokes.iter().enumerate() {
        if let Some(p) = stroke.points().iter().find(|p| !area.contains(**p)) {
            return Err(GeometryError::OutOfBounds {
                stroke: index,
                x: p.x,
                y: p.y,
            }
            .into());
        }
    }
    Ok(())
}

/// Program tracing the calibrated rectangle and its diagonals.
pub fn plan_test_pattern(config: &Config, frame: &CalibrationFrame) -> Result<MotionProgram> {
    config.validate()?;
    frame.validate()?;
    let mut generator = config.generator_config(frame.z_draw, frame.z_up);
    generator.style = DrawingStyle::Outline;
    generate_program(&frame.test_pattern(), &generator)
}
