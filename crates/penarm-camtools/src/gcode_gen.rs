//! Motion program generation.
//!
//! Turns ordered, calibrated strokes into a [`MotionProgram`]:
//! a feedrate prelude, then for each stroke a pen-up move to its start,
//! a pen drop, one draw per remaining point and a pen lift.
//!
//! When the program exceeds `max_commands`, every stroke is re-simplified
//! from its original points with a tolerance that doubles per level until
//! the program fits. If even endpoint-only strokes do not fit, generation
//! fails with [`CapacityError::BudgetUnattainable`]; programs are never
//! truncated.

use crate::simplify::simplify_strokes;
use crate::zigzag::{fill_stroke, MIN_FILL_SPACING};
use penarm_core::{
    CapacityError, Error, GeometryError, MotionCommand, MotionProfile, MotionProgram, Result,
    Stroke, ValidationError,
};
use serde::{Deserialize, Serialize};

/// How strokes are rendered
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawingStyle {
    /// Draw every stroke as a line.
    #[default]
    Outline,
    /// Additionally fill small closed strokes with a zigzag.
    ZigzagFill {
        /// Distance between fill rows in mm.
        spacing: f64,
        /// Largest enclosed area in mm² that gets filled.
        max_area: f64,
    },
}

impl DrawingStyle {
    fn apply(&self, strokes: &[Stroke]) -> Vec<Stroke> {
        match *self {
            DrawingStyle::Outline => strokes.to_vec(),
            DrawingStyle::ZigzagFill { spacing, max_area } => strokes
                .iter()
                .map(|s| fill_stroke(s, spacing, max_area))
                .collect(),
        }
    }
}

/// Generator parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Travel feedrate, mm/min.
    pub pen_up_feedrate: f64,
    /// Drawing feedrate, mm/min.
    pub pen_down_feedrate: f64,
    /// Travel height.
    pub z_up: f64,
    /// Drawing height.
    pub z_draw: f64,
    /// Largest allowed number of commands.
    pub max_commands: usize,
    /// Rendering style.
    pub style: DrawingStyle,
    /// Tolerance of the first simplification level, mm.
    pub simplify_start: f64,
    /// Number of doubling levels tried before giving up.
    pub simplify_max_levels: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            pen_up_feedrate: 3000.0,
            pen_down_feedrate: 2000.0,
            z_up: 16.0,
            z_draw: 0.0,
            max_commands: 5000,
            style: DrawingStyle::Outline,
            simplify_start: 0.05,
            simplify_max_levels: 32,
        }
    }
}

impl GeneratorConfig {
    /// Check ranges before generating anything.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let invalid = |key: &str, reason: String| ValidationError::InvalidConfig {
            key: key.to_string(),
            reason,
        };
        for (key, value) in [
            ("pen_up_feedrate", self.pen_up_feedrate),
            ("pen_down_feedrate", self.pen_down_feedrate),
            ("simplify_start", self.simplify_start),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(key, format!("must be > 0, got {}", value)));
            }
        }
        if !(self.z_up.is_finite() && self.z_draw.is_finite()) || self.z_draw >= self.z_up {
            return Err(ValidationError::InvalidPenHeights {
                z_draw: self.z_draw,
                z_up: self.z_up,
            });
        }
        if self.max_commands == 0 {
            return Err(invalid("max_commands", "must be >= 1".to_string()));
        }
        if let DrawingStyle::ZigzagFill { spacing, max_area } = self.style {
            if !spacing.is_finite() || spacing < MIN_FILL_SPACING {
                return Err(invalid(
                    "style.spacing",
                    format!("must be >= {} mm, got {}", MIN_FILL_SPACING, spacing),
                ));
            }
            if !max_area.is_finite() || max_area < 0.0 {
                return Err(invalid("style.max_area", format!("must be >= 0, got {}", max_area)));
            }
        }
        Ok(())
    }

    /// Heights and feedrates of generated programs.
    pub fn profile(&self) -> MotionProfile {
        MotionProfile {
            z_up: self.z_up,
            z_draw: self.z_draw,
            pen_up_feedrate: self.pen_up_feedrate,
            pen_down_feedrate: self.pen_down_feedrate,
        }
    }
}

/// Number of commands a program for `strokes` contains.
pub fn command_count(strokes: &[Stroke]) -> usize {
    1 + strokes.iter().map(|s| s.len() + 2).sum::<usize>()
}

/// Generate a motion program within the command budget.
pub fn generate_program(strokes: &[Stroke], config: &GeneratorConfig) -> Result<MotionProgram> {
    config.validate()?;
    if strokes.is_empty() {
        return Err(GeometryError::EmptyArtwork.into());
    }

    let budget = config.max_commands;
    let styled = config.style.apply(strokes);
    let count = command_count(&styled);
    if count <= budget {
        tracing::debug!("Generated {} commands without simplification", count);
        return Ok(emit(&styled, config));
    }

    let floor = command_count(&config.style.apply(&simplify_strokes(strokes, f64::INFINITY)));
    if floor > budget {
        return Err(Error::from(CapacityError::BudgetUnattainable {
            required: floor,
            budget,
        }));
    }

    let mut best = count;
    let mut tolerance = config.simplify_start;
    for level in 0..config.simplify_max_levels {
        let simplified = simplify_strokes(strokes, tolerance);
        let styled = config.style.apply(&simplified);
        let count = command_count(&styled);
        if count <= budget {
            tracing::info!(
                "Simplified to {} commands at level {} (tolerance {:.4} mm, budget {})",
                count,
                level,
                tolerance,
                budget
            );
            return Ok(emit(&styled, config));
        }
        best = best.min(count);
        if simplified.iter().all(|s| s.len() == 2) {
            break;
        }
        tolerance *= 2.0;
    }

    Err(CapacityError::BudgetUnattainable {
        required: best,
        budget,
    }
    .into())
}

fn emit(strokes: &[Stroke], config: &GeneratorConfig) -> MotionProgram {
    let mut commands = Vec::with_capacity(command_count(strokes));
    commands.push(MotionCommand::SetFeedrate(config.pen_down_feedrate));
    for stroke in strokes {
        commands.push(MotionCommand::MoveUp(stroke.start()));
        commands.push(MotionCommand::PenDown);
        commands.extend(stroke.points()[1..].iter().map(|&p| MotionCommand::DrawTo(p)));
        commands.push(MotionCommand::PenUp);
    }
    MotionProgram::new(commands, config.profile())
}
