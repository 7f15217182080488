//! Motion commands and programs.

use crate::data::geometry::Point;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// A single pen-plotter motion step.
///
/// Coordinates are physical millimetres; heights come from the program's
/// [`MotionProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum MotionCommand {
    /// Travel to a point with the pen lifted.
    MoveUp(Point),
    /// Lower the pen onto the surface.
    PenDown,
    /// Draw a line to a point with the pen lowered.
    DrawTo(Point),
    /// Lift the pen clear of the surface.
    PenUp,
    /// Set the drawing feedrate in mm/min.
    SetFeedrate(f64),
}

impl MotionCommand {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MoveUp(_) => "MoveUp",
            Self::PenDown => "PenDown",
            Self::DrawTo(_) => "DrawTo",
            Self::PenUp => "PenUp",
            Self::SetFeedrate(_) => "SetFeedrate",
        }
    }
}

/// Heights and feedrates a program is executed with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionProfile {
    /// Travel height.
    pub z_up: f64,
    /// Drawing height.
    pub z_draw: f64,
    /// Feedrate for pen-up travel and pen lifts, mm/min.
    pub pen_up_feedrate: f64,
    /// Feedrate for drawing and pen drops, mm/min.
    pub pen_down_feedrate: f64,
}

/// An ordered command sequence plus the profile it was generated for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionProgram {
    /// The commands, in execution order.
    pub commands: Vec<MotionCommand>,
    /// Heights and feedrates.
    pub profile: MotionProfile,
}

impl MotionProgram {
    /// Wrap commands with a profile.
    pub fn new(commands: Vec<MotionCommand>, profile: MotionProfile) -> Self {
        Self { commands, profile }
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True when there is nothing to execute.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of strokes, counted by pen drops.
    pub fn stroke_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, MotionCommand::PenDown))
            .count()
    }

    /// Check the pen state rules.
    ///
    /// `DrawTo` only while the pen is down, no `PenDown` while already down,
    /// no `MoveUp` while down, and the program ends with the pen up.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut pen_down = false;
        for (index, command) in self.commands.iter().enumerate() {
            let violation = match command {
                MotionCommand::DrawTo(_) if !pen_down => Some("DrawTo while pen is up"),
                MotionCommand::MoveUp(_) if pen_down => Some("MoveUp while pen is down"),
                MotionCommand::PenDown if pen_down => Some("PenDown while pen is already down"),
                MotionCommand::PenDown => {
                    pen_down = true;
                    None
                }
                MotionCommand::PenUp => {
                    pen_down = false;
                    None
                }
                _ => None,
            };
            if let Some(reason) = violation {
                return Err(ValidationError::InvalidSequence {
                    index,
                    reason: reason.to_string(),
                });
            }
        }
        if pen_down {
            return Err(ValidationError::InvalidSequence {
                index: self.commands.len(),
                reason: "program ends with the pen down".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> MotionProfile {
        MotionProfile {
            z_up: 16.0,
            z_draw: 0.0,
            pen_up_feedrate: 3000.0,
            pen_down_feedrate: 1500.0,
        }
    }

    #[test]
    fn test_valid_program() {
        let program = MotionProgram::new(
            vec![
                MotionCommand::SetFeedrate(1500.0),
                MotionCommand::MoveUp(Point::new(0.0, 0.0)),
                MotionCommand::PenDown,
                MotionCommand::DrawTo(Point::new(1.0, 0.0)),
                MotionCommand::PenUp,
            ],
            profile(),
        );
        assert!(program.validate().is_ok());
        assert_eq!(program.stroke_count(), 1);
    }

    #[test]
    fn test_draw_without_pen_down() {
        let program = MotionProgram::new(
            vec![
                MotionCommand::MoveUp(Point::new(0.0, 0.0)),
                MotionCommand::DrawTo(Point::new(1.0, 0.0)),
            ],
            profile(),
        );
        assert!(matches!(
            program.validate(),
            Err(ValidationError::InvalidSequence { index: 1, .. })
        ));
    }

    #[test]
    fn test_double_pen_down_and_dangling_pen() {
        let program = MotionProgram::new(
            vec![MotionCommand::PenDown, MotionCommand::PenDown],
            profile(),
        );
        assert!(matches!(
            program.validate(),
            Err(ValidationError::InvalidSequence { index: 1, .. })
        ));

        let program = MotionProgram::new(vec![MotionCommand::PenDown], profile());
        assert!(program.validate().is_err());
    }

    #[test]
    fn test_command_serde_tagging() {
        let json = serde_json::to_string(&MotionCommand::DrawTo(Point::new(1.0, 2.0))).unwrap();
        assert_eq!(json, r#"{"type":"DrawTo","value":[1.0,2.0]}"#);
        let json = serde_json::to_string(&MotionCommand::PenUp).unwrap();
        assert_eq!(json, r#"{"type":"PenUp"}"#);
    }
}
