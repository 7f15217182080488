//! Marlin G-code dialect.
//!
//! Encodes motion commands and the manual arm commands as text lines.
//! Coordinates are written with three decimals, feedrates without.

use penarm_core::{MotionCommand, MotionProfile, MotionProgram, Point3};

/// Switch to absolute positioning.
pub const ABSOLUTE_POSITIONING: &str = "G90";
/// Run the homing cycle.
pub const HOME: &str = "G28";
/// Release the motors.
pub const UNLOCK_MOTORS: &str = "M84";
/// Energize the motors.
pub const LOCK_MOTORS: &str = "M17";
/// Report the current position.
pub const REPORT_POSITION: &str = "M114";

/// Encode one motion command.
pub fn encode_command(command: &MotionCommand, profile: &MotionProfile) -> String {
    match *command {
        MotionCommand::MoveUp(p) => format!(
            "G0 X{:.3} Y{:.3} Z{:.3} F{:.0}",
            p.x, p.y, profile.z_up, profile.pen_up_feedrate
        ),
        MotionCommand::PenDown => {
            format!("G1 Z{:.3} F{:.0}", profile.z_draw, profile.pen_down_feedrate)
        }
        MotionCommand::DrawTo(p) => {
            format!("G1 X{:.3} Y{:.3} Z{:.3}", p.x, p.y, profile.z_draw)
        }
        MotionCommand::PenUp => {
            format!("G0 Z{:.3} F{:.0}", profile.z_up, profile.pen_up_feedrate)
        }
        MotionCommand::SetFeedrate(feedrate) => format!("G1 F{:.0}", feedrate),
    }
}

/// Encode a whole program, one line per command.
pub fn encode_program(program: &MotionProgram) -> Vec<String> {
    program
        .commands
        .iter()
        .map(|command| encode_command(command, &program.profile))
        .collect()
}

/// Rapid move to a machine position.
pub fn move_to(target: Point3, feedrate: f64) -> String {
    format!(
        "G0 X{:.3} Y{:.3} Z{:.3} F{:.0}",
        target.x, target.y, target.z, feedrate
    )
}
