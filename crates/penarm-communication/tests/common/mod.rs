#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use penarm_communication::MotionTransport;
use penarm_core::{HardwareError, MotionCommand, MotionProfile, MotionProgram, Point, Point3};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// What the scripted arm does with a written line.
pub enum Reply {
    /// Acknowledge.
    Ok,
    /// Say nothing; the reader times out.
    Silent,
    /// Send these raw lines.
    Lines(Vec<&'static str>),
    /// Send these lines only after the first read has timed out.
    Late(Vec<&'static str>),
    /// Fail the write as if the cable was pulled.
    Disconnect,
}

type Responder = Box<dyn FnMut(usize, &str) -> Reply + Send>;

struct MockState {
    written: Vec<String>,
    inbox: VecDeque<String>,
    late: VecDeque<String>,
    responder: Responder,
}

/// Transport driven by a responder closure, called with the write index and line.
pub struct ScriptedTransport {
    state: Arc<Mutex<MockState>>,
}

/// Test-side view of a [`ScriptedTransport`].
#[derive(Clone)]
pub struct TransportLog {
    state: Arc<Mutex<MockState>>,
}

impl TransportLog {
    pub fn written(&self) -> Vec<String> {
        self.state.lock().written.clone()
    }

    pub fn count(&self, line: &str) -> usize {
        self.state.lock().written.iter().filter(|l| *l == line).count()
    }
}

pub fn scripted<F>(responder: F) -> (ScriptedTransport, TransportLog)
where
    F: FnMut(usize, &str) -> Reply + Send + 'static,
{
    let state = Arc::new(Mutex::new(MockState {
        written: Vec::new(),
        inbox: VecDeque::new(),
        late: VecDeque::new(),
        responder: Box::new(responder),
    }));
    (
        ScriptedTransport {
            state: state.clone(),
        },
        TransportLog { state },
    )
}

pub fn always_ok() -> (ScriptedTransport, TransportLog) {
    scripted(|_, _| Reply::Ok)
}

#[async_trait]
impl MotionTransport for ScriptedTransport {
    fn name(&self) -> String {
        "scripted".to_string()
    }

    async fn write_line(&mut self, line: &str) -> Result<(), HardwareError> {
        let mut state = self.state.lock();
        let index = state.written.len();
        state.written.push(line.to_string());
        match (state.responder)(index, line) {
            Reply::Ok => state.inbox.push_back("ok".to_string()),
            Reply::Silent => {}
            Reply::Lines(lines) => state.inbox.extend(lines.into_iter().map(String::from)),
            Reply::Late(lines) => state.late.extend(lines.into_iter().map(String::from)),
            Reply::Disconnect => {
                return Err(HardwareError::Disconnected {
                    reason: "cable pulled".to_string(),
                })
            }
        }
        Ok(())
    }

    async fn read_line(&mut self, _timeout: Duration) -> Result<Option<String>, HardwareError> {
        let mut state = self.state.lock();
        let line = state.inbox.pop_front();
        if line.is_none() {
            // This read times out; late lines become readable afterwards.
            let late: Vec<String> = state.late.drain(..).collect();
            state.inbox.extend(late);
        }
        Ok(line)
    }
}

pub const RESTING: Point3 = Point3::new(200.0, 0.0, 50.0);

/// One square-ish stroke: six commands.
pub fn program() -> MotionProgram {
    MotionProgram::new(
        vec![
            MotionCommand::SetFeedrate(2000.0),
            MotionCommand::MoveUp(Point::new(0.0, 0.0)),
            MotionCommand::PenDown,
            MotionCommand::DrawTo(Point::new(10.0, 0.0)),
            MotionCommand::DrawTo(Point::new(10.0, 10.0)),
            MotionCommand::PenUp,
        ],
        MotionProfile {
            z_up: 10.0,
            z_draw: 0.0,
            pen_up_feedrate: 3000.0,
            pen_down_feedrate: 2000.0,
        },
    )
}

pub const PEN_DOWN_LINE: &str = "G1 Z0.000 F2000";
pub const PEN_UP_LINE: &str = "G0 Z10.000 F3000";
pub const PARK_LINE: &str = "G0 X200.000 Y0.000 Z50.000 F3000";
