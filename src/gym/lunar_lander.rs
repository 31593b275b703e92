use std::{
    io::{BufRead, BufReader, Write},
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
    thread,
    time::Duration,
};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, FromRepr, VariantArray};

use crate::{
    env::{ensure_finite, DiscreteActionSpace, Environment, Step},
    error::{Error, Result},
};

/// Size of a LunarLander observation
pub const STATE_DIM: usize = 8;

/// Number of discrete LunarLander actions
pub const NUM_ACTIONS: usize = 4;

/// How long a closed simulator may take to exit before it is killed
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);
const CLOSE_POLL: Duration = Duration::from_millis(10);

/// `[x, y, vx, vy, angle, angular_velocity, left_leg_contact, right_leg_contact]`
pub type LanderState = [f32; STATE_DIM];

/// Actions for the [`LunarLander`] environment
#[derive(FromRepr, EnumIter, VariantArray, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LanderAction {
    Noop = 0,
    FireLeft = 1,
    FireMain = 2,
    FireRight = 3,
}

impl TryFrom<usize> for LanderAction {
    type Error = Error;

    fn try_from(value: usize) -> Result<Self> {
        Self::from_repr(value).ok_or(Error::InvalidAction(value))
    }
}

/// How to launch the external simulator
#[derive(Debug, Clone)]
pub struct SimulatorCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl SimulatorCommand {
    /// Parse a whitespace separated command line, e.g. `python3 scripts/gym_bridge.py`
    pub fn parse(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| Error::Config("empty simulator command".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl Default for SimulatorCommand {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["scripts/gym_bridge.py".to_string()],
        }
    }
}

impl std::fmt::Display for SimulatorCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Messages sent to the simulator, one JSON object per line
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub(crate) enum Request {
    Reset { seed: Option<u64> },
    Step { action: usize },
    Render,
    Close,
}

/// Every field the simulator may answer with
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Response {
    #[serde(default)]
    observation: Option<Vec<f32>>,
    #[serde(default)]
    reward: Option<f32>,
    #[serde(default)]
    terminated: bool,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    error: Option<String>,
}

impl Response {
    pub(crate) fn parse(line: &str) -> Result<Self> {
        let response: Response = serde_json::from_str(line)
            .map_err(|e| Error::Protocol(format!("invalid response {line:?}: {e}")))?;
        match response.error {
            Some(message) => Err(Error::Simulator(message)),
            None => Ok(response),
        }
    }

    pub(crate) fn observation(&self) -> Result<LanderState> {
        let values = self
            .observation
            .as_ref()
            .ok_or_else(|| Error::Protocol("response has no observation".to_string()))?;
        ensure_finite(values)?;
        values
            .as_slice()
            .try_into()
            .map_err(|_| Error::InvalidObservation {
                expected: STATE_DIM,
                got: values.len(),
            })
    }

    pub(crate) fn into_step(self) -> Result<Step<LanderState>> {
        let state = self.observation()?;
        let reward = self
            .reward
            .ok_or_else(|| Error::Protocol("step response has no reward".to_string()))?;
        Ok(Step {
            state,
            reward,
            done: self.terminated || self.truncated,
        })
    }
}

/// The LunarLander task, simulated by an external process
///
/// The process speaks line-delimited JSON on stdin/stdout (see
/// `scripts/gym_bridge.py` for a gymnasium-backed implementation). It is
/// spawned on construction and asked to close when the adapter is dropped.
pub struct LunarLander {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    seed: Option<u64>,
    episodes: u64,
}

impl LunarLander {
    pub fn new(command: &SimulatorCommand, seed: Option<u64>) -> Result<Self> {
        let unavailable = |source| Error::EnvironmentUnavailable {
            command: command.to_string(),
            source,
        };

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(unavailable)?;

        let stdin = child.stdin.take().ok_or(Error::EnvironmentClosed)?;
        let stdout = child.stdout.take().ok_or(Error::EnvironmentClosed)?;
        info!("started simulator `{command}` (pid {})", child.id());

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            seed,
            episodes: 0,
        })
    }

    fn send(&mut self, request: &Request) -> Result<()> {
        let line = serde_json::to_string(request)?;
        writeln!(self.stdin, "{line}").map_err(|_| Error::EnvironmentClosed)?;
        self.stdin.flush().map_err(|_| Error::EnvironmentClosed)
    }

    fn call(&mut self, request: &Request) -> Result<Response> {
        self.send(request)?;

        let mut line = String::new();
        let read = self.stdout.read_line(&mut line)?;
        if read == 0 {
            return Err(Error::EnvironmentClosed);
        }
        Response::parse(line.trim_end())
    }
}

impl Environment for LunarLander {
    type State = LanderState;
    type Action = LanderAction;

    fn reset(&mut self) -> Result<Self::State> {
        // successive episodes get successive seeds so runs stay reproducible
        let seed = self.seed.map(|s| s.wrapping_add(self.episodes));
        self.episodes += 1;
        self.call(&Request::Reset { seed })?.observation()
    }

    fn step(&mut self, action: Self::Action) -> Result<Step<Self::State>> {
        self.call(&Request::Step {
            action: action as usize,
        })?
        .into_step()
    }

    fn render(&mut self) -> Result<()> {
        self.call(&Request::Render).map(|_| ())
    }
}

impl DiscreteActionSpace for LunarLander {
    fn actions(&self) -> Vec<Self::Action> {
        LanderAction::VARIANTS.to_vec()
    }
}

impl Drop for LunarLander {
    fn drop(&mut self) {
        if let Err(e) = self.send(&Request::Close) {
            debug!("simulator already gone: {e}");
        }

        let polls = CLOSE_TIMEOUT.as_millis() / CLOSE_POLL.as_millis();
        for _ in 0..polls {
            match self.child.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) => thread::sleep(CLOSE_POLL),
                Err(_) => break,
            }
        }

        warn!("simulator did not exit after close, killing it");
        if let Err(e) = self.child.kill() {
            warn!("failed to stop simulator: {e}");
        }
        let _ = self.child.wait();
    }
}
