// src/exec/stage.rs

use std::fmt;
use std::path::Path;

use tokio::process::Command;

use crate::errors::{Result, WatchrunError};

/// Tokens that separate successive stages on the command line.
pub const STAGE_SEPARATORS: [&str; 2] = [";;", "=="];

/// One external command of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub command: String,
    pub args: Vec<String>,
}

impl Stage {
    pub fn new<C, I, A>(command: C, args: I) -> Self
    where
        C: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a stage from `[command, args...]`; `None` for an empty list.
    pub fn from_argv(argv: Vec<String>) -> Option<Self> {
        let mut iter = argv.into_iter();
        let command = iter.next()?;
        if command.is_empty() {
            return None;
        }
        Some(Self {
            command,
            args: iter.collect(),
        })
    }

    pub(crate) fn to_command(&self, dir: Option<&Path>) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Split CLI arguments into stages at `;;` / `==`.
///
/// `["make", ";;", "./app", "-v"]` becomes `make` then `./app -v`. A
/// separator with nothing on one side (leading, trailing or doubled) is a
/// configuration error, as is an empty argument list.
pub fn parse_stages<S: AsRef<str>>(args: &[S]) -> Result<Vec<Stage>> {
    if args.is_empty() {
        return Err(WatchrunError::ConfigError(
            "no command given".to_string(),
        ));
    }

    let mut stages = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for (pos, arg) in args.iter().map(AsRef::as_ref).enumerate() {
        if STAGE_SEPARATORS.contains(&arg) {
            let stage = segment_to_stage(std::mem::take(&mut current), || {
                format!("separator '{arg}' at argument {pos} has no command before it")
            })?;
            stages.push(stage);
        } else {
            current.push(arg.to_string());
        }
    }

    let last = segment_to_stage(current, || "command list ends with a separator".to_string())?;
    stages.push(last);

    Ok(stages)
}

/// `missing` describes an empty segment; an empty command name is reported
/// as such.
fn segment_to_stage(argv: Vec<String>, missing: impl FnOnce() -> String) -> Result<Stage> {
    if argv.first().is_some_and(String::is_empty) {
        return Err(WatchrunError::ConfigError(
            "empty command name in stage list".to_string(),
        ));
    }
    Stage::from_argv(argv).ok_or_else(|| WatchrunError::ConfigError(missing()))
}
