//! Structured stage-command builder.
//!
//! Stage invocations are flag-based calls into collaborator scripts. Building
//! them from typed flag/value pairs keeps "which flags are present" logic
//! testable and avoids the quoting hazards of string interpolation. Every
//! data dependency a stage reads is passed as an explicit path argument, and
//! every artifact it produces as an explicit output-path argument.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One element of a command line after the script name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum CommandPart {
    /// A bare boolean flag, e.g. `--overwrite`.
    Flag(String),
    /// A named flag with a value, e.g. `--mt gs://bucket/raw.mt`.
    Arg { name: String, value: String },
}

/// A flag-based invocation of a collaborator script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptCommand {
    script: String,
    parts: Vec<CommandPart>,
}

impl ScriptCommand {
    /// Creates a command invoking `script`.
    #[must_use]
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            parts: Vec::new(),
        }
    }

    /// Appends a bare flag.
    #[must_use]
    pub fn flag(mut self, name: impl Into<String>) -> Self {
        self.parts.push(CommandPart::Flag(name.into()));
        self
    }

    /// Appends a bare flag only when `condition` holds.
    #[must_use]
    pub fn flag_if(self, condition: bool, name: impl Into<String>) -> Self {
        if condition {
            self.flag(name)
        } else {
            self
        }
    }

    /// Appends a flag with a value.
    #[must_use]
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(CommandPart::Arg {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Appends a flag with a value when one is present.
    #[must_use]
    pub fn arg_opt(self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => self.arg(name, v),
            None => self,
        }
    }

    /// Returns the script being invoked.
    #[must_use]
    pub fn script(&self) -> &str {
        &self.script
    }

    /// Returns whether the command carries the given bare flag.
    #[must_use]
    pub fn has_flag(&self, name: &str) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, CommandPart::Flag(f) if f == name))
    }

    /// Returns the value of the given named flag, if present.
    #[must_use]
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|p| match p {
            CommandPart::Arg { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// Renders the command as an argv vector, script first.
    #[must_use]
    pub fn to_argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(1 + self.parts.len() * 2);
        argv.push(self.script.clone());
        for part in &self.parts {
            match part {
                CommandPart::Flag(f) => argv.push(f.clone()),
                CommandPart::Arg { name, value } => {
                    argv.push(name.clone());
                    argv.push(value.clone());
                }
            }
        }
        argv
    }
}

impl fmt::Display for ScriptCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_argv().join(" "))
    }
}
