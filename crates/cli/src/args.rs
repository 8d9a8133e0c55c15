#![forbid(unsafe_code)]

use motion_core::ids::MotionId;
use motion_core::poll::VoteCounts;
use std::path::PathBuf;

#[derive(Debug, PartialEq)]
pub(crate) struct CliArgs {
    pub(crate) storage_dir: Option<PathBuf>,
    pub(crate) config: Option<PathBuf>,
    pub(crate) command: Command,
}

#[derive(Debug, PartialEq)]
pub(crate) enum Command {
    Create {
        title: String,
        text: String,
        reason: Option<String>,
        identifier: Option<String>,
        category: Option<i64>,
    },
    Edit {
        id: MotionId,
        title: Option<String>,
        text: Option<String>,
        reason: Option<String>,
        new_version: bool,
    },
    Show {
        id: MotionId,
        version: Option<usize>,
    },
    Versions {
        id: MotionId,
    },
    State {
        id: MotionId,
        next: String,
    },
    ResetState {
        id: MotionId,
    },
    Support {
        id: MotionId,
        person: String,
    },
    Unsupport {
        id: MotionId,
        person: String,
    },
    Poll {
        id: MotionId,
    },
    Polls {
        id: MotionId,
    },
    Vote {
        id: MotionId,
        number: i64,
        counts: VoteCounts,
    },
    Result {
        id: MotionId,
        number: i64,
    },
    Category {
        name: String,
        prefix: String,
    },
    Workflow,
}

/// Returns `Ok(None)` when help was requested.
pub(crate) fn parse_args(args: &[String]) -> Result<Option<CliArgs>, String> {
    if args.iter().any(|a| a == "-h" || a == "--help") {
        return Ok(None);
    }

    let mut storage_dir: Option<PathBuf> = None;
    let mut config: Option<PathBuf> = None;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--storage-dir" => {
                i += 1;
                let v = args.get(i).ok_or("--storage-dir requires DIR")?;
                storage_dir = Some(PathBuf::from(v));
            }
            "--config" => {
                i += 1;
                let v = args.get(i).ok_or("--config requires PATH")?;
                config = Some(PathBuf::from(v));
            }
            other if other.starts_with("--") => {
                return Err(format!("unknown option: {other}"));
            }
            _ => break,
        }
        i += 1;
    }

    let name = args.get(i).ok_or("missing command")?;
    let command = parse_command(name, &args[i + 1..])?;
    Ok(Some(CliArgs {
        storage_dir,
        config,
        command,
    }))
}

fn parse_command(name: &str, rest: &[String]) -> Result<Command, String> {
    let command = match name {
        "create" => {
            let a = CommandArgs::parse(
                rest,
                &["--title", "--text", "--reason", "--identifier", "--category"],
                &[],
            )?;
            a.positional_count(0, "create")?;
            Command::Create {
                title: a.required("--title")?.to_string(),
                text: a.required("--text")?.to_string(),
                reason: a.option("--reason").map(str::to_string),
                identifier: a.option("--identifier").map(str::to_string),
                category: a.option("--category").map(|v| parse_i64(v, "--category")).transpose()?,
            }
        }
        "edit" => {
            let a = CommandArgs::parse(
                rest,
                &["--title", "--text", "--reason"],
                &["--new-version"],
            )?;
            a.positional_count(1, "edit ID")?;
            Command::Edit {
                id: a.motion_id(0)?,
                title: a.option("--title").map(str::to_string),
                text: a.option("--text").map(str::to_string),
                reason: a.option("--reason").map(str::to_string),
                new_version: a.switch("--new-version"),
            }
        }
        "show" => {
            let a = CommandArgs::parse(rest, &["--version"], &[])?;
            a.positional_count(1, "show ID")?;
            let version = a
                .option("--version")
                .map(|v| {
                    v.parse::<usize>()
                        .map_err(|_| "--version must be a positive integer".to_string())
                })
                .transpose()?;
            Command::Show {
                id: a.motion_id(0)?,
                version,
            }
        }
        "versions" => Command::Versions {
            id: single_motion(rest, "versions ID")?,
        },
        "state" => {
            let a = CommandArgs::parse(rest, &[], &[])?;
            a.positional_count(2, "state ID NEXT")?;
            Command::State {
                id: a.motion_id(0)?,
                next: a.positionals[1].to_string(),
            }
        }
        "reset-state" => Command::ResetState {
            id: single_motion(rest, "reset-state ID")?,
        },
        "support" | "unsupport" => {
            let a = CommandArgs::parse(rest, &[], &[])?;
            a.positional_count(2, &format!("{name} ID PERSON"))?;
            let id = a.motion_id(0)?;
            let person = a.positionals[1].to_string();
            if name == "support" {
                Command::Support { id, person }
            } else {
                Command::Unsupport { id, person }
            }
        }
        "poll" => Command::Poll {
            id: single_motion(rest, "poll ID")?,
        },
        "polls" => Command::Polls {
            id: single_motion(rest, "polls ID")?,
        },
        "vote" => {
            let a = CommandArgs::parse(
                rest,
                &["--yes", "--no", "--abstain", "--cast", "--invalid"],
                &[],
            )?;
            a.positional_count(2, "vote ID NUMBER")?;
            let counts = VoteCounts {
                yes: parse_i64(a.required("--yes")?, "--yes")?,
                no: parse_i64(a.required("--no")?, "--no")?,
                abstain: parse_i64(a.required("--abstain")?, "--abstain")?,
                votes_cast: a.option("--cast").map(|v| parse_i64(v, "--cast")).transpose()?,
                votes_invalid: a
                    .option("--invalid")
                    .map(|v| parse_i64(v, "--invalid"))
                    .transpose()?,
            };
            Command::Vote {
                id: a.motion_id(0)?,
                number: parse_i64(a.positionals[1], "NUMBER")?,
                counts,
            }
        }
        "result" => {
            let a = CommandArgs::parse(rest, &[], &[])?;
            a.positional_count(2, "result ID NUMBER")?;
            Command::Result {
                id: a.motion_id(0)?,
                number: parse_i64(a.positionals[1], "NUMBER")?,
            }
        }
        "category" => {
            let a = CommandArgs::parse(rest, &[], &[])?;
            a.positional_count(2, "category NAME PREFIX")?;
            Command::Category {
                name: a.positionals[0].to_string(),
                prefix: a.positionals[1].to_string(),
            }
        }
        "workflow" => {
            CommandArgs::parse(rest, &[], &[])?.positional_count(0, "workflow")?;
            Command::Workflow
        }
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(command)
}

fn single_motion(rest: &[String], usage: &str) -> Result<MotionId, String> {
    let a = CommandArgs::parse(rest, &[], &[])?;
    a.positional_count(1, usage)?;
    a.motion_id(0)
}

fn parse_i64(raw: &str, what: &str) -> Result<i64, String> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| format!("{what} must be an integer"))
}

struct CommandArgs<'a> {
    positionals: Vec<&'a str>,
    options: Vec<(&'a str, &'a str)>,
    switches: Vec<&'a str>,
}

impl<'a> CommandArgs<'a> {
    fn parse(rest: &'a [String], valued: &[&str], switches: &[&str]) -> Result<Self, String> {
        let mut out = Self {
            positionals: Vec::new(),
            options: Vec::new(),
            switches: Vec::new(),
        };
        let mut i = 0usize;
        while i < rest.len() {
            let arg = rest[i].as_str();
            if switches.contains(&arg) {
                out.switches.push(arg);
            } else if valued.contains(&arg) {
                i += 1;
                let v = rest.get(i).ok_or_else(|| format!("{arg} requires a value"))?;
                out.options.push((arg, v.as_str()));
            } else if arg.starts_with("--") {
                return Err(format!("unknown option: {arg}"));
            } else {
                out.positionals.push(arg);
            }
            i += 1;
        }
        Ok(out)
    }

    /// Last occurrence wins.
    fn option(&self, name: &str) -> Option<&'a str> {
        self.options
            .iter()
            .rev()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }

    fn required(&self, name: &str) -> Result<&'a str, String> {
        self.option(name).ok_or_else(|| format!("{name} is required"))
    }

    fn switch(&self, name: &str) -> bool {
        self.switches.contains(&name)
    }

    fn positional_count(&self, expected: usize, usage: &str) -> Result<(), String> {
        if self.positionals.len() != expected {
            return Err(format!("usage: motionctl {usage}"));
        }
        Ok(())
    }

    fn motion_id(&self, index: usize) -> Result<MotionId, String> {
        let raw = self.positionals.get(index).ok_or("missing motion ID")?;
        parse_i64(raw, "motion ID").map(MotionId::new)
    }
}
