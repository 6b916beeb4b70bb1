use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("line {line}: unknown command `{command}`")]
    UnknownCommand { line: usize, command: String },

    #[error("line {line}: `{command}` takes {expected} arguments, got {found}")]
    Arity {
        line: usize,
        command: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("line {line}: invalid number `{token}`")]
    InvalidNumber { line: usize, token: String },
}

/// One trace command. Argument order follows the engine entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Spawn { pid: u32 },
    Vma { pid: u32, vma_id: usize, start: usize },
    Alloc { pid: u32, size: usize, region_id: usize },
    Free { pid: u32, region_id: usize },
    Read { pid: u32, region_id: usize, offset: usize },
    Write { pid: u32, value: u8, region_id: usize, offset: usize },
    MemOp { pid: u32, opcode: u32, a1: usize, a2: usize },
    Exit { pid: u32 },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Spawn { .. } => "spawn",
            Command::Vma { .. } => "vma",
            Command::Alloc { .. } => "alloc",
            Command::Free { .. } => "free",
            Command::Read { .. } => "read",
            Command::Write { .. } => "write",
            Command::MemOp { .. } => "memop",
            Command::Exit { .. } => "exit",
        }
    }
}

/// A parsed command with the line it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceLine {
    pub line: usize,
    pub command: Command,
}

struct Args<'a> {
    line: usize,
    command: &'static str,
    tokens: &'a [&'a str],
}

impl Args<'_> {
    fn arity(&self, counts: &[usize], expected: &'static str) -> Result<(), TraceError> {
        if counts.contains(&self.tokens.len()) {
            Ok(())
        } else {
            Err(TraceError::Arity {
                line: self.line,
                command: self.command,
                expected,
                found: self.tokens.len(),
            })
        }
    }

    fn num<T: FromStr>(&self, index: usize) -> Result<T, TraceError> {
        let token = self.tokens[index];
        token.parse().map_err(|_| TraceError::InvalidNumber {
            line: self.line,
            token: token.to_string(),
        })
    }

    fn num_or<T: FromStr>(&self, index: usize, default: T) -> Result<T, TraceError> {
        if index < self.tokens.len() {
            self.num(index)
        } else {
            Ok(default)
        }
    }
}

/// Parse trace text: one command per line, `#` starts a comment.
pub fn parse_trace(content: &str) -> Result<Vec<TraceLine>, TraceError> {
    let mut lines = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        let text = raw.split('#').next().unwrap_or("");
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let Some((&word, rest)) = tokens.split_first() else {
            continue;
        };

        let command = parse_command(line, word, rest)?;
        lines.push(TraceLine { line, command });
    }
    Ok(lines)
}

fn parse_command(line: usize, word: &str, rest: &[&str]) -> Result<Command, TraceError> {
    let name = match word {
        "spawn" => "spawn",
        "vma" => "vma",
        "alloc" => "alloc",
        "free" => "free",
        "read" => "read",
        "write" => "write",
        "memop" => "memop",
        "exit" => "exit",
        _ => {
            return Err(TraceError::UnknownCommand {
                line,
                command: word.to_string(),
            });
        }
    };
    let args = Args {
        line,
        command: name,
        tokens: rest,
    };

    let command = match name {
        "spawn" => {
            args.arity(&[1], "1")?;
            Command::Spawn { pid: args.num(0)? }
        }
        "vma" => {
            args.arity(&[3], "3")?;
            Command::Vma {
                pid: args.num(0)?,
                vma_id: args.num(1)?,
                start: args.num(2)?,
            }
        }
        "alloc" => {
            args.arity(&[3], "3")?;
            Command::Alloc {
                pid: args.num(0)?,
                size: args.num(1)?,
                region_id: args.num(2)?,
            }
        }
        "free" => {
            args.arity(&[2], "2")?;
            Command::Free {
                pid: args.num(0)?,
                region_id: args.num(1)?,
            }
        }
        "read" => {
            args.arity(&[3], "3")?;
            Command::Read {
                pid: args.num(0)?,
                region_id: args.num(1)?,
                offset: args.num(2)?,
            }
        }
        "write" => {
            args.arity(&[4], "4")?;
            Command::Write {
                pid: args.num(0)?,
                value: args.num(1)?,
                region_id: args.num(2)?,
                offset: args.num(3)?,
            }
        }
        "memop" => {
            args.arity(&[2, 3, 4], "2 to 4")?;
            Command::MemOp {
                pid: args.num(0)?,
                opcode: args.num(1)?,
                a1: args.num_or(2, 0)?,
                a2: args.num_or(3, 0)?,
            }
        }
        _ => {
            args.arity(&[1], "1")?;
            Command::Exit { pid: args.num(0)? }
        }
    };
    Ok(command)
}

pub fn read_trace<P: AsRef<Path>>(path: P) -> Result<Vec<TraceLine>, TraceError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| TraceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_trace(&content)
}

/// Write results space-separated on one line
pub fn write_results<P: AsRef<Path>>(path: P, results: &[i64]) -> Result<(), TraceError> {
    let path = path.as_ref();
    let output: Vec<String> = results.iter().map(|r| r.to_string()).collect();
    let content = output.join(" ");
    fs::write(path, content).map_err(|source| TraceError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_commands() {
        let trace = "\
spawn 1
vma 1 2 4096
alloc 1 100 0
write 1 42 0 5
read 1 0 5
free 1 0
memop 1 1 0 300
exit 1
";
        let lines = parse_trace(trace).unwrap();
        let commands: Vec<Command> = lines.iter().map(|l| l.command).collect();
        assert_eq!(
            commands,
            vec![
                Command::Spawn { pid: 1 },
                Command::Vma { pid: 1, vma_id: 2, start: 4096 },
                Command::Alloc { pid: 1, size: 100, region_id: 0 },
                Command::Write { pid: 1, value: 42, region_id: 0, offset: 5 },
                Command::Read { pid: 1, region_id: 0, offset: 5 },
                Command::Free { pid: 1, region_id: 0 },
                Command::MemOp { pid: 1, opcode: 1, a1: 0, a2: 300 },
                Command::Exit { pid: 1 },
            ]
        );
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let trace = "# header\n\nspawn 3   # first process\n   \n";
        let lines = parse_trace(trace).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].line, 3);
        assert_eq!(lines[0].command.name(), "spawn");
    }

    #[test]
    fn test_memop_optional_args() {
        let lines = parse_trace("memop 1 3 260").unwrap();
        assert_eq!(
            lines[0].command,
            Command::MemOp { pid: 1, opcode: 3, a1: 260, a2: 0 }
        );
    }

    #[test]
    fn test_unknown_command() {
        let err = parse_trace("spawn 1\nmmap 1 2").unwrap_err();
        assert!(matches!(err, TraceError::UnknownCommand { line: 2, .. }));
    }

    #[test]
    fn test_wrong_arity() {
        let err = parse_trace("alloc 1 100").unwrap_err();
        assert!(matches!(
            err,
            TraceError::Arity { line: 1, command: "alloc", found: 2, .. }
        ));
        assert!(err.to_string().contains("takes 3 arguments"));
    }

    #[test]
    fn test_invalid_numbers() {
        let err = parse_trace("alloc 1 ten 0").unwrap_err();
        assert!(matches!(err, TraceError::InvalidNumber { line: 1, ref token } if token == "ten"));

        // Write values are bytes
        assert!(parse_trace("write 1 256 0 0").is_err());
    }
}
