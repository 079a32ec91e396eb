//! One-line debugger commands.

use anyhow::{anyhow, bail, Context, Result};
use ssj_session::ResumeOp;
use ssj_wire::Handle;

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UserCommand {
    Resume(ResumeOp),
    Backtrace,
    Locals,
    Eval(String),
    Inspect(Handle),
    Break { file: String, line: u32 },
    Clear(u32),
    List(String),
    Quit,
}

/// Parse one line of input. Blank lines yield `None`.
pub(crate) fn parse_command(input: &str) -> Result<Option<UserCommand>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match input.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (input, ""),
    };
    let command = match verb {
        "c" => UserCommand::Resume(ResumeOp::Continue),
        "s" => UserCommand::Resume(ResumeOp::StepIn),
        "n" => UserCommand::Resume(ResumeOp::StepOver),
        "o" => UserCommand::Resume(ResumeOp::StepOut),
        "bt" => UserCommand::Backtrace,
        "l" => UserCommand::Locals,
        "q" => UserCommand::Quit,
        "e" => UserCommand::Eval(required(rest, "e <expression>")?.to_string()),
        "x" => UserCommand::Inspect(parse_handle(required(rest, "x <handle>")?)?),
        "b" => {
            let target = required(rest, "b <file>:<line>")?;
            let (file, line) = target
                .rsplit_once(':')
                .ok_or_else(|| anyhow!("expected <file>:<line>, got {target:?}"))?;
            let line: u32 = line
                .parse()
                .with_context(|| format!("invalid line number {line:?}"))?;
            if file.is_empty() || line == 0 {
                bail!("expected <file>:<line>, got {target:?}");
            }
            UserCommand::Break {
                file: file.to_string(),
                line,
            }
        }
        "d" => {
            let handle = required(rest, "d <handle>")?;
            UserCommand::Clear(
                handle
                    .parse()
                    .with_context(|| format!("invalid breakpoint handle {handle:?}"))?,
            )
        }
        "list" => UserCommand::List(required(rest, "list <file>")?.to_string()),
        other => bail!("unknown command {other:?}"),
    };
    Ok(Some(command))
}

fn required<'a>(rest: &'a str, usage: &str) -> Result<&'a str> {
    if rest.is_empty() {
        bail!("usage: {usage}");
    }
    Ok(rest)
}

/// Object handles are shown as `0x…`; plain decimal is accepted too.
fn parse_handle(text: &str) -> Result<Handle> {
    let value = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    value
        .map(Handle)
        .with_context(|| format!("invalid object handle {text:?}"))
}
