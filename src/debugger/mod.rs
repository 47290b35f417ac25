mod commands;
mod context;

pub use commands::{is_comment, parse_command, Command, HELP};
pub use context::DebugContext;

use crate::host::FrameDecorator;
use std::io::{self, BufRead, Write};
use tracing::debug;

/// Whether the shell keeps reading commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn execute<W: Write>(
    ctx: &mut DebugContext,
    command: Command,
    out: &mut W,
) -> io::Result<Flow> {
    debug!(?command, "executing");
    match command {
        Command::Backtrace { thread } => {
            let Some(thread) = thread.or(ctx.current_thread()) else {
                writeln!(out, "No stack.")?;
                return Ok(Flow::Continue);
            };
            match ctx.decorated_backtrace(thread) {
                Some(frames) => {
                    for frame in &frames {
                        writeln!(out, "{}", frame.describe())?;
                    }
                }
                None => writeln!(out, "No thread {}.", thread)?,
            }
        }
        Command::Thread(Some(thread)) => {
            if ctx.select_thread(thread) {
                writeln!(out, "[Switching to thread {}]", thread)?;
            } else {
                writeln!(out, "No thread {}.", thread)?;
            }
        }
        Command::Thread(None) => {
            let current = ctx.current_thread();
            for state in ctx.target().threads() {
                let marker = if Some(state.id) == current { '*' } else { ' ' };
                let function = ctx.target().function_for_pc(state.rip.0).unwrap_or("??");
                writeln!(out, "{} {:<4} {} in {}", marker, state.id, state.rip, function)?;
            }
        }
        Command::Continue => {
            if ctx.is_running() {
                writeln!(out, "The program is not being run.")?;
            } else if ctx.resume() {
                let stop = ctx.target().current_stop().unwrap_or_default();
                writeln!(out, "Stopped (stop {} of {}).", stop + 1, ctx.target().stop_count())?;
            } else {
                writeln!(out, "Program exited.")?;
            }
        }
        Command::Reload => {
            ctx.reload();
            writeln!(out, "Code layout reloaded.")?;
        }
        Command::VmFrames => {
            let chain = ctx.current_thread().and_then(|thread| ctx.frame_chain(thread));
            match chain {
                Some(chain) if !chain.is_empty() => {
                    for (sp, bp) in chain.iter() {
                        writeln!(out, "sp={:#x} bp={:#x}", sp, bp)?;
                    }
                }
                _ => writeln!(out, "No interpreter frames.")?,
            }
        }
        Command::Help => writeln!(out, "{}", HELP)?,
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

/// Reads commands until end of input or `quit`.
pub fn run_shell<R: BufRead, W: Write>(
    ctx: &mut DebugContext,
    input: R,
    out: &mut W,
    prompt: bool,
) -> io::Result<()> {
    if prompt {
        write!(out, "(b9) ")?;
        out.flush()?;
    }
    for line in input.lines() {
        let line = line?;
        match parse_command(&line) {
            Ok(Some(command)) => {
                if execute(ctx, command, out)? == Flow::Quit {
                    break;
                }
            }
            Ok(None) => {}
            Err(message) => writeln!(out, "{}", message)?,
        }
        if prompt {
            write!(out, "(b9) ")?;
            out.flush()?;
        }
    }
    Ok(())
}
