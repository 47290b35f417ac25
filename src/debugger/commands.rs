use crate::host::ThreadId;

/// A shell command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Backtrace { thread: Option<ThreadId> },
    /// Select a thread, or list them when no id is given.
    Thread(Option<ThreadId>),
    Continue,
    Reload,
    VmFrames,
    Help,
    Quit,
}

pub const HELP: &str = "\
bt, backtrace [THREAD]  print the backtrace of the current (or given) thread
thread [ID]             list threads, or select one
continue, c             resume the target until its next stop
reload                  simulate the program's code being reloaded
vm-frames               dump the interpreter frame chain of the current thread
help                    show this text
quit, exit              leave the shell";

/// Check if line is blank or a comment
pub fn is_comment(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

fn parse_thread(word: &str) -> Result<ThreadId, String> {
    word.parse::<u64>()
        .map(ThreadId)
        .map_err(|_| format!("invalid thread id '{}'", word))
}

/// Parses one line of shell input; `Ok(None)` for blank lines and comments.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    if is_comment(line) {
        return Ok(None);
    }

    let words =
        shlex::split(line).ok_or_else(|| format!("unbalanced quotes in '{}'", line.trim()))?;
    let Some((name, args)) = words.split_first() else {
        return Ok(None);
    };

    let optional_thread = |args: &[String]| -> Result<Option<ThreadId>, String> {
        match args {
            [] => Ok(None),
            [id] => parse_thread(id).map(Some),
            _ => Err(format!("too many arguments to '{}'", name)),
        }
    };
    let no_args = |command: Command| -> Result<Option<Command>, String> {
        if args.is_empty() {
            Ok(Some(command))
        } else {
            Err(format!("'{}' takes no arguments", name))
        }
    };

    match name.as_str() {
        "bt" | "backtrace" | "where" => Ok(Some(Command::Backtrace {
            thread: optional_thread(args)?,
        })),
        "thread" => Ok(Some(Command::Thread(optional_thread(args)?))),
        "continue" | "c" => no_args(Command::Continue),
        "reload" => no_args(Command::Reload),
        "vm-frames" => no_args(Command::VmFrames),
        "help" => no_args(Command::Help),
        "quit" | "exit" | "q" => no_args(Command::Quit),
        other => Err(format!("unknown command '{}', try 'help'", other)),
    }
}
