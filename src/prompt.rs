//! Interactive overwrite confirmation

use std::io::{self, BufRead, Write};
use std::path::Path;

use crossterm::style::{Color, Stylize};

/// Asks whether an existing file at `path` may be replaced.
pub trait Confirm {
    fn confirm(&self, path: &Path) -> bool;
}

/// Prompts on stderr and reads the answer from stdin.
pub struct TerminalPrompt;

impl Confirm for TerminalPrompt {
    fn confirm(&self, path: &Path) -> bool {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        ask(&mut io::stderr(), &mut input, path).unwrap_or(false)
    }
}

/// Answers every question the same way.
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&self, _path: &Path) -> bool {
        self.0
    }
}

fn ask<W: Write, R: BufRead>(out: &mut W, input: &mut R, path: &Path) -> io::Result<bool> {
    write!(
        out,
        "{}  A file exists at the path '{}'. Do you really want to overwrite it? [y/N]: ",
        "WARNING".with(Color::Yellow).bold(),
        path.display()
    )?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(false);
    }
    Ok(is_yes(&line))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// `true` when nothing is in the way, `force` is set, or the user agrees.
pub fn allow_file_overwrite(path: &Path, force: bool, prompt: &dyn Confirm) -> bool {
    if !path.is_file() || force {
        return true;
    }
    prompt.confirm(path)
}
