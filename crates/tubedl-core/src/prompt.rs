//! Interactive prompting.
//!
//! Both question kinds re-ask until the answer is acceptable; the only way out
//! without an answer is end of input, which surfaces as `UnexpectedEof`.

use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};

pub trait Prompt {
    /// Free-form line (trimmed).
    fn ask_line(&mut self, text: &str) -> io::Result<String>;

    /// `[y/n]` question; case-insensitive.
    fn ask_yes_no(&mut self, text: &str) -> io::Result<bool>;

    /// Re-asks until the trimmed, lowercased answer is a member of `valid`
    /// (whose entries are lowercase).
    fn ask_choice(&mut self, text: &str, valid: &BTreeSet<String>) -> io::Result<String>;
}

/// Prompt over any reader/writer pair; `StdioPrompt::stdio()` for the terminal.
pub struct StdioPrompt<R, W> {
    input: R,
    output: W,
}

impl StdioPrompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> StdioPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_answer(&mut self, text: &str) -> io::Result<String> {
        write!(self.output, "{text}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        Ok(line.trim().to_string())
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Prompt for StdioPrompt<R, W> {
    fn ask_line(&mut self, text: &str) -> io::Result<String> {
        self.read_answer(text)
    }

    fn ask_yes_no(&mut self, text: &str) -> io::Result<bool> {
        let mut answer = self.read_answer(&format!("{text} [y/n] "))?.to_lowercase();
        while answer != "y" && answer != "n" {
            answer = self
                .read_answer(&format!("Please only answer with [y/n]: {text} "))?
                .to_lowercase();
        }
        Ok(answer == "y")
    }

    fn ask_choice(&mut self, text: &str, valid: &BTreeSet<String>) -> io::Result<String> {
        let mut answer = self.read_answer(text)?.to_lowercase();
        while !valid.contains(&answer) {
            answer = self
                .read_answer(&format!("{answer} is not a valid option. Try again: "))?
                .to_lowercase();
        }
        Ok(answer)
    }
}
