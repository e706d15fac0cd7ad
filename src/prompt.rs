use std::io::{self, BufRead, Write};

use crate::error::{Error, Result};

/// Source of raw operator answers
pub trait Prompt {
    /// Shows `text` (with an optional hint line) and returns the answer with
    /// its line ending removed. End of input is `Error::EndOfInput`.
    fn prompt_line(&mut self, text: &str, hint: Option<&str>) -> Result<String>;
}

/// Reads answers from a line-oriented reader, printing questions to a writer
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl LinePrompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn prompt_line(&mut self, text: &str, hint: Option<&str>) -> Result<String> {
        match hint {
            Some(hint) => write!(self.output, "\n{text}\n{hint}: ")?,
            None => write!(self.output, "\n{text}: ")?,
        }
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(Error::EndOfInput);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

#[cfg(test)]
pub mod scripted {
    use std::collections::VecDeque;

    use super::Prompt;
    use crate::error::{Error, Result};

    /// Replays canned answers, then reports end of input
    #[derive(Default)]
    pub struct ScriptedPrompt {
        answers: VecDeque<String>,
        pub asked: Vec<String>,
    }

    impl ScriptedPrompt {
        pub fn new(answers: &[&str]) -> Self {
            Self {
                answers: answers.iter().map(|a| a.to_string()).collect(),
                asked: Vec::new(),
            }
        }

        pub fn remaining(&self) -> usize {
            self.answers.len()
        }
    }

    impl Prompt for ScriptedPrompt {
        fn prompt_line(&mut self, text: &str, _hint: Option<&str>) -> Result<String> {
            self.asked.push(text.to_string());
            self.answers.pop_front().ok_or(Error::EndOfInput)
        }
    }
}
