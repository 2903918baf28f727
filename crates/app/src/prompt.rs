use std::fmt::Display;
use std::io::{self, BufRead, Write};

/// Line-oriented terminal dialogue over any reader/writer pair.
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, line: impl Display) -> io::Result<()> {
        writeln!(self.output, "{line}")
    }

    /// Ask a question; `None` at end of input.
    pub fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.output, "{question}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_owned()))
    }

    /// Yes/no question; anything but `y`/`yes`/`s`/`si` is no.
    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        Ok(self
            .ask(&format!("{question} (y/N): "))?
            .is_some_and(|a| matches!(a.to_ascii_lowercase().as_str(), "y" | "yes" | "s" | "si")))
    }

    /// Menu choice; `None` on end of input or an exit answer.
    pub fn choose(&mut self, question: &str) -> io::Result<Option<String>> {
        Ok(self.ask(question)?.filter(|a| !is_exit(a)))
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

/// `0` and `q` leave a menu.
#[must_use]
pub fn is_exit(answer: &str) -> bool {
    matches!(answer.trim(), "0" | "q" | "Q")
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn ask_trims_and_reports_eof() {
        let mut prompt = Prompt::new(Cursor::new("  hello \n"), Vec::new());
        assert_eq!(prompt.ask("> ").unwrap().as_deref(), Some("hello"));
        assert_eq!(prompt.ask("> ").unwrap(), None);
        assert_eq!(String::from_utf8(prompt.into_output()).unwrap(), "> > ");
    }

    #[test]
    fn choose_treats_zero_and_q_as_exit() {
        let mut prompt = Prompt::new(Cursor::new("q\n0\n2\n"), Vec::new());
        assert_eq!(prompt.choose("").unwrap(), None);
        assert_eq!(prompt.choose("").unwrap(), None);
        assert_eq!(prompt.choose("").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn confirm_accepts_yes_variants() {
        let mut prompt = Prompt::new(Cursor::new("Y\nsi\nnope\n"), Vec::new());
        assert!(prompt.confirm("Again?").unwrap());
        assert!(prompt.confirm("Again?").unwrap());
        assert!(!prompt.confirm("Again?").unwrap());
        assert!(!prompt.confirm("Again?").unwrap());
    }
}
