use std::io::{BufRead, Write};

use crossterm::style::Stylize;

use crate::error::GeneModelError;

pub const QUIT_TOKEN: &str = "q";

#[derive(Debug, Clone)]
pub struct Menu<T> {
    options: Vec<(String, T)>,
}

impl<T> Menu<T> {
    pub fn new(options: Vec<(String, T)>) -> Self {
        Self { options }
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|(label, _)| label.as_str())
    }

    pub fn resolve(&self, token: &str) -> Option<&T> {
        let token = token.trim();
        if let Ok(index) = token.parse::<usize>() {
            if let Some((_, value)) = index.checked_sub(1).and_then(|i| self.options.get(i)) {
                return Some(value);
            }
        }
        self.options
            .iter()
            .find(|(label, _)| label == token)
            .map(|(_, value)| value)
    }

    pub fn render<W: Write>(&self, title: &str, output: &mut W) -> Result<(), GeneModelError> {
        writeln!(output, "{}", title.bold()).map_err(prompt_error)?;
        writeln!(output).map_err(prompt_error)?;
        for (index, (label, _)) in self.options.iter().enumerate() {
            writeln!(output, "\t{:>2} {label}", index + 1).map_err(prompt_error)?;
        }
        writeln!(output).map_err(prompt_error)?;
        Ok(())
    }
}

pub fn is_quit(token: &str) -> bool {
    token.trim().eq_ignore_ascii_case(QUIT_TOKEN)
}

pub fn read_token<R: BufRead>(input: &mut R) -> Result<Option<String>, GeneModelError> {
    let mut line = String::new();
    let read = input.read_line(&mut line).map_err(prompt_error)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

pub fn ask<W: Write>(output: &mut W, message: &str) -> Result<(), GeneModelError> {
    write!(output, "{message}").map_err(prompt_error)?;
    output.flush().map_err(prompt_error)
}

pub fn choose<T: Clone, R: BufRead, W: Write>(
    menu: &Menu<T>,
    title: &str,
    question: &str,
    input: &mut R,
    output: &mut W,
) -> Result<T, GeneModelError> {
    if menu.is_empty() {
        return Err(GeneModelError::Prompt(format!("nothing to choose for: {title}")));
    }
    menu.render(title, output)?;
    ask(output, question)?;
    loop {
        let Some(token) = read_token(input)? else {
            return Err(GeneModelError::Prompt("input closed before a choice was made".to_string()));
        };
        if let Some(value) = menu.resolve(&token) {
            writeln!(output).map_err(prompt_error)?;
            return Ok(value.clone());
        }
        ask(output, "We couldn't find that one. Try again: ")?;
    }
}

pub(crate) fn prompt_error(err: std::io::Error) -> GeneModelError {
    GeneModelError::Prompt(err.to_string())
}
