use std::{
    fmt::Display,
    io::{BufRead, BufReader, Read},
    sync::{LazyLock, PoisonError, RwLock},
};

use nu_ansi_term::Color;
use npmeta_operations::{error::ErrorContext, NpmetaResult};

pub static COLOR: LazyLock<RwLock<bool>> = LazyLock::new(|| RwLock::new(true));

pub struct Colored<T: Display>(pub Color, pub T);

impl<T: Display> Display for Colored<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let color = COLOR.read().unwrap_or_else(PoisonError::into_inner);
        if *color {
            write!(f, "{}", self.0.prefix())?;
            self.1.fmt(f)?;
            write!(f, "{}", self.0.suffix())
        } else {
            self.1.fmt(f)
        }
    }
}

/// Replaces every `-` argument with the whitespace-separated words on stdin.
pub fn expand_stdin_args<R: Read>(mut args: Vec<String>, mut stdin: R) -> Vec<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == "-" {
            let mut buffer = String::new();
            if stdin.read_to_string(&mut buffer).is_ok() {
                let stdin_args = buffer.split_whitespace().collect::<Vec<&str>>();
                let count = stdin_args.len();
                args.remove(i);
                args.splice(i..i, stdin_args.into_iter().map(String::from));
                i += count;
            } else {
                i += 1;
            }
        } else {
            i += 1;
        }
    }
    args
}

/// Non-blank lines of `reader`, trimmed.
pub fn read_lines<R: Read>(reader: R) -> NpmetaResult<Vec<String>> {
    let mut lines = Vec::new();
    for line in BufReader::new(reader).lines() {
        let line = line.with_context(|| "reading request lines".to_string())?;
        let line = line.trim();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_expand_stdin_args() {
        let args = strings(&["npmeta", "ingest", "-", "last.tgz"]);
        let expanded = expand_stdin_args(args, "a.tgz\nb.tgz  c.tgz\n".as_bytes());
        assert_eq!(
            expanded,
            strings(&["npmeta", "ingest", "a.tgz", "b.tgz", "c.tgz", "last.tgz"])
        );
    }

    #[test]
    fn test_expand_stdin_args_without_dash() {
        let args = strings(&["npmeta", "show", "foo"]);
        assert_eq!(expand_stdin_args(args.clone(), "ignored".as_bytes()), args);
    }

    #[test]
    fn test_read_lines_skips_blank() {
        let lines = read_lines("{\"key\":\"a\"}\n\n  \n{\"key\":\"b\"}  \n".as_bytes()).unwrap();
        assert_eq!(lines, strings(&[r#"{"key":"a"}"#, r#"{"key":"b"}"#]));
    }

    #[test]
    fn test_colored_respects_switch() {
        *COLOR.write().unwrap() = false;
        assert_eq!(Colored(Color::Red, "x").to_string(), "x");
        *COLOR.write().unwrap() = true;
    }
}
