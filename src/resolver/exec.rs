//! Desktop-entry `Exec` unescaping.
//!
//! Two passes: string-value escapes (`\s`, `\n`, `\t`, `\r`, `\\`),
//! then argument splitting with double/single quoting.

/// Malformed `Exec` value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecParseError {
    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),

    #[error("dangling backslash at end of command")]
    DanglingBackslash,
}

/// Parse an `Exec` command string into its argument list.
///
/// Field codes (`%f`, `%U`, ...) are kept as ordinary arguments. An
/// all-whitespace command yields an empty list.
pub fn parse_exec(exec: &str) -> Result<Vec<String>, ExecParseError> {
    split_arguments(&unescape_string(exec))
}

fn unescape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('s') => out.push(' '),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            // Not a string escape: leave it for the quoting pass.
            _ => {
                out.push('\\');
                continue;
            }
        }
        chars.next();
    }

    out
}

fn split_arguments(command: &str) -> Result<Vec<String>, ExecParseError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_ascii_whitespace() => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            '"' => {
                in_arg = true;
                loop {
                    match chars.next() {
                        None => return Err(ExecParseError::UnterminatedQuote('"')),
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(e @ ('"' | '`' | '$' | '\\')) => current.push(e),
                            Some(other) => {
                                current.push('\\');
                                current.push(other);
                            }
                            None => return Err(ExecParseError::DanglingBackslash),
                        },
                        Some(other) => current.push(other),
                    }
                }
            }
            '\'' => {
                in_arg = true;
                loop {
                    match chars.next() {
                        None => return Err(ExecParseError::UnterminatedQuote('\'')),
                        Some('\'') => break,
                        Some(other) => current.push(other),
                    }
                }
            }
            '\\' => {
                in_arg = true;
                match chars.next() {
                    Some(next) => current.push(next),
                    None => return Err(ExecParseError::DanglingBackslash),
                }
            }
            other => {
                in_arg = true;
                current.push(other);
            }
        }
    }

    if in_arg {
        args.push(current);
    }

    Ok(args)
}
