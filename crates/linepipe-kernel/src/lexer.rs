//! Tokenizer for stage descriptors and splitter for command lists.
//!
//! A descriptor such as `grep -i "connection refused"` becomes
//! `["grep", "-i", "connection refused"]`:
//!
//! - spaces and tabs separate tokens
//! - `'` and `"` quote; the quote characters are removed
//! - a backslash takes the next character literally, inside quotes too
//!
//! [`split_commands`] turns CLI arguments into descriptors, one per stage.

/// Separator used between stages when none is configured.
pub const DEFAULT_SEPARATOR: &str = "|";

/// Split one descriptor into tokens.
///
/// `''` and `""` produce an empty token, so `replace foo ''` deletes `foo`.
/// An unterminated quote runs to the end of the input.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // A token exists once a quote opened, even if nothing landed in `current`.
    let mut started = false;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in input.chars() {
        if escaped {
            current.push(c);
            started = true;
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
            started = true;
            continue;
        }
        if let Some(q) = quote {
            if c == q {
                quote = None;
            } else {
                current.push(c);
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                started = true;
            }
            ' ' | '\t' => {
                if started {
                    tokens.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            _ => {
                current.push(c);
                started = true;
            }
        }
    }

    if started {
        tokens.push(current);
    }
    tokens
}

/// Turn CLI arguments into stage descriptors.
///
/// Forms are tried in order:
///
/// 1. brace syntax, `{grep foo}, {sort}`
/// 2. one argument containing the separator, `"grep foo | sort"`
/// 3. the separator as its own argument, `grep foo '|' sort`
/// 4. several arguments, some with spaces: each is one descriptor
/// 5. everything joined with spaces, then split on the separator
///
/// Separators inside quotes do not split. Empty descriptors are dropped.
pub fn split_commands<S: AsRef<str>>(args: &[S], separator: &str) -> Vec<String> {
    let separator = if separator.is_empty() {
        DEFAULT_SEPARATOR
    } else {
        separator
    };
    let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
    let joined = args.join(" ");

    if joined.trim_start().starts_with('{') {
        return split_braces(&joined);
    }

    if let [single] = args.as_slice() {
        return split_on(single, separator);
    }

    if args.contains(&separator) {
        return args
            .split(|arg| *arg == separator)
            .map(|group| group.join(" ").trim().to_string())
            .filter(|cmd| !cmd.is_empty())
            .collect();
    }

    if args.len() > 1 && args.iter().any(|arg| arg.contains(' ')) {
        return args
            .iter()
            .map(|arg| arg.trim().to_string())
            .filter(|cmd| !cmd.is_empty())
            .collect();
    }

    split_on(&joined, separator)
}

/// Split on `separator` outside quotes, trimming and dropping empty parts.
fn split_on(input: &str, separator: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut chars = input.char_indices();

    while let Some((i, c)) = chars.next() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, _) if input[i..].starts_with(separator) => {
                parts.push(&input[start..i]);
                start = i + separator.len();
                // Skip the rest of a multi-character separator.
                for _ in 1..separator.chars().count() {
                    chars.next();
                }
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Collect the contents of each top-level `{...}` group. Text between groups
/// (commas, spaces) is ignored; an unclosed group runs to the end.
fn split_braces(input: &str) -> Vec<String> {
    let mut commands = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for c in input.chars() {
        match c {
            '{' => {
                depth += 1;
                if depth == 1 {
                    continue;
                }
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    push_trimmed(&mut commands, &current);
                    current.clear();
                    continue;
                }
            }
            _ => {}
        }
        if depth > 0 {
            current.push(c);
        }
    }
    push_trimmed(&mut commands, &current);

    commands
}

fn push_trimmed(commands: &mut Vec<String>, cmd: &str) {
    let cmd = cmd.trim();
    if !cmd.is_empty() {
        commands.push(cmd.to_string());
    }
}
