//! Stage descriptor parser.
//!
//! Turns one descriptor such as `sort -rn` or `sed 's/a/b/g'` into a stage.
//! Parsing is all-or-nothing: a descriptor either yields a ready stage or a
//! [`ParseError`] naming the stage that rejected it. Regular expressions are
//! compiled here once so a bad pattern never reaches a running pipeline.

use thiserror::Error;

use crate::lexer::tokenize;
use crate::stages::{
    Contains, Cut, Grep, Head, Nl, Replace, Rev, Sed, Skip, Sort, Stage, StageError, Tac, Tail,
    Tee, Tr, Uniq, Wc,
};

/// Why a descriptor could not be turned into a stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty stage descriptor")]
    Empty,

    #[error("unknown stage {0:?}")]
    UnknownStage(String),

    #[error("{stage}: missing {what}")]
    MissingArgument {
        stage: &'static str,
        what: &'static str,
    },

    #[error("{stage}: invalid number {value:?}")]
    InvalidNumber { stage: &'static str, value: String },

    #[error("{stage}: invalid field {value:?}")]
    InvalidField { stage: &'static str, value: String },

    #[error("{stage}: invalid expression {expr:?}")]
    InvalidExpression { stage: &'static str, expr: String },

    #[error("{stage}: invalid pattern {pattern:?}: {message}")]
    InvalidPattern {
        stage: &'static str,
        pattern: String,
        message: String,
    },
}

impl ParseError {
    /// The stage that rejected the descriptor, when one was recognized.
    pub fn stage(&self) -> Option<&str> {
        match self {
            ParseError::Empty => None,
            ParseError::UnknownStage(name) => Some(name.as_str()),
            ParseError::MissingArgument { stage, .. }
            | ParseError::InvalidNumber { stage, .. }
            | ParseError::InvalidField { stage, .. }
            | ParseError::InvalidExpression { stage, .. }
            | ParseError::InvalidPattern { stage, .. } => Some(*stage),
        }
    }
}

impl From<StageError> for ParseError {
    fn from(err: StageError) -> Self {
        match err {
            StageError::InvalidPattern {
                stage,
                pattern,
                source,
            } => ParseError::InvalidPattern {
                stage,
                pattern,
                message: source.to_string(),
            },
            other => ParseError::InvalidExpression {
                stage: "pipeline",
                expr: other.to_string(),
            },
        }
    }
}

/// Grammar entry for one stage, used for help output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageUsage {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub synopsis: &'static str,
    pub summary: &'static str,
}

/// Every stage the parser knows, in help order.
pub const STAGES: &[StageUsage] = &[
    StageUsage {
        name: "grep",
        aliases: &["grep-v"],
        synopsis: "grep [-i] [-v] PATTERN",
        summary: "keep lines matching a regex (-v: drop them)",
    },
    StageUsage {
        name: "contains",
        aliases: &[],
        synopsis: "contains [-i] SUBSTR",
        summary: "keep lines containing a literal substring",
    },
    StageUsage {
        name: "replace",
        aliases: &[],
        synopsis: "replace OLD NEW",
        summary: "replace every literal OLD with NEW",
    },
    StageUsage {
        name: "head",
        aliases: &["take"],
        synopsis: "head [N | -n N]",
        summary: "first N lines (default 10)",
    },
    StageUsage {
        name: "tail",
        aliases: &[],
        synopsis: "tail [N | -n N]",
        summary: "last N lines (default 10)",
    },
    StageUsage {
        name: "skip",
        aliases: &[],
        synopsis: "skip [N]",
        summary: "drop the first N lines",
    },
    StageUsage {
        name: "sort",
        aliases: &[],
        synopsis: "sort [-r] [-n]",
        summary: "sort lines, optionally reversed or numeric",
    },
    StageUsage {
        name: "uniq",
        aliases: &[],
        synopsis: "uniq [-i]",
        summary: "collapse adjacent duplicate lines",
    },
    StageUsage {
        name: "cut",
        aliases: &[],
        synopsis: "cut [-d DELIM] -f LIST",
        summary: "select 1-based fields (default delimiter: tab)",
    },
    StageUsage {
        name: "tr",
        aliases: &[],
        synopsis: "tr FROM TO",
        summary: "translate characters",
    },
    StageUsage {
        name: "sed",
        aliases: &[],
        synopsis: "sed s/PATTERN/REPLACEMENT/[gi]",
        summary: "regex substitution",
    },
    StageUsage {
        name: "rev",
        aliases: &[],
        synopsis: "rev",
        summary: "reverse the characters of each line",
    },
    StageUsage {
        name: "tac",
        aliases: &[],
        synopsis: "tac",
        summary: "reverse the order of lines",
    },
    StageUsage {
        name: "nl",
        aliases: &[],
        synopsis: "nl [-s START]",
        summary: "number lines",
    },
    StageUsage {
        name: "tee",
        aliases: &[],
        synopsis: "tee [PATH]",
        summary: "copy lines to a file and pass them on",
    },
    StageUsage {
        name: "wc",
        aliases: &[],
        synopsis: "wc [-l] [-w] [-c]",
        summary: "count lines, words and characters",
    },
];

/// Names accepted as the first token of a descriptor, aliases included.
pub fn stage_names() -> impl Iterator<Item = &'static str> {
    STAGES
        .iter()
        .flat_map(|usage| std::iter::once(usage.name).chain(usage.aliases.iter().copied()))
}

/// Human-readable grammar, one stage per line.
pub fn stage_help() -> String {
    let width = STAGES.iter().map(|u| u.synopsis.len()).max().unwrap_or(0);
    STAGES
        .iter()
        .map(|u| format!("  {:<width$}  {}\n", u.synopsis, u.summary))
        .collect()
}

/// Parse one descriptor into a stage.
pub fn parse(descriptor: &str) -> Result<Box<dyn Stage>, ParseError> {
    let tokens = tokenize(descriptor);
    let Some((command, args)) = tokens.split_first() else {
        return Err(ParseError::Empty);
    };
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let stage: Box<dyn Stage> = match command.as_str() {
        "grep" => Box::new(parse_grep(&args, false)?),
        "grep-v" => Box::new(parse_grep(&args, true)?),
        "contains" => Box::new(parse_contains(&args)?),
        "replace" => Box::new(parse_replace(&args)?),
        "head" | "take" => Box::new(Head::new(parse_count("head", &args)?)),
        "tail" => Box::new(Tail::new(parse_count("tail", &args)?)),
        "skip" => Box::new(parse_skip(&args)?),
        "sort" => Box::new(parse_sort(&args)),
        "uniq" => Box::new(parse_uniq(&args)),
        "cut" => Box::new(parse_cut(&args)?),
        "tr" => Box::new(parse_tr(&args)?),
        "sed" => Box::new(parse_sed(&args)?),
        "rev" => Box::new(Rev),
        "tac" => Box::new(Tac),
        "nl" => Box::new(parse_nl(&args)?),
        "tee" => Box::new(parse_tee(&args)),
        "wc" => Box::new(parse_wc(&args)),
        other => return Err(ParseError::UnknownStage(other.to_string())),
    };

    tracing::trace!(stage = stage.name(), ?args, "parsed stage");
    Ok(stage)
}

/// Parse every descriptor, stopping at the first failure.
pub fn parse_all<S: AsRef<str>>(descriptors: &[S]) -> Result<Vec<Box<dyn Stage>>, ParseError> {
    descriptors.iter().map(|d| parse(d.as_ref())).collect()
}

fn ignored(stage: &'static str, arg: &str) {
    tracing::debug!(stage, arg, "ignoring unrecognized argument");
}

fn parse_int(stage: &'static str, value: &str) -> Result<i64, ParseError> {
    value.trim().parse().map_err(|_| ParseError::InvalidNumber {
        stage,
        value: value.to_string(),
    })
}

/// Negative counts behave like zero, which the stages read as the default.
fn to_count(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}

pub(crate) fn parse_grep(args: &[&str], invert: bool) -> Result<Grep, ParseError> {
    let mut grep = Grep {
        invert,
        ..Grep::default()
    };
    for arg in args {
        match *arg {
            "-i" => grep.ignore_case = true,
            "-v" => grep.invert = true,
            pattern => grep.pattern = pattern.to_string(),
        }
    }
    if grep.pattern.is_empty() {
        return Err(ParseError::MissingArgument {
            stage: "grep",
            what: "pattern",
        });
    }
    grep.compile()?;
    Ok(grep)
}

pub(crate) fn parse_contains(args: &[&str]) -> Result<Contains, ParseError> {
    let mut contains = Contains::default();
    for arg in args {
        match *arg {
            "-i" => contains.ignore_case = true,
            substr => contains.substr = substr.to_string(),
        }
    }
    if contains.substr.is_empty() {
        return Err(ParseError::MissingArgument {
            stage: "contains",
            what: "substring",
        });
    }
    Ok(contains)
}

pub(crate) fn parse_replace(args: &[&str]) -> Result<Replace, ParseError> {
    match args {
        [old, new, ..] => Ok(Replace::new(*old, *new)),
        _ => Err(ParseError::MissingArgument {
            stage: "replace",
            what: "OLD NEW arguments",
        }),
    }
}

/// Count for head and tail: `N`, `-n N` or `-nN`. Other arguments are ignored.
pub(crate) fn parse_count(stage: &'static str, args: &[&str]) -> Result<usize, ParseError> {
    let mut count = crate::stages::builtin::DEFAULT_COUNT as i64;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if *arg == "-n" {
            let value = iter.next().ok_or(ParseError::MissingArgument {
                stage,
                what: "count after -n",
            })?;
            count = parse_int(stage, value)?;
        } else if let Some(value) = arg.strip_prefix("-n") {
            count = parse_int(stage, value)?;
        } else if let Ok(n) = arg.parse::<i64>() {
            count = n;
        } else {
            ignored(stage, arg);
        }
    }
    Ok(to_count(count))
}

pub(crate) fn parse_skip(args: &[&str]) -> Result<Skip, ParseError> {
    match args.first() {
        Some(value) => Ok(Skip::new(to_count(parse_int("skip", value)?))),
        None => Ok(Skip::default()),
    }
}

pub(crate) fn parse_sort(args: &[&str]) -> Sort {
    let mut sort = Sort::new();
    for arg in args {
        match *arg {
            "-r" | "--reverse" => sort.reverse = true,
            "-n" | "--numeric" => sort.numeric = true,
            "-rn" | "-nr" => {
                sort.reverse = true;
                sort.numeric = true;
            }
            other => ignored("sort", other),
        }
    }
    sort
}

pub(crate) fn parse_uniq(args: &[&str]) -> Uniq {
    let mut uniq = Uniq::new();
    for arg in args {
        match *arg {
            "-i" => uniq.ignore_case = true,
            other => ignored("uniq", other),
        }
    }
    uniq
}

pub(crate) fn parse_cut(args: &[&str]) -> Result<Cut, ParseError> {
    let mut cut = Cut::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match *arg {
            "-d" => {
                if let Some(delim) = iter.next() {
                    cut.delimiter = delim.to_string();
                }
            }
            "-f" => {
                if let Some(list) = iter.next() {
                    cut.fields = parse_field_list(list)?;
                }
            }
            other => {
                if let Some(delim) = other.strip_prefix("-d") {
                    cut.delimiter = delim.to_string();
                } else if let Some(list) = other.strip_prefix("-f") {
                    cut.fields = parse_field_list(list)?;
                } else {
                    ignored("cut", other);
                }
            }
        }
    }
    if cut.fields.is_empty() {
        return Err(ParseError::MissingArgument {
            stage: "cut",
            what: "field list (-f)",
        });
    }
    Ok(cut)
}

/// Comma-separated 1-based field numbers; empty entries are skipped.
pub(crate) fn parse_field_list(list: &str) -> Result<Vec<usize>, ParseError> {
    list.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse().map_err(|_| ParseError::InvalidField {
                stage: "cut",
                value: part.to_string(),
            })
        })
        .collect()
}

pub(crate) fn parse_tr(args: &[&str]) -> Result<Tr, ParseError> {
    match args {
        [from, to, ..] => Ok(Tr::new(*from, *to)),
        _ => Err(ParseError::MissingArgument {
            stage: "tr",
            what: "FROM TO arguments",
        }),
    }
}

/// `s<d>PATTERN<d>REPLACEMENT<d>[flags]` with any delimiter, or the two-argument
/// form `PATTERN REPLACEMENT`, which always replaces globally.
pub(crate) fn parse_sed(args: &[&str]) -> Result<Sed, ParseError> {
    let Some(expr) = args.first() else {
        return Err(ParseError::MissingArgument {
            stage: "sed",
            what: "expression",
        });
    };

    let sed = match split_substitution(expr) {
        Some((pattern, replacement, flags)) => {
            let mut sed = Sed::new(pattern, replacement);
            sed.global = flags.contains('g');
            sed.ignore_case = flags.contains('i');
            sed
        }
        None => match args.get(1) {
            Some(replacement) => Sed::new(*expr, *replacement).global(),
            None => {
                return Err(ParseError::InvalidExpression {
                    stage: "sed",
                    expr: expr.to_string(),
                })
            }
        },
    };

    sed.compile()?;
    Ok(sed)
}

/// Split `s/a/b/flags`. A backslash before the delimiter makes it literal,
/// regex-escaped in the pattern; other escapes are kept for the regex engine.
fn split_substitution(expr: &str) -> Option<(String, String, String)> {
    let mut chars = expr.strip_prefix('s')?.chars();
    let delim = chars.next()?;

    let mut parts = vec![String::new()];
    let mut escaped = false;
    for c in chars {
        let in_pattern = parts.len() == 1;
        let current = parts.last_mut()?;
        if escaped {
            if c != delim {
                current.push('\\');
                current.push(c);
            } else if in_pattern {
                current.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
            } else {
                current.push(c);
            }
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == delim {
            parts.push(String::new());
        } else {
            current.push(c);
        }
    }
    if escaped {
        parts.last_mut()?.push('\\');
    }

    let mut parts = parts.into_iter();
    let pattern = parts.next()?;
    let replacement = parts.next()?;
    let flags = parts.next().unwrap_or_default();
    Some((pattern, replacement, flags))
}

pub(crate) fn parse_nl(args: &[&str]) -> Result<Nl, ParseError> {
    let mut nl = Nl::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if *arg == "-s" {
            if let Some(value) = iter.next() {
                nl.start = parse_int("nl", value)?;
            }
        } else if let Some(value) = arg.strip_prefix("-s") {
            nl.start = parse_int("nl", value)?;
        } else {
            ignored("nl", arg);
        }
    }
    Ok(nl)
}

pub(crate) fn parse_tee(args: &[&str]) -> Tee {
    match args.first() {
        Some(path) => Tee::new(*path),
        None => Tee::passthrough(),
    }
}

/// `-l`, `-w`, `-c`/`-m`, also fused as in `-lw`.
pub(crate) fn parse_wc(args: &[&str]) -> Wc {
    let mut wc = Wc::new();
    for arg in args {
        let Some(flags) = arg.strip_prefix('-') else {
            ignored("wc", arg);
            continue;
        };
        for flag in flags.chars() {
            match flag {
                'l' => wc.lines = true,
                'w' => wc.words = true,
                'c' | 'm' => wc.chars = true,
                _ => ignored("wc", arg),
            }
        }
    }
    wc
}
