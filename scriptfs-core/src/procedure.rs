//! Procedures: the (Test, Program) pairs that drive classification.

use {
    regex::bytes::Regex,
    std::{ffi::CString, fmt, path::Path},
    thiserror::Error,
};

/// Maximum number of whitespace-delimited tokens read from either half of
/// a `-p` argument; extra tokens are silently dropped, matching the
/// original's fixed-size token table.
const MAX_TOKENS: usize = 254;

/// One token of an argument-vector template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgToken
{
    /// A literal argument, passed through unchanged.
    Literal(String),

    /// The `!` placeholder, substituted with the candidate's relative
    /// pathname at dispatch time.
    Placeholder,
}

/// A program invocation template: a path plus an argument-vector template
/// that may contain one [`ArgToken::Placeholder`], built fresh for every
/// candidate rather than mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation
{
    /// Path to the program, resolved relative to the mirror at launch time.
    pub program: String,

    /// Argument-vector template, not including argv[0].
    pub args: Vec<ArgToken>,

    /// Whether the candidate's bytes should be fed to the program's stdin.
    pub feed_stdin: bool,
}

impl Invocation
{
    /// Build the argument vector (including argv[0]) for `candidate`.
    pub fn build_argv(&self, candidate: &Path) -> Vec<CString>
    {
        let candidate_str = candidate.to_string_lossy().into_owned();

        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.clone());
        for token in &self.args {
            match token {
                ArgToken::Literal(s) => argv.push(s.clone()),
                ArgToken::Placeholder => argv.push(candidate_str.clone()),
            }
        }

        argv.into_iter()
            .map(|s| CString::new(s).unwrap_or_else(|_| CString::new("").unwrap()))
            .collect()
    }
}

/// A predicate that classifies a mirror-relative file as a script or not.
#[derive(Debug, Clone)]
pub enum Test
{
    /// Always matches. Useful for diagnostics and as a catch-all at the
    /// end of the registry.
    AlwaysTrue,

    /// Never matches.
    AlwaysFalse,

    /// The file begins with the two bytes `#!`.
    Shebang,

    /// The file has an execute bit accessible to the current user.
    Executable,

    /// Matches if either [`Test::Shebang`] or [`Test::Executable`] would.
    ShebangOrExecutable,

    /// The mirror-relative pathname, taken as a raw string with no
    /// canonicalization, matches a compiled regular expression.
    Regex(Regex),

    /// A user-supplied filter program; exit status 0 is a match.
    Program(Invocation),
}

impl fmt::Display for Test
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        match self {
            Test::AlwaysTrue => write!(f, "always-true"),
            Test::AlwaysFalse => write!(f, "always-false"),
            Test::Shebang => write!(f, "shebang"),
            Test::Executable => write!(f, "executable"),
            Test::ShebangOrExecutable => write!(f, "shebang-or-executable"),
            Test::Regex(re) => write!(f, "regex({})", re.as_str()),
            Test::Program(inv) => write!(f, "program({})", inv.program),
        }
    }
}

/// The mechanism that produces a classified file's output.
#[derive(Debug, Clone)]
pub enum Program
{
    /// Copy the source to a fresh temp file, preserving read+execute
    /// bits, and exec it directly with no arguments.
    InterpretShell,

    /// Run a user-supplied filter program over the candidate.
    ExternalFilter(Invocation),
}

/// A (Test, Program) pair: a classifier plus the mechanism that produces
/// output for files it matches.
#[derive(Debug, Clone)]
pub struct Procedure
{
    pub test: Test,
    pub program: Program,
}

/// Error parsing a `-p PROC` command-line argument.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError
{
    #[error("-p argument is empty")]
    Empty,

    #[error("program half of -p argument is empty")]
    EmptyProgram,

    #[error("unrecognized test keyword {0:?}")]
    UnknownTestKeyword(String),

    #[error("regex test is missing its pattern")]
    MissingRegexPattern,

    #[error("invalid regex pattern: {0}")]
    InvalidRegex(String),

    #[error("program test is missing its program path")]
    MissingProgramPath,
}

fn tokenize(s: &str) -> Vec<&str>
{
    s.split_ascii_whitespace().take(MAX_TOKENS).collect()
}

/// Parse a whitespace-tokenized half of a `-p` argument into an
/// [`Invocation`] template.
///
/// A leading `<` token marks filter mode (the candidate's bytes are fed on
/// stdin); the first non-`<` token is the program path; any later bare `!`
/// token becomes a [`ArgToken::Placeholder`].
fn parse_invocation(half: &str) -> Result<Invocation, ParseError>
{
    let mut tokens = tokenize(half).into_iter();

    let mut first = tokens.next().ok_or(ParseError::MissingProgramPath)?;
    let feed_stdin = first == "<";
    if feed_stdin {
        first = tokens.next().ok_or(ParseError::MissingProgramPath)?;
    }

    let program = first.to_owned();
    let args = tokens
        .map(|tok| if tok == "!" {
            ArgToken::Placeholder
        } else {
            ArgToken::Literal(tok.to_owned())
        })
        .collect();

    Ok(Invocation { program, args, feed_stdin })
}

fn parse_test(half: &str) -> Result<Test, ParseError>
{
    let half = half.trim();
    if half.is_empty() {
        return Ok(Test::ShebangOrExecutable);
    }

    let (keyword, rest) = half.split_once(char::is_whitespace).unwrap_or((half, ""));

    match keyword {
        "T" => Ok(Test::AlwaysTrue),
        "F" => Ok(Test::AlwaysFalse),
        "s" => Ok(Test::Shebang),
        "x" => Ok(Test::Executable),
        "b" => Ok(Test::ShebangOrExecutable),
        "r" => {
            let pattern = rest.trim();
            if pattern.is_empty() {
                return Err(ParseError::MissingRegexPattern);
            }
            Regex::new(pattern)
                .map(Test::Regex)
                .map_err(|e| ParseError::InvalidRegex(e.to_string()))
        }
        "p" => parse_invocation(rest).map(Test::Program),
        other => Err(ParseError::UnknownTestKeyword(other.to_owned())),
    }
}

/// Parse a full `-p PROC` argument of the form `program[;test]`.
pub fn parse_proc_arg(arg: &str) -> Result<Procedure, ParseError>
{
    if arg.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let (program_half, test_half) = match arg.split_once(';') {
        Some((p, t)) => (p, t),
        None => (arg, ""),
    };

    if program_half.trim().is_empty() {
        return Err(ParseError::EmptyProgram);
    }

    let invocation = parse_invocation(program_half)?;
    let test = parse_test(test_half)?;

    Ok(Procedure { test, program: Program::ExternalFilter(invocation) })
}

/// The ordered, append-only list of procedures consulted by the Test
/// Evaluator. Built once at startup and never mutated afterward.
#[derive(Debug, Default)]
pub struct Registry
{
    procedures: Vec<Procedure>,
}

impl Registry
{
    /// Create an empty registry.
    pub fn new() -> Self
    {
        Self { procedures: Vec::new() }
    }

    /// Append a procedure, preserving command-line order.
    pub fn push(&mut self, procedure: Procedure)
    {
        self.procedures.push(procedure);
    }

    /// Whether no procedures have been added yet.
    pub fn is_empty(&self) -> bool
    {
        self.procedures.is_empty()
    }

    /// If the registry is empty, install the default procedure: test
    /// shebang-or-executable, program interpret-shell.
    pub fn install_default_if_empty(&mut self)
    {
        if self.is_empty() {
            self.procedures.push(Procedure {
                test: Test::ShebangOrExecutable,
                program: Program::InterpretShell,
            });
        }
    }

    /// Iterate the procedures in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Procedure>
    {
        self.procedures.iter()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn default_test_is_shebang_or_executable()
    {
        assert!(matches!(parse_test("").unwrap(), Test::ShebangOrExecutable));
    }

    #[test]
    fn parses_always_true_and_false()
    {
        assert!(matches!(parse_test("T").unwrap(), Test::AlwaysTrue));
        assert!(matches!(parse_test("F").unwrap(), Test::AlwaysFalse));
    }

    #[test]
    fn parses_regex_test()
    {
        let test = parse_test("r ^data.*\\.json$").unwrap();
        match test {
            Test::Regex(re) => assert!(re.is_match(b"data.json")),
            _ => panic!("expected regex test"),
        }
    }

    #[test]
    fn rejects_unknown_keyword()
    {
        assert_eq!(parse_test("zzz"), Err(ParseError::UnknownTestKeyword("zzz".to_owned())));
    }

    #[test]
    fn parses_filter_procedure_with_stdin()
    {
        let proc = parse_proc_arg("/usr/bin/jq . ! ; p < /usr/bin/jq").unwrap();
        match proc.program {
            Program::ExternalFilter(inv) => {
                assert_eq!(inv.program, "/usr/bin/jq");
                assert_eq!(inv.args, vec![
                    ArgToken::Literal(".".to_owned()),
                    ArgToken::Placeholder,
                ]);
                assert!(!inv.feed_stdin);
            }
            Program::InterpretShell => panic!("expected external filter"),
        }
        match proc.test {
            Test::Program(inv) => {
                assert!(inv.feed_stdin);
                assert_eq!(inv.program, "/usr/bin/jq");
            }
            _ => panic!("expected program test"),
        }
    }

    #[test]
    fn build_argv_substitutes_placeholder()
    {
        let inv = Invocation {
            program: "/bin/cat".to_owned(),
            args: vec![ArgToken::Placeholder],
            feed_stdin: false,
        };
        let argv = inv.build_argv(Path::new("a/b.txt"));
        assert_eq!(argv[0].to_str().unwrap(), "/bin/cat");
        assert_eq!(argv[1].to_str().unwrap(), "a/b.txt");
    }

    #[test]
    fn install_default_only_when_empty()
    {
        let mut registry = Registry::new();
        registry.install_default_if_empty();
        assert_eq!(registry.iter().count(), 1);

        registry.install_default_if_empty();
        assert_eq!(registry.iter().count(), 1);
    }
}
