//! Text processing commands: head, tail, uniq, wc.

use enclave_types::error::EnclaveError;

use crate::errors::{Failure, OperandContext};
use crate::file_commands::{STDIN_UNSUPPORTED, read_operand};
use crate::flags::split_flags;
use crate::guard::resolve;
use crate::interpreter::{Command, CommandRegistry, CommandResult, Environment};

/// Register text processing commands.
pub fn register_text_commands(reg: &mut CommandRegistry, default_lines: usize) {
    reg.register(Box::new(HeadCmd { default_lines }));
    reg.register(Box::new(TailCmd { default_lines }));
    reg.register(Box::new(UniqCmd));
    reg.register(Box::new(WcCmd));
}

// ---------------------------------------------------------------------------
// head / tail
// ---------------------------------------------------------------------------

/// Parsed `head`/`tail` arguments.
#[derive(Debug, PartialEq, Eq)]
struct LineArgs<'a> {
    count: usize,
    operands: Vec<&'a str>,
}

/// Parse `-n N`, `-nN` and `-N`; other flags are ignored.
fn parse_line_args<'a>(args: &[&'a str], default: usize) -> Result<LineArgs<'a>, Failure> {
    let mut count = default;
    let mut operands = Vec::new();
    let mut only_operands = false;
    let mut iter = args.iter();
    while let Some(&arg) = iter.next() {
        if only_operands || arg == "-" || !arg.starts_with('-') {
            operands.push(arg);
            continue;
        }
        if arg == "--" {
            only_operands = true;
            continue;
        }
        let opt = &arg[1..];
        let value = if opt == "n" {
            match iter.next() {
                Some(&value) => value,
                None => return Err(Failure::usage("option requires an argument -- 'n'")),
            }
        } else if let Some(value) = opt.strip_prefix('n') {
            value
        } else if opt.bytes().all(|b| b.is_ascii_digit()) {
            opt
        } else {
            continue;
        };
        count = value
            .parse()
            .map_err(|_| Failure::usage(format!("invalid number of lines: '{value}'")))?;
    }
    Ok(LineArgs { count, operands })
}

fn first_lines(text: &str, n: usize) -> String {
    text.split_inclusive('\n').take(n).collect()
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    lines[lines.len().saturating_sub(n)..].concat()
}

/// Shared body of `head` and `tail`: one section per operand, with
/// `==> name <==` headers once there is more than one.
fn print_sections(
    name: &str,
    parsed: LineArgs<'_>,
    env: &Environment<'_>,
    select: fn(&str, usize) -> String,
) -> Result<CommandResult, Failure> {
    if parsed.operands.is_empty() {
        return match env.stdin {
            Some(input) => Ok(CommandResult::success(select(input, parsed.count))),
            None => Err(Failure::usage(STDIN_UNSUPPORTED)),
        };
    }

    let multiple = parsed.operands.len() > 1;
    let mut result = CommandResult::default();
    let mut printed_any = false;
    for operand in parsed.operands {
        let text = if operand == "-" {
            Err(Failure::at(operand, EnclaveError::Usage(STDIN_UNSUPPORTED.into())))
        } else {
            read_operand(env, operand)
        };
        match text {
            Ok(text) => {
                if multiple {
                    if printed_any {
                        result.stdout.push('\n');
                    }
                    result.stdout.push_str(&format!("==> {operand} <==\n"));
                }
                result.stdout.push_str(&select(&text, parsed.count));
                printed_any = true;
            },
            Err(failure) => result.push_failure(name, &failure),
        }
    }
    Ok(result)
}

struct HeadCmd {
    default_lines: usize,
}

impl Command for HeadCmd {
    fn name(&self) -> &str {
        "head"
    }
    fn description(&self) -> &str {
        "Show first lines of files"
    }
    fn usage(&self) -> &str {
        "head [-n N] <file...>"
    }
    fn run(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandResult, Failure> {
        let parsed = parse_line_args(args, self.default_lines)?;
        print_sections(self.name(), parsed, env, first_lines)
    }
}

struct TailCmd {
    default_lines: usize,
}

impl Command for TailCmd {
    fn name(&self) -> &str {
        "tail"
    }
    fn description(&self) -> &str {
        "Show last lines of files"
    }
    fn usage(&self) -> &str {
        "tail [-n N] <file...>"
    }
    fn run(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandResult, Failure> {
        let parsed = parse_line_args(args, self.default_lines)?;
        print_sections(self.name(), parsed, env, last_lines)
    }
}

// ---------------------------------------------------------------------------
// uniq
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
struct UniqOptions {
    count: bool,
    repeated: bool,
    unique: bool,
    ignore_case: bool,
}

impl UniqOptions {
    fn from_flags(flags: &[char]) -> Self {
        let mut opts = Self::default();
        for &flag in flags {
            match flag {
                'c' => opts.count = true,
                'd' => opts.repeated = true,
                'u' => opts.unique = true,
                'i' => opts.ignore_case = true,
                _ => {},
            }
        }
        opts
    }

    /// `-d` wins when both `-d` and `-u` are given.
    fn keeps(&self, occurrences: usize) -> bool {
        if self.repeated {
            occurrences > 1
        } else if self.unique {
            occurrences == 1
        } else {
            true
        }
    }
}

/// Group adjacent equal lines, keeping the first spelling of each run.
fn adjacent_runs(input: &str, ignore_case: bool) -> Vec<(usize, &str)> {
    let mut runs: Vec<(usize, &str)> = Vec::new();
    for line in input.lines() {
        match runs.last_mut() {
            Some((n, prev))
                if *prev == line || (ignore_case && prev.to_lowercase() == line.to_lowercase()) =>
            {
                *n += 1;
            },
            _ => runs.push((1, line)),
        }
    }
    runs
}

fn uniq(input: &str, opts: UniqOptions) -> String {
    let mut out = String::new();
    for (occurrences, line) in adjacent_runs(input, opts.ignore_case) {
        if !opts.keeps(occurrences) {
            continue;
        }
        if opts.count {
            out.push_str(&format!("{occurrences:>3} {line}\n"));
        } else {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

struct UniqCmd;
impl Command for UniqCmd {
    fn name(&self) -> &str {
        "uniq"
    }
    fn description(&self) -> &str {
        "Collapse adjacent duplicate lines"
    }
    fn usage(&self) -> &str {
        "uniq [-cdui] [input [output]]"
    }
    fn run(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandResult, Failure> {
        let parsed = split_flags(args);
        let opts = UniqOptions::from_flags(&parsed.flags);
        if let Some(extra) = parsed.operands.get(2) {
            return Err(Failure::usage(format!("extra operand '{extra}'")));
        }

        let input = match (env.stdin, parsed.operands.first()) {
            (Some(piped), _) => piped.to_string(),
            (None, None) | (None, Some(&"-")) => return Err(Failure::usage(STDIN_UNSUPPORTED)),
            (None, Some(&operand)) => read_operand(env, operand)?,
        };
        let output = uniq(&input, opts);

        match parsed.operands.get(1) {
            Some(&target) => {
                let path = resolve(target, env.cwd).at(target)?;
                env.vfs.write(&path, output.as_bytes()).at(target)?;
                Ok(CommandResult::default())
            },
            None => Ok(CommandResult::success(output)),
        }
    }
}

// ---------------------------------------------------------------------------
// wc
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Counts {
    lines: usize,
    words: usize,
    bytes: usize,
}

impl Counts {
    fn of(text: &str) -> Self {
        Self {
            lines: text.matches('\n').count(),
            words: text.split_whitespace().count(),
            bytes: text.len(),
        }
    }

    fn add(&mut self, other: Counts) {
        self.lines += other.lines;
        self.words += other.words;
        self.bytes += other.bytes;
    }
}

#[derive(Debug, Clone, Copy)]
struct WcOptions {
    lines: bool,
    words: bool,
    bytes: bool,
}

impl WcOptions {
    fn from_flags(flags: &[char]) -> Self {
        let mut opts = Self {
            lines: false,
            words: false,
            bytes: false,
        };
        for &flag in flags {
            match flag {
                'l' => opts.lines = true,
                'w' => opts.words = true,
                'c' => opts.bytes = true,
                _ => {},
            }
        }
        if !(opts.lines || opts.words || opts.bytes) {
            opts = Self {
                lines: true,
                words: true,
                bytes: true,
            };
        }
        opts
    }

    fn format(&self, counts: Counts, label: Option<&str>) -> String {
        let mut line = String::new();
        for (enabled, value) in [
            (self.lines, counts.lines),
            (self.words, counts.words),
            (self.bytes, counts.bytes),
        ] {
            if enabled {
                line.push_str(&format!("{value:>7}"));
            }
        }
        if let Some(label) = label {
            line.push(' ');
            line.push_str(label);
        }
        line.push('\n');
        line
    }
}

struct WcCmd;
impl Command for WcCmd {
    fn name(&self) -> &str {
        "wc"
    }
    fn description(&self) -> &str {
        "Count lines, words, and bytes"
    }
    fn usage(&self) -> &str {
        "wc [-lwc] [file...]"
    }
    fn run(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandResult, Failure> {
        let parsed = split_flags(args);
        let opts = WcOptions::from_flags(&parsed.flags);
        if parsed.operands.is_empty() {
            return match env.stdin {
                Some(input) => Ok(CommandResult::success(opts.format(Counts::of(input), None))),
                None => Err(Failure::usage(STDIN_UNSUPPORTED)),
            };
        }

        let mut result = CommandResult::default();
        let mut total = Counts::default();
        let multiple = parsed.operands.len() > 1;
        for operand in parsed.operands {
            match read_operand(env, operand) {
                Ok(text) => {
                    let counts = Counts::of(&text);
                    total.add(counts);
                    result.stdout.push_str(&opts.format(counts, Some(operand)));
                },
                Err(failure) => result.push_failure(self.name(), &failure),
            }
        }
        if multiple {
            result.stdout.push_str(&opts.format(total, Some("total")));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enclave_vfs::{MemoryVfs, Vfs};

    fn setup() -> (CommandRegistry, MemoryVfs) {
        let reg = CommandRegistry::builtin();
        let mut vfs = MemoryVfs::new();
        vfs.mkdir("/docs").unwrap();
        let numbered: String = (1..=15).map(|i| format!("line {i}\n")).collect();
        vfs.write("/docs/numbers.txt", numbered.as_bytes()).unwrap();
        vfs.write("/docs/short.txt", b"one\ntwo\n").unwrap();
        vfs.write("/docs/dups.txt", b"a\na\nb\na\n").unwrap();
        (reg, vfs)
    }

    fn exec(reg: &CommandRegistry, vfs: &mut MemoryVfs, line: &str) -> CommandResult {
        reg.dispatch(line, "/docs", vfs, None)
    }

    // -- head --

    #[test]
    fn head_defaults_to_ten_lines() {
        let (reg, mut vfs) = setup();
        let r = exec(&reg, &mut vfs, "head numbers.txt");
        assert_eq!(r.stdout.lines().count(), 10);
        assert!(r.stdout.ends_with("line 10\n"));
    }

    #[test]
    fn head_count_forms_agree() {
        let (reg, mut vfs) = setup();
        let spaced = exec(&reg, &mut vfs, "head -n 3 numbers.txt");
        let compact = exec(&reg, &mut vfs, "head -n3 numbers.txt");
        let bare = exec(&reg, &mut vfs, "head -3 numbers.txt");
        assert_eq!(spaced.stdout, "line 1\nline 2\nline 3\n");
        assert_eq!(spaced.stdout, compact.stdout);
        assert_eq!(spaced.stdout, bare.stdout);
    }

    #[test]
    fn head_count_after_operand() {
        let (reg, mut vfs) = setup();
        let r = exec(&reg, &mut vfs, "head numbers.txt -n 2");
        assert_eq!(r.stdout, "line 1\nline 2\n");
    }

    #[test]
    fn head_missing_count_value() {
        let (reg, mut vfs) = setup();
        let r = exec(&reg, &mut vfs, "head -n");
        assert_eq!(r.exit_code, 1);
        assert_eq!(r.stderr, "head: option requires an argument -- 'n'\n");
    }

    #[test]
    fn head_invalid_count() {
        let (reg, mut vfs) = setup();
        let r = exec(&reg, &mut vfs, "head -n abc numbers.txt");
        assert_eq!(r.stderr, "head: invalid number of lines: 'abc'\n");
    }

    #[test]
    fn head_multiple_files_get_headers() {
        let (reg, mut vfs) = setup();
        let r = exec(&reg, &mut vfs, "head -n 1 short.txt numbers.txt");
        assert_eq!(r.stdout, "==> short.txt <==\none\n\n==> numbers.txt <==\nline 1\n");
    }

    #[test]
    fn head_single_file_has_no_header() {
        let (reg, mut vfs) = setup();
        assert_eq!(exec(&reg, &mut vfs, "head short.txt").stdout, "one\ntwo\n");
    }

    #[test]
    fn head_directory_is_a_directory() {
        let (reg, mut vfs) = setup();
        let r = reg.dispatch("head docs", "/", &mut vfs, None);
        assert_eq!(r.exit_code, 1);
        assert_eq!(r.stderr, "head: docs: Is a directory\n");
    }

    #[test]
    fn head_dash_is_unsupported() {
        let (reg, mut vfs) = setup();
        let r = exec(&reg, &mut vfs, "head -");
        assert_eq!(r.exit_code, 1);
        assert!(r.stderr.contains("reading from stdin is not supported"));
    }

    #[test]
    fn head_absolute_rejected() {
        let (reg, mut vfs) = setup();
        let r = exec(&reg, &mut vfs, "head /etc/hosts");
        assert_eq!(r.exit_code, 1);
        assert!(r.stderr.contains("absolute paths are not supported"));
    }

    #[test]
    fn head_reports_failures_and_continues() {
        let (reg, mut vfs) = setup();
        let r = exec(&reg, &mut vfs, "head -n 1 ghost.txt short.txt");
        assert_eq!(r.exit_code, 1);
        assert_eq!(r.stdout, "==> short.txt <==\none\n");
        assert_eq!(r.stderr, "head: ghost.txt: No such file or directory\n");
    }

    #[test]
    fn head_reads_piped_input_without_operands() {
        let (reg, mut vfs) = setup();
        let r = reg.dispatch("head -n 1", "/", &mut vfs, Some("x\ny\n"));
        assert_eq!(r.stdout, "x\n");
    }

    #[test]
    fn head_uses_configured_default() {
        let mut reg = CommandRegistry::new();
        register_text_commands(&mut reg, 2);
        let (_, mut vfs) = setup();
        let r = exec(&reg, &mut vfs, "head numbers.txt");
        assert_eq!(r.stdout, "line 1\nline 2\n");
    }

    // -- tail --

    #[test]
    fn tail_takes_last_lines() {
        let (reg, mut vfs) = setup();
        let r = exec(&reg, &mut vfs, "tail -n 2 numbers.txt");
        assert_eq!(r.stdout, "line 14\nline 15\n");
        assert_eq!(exec(&reg, &mut vfs, "tail -n2 numbers.txt").stdout, r.stdout);
    }

    #[test]
    fn tail_count_larger_than_file() {
        let (reg, mut vfs) = setup();
        assert_eq!(exec(&reg, &mut vfs, "tail -n 50 short.txt").stdout, "one\ntwo\n");
    }

    #[test]
    fn tail_keeps_unterminated_last_line() {
        assert_eq!(last_lines("a\nb\nc", 2), "b\nc");
        assert_eq!(first_lines("a\nb\nc", 5), "a\nb\nc");
    }

    // -- uniq --

    #[test]
    fn uniq_collapses_only_adjacent() {
        let (reg, mut vfs) = setup();
        let r = exec(&reg, &mut vfs, "uniq dups.txt");
        assert_eq!(r.stdout, "a\nb\na\n");
        assert_eq!(r.exit_code, 0);
    }

    #[test]
    fn uniq_count_prefix() {
        let (reg, mut vfs) = setup();
        let r = exec(&reg, &mut vfs, "uniq -c dups.txt");
        let lines: Vec<&str> = r.stdout.lines().collect();
        assert_eq!(lines, vec!["  2 a", "  1 b", "  1 a"]);
    }

    #[test]
    fn uniq_repeated_and_unique() {
        let (reg, mut vfs) = setup();
        assert_eq!(exec(&reg, &mut vfs, "uniq -d dups.txt").stdout, "a\n");
        assert_eq!(exec(&reg, &mut vfs, "uniq -u dups.txt").stdout, "b\na\n");
    }

    #[test]
    fn uniq_repeated_wins_over_unique() {
        let (reg, mut vfs) = setup();
        assert_eq!(exec(&reg, &mut vfs, "uniq -d -u dups.txt").stdout, "a\n");
        assert_eq!(exec(&reg, &mut vfs, "uniq -ud dups.txt").stdout, "a\n");
    }

    #[test]
    fn uniq_ignore_case() {
        let (reg, mut vfs) = setup();
        let r = reg.dispatch("uniq -ic", "/", &mut vfs, Some("Hello\nhello\nworld\n"));
        assert_eq!(r.stdout, "  2 Hello\n  1 world\n");
    }

    #[test]
    fn uniq_prefers_piped_input() {
        let (reg, mut vfs) = setup();
        let r = reg.dispatch("uniq dups.txt", "/docs", &mut vfs, Some("x\nx\n"));
        assert_eq!(r.stdout, "x\n");
    }

    #[test]
    fn uniq_without_input_fails() {
        let (reg, mut vfs) = setup();
        let r = exec(&reg, &mut vfs, "uniq");
        assert_eq!(r.exit_code, 1);
        assert_eq!(r.stderr, "uniq: reading from stdin is not supported\n");
    }

    #[test]
    fn uniq_writes_output_operand() {
        let (reg, mut vfs) = setup();
        let r = exec(&reg, &mut vfs, "uniq dups.txt out.txt");
        assert_eq!(r.exit_code, 0);
        assert!(r.stdout.is_empty());
        assert_eq!(vfs.read("/docs/out.txt").unwrap(), b"a\nb\na\n");
    }

    #[test]
    fn uniq_extra_operand() {
        let (reg, mut vfs) = setup();
        let r = exec(&reg, &mut vfs, "uniq a b c");
        assert_eq!(r.stderr, "uniq: extra operand 'c'\n");
    }

    #[test]
    fn uniq_missing_file() {
        let (reg, mut vfs) = setup();
        let r = exec(&reg, &mut vfs, "uniq ghost.txt");
        assert_eq!(r.stderr, "uniq: ghost.txt: No such file or directory\n");
    }

    #[test]
    fn uniq_handles_missing_trailing_newline() {
        let opts = UniqOptions::default();
        assert_eq!(uniq("a\na", opts), "a\n");
        assert_eq!(uniq("", opts), "");
    }

    // -- wc --

    #[test]
    fn wc_all_counts() {
        let (reg, mut vfs) = setup();
        let r = exec(&reg, &mut vfs, "wc short.txt");
        assert_eq!(r.stdout, "      2      2      8 short.txt\n");
    }

    #[test]
    fn wc_selected_counts() {
        let (reg, mut vfs) = setup();
        assert_eq!(exec(&reg, &mut vfs, "wc -l short.txt").stdout, "      2 short.txt\n");
        assert_eq!(exec(&reg, &mut vfs, "wc -wc short.txt").stdout, "      2      8 short.txt\n");
    }

    #[test]
    fn wc_total_for_multiple_files() {
        let (reg, mut vfs) = setup();
        let r = exec(&reg, &mut vfs, "wc -l short.txt dups.txt");
        assert_eq!(r.stdout, "      2 short.txt\n      4 dups.txt\n      6 total\n");
    }

    #[test]
    fn wc_piped_input() {
        let (reg, mut vfs) = setup();
        let r = reg.dispatch("wc -w", "/", &mut vfs, Some("one two three\n"));
        assert_eq!(r.stdout, "      3\n");
    }

    #[test]
    fn wc_missing_file_keeps_going() {
        let (reg, mut vfs) = setup();
        let r = exec(&reg, &mut vfs, "wc -l ghost short.txt");
        assert_eq!(r.exit_code, 1);
        assert_eq!(r.stderr, "wc: ghost: No such file or directory\n");
        assert!(r.stdout.contains("short.txt"));
    }

    #[test]
    fn parse_line_args_forms() {
        let parsed = parse_line_args(&["-n", "4", "f"], 10).unwrap();
        assert_eq!(parsed, LineArgs { count: 4, operands: vec!["f"] });
        assert_eq!(parse_line_args(&["-n7"], 10).unwrap().count, 7);
        assert_eq!(parse_line_args(&["-q", "f"], 10).unwrap().count, 10);
        assert!(parse_line_args(&["-n", "-1"], 10).is_err());
    }
}
