//! Flag-cluster splitting shared by the commands.
//!
//! Each command turns the flag characters into its own options struct with
//! an explicit per-character `match`; unknown characters are ignored.

/// Argv split into flag characters and operands.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedArgs<'a> {
    /// Every flag character, in order of appearance (`-la` yields `l`, `a`).
    pub flags: Vec<char>,
    pub operands: Vec<&'a str>,
}

impl ParsedArgs<'_> {
    pub fn has(&self, flag: char) -> bool {
        self.flags.contains(&flag)
    }
}

/// Split `args` into flags and operands.
///
/// Any token starting with `-` and longer than one character is a flag
/// cluster, wherever it appears. A lone `-` is an operand, and `--` ends
/// flag parsing.
pub fn split_flags<'a>(args: &[&'a str]) -> ParsedArgs<'a> {
    let mut parsed = ParsedArgs::default();
    let mut only_operands = false;
    for &arg in args {
        if only_operands {
            parsed.operands.push(arg);
        } else if arg == "--" {
            only_operands = true;
        } else if let Some(cluster) = arg.strip_prefix('-')
            && !cluster.is_empty()
        {
            parsed.flags.extend(cluster.chars());
        } else {
            parsed.operands.push(arg);
        }
    }
    parsed
}
