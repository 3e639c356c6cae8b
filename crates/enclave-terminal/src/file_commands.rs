//! File commands: ls, cat, cp, mv, rm, mkdir, touch.

use enclave_types::error::{EnclaveError, Result};
use enclave_vfs::path::{basename, is_within, join};
use enclave_vfs::{EntryKind, Vfs, VfsEntry, walk};

use crate::errors::{Failure, OperandContext};
use crate::flags::split_flags;
use crate::guard::resolve;
use crate::interpreter::{Command, CommandRegistry, CommandResult, Environment};

/// Register file commands.
pub fn register_file_commands(reg: &mut CommandRegistry) {
    reg.register(Box::new(LsCmd));
    reg.register(Box::new(CatCmd));
    reg.register(Box::new(CpCmd));
    reg.register(Box::new(MvCmd));
    reg.register(Box::new(RmCmd));
    reg.register(Box::new(MkdirCmd));
    reg.register(Box::new(TouchCmd));
}

/// Message for operands that would need a real stdin.
pub(crate) const STDIN_UNSUPPORTED: &str = "reading from stdin is not supported";

/// Resolve an operand and read it as text.
pub(crate) fn read_operand(env: &Environment<'_>, operand: &str) -> std::result::Result<String, Failure> {
    let path = resolve(operand, env.cwd).at(operand)?;
    env.vfs.read_to_string(&path).at(operand)
}

// ---------------------------------------------------------------------------
// ls
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
struct LsOptions {
    long: bool,
    all: bool,
}

impl LsOptions {
    fn from_flags(flags: &[char]) -> Self {
        let mut opts = Self::default();
        for &flag in flags {
            match flag {
                'l' => opts.long = true,
                'a' | 'A' => opts.all = true,
                _ => {},
            }
        }
        opts
    }
}

struct LsCmd;
impl Command for LsCmd {
    fn name(&self) -> &str {
        "ls"
    }
    fn description(&self) -> &str {
        "List directory contents"
    }
    fn usage(&self) -> &str {
        "ls [-la] [path...]"
    }
    fn run(&self, args: &[&str], env: &mut Environment<'_>) -> std::result::Result<CommandResult, Failure> {
        let parsed = split_flags(args);
        let opts = LsOptions::from_flags(&parsed.flags);
        let targets = if parsed.operands.is_empty() {
            vec!["."]
        } else {
            parsed.operands
        };
        let multiple = targets.len() > 1;

        let mut blocks = Vec::with_capacity(targets.len());
        for target in targets {
            let path = resolve(target, env.cwd).at(target)?;
            let meta = env.vfs.stat(&path).at(target)?;
            let entries = if meta.is_dir() {
                let mut entries = env.vfs.readdir(&path).at(target)?;
                entries.retain(|e| opts.all || !e.name.starts_with('.'));
                sort_entries(&mut entries, opts.long);
                entries
            } else {
                vec![VfsEntry {
                    name: target.to_string(),
                    kind: meta.kind,
                    size: meta.size,
                    mtime_ms: meta.mtime_ms,
                }]
            };
            let body = if opts.long {
                format_long(&entries)
            } else {
                format_short(&entries)
            };
            if multiple {
                blocks.push(format!("{target}:\n{body}"));
            } else {
                blocks.push(body);
            }
        }
        Ok(CommandResult::success(blocks.join("\n")))
    }
}

/// Long listings sort purely by name; short listings put directories first.
fn sort_entries(entries: &mut [VfsEntry], long: bool) {
    if long {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
    } else {
        entries.sort_by(|a, b| b.is_dir().cmp(&a.is_dir()).then_with(|| a.name.cmp(&b.name)));
    }
}

fn format_short(entries: &[VfsEntry]) -> String {
    entries.iter().map(|e| format!("{}\n", e.name)).collect()
}

fn format_long(entries: &[VfsEntry]) -> String {
    let width = entries
        .iter()
        .map(|e| e.size.to_string().len())
        .max()
        .unwrap_or(1);
    let mut out = String::new();
    for e in entries {
        let (mode, suffix) = match e.kind {
            EntryKind::Directory => ("drwxr-xr-x", "/"),
            EntryKind::File => ("-rw-r--r--", ""),
        };
        out.push_str(&format!(
            "{mode} 1 user user {:>width$} {} {}{suffix}\n",
            e.size,
            format_timestamp(e.mtime_ms.unwrap_or(0)),
            e.name,
        ));
    }
    out
}

/// Format epoch milliseconds as `YYYY-MM-DD HH:MM` (UTC).
fn format_timestamp(ms: u64) -> String {
    let secs = ms / 1000;
    let (year, month, day) = days_to_ymd(secs / 86_400);
    let minutes = (secs % 86_400) / 60;
    format!(
        "{year:04}-{month:02}-{day:02} {:02}:{:02}",
        minutes / 60,
        minutes % 60
    )
}

/// Convert days since the Unix epoch to (year, month, day) in the proleptic
/// Gregorian calendar, without iterating over years.
fn days_to_ymd(days: u64) -> (u64, u8, u8) {
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z % 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

// ---------------------------------------------------------------------------
// cat
// ---------------------------------------------------------------------------

struct CatCmd;
impl Command for CatCmd {
    fn name(&self) -> &str {
        "cat"
    }
    fn description(&self) -> &str {
        "Concatenate and print files"
    }
    fn usage(&self) -> &str {
        "cat <file...>"
    }
    fn run(&self, args: &[&str], env: &mut Environment<'_>) -> std::result::Result<CommandResult, Failure> {
        let parsed = split_flags(args);
        if parsed.operands.is_empty() {
            return match env.stdin {
                Some(input) => Ok(CommandResult::success(input)),
                None => Err(Failure::usage(STDIN_UNSUPPORTED)),
            };
        }
        let mut result = CommandResult::default();
        for operand in parsed.operands {
            if operand == "-" {
                match env.stdin {
                    Some(input) => result.stdout.push_str(input),
                    None => result.push_failure(
                        self.name(),
                        &Failure::at(operand, EnclaveError::Usage(STDIN_UNSUPPORTED.into())),
                    ),
                }
                continue;
            }
            match read_operand(env, operand) {
                Ok(text) => result.stdout.push_str(&text),
                Err(failure) => result.push_failure(self.name(), &failure),
            }
        }
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// cp / mv shared helpers
// ---------------------------------------------------------------------------

/// Split operands into sources and the final destination.
fn split_destination<'o, 'a>(
    operands: &'o [&'a str],
) -> std::result::Result<(&'o [&'a str], &'a str), Failure> {
    match operands {
        [] => Err(Failure::usage("missing file operand")),
        [only] => Err(Failure::usage(format!(
            "missing destination file operand after '{only}'"
        ))),
        [sources @ .., dest] => Ok((sources, dest)),
    }
}

/// Resolved destination of a multi-operand copy or move.
struct Destination<'a> {
    operand: &'a str,
    path: String,
    is_dir: bool,
}

impl<'a> Destination<'a> {
    fn resolve(
        operand: &'a str,
        sources: usize,
        env: &Environment<'_>,
    ) -> std::result::Result<Self, Failure> {
        let path = resolve(operand, env.cwd).at(operand)?;
        let is_dir = env.vfs.stat(&path).is_ok_and(|m| m.is_dir());
        if sources > 1 && !is_dir {
            return Err(Failure::usage(format!("target '{operand}' is not a directory")));
        }
        Ok(Self {
            operand,
            path,
            is_dir,
        })
    }

    /// Virtual path a source lands at.
    fn target_for(&self, src_path: &str) -> String {
        if self.is_dir {
            join(&self.path, basename(src_path))
        } else {
            self.path.clone()
        }
    }

    /// The target as the user would name it.
    fn display_for(&self, src_path: &str) -> String {
        if self.is_dir {
            format!("{}/{}", self.operand.trim_end_matches('/'), basename(src_path))
        } else {
            self.operand.to_string()
        }
    }
}

// ---------------------------------------------------------------------------
// cp
// ---------------------------------------------------------------------------

struct CpCmd;
impl Command for CpCmd {
    fn name(&self) -> &str {
        "cp"
    }
    fn description(&self) -> &str {
        "Copy files and directories"
    }
    fn usage(&self) -> &str {
        "cp [-r] <src...> <dst>"
    }
    fn run(&self, args: &[&str], env: &mut Environment<'_>) -> std::result::Result<CommandResult, Failure> {
        let parsed = split_flags(args);
        let recursive = parsed.has('r') || parsed.has('R');
        let (sources, dest) = split_destination(&parsed.operands)?;
        let dest = Destination::resolve(dest, sources.len(), env)?;

        let mut result = CommandResult::default();
        for &src in sources {
            if let Err(failure) = copy_one(env, src, &dest, recursive) {
                result.push_failure(self.name(), &failure);
            }
        }
        Ok(result)
    }
}

fn copy_one(
    env: &mut Environment<'_>,
    src: &str,
    dest: &Destination<'_>,
    recursive: bool,
) -> std::result::Result<(), Failure> {
    let src_path = resolve(src, env.cwd).at(src)?;
    let meta = env.vfs.stat(&src_path).at(src)?;
    let target = dest.target_for(&src_path);

    if meta.is_dir() {
        if !recursive {
            return Err(Failure::new(EnclaveError::Other(format!(
                "-r not specified; omitting directory '{src}'"
            ))));
        }
        if is_within(&src_path, &target) {
            return Err(Failure::new(EnclaveError::Other(format!(
                "cannot copy a directory, '{src}', into itself, '{}'",
                dest.display_for(&src_path)
            ))));
        }
        return copy_tree(env.vfs, &src_path, &target).at(dest.operand);
    }

    if target == src_path {
        return Err(Failure::new(EnclaveError::Other(format!(
            "'{src}' and '{}' are the same file",
            dest.display_for(&src_path)
        ))));
    }
    if let Ok(existing) = env.vfs.stat(&target)
        && existing.is_dir()
    {
        return Err(Failure::new(EnclaveError::Other(format!(
            "cannot overwrite directory '{}' with non-directory",
            dest.display_for(&src_path)
        ))));
    }
    let data = env.vfs.read(&src_path).at(src)?;
    env.vfs.write(&target, &data).at(dest.operand)
}

/// Copy `src` (a directory) to `dst`, creating directories as needed and
/// merging into any that already exist.
fn copy_tree(vfs: &mut dyn Vfs, src: &str, dst: &str) -> Result<()> {
    for entry in walk(&*vfs, src)? {
        let target = format!("{dst}{}", &entry.path[src.len()..]);
        match entry.kind {
            EntryKind::Directory => match vfs.stat(&target) {
                Ok(meta) if meta.is_dir() => {},
                Ok(_) => return Err(EnclaveError::NotADirectory(target)),
                Err(_) => vfs.mkdir(&target)?,
            },
            EntryKind::File => {
                let data = vfs.read(&entry.path)?;
                vfs.write(&target, &data)?;
            },
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// mv
// ---------------------------------------------------------------------------

struct MvCmd;
impl Command for MvCmd {
    fn name(&self) -> &str {
        "mv"
    }
    fn description(&self) -> &str {
        "Move or rename files"
    }
    fn usage(&self) -> &str {
        "mv [-f] <src...> <dst>"
    }
    fn run(&self, args: &[&str], env: &mut Environment<'_>) -> std::result::Result<CommandResult, Failure> {
        let parsed = split_flags(args);
        let force = parsed.has('f');
        let (sources, dest) = split_destination(&parsed.operands)?;
        let dest = Destination::resolve(dest, sources.len(), env)?;

        let mut result = CommandResult::default();
        for &src in sources {
            if let Err(failure) = move_one(env, src, &dest, force) {
                result.push_failure(self.name(), &failure);
            }
        }
        Ok(result)
    }
}

fn move_one(
    env: &mut Environment<'_>,
    src: &str,
    dest: &Destination<'_>,
    force: bool,
) -> std::result::Result<(), Failure> {
    let src_path = resolve(src, env.cwd).at(src)?;
    if src_path == "/" {
        return Err(Failure::at(src, EnclaveError::PermissionDenied(src_path)));
    }
    let meta = env.vfs.stat(&src_path).at(src)?;
    let target = dest.target_for(&src_path);
    let shown = dest.display_for(&src_path);

    if target == src_path {
        return Err(Failure::new(EnclaveError::Other(format!(
            "'{src}' and '{shown}' are the same file"
        ))));
    }
    if meta.is_dir() && is_within(&src_path, &target) {
        return Err(Failure::new(EnclaveError::Other(format!(
            "cannot move '{src}' to a subdirectory of itself, '{shown}'"
        ))));
    }
    let Ok(existing) = env.vfs.stat(&target) else {
        return env.vfs.rename(&src_path, &target).at(src);
    };
    if !force || existing.is_dir() || meta.is_dir() {
        return Err(Failure::at(&shown, EnclaveError::AlreadyExists(target)));
    }

    // Park the old target so a failed rename can put it back.
    let backup = backup_name(&*env.vfs, &target);
    env.vfs.rename(&target, &backup).at(&shown)?;
    if let Err(e) = env.vfs.rename(&src_path, &target) {
        if let Err(restore) = env.vfs.rename(&backup, &target) {
            log::warn!("could not restore {target} from {backup}: {restore}");
        }
        return Err(Failure::at(src, e));
    }
    env.vfs.unlink(&backup).at(&shown)
}

/// First unused `<path>.~N~` sibling.
fn backup_name(vfs: &dyn Vfs, path: &str) -> String {
    let mut n = 1u32;
    loop {
        let candidate = format!("{path}.~{n}~");
        if !vfs.exists(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

// ---------------------------------------------------------------------------
// rm
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
struct RmOptions {
    recursive: bool,
    force: bool,
    empty_dirs: bool,
}

struct RmCmd;
impl Command for RmCmd {
    fn name(&self) -> &str {
        "rm"
    }
    fn description(&self) -> &str {
        "Remove files or directories"
    }
    fn usage(&self) -> &str {
        "rm [-rfd] <path...>"
    }
    fn run(&self, args: &[&str], env: &mut Environment<'_>) -> std::result::Result<CommandResult, Failure> {
        let parsed = split_flags(args);
        let mut opts = RmOptions::default();
        for &flag in &parsed.flags {
            match flag {
                'r' | 'R' => opts.recursive = true,
                'f' => opts.force = true,
                'd' => opts.empty_dirs = true,
                _ => {},
            }
        }
        if parsed.operands.is_empty() {
            if opts.force {
                return Ok(CommandResult::default());
            }
            return Err(Failure::usage("missing operand"));
        }

        let mut result = CommandResult::default();
        for operand in parsed.operands {
            if let Err(failure) = remove_one(env, operand, opts) {
                result.push_failure(self.name(), &failure);
            }
        }
        Ok(result)
    }
}

fn remove_one(
    env: &mut Environment<'_>,
    operand: &str,
    opts: RmOptions,
) -> std::result::Result<(), Failure> {
    let path = resolve(operand, env.cwd).at(operand)?;
    let last = operand.trim_end_matches('/').rsplit('/').next().unwrap_or(operand);
    if last == "." || last == ".." {
        return Err(Failure::new(EnclaveError::Other(format!(
            "refusing to remove '.' or '..' directory: skipping '{operand}'"
        ))));
    }
    if path == "/" {
        return Err(Failure::at(operand, EnclaveError::PermissionDenied(path)));
    }
    let meta = match env.vfs.stat(&path) {
        Ok(meta) => meta,
        Err(EnclaveError::NotFound(_)) if opts.force => return Ok(()),
        Err(e) => return Err(Failure::at(operand, e)),
    };

    if meta.is_file() {
        return env.vfs.unlink(&path).at(operand);
    }
    if opts.recursive {
        return remove_tree(env.vfs, &path).at(operand);
    }
    if opts.empty_dirs {
        return env.vfs.rmdir(&path).at(operand);
    }
    if env.vfs.readdir(&path).at(operand)?.is_empty() {
        Err(Failure::at(operand, EnclaveError::IsADirectory(path)))
    } else {
        Err(Failure::at(operand, EnclaveError::DirectoryNotEmpty(path)))
    }
}

/// Remove a directory tree, deepest entries first.
fn remove_tree(vfs: &mut dyn Vfs, path: &str) -> Result<()> {
    for entry in walk(&*vfs, path)?.into_iter().rev() {
        match entry.kind {
            EntryKind::File => vfs.unlink(&entry.path)?,
            EntryKind::Directory => vfs.rmdir(&entry.path)?,
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// mkdir
// ---------------------------------------------------------------------------

struct MkdirCmd;
impl Command for MkdirCmd {
    fn name(&self) -> &str {
        "mkdir"
    }
    fn description(&self) -> &str {
        "Create directories"
    }
    fn usage(&self) -> &str {
        "mkdir [-p] <dir...>"
    }
    fn run(&self, args: &[&str], env: &mut Environment<'_>) -> std::result::Result<CommandResult, Failure> {
        let parsed = split_flags(args);
        let parents = parsed.has('p');
        if parsed.operands.is_empty() {
            return Err(Failure::usage("missing operand"));
        }
        let mut result = CommandResult::default();
        for operand in parsed.operands {
            let created = resolve(operand, env.cwd).at(operand).and_then(|path| {
                if parents {
                    make_parents(env.vfs, &path).at(operand)
                } else {
                    env.vfs.mkdir(&path).at(operand)
                }
            });
            if let Err(failure) = created {
                result.push_failure(self.name(), &failure);
            }
        }
        Ok(result)
    }
}

/// Create `path` and any missing ancestors; existing directories are fine.
fn make_parents(vfs: &mut dyn Vfs, path: &str) -> Result<()> {
    let parts: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    let mut current = "/".to_string();
    for (i, part) in parts.iter().enumerate() {
        current = join(&current, part);
        match vfs.stat(&current) {
            Ok(meta) if meta.is_dir() => {},
            Ok(_) if i + 1 == parts.len() => return Err(EnclaveError::AlreadyExists(current)),
            Ok(_) => return Err(EnclaveError::NotADirectory(current)),
            Err(EnclaveError::NotFound(_)) => vfs.mkdir(&current)?,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// touch
// ---------------------------------------------------------------------------

struct TouchCmd;
impl Command for TouchCmd {
    fn name(&self) -> &str {
        "touch"
    }
    fn description(&self) -> &str {
        "Create empty files or refresh their timestamps"
    }
    fn usage(&self) -> &str {
        "touch <file...>"
    }
    fn run(&self, args: &[&str], env: &mut Environment<'_>) -> std::result::Result<CommandResult, Failure> {
        let parsed = split_flags(args);
        if parsed.operands.is_empty() {
            return Err(Failure::usage("missing file operand"));
        }
        let mut result = CommandResult::default();
        for operand in parsed.operands {
            let touched = resolve(operand, env.cwd)
                .and_then(|path| touch(env.vfs, &path))
                .at(operand);
            if let Err(failure) = touched {
                result.push_failure(self.name(), &failure);
            }
        }
        Ok(result)
    }
}

fn touch(vfs: &mut dyn Vfs, path: &str) -> Result<()> {
    match vfs.stat(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => {
            let data = vfs.read(path)?;
            vfs.write(path, &data)
        },
        Err(EnclaveError::NotFound(_)) => vfs.write(path, b""),
        Err(e) => Err(e),
    }
}
