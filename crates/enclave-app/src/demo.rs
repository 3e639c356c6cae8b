use enclave_types::error::Result;
use enclave_vfs::{MemoryVfs, Vfs};

/// Fill an in-memory VFS with a small sample project.
pub fn populate_demo_project(vfs: &mut MemoryVfs) -> Result<()> {
    vfs.mkdir_all("/src/commands")?;
    vfs.mkdir_all("/docs")?;
    vfs.mkdir("/tmp")?;

    vfs.write(
        "/README.md",
        b"# demo project\n\nTry `ls -la`, `cat README.md` or `head -n 3 docs/notes.txt`.\n",
    )?;
    vfs.write("/.gitignore", b"target/\n*.log\n")?;
    vfs.write(
        "/Cargo.toml",
        b"[package]\nname = \"demo\"\nversion = \"0.1.0\"\nedition = \"2024\"\n",
    )?;
    vfs.write(
        "/src/main.rs",
        b"mod commands;\n\nfn main() {\n    commands::run();\n}\n",
    )?;
    vfs.write(
        "/src/commands/mod.rs",
        b"pub fn run() {\n    println!(\"hello from the demo\");\n}\n",
    )?;
    vfs.write(
        "/docs/notes.txt",
        b"alpha\nalpha\nbeta\nalpha\ngamma\ngamma\ndelta\n",
    )?;
    vfs.write("/docs/todo.txt", b"write tests\nship it\n")?;
    Ok(())
}
