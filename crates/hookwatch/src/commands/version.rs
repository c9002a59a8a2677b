pub fn run() -> anyhow::Result<()> {
    println!("hookwatch {}", env!("CARGO_PKG_VERSION"));
    println!("Hook event capture and duplicate-output auditing for Claude Code");
    Ok(())
}
