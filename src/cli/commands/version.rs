//! Version command - show version information

/// Print version information
///
/// If verbose is false, prints a single line with name and version.
/// If verbose is true, prints detailed build information.
pub fn print_version(verbose: bool) {
    println!("{} {}", crate::NAME, crate::VERSION);

    if verbose {
        println!();
        println!("Features:");
        println!("  - Allow-listed systemd user service control");
        println!("  - Group-restricted Unix socket endpoint");
        println!("  - JSONL audit logging");
        println!("  - systemd user unit registration");
        println!();
        println!("Build info:");
        println!("  Target: {}", std::env::consts::ARCH);
        println!("  OS:     {}", std::env::consts::OS);
        println!("  Rust:   {}", env!("RUSTC_VERSION"));
    }
}
