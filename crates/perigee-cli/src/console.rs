//! Console output helpers shared by the subcommands.

/// Print a section heading.
pub fn header(text: &str) {
    println!("Deploy: {text}");
}

/// Print an indented detail line.
pub fn line(text: &str) {
    println!("      : {text}");
}

/// Print a section divider.
pub fn divider() {
    println!("      --------------------------------------------------");
}

/// Print a blank line.
pub fn spacer() {
    println!();
}
