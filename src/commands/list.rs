//! List commands implementation

use crate::programmers::available_programmers;

/// List all supported programmers
pub fn list_programmers() {
    println!("Supported programmers:");
    println!();
    for p in available_programmers() {
        println!("  {:8} - {}", p.name, p.description);
        if !p.aliases.is_empty() {
            println!("  {:8}   aliases: {}", "", p.aliases.join(", "));
        }
    }
}
