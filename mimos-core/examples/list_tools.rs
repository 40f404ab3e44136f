//! Prints the replayable tool registry, grouped by category.
//!
//! Useful for checking whether a recorded scenario only uses tools the
//! engine can dispatch, without connecting a device.

use mimos_core::prelude::*;

fn main() {
    println!("🔧 Replayable tools ({} registered)\n", TOOL_TABLE.len());

    let mut categories: Vec<ToolCategory> = TOOL_TABLE.iter().map(|s| s.category).collect();
    categories.dedup();

    for category in categories {
        println!("{category:?}");
        for spec in TOOL_TABLE.iter().filter(|s| s.category == category) {
            println!("  {}", spec.signature());
            for (recorded, expected) in spec.renames {
                println!("    (accepts '{recorded}' for '{expected}')");
            }
        }
        println!();
    }
}
