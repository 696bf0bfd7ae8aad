//! Backends command
//!
//! Lists the compute backends and which one `auto` selects.

use anyhow::Result;
use fgrain_compute::{describe_backends, select_best_backend};

pub fn run() -> Result<()> {
    println!("Compute backends:");
    println!("{}", describe_backends());
    println!("auto -> {}", select_best_backend().name());
    Ok(())
}
