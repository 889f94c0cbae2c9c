//! Named worker threads.
//!
//! The connectivity prober performs blocking HTTP calls, so it gets an OS
//! thread of its own instead of a slot on the cooperative executor.

use std::io;
use std::thread::{Builder, JoinHandle};

use log::info;

/// Spawn `f` on a named thread with an explicit stack size.
pub fn spawn_named(
    name: &'static str,
    stack_kb: usize,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    info!("Spawning '{name}' (stack={stack_kb}KB)");
    Builder::new()
        .name(name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
}
