//! Orrery application: hosts the wgpu renderer in a winit window.

mod clock;
mod logging;
mod runtime;

use anyhow::Result;

use crate::runtime::{Runtime, RuntimeConfig};

fn main() -> Result<()> {
    logging::init_logging(None);
    Runtime::run(RuntimeConfig::default())
}
