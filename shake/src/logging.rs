use std::error::Error;

use log::LevelFilter;
use simple_logger::SimpleLogger;

/// Initializes stderr logging for this crate only.
///
/// Verbosity 0 maps to info, 1 to debug and anything above to trace.
pub fn init(verbosity: u8) -> Result<(), Box<dyn Error>> {
    SimpleLogger::new()
        .with_level(LevelFilter::Off)
        .with_module_level("shake", level(verbosity))
        .with_utc_timestamps()
        .init()?;

    Ok(())
}

fn level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
