//! Stats command for summarizing an index.

use std::io::Write;

use anyhow::Result;

use evi_core::EventIndex;

pub fn run<W: Write>(writer: &mut W, index: &EventIndex) -> Result<()> {
    if index.is_empty() {
        writeln!(writer, "No events.")?;
        return Ok(());
    }

    let distinct = {
        let mut all = index.all_events();
        all.dedup();
        all.len()
    };

    writeln!(writer, "Events: {} ({distinct} distinct)", index.count())?;
    writeln!(writer, "Start frame: {}", index.start_frame())?;
    writeln!(writer, "End frame: {}", index.end_frame())?;
    Ok(())
}
