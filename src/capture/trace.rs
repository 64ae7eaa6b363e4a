//! Trace stream formatting.
//!
//! External tools parse this stream line by line, so the shape is fixed:
//!
//! ```text
//!   Ch0 received 2 items
//! -9000,4500,-560,1690
//! ```
//!
//! Writers target `core::fmt::Write` so the same code fills a `String` in
//! tests and the console adapter's line buffer on target.

use core::fmt::{self, Write};

use crate::app::ports::TraceRecord;

/// Write one trace record.
pub fn write_record<W: Write>(out: &mut W, record: &TraceRecord<'_>) -> fmt::Result {
    match *record {
        TraceRecord::Received {
            tag,
            items,
            durations,
        } => {
            writeln!(out, "  {tag} received {items} items")?;
            for (i, d) in durations.iter().enumerate() {
                if i > 0 {
                    out.write_char(',')?;
                }
                write!(out, "{d}")?;
            }
            out.write_char('\n')
        }
        TraceRecord::NoItems { .. } => out.write_str("No items\n"),
    }
}
