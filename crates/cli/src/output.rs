//! Rendering of batch events on the terminal.

use std::io::{self, Write};

use macan_core::batch::BatchEvent;

/// Prints batch events and remembers the final counts.
pub struct EventPrinter {
    json: bool,
    progress_open: bool,
    counts: Option<(usize, usize)>,
}

impl EventPrinter {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            progress_open: false,
            counts: None,
        }
    }

    /// `(succeeded, failed)` once the batch reported completion.
    pub fn counts(&self) -> Option<(usize, usize)> {
        self.counts
    }

    pub fn print(&mut self, event: &BatchEvent) {
        if let BatchEvent::BatchDone { succeeded, failed } = event {
            self.counts = Some((*succeeded, *failed));
        }

        if self.json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!("Failed to serialize event: {}", e),
            }
            return;
        }

        let mut out = io::stdout().lock();
        let _ = self.write_human(&mut out, event);
        let _ = out.flush();
    }

    fn write_human(&mut self, out: &mut impl Write, event: &BatchEvent) -> io::Result<()> {
        match event {
            BatchEvent::ItemStarted {
                index,
                total,
                filename,
            } => {
                self.close_progress(out)?;
                writeln!(out, "[{}/{}] {}", index + 1, total, filename)
            }
            BatchEvent::Progress { event, .. } => {
                self.progress_open = true;
                write!(out, "\r  {:>3}%  {:<40}", event.percent, event.status)
            }
            BatchEvent::ItemDone {
                success, message, ..
            } => {
                self.close_progress(out)?;
                let mark = if *success { "ok" } else { "failed" };
                writeln!(out, "  {}: {}", mark, message)
            }
            BatchEvent::BatchDone { succeeded, failed } => {
                self.close_progress(out)?;
                writeln!(out, "{} succeeded, {} failed", succeeded, failed)
            }
        }
    }

    fn close_progress(&mut self, out: &mut impl Write) -> io::Result<()> {
        if self.progress_open {
            self.progress_open = false;
            writeln!(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macan_core::converter::ProgressEvent;

    fn render(events: &[BatchEvent]) -> String {
        let mut printer = EventPrinter::new(false);
        let mut out = Vec::new();
        for event in events {
            printer.write_human(&mut out, event).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_human_output() {
        let text = render(&[
            BatchEvent::ItemStarted {
                index: 0,
                total: 2,
                filename: "song.wav".to_string(),
            },
            BatchEvent::Progress {
                index: 0,
                event: ProgressEvent::new(50, "Converting... 50%"),
            },
            BatchEvent::ItemDone {
                index: 0,
                success: true,
                message: "Conversion complete.".to_string(),
            },
            BatchEvent::BatchDone {
                succeeded: 1,
                failed: 0,
            },
        ]);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "[1/2] song.wav");
        assert!(lines[1].starts_with("\r   50%  Converting... 50%"));
        assert_eq!(lines[2], "  ok: Conversion complete.");
        assert_eq!(lines[3], "1 succeeded, 0 failed");
    }

    #[test]
    fn test_counts_recorded() {
        let mut printer = EventPrinter::new(true);
        assert_eq!(printer.counts(), None);
        printer.print(&BatchEvent::BatchDone {
            succeeded: 2,
            failed: 1,
        });
        assert_eq!(printer.counts(), Some((2, 1)));
    }
}
