use std::io::Write;

use tracing::{debug, info, warn};

use common::{EventSink, PipelineEvent};

/// Writes pipeline events as structured log records.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::Screen(s) => match &s.metrics {
                Some(m) => debug!(
                    symbol = %s.symbol,
                    pass = s.pass,
                    avg_volume = m.avg_volume_50,
                    prior_move = m.prior_move_pct,
                    consolidation_days = m.consolidation_days,
                    retracement = m.retracement_pct,
                    "screen"
                ),
                None => debug!(symbol = %s.symbol, pass = s.pass, "screen"),
            },
            PipelineEvent::Signal(s) => info!(
                symbol = %s.symbol,
                price = s.trigger_price,
                range_high = s.range_high,
                "signal"
            ),
            PipelineEvent::Exit(e) => info!(
                symbol = %e.symbol,
                price = e.price,
                stop = e.stop_price,
                reason = %e.reason,
                "exit"
            ),
            PipelineEvent::Order(o) => info!(
                id = %o.id,
                symbol = %o.symbol,
                side = %o.side,
                qty = o.quantity,
                price = o.price,
                "order"
            ),
        }
    }
}

/// Appends each event as one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Events successfully written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_event(&mut self, event: &PipelineEvent) -> common::Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn emit(&mut self, event: &PipelineEvent) {
        // Write failures are logged, never propagated.
        match self.write_event(event) {
            Ok(()) => self.written += 1,
            Err(e) => warn!(error = %e, "Failed to write event"),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::{Order, OrderSide, ScreenResult};

    #[test]
    fn writes_one_tagged_object_per_line() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.emit(&PipelineEvent::Screen(ScreenResult::fail_closed("TSLA")));
        sink.emit(&PipelineEvent::Order(Order::filled(
            "TSLA",
            OrderSide::Buy,
            10,
            250.0,
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        )));
        assert_eq!(sink.written(), 2);

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "screen");
        assert_eq!(lines[0]["pass"], false);
        assert_eq!(lines[1]["event"], "order");
        assert_eq!(lines[1]["side"], "BUY");
        assert_eq!(lines[1]["quantity"], 10);
    }

    #[test]
    fn boxed_sink_flushes_buffered_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let file = std::fs::File::create(&path).unwrap();
        let mut sink: Box<dyn EventSink> =
            Box::new(JsonLinesSink::new(std::io::BufWriter::new(file)));
        sink.emit(&PipelineEvent::Screen(ScreenResult::fail_closed("MSFT")));

        // Still sitting in the BufWriter.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

        sink.flush().unwrap();
        let out = std::fs::read_to_string(&path).unwrap();
        assert_eq!(out.lines().count(), 1);
        assert!(out.contains("\"symbol\":\"MSFT\""));
    }
}
