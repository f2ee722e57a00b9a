//! Publish loop
//!
//! Reads the dmon stream, publishes each row to its GPU's state topic and
//! refreshes the availability beacon. Row-level failures are logged and
//! skipped; only the end of the stream or a shutdown request ends the loop.
//! Either way the loop finishes with the offline sequence: stop the
//! subprocess, publish "offline", disconnect.

use crate::broker::{BrokerSession, Message, Publisher, Topics};
use crate::domain::{Availability, GpuInventory, MetricSample};
use crate::error::{AppError, RowError};
use crate::services::discovery::DiscoveryPublisher;
use crate::services::shutdown::ShutdownSignal;
use crate::smi::{read_schema, MetricStream, ParsedLine};

use std::io;

/// Row counts for one monitoring session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Rows published
    pub published: usize,
    /// Rows dropped by per-row errors
    pub dropped: usize,
    /// Whether the loop ended because of a shutdown request
    pub interrupted: bool,
    /// Whether a repeated header differed from the session header
    pub header_drift: bool,
}

/// The monitoring bridge for one host
pub struct Bridge<'a> {
    inventory: &'a GpuInventory,
    topics: &'a Topics,
}

impl<'a> Bridge<'a> {
    /// Create a bridge over a fixed inventory
    pub fn new(inventory: &'a GpuInventory, topics: &'a Topics) -> Self {
        Self { inventory, topics }
    }

    /// Run one monitoring session to completion
    ///
    /// The offline sequence runs whether the session ends normally, on
    /// shutdown, or because the header could not be read.
    pub fn run<S, B>(
        &self,
        stream: &mut S,
        session: &mut B,
        shutdown: &ShutdownSignal,
    ) -> Result<RunSummary, AppError>
    where
        S: MetricStream,
        B: BrokerSession,
    {
        let result = self.pump(stream, &*session, shutdown);
        self.go_offline(stream, session);
        result
    }

    fn pump<S, P>(
        &self,
        stream: &mut S,
        publisher: &P,
        shutdown: &ShutdownSignal,
    ) -> Result<RunSummary, AppError>
    where
        S: MetricStream,
        P: Publisher + ?Sized,
    {
        let schema = read_schema(stream)?;
        DiscoveryPublisher::new(self.topics).publish_all(publisher, self.inventory, &schema)?;

        log::info!("Monitoring {} GPU(s)...", self.inventory.len());

        let mut summary = RunSummary::default();

        loop {
            if shutdown.is_triggered() {
                log::info!("Interrupt received, shutting down...");
                summary.interrupted = true;
                break;
            }

            let line = match stream.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) if e.kind() == io::ErrorKind::InvalidData => {
                    log::warn!("Dropping row: {}", RowError::Read(e));
                    summary.dropped += 1;
                    continue;
                }
                Some(Err(e)) => {
                    log::error!("Failed to read from nvidia-smi: {}", e);
                    break;
                }
                None => {
                    if shutdown.is_triggered() {
                        log::info!("Interrupt received, shutting down...");
                        summary.interrupted = true;
                    } else {
                        log::info!("nvidia-smi output ended");
                    }
                    break;
                }
            };

            match schema.parse_line(&line) {
                Ok(ParsedLine::Blank) => {}
                Ok(ParsedLine::Announcement(fields)) => {
                    if !summary.header_drift && !schema.matches_announcement(&fields) {
                        log::warn!(
                            "nvidia-smi announced columns {:?} that differ from the \
                             session header; rows are still parsed against it",
                            fields
                        );
                        summary.header_drift = true;
                    }
                }
                Ok(ParsedLine::Sample(sample)) => match self.publish_sample(&sample, publisher) {
                    Ok(()) => summary.published += 1,
                    Err(e) => {
                        log::error!("Failed to publish row {:?}: {}", line, e);
                        summary.dropped += 1;
                    }
                },
                Err(RowError::FieldCount { expected, found }) => {
                    log::warn!(
                        "Dropping row with {} fields (expected {}): {:?}",
                        found,
                        expected,
                        line
                    );
                    summary.dropped += 1;
                }
                Err(e) => {
                    log::error!("Failed to process row {:?}: {}", line, e);
                    summary.dropped += 1;
                }
            }
        }

        log::info!(
            "Published {} row(s), dropped {}",
            summary.published,
            summary.dropped
        );
        Ok(summary)
    }

    /// Publish a sample to its GPU's topic, then mark the bridge online
    pub fn publish_sample<P: Publisher + ?Sized>(
        &self,
        sample: &MetricSample,
        publisher: &P,
    ) -> Result<(), RowError> {
        let gpu = self
            .inventory
            .get(sample.gpu_index())
            .ok_or_else(|| RowError::UnknownGpu(sample.gpu_index().to_string()))?;

        let message = Message::json(self.topics.state(&gpu.uuid), &sample.to_payload())?;
        publisher.publish(message)?;
        publisher.publish(self.availability(Availability::Online))?;
        Ok(())
    }

    fn availability(&self, state: Availability) -> Message {
        Message::new(self.topics.availability(), state.as_str()).retained()
    }

    fn go_offline<S, B>(&self, stream: &mut S, session: &mut B)
    where
        S: MetricStream,
        B: BrokerSession,
    {
        if let Err(e) = stream.stop() {
            log::warn!("{}", e);
        }
        self.abandon(session);
    }

    /// Publish "offline" and disconnect without a running stream
    ///
    /// Used when the session never got as far as sampling.
    pub fn abandon<B: BrokerSession>(&self, session: &mut B) {
        if let Err(e) = session.publish(self.availability(Availability::Offline)) {
            log::error!("Failed to publish offline state: {}", e);
        }
        if let Err(e) = session.disconnect() {
            log::error!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GpuRecord;
    use crate::error::StreamError;
    use crate::mock::{Recorded, RecordingSession, ScriptedStream};
    use crate::smi::StopHandle;

    const UUID: &str = "GPU-abc12345-6789-";
    const STATE: &str = "nvidia-smi/GPU-abc12345-6789-";
    const AVAILABILITY: &str = "nvidia-smi/availability";

    fn inventory() -> GpuInventory {
        crate::smi::parse_inventory("0, Tesla T4, GPU-abc12345-6789-...")
    }

    fn header() -> [&'static str; 2] {
        ["# gpu, pwr, gtemp", "# Idx, W, C"]
    }

    fn run(stream: &mut ScriptedStream, session: &mut RecordingSession) -> RunSummary {
        let inventory = inventory();
        let topics = Topics::default();
        Bridge::new(&inventory, &topics)
            .run(stream, session, &ShutdownSignal::new())
            .unwrap()
    }

    #[test]
    fn test_end_to_end_scenario() {
        let mut stream = ScriptedStream::new(&header()).with_lines(&["0, 45, 60"]);
        let mut session = RecordingSession::new();

        let summary = run(&mut stream, &mut session);
        assert_eq!(summary.published, 1);
        assert_eq!(summary.dropped, 0);
        assert!(!summary.interrupted);

        assert_eq!(
            session.topics(),
            vec![
                format!("homeassistant/sensor/{}_pwr/config", UUID),
                format!("homeassistant/sensor/{}_gtemp/config", UUID),
                STATE.to_string(),
                AVAILABILITY.to_string(),
                AVAILABILITY.to_string(),
            ]
        );

        let state = &session.messages_on(STATE)[0];
        assert_eq!(state.payload_str(), r#"{"pwr":"45","gtemp":"60"}"#);
        assert!(!state.retain);
    }

    #[test]
    fn test_online_after_every_row_and_offline_last() {
        let mut stream =
            ScriptedStream::new(&header()).with_lines(&["0, 45, 60", "0, 46, 61", "0, 47, 61"]);
        let mut session = RecordingSession::new();

        run(&mut stream, &mut session);

        let beacons: Vec<_> = session
            .messages_on(AVAILABILITY)
            .into_iter()
            .map(|m| m.payload_str().into_owned())
            .collect();
        assert_eq!(beacons, vec!["online", "online", "online", "offline"]);
        assert!(session.messages_on(AVAILABILITY).iter().all(|m| m.retain));

        let recorded = session.recorded();
        assert_eq!(recorded.last(), Some(&Recorded::Disconnect));
        match &recorded[recorded.len() - 2] {
            Recorded::Publish(m) => {
                assert_eq!(m.topic, AVAILABILITY);
                assert_eq!(m.payload_str(), "offline");
            }
            other => panic!("Expected offline publish, got {:?}", other),
        }
        assert!(stream.was_stopped());
    }

    #[test]
    fn test_short_row_is_dropped_and_loop_continues() {
        let mut stream =
            ScriptedStream::new(&header()).with_lines(&["0, 45", "0, 50, 62"]);
        let mut session = RecordingSession::new();

        let summary = run(&mut stream, &mut session);
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.published, 1);

        let states = session.messages_on(STATE);
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].payload_str(), r#"{"pwr":"50","gtemp":"62"}"#);
    }

    #[test]
    fn test_placeholder_published_as_null() {
        let mut stream = ScriptedStream::new(&header()).with_lines(&["0, -, 60"]);
        let mut session = RecordingSession::new();

        run(&mut stream, &mut session);
        assert_eq!(
            session.messages_on(STATE)[0].payload_str(),
            r#"{"pwr":null,"gtemp":"60"}"#
        );
    }

    #[test]
    fn test_unknown_gpu_index_is_skipped() {
        let mut stream =
            ScriptedStream::new(&header()).with_lines(&["3, 45, 60", "0, 45, 60"]);
        let mut session = RecordingSession::new();

        let summary = run(&mut stream, &mut session);
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.published, 1);
        assert_eq!(session.messages_on(STATE).len(), 1);
    }

    #[test]
    fn test_header_repeats_and_blanks_are_skipped() {
        let mut stream = ScriptedStream::new(&header()).with_lines(&[
            "0, 45, 60",
            "# gpu, pwr, gtemp",
            "# Idx, W, C",
            "",
            "0, 46, 60",
        ]);
        let mut session = RecordingSession::new();

        let summary = run(&mut stream, &mut session);
        assert_eq!(summary.published, 2);
        assert_eq!(summary.dropped, 0);
        assert!(!summary.header_drift);
    }

    #[test]
    fn test_changed_header_keeps_session_columns() {
        let mut stream = ScriptedStream::new(&header()).with_lines(&[
            "# gpu, pwr, sm",
            "0, 45, 60",
            "# gpu, pwr, sm",
            "0, 46, 61",
        ]);
        let mut session = RecordingSession::new();

        let summary = run(&mut stream, &mut session);
        assert!(summary.header_drift);
        assert_eq!(summary.published, 2);
        assert_eq!(summary.dropped, 0);

        let states = session.messages_on(STATE);
        assert_eq!(states[0].payload_str(), r#"{"pwr":"45","gtemp":"60"}"#);
        assert_eq!(states[1].payload_str(), r#"{"pwr":"46","gtemp":"61"}"#);
    }

    #[test]
    fn test_invalid_utf8_row_is_dropped() {
        let mut stream = ScriptedStream::new(&header())
            .with_error(io::ErrorKind::InvalidData)
            .with_lines(&["0, 45, 60"]);
        let mut session = RecordingSession::new();

        let summary = run(&mut stream, &mut session);
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.published, 1);
    }

    #[test]
    fn test_broken_pipe_ends_stream() {
        let mut stream = ScriptedStream::new(&header())
            .with_error(io::ErrorKind::BrokenPipe)
            .with_lines(&["0, 45, 60"]);
        let mut session = RecordingSession::new();

        let summary = run(&mut stream, &mut session);
        assert_eq!(summary.published, 0);
        assert_eq!(session.recorded().last(), Some(&Recorded::Disconnect));
    }

    #[test]
    fn test_publish_failure_is_per_row() {
        let mut stream =
            ScriptedStream::new(&header()).with_lines(&["0, 45, 60", "0, 46, 60"]);
        let mut session = RecordingSession::new().failing_on(STATE);

        let summary = run(&mut stream, &mut session);
        assert_eq!(summary.dropped, 2);
        assert_eq!(summary.published, 0);
        // no row made it, so the only beacon is the final offline
        let beacons = session.messages_on(AVAILABILITY);
        assert_eq!(beacons.len(), 1);
        assert_eq!(beacons[0].payload_str(), "offline");
    }

    #[test]
    fn test_interrupt_runs_offline_sequence() {
        let inventory = inventory();
        let topics = Topics::default();
        let shutdown = ShutdownSignal::new();
        let trigger = shutdown.clone();

        // interrupt arrives while the fourth line (second data row) is awaited
        let mut stream = ScriptedStream::new(&header())
            .with_lines(&["0, 45, 60", "0, 46, 60", "0, 47, 60"])
            .interrupt_at(3, StopHandle::new(move || trigger.trigger()));
        let mut session = RecordingSession::new();

        let summary = Bridge::new(&inventory, &topics)
            .run(&mut stream, &mut session, &shutdown)
            .unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.published, 2);
        assert_eq!(stream.stop_calls(), 1);

        let recorded = session.recorded();
        assert_eq!(recorded.last(), Some(&Recorded::Disconnect));
        let last_publish = session.messages().pop().unwrap();
        assert_eq!(last_publish.topic, AVAILABILITY);
        assert_eq!(last_publish.payload_str(), "offline");
    }

    #[test]
    fn test_stop_handle_unblocks_and_interrupts() {
        let inventory = inventory();
        let topics = Topics::default();
        let shutdown = ShutdownSignal::new();

        // the signal handler sets the flag and kills the subprocess
        let stream = ScriptedStream::new(&header()).with_lines(&["0, 45, 60", "0, 46, 60"]);
        let kill = stream.stop_handle();
        let flag = shutdown.clone();
        let mut stream = stream.interrupt_at(
            3,
            StopHandle::new(move || {
                flag.trigger();
                kill.stop();
            }),
        );
        let mut session = RecordingSession::new();

        let summary = Bridge::new(&inventory, &topics)
            .run(&mut stream, &mut session, &shutdown)
            .unwrap();
        assert!(summary.interrupted);
        assert_eq!(summary.published, 1);
        assert_eq!(stream.remaining(), 1);
    }

    #[test]
    fn test_missing_header_still_goes_offline() {
        let inventory = inventory();
        let topics = Topics::default();
        let mut stream = ScriptedStream::new(&["# gpu, pwr, gtemp"]);
        let mut session = RecordingSession::new();

        let result = Bridge::new(&inventory, &topics).run(
            &mut stream,
            &mut session,
            &ShutdownSignal::new(),
        );

        assert!(matches!(
            result,
            Err(AppError::Stream(StreamError::MissingHeader("unit")))
        ));
        assert_eq!(
            session.recorded(),
            vec![
                Recorded::Publish(Message::new(AVAILABILITY, "offline").retained()),
                Recorded::Disconnect,
            ]
        );
    }

    #[test]
    fn test_multi_gpu_routing() {
        let inventory = GpuInventory::from_records(vec![
            GpuRecord::new("0", "Tesla T4", "GPU-aaaa"),
            GpuRecord::new("1", "Tesla T4", "GPU-bbbb"),
        ]);
        let topics = Topics::default();
        let mut stream = ScriptedStream::new(&header()).with_lines(&["0, 45, 60", "1, 70, 71"]);
        let mut session = RecordingSession::new();

        Bridge::new(&inventory, &topics)
            .run(&mut stream, &mut session, &ShutdownSignal::new())
            .unwrap();

        assert_eq!(
            session.messages_on("nvidia-smi/GPU-aaaa")[0].payload_str(),
            r#"{"pwr":"45","gtemp":"60"}"#
        );
        let second = &session.messages_on("nvidia-smi/GPU-bbbb")[0];
        assert_eq!(second.payload_str(), r#"{"pwr":"70","gtemp":"71"}"#);
        assert!(!second.payload_str().contains("gpu"));
    }
}
