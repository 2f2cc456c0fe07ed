//! SampleSource - line-oriented sample stream reader
//!
//! Wraps any buffered async reader and yields one [`Sample`] per line. The
//! source is lazy and cannot be restarted: once the reader reports end of
//! stream, or a line fails to decode, no further samples are produced.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::error::IngestError;

use super::sample::{parse_history_line, parse_sample_line, Sample};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingHistory,
    Live,
    Finished,
}

pub struct SampleSource<R> {
    lines: Lines<R>,
    phase: Phase,
    lines_read: u64,
}

impl<R> SampleSource<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            phase: Phase::AwaitingHistory,
            lines_read: 0,
        }
    }

    /// Number of lines consumed so far, history line included
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    #[cfg(test)]
    fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Read the opening `{"last": [...]}` line.
    ///
    /// Returns an empty history if the stream closes before the first line.
    /// Calling this after the history has been consumed returns an empty list
    /// without reading.
    pub async fn read_history(&mut self) -> Result<Vec<Sample>, IngestError> {
        if self.phase != Phase::AwaitingHistory {
            return Ok(Vec::new());
        }

        match self.next_line().await? {
            Some(line) => {
                let history = parse_history_line(&line).inspect_err(|_| self.finish())?;
                self.phase = Phase::Live;
                Ok(history.last)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Read the next live sample.
    ///
    /// If the history line has not been read yet it is consumed and
    /// discarded first. Returns `Ok(None)` at end of stream.
    ///
    /// Cancel safe: dropping the future before completion loses at most a
    /// partially read line.
    pub async fn next_sample(&mut self) -> Result<Option<Sample>, IngestError> {
        if self.phase == Phase::AwaitingHistory {
            let skipped = self.read_history().await?;
            log::debug!("[SampleSource] Discarded {} history samples", skipped.len());
        }

        match self.next_line().await? {
            Some(line) => parse_sample_line(&line)
                .map(Some)
                .inspect_err(|_| self.finish()),
            None => Ok(None),
        }
    }

    async fn next_line(&mut self) -> Result<Option<String>, IngestError> {
        if self.phase == Phase::Finished {
            return Ok(None);
        }

        match self.lines.next_line().await {
            Ok(Some(line)) => {
                self.lines_read += 1;
                Ok(Some(line))
            }
            Ok(None) => {
                self.finish();
                Ok(None)
            }
            Err(err) => {
                self.finish();
                Err(err.into())
            }
        }
    }

    fn finish(&mut self) {
        self.phase = Phase::Finished;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_history_then_samples() {
        let input: &[u8] = b"{\"last\": [[0, 70, []], [1, 72, []]]}\n[2, 74, [0.8]]\n[3, 75]\n";
        let mut source = SampleSource::new(input);

        let history = source.read_history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].rate, 72.0);

        let first = source.next_sample().await.unwrap().unwrap();
        assert_eq!(first, Sample::new(2, 74.0).with_intervals(vec![0.8]));
        let second = source.next_sample().await.unwrap().unwrap();
        assert_eq!(second.rate, 75.0);

        assert!(source.next_sample().await.unwrap().is_none());
        assert!(source.is_finished());
        assert_eq!(source.lines_read(), 3);
    }

    #[tokio::test]
    async fn test_history_is_never_a_live_sample() {
        let input: &[u8] = b"{\"last\": [[0, 70, []]]}\n[1, 80, []]\n";
        let mut source = SampleSource::new(input);

        let first = source.next_sample().await.unwrap().unwrap();
        assert_eq!(first.timestamp, 1);
        assert!(source.next_sample().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_stream_has_empty_history() {
        let input: &[u8] = b"";
        let mut source = SampleSource::new(input);
        assert!(source.read_history().await.unwrap().is_empty());
        assert!(source.next_sample().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_line_terminates_source() {
        let input: &[u8] = b"{\"last\": []}\n[1, 70, []]\nnot json\n[2, 71, []]\n";
        let mut source = SampleSource::new(input);

        assert!(source.next_sample().await.unwrap().is_some());
        let err = source.next_sample().await.unwrap_err();
        assert!(matches!(err, IngestError::MalformedInput { .. }));

        // No per-line recovery: the valid line after the bad one is never read
        assert!(source.next_sample().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_history_line() {
        let input: &[u8] = b"[0, 70, []]\n";
        let mut source = SampleSource::new(input);
        assert!(source.read_history().await.is_err());
        assert!(source.is_finished());
    }
}
