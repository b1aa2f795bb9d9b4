/*
The framer walks a byte source looking for 0xD3-led frames, decoding
every complete candidate and passing everything else through
unchanged. A corrupted byte costs at most one frame's worth of
lookahead: a spurious leader falls into the pending non-RTCM span and
scanning resumes at the byte after it.
*/
use crate::message::{parse_leader, Decoder, Message, CRC_LENGTH, LEADER_LENGTH, PREAMBLE};
use crate::Result;
use std::collections::VecDeque;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Backoff when a non-stopping framer sees end-of-stream (live capture
/// from a device that may come back).
const EOF_RETRY: Duration = Duration::from_millis(100);

const READ_CHUNK: usize = 1024;

/// One step of the framed stream, in input order. Concatenating the
/// bytes of every outcome reproduces the input exactly.
#[derive(Debug)]
pub enum Outcome {
    /// A well-formed frame, decoded; inspect the quality flags.
    Message(Message),
    /// A maximal run of bytes that is not part of any well-formed
    /// frame.
    NonRtcm(Vec<u8>),
    EndOfStream,
}

/// Cancels a running [`Framer`] at its next read boundary. Cloneable
/// and usable from another task.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

enum Fill {
    Ready,
    Eof,
    Cancelled,
}

/// Turns a blocking byte source into an ordered sequence of
/// [`Outcome`]s. Not thread-safe; confine one framer (and its decoder)
/// to one task.
pub struct Framer<R> {
    source: R,
    decoder: Decoder,
    buffer: VecDeque<u8>,
    queued: Option<Message>,
    stop_on_eof: bool,
    cancellation: Cancellation,
    finished: bool,
}

impl<R: Read> Framer<R> {
    pub fn new(source: R, decoder: Decoder) -> Framer<R> {
        Framer {
            source,
            decoder,
            buffer: VecDeque::new(),
            queued: None,
            stop_on_eof: true,
            cancellation: Cancellation::default(),
            finished: false,
        }
    }

    /// When `false`, end-of-stream is treated as transient: the framer
    /// backs off and retries instead of terminating. Suits live
    /// capture; the default suits file playback.
    pub fn stop_on_eof(mut self, stop: bool) -> Framer<R> {
        self.stop_on_eof = stop;
        self
    }

    /// Handle that makes the next read boundary return
    /// [`Outcome::EndOfStream`], discarding any partial frame.
    pub fn cancel_handle(&self) -> Cancellation {
        self.cancellation.clone()
    }

    /// The next outcome, in input order. Blocks on the byte source.
    /// Read errors other than end-of-stream are surfaced once.
    pub fn next(&mut self) -> Result<Outcome> {
        if let Some(message) = self.queued.take() {
            return Ok(Outcome::Message(message));
        }
        if self.finished {
            return Ok(Outcome::EndOfStream);
        }
        let mut span = Vec::new();
        loop {
            // shift non-frame bytes into the pending span up to the
            // next preamble
            while let Some(&byte) = self.buffer.front() {
                if byte == PREAMBLE {
                    break;
                }
                span.push(byte);
                self.buffer.pop_front();
            }
            if self.buffer.is_empty() {
                match self.fill(1)? {
                    Fill::Ready => continue,
                    Fill::Eof => return Ok(self.drain_remainder(span)),
                    Fill::Cancelled => return Ok(self.discard()),
                }
            }

            // candidate frame: leader first
            match self.fill(LEADER_LENGTH)? {
                Fill::Ready => {}
                Fill::Eof => return Ok(self.drain_remainder(span)),
                Fill::Cancelled => return Ok(self.discard()),
            }
            let leader = [self.buffer[0], self.buffer[1], self.buffer[2]];
            let payload_length = match parse_leader(&leader) {
                Ok(length) => length,
                Err(_) => {
                    // spurious preamble: its leader joins the span and
                    // scanning resumes at the byte after it
                    span.extend(self.buffer.drain(..LEADER_LENGTH));
                    continue;
                }
            };

            let total = LEADER_LENGTH + payload_length + CRC_LENGTH;
            match self.fill(total)? {
                Fill::Ready => {}
                Fill::Eof => return Ok(self.drain_remainder(span)),
                Fill::Cancelled => return Ok(self.discard()),
            }
            let frame: Vec<u8> = self.buffer.drain(..total).collect();
            let message = self.decoder.decode(frame);
            return Ok(if span.is_empty() {
                Outcome::Message(message)
            } else {
                self.queued = Some(message);
                Outcome::NonRtcm(span)
            });
        }
    }

    // Pull from the source until the buffer holds at least `want`
    // bytes.
    fn fill(&mut self, want: usize) -> Result<Fill> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if self.cancellation.is_cancelled() {
                return Ok(Fill::Cancelled);
            }
            if self.buffer.len() >= want {
                return Ok(Fill::Ready);
            }
            let n = self.source.read(&mut chunk)?;
            if n == 0 {
                if self.stop_on_eof {
                    return Ok(Fill::Eof);
                }
                std::thread::sleep(EOF_RETRY);
                continue;
            }
            self.buffer.extend(&chunk[..n]);
        }
    }

    // End of stream: everything pending becomes one final non-RTCM
    // span.
    fn drain_remainder(&mut self, mut span: Vec<u8>) -> Outcome {
        span.extend(self.buffer.drain(..));
        self.finished = true;
        if span.is_empty() {
            Outcome::EndOfStream
        } else {
            Outcome::NonRtcm(span)
        }
    }

    // Cancellation: partial frames in progress are discarded.
    fn discard(&mut self) -> Outcome {
        self.buffer.clear();
        self.finished = true;
        Outcome::EndOfStream
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::message::crc24q;
    use chrono::{TimeZone, Utc};
    use slog::o;
    use std::io::Cursor;

    fn decoder() -> Decoder {
        Decoder::new(
            Utc.with_ymd_and_hms(2023, 5, 14, 0, 0, 0).unwrap(),
            slog::Logger::root(slog::Discard, o!()),
        )
    }

    // Wrap a payload in a leader and CRC; valid by construction.
    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![
            0xD3,
            (payload.len() >> 8) as u8,
            payload.len() as u8,
        ];
        frame.extend_from_slice(payload);
        let crc = crc24q(&frame);
        frame.extend_from_slice(&[(crc >> 16) as u8, (crc >> 8) as u8, crc as u8]);
        frame
    }

    fn framer(stream: Vec<u8>) -> Framer<Cursor<Vec<u8>>> {
        Framer::new(Cursor::new(stream), decoder())
    }

    #[test]
    fn junk_before_and_after_a_frame() {
        // type 1023 is unknown but the frame is valid
        let valid = frame(&[0x3F, 0xF0, 0x01]);
        let mut stream = b"junk".to_vec();
        stream.extend_from_slice(&valid);
        stream.extend_from_slice(b"tail");
        let mut framer = framer(stream);

        match framer.next().unwrap() {
            Outcome::NonRtcm(bytes) => assert_eq!(bytes, b"junk"),
            other => panic!("expected junk span, got {:?}", other),
        }
        match framer.next().unwrap() {
            Outcome::Message(message) => {
                assert!(message.valid);
                assert_eq!(message.raw, valid);
                assert_eq!(message.message_type, 1023);
            }
            other => panic!("expected message, got {:?}", other),
        }
        match framer.next().unwrap() {
            Outcome::NonRtcm(bytes) => assert_eq!(bytes, b"tail"),
            other => panic!("expected tail span, got {:?}", other),
        }
        assert!(matches!(framer.next().unwrap(), Outcome::EndOfStream));
        assert!(matches!(framer.next().unwrap(), Outcome::EndOfStream));
    }

    #[test]
    fn truncated_frame_becomes_non_rtcm() {
        // claims a 170-byte payload; only the leader and 3 bytes arrive
        let stream = vec![0xD3, 0x00, 0xAA, 0x46, 0x70, 0x00];
        let mut framer = framer(stream.clone());
        match framer.next().unwrap() {
            Outcome::NonRtcm(bytes) => assert_eq!(bytes, stream),
            other => panic!("expected partial frame as non-RTCM, got {:?}", other),
        }
        assert!(matches!(framer.next().unwrap(), Outcome::EndOfStream));
    }

    #[test]
    fn spurious_preamble_joins_the_span() {
        // 0xD3 with reserved leader bits set, then a real frame
        let valid = frame(&[0x3F, 0xF0, 0x01]);
        let mut stream = vec![0x00, 0xD3, 0x40, 0x11];
        stream.extend_from_slice(&valid);
        let mut framer = framer(stream);
        match framer.next().unwrap() {
            Outcome::NonRtcm(bytes) => assert_eq!(bytes, vec![0x00, 0xD3, 0x40, 0x11]),
            other => panic!("expected span, got {:?}", other),
        }
        assert!(matches!(framer.next().unwrap(), Outcome::Message(_)));
    }

    #[test]
    fn corrupted_crc_still_yields_the_frame() {
        let mut corrupted = frame(&[0x3F, 0xF0, 0x01]);
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0xFF;
        let mut framer = framer(corrupted.clone());
        match framer.next().unwrap() {
            Outcome::Message(message) => {
                assert!(message.complete);
                assert!(!message.crc_valid);
                assert!(!message.valid);
                assert_eq!(message.raw, corrupted);
            }
            other => panic!("expected message, got {:?}", other),
        }
    }

    #[test]
    fn byte_conservation() {
        let mut stream = b"\x01\x02".to_vec();
        stream.extend_from_slice(&frame(&[0x3F, 0xF0, 0x01]));
        stream.push(0xD3); // lone preamble at end of stream
        let mut framer = framer(stream.clone());
        let mut reassembled = Vec::new();
        loop {
            match framer.next().unwrap() {
                Outcome::Message(message) => reassembled.extend_from_slice(&message.raw),
                Outcome::NonRtcm(bytes) => reassembled.extend_from_slice(&bytes),
                Outcome::EndOfStream => break,
            }
        }
        assert_eq!(reassembled, stream);
    }

    #[test]
    fn back_to_back_frames() {
        let first = frame(&[0x3F, 0xF0, 0x01]);
        let second = frame(&[0x3F, 0xE0, 0x02, 0x03]);
        let mut stream = first.clone();
        stream.extend_from_slice(&second);
        let mut framer = framer(stream);
        match framer.next().unwrap() {
            Outcome::Message(message) => assert_eq!(message.raw, first),
            other => panic!("expected first frame, got {:?}", other),
        }
        match framer.next().unwrap() {
            Outcome::Message(message) => assert_eq!(message.raw, second),
            other => panic!("expected second frame, got {:?}", other),
        }
        assert!(matches!(framer.next().unwrap(), Outcome::EndOfStream));
    }

    #[test]
    fn cancellation_discards_partial_input() {
        let mut framer = framer(b"pending bytes without any frame".to_vec());
        framer.cancel_handle().cancel();
        assert!(matches!(framer.next().unwrap(), Outcome::EndOfStream));
        assert!(matches!(framer.next().unwrap(), Outcome::EndOfStream));
    }
}
