//! Standard stream endpoints of the bridge.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::error::Result;
use crate::core::frame::CanMessage;
#[cfg(feature = "tracing-support")]
use crate::core::logging::{format_frame, PacketDirection};
use crate::core::traits::FrameListener;

use super::stats::BridgeStats;

#[cfg(unix)]
pub use self::source::StdinSource;

#[cfg(unix)]
mod source {
    use std::fs::File;
    use std::io::{self, Read};
    use std::os::fd::{AsFd, OwnedFd};

    use crate::core::readiness::{is_ready, READABLE};
    use crate::core::traits::{ConsoleSource, ReadOutcome};

    /// Raw, unbuffered reader over standard input.
    ///
    /// Reads go straight to the file descriptor. Going through
    /// `std::io::Stdin` would let its internal buffer swallow bytes that the
    /// readiness check can no longer see.
    pub struct StdinSource {
        file: File,
    }

    impl StdinSource {
        /// Wrap a duplicate of the process's stdin descriptor.
        pub fn new() -> io::Result<Self> {
            let fd = io::stdin().as_fd().try_clone_to_owned()?;
            Ok(Self::from_fd(fd))
        }

        /// Read from an arbitrary descriptor (pipe, socket, tty).
        pub fn from_fd(fd: OwnedFd) -> Self {
            Self {
                file: File::from(fd),
            }
        }
    }

    impl ConsoleSource for StdinSource {
        fn try_read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
            if buf.is_empty() || !is_ready(self.file.as_fd(), READABLE)? {
                return Ok(ReadOutcome::Idle);
            }

            match self.file.read(buf) {
                Ok(0) => Ok(ReadOutcome::Closed),
                Ok(n) => Ok(ReadOutcome::Data(n)),
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                    ) =>
                {
                    Ok(ReadOutcome::Idle)
                }
                Err(e) => Err(e),
            }
        }
    }
}

/// Frame listener writing device console output to a byte sink.
///
/// Only frames tagged `FROM_DEVICE_ID` are written; their payload goes out
/// verbatim and the sink is flushed after every frame.
pub struct StdoutForwarder<W> {
    out: Mutex<W>,
    stats: Arc<BridgeStats>,
}

impl<W: Write + Send> StdoutForwarder<W> {
    /// Forward into `out`.
    pub fn new(out: W, stats: Arc<BridgeStats>) -> Self {
        Self {
            out: Mutex::new(out),
            stats,
        }
    }

    /// Give back the sink.
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StdoutForwarder<io::Stdout> {
    /// Forward into the process's stdout.
    pub fn stdout(stats: Arc<BridgeStats>) -> Self {
        Self::new(io::stdout(), stats)
    }
}

impl<W: Write + Send> FrameListener for StdoutForwarder<W> {
    fn on_frame(&self, frame: &CanMessage) -> Result<()> {
        if !frame.is_from_device() {
            #[cfg(feature = "tracing-support")]
            tracing::trace!("Ignoring {}", format_frame(PacketDirection::Receive, frame));

            self.stats.record_ignored();
            return Ok(());
        }

        let data = embedded_can::Frame::data(frame);
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        out.write_all(data)?;
        out.flush()?;
        self.stats.record_forwarded(data.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::{ConsoleChannel, FROM_DEVICE_ID, TO_DEVICE_ID};

    fn forwarder() -> StdoutForwarder<Vec<u8>> {
        StdoutForwarder::new(Vec::new(), Arc::new(BridgeStats::new()))
    }

    #[test]
    fn test_device_output_is_written_verbatim() {
        let fwd = forwarder();
        let frame = CanMessage::console(ConsoleChannel::FromDevice, &[0xAA]).unwrap();
        fwd.on_frame(&frame).unwrap();
        let frame = CanMessage::console(ConsoleChannel::FromDevice, b"ok\r\n").unwrap();
        fwd.on_frame(&frame).unwrap();

        let snap = fwd.stats.snapshot();
        assert_eq!(snap.frames_forwarded, 2);
        assert_eq!(snap.bytes_from_device, 5);
        assert_eq!(fwd.into_inner(), b"\xAAok\r\n");
    }

    #[test]
    fn test_other_ids_are_dropped() {
        let fwd = forwarder();
        fwd.on_frame(&CanMessage::standard(0x123, &[1, 2]).unwrap())
            .unwrap();
        fwd.on_frame(&CanMessage::extended(TO_DEVICE_ID, &[3]).unwrap())
            .unwrap();
        // Same numeric ID in the standard space is not the console channel.
        fwd.on_frame(&CanMessage::standard(0x7FE, &[4]).unwrap())
            .unwrap();

        assert_eq!(fwd.stats.snapshot().frames_ignored, 3);
        assert!(fwd.into_inner().is_empty());
    }

    #[test]
    fn test_empty_device_frame_writes_nothing() {
        let fwd = forwarder();
        fwd.on_frame(&CanMessage::extended(FROM_DEVICE_ID, &[]).unwrap())
            .unwrap();
        assert_eq!(fwd.stats.snapshot().frames_forwarded, 1);
        assert!(fwd.into_inner().is_empty());
    }

    /// Sink counting flushes separately from writes.
    #[derive(Default)]
    struct FlushCounter {
        written: Vec<u8>,
        flushes: usize,
    }

    impl Write for FlushCounter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_flushes_once_per_device_frame() {
        let fwd = StdoutForwarder::new(FlushCounter::default(), Arc::new(BridgeStats::new()));

        fwd.on_frame(&CanMessage::console(ConsoleChannel::FromDevice, b"abc").unwrap())
            .unwrap();
        fwd.on_frame(&CanMessage::standard(0x123, &[9]).unwrap())
            .unwrap();
        fwd.on_frame(&CanMessage::console(ConsoleChannel::ToDevice, b"x").unwrap())
            .unwrap();
        fwd.on_frame(&CanMessage::console(ConsoleChannel::FromDevice, b"de").unwrap())
            .unwrap();

        let out = fwd.into_inner();
        assert_eq!(out.written, b"abcde");
        assert_eq!(out.flushes, 2);
    }

    #[test]
    fn test_filtered_frames_do_not_flush() {
        let fwd = StdoutForwarder::new(FlushCounter::default(), Arc::new(BridgeStats::new()));
        fwd.on_frame(&CanMessage::extended(TO_DEVICE_ID, &[1]).unwrap())
            .unwrap();
        assert_eq!(fwd.into_inner().flushes, 0);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_errors_are_returned() {
        let fwd = StdoutForwarder::new(BrokenPipe, Arc::new(BridgeStats::new()));
        let frame = CanMessage::console(ConsoleChannel::FromDevice, &[1]).unwrap();
        assert!(fwd.on_frame(&frame).is_err());
    }

    #[cfg(unix)]
    mod source {
        use std::io::Write;
        use std::os::fd::OwnedFd;
        use std::os::unix::net::UnixStream;

        use crate::bridge::StdinSource;
        use crate::core::traits::{ConsoleSource, ReadOutcome};

        fn pair() -> (StdinSource, UnixStream) {
            let (reader, writer) = UnixStream::pair().unwrap();
            (StdinSource::from_fd(OwnedFd::from(reader)), writer)
        }

        #[test]
        fn test_idle_when_nothing_written() {
            let (mut source, _writer) = pair();
            let mut buf = [0u8; 8];
            assert_eq!(source.try_read(&mut buf).unwrap(), ReadOutcome::Idle);
        }

        #[test]
        fn test_reads_at_most_buffer_len() {
            let (mut source, mut writer) = pair();
            writer.write_all(b"0123456789").unwrap();

            let mut buf = [0u8; 8];
            assert_eq!(source.try_read(&mut buf).unwrap(), ReadOutcome::Data(8));
            assert_eq!(&buf, b"01234567");
            assert_eq!(source.try_read(&mut buf).unwrap(), ReadOutcome::Data(2));
            assert_eq!(&buf[..2], b"89");
            assert_eq!(source.try_read(&mut buf).unwrap(), ReadOutcome::Idle);
        }

        #[test]
        fn test_closed_after_writer_dropped() {
            let (mut source, writer) = pair();
            drop(writer);
            let mut buf = [0u8; 8];
            assert_eq!(source.try_read(&mut buf).unwrap(), ReadOutcome::Closed);
        }
    }
}
