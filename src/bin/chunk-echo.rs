//! Echo stdin back to stdout one read at a time, each chunk followed by ','.
//!
//! Reads at most 8 bytes per readiness poll, the same way `canproxy` does,
//! which makes the chunking visible:
//!
//! ```bash
//! printf 'hello, world' | chunk-echo    # hello, w,orld,
//! ```

use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;

use cc16_console::bridge::StdinSource;
use cc16_console::core::frame::MAX_PAYLOAD;
use cc16_console::core::traits::{ConsoleSource, ReadOutcome};

const POLL_INTERVAL: Duration = Duration::from_millis(1);

fn main() -> ExitCode {
    match echo() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("chunk-echo: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn echo() -> io::Result<()> {
    let mut source = StdinSource::new()?;
    let mut out = io::stdout().lock();
    let mut buf = [0u8; MAX_PAYLOAD];

    loop {
        match source.try_read(&mut buf)? {
            ReadOutcome::Data(n) => {
                out.write_all(&buf[..n])?;
                out.write_all(b",")?;
                out.flush()?;
            }
            ReadOutcome::Idle => std::thread::sleep(POLL_INTERVAL),
            ReadOutcome::Closed => return Ok(()),
        }
    }
}
