//! Zero-timeout readiness checks on file descriptors.

use std::io;
use std::os::fd::BorrowedFd;

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

/// Readable data (or EOF/hangup) pending.
pub const READABLE: PollFlags = PollFlags::POLLIN;

/// Check whether `fd` is ready for `events` without waiting.
///
/// Hangup and error conditions count as ready so the following read
/// reports them. An interrupted poll reports "not ready".
pub fn is_ready(fd: BorrowedFd<'_>, events: PollFlags) -> io::Result<bool> {
    let mut fds = [PollFd::new(fd, events)];

    match poll(&mut fds, PollTimeout::ZERO) {
        Ok(0) | Err(Errno::EINTR) => Ok(false),
        Ok(_) => Ok(fds[0]
            .revents()
            .is_some_and(|r| r.intersects(events | PollFlags::POLLHUP | PollFlags::POLLERR))),
        Err(errno) => Err(io::Error::from(errno)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::fd::AsFd;
    use std::os::unix::net::UnixStream;

    #[test]
    fn test_idle_then_ready() {
        let (mut tx, rx) = UnixStream::pair().unwrap();
        assert!(!is_ready(rx.as_fd(), READABLE).unwrap());

        tx.write_all(b"x").unwrap();
        assert!(is_ready(rx.as_fd(), READABLE).unwrap());
    }

    #[test]
    fn test_hangup_is_ready() {
        let (tx, rx) = UnixStream::pair().unwrap();
        drop(tx);
        assert!(is_ready(rx.as_fd(), READABLE).unwrap());
    }

    #[test]
    fn test_writable() {
        let (tx, _rx) = UnixStream::pair().unwrap();
        assert!(is_ready(tx.as_fd(), PollFlags::POLLOUT).unwrap());
    }
}
