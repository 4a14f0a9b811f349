//! Host byte sources
//!
//! The bridge shows up as a tty; a capture file reads exactly the same way.
//! Line discipline and baud rate are left to the operating system.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use canlink_hal::UartRx;

/// Errors from a [`StreamRx`]
#[derive(Debug)]
pub enum SerialError {
    /// End of stream
    Closed,
    /// Read failed
    Io(io::Error),
}

/// [`UartRx`] over any [`Read`]
#[derive(Debug)]
pub struct StreamRx<R> {
    reader: R,
}

impl<R: Read> StreamRx<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl StreamRx<BufReader<File>> {
    /// Open a serial device or capture file
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: Read> UartRx for StreamRx<R> {
    type Error = SerialError;

    fn read_blocking(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        loop {
            match self.reader.read(buf) {
                Ok(0) => return Err(SerialError::Closed),
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(SerialError::Io(e)),
            }
        }
    }
}
