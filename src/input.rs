use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};

/// Unified input reader that handles both file and pipe input with buffered reading
pub struct InputReader {
    reader: Box<dyn Read>,
    is_pipe: bool,
}

impl InputReader {
    /// Create a new InputReader from a path
    /// Use "-" for stdin pipe input
    pub fn new<P: AsRef<Path>>(input_path: P) -> Result<Self> {
        let path = input_path.as_ref();
        let is_pipe = path.as_os_str() == "-";

        let reader: Box<dyn Read> = if is_pipe {
            Box::new(io::stdin().lock())
        } else {
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        };

        Ok(Self { reader, is_pipe })
    }

    /// Check if this is pipe input
    pub fn is_pipe(&self) -> bool {
        self.is_pipe
    }
}

impl Read for InputReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}
