//! Synthetic telemetry corpus and the line reader used to load a corpus.

use std::io;
use std::path::Path;

use bytes::{Buf, BytesMut};
use futures::TryStreamExt;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::codec::{Decoder, FramedRead};

use crate::util::utf8;

pub const VOCAB: &[&str] = &[
    "sensor", "imu", "gps", "telemetry", "packet", "error", "warning", "ok",
    "timeout", "retry", "connect", "disconnect", "motor", "servo", "altitude",
    "pressure", "temperature", "voltage", "current", "checksum", "crc",
    "calibration", "startup", "shutdown", "heartbeat", "status", "link",
    "lora", "spi", "i2c", "uart", "nav", "attitude", "quaternion", "timestamp",
];

pub const NOISE: &[&str] = &["user", "system", "daemon", "kernel", "task", "thread", "buffer", "queue"];

pub const LEVELS: &[&str] = &["INFO", "WARN", "ERROR", "DEBUG"];

const MIN_WORDS: usize = 6;
const MAX_WORDS: usize = 14;
const READ_BUFFER_SIZE: usize = 16 * 4096;

/// VOCAB twice followed by NOISE, so telemetry words are drawn twice as often.
fn word_pool() -> Vec<&'static str> {
    VOCAB.iter().chain(VOCAB).chain(NOISE).copied().collect()
}

/// Deterministic log-like lines: `"{LEVEL} event={i} w1 .. wn"`.
pub fn generate_lines(num_lines: usize, seed: u64) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    let pool = word_pool();
    let mut lines = Vec::with_capacity(num_lines);
    for i in 0..num_lines {
        let level = LEVELS.choose(&mut rng).copied().unwrap_or("INFO");
        let n_words = rng.random_range(MIN_WORDS..=MAX_WORDS);
        let mut line = format!("{} event={}", level, i);
        for _ in 0..n_words {
            if let Some(word) = pool.choose(&mut rng) {
                line.push(' ');
                line.push_str(word);
            }
        }
        lines.push(line);
    }
    lines
}

/// Generate `num_lines` lines and write them to `path`, one per line.
pub async fn write_dataset(path: &Path, num_lines: usize, seed: u64) -> io::Result<()> {
    let file = File::create(path).await?;
    let mut out = BufWriter::new(file);
    for line in generate_lines(num_lines, seed) {
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
    }
    out.flush().await?;
    Ok(())
}

/// Decodes newline separated text into trimmed, non-empty lines.
#[derive(Debug, Default)]
pub struct NonEmptyLineCodec {
    next_index: usize,
}

impl NonEmptyLineCodec {
    pub fn new() -> Self {
        NonEmptyLineCodec { next_index: 0 }
    }

    fn trimmed(raw: &[u8]) -> Result<Option<String>, io::Error> {
        let line = utf8(raw)?.trim();
        if line.is_empty() {
            Ok(None)
        } else {
            Ok(Some(line.to_owned()))
        }
    }
}

impl Decoder for NonEmptyLineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        loop {
            let newline = buf[self.next_index..].iter().position(|b| *b == b'\n');
            let offset = match newline {
                Some(offset) => self.next_index + offset,
                None => {
                    self.next_index = buf.len();
                    return Ok(None);
                }
            };
            self.next_index = 0;
            let raw = buf.split_to(offset + 1);
            if let Some(line) = Self::trimmed(&raw[..offset])? {
                return Ok(Some(line));
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        // No terminating newline - return remaining data, if any
        self.next_index = 0;
        if buf.is_empty() {
            return Ok(None);
        }
        let rest = buf.split();
        let line = Self::trimmed(rest.chunk())?;
        Ok(line)
    }
}

/// Read every non-empty line of `path`, trimmed, in file order.
pub async fn read_dataset(path: &Path) -> io::Result<Vec<String>> {
    let file = File::open(path).await?;
    FramedRead::with_capacity(file, NonEmptyLineCodec::new(), READ_BUFFER_SIZE)
        .try_collect()
        .await
}
