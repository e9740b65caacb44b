/*
 *  crashlog.rs
 *
 *  trixel - every frame counts
 *  (c) 2025-26
 *
 *  Tiered-durability crash log and power-loss-surviving boot counter
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::backtrace::{Backtrace, BacktraceStatus};
use std::collections::VecDeque;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;
use log::{error, info, warn};

use crate::metrics;

/// Events buffered in memory when the log file is unwritable.
pub const DEFAULT_RING_CAPACITY: usize = 50;

const BANNER: &str = "============================================================";
const RULE: &str = "------------------------------------------------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARNING"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Crash logger with file-first writes, a bounded in-memory fallback
/// ring, and a one-byte boot counter that survives power cycles.
///
/// Construction never fails: when the log path is unwritable every entry
/// lands in the ring instead, oldest dropped on overflow, and
/// [`CrashLogger::flush_ring`] drains it once the storage comes back.
pub struct CrashLogger {
    log_path: PathBuf,
    counter_path: PathBuf,
    boot_time: Instant,
    crash_count: u8,
    ring: VecDeque<String>,
    ring_capacity: usize,
}

impl CrashLogger {
    pub fn new(log_path: PathBuf, counter_path: PathBuf, ring_capacity: usize) -> Self {
        let previous = read_counter(&counter_path);
        let crash_count = previous.wrapping_add(1);

        let mut logger = Self {
            log_path,
            counter_path,
            boot_time: Instant::now(),
            crash_count,
            ring: VecDeque::new(),
            ring_capacity: ring_capacity.max(1),
        };

        // Persist the incremented counter before anything else can crash.
        if let Err(e) = fs::write(&logger.counter_path, [crash_count]) {
            warn!(
                "cannot persist boot counter to {}: {}",
                logger.counter_path.display(),
                e
            );
            logger.buffer(format!("[00000.00] WARNING: boot counter not persisted: {}\n", e));
        }

        logger.log_boot();
        logger
    }

    fn log_boot(&mut self) {
        let snapshot = metrics::MachineMetrics::snapshot();
        let mut banner = String::new();
        banner.push_str(&format!("\n{}\n", BANNER));
        banner.push_str(&format!("BOOT at {}\n", Local::now().format("%Y-%m-%d %H:%M:%S")));
        banner.push_str(&format!("Boot count: {}\n", self.crash_count));
        banner.push_str("Uptime clock reset (t=0.00s)\n");
        banner.push_str(&format!("Available memory: {} KiB\n", snapshot.mem_avail_kib));
        banner.push_str(&format!("Load: {:.2}\n", snapshot.load_1m));
        banner.push_str(&format!("{}\n", BANNER));

        info!("boot {} logged", self.crash_count);
        self.write(banner);
    }

    /// Seconds since this logger was constructed.
    pub fn uptime(&self) -> f64 {
        self.boot_time.elapsed().as_secs_f64()
    }

    /// Boot counter value for this run (already incremented).
    pub fn crash_count(&self) -> u8 {
        self.crash_count
    }

    /// Number of entries waiting in the fallback ring.
    pub fn buffered(&self) -> usize {
        self.ring.len()
    }

    fn buffer(&mut self, entry: String) {
        self.ring.push_back(entry);
        while self.ring.len() > self.ring_capacity {
            self.ring.pop_front();
        }
    }

    /// File first, ring on failure. Returns whether the file took it.
    fn write(&mut self, entry: String) -> bool {
        let appended = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.log_path)
            .and_then(|mut f| f.write_all(entry.as_bytes()));

        match appended {
            Ok(()) => true,
            Err(_) => {
                self.buffer(entry);
                false
            }
        }
    }

    /// Log a one-line event with uptime stamp and level.
    pub fn log_event(&mut self, message: &str, level: LogLevel) {
        let line = format!("[{:08.2}] {}: {}\n", self.uptime(), level, message);
        match level {
            LogLevel::Info => info!("{}", line.trim_end()),
            LogLevel::Warning => warn!("{}", line.trim_end()),
            LogLevel::Error => error!("{}", line.trim_end()),
        }
        self.write(line);
    }

    /// Log an error with context, its type, its source chain, a memory
    /// snapshot, and a backtrace when one can be captured. An
    /// uncapturable trace is noted in the entry rather than silently
    /// skipped.
    pub fn log_exception<E: std::error::Error>(&mut self, err: &E, context: &str) {
        let mut block = String::new();
        block.push_str(&format!("\n{}\n", BANNER));
        block.push_str(&format!("EXCEPTION at {:.2}s\n", self.uptime()));
        if !context.is_empty() {
            block.push_str(&format!("Context: {}\n", context));
        }
        block.push_str(&format!("Type: {}\n", std::any::type_name::<E>()));
        block.push_str(&format!("Error: {}\n", err));
        let mut source = err.source();
        while let Some(cause) = source {
            block.push_str(&format!("Caused by: {}\n", cause));
            source = cause.source();
        }
        block.push_str(&format!(
            "Available memory: {} KiB\n",
            metrics::mem_available_kib()
        ));
        block.push_str(&format!("{}\n", RULE));

        let trace = Backtrace::capture();
        match trace.status() {
            BacktraceStatus::Captured => {
                block.push_str(&format!("{}\n", trace));
            }
            _ => {
                block.push_str("Backtrace unavailable (RUST_BACKTRACE not enabled)\n");
            }
        }
        block.push_str(&format!("{}\n", BANNER));

        error!("{}: {}", context, err);
        self.write(block);
    }

    /// Drain the ring into the log file. The ring is cleared only when the
    /// whole dump lands; a failed flush leaves it intact for the next try.
    pub fn flush_ring(&mut self) -> bool {
        if self.ring.is_empty() {
            return true;
        }

        let dumped = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.log_path)
            .and_then(|mut f| {
                f.write_all(b"\n=== BUFFERED EVENTS ===\n")?;
                for entry in &self.ring {
                    f.write_all(entry.as_bytes())?;
                }
                f.write_all(b"=== END BUFFERED EVENTS ===\n")
            });

        match dumped {
            Ok(()) => {
                info!("flushed {} buffered log entries", self.ring.len());
                self.ring.clear();
                true
            }
            Err(_) => false,
        }
    }

    /// Log contents, optionally limited to the last `max_lines` lines.
    /// When the file is unreadable the fallback ring is returned instead,
    /// so the endpoint still has something to show.
    pub fn get_log_contents(&self, max_lines: Option<usize>) -> String {
        match fs::read_to_string(&self.log_path) {
            Ok(text) => tail(&text, max_lines),
            Err(e) if !self.ring.is_empty() => {
                let buffered: String = self.ring.iter().map(String::as_str).collect();
                format!(
                    "[log file unavailable: {}; buffered events follow]\n{}",
                    e,
                    tail(&buffered, max_lines)
                )
            }
            Err(e) => format!("Error reading log file: {}\n", e),
        }
    }

    /// Truncate the log file, leaving a marker line.
    pub fn clear_log(&mut self) -> bool {
        match fs::write(
            &self.log_path,
            format!("Log cleared at {:.2}s\n", self.uptime()),
        ) {
            Ok(()) => true,
            Err(e) => {
                warn!("cannot clear {}: {}", self.log_path.display(), e);
                false
            }
        }
    }

    /// Zero the persistent boot counter. Operator action only.
    pub fn reset_crash_counter(&mut self) {
        if let Err(e) = fs::write(&self.counter_path, [0u8]) {
            warn!(
                "cannot reset boot counter at {}: {}",
                self.counter_path.display(),
                e
            );
        }
        self.crash_count = 0;
        self.log_event("Crash counter reset", LogLevel::Info);
    }
}

fn read_counter(path: &Path) -> u8 {
    match fs::read(path) {
        Ok(bytes) => bytes.first().copied().unwrap_or(0),
        Err(_) => 0,
    }
}

fn tail(text: &str, max_lines: Option<usize>) -> String {
    match max_lines {
        None => text.to_string(),
        Some(n) => {
            let lines: Vec<&str> = text.lines().collect();
            let start = lines.len().saturating_sub(n);
            let mut out = lines[start..].join("\n");
            if !out.is_empty() {
                out.push('\n');
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use thiserror::Error;

    static NEXT: AtomicUsize = AtomicUsize::new(0);

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "trixel-crashlog-{}-{}",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::SeqCst)
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn logger_at(dir: &Path) -> CrashLogger {
        CrashLogger::new(
            dir.join("crash.log"),
            dir.join("crash.count"),
            DEFAULT_RING_CAPACITY,
        )
    }

    #[derive(Debug, Error)]
    #[error("outer trouble")]
    struct Outer(#[source] Inner);

    #[derive(Debug, Error)]
    #[error("inner cause")]
    struct Inner;

    #[test]
    fn counter_increments_once_per_boot() {
        let dir = temp_dir();
        let first = logger_at(&dir);
        assert_eq!(first.crash_count(), 1);
        drop(first);

        let second = logger_at(&dir);
        assert_eq!(second.crash_count(), 2);
        assert_eq!(fs::read(dir.join("crash.count")).unwrap(), vec![2]);
    }

    #[test]
    fn counter_wraps_at_256() {
        let dir = temp_dir();
        fs::write(dir.join("crash.count"), [255u8]).unwrap();
        let logger = logger_at(&dir);
        assert_eq!(logger.crash_count(), 0);
    }

    #[test]
    fn events_do_not_touch_the_counter() {
        let dir = temp_dir();
        let mut logger = logger_at(&dir);
        logger.log_event("one", LogLevel::Info);
        logger.log_exception(&Inner, "test");
        assert_eq!(logger.crash_count(), 1);
        assert_eq!(fs::read(dir.join("crash.count")).unwrap(), vec![1]);
    }

    #[test]
    fn reset_zeroes_counter_and_byte() {
        let dir = temp_dir();
        let mut logger = logger_at(&dir);
        logger.reset_crash_counter();
        assert_eq!(logger.crash_count(), 0);
        assert_eq!(fs::read(dir.join("crash.count")).unwrap(), vec![0]);
    }

    #[test]
    fn events_append_with_level_and_stamp() {
        let dir = temp_dir();
        let mut logger = logger_at(&dir);
        logger.log_event("panel swapped", LogLevel::Info);
        logger.log_event("link flapped", LogLevel::Warning);

        let contents = fs::read_to_string(dir.join("crash.log")).unwrap();
        assert!(contents.contains("INFO: panel swapped"));
        assert!(contents.contains("WARNING: link flapped"));
        assert!(contents.contains("Boot count: 1"));
    }

    #[test]
    fn exception_blocks_carry_cause_chain() {
        let dir = temp_dir();
        let mut logger = logger_at(&dir);
        logger.log_exception(&Outer(Inner), "POST /display handler");

        let contents = fs::read_to_string(dir.join("crash.log")).unwrap();
        assert!(contents.contains("Context: POST /display handler"));
        assert!(contents.contains("Type: "));
        assert!(contents.contains("Error: outer trouble"));
        assert!(contents.contains("Caused by: inner cause"));
        // Either a real trace or the explicit unavailability note.
        assert!(contents.contains("Backtrace") || contents.contains("backtrace"));
    }

    #[test]
    fn tail_returns_exactly_n_lines() {
        let dir = temp_dir();
        let mut logger = logger_at(&dir);
        logger.clear_log();
        logger.log_event("first", LogLevel::Info);
        logger.log_event("second", LogLevel::Info);
        logger.log_event("third", LogLevel::Info);

        let out = logger.get_log_contents(Some(2));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("second"));
        assert!(lines[1].contains("third"));
    }

    #[test]
    fn unwritable_path_falls_back_to_ring() {
        let dir = temp_dir();
        let missing = dir.join("not-yet-created");
        let mut logger = CrashLogger::new(
            missing.join("crash.log"),
            missing.join("crash.count"),
            3,
        );

        for i in 0..5 {
            logger.log_event(&format!("event {}", i), LogLevel::Info);
        }
        // Capacity 3: the boot banner and the earliest events fell out.
        assert_eq!(logger.buffered(), 3);
        let contents = logger.get_log_contents(None);
        assert!(contents.contains("event 4"));
        assert!(!contents.contains("event 1"));

        // Storage comes back: the ring drains into the file once.
        fs::create_dir_all(&missing).unwrap();
        assert!(logger.flush_ring());
        assert_eq!(logger.buffered(), 0);
        let contents = fs::read_to_string(missing.join("crash.log")).unwrap();
        assert!(contents.contains("event 4"));
        assert!(contents.contains("BUFFERED EVENTS"));
    }

    #[test]
    fn failed_flush_keeps_ring_intact() {
        let dir = temp_dir();
        let missing = dir.join("never-created");
        let mut logger = CrashLogger::new(
            missing.join("crash.log"),
            missing.join("crash.count"),
            8,
        );
        logger.log_event("only in memory", LogLevel::Error);
        let before = logger.buffered();
        assert!(!logger.flush_ring());
        assert_eq!(logger.buffered(), before);
    }

    #[test]
    fn clear_log_truncates_with_marker() {
        let dir = temp_dir();
        let mut logger = logger_at(&dir);
        logger.log_event("soon gone", LogLevel::Info);
        assert!(logger.clear_log());

        let contents = fs::read_to_string(dir.join("crash.log")).unwrap();
        assert!(contents.starts_with("Log cleared at"));
        assert!(!contents.contains("soon gone"));
    }
}
