// Structured trace logging for probe campaigns

use std::collections::HashMap;
use std::env;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Local;
use flate2::{write::GzEncoder, Compression};
use fs2::FileExt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Hardcoded configuration - no environment variables needed
const LOG_ROTATION_SIZE_MB: u64 = 8;
const MAX_ARCHIVES: u32 = 5;
const ROTATION_CHECK_INTERVAL: u32 = 200;

#[derive(Serialize, Deserialize, Debug, Clone)]
struct TraceEntry {
    timestamp: String,                          // ISO-8601 with timezone
    level: String,                              // DEBUG, ERROR, PROBE, CAMPAIGN, RETRY
    component: String,                          // Component name
    event: String,                              // Event type
    message: String,                            // Human readable message (redacted)
    correlation_id: Option<String>,             // For tracking one run's events
    fields: HashMap<String, serde_json::Value>, // Structured data
}

struct RotatingTraceLog {
    log_path: PathBuf,
    write_count: AtomicU32,
}

impl RotatingTraceLog {
    fn new(log_path: PathBuf) -> Self {
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        Self {
            log_path,
            write_count: AtomicU32::new(0),
        }
    }

    fn write_with_rotation(&self, json_line: &str) -> Result<(), std::io::Error> {
        // Check for rotation every ROTATION_CHECK_INTERVAL writes
        if self.write_count.fetch_add(1, Ordering::Relaxed) % ROTATION_CHECK_INTERVAL == 0 {
            let _ = self.rotate_if_needed(); // Don't let rotation errors stop logging
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        writeln!(file, "{}", json_line)?;
        Ok(())
    }

    fn rotate_if_needed(&self) -> Result<(), std::io::Error> {
        if !self.needs_rotation()? {
            return Ok(());
        }

        // File locking to prevent concurrent rotation
        let lock_path = self.log_path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)?;

        match lock_file.try_lock_exclusive() {
            Ok(()) => {
                // Double-check after acquiring the lock
                if self.needs_rotation()? {
                    self.perform_rotation()?;
                }
                let _ = std::fs::remove_file(&lock_path);
                Ok(())
            }
            Err(_) => {
                // Another process is rotating, skip this time
                Ok(())
            }
        }
    }

    fn needs_rotation(&self) -> Result<bool, std::io::Error> {
        if !self.log_path.exists() {
            return Ok(false);
        }

        let metadata = std::fs::metadata(&self.log_path)?;
        Ok(metadata.len() >= LOG_ROTATION_SIZE_MB * 1024 * 1024)
    }

    fn perform_rotation(&self) -> Result<(), std::io::Error> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let base_name = match self.log_path.file_stem().and_then(|stem| stem.to_str()) {
            Some(name) => name.to_string(),
            None => return Ok(()),
        };
        let parent = match self.log_path.parent() {
            Some(parent) => parent,
            None => return Ok(()),
        };
        let archive_path = parent.join(format!("{}.{}.gz", base_name, timestamp));

        // Atomic rotation: move current log aside, compress, cleanup
        let temp_path = self.log_path.with_extension("rotating");
        std::fs::rename(&self.log_path, &temp_path)?;

        let source_file = File::open(&temp_path)?;
        let target_file = File::create(&archive_path)?;
        let mut encoder = GzEncoder::new(target_file, Compression::default());
        std::io::copy(&mut BufReader::new(source_file), &mut encoder)?;
        encoder.finish()?;

        std::fs::remove_file(&temp_path)?;

        // Keep only the most recent MAX_ARCHIVES
        let _ = self.cleanup_old_archives(&base_name, parent);

        Ok(())
    }

    fn cleanup_old_archives(
        &self,
        base_name: &str,
        log_dir: &std::path::Path,
    ) -> Result<(), std::io::Error> {
        let mut archives = Vec::new();
        for entry in std::fs::read_dir(log_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();

            if name.starts_with(&format!("{}.", base_name)) && name.ends_with(".gz") {
                archives.push((entry.path(), entry.metadata()?.modified()?));
            }
        }

        archives.sort_by_key(|(_, modified)| *modified);
        if archives.len() > MAX_ARCHIVES as usize {
            let to_remove = archives.len() - MAX_ARCHIVES as usize;
            for (path, _) in archives.iter().take(to_remove) {
                let _ = std::fs::remove_file(path); // Ignore individual cleanup errors
            }
        }

        Ok(())
    }
}

/// Structured JSONL trace logger for probe campaigns.
///
/// Disabled unless the `EDGEPROBE_DEBUG` environment variable opts in, so the
/// harness stays silent in normal runs. Every message passes a redaction
/// filter before it reaches disk: the harness handles OAuth material and
/// bearer tokens that must never land in a log file.
pub struct TraceLogger {
    enabled: bool,
    log: Option<Arc<Mutex<RotatingTraceLog>>>,
    run_id: String, // Correlation ID for this run
    redaction_patterns: Vec<Regex>,
}

impl TraceLogger {
    pub fn new() -> Self {
        let enabled = Self::parse_debug_enabled();
        let run_id = Uuid::new_v4().to_string()[..8].to_string();

        let log = if enabled {
            Some(Arc::new(Mutex::new(RotatingTraceLog::new(
                Self::default_log_path(),
            ))))
        } else {
            None
        };

        // Compile redaction patterns once at startup
        let redaction_patterns = Self::compile_redaction_patterns();

        Self {
            enabled,
            log,
            run_id,
            redaction_patterns,
        }
    }

    /// Parse debug enabled status from EDGEPROBE_DEBUG environment variable only.
    /// Supports: true/false, 1/0, yes/no, on/off (case insensitive)
    fn parse_debug_enabled() -> bool {
        env::var("EDGEPROBE_DEBUG")
            .map(|v| match v.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => true,
                _ => false,
            })
            .unwrap_or(false)
    }

    fn default_log_path() -> PathBuf {
        let mut log_path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        log_path.push(".edgeprobe");
        log_path.push("edgeprobe-trace.log");
        log_path
    }

    /// Redirect trace output, for tests
    pub fn with_log_path(mut self, log_path: PathBuf) -> Self {
        if self.enabled {
            self.log = Some(Arc::new(Mutex::new(RotatingTraceLog::new(log_path))));
        }
        self
    }

    fn compile_redaction_patterns() -> Vec<Regex> {
        let patterns = [
            r"(?i)authorization[:\s]+[^\s\n]+",
            r"(?i)bearer[:\s]+[^\s\n]+",
            r"(?i)oauth[:\s]+[^\s\n]+",
            r"(?i)token[:\s]+[^\s\n]+",
            r"(?i)secret[:\s]+[^\s\n]+",
        ];

        patterns
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
    }

    fn redact_sensitive_data(&self, text: &str) -> String {
        let mut redacted = text.to_string();

        for regex in &self.redaction_patterns {
            redacted = regex.replace_all(&redacted, "[REDACTED]").to_string();
        }

        // Redact suspiciously long bare strings (potential tokens)
        if redacted.len() > 100
            && !redacted.contains(' ')
            && redacted
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "-_".contains(c))
        {
            redacted = format!("[REDACTED_LONG_STRING_{}chars]", redacted.len());
        }

        redacted
    }

    fn log_entry(
        &self,
        level: &str,
        component: &str,
        event: &str,
        message: &str,
        fields: HashMap<String, serde_json::Value>,
    ) {
        if !self.enabled {
            return;
        }

        let entry = TraceEntry {
            timestamp: Local::now().to_rfc3339(),
            level: level.to_string(),
            component: component.to_string(),
            event: event.to_string(),
            message: self.redact_sensitive_data(message),
            correlation_id: Some(self.run_id.clone()),
            fields,
        };

        if let Some(log) = &self.log {
            if let Ok(log) = log.lock() {
                if let Ok(json_line) = serde_json::to_string(&entry) {
                    let _ = log.write_with_rotation(&json_line); // Don't crash on logging errors
                }
            }
        }
    }

    pub fn debug(&self, component: &str, message: &str) {
        self.log_entry("DEBUG", component, "debug", message, HashMap::new());
    }

    pub fn error(&self, component: &str, message: &str) {
        self.log_entry("ERROR", component, "error", message, HashMap::new());
    }

    // Typed methods for probe campaign events

    pub fn probe_issued(&self, cname: &str, pinned_node: Option<&str>, url: &str) {
        let mut fields = HashMap::new();
        fields.insert(
            "cname".to_string(),
            serde_json::Value::String(cname.to_string()),
        );
        fields.insert("url".to_string(), serde_json::Value::String(url.to_string()));
        if let Some(node) = pinned_node {
            fields.insert(
                "pinned_node".to_string(),
                serde_json::Value::String(node.to_string()),
            );
        }

        self.log_entry(
            "PROBE",
            "EdgeProbe",
            "probe_issued",
            &format!("GET {}...", url),
            fields,
        );
    }

    pub fn probe_completed(&self, cname: &str, node: &str, cache_status: &str, latency_ms: u64) {
        let mut fields = HashMap::new();
        fields.insert(
            "cname".to_string(),
            serde_json::Value::String(cname.to_string()),
        );
        fields.insert(
            "node".to_string(),
            serde_json::Value::String(node.to_string()),
        );
        fields.insert(
            "cache_status".to_string(),
            serde_json::Value::String(cache_status.to_string()),
        );
        fields.insert(
            "latency_ms".to_string(),
            serde_json::Value::Number(latency_ms.into()),
        );

        self.log_entry(
            "PROBE",
            "EdgeProbe",
            "probe_completed",
            &format!("{} served by {}: {} ({}ms)", cname, node, cache_status, latency_ms),
            fields,
        );
    }

    pub fn cache_verdict(&self, resource_id: &str, node: &str, verdict: &str) {
        let mut fields = HashMap::new();
        fields.insert(
            "resource_id".to_string(),
            serde_json::Value::String(resource_id.to_string()),
        );
        fields.insert(
            "node".to_string(),
            serde_json::Value::String(node.to_string()),
        );
        fields.insert(
            "verdict".to_string(),
            serde_json::Value::String(verdict.to_string()),
        );

        self.log_entry(
            "CAMPAIGN",
            "CampaignRunner",
            "cache_verdict",
            &format!("[{}] on [{}]: {}", resource_id, node, verdict),
            fields,
        );
    }

    pub fn campaign_summary(&self, passed: bool, resource_count: usize, duration_ms: u64) {
        let mut fields = HashMap::new();
        fields.insert("passed".to_string(), serde_json::Value::Bool(passed));
        fields.insert(
            "resource_count".to_string(),
            serde_json::Value::Number(resource_count.into()),
        );
        fields.insert(
            "duration_ms".to_string(),
            serde_json::Value::Number(duration_ms.into()),
        );

        self.log_entry(
            "CAMPAIGN",
            "CampaignRunner",
            "campaign_summary",
            &format!(
                "Campaign over {} resources {} in {}ms",
                resource_count,
                if passed { "passed" } else { "did not pass" },
                duration_ms
            ),
            fields,
        );
    }

    pub fn retry_attempt(&self, check: &str, attempt: u32, max_attempts: u32, reason: &str) {
        let mut fields = HashMap::new();
        fields.insert(
            "check".to_string(),
            serde_json::Value::String(check.to_string()),
        );
        fields.insert("attempt".to_string(), serde_json::Value::Number(attempt.into()));
        fields.insert(
            "max_attempts".to_string(),
            serde_json::Value::Number(max_attempts.into()),
        );

        self.log_entry(
            "RETRY",
            "RetryCheck",
            "attempt_failed",
            &format!(
                "Attempt #{} of {} for [{}] failed: {}",
                attempt, max_attempts, check, reason
            ),
            fields,
        );
    }

    pub fn retry_exhausted(&self, check: &str, attempts: u32) {
        let mut fields = HashMap::new();
        fields.insert(
            "check".to_string(),
            serde_json::Value::String(check.to_string()),
        );
        fields.insert(
            "attempts".to_string(),
            serde_json::Value::Number(attempts.into()),
        );

        self.log_entry(
            "RETRY",
            "RetryCheck",
            "attempts_exhausted",
            &format!("All {} attempts for [{}] failed", attempts, check),
            fields,
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl Default for TraceLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// Factory for the process-wide trace logger configuration
pub fn logger() -> TraceLogger {
    TraceLogger::new()
}
