use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// JSON-lines diagnostics sink shared by the compiler and the traversal
/// evaluator. Cloning shares the same file and counters.
#[derive(Clone)]
pub(crate) struct DebugLogger {
    inner: Arc<Mutex<DebugState>>,
}

struct DebugState {
    writer: BufWriter<File>,
    counters: HashMap<String, u64>,
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(DebugState {
                writer: BufWriter::new(file),
                counters: HashMap::new(),
            })),
        })
    }

    pub fn log_json(&self, json: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = writeln!(state.writer, "{json}");
        }
    }

    pub fn increment(&self, key: &str, amount: u64) {
        if let Ok(mut state) = self.inner.lock() {
            let entry = state.counters.entry(key.to_string()).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    // Selector fragments that compile to the never-matching sentinel.
    pub fn selector_unsupported(&self, selector: &str, reason: &str) {
        self.log_json(&format!(
            "{{\"type\":\"css.selector.unsupported\",\"selector\":{},\"reason\":{}}}",
            json_string(selector),
            json_string(reason)
        ));
        self.increment("css.selector_unsupported", 1);
    }

    pub fn declaration_dropped(&self, property: &str, reason: &str) {
        self.log_json(&format!(
            "{{\"type\":\"css.declaration.dropped\",\"property\":{},\"reason\":{}}}",
            json_string(property),
            json_string(reason)
        ));
        self.increment("css.declaration_dropped", 1);
    }

    pub fn emit_summary(&self, context: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let mut counters: Vec<(String, u64)> = state.counters.drain().collect();
            counters.sort_by(|a, b| a.0.cmp(&b.0));
            let mut counts_json = String::from("{");
            for (idx, (key, value)) in counters.iter().enumerate() {
                if idx > 0 {
                    counts_json.push(',');
                }
                counts_json.push_str(&format!("{}:{}", json_string(key), value));
            }
            counts_json.push('}');
            let json = format!(
                "{{\"type\":\"cascade.summary\",\"context\":{},\"counts\":{}}}",
                json_string(context),
                counts_json
            );
            let _ = writeln!(state.writer, "{json}");
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

pub(crate) fn json_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) fn json_string(raw: &str) -> String {
    format!("\"{}\"", json_escape(raw))
}
