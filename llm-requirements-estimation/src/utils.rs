use chrono::{DateTime, Local};
use fancy_regex::Regex;

pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    Regex::new(r"(?<=\d)(?=(\d{3})+$)").map_or_else(|_| digits.clone(), |re| re.replace_all(&digits, ",").to_string())
}

pub fn format_context_length(length: u32) -> String {
    format!("{}k", length / 1024)
}

pub fn format_timestamp(timestamp: &DateTime<Local>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// KV cache share of a single user.
pub fn per_user(kv_gb: f64, users: u32) -> f64 {
    kv_gb / f64::from(users.max(1))
}

/// The preset after `current`, wrapping to the first.
pub fn next_preset(presets: &[u32], current: u32) -> u32 {
    let first = presets.first().copied().unwrap_or(current);
    presets
        .iter()
        .position(|&p| current <= p)
        .and_then(|i| presets.get(i + 1))
        .copied()
        .unwrap_or(first)
}

/// The preset before `current`, wrapping to the last.
pub fn prev_preset(presets: &[u32], current: u32) -> u32 {
    let last = presets.last().copied().unwrap_or(current);
    presets
        .iter()
        .rposition(|&p| current >= p)
        .filter(|&i| i > 0)
        .map_or(last, |i| presets[i - 1])
}

/// Shortens a model id to `max` characters, keeping `org/../name` when that fits.
pub fn truncate_model_id(model_id: &str, max: usize) -> String {
    let len = model_id.chars().count();
    if len <= max {
        return model_id.to_string();
    }
    if let (Some((org, _)), Some((_, name))) = (model_id.split_once('/'), model_id.rsplit_once('/')) {
        if org.chars().count() + name.chars().count() + 4 <= max {
            return format!("{org}/../{name}");
        }
    }
    let keep = max.saturating_sub(3);
    format!("{}...", model_id.chars().take(keep).collect::<String>())
}
