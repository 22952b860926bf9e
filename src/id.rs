//! ID generation utilities for chunkd
//!
//! Provides functions for generating unique identifiers for tasks and chunks.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn generate_id(prefix: &str) -> String {
    let random: u32 = rand::rng().random();
    format!("{}-{}-{:08x}", prefix, now_ms(), random)
}

/// Generate a unique task ID
///
/// Format: `task-{timestamp_ms}-{random_hex}`
/// Example: `task-1738300800123-a1b2c3d4`
pub fn generate_task_id() -> String {
    generate_id("task")
}

/// Generate a unique chunk ID
///
/// Format: `chunk-{timestamp_ms}-{random_hex}`
pub fn generate_chunk_id() -> String {
    generate_id("chunk")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_returns_reasonable_timestamp() {
        let ts = now_ms();
        // Should be after 2020-01-01 and before 2100-01-01
        assert!(ts > 1577836800000);
        assert!(ts < 4102444800000);
    }

    #[test]
    fn test_generate_task_id_format() {
        let id = generate_task_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "task");
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_chunk_id_prefix() {
        let id = generate_chunk_id();
        assert!(id.starts_with("chunk-"));
    }

    #[test]
    fn test_generate_ids_are_unique() {
        let ids: std::collections::HashSet<String> = (0..100).map(|_| generate_chunk_id()).collect();
        assert_eq!(ids.len(), 100);
    }
}
