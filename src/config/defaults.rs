//! Default values for configuration

/// 512 KiB
pub const DEFAULT_MAX_CONTENT_LENGTH: u64 = 512 * 1024;

/// Number of links that may wait in the frontier before producers block
pub fn default_url_buffer_size() -> usize {
    10_000
}

/// Number of concurrent crawl workers
pub fn default_worker_count() -> usize {
    10
}

/// Idle check interval in milliseconds
pub fn default_idle_work_check_interval() -> u64 {
    5_000
}

/// Raw max content length setting (0 selects [`DEFAULT_MAX_CONTENT_LENGTH`])
pub fn default_max_content_length() -> i64 {
    0
}

/// User agent sent with every request
pub fn default_user_agent() -> String {
    format!("driftnet/{}", env!("CARGO_PKG_VERSION"))
}

/// Per-request timeout applied by the HTTP fetcher
pub fn default_timeout_secs() -> u64 {
    30
}
