const KB: f64 = 1024.0;
const MB: f64 = KB * 1024.0;
const GB: f64 = MB * 1024.0;

/// Human-readable rendering of a metric value, chosen by the metric name.
///
/// # Examples
///
/// ```
/// use monres_notify::format::format_value;
///
/// assert_eq!(format_value("net_recv_bytes_ps", 1536.0), "1.5 KB/s");
/// assert_eq!(format_value("mem_percent_used", 85.54), "85.5%");
/// assert_eq!(format_value("load", 1.0), "1.00");
/// ```
pub fn format_value(metric_name: &str, value: f64) -> String {
    if metric_name.ends_with("_bytes_ps") {
        format_bytes_per_sec(value)
    } else if metric_name.contains("_percent_") {
        format!("{value:.1}%")
    } else {
        format!("{value:.2}")
    }
}

pub fn format_bytes_per_sec(bytes: f64) -> String {
    if bytes >= GB {
        format!("{:.1} GB/s", bytes / GB)
    } else if bytes >= MB {
        format!("{:.1} MB/s", bytes / MB)
    } else if bytes >= KB {
        format!("{:.1} KB/s", bytes / KB)
    } else {
        format!("{bytes:.1} B/s")
    }
}
