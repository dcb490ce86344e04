/// Human-readable byte count using 1024 steps, e.g. `1.5KB`, `0.0B`.
pub fn format_size(bytes: u64) -> String {
    let mut num = bytes as f64;
    for unit in ["", "K", "M", "G", "T", "P", "E", "Z"] {
        if num.abs() < 1024.0 {
            return format!("{num:3.1}{unit}B");
        }
        num /= 1024.0;
    }
    format!("{num:.1}YiB")
}
