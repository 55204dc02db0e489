#[must_use]
pub fn bytes_to_human_readable(byte_count: usize) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"];

    if byte_count == 0 {
        return "0 B".to_string();
    }

    let base = byte_count.ilog2() / 10; // log2(1024) = 10

    let index = std::cmp::min(base, (UNITS.len() - 1) as u32);
    let basis = 1usize << (10 * index);
    let scaled_value = (byte_count as f64) / (basis as f64);
    let unit = UNITS[index as usize];
    if index == 0 {
        format!("{byte_count} {unit}")
    } else {
        format!("{scaled_value:.2} {unit}")
    }
}

#[cfg(test)]
mod tests {
    use super::bytes_to_human_readable;

    #[test]
    fn formats_binary_units() {
        assert_eq!(bytes_to_human_readable(0), "0 B");
        assert_eq!(bytes_to_human_readable(512), "512 B");
        assert_eq!(bytes_to_human_readable(1024), "1.00 KiB");
        assert_eq!(bytes_to_human_readable(3 * 1024 * 1024 / 2), "1.50 MiB");
    }
}
