use regex::Regex;

const DURATION_PATTERN: &str =
    r"(?i)^([0-9]+(?:\.[0-9]+)?)\s*(h|hr|hrs|hour|hours|m|min|mins|minute|minutes)?$";

/// Parse human duration text into whole minutes. Bare numbers are
/// minutes, hour units multiply by 60, and values round to the nearest
/// minute. Unrecognized text salvages a leading number when one is
/// present and otherwise reads as 0.
pub fn parse_duration(raw: &str) -> u32 {
    let s = raw.trim();
    if s.is_empty() {
        return 0;
    }
    if let Ok(re) = Regex::new(DURATION_PATTERN) {
        if let Some(caps) = re.captures(s) {
            let val: f64 = caps[1].parse().unwrap_or(0.0);
            let hours = caps
                .get(2)
                .is_some_and(|u| u.as_str().to_ascii_lowercase().starts_with('h'));
            let minutes = if hours { val * 60.0 } else { val };
            return minutes.round() as u32;
        }
    }
    salvage_leading_number(s)
}

fn salvage_leading_number(s: &str) -> u32 {
    let Ok(re) = Regex::new(r"^(?:[0-9]+(?:\.[0-9]+)?|\.[0-9]+)") else {
        return 0;
    };
    re.find(s)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|v| v.round() as u32)
        .unwrap_or(0)
}

/// Format minutes the way durations are entered: nothing for zero,
/// whole hours as `Nh`, otherwise `Nm`
pub fn minutes_to_string(min: u32) -> String {
    if min == 0 {
        String::new()
    } else if min % 60 == 0 {
        format!("{}h", min / 60)
    } else {
        format!("{min}m")
    }
}
