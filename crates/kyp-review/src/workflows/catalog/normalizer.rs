use crate::workflows::kyp::domain::ProviderCode;

/// Extracts the provider code from either `RBC` or `Royal Bank Mutual Funds [RBC]`.
pub(crate) fn provider_code(value: &str) -> Option<ProviderCode> {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let trimmed = cleaned.trim();

    let code = match (trimmed.rfind('['), trimmed.rfind(']')) {
        (Some(open), Some(close)) if open < close => &trimmed[open + 1..close],
        _ => trimmed,
    };

    let code = code.trim();
    if code.is_empty() {
        None
    } else {
        Some(ProviderCode::new(code))
    }
}

/// Parses `0.0215`, `2.15%`, or `-1.4 %` into a decimal fraction.
pub(crate) fn parse_decimal(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    let parsed = match trimmed.strip_suffix('%') {
        Some(percent) => percent.trim().parse::<f64>().ok().map(|value| value / 100.0),
        None => trimmed.parse::<f64>().ok(),
    }?;

    parsed.is_finite().then_some(parsed)
}

pub(crate) fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
