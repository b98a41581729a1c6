use url::Url;

const DEFAULT_CHAT_ORIGIN: &str = "https://chat.openai.com";

#[cfg(target_arch = "wasm32")]
pub(crate) fn now_ms() -> i64 {
    js_sys::Date::now().round() as i64
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// `note-` followed by 16 random hex digits. Falls back to the clock when the
/// platform has no entropy source.
pub(crate) fn generate_id() -> String {
    let mut buf = [0u8; 8];
    if getrandom::getrandom(&mut buf).is_err() {
        buf = (now_ms() as u64).to_le_bytes();
    }
    let hex: String = buf.iter().map(|b| format!("{b:02x}")).collect();
    format!("note-{hex}")
}

#[cfg(target_arch = "wasm32")]
fn page_origin() -> Option<String> {
    let origin = web_sys::window()?.location().origin().ok()?;
    (!origin.is_empty() && origin != "null").then_some(origin)
}

#[cfg(not(target_arch = "wasm32"))]
fn page_origin() -> Option<String> {
    None
}

/// `origin + path` for conversation URLs (`/c/...`), empty for anything else.
/// Relative values resolve against `base`, or the page origin when `None`.
pub(crate) fn normalize_chat_url(value: &str, base: Option<&str>) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let base = base
        .map(str::to_string)
        .or_else(page_origin)
        .unwrap_or_else(|| DEFAULT_CHAT_ORIGIN.to_string());
    let Ok(base) = Url::parse(&base) else {
        return String::new();
    };
    let Ok(url) = base.join(trimmed) else {
        return String::new();
    };
    if !url.path().starts_with("/c/") {
        return String::new();
    }
    format!("{}{}", url.origin().ascii_serialization(), url.path())
}

/// The conversation the page currently shows, if any.
#[cfg(target_arch = "wasm32")]
pub(crate) fn current_chat_url() -> Option<String> {
    let location = web_sys::window()?.location();
    let href = format!(
        "{}{}",
        location.origin().ok()?,
        location.pathname().unwrap_or_default()
    );
    let url = normalize_chat_url(&href, None);
    (!url.is_empty()).then_some(url)
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn current_chat_url() -> Option<String> {
    None
}

pub(crate) fn clamp(value: f64, min: f64, max: f64) -> f64 {
    // not f64::clamp: that panics when the viewport is smaller than the panel
    min.max(max.min(value))
}

/// `MM/DD HH:MM` in local time (UTC off the browser).
pub(crate) fn format_timestamp(ms: i64) -> String {
    let (month, day, hour, minute) = date_parts(ms);
    format!("{month:02}/{day:02} {hour:02}:{minute:02}")
}

#[cfg(target_arch = "wasm32")]
fn date_parts(ms: i64) -> (u32, u32, u32, u32) {
    let d = js_sys::Date::new(&wasm_bindgen::JsValue::from_f64(ms as f64));
    (d.get_month() + 1, d.get_date(), d.get_hours(), d.get_minutes())
}

#[cfg(not(target_arch = "wasm32"))]
fn date_parts(ms: i64) -> (u32, u32, u32, u32) {
    let secs = ms.div_euclid(1000);
    let days = secs.div_euclid(86_400);
    let rem = secs.rem_euclid(86_400);

    // civil-from-days, proleptic Gregorian
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };

    (
        month as u32,
        day as u32,
        (rem / 3600) as u32,
        (rem % 3600 / 60) as u32,
    )
}
