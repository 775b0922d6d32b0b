//! Analytics helpers: device classification and funnel math.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{AnalyticsEventKind, DeviceType, round_money};

const BOT_MARKERS: &[&str] = &[
    "bot", "crawler", "spider", "slurp", "headless", "lighthouse", "curl/", "wget/",
];
const TABLET_MARKERS: &[&str] = &["ipad", "tablet", "kindle", "silk/", "playbook"];
const MOBILE_MARKERS: &[&str] = &["mobi", "iphone", "ipod", "android", "opera mini", "expo"];

/// Classify a `User-Agent` header.
///
/// Android tablets omit `Mobile`, so `android` without `mobi` is a tablet.
#[must_use]
pub fn classify_device(user_agent: &str) -> DeviceType {
    let ua = user_agent.to_ascii_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|m| ua.contains(m));

    if ua.is_empty() || has(BOT_MARKERS) {
        DeviceType::Bot
    } else if has(TABLET_MARKERS) || (ua.contains("android") && !ua.contains("mobi")) {
        DeviceType::Tablet
    } else if has(MOBILE_MARKERS) {
        DeviceType::Mobile
    } else {
        DeviceType::Desktop
    }
}

/// One step of the conversion funnel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelStep {
    pub kind: AnalyticsEventKind,
    /// Distinct sessions that reached this step.
    pub sessions: i64,
    /// Percentage of the previous step's sessions.
    pub step_rate: Decimal,
    /// Percentage of the first step's sessions.
    pub overall_rate: Decimal,
}

/// Percentage `part / whole * 100`, rounded to two places. Zero when
/// `whole` is zero.
#[must_use]
pub fn percentage(part: i64, whole: i64) -> Decimal {
    if whole <= 0 {
        return Decimal::ZERO;
    }
    round_money(Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(whole))
}

/// Build the funnel in canonical order from per-kind session counts.
///
/// Kinds missing from `counts` are reported with zero sessions.
#[must_use]
pub fn build_funnel(counts: &[(AnalyticsEventKind, i64)]) -> Vec<FunnelStep> {
    let count_of = |kind: AnalyticsEventKind| {
        counts
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0, |(_, n)| *n)
    };

    let first = AnalyticsEventKind::ALL.first().map_or(0, |k| count_of(*k));
    let mut previous = first;

    AnalyticsEventKind::ALL
        .iter()
        .map(|kind| {
            let sessions = count_of(*kind);
            let step = FunnelStep {
                kind: *kind,
                sessions,
                step_rate: percentage(sessions, previous),
                overall_rate: percentage(sessions, first),
            };
            previous = sessions;
            step
        })
        .collect()
}

/// Average order value; zero when there are no orders.
#[must_use]
pub fn average_order_value(revenue: Decimal, orders: i64) -> Decimal {
    if orders <= 0 {
        Decimal::ZERO
    } else {
        round_money(revenue / Decimal::from(orders))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_classify_device() {
        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148";
        let pixel = "Mozilla/5.0 (Linux; Android 14; Pixel 8) Chrome/120.0 Mobile Safari/537.36";
        let galaxy_tab = "Mozilla/5.0 (Linux; Android 13; SM-X710) Chrome/120.0 Safari/537.36";
        let ipad = "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X)";
        let mac = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0) Safari/605.1.15";
        let google = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

        assert_eq!(classify_device(iphone), DeviceType::Mobile);
        assert_eq!(classify_device(pixel), DeviceType::Mobile);
        assert_eq!(classify_device(galaxy_tab), DeviceType::Tablet);
        assert_eq!(classify_device(ipad), DeviceType::Tablet);
        assert_eq!(classify_device(mac), DeviceType::Desktop);
        assert_eq!(classify_device(google), DeviceType::Bot);
        assert_eq!(classify_device(""), DeviceType::Bot);
    }

    #[test]
    fn test_funnel_rates() {
        let funnel = build_funnel(&[
            (AnalyticsEventKind::PageView, 1000),
            (AnalyticsEventKind::ProductView, 400),
            (AnalyticsEventKind::AddToCart, 100),
            (AnalyticsEventKind::Purchase, 30),
        ]);

        assert_eq!(funnel.len(), 5);
        assert_eq!(funnel[1].step_rate, dec("40"));
        assert_eq!(funnel[2].overall_rate, dec("10"));
        // No checkout events recorded
        assert_eq!(funnel[3].sessions, 0);
        assert_eq!(funnel[4].step_rate, Decimal::ZERO);
        assert_eq!(funnel[4].overall_rate, dec("3"));
    }

    #[test]
    fn test_empty_funnel_has_zero_rates() {
        let funnel = build_funnel(&[]);
        assert!(funnel.iter().all(|s| s.sessions == 0 && s.step_rate.is_zero()));
    }

    #[test]
    fn test_average_order_value() {
        assert_eq!(average_order_value(dec("10000"), 3), dec("3333.33"));
        assert_eq!(average_order_value(dec("500"), 0), Decimal::ZERO);
    }
}
