use chrono::Utc;
use rand::Rng;
use serde::Serialize;

/// Reporting window accepted by the analytics endpoints via `?dateRange=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DateRange {
    Today,
    Week,
    Month,
    Year,
}

impl DateRange {
    /// Unknown or missing values fall back to `today`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|r| r.trim().to_lowercase()).as_deref() {
            Some("week") => DateRange::Week,
            Some("month") => DateRange::Month,
            Some("year") => DateRange::Year,
            _ => DateRange::Today,
        }
    }

    pub fn days(&self) -> u32 {
        match self {
            DateRange::Today => 1,
            DateRange::Week => 7,
            DateRange::Month => 30,
            DateRange::Year => 365,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Realtime {
    pub users: u32,
    pub pageviews: u32,
    pub active_sessions: u32,
}

#[derive(Debug, Serialize)]
pub struct TrafficSource {
    pub name: String,
    pub visits: u32,
    pub percentage: u32,
}

#[derive(Debug, Serialize)]
pub struct Traffic {
    pub total: u32,
    pub sources: Vec<TrafficSource>,
}

#[derive(Debug, Serialize)]
pub struct Conversions {
    pub total: u32,
    pub rate: f64,
    pub revenue: u64,
}

#[derive(Debug, Serialize)]
pub struct DeviceShare {
    #[serde(rename = "type")]
    pub kind: String,
    pub percentage: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Behavior {
    pub bounce_rate: f64,
    pub avg_duration: u32,
    pub device_types: Vec<DeviceShare>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAnalyticsSnapshot {
    pub demo: bool,
    pub message: String,
    pub date_range: DateRange,
    pub realtime: Realtime,
    pub traffic: Traffic,
    pub conversions: Conversions,
    pub behavior: Behavior,
}

#[derive(Debug, Serialize)]
pub struct TopPage {
    pub url: String,
    pub title: String,
    pub visits: u32,
    pub percent: f64,
}

#[derive(Debug, Serialize)]
pub struct YandexSource {
    pub source: String,
    pub visits: u32,
    pub percent: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YandexData {
    pub online_users: u32,
    pub today_visits: u32,
    pub today_views: u32,
    pub bounce_rate: f64,
    pub avg_session_duration: String,
    pub top_pages: Vec<TopPage>,
    pub traffic_sources: Vec<YandexSource>,
}

#[derive(Debug, Serialize)]
pub struct YandexMeta {
    pub demo: bool,
    pub period: DateRange,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct YandexMetrikaSnapshot {
    pub status: String,
    pub data: YandexData,
    pub meta: YandexMeta,
}

/// Splits `total` across the given shares (percent), rounding each part.
fn split(total: u32, shares: &[(&str, u32)]) -> Vec<TrafficSource> {
    shares
        .iter()
        .map(|(name, pct)| TrafficSource {
            name: name.to_string(),
            visits: ((total as f64) * (*pct as f64) / 100.0).round() as u32,
            percentage: *pct,
        })
        .collect()
}

pub fn google_snapshot(range: DateRange) -> GoogleAnalyticsSnapshot {
    let mut rng = rand::thread_rng();
    let days = range.days();
    let total = days * rng.gen_range(1_800..2_400);
    let conversions = (total as f64 * 0.038).round() as u32;

    GoogleAnalyticsSnapshot {
        demo: true,
        message: "Using demo data. Configure Google Analytics credentials for real data.".to_string(),
        date_range: range,
        realtime: Realtime {
            users: rng.gen_range(50..150),
            pageviews: rng.gen_range(200..700),
            active_sessions: rng.gen_range(30..110),
        },
        traffic: Traffic {
            total,
            sources: split(
                total,
                &[("Google", 42), ("Yandex", 27), ("Direct", 15), ("Social", 9), ("Referral", 7)]
            ),
        },
        conversions: Conversions {
            total: conversions,
            rate: 3.8,
            revenue: conversions as u64 * 10_000,
        },
        behavior: Behavior {
            bounce_rate: 42.5,
            avg_duration: rng.gen_range(150..220),
            device_types: vec![
                DeviceShare { kind: "Desktop".to_string(), percentage: 58 },
                DeviceShare { kind: "Mobile".to_string(), percentage: 37 },
                DeviceShare { kind: "Tablet".to_string(), percentage: 5 }
            ],
        },
    }
}

pub fn yandex_snapshot(range: DateRange) -> YandexMetrikaSnapshot {
    let mut rng = rand::thread_rng();
    let days = range.days();
    let visits = days * (1_847 + rng.gen_range(0..200));
    let views = days * (3_245 + rng.gen_range(0..500));
    let bounce: f64 = 42.5 + rng.gen_range(-5.0..5.0);

    let page = |url: &str, title: &str, percent: f64| TopPage {
        url: url.to_string(),
        title: title.to_string(),
        visits: ((visits as f64) * percent / 100.0).round() as u32,
        percent,
    };
    let source = |name: &str, percent: f64| YandexSource {
        source: name.to_string(),
        visits: ((visits as f64) * percent / 100.0).round() as u32,
        percent,
    };

    YandexMetrikaSnapshot {
        status: "ok".to_string(),
        data: YandexData {
            online_users: rng.gen_range(20..120),
            today_visits: visits,
            today_views: views,
            bounce_rate: (bounce * 10.0).round() / 10.0,
            avg_session_duration: format!("{}:{:02}", rng.gen_range(2..5), rng.gen_range(0..60)),
            top_pages: vec![
                page("/", "Home", 31.2),
                page("/catalog", "Catalog", 12.8),
                page("/about", "About", 10.4),
                page("/contacts", "Contacts", 8.0),
                page("/services", "Services", 6.8)
            ],
            traffic_sources: vec![
                source("Yandex search", 37.1),
                source("Direct", 22.9),
                source("Social networks", 16.1),
                source("Google search", 12.7),
                source("Referral sites", 11.2)
            ],
        },
        meta: YandexMeta {
            demo: true,
            period: range,
            timestamp: Utc::now().to_rfc3339(),
        },
    }
}
