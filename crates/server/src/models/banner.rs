//! App banners shown on the storefront home screen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stride_core::BannerId;

#[derive(Debug, Clone, Serialize)]
pub struct Banner {
    pub id: BannerId,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Banner {
    /// Whether the banner should be shown at `now`.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.starts_at.is_none_or(|s| s <= now)
            && self.ends_at.is_none_or(|e| now < e)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BannerInput {
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    #[serde(default)]
    pub position: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl BannerInput {
    /// # Errors
    ///
    /// Returns a message for a blank title, a non-http image URL or an
    /// inverted window.
    pub fn normalize(&mut self) -> Result<(), String> {
        self.title = self.title.trim().to_owned();
        self.image_url = self.image_url.trim().to_owned();
        self.subtitle = super::non_blank(self.subtitle.take());
        self.link_url = super::non_blank(self.link_url.take());

        if self.title.is_empty() {
            return Err("banner title is required".to_owned());
        }
        let parsed = url::Url::parse(&self.image_url).map_err(|_| "image URL is invalid")?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err("image URL must use http or https".to_owned());
        }
        if let (Some(start), Some(end)) = (self.starts_at, self.ends_at)
            && start >= end
        {
            return Err("banner must start before it ends".to_owned());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn input() -> BannerInput {
        BannerInput {
            title: " Monsoon Sale ".to_owned(),
            subtitle: Some(String::new()),
            image_url: "https://cdn.example.com/banner.jpg".to_owned(),
            link_url: None,
            position: 0,
            starts_at: None,
            ends_at: None,
            is_active: true,
        }
    }

    #[test]
    fn test_normalize() {
        let mut b = input();
        assert!(b.normalize().is_ok());
        assert_eq!(b.title, "Monsoon Sale");
        assert_eq!(b.subtitle, None);

        let mut bad = BannerInput {
            image_url: "ftp://x/y.jpg".to_owned(),
            ..input()
        };
        assert!(bad.normalize().is_err());
    }

    #[test]
    fn test_is_live_window() {
        let now = Utc::now();
        let banner = Banner {
            id: BannerId::new(1),
            title: "Sale".to_owned(),
            subtitle: None,
            image_url: "https://cdn.example.com/b.jpg".to_owned(),
            link_url: None,
            position: 0,
            starts_at: Some(now - Duration::days(1)),
            ends_at: Some(now + Duration::days(1)),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        assert!(banner.is_live(now));
        assert!(!banner.is_live(now + Duration::days(2)));
        let inactive = Banner {
            is_active: false,
            ..banner
        };
        assert!(!inactive.is_live(now));
    }
}
