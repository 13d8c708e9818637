//! Wire types of the gallery API.

use {
    chrono::{DateTime, Utc},
    pixlive_common::types::{Watermark, WorkItem, WorkMedia},
    serde::{Deserialize, Deserializer},
    serde_json::Value,
};

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct GalleryPage {
    #[serde(default)]
    pub results: Vec<Deviation>,
}

/// One gallery entry. Only the fields the pipeline reads are modelled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Deviation {
    #[serde(default)]
    pub deviationid: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub thumbs: Vec<Value>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub published_time: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub date: Option<String>,
}

impl Deviation {
    /// Ordering token: `published_time`, else `date`. Empty values count as
    /// absent.
    pub fn token(&self) -> Option<Watermark> {
        fn present(t: &Option<String>) -> Option<&str> {
            t.as_deref().filter(|t| !t.is_empty())
        }
        present(&self.published_time)
            .or_else(|| present(&self.date))
            .map(Watermark::from)
    }

    /// First thumbnail url. Thumbnails are usually `{src, width, height}`
    /// objects, occasionally bare strings.
    pub fn thumbnail(&self) -> Option<String> {
        match self.thumbs.first()? {
            Value::Object(obj) => obj.get("src")?.as_str().map(String::from),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn into_work_item(self, source: &str) -> WorkItem {
        let captured_at = self
            .token()
            .and_then(|t| t.as_str().trim().parse::<i64>().ok())
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .unwrap_or_else(Utc::now);
        let media = self
            .thumbnail()
            .map(WorkMedia::Thumbnail)
            .unwrap_or_default();
        WorkItem {
            source_id: source.to_string(),
            external_id: self.deviationid,
            title: self
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "No title".into()),
            reference_url: self
                .url
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| "#".into()),
            media,
            tags: Default::default(),
            captured_at,
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
