// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the pipeline, the adapters, and the gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Upper bound on items in one generation batch, keeping a batch inside quota.
pub const MAX_BATCH_ITEMS: usize = 5;

/// Author name carried by placeholders while their content is generating.
pub const GENERATING_AUTHOR: &str = "generating...";

/// Author name carried by items whose generation failed.
pub const SYSTEM_ERROR_AUTHOR: &str = "system error";

/// Handle carried by items whose generation failed.
pub const SYSTEM_ERROR_HANDLE: &str = "@system";

/// Identifier of a content item. Assigned once at placeholder creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`PluginAdapter`](crate::PluginAdapter).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Generative,
    Observability,
}

/// Presentation format of a post.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ContentFormat {
    Image,
    Article,
    Meme,
    Short,
    Audio,
    Text,
}

impl ContentFormat {
    /// Formats whose payload is a synthesized still image.
    pub fn is_visual(self) -> bool {
        matches!(self, Self::Image | Self::Meme | Self::Short)
    }
}

/// Authenticity category of a post.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Category {
    GroundedFact,
    Speculative,
    Satirical,
}

/// Caller intent for one generation batch. Consumed once by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub persona: String,
    /// Allowed formats. Empty means "mix formats".
    #[serde(default)]
    pub formats: Vec<ContentFormat>,
    /// Allowed categories. Empty means "mix categories".
    #[serde(default)]
    pub categories: Vec<Category>,
    pub count: usize,
}

impl GenerationRequest {
    /// Builds a request, clamping `count` into `1..=MAX_BATCH_ITEMS`.
    pub fn new(
        persona: impl Into<String>,
        formats: Vec<ContentFormat>,
        categories: Vec<Category>,
        count: usize,
    ) -> Self {
        Self {
            persona: persona.into(),
            formats,
            categories,
            count: count.clamp(1, MAX_BATCH_ITEMS),
        }
    }

    pub fn allows_format(&self, format: ContentFormat) -> bool {
        self.formats.is_empty() || self.formats.contains(&format)
    }

    pub fn allows_category(&self, category: Category) -> bool {
        self.categories.is_empty() || self.categories.contains(&category)
    }
}

/// One planned unit of content, not yet realized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanItem {
    pub format: ContentFormat,
    pub category: Category,
    pub topic: String,
    pub mood: String,
    pub author_persona: String,
}

/// Reference to a binary asset held by a [`MediaStore`](crate::MediaStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub id: String,
    pub mime_type: String,
}

impl MediaRef {
    /// Path under which the gateway serves the asset.
    pub fn url(&self) -> String {
        format!("/v1/media/{}", self.id)
    }
}

/// Display fields of a post's synthetic author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub handle: String,
}

/// A synthetic comment attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub text: String,
}

/// Engagement counters shown with a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub likes: u32,
    pub comments: u32,
    pub shares: u32,
}

/// Lifecycle phase of a [`ContentItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ItemStatus {
    Generating,
    Ready,
    Failed,
}

/// The unit of display.
///
/// Created as a placeholder when its plan item is dispatched and replaced in
/// place, matched by `id`, once the filler resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ItemId,
    pub format: ContentFormat,
    pub category: Category,
    pub status: ItemStatus,
    pub author: Author,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<MediaRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<MediaRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<MediaRef>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub engagement: Engagement,
    pub created_at: DateTime<Utc>,
}

impl ContentItem {
    /// A placeholder for `plan`: empty body and sentinel author fields.
    pub fn placeholder(id: ItemId, plan: &PlanItem) -> Self {
        Self {
            id,
            format: plan.format,
            category: plan.category,
            status: ItemStatus::Generating,
            author: Author {
                name: GENERATING_AUTHOR.to_string(),
                handle: GENERATING_AUTHOR.to_string(),
            },
            topic: plan.topic.clone(),
            title: None,
            body: String::new(),
            tags: Vec::new(),
            image: None,
            audio: None,
            video: None,
            comments: Vec::new(),
            engagement: Engagement::default(),
            created_at: Utc::now(),
        }
    }

    /// The error sentinel substituted for a placeholder whose fill failed.
    pub fn failed(id: ItemId, plan: &PlanItem, reason: &str) -> Self {
        Self {
            status: ItemStatus::Failed,
            author: Author {
                name: SYSTEM_ERROR_AUTHOR.to_string(),
                handle: SYSTEM_ERROR_HANDLE.to_string(),
            },
            body: format!("Generation failed for \"{}\": {reason}", plan.topic),
            ..Self::placeholder(id, plan)
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.status == ItemStatus::Generating
    }

    pub fn is_error(&self) -> bool {
        self.status == ItemStatus::Failed
    }
}

/// Raw media bytes returned by the generative service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMedia {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Aspect ratio requested for images and videos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum AspectRatio {
    #[strum(serialize = "1:1")]
    #[serde(rename = "1:1")]
    Square,
    #[strum(serialize = "9:16")]
    #[serde(rename = "9:16")]
    Tall,
    #[strum(serialize = "16:9")]
    #[serde(rename = "16:9")]
    Wide,
}

/// A structured-output text request: the reply must match `schema`.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    pub prompt: String,
    pub schema: serde_json::Value,
}

/// An image synthesis request.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
}

/// A text-to-speech request. The reply is 16-bit mono PCM.
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: Option<String>,
}

/// A video synthesis job submission, optionally conditioned on an image.
#[derive(Debug, Clone)]
pub struct VideoRequest {
    pub prompt: String,
    pub image: Option<GeneratedMedia>,
    pub aspect_ratio: AspectRatio,
}

/// Handle on a long-running video job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoOperation {
    pub name: String,
    pub done: bool,
    /// Network locator of the finished asset, once `done`.
    #[serde(default)]
    pub locator: Option<String>,
    /// Provider-reported failure of a finished job.
    #[serde(default)]
    pub error: Option<String>,
}

/// Per-identifier admission counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

/// Result of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl AdmissionDecision {
    /// When a denied caller may try again.
    pub fn retry_after(&self) -> Option<DateTime<Utc>> {
        (!self.allowed).then_some(self.reset_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn plan() -> PlanItem {
        PlanItem {
            format: ContentFormat::Meme,
            category: Category::Satirical,
            topic: "cats running the stock market".into(),
            mood: "smug".into(),
            author_persona: "day trader".into(),
        }
    }

    #[test]
    fn request_count_is_clamped() {
        let req = GenerationRequest::new("p", vec![], vec![], 40);
        assert_eq!(req.count, MAX_BATCH_ITEMS);
        let req = GenerationRequest::new("p", vec![], vec![], 0);
        assert_eq!(req.count, 1);
    }

    #[test]
    fn empty_filters_allow_everything() {
        let req = GenerationRequest::new("p", vec![], vec![], 3);
        assert!(req.allows_format(ContentFormat::Audio));
        assert!(req.allows_category(Category::Speculative));

        let req = GenerationRequest::new("p", vec![ContentFormat::Image], vec![Category::Satirical], 3);
        assert!(!req.allows_format(ContentFormat::Audio));
        assert!(req.allows_format(ContentFormat::Image));
        assert!(!req.allows_category(Category::GroundedFact));
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!(ContentFormat::from_str("Short").unwrap(), ContentFormat::Short);
        assert_eq!(Category::from_str("grounded_fact").unwrap(), Category::GroundedFact);
        assert!(ContentFormat::from_str("hologram").is_err());
    }

    #[test]
    fn plan_item_uses_camel_case_wire_names() {
        let json = serde_json::json!({
            "format": "short",
            "category": "speculative",
            "topic": "t",
            "mood": "m",
            "authorPersona": "a"
        });
        let item: PlanItem = serde_json::from_value(json).unwrap();
        assert_eq!(item.format, ContentFormat::Short);
        assert_eq!(item.author_persona, "a");
    }

    #[test]
    fn placeholder_has_sentinel_author_and_empty_body() {
        let id = ItemId::new();
        let item = ContentItem::placeholder(id.clone(), &plan());
        assert_eq!(item.id, id);
        assert!(item.is_placeholder());
        assert!(item.body.is_empty());
        assert_eq!(item.author.name, GENERATING_AUTHOR);
    }

    #[test]
    fn failed_item_keeps_identifier() {
        let id = ItemId::new();
        let item = ContentItem::failed(id.clone(), &plan(), "quota exhausted");
        assert_eq!(item.id, id);
        assert!(item.is_error());
        assert_eq!(item.author.name, SYSTEM_ERROR_AUTHOR);
        assert!(item.body.contains("quota exhausted"));
    }

    #[test]
    fn aspect_ratio_renders_provider_strings() {
        assert_eq!(AspectRatio::Square.to_string(), "1:1");
        assert_eq!(AspectRatio::Tall.to_string(), "9:16");
    }

    #[test]
    fn retry_after_only_when_denied() {
        let now = Utc::now();
        let allowed = AdmissionDecision { allowed: true, remaining: 2, reset_at: now };
        let denied = AdmissionDecision { allowed: false, remaining: 0, reset_at: now };
        assert!(allowed.retry_after().is_none());
        assert_eq!(denied.retry_after(), Some(now));
    }

    proptest::proptest! {
        #[test]
        fn clamped_count_always_in_bounds(count in 0usize..10_000) {
            let req = GenerationRequest::new("p", vec![], vec![], count);
            proptest::prop_assert!((1..=MAX_BATCH_ITEMS).contains(&req.count));
        }
    }
}
