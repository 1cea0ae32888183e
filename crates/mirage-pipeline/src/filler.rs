// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content filling: turns one plan item into a finished content item.
//!
//! Dispatches on format. Visual formats make an image call then a metadata
//! call; audio makes a script call then a speech call; text and articles make
//! a single drafting call. Every call goes through the shared executor.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use mirage_core::error::MirageError;
use mirage_core::traits::{GenerativeAdapter, MediaStore};
use mirage_core::types::{
    AspectRatio, Author, Comment, ContentFormat, ContentItem, Engagement, GeneratedMedia,
    ImageRequest, ItemId, ItemStatus, MediaRef, PlanItem, SpeechRequest, StructuredRequest,
};
use mirage_resilience::RetryExecutor;
use rand::Rng;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{prompts, wav};

/// Fills one plan item. The orchestrator depends on this seam.
#[async_trait]
pub trait ItemFiller: Send + Sync {
    /// Produces the resolved item for `plan`, carrying identifier `id`.
    async fn fill_one(
        &self,
        id: ItemId,
        plan: &PlanItem,
        cancel: &CancellationToken,
    ) -> Result<ContentItem, MirageError>;
}

/// Fields shared by drafting, metadata, and script replies.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PostDraft {
    title: Option<String>,
    body: String,
    script: Option<String>,
    author_name: String,
    author_handle: String,
    tags: Vec<String>,
    comments: Vec<Comment>,
}

/// [`ItemFiller`] backed by a generative adapter and a media store.
pub struct ContentFiller {
    generative: Arc<dyn GenerativeAdapter>,
    media: Arc<dyn MediaStore>,
    executor: RetryExecutor,
    max_comment_offset: u32,
    voice: Option<String>,
}

impl ContentFiller {
    pub fn new(
        generative: Arc<dyn GenerativeAdapter>,
        media: Arc<dyn MediaStore>,
        executor: RetryExecutor,
        max_comment_offset: u32,
    ) -> Self {
        Self {
            generative,
            media,
            executor,
            max_comment_offset,
            voice: None,
        }
    }

    /// Overrides the adapter's default speech voice.
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// Runs `call` against the adapter through the executor.
    async fn call<T, F, Fut>(
        &self,
        label: &str,
        cancel: &CancellationToken,
        call: F,
    ) -> Result<T, MirageError>
    where
        F: Fn(Arc<dyn GenerativeAdapter>) -> Fut + Send,
        Fut: Future<Output = Result<T, MirageError>> + Send,
    {
        let generative = Arc::clone(&self.generative);
        self.executor
            .execute_cancellable(label, cancel, || call(Arc::clone(&generative)))
            .await
    }

    async fn draft(
        &self,
        label: &str,
        prompt: String,
        with_script: bool,
        cancel: &CancellationToken,
    ) -> Result<PostDraft, MirageError> {
        let request = StructuredRequest {
            prompt,
            schema: prompts::post_schema(with_script),
        };
        let value = self
            .call(label, cancel, |g| {
                let request = request.clone();
                async move { g.generate_structured(request).await }
            })
            .await?;
        serde_json::from_value(value).map_err(|e| MirageError::Provider {
            message: format!("{label} reply did not match the post schema: {e}"),
            status: None,
            code: None,
            source: Some(Box::new(e)),
        })
    }

    async fn fill_visual(
        &self,
        plan: &PlanItem,
        cancel: &CancellationToken,
    ) -> Result<(PostDraft, Option<MediaRef>), MirageError> {
        let aspect_ratio = match plan.format {
            ContentFormat::Short => AspectRatio::Tall,
            _ => AspectRatio::Square,
        };
        let request = ImageRequest {
            prompt: prompts::image_prompt(plan),
            aspect_ratio,
        };
        let image = self
            .call("image", cancel, |g| {
                let request = request.clone();
                async move { g.generate_image(request).await }
            })
            .await?;

        let image = match image {
            Some(media) => self.store("image", media).await,
            None => {
                warn!(topic = plan.topic, "image call returned no bytes, visual stays pending");
                None
            }
        };

        let draft = self
            .draft("metadata", prompts::metadata_prompt(plan), false, cancel)
            .await?;
        Ok((draft, image))
    }

    async fn fill_audio(
        &self,
        plan: &PlanItem,
        cancel: &CancellationToken,
    ) -> Result<(PostDraft, Option<MediaRef>), MirageError> {
        let draft = self
            .draft("script", prompts::script_prompt(plan), true, cancel)
            .await?;
        let text = draft
            .script
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| draft.body.clone());

        let request = SpeechRequest {
            text,
            voice: self.voice.clone(),
        };
        let speech = self
            .call("speech", cancel, |g| {
                let request = request.clone();
                async move { g.synthesize_speech(request).await }
            })
            .await;

        let audio = match speech {
            Ok(pcm) => {
                let rate = wav::sample_rate_from_mime(&pcm.mime_type);
                let wav = GeneratedMedia {
                    mime_type: "audio/wav".into(),
                    data: wav::pcm_to_wav(&pcm.data, rate),
                };
                self.store("audio", wav).await
            }
            Err(MirageError::Cancelled) => return Err(MirageError::Cancelled),
            Err(e) => {
                warn!(topic = plan.topic, error = %e, "speech synthesis failed, posting without audio");
                None
            }
        };
        Ok((draft, audio))
    }

    /// Stores `media`, treating a store failure as a missing asset.
    async fn store(&self, kind: &str, media: GeneratedMedia) -> Option<MediaRef> {
        match self.media.put(media).await {
            Ok(reference) => Some(reference),
            Err(e) => {
                warn!(kind, error = %e, "failed to store generated media");
                None
            }
        }
    }

    fn engagement(&self, comment_count: usize) -> Engagement {
        let mut rng = rand::thread_rng();
        let offset = rng.gen_range(0..=self.max_comment_offset);
        let likes = rng.gen_range(12..=4_800);
        Engagement {
            likes,
            comments: comment_count as u32 + offset,
            shares: rng.gen_range(0..=likes / 4),
        }
    }
}

#[async_trait]
impl ItemFiller for ContentFiller {
    async fn fill_one(
        &self,
        id: ItemId,
        plan: &PlanItem,
        cancel: &CancellationToken,
    ) -> Result<ContentItem, MirageError> {
        debug!(id = %id, format = %plan.format, topic = plan.topic, "filling item");

        let mut item = ContentItem::placeholder(id, plan);
        let draft = match plan.format {
            ContentFormat::Image | ContentFormat::Meme | ContentFormat::Short => {
                let (draft, image) = self.fill_visual(plan, cancel).await?;
                item.image = image;
                draft
            }
            ContentFormat::Audio => {
                let (draft, audio) = self.fill_audio(plan, cancel).await?;
                item.audio = audio;
                draft
            }
            ContentFormat::Article | ContentFormat::Text => {
                let draft = self
                    .draft("draft", prompts::draft_prompt(plan), false, cancel)
                    .await?;
                if draft.body.trim().is_empty() {
                    return Err(MirageError::provider("draft reply had an empty body"));
                }
                draft
            }
        };

        item.status = ItemStatus::Ready;
        item.author = author_for(&draft, plan);
        item.title = draft.title.filter(|t| !t.trim().is_empty());
        item.body = draft.body;
        item.tags = draft.tags;
        item.engagement = self.engagement(draft.comments.len());
        item.comments = draft.comments;
        item.created_at = Utc::now();
        Ok(item)
    }
}

/// Author fields from the draft, falling back to the plan's persona.
fn author_for(draft: &PostDraft, plan: &PlanItem) -> Author {
    let name = if draft.author_name.trim().is_empty() {
        plan.author_persona.clone()
    } else {
        draft.author_name.trim().to_string()
    };
    let handle = if draft.author_handle.trim().is_empty() {
        handle_from(&name)
    } else if draft.author_handle.starts_with('@') {
        draft.author_handle.trim().to_string()
    } else {
        format!("@{}", draft.author_handle.trim())
    };
    Author { name, handle }
}

fn handle_from(name: &str) -> String {
    let slug: String = name
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() => Some(c.to_ascii_lowercase()),
            ' ' | '-' | '_' => Some('_'),
            _ => None,
        })
        .collect();
    format!("@{slug}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirage_core::types::Category;
    use mirage_resilience::RetryPolicy;
    use mirage_storage::MemoryMediaStore;
    use mirage_test_utils::{plan_item, post_json, CallKind, MockFailure, MockGenerative};
    use std::time::Duration;

    struct Fixture {
        mock: Arc<MockGenerative>,
        media: Arc<MemoryMediaStore>,
        filler: ContentFiller,
    }

    fn fixture(max_comment_offset: u32) -> Fixture {
        let mock = Arc::new(MockGenerative::new());
        let media = Arc::new(MemoryMediaStore::new());
        let filler = ContentFiller::new(
            Arc::clone(&mock) as Arc<dyn GenerativeAdapter>,
            Arc::clone(&media) as Arc<dyn MediaStore>,
            RetryExecutor::new(RetryPolicy::exponential(Duration::from_secs(4), 5)),
            max_comment_offset,
        );
        Fixture {
            mock,
            media,
            filler,
        }
    }

    async fn fill(f: &Fixture, format: ContentFormat, category: Category) -> Result<ContentItem, MirageError> {
        let id = ItemId::new();
        let item = f
            .filler
            .fill_one(id.clone(), &plan_item(format, category, "urban foxes"), &CancellationToken::new())
            .await;
        if let Ok(item) = &item {
            assert_eq!(item.id, id);
        }
        item
    }

    #[tokio::test]
    async fn image_makes_image_then_metadata_call() {
        let f = fixture(0);
        let item = fill(&f, ContentFormat::Image, Category::GroundedFact).await.unwrap();

        let kinds: Vec<CallKind> = f.mock.calls().iter().map(|c| c.kind).collect();
        assert_eq!(kinds, [CallKind::Image, CallKind::Structured]);
        assert!(f.mock.calls()[0].input.starts_with("Documentary"));
        assert_eq!(item.status, ItemStatus::Ready);
        assert!(item.image.is_some());
        assert_eq!(f.media.len(), 1);
        assert_eq!(item.author.handle, "@mock_author");
        assert_eq!(item.engagement.comments, 2);
    }

    #[tokio::test]
    async fn missing_image_bytes_are_not_fatal() {
        let f = fixture(0);
        f.mock.push_image(Ok(None));
        let item = fill(&f, ContentFormat::Meme, Category::Satirical).await.unwrap();
        assert!(item.image.is_none());
        assert_eq!(item.body, "Mock body");
        assert!(f.media.is_empty());
    }

    #[tokio::test]
    async fn image_call_failure_fails_the_item() {
        let f = fixture(0);
        f.mock.push_image(Err(MockFailure::fatal("safety filter")));
        let err = fill(&f, ContentFormat::Short, Category::Speculative).await.unwrap_err();
        assert!(err.to_string().contains("safety filter"));
        assert_eq!(f.mock.calls_of(CallKind::Structured).len(), 0);
    }

    #[tokio::test]
    async fn audio_is_wrapped_as_wav() {
        let f = fixture(0);
        let item = fill(&f, ContentFormat::Audio, Category::Satirical).await.unwrap();

        let kinds: Vec<CallKind> = f.mock.calls().iter().map(|c| c.kind).collect();
        assert_eq!(kinds, [CallKind::Structured, CallKind::Speech]);
        assert!(f.mock.calls()[1].input.contains("(read aloud)"));

        let audio = item.audio.expect("audio stored");
        assert_eq!(audio.mime_type, "audio/wav");
        let stored = f.media.get(&audio.id).await.unwrap().unwrap();
        assert_eq!(&stored.data[0..4], b"RIFF");
        assert_eq!(stored.data.len(), 44 + 480);
    }

    #[tokio::test]
    async fn speech_failure_is_swallowed() {
        let f = fixture(0);
        f.mock.push_speech(Err(MockFailure::fatal("voice unavailable")));
        let item = fill(&f, ContentFormat::Audio, Category::GroundedFact).await.unwrap();
        assert_eq!(item.status, ItemStatus::Ready);
        assert!(item.audio.is_none());
    }

    #[tokio::test]
    async fn text_uses_one_draft_call_with_voice_contract() {
        let f = fixture(0);
        let item = fill(&f, ContentFormat::Text, Category::Speculative).await.unwrap();
        let calls = f.mock.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].input.contains("hypothetical"));
        assert_eq!(item.title.as_deref(), Some("Mock title"));
        assert_eq!(item.tags, ["mock", "feed"]);
    }

    #[tokio::test]
    async fn empty_article_body_is_an_error() {
        let f = fixture(0);
        f.mock.push_structured(Ok(post_json("headline", "")));
        assert!(fill(&f, ContentFormat::Article, Category::GroundedFact).await.is_err());
    }

    #[tokio::test]
    async fn engagement_offset_is_bounded() {
        let f = fixture(40);
        for _ in 0..20 {
            let item = fill(&f, ContentFormat::Text, Category::Satirical).await.unwrap();
            assert!((2..=42).contains(&item.engagement.comments));
            assert!(item.engagement.shares <= item.engagement.likes / 4);
        }
    }

    #[test]
    fn author_falls_back_to_persona() {
        let plan = plan_item(ContentFormat::Text, Category::Satirical, "t");
        let author = author_for(&PostDraft::default(), &plan);
        assert_eq!(author.name, "local columnist");
        assert_eq!(author.handle, "@local_columnist");

        let draft = PostDraft {
            author_name: "Ada".into(),
            author_handle: "ada_l".into(),
            ..Default::default()
        };
        assert_eq!(author_for(&draft, &plan).handle, "@ada_l");
    }
}
