// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mirage generate`: runs one batch from the command line.

use std::io::Write;
use std::sync::Arc;

use futures::StreamExt;
use mirage_config::MirageConfig;
use mirage_core::traits::{ContentSink, GenerativeAdapter, MediaStore};
use mirage_core::types::{Category, ContentFormat, GenerationRequest};
use mirage_core::MirageError;
use mirage_gemini::GeminiProvider;
use mirage_pipeline::{FillEvent, Pipeline};
use mirage_storage::{MemoryFeed, MemoryMediaStore};

use crate::shutdown;

/// Generates one batch and writes every event to stdout as a JSON line.
///
/// Ctrl+C cancels the remaining items; the final `done` line is still printed.
pub async fn run_generate(
    config: MirageConfig,
    persona: String,
    formats: Vec<ContentFormat>,
    categories: Vec<Category>,
    count: usize,
) -> Result<(), MirageError> {
    let generative: Arc<dyn GenerativeAdapter> = Arc::new(GeminiProvider::new(&config.gemini)?);
    let feed: Arc<dyn ContentSink> = Arc::new(MemoryFeed::new());
    let media: Arc<dyn MediaStore> = Arc::new(MemoryMediaStore::new());
    let pipeline = Pipeline::from_config(&config, generative, feed, media);

    let request = GenerationRequest::new(
        persona,
        formats,
        categories,
        count.min(config.pipeline.max_items),
    );
    let cancel = shutdown::install_signal_handler();
    let mut events = Box::pin(pipeline.start_generation(request, cancel));

    let mut stdout = std::io::stdout().lock();
    while let Some(event) = events.next().await {
        write_event(&mut stdout, &event)?;
    }
    Ok(())
}

fn write_event(out: &mut impl Write, event: &FillEvent) -> Result<(), MirageError> {
    let line = serde_json::to_string(event)
        .map_err(|e| MirageError::Internal(format!("failed to encode event: {e}")))?;
    writeln!(out, "{line}")
        .map_err(|e| MirageError::Internal(format!("failed to write event: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirage_pipeline::FillSummary;

    #[test]
    fn events_are_written_one_per_line() {
        let mut out = Vec::new();
        write_event(&mut out, &FillEvent::Planned { items: vec![] }).unwrap();
        write_event(
            &mut out,
            &FillEvent::Done {
                summary: FillSummary::default(),
            },
        )
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "planned");
        assert_eq!(lines[1]["event"], "done");
        assert_eq!(lines[1]["summary"]["resolved"], 0);
    }
}
