// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plan generation: one structured call turning a persona into plan items.

use std::sync::Arc;

use mirage_core::traits::GenerativeAdapter;
use mirage_core::types::{GenerationRequest, PlanItem, StructuredRequest};
use mirage_resilience::RetryExecutor;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::prompts;

/// Produces the plan for one generation request.
#[derive(Clone)]
pub struct Planner {
    generative: Arc<dyn GenerativeAdapter>,
    executor: RetryExecutor,
}

impl Planner {
    pub fn new(generative: Arc<dyn GenerativeAdapter>, executor: RetryExecutor) -> Self {
        Self {
            generative,
            executor,
        }
    }

    /// Plans up to `request.count` items.
    ///
    /// Never fails: a failed call, an unparseable reply, or a reply with no
    /// usable items all yield an empty plan.
    pub async fn plan(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Vec<PlanItem> {
        let structured = StructuredRequest {
            prompt: prompts::plan_prompt(request),
            schema: prompts::plan_schema(request),
        };

        let generative = Arc::clone(&self.generative);
        let result = self
            .executor
            .execute_cancellable("plan", cancel, move || {
                let generative = Arc::clone(&generative);
                let structured = structured.clone();
                async move { generative.generate_structured(structured).await }
            })
            .await;

        let value = match result {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "plan call failed, returning empty plan");
                return Vec::new();
            }
        };

        let items = parse_plan(value, request);
        info!(
            requested = request.count,
            planned = items.len(),
            "plan generated"
        );
        items
    }
}

/// Extracts valid, filter-respecting items from a plan reply.
///
/// Accepts a bare array or an object wrapping the array under `items` or
/// `posts`. Invalid entries are skipped individually.
pub fn parse_plan(value: Value, request: &GenerationRequest) -> Vec<PlanItem> {
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("items").or_else(|| map.remove("posts")) {
            Some(Value::Array(entries)) => entries,
            _ => {
                debug!("plan object carried no item array");
                return Vec::new();
            }
        },
        _ => {
            debug!("plan reply was neither array nor object");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<PlanItem>(entry) {
            Ok(item) => Some(item),
            Err(e) => {
                debug!(error = %e, "dropping malformed plan item");
                None
            }
        })
        .filter(|item| {
            let keep = !item.topic.trim().is_empty()
                && request.allows_format(item.format)
                && request.allows_category(item.category);
            if !keep {
                debug!(topic = item.topic, format = %item.format, "dropping plan item outside filters");
            }
            keep
        })
        .take(request.count)
        .collect()
}
