// SPDX-FileCopyrightText: 2026 Mirage Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt and response-schema builders for every generative call.

use mirage_core::types::{Category, ContentFormat, ContentItem, GenerationRequest, PlanItem};
use serde_json::{json, Value};
use strum::IntoEnumIterator;

/// Voice rules a draft must follow for its category.
pub fn voice_contract(category: Category) -> &'static str {
    match category {
        Category::GroundedFact => {
            "Write in a measured reporting voice. Ground every claim in a plausible, \
             named source (a study, agency, outlet, or expert) and cite it inline."
        }
        Category::Speculative => {
            "Frame everything as hypothetical. Use conditional language such as \
             \"what if\", \"could\", \"might\", or \"imagine\"; never state the premise as fact."
        }
        Category::Satirical => {
            "Be informal and irreverent. Exaggerate for comic effect, use slang and \
             internet humor, and make the satire obvious."
        }
    }
}

/// Visual style for images and videos of a category.
pub fn visual_style(category: Category) -> &'static str {
    match category {
        Category::GroundedFact => {
            "Documentary photograph, natural light, realistic detail, press-photo framing"
        }
        Category::Speculative => {
            "Dreamlike concept art, soft surreal lighting, impossible architecture, muted glow"
        }
        Category::Satirical => "Crude, funny, deliberately amateurish meme aesthetic, loud colors",
    }
}

fn describe_format(format: ContentFormat) -> &'static str {
    match format {
        ContentFormat::Image => "a single striking photo with a caption",
        ContentFormat::Article => "a multi-paragraph article with a headline",
        ContentFormat::Meme => "a meme image with punchline text",
        ContentFormat::Short => "a concept for a short vertical video, shown as its key frame",
        ContentFormat::Audio => "a short spoken audio clip with a caption",
        ContentFormat::Text => "a short text-only post",
    }
}

fn join_values<T: ToString>(values: impl IntoIterator<Item = T>) -> String {
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The single structured-output prompt that produces a plan.
pub fn plan_prompt(request: &GenerationRequest) -> String {
    let mut prompt = format!(
        "You are planning posts for a synthetic social feed. The reader describes themselves as:\n\
         \"{}\"\n\n\
         Propose exactly {} posts this reader would stop scrolling for. For each post give a \
         format, a category, a concrete topic, a mood, and the persona of the fictional author.\n",
        request.persona.trim(),
        request.count,
    );

    prompt.push_str("\nFormats:\n");
    for format in ContentFormat::iter() {
        prompt.push_str(&format!("- {format}: {}\n", describe_format(format)));
    }
    prompt.push_str(
        "\nCategories:\n\
         - grounded_fact: true or plausibly sourced information\n\
         - speculative: explicitly hypothetical scenarios\n\
         - satirical: obvious parody\n",
    );

    if request.formats.is_empty() {
        prompt.push_str("\nMix formats: do not use the same format for every post.\n");
    } else {
        prompt.push_str(&format!(
            "\nUse ONLY these formats: {}.\n",
            join_values(&request.formats)
        ));
    }
    if request.categories.is_empty() {
        prompt.push_str("Mix categories: include more than one category.\n");
    } else {
        prompt.push_str(&format!(
            "Use ONLY these categories: {}.\n",
            join_values(&request.categories)
        ));
    }
    prompt
}

/// Response schema for [`plan_prompt`].
pub fn plan_schema(request: &GenerationRequest) -> Value {
    let formats: Vec<String> = if request.formats.is_empty() {
        ContentFormat::iter().map(|f| f.to_string()).collect()
    } else {
        request.formats.iter().map(|f| f.to_string()).collect()
    };
    let categories: Vec<String> = if request.categories.is_empty() {
        Category::iter().map(|c| c.to_string()).collect()
    } else {
        request.categories.iter().map(|c| c.to_string()).collect()
    };

    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "format": {"type": "STRING", "enum": formats},
                "category": {"type": "STRING", "enum": categories},
                "topic": {"type": "STRING"},
                "mood": {"type": "STRING"},
                "authorPersona": {"type": "STRING"}
            },
            "required": ["format", "category", "topic", "mood", "authorPersona"]
        }
    })
}

const COMMENTS_INSTRUCTION: &str = "Also write 2 to 5 short comments from distinct fictional \
     users reacting to the post, each with an author username and text.";

fn author_line(plan: &PlanItem) -> String {
    format!(
        "The author is {}. Invent a display name and an @handle that fit them.",
        plan.author_persona
    )
}

/// Drafting prompt for text and article posts.
pub fn draft_prompt(plan: &PlanItem) -> String {
    let shape = match plan.format {
        ContentFormat::Article => "a headline and a 3 to 5 paragraph article body",
        _ => "a short title and a post body of at most 280 characters",
    };
    format!(
        "Write {shape} about \"{}\". Mood: {}.\n{}\n{}\n{}",
        plan.topic,
        plan.mood,
        voice_contract(plan.category),
        author_line(plan),
        COMMENTS_INSTRUCTION,
    )
}

/// Image synthesis prompt for visual posts.
pub fn image_prompt(plan: &PlanItem) -> String {
    let framing = match plan.format {
        ContentFormat::Meme => "Leave room for bold top and bottom caption text.",
        ContentFormat::Short => "Vertical cinematic key frame from a short video.",
        _ => "Single square composition.",
    };
    format!(
        "{}. Subject: {}. Mood: {}. {framing} No watermarks.",
        visual_style(plan.category),
        plan.topic,
        plan.mood,
    )
}

/// Caption/author/tags prompt accompanying a visual post.
pub fn metadata_prompt(plan: &PlanItem) -> String {
    let caption = match plan.format {
        ContentFormat::Meme => "the meme's punchline text as the body",
        ContentFormat::Short => "a one-line hook for the video as the body",
        _ => "a caption of one or two sentences as the body",
    };
    format!(
        "A post shows an image in this style: {}. Its topic is \"{}\" and its mood is {}.\n\
         Write {caption}, a short title, and 2 to 4 hashtags without the # sign.\n{}\n{}\n{}",
        visual_style(plan.category),
        plan.topic,
        plan.mood,
        voice_contract(plan.category),
        author_line(plan),
        COMMENTS_INSTRUCTION,
    )
}

/// Script prompt for audio posts.
pub fn script_prompt(plan: &PlanItem) -> String {
    format!(
        "Write a spoken monologue of 40 to 80 words about \"{}\" as the script, plus a \
         one-sentence caption as the body and a short title. Mood: {}.\n{}\n{}\n{}",
        plan.topic,
        plan.mood,
        voice_contract(plan.category),
        author_line(plan),
        COMMENTS_INSTRUCTION,
    )
}

/// Video prompt derived from a finished post.
pub fn video_prompt(item: &ContentItem) -> String {
    let mut prompt = format!(
        "{}. Animate a short clip about \"{}\".",
        visual_style(item.category),
        item.topic
    );
    if let Some(title) = &item.title {
        prompt.push_str(&format!(" Title: {title}."));
    }
    if !item.body.is_empty() {
        prompt.push_str(&format!(" Context: {}", item.body));
    }
    prompt
}

/// Response schema shared by drafts, metadata, and scripts.
pub fn post_schema(with_script: bool) -> Value {
    let mut properties = json!({
        "title": {"type": "STRING"},
        "body": {"type": "STRING"},
        "authorName": {"type": "STRING"},
        "authorHandle": {"type": "STRING"},
        "tags": {"type": "ARRAY", "items": {"type": "STRING"}},
        "comments": {
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "author": {"type": "STRING"},
                    "text": {"type": "STRING"}
                },
                "required": ["author", "text"]
            }
        }
    });
    let mut required = vec!["title", "body", "authorName", "authorHandle", "comments"];
    if with_script {
        properties["script"] = json!({"type": "STRING"});
        required.push("script");
    }
    json!({"type": "OBJECT", "properties": properties, "required": required})
}
