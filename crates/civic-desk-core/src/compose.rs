//! Answer composition around an external language model.
//!
//! The composer builds a prompt from the resolved document and the recent
//! conversation, delegates generation to a [`TextGenerator`], and then
//! rewrites every link in the generated text into one canonical link to the
//! resolved document.
//!
//! The user always receives some answer:
//!
//! - no resolved document → [`apology`], and the model is not called;
//! - generation fails or returns nothing → [`fallback_answer`] built from
//!   the document's title, date and link.

use std::sync::{Arc, OnceLock};

use anyhow::Result;
use async_trait::async_trait;
use regex::{Captures, Regex};
use tracing::warn;

use crate::language::Language;
use crate::links::absolute_url;
use crate::models::{ConversationTurn, Document, Role};

/// A language model that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-1.5-flash"`).
    fn model_name(&self) -> &str;
    /// Generate a completion for `prompt`. Non-streaming.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Tuning parameters for the composer.
#[derive(Debug, Clone)]
pub struct ComposerParams {
    /// Name of the site the assistant speaks for.
    pub site_name: String,
    /// Base URL that relative document links are joined onto.
    pub site_base_url: String,
    /// Number of trailing user/assistant exchanges included in the prompt.
    pub history_exchanges: usize,
    /// Maximum characters of document body quoted in the prompt.
    pub excerpt_chars: usize,
}

impl Default for ComposerParams {
    fn default() -> Self {
        Self {
            site_name: "PMC".to_string(),
            site_base_url: String::new(),
            history_exchanges: 3,
            excerpt_chars: 1500,
        }
    }
}

/// A composed answer.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub language: Language,
    /// Absolute link of the grounding document, if any.
    pub link: Option<String>,
    /// False when the text is the apology or a templated fallback.
    pub generated: bool,
}

/// Builds prompts, calls the generator, and post-processes its output.
pub struct AnswerComposer {
    generator: Arc<dyn TextGenerator>,
    params: ComposerParams,
}

impl AnswerComposer {
    pub fn new(generator: Arc<dyn TextGenerator>, params: ComposerParams) -> Self {
        Self { generator, params }
    }

    /// Absolute link for a document, using the configured base URL.
    pub fn document_link(&self, doc: &Document) -> Option<String> {
        doc.link
            .as_deref()
            .and_then(|l| absolute_url(&self.params.site_base_url, l))
    }

    /// Compose the answer for `query` grounded in `document`.
    pub async fn compose(
        &self,
        query: &str,
        document: Option<&Document>,
        history: &[ConversationTurn],
        language: Language,
    ) -> Answer {
        let Some(doc) = document else {
            return Answer {
                text: apology(language).to_string(),
                language,
                link: None,
                generated: false,
            };
        };

        let link = self.document_link(doc);
        let prompt = build_prompt(
            query,
            doc,
            link.as_deref(),
            history,
            language,
            &self.params,
        );

        let text = match self.generator.generate(&prompt).await {
            Ok(text) if !text.trim().is_empty() => {
                Some(rewrite_links(text.trim(), link.as_deref(), language))
            }
            Ok(_) => {
                warn!(model = self.generator.model_name(), "language model returned empty text");
                None
            }
            Err(e) => {
                warn!(error = %e, model = self.generator.model_name(), "language model call failed");
                None
            }
        };

        match text {
            Some(text) => Answer {
                text,
                language,
                link,
                generated: true,
            },
            None => Answer {
                text: fallback_answer(doc, link.as_deref(), language),
                language,
                link,
                generated: false,
            },
        }
    }
}

/// Build the generation prompt.
///
/// Includes the document's title, date, link and a bounded excerpt, the
/// last `history_exchanges` exchanges of the conversation, and the question.
pub fn build_prompt(
    query: &str,
    doc: &Document,
    link: Option<&str>,
    history: &[ConversationTurn],
    language: Language,
    params: &ComposerParams,
) -> String {
    let labels = Labels::for_language(language);
    let mut prompt = String::new();

    prompt.push_str(&labels.instructions(&params.site_name));
    prompt.push_str("\n\n");

    prompt.push_str(labels.document);
    prompt.push_str(":\n");
    prompt.push_str(&format!("{}: {}\n", labels.title, doc.title.trim()));
    if let Some(date) = doc.display_date.as_deref().filter(|d| !d.trim().is_empty()) {
        prompt.push_str(&format!("{}: {}\n", labels.date, date.trim()));
    }
    if let Some(link) = link {
        prompt.push_str(&format!("{}: {}\n", labels.link, link));
    }
    let excerpt = doc.excerpt(params.excerpt_chars);
    if !excerpt.is_empty() {
        prompt.push_str(&format!("{}: {}\n", labels.text, excerpt));
    }

    let window = params.history_exchanges.saturating_mul(2);
    let recent = &history[history.len().saturating_sub(window)..];
    if !recent.is_empty() {
        prompt.push('\n');
        prompt.push_str(labels.conversation);
        prompt.push_str(":\n");
        for turn in recent {
            let speaker = match turn.role {
                Role::User => labels.user,
                Role::Assistant => labels.assistant,
            };
            prompt.push_str(&format!("{}: {}\n", speaker, turn.content.trim()));
        }
    }

    prompt.push('\n');
    prompt.push_str(&format!("{}: {}\n", labels.question, query.trim()));
    prompt
}

fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\[([^\]\n]*)\]\(\s*<?https?://[^)\s>]*>?\s*\)|https?://[^\s<>()\[\]]+")
            .expect("link pattern is valid")
    })
}

fn label_only_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^\s*[-*•]?\s*(link|लिंक)\s*:?\s*$").expect("label pattern is valid")
    })
}

fn repeated_spaces() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[ \t]{2,}").expect("space pattern is valid"))
}

/// Canonical link markup for a document link.
pub fn link_markup(link: &str, language: Language) -> String {
    format!("[{}]({})", Labels::for_language(language).link, link)
}

/// Rewrite every URL mention in `text` into one canonical link.
///
/// The first raw URL or markdown link becomes `[Link](<link>)`; later
/// mentions lose their URL, keeping a markdown link's anchor text and any
/// sentence punctuation that followed a raw URL. When the text mentions no URL, the canonical link is appended on
/// its own line. Without a document link the text is returned unchanged.
pub fn rewrite_links(text: &str, link: Option<&str>, language: Language) -> String {
    let Some(link) = link else {
        return text.to_string();
    };
    let markup = link_markup(link, language);

    let mut seen = false;
    let replaced = link_pattern().replace_all(text, |caps: &Captures| {
        let mention = &caps[0];
        let anchor = caps.get(1).map(|m| m.as_str().trim());
        let trailing = if anchor.is_some() {
            ""
        } else {
            let kept = mention.trim_end_matches(['.', ',', ';', ':', '!', '?']);
            &mention[kept.len()..]
        };
        if !seen {
            seen = true;
            return format!("{}{}", markup, trailing);
        }
        match anchor {
            Some(anchor) => anchor.to_string(),
            None => trailing.to_string(),
        }
    });

    let mut lines: Vec<String> = replaced
        .lines()
        .filter(|line| !label_only_line().is_match(line))
        .map(|line| repeated_spaces().replace_all(line, " ").trim_end().to_string())
        .collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    let mut out = lines.join("\n");

    if !seen {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(&markup);
    }
    out
}

/// Templated answer used when the language model is unavailable.
pub fn fallback_answer(doc: &Document, link: Option<&str>, language: Language) -> String {
    let date = doc
        .display_date
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());
    let mut text = match language {
        Language::English => {
            let mut s = format!("The most relevant document I found is \"{}\"", doc.title.trim());
            if let Some(date) = date {
                s.push_str(&format!(", dated {}", date));
            }
            s.push('.');
            s
        }
        Language::Marathi => {
            let mut s = format!("सर्वात संबंधित दस्तऐवज \"{}\" आहे", doc.title.trim());
            if let Some(date) = date {
                s.push_str(&format!(", दिनांक {}", date));
            }
            s.push('.');
            s
        }
    };
    if let Some(link) = link {
        text.push_str("\n\n");
        text.push_str(&link_markup(link, language));
    }
    text
}

/// Message returned when no document could be resolved.
pub fn apology(language: Language) -> &'static str {
    match language {
        Language::English => {
            "Sorry, I could not find a relevant document for your question. \
             Please try rephrasing it or mention the circular's subject."
        }
        Language::Marathi => {
            "क्षमस्व, तुमच्या प्रश्नासाठी संबंधित दस्तऐवज सापडला नाही. \
             कृपया प्रश्न वेगळ्या शब्दांत विचारा किंवा परिपत्रकाचा विषय नमूद करा."
        }
    }
}

/// Plain-text summary of a textually confirmed document.
pub fn direct_answer(doc: &Document, link: Option<&str>, excerpt_chars: usize) -> String {
    let mut text = format!(
        "Subject: {}\nDetails: {}",
        doc.title.trim(),
        doc.excerpt(excerpt_chars)
    );
    if let Some(link) = link {
        text.push_str(&format!("\nLink: {}", link));
    }
    text
}

struct Labels {
    document: &'static str,
    title: &'static str,
    date: &'static str,
    link: &'static str,
    text: &'static str,
    conversation: &'static str,
    user: &'static str,
    assistant: &'static str,
    question: &'static str,
    language: Language,
}

impl Labels {
    fn for_language(language: Language) -> Self {
        match language {
            Language::English => Self {
                document: "Document",
                title: "Title",
                date: "Date",
                link: "Link",
                text: "Text",
                conversation: "Recent conversation",
                user: "User",
                assistant: "Assistant",
                question: "Question",
                language,
            },
            Language::Marathi => Self {
                document: "दस्तऐवज",
                title: "शीर्षक",
                date: "दिनांक",
                link: "लिंक",
                text: "मजकूर",
                conversation: "अलीकडील संभाषण",
                user: "वापरकर्ता",
                assistant: "सहाय्यक",
                question: "प्रश्न",
                language,
            },
        }
    }

    fn instructions(&self, site_name: &str) -> String {
        match self.language {
            Language::English => format!(
                "You are an informative assistant for the {} website. \
                 Answer the user's question in English using the document below. \
                 If the document does not answer the question, say so briefly. \
                 Include the document link once if it is relevant.",
                site_name
            ),
            Language::Marathi => format!(
                "तुम्ही {} वेबसाइटसाठी एक माहितीपूर्ण सहाय्यक आहात. \
                 खालील दस्तऐवज वापरून वापरकर्त्याच्या प्रश्नाचे उत्तर मराठीत द्या. \
                 दस्तऐवजात उत्तर नसल्यास तसे थोडक्यात सांगा. \
                 शक्य असल्यास, संबंधित लिंक एकदा उत्तरात समाविष्ट करा.",
                site_name
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::sync::Mutex;

    const LINK: &str = "https://www.pmc.gov.in/files/sap.pdf";

    struct ScriptedGenerator {
        reply: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }
        fn failing() -> Self {
            Self {
                reply: None,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        fn model_name(&self) -> &str {
            "scripted"
        }
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Some(r) => Ok(r.clone()),
                None => bail!("quota exceeded"),
            }
        }
    }

    fn doc() -> Document {
        Document {
            id: "11".into(),
            title: "SAP Sasa-40 Training Workshop".into(),
            body: "Training for clerks on 3 April.".into(),
            display_date: Some("02 April 2024".into()),
            link: Some("/files/sap.pdf".into()),
            content_type: "circular".into(),
        }
    }

    fn composer(generator: Arc<ScriptedGenerator>) -> AnswerComposer {
        AnswerComposer::new(
            generator,
            ComposerParams {
                site_base_url: "https://www.pmc.gov.in".into(),
                ..Default::default()
            },
        )
    }

    fn turn(role: Role, content: &str) -> ConversationTurn {
        ConversationTurn {
            role,
            content: content.to_string(),
            document_id: None,
        }
    }

    #[test]
    fn test_rewrite_collapses_duplicate_links() {
        let text = "See https://drive.example.org/x.pdf. Also [here](https://other.org/y) \
                    and https://third.org/z";
        let out = rewrite_links(text, Some(LINK), Language::English);
        assert_eq!(out, format!("See [Link]({}). Also here and", LINK));
        assert_eq!(out.matches("](").count(), 1);
    }

    #[test]
    fn test_rewrite_drops_dangling_label_lines() {
        let text = "The workshop is on 3 April.\nLink: https://a.org/1\nLink: https://a.org/2";
        let out = rewrite_links(text, Some(LINK), Language::English);
        assert_eq!(
            out,
            format!("The workshop is on 3 April.\nLink: [Link]({})", LINK)
        );
    }

    #[test]
    fn test_rewrite_appends_link_when_absent() {
        let out = rewrite_links("कार्यशाळा ३ एप्रिल रोजी आहे.", Some(LINK), Language::Marathi);
        assert_eq!(out, format!("कार्यशाळा ३ एप्रिल रोजी आहे.\n\n[लिंक]({})", LINK));
    }

    #[test]
    fn test_rewrite_without_document_link_is_identity() {
        let text = "Visit https://x.org now";
        assert_eq!(rewrite_links(text, None, Language::English), text);
    }

    #[test]
    fn test_prompt_keeps_last_three_exchanges() {
        let history: Vec<ConversationTurn> = (0..5)
            .flat_map(|i| {
                vec![
                    turn(Role::User, &format!("question {}", i)),
                    turn(Role::Assistant, &format!("answer {}", i)),
                ]
            })
            .collect();
        let prompt = build_prompt(
            "when is it?",
            &doc(),
            Some(LINK),
            &history,
            Language::English,
            &ComposerParams::default(),
        );
        assert!(!prompt.contains("question 1"));
        assert!(prompt.contains("User: question 2"));
        assert!(prompt.contains("Assistant: answer 4"));
        assert!(prompt.contains("Title: SAP Sasa-40 Training Workshop"));
        assert!(prompt.contains("Date: 02 April 2024"));
        assert!(prompt.contains(&format!("Link: {}", LINK)));
        assert!(prompt.trim_end().ends_with("Question: when is it?"));
    }

    #[test]
    fn test_prompt_with_unbounded_history_window() {
        let history = vec![
            turn(Role::User, "question 0"),
            turn(Role::Assistant, "answer 0"),
        ];
        let params = ComposerParams {
            history_exchanges: usize::MAX,
            ..ComposerParams::default()
        };
        let prompt = build_prompt("when?", &doc(), None, &history, Language::English, &params);
        assert!(prompt.contains("User: question 0"));
        assert!(prompt.contains("Assistant: answer 0"));
    }

    #[test]
    fn test_prompt_in_marathi() {
        let prompt = build_prompt(
            "कार्यशाळा कधी आहे?",
            &doc(),
            None,
            &[],
            Language::Marathi,
            &ComposerParams::default(),
        );
        assert!(prompt.contains("मराठीत"));
        assert!(prompt.contains("शीर्षक: SAP Sasa-40 Training Workshop"));
        assert!(!prompt.contains("लिंक:"));
    }

    #[tokio::test]
    async fn test_compose_rewrites_generated_links() {
        let generator = Arc::new(ScriptedGenerator::replying(
            "  The workshop is on 3 April: https://wrong.example/sap  ",
        ));
        let c = composer(generator.clone());
        let d = doc();

        let answer = c.compose("when?", Some(&d), &[], Language::English).await;
        assert!(answer.generated);
        assert_eq!(
            answer.text,
            format!("The workshop is on 3 April: [Link]({})", LINK)
        );
        assert_eq!(answer.link.as_deref(), Some(LINK));
        assert_eq!(generator.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_compose_falls_back_when_generation_fails() {
        let c = composer(Arc::new(ScriptedGenerator::failing()));
        let d = doc();

        let answer = c.compose("when?", Some(&d), &[], Language::English).await;
        assert!(!answer.generated);
        assert_eq!(
            answer.text,
            format!(
                "The most relevant document I found is \"SAP Sasa-40 Training Workshop\", \
                 dated 02 April 2024.\n\n[Link]({})",
                LINK
            )
        );
    }

    #[tokio::test]
    async fn test_compose_without_document_apologizes_without_calling_model() {
        let generator = Arc::new(ScriptedGenerator::replying("unused"));
        let c = composer(generator.clone());

        let answer = c.compose("anything", None, &[], Language::Marathi).await;
        assert_eq!(answer.text, apology(Language::Marathi));
        assert!(answer.link.is_none());
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_direct_answer_format() {
        let text = direct_answer(&doc(), Some(LINK), 100);
        assert_eq!(
            text,
            format!(
                "Subject: SAP Sasa-40 Training Workshop\nDetails: Training for clerks on 3 April.\nLink: {}",
                LINK
            )
        );
    }
}
