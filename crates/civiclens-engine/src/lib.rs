use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use civiclens_contracts::briefs::{
    extract_problem_excerpt, DetectionReport, MissionBrief, SocraticGuidance, SolutionTemplate,
};
use civiclens_contracts::classify::{parse_classification, Classification};
use civiclens_contracts::events::EventWriter;
use civiclens_contracts::prompts::{
    classification_prompt, critical_thinking_prompt, detection_prompt, interactive_prompt,
    mission_prompt, solution_template_prompt, vision_classification_prompt, ChatTurn, MentorMode,
    TemplateKind,
};
use civiclens_contracts::report::{render_image_summary, render_text_summary, write_report};
use civiclens_contracts::taxonomy::ProblemTaxonomy;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_VISION_MODEL: &str = "gemini-2.5-flash";

const MAX_IMAGE_BYTES: u64 = 20 * 1024 * 1024;
const MAX_UPLOAD_EDGE: u32 = 2048;
const JPEG_QUALITY: u8 = 85;
const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Explicit per-platform configuration. Constructed once at startup and
/// passed to every service; nothing reads process-wide mutable state.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub text_model: String,
    pub vision_model: String,
    pub taxonomy: ProblemTaxonomy,
}

impl PlatformConfig {
    pub fn with_models(text_model: &str, vision_model: &str) -> Self {
        Self {
            text_model: text_model.to_string(),
            vision_model: vision_model.to_string(),
            taxonomy: ProblemTaxonomy::default(),
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self::with_models(DEFAULT_TEXT_MODEL, DEFAULT_VISION_MODEL)
    }
}

/// A validated image upload, ready to send inline. Oversized images are
/// re-encoded before upload so the request stays within provider limits.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub path: PathBuf,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub sha256: String,
}

impl ImageAttachment {
    pub fn load(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|value| value.to_str())
            .map(|value| value.to_ascii_lowercase())
            .unwrap_or_default();
        if !ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            bail!(
                "unsupported image extension {:?} (expected one of {})",
                ext,
                ALLOWED_IMAGE_EXTENSIONS.join(", ")
            );
        }

        let bytes =
            fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
        if bytes.len() as u64 > MAX_IMAGE_BYTES {
            bail!(
                "image {} exceeds the {} MiB upload limit",
                path.display(),
                MAX_IMAGE_BYTES / (1024 * 1024)
            );
        }

        let decoded = image::load_from_memory(&bytes)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        let (width, height) = (decoded.width(), decoded.height());

        let (bytes, mime, width, height) = if width.max(height) > MAX_UPLOAD_EDGE {
            let resized = decoded
                .resize(MAX_UPLOAD_EDGE, MAX_UPLOAD_EDGE, FilterType::Lanczos3)
                .to_rgb8();
            let (width, height) = (resized.width(), resized.height());
            let mut out = Vec::new();
            let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
            encoder
                .encode_image(&image::DynamicImage::ImageRgb8(resized))
                .context("failed to re-encode oversized image")?;
            (out, "image/jpeg", width, height)
        } else {
            (bytes, mime_for_extension(&ext), width, height)
        };

        let sha256 = hex::encode(Sha256::digest(&bytes));
        Ok(Self {
            path: path.to_path_buf(),
            mime,
            bytes,
            width,
            height,
            sha256,
        })
    }
}

/// One synchronous call to the generative-language service.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub image: Option<ImageAttachment>,
}

impl GenerateRequest {
    pub fn text(model: &str, prompt: String) -> Self {
        Self {
            model: model.to_string(),
            prompt,
            image: None,
        }
    }

    pub fn with_image(model: &str, prompt: String, image: ImageAttachment) -> Self {
        Self {
            model: model.to_string(),
            prompt,
            image: Some(image),
        }
    }
}

/// The external AI service boundary. Providers return free-form text and
/// make no promise about its structure; everything downstream treats the
/// reply as untrusted prose.
pub trait TextProvider {
    fn name(&self) -> &str;
    fn generate(&self, request: &GenerateRequest) -> Result<String>;
}

/// Route a model name to its provider. A `dryrun` prefix selects the
/// offline provider; everything else goes to the Gemini API.
pub fn provider_for_model(model: &str) -> Box<dyn TextProvider> {
    if model.trim().to_ascii_lowercase().starts_with("dryrun") {
        Box::new(DryrunProvider)
    } else {
        Box::new(GeminiProvider::new())
    }
}

struct GeminiProvider {
    api_base: String,
    http: HttpClient,
}

impl GeminiProvider {
    fn new() -> Self {
        Self {
            api_base: env::var("GEMINI_API_BASE")
                .ok()
                .map(|value| value.trim().trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            http: HttpClient::new(),
        }
    }

    fn api_key() -> Option<String> {
        non_empty_env("GEMINI_API_KEY").or_else(|| non_empty_env("GOOGLE_API_KEY"))
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn build_parts(request: &GenerateRequest) -> Vec<Value> {
        let mut parts = Vec::new();
        if let Some(image) = request.image.as_ref() {
            parts.push(json!({
                "inlineData": {
                    "mimeType": image.mime,
                    "data": BASE64.encode(&image.bytes),
                }
            }));
        }
        parts.push(json!({ "text": request.prompt }));
        parts
    }

    fn extract_text(payload: &Value) -> Result<String> {
        let candidates = payload
            .get("candidates")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for candidate in &candidates {
            let Some(parts) = candidate
                .pointer("/content/parts")
                .and_then(Value::as_array)
            else {
                continue;
            };
            let chunks: Vec<&str> = parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .filter(|text| !text.trim().is_empty())
                .collect();
            if !chunks.is_empty() {
                return Ok(chunks.join("\n"));
            }
        }
        bail!("Gemini returned no text candidates");
    }
}

impl TextProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let Some(api_key) = Self::api_key() else {
            bail!("GEMINI_API_KEY or GOOGLE_API_KEY not set");
        };
        let endpoint = self.endpoint_for_model(&request.model);
        let payload = json!({
            "contents": [{
                "role": "user",
                "parts": Self::build_parts(request),
            }],
        });

        // One shot, no retry: a failed call surfaces immediately and the
        // caller decides what to tell the user.
        let response = self
            .http
            .post(&endpoint)
            .header("x-goog-api-key", api_key)
            .json(&payload)
            .send()
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        let response_payload = response_json_or_error("Gemini", response)?;
        Self::extract_text(&response_payload)
    }
}

/// Offline provider: echoes back every section header the prompt asked
/// for, with deterministic placeholder content. Keeps the whole pipeline
/// runnable (and testable) without credentials or network.
struct DryrunProvider;

impl DryrunProvider {
    fn requested_headers(prompt: &str) -> Vec<String> {
        let mut headers = Vec::new();
        for raw in prompt.lines() {
            let mut line = raw.trim();
            // Numbered format listings ("1. GOAL: ...") still name headers.
            if line.chars().next().is_some_and(|ch| ch.is_ascii_digit()) {
                if let Some((_, tail)) = line.split_once('.') {
                    line = tail.trim();
                }
            }
            let Some(colon) = line.find(':') else {
                continue;
            };
            let head = &line[..colon];
            let upper = head.len() >= 3
                && head.chars().any(|ch| ch.is_ascii_uppercase())
                && head
                    .chars()
                    .all(|ch| ch.is_ascii_uppercase() || matches!(ch, ' ' | '/' | '-'));
            if upper {
                let header = format!("{head}:");
                if !headers.contains(&header) {
                    headers.push(header);
                }
            }
        }
        headers
    }
}

impl TextProvider for DryrunProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let headers = Self::requested_headers(&request.prompt);
        if headers.is_empty() {
            return Ok("Dryrun mentor response.".to_string());
        }
        let mut response = String::new();
        for header in headers {
            let label = header.trim_end_matches(':').to_lowercase();
            response.push_str(&format!("{header}\nDryrun {label} item.\n\n"));
        }
        Ok(response)
    }
}

/// Classification outcome plus the raw response it was read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedProblem {
    pub description: String,
    pub classification: Classification,
    pub full_response: String,
}

pub struct ProblemClassifier {
    provider: Box<dyn TextProvider>,
    model: String,
    taxonomy: ProblemTaxonomy,
}

impl ProblemClassifier {
    pub fn new(config: &PlatformConfig) -> Self {
        Self {
            provider: provider_for_model(&config.text_model),
            model: config.text_model.clone(),
            taxonomy: config.taxonomy.clone(),
        }
    }

    pub fn classify(&self, description: &str, use_reasoning: bool) -> Result<ClassifiedProblem> {
        let prompt = classification_prompt(description, &self.taxonomy, use_reasoning);
        let response = self
            .provider
            .generate(&GenerateRequest::text(&self.model, prompt))?;
        Ok(self.outcome(description, response))
    }

    pub fn classify_vision_analysis(&self, analysis: &str) -> Result<ClassifiedProblem> {
        let prompt = vision_classification_prompt(analysis, &self.taxonomy);
        let response = self
            .provider
            .generate(&GenerateRequest::text(&self.model, prompt))?;
        Ok(self.outcome(analysis, response))
    }

    pub fn classify_batch(&self, descriptions: &[String]) -> Vec<Result<ClassifiedProblem>> {
        descriptions
            .iter()
            .map(|description| self.classify(description, true))
            .collect()
    }

    fn outcome(&self, description: &str, response: String) -> ClassifiedProblem {
        let classification = parse_classification(&response, &self.taxonomy.names());
        ClassifiedProblem {
            description: description.to_string(),
            classification,
            full_response: response,
        }
    }
}

pub struct MissionGenerator {
    provider: Box<dyn TextProvider>,
    model: String,
}

impl MissionGenerator {
    pub fn new(config: &PlatformConfig) -> Self {
        Self {
            provider: provider_for_model(&config.text_model),
            model: config.text_model.clone(),
        }
    }

    pub fn generate(&self, description: &str, context: Option<&str>) -> Result<MissionBrief> {
        let prompt = mission_prompt(description, context);
        let response = self
            .provider
            .generate(&GenerateRequest::text(&self.model, prompt))?;
        Ok(MissionBrief::from_response(description, &response))
    }

    pub fn generate_batch(&self, descriptions: &[String]) -> Vec<Result<MissionBrief>> {
        descriptions
            .iter()
            .map(|description| self.generate(description, None))
            .collect()
    }
}

/// Socratic and solution-focused mentoring over one in-memory transcript.
pub struct Mentor {
    provider: Box<dyn TextProvider>,
    model: String,
    transcript: Vec<ChatTurn>,
}

impl Mentor {
    pub fn new(config: &PlatformConfig) -> Self {
        Self {
            provider: provider_for_model(&config.text_model),
            model: config.text_model.clone(),
            transcript: Vec::new(),
        }
    }

    pub fn critical_thinking(
        &self,
        problem: &str,
        context: Option<&str>,
    ) -> Result<SocraticGuidance> {
        let prompt = critical_thinking_prompt(problem, context);
        let response = self
            .provider
            .generate(&GenerateRequest::text(&self.model, prompt))?;
        Ok(SocraticGuidance::from_response(problem, &response))
    }

    pub fn solution(
        &self,
        problem: &str,
        kind: Option<TemplateKind>,
        category: Option<&str>,
    ) -> Result<SolutionTemplate> {
        let kind = kind.unwrap_or_else(|| TemplateKind::detect(problem));
        let prompt = solution_template_prompt(problem, kind, category);
        let response = self
            .provider
            .generate(&GenerateRequest::text(&self.model, prompt))?;
        Ok(SolutionTemplate::from_response(kind, problem, &response))
    }

    /// One interactive turn. The transcript grows by two entries on
    /// success and is untouched when the provider call fails.
    pub fn chat(&mut self, message: &str, mode: MentorMode) -> Result<String> {
        let prompt = interactive_prompt(&self.transcript, message, mode);
        let response = self
            .provider
            .generate(&GenerateRequest::text(&self.model, prompt))?;
        self.transcript.push(ChatTurn::user(message));
        self.transcript.push(ChatTurn::mentor(response.clone()));
        Ok(response)
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    pub fn reset(&mut self) {
        self.transcript.clear();
    }
}

pub struct IssueDetector {
    provider: Box<dyn TextProvider>,
    model: String,
    taxonomy: ProblemTaxonomy,
}

impl IssueDetector {
    pub fn new(config: &PlatformConfig) -> Self {
        Self {
            provider: provider_for_model(&config.vision_model),
            model: config.vision_model.clone(),
            taxonomy: config.taxonomy.clone(),
        }
    }

    pub fn detect(
        &self,
        attachment: &ImageAttachment,
        domains: Option<&[String]>,
    ) -> Result<DetectionReport> {
        let domains: Vec<String> = match domains {
            Some(domains) => domains.to_vec(),
            None => self.taxonomy.names(),
        };
        let prompt = detection_prompt(&self.taxonomy, &domains);
        let analysis = self.provider.generate(&GenerateRequest::with_image(
            &self.model,
            prompt,
            attachment.clone(),
        ))?;
        Ok(DetectionReport {
            analysis,
            domains_analyzed: domains,
        })
    }

    pub fn detect_file(
        &self,
        image_path: &Path,
        domains: Option<&[String]>,
    ) -> Result<DetectionReport> {
        let attachment = ImageAttachment::load(image_path)?;
        self.detect(&attachment, domains)
    }
}

/// Full image-pipeline result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAnalysis {
    pub image_path: PathBuf,
    pub detection: DetectionReport,
    pub classification: ClassifiedProblem,
    pub mission: MissionBrief,
    pub summary: String,
    pub report_path: PathBuf,
}

/// Full text-pipeline result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextAnalysis {
    pub description: String,
    pub classification: ClassifiedProblem,
    pub mission: MissionBrief,
    pub summary: String,
    pub report_path: PathBuf,
}

/// Sequences the domain services: detect, classify, generate mission. One
/// session directory holds `events.jsonl` plus the per-run analysis and
/// report artifacts. The first failing step aborts the run; the step name
/// travels in both the error chain and a `step_failed` event.
pub struct Platform {
    session_dir: PathBuf,
    events: EventWriter,
    detector: IssueDetector,
    classifier: ProblemClassifier,
    generator: MissionGenerator,
}

impl Platform {
    pub fn new(session_dir: impl Into<PathBuf>, config: PlatformConfig) -> Result<Self> {
        let session_dir = session_dir.into();
        fs::create_dir_all(&session_dir)
            .with_context(|| format!("failed to create {}", session_dir.display()))?;
        let session_id = uuid::Uuid::new_v4().to_string();
        let events = EventWriter::new(session_dir.join("events.jsonl"), session_id);

        events.emit(
            "session_started",
            map_object(json!({
                "out_dir": session_dir.to_string_lossy().to_string(),
                "text_model": config.text_model,
                "vision_model": config.vision_model,
            })),
        )?;

        Ok(Self {
            session_dir,
            events,
            detector: IssueDetector::new(&config),
            classifier: ProblemClassifier::new(&config),
            generator: MissionGenerator::new(&config),
        })
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    pub fn session_id(&self) -> &str {
        self.events.session_id()
    }

    pub fn event_writer(&self) -> EventWriter {
        self.events.clone()
    }

    pub fn process_image(&self, image_path: &Path) -> Result<ImageAnalysis> {
        let detection = self.step("vision_detection", || {
            let attachment = ImageAttachment::load(image_path)?;
            self.events.emit(
                "image_loaded",
                map_object(json!({
                    "path": image_path.to_string_lossy().to_string(),
                    "sha256": attachment.sha256,
                    "width": attachment.width,
                    "height": attachment.height,
                })),
            )?;
            self.detector.detect(&attachment, None)
        })?;

        let classification = self.step("classification", || {
            self.classifier.classify_vision_analysis(&detection.analysis)
        })?;

        let excerpt = extract_problem_excerpt(&detection.analysis);
        let context = format!(
            "Based on visual analysis. Category: {}",
            classification.classification.category
        );
        let mission = self.step("mission_generation", || {
            self.generator.generate(&excerpt, Some(&context))
        })?;

        let summary =
            render_image_summary(&detection.analysis, &classification.classification, &mission);
        let stamp = timestamp_millis();
        let analysis = ImageAnalysis {
            image_path: image_path.to_path_buf(),
            detection,
            classification,
            mission,
            summary,
            report_path: self.session_dir.join(format!("report-{stamp}.txt")),
        };
        self.write_artifacts(stamp, &serde_json::to_value(&analysis)?, &analysis.summary)?;
        Ok(analysis)
    }

    pub fn process_text(&self, description: &str) -> Result<TextAnalysis> {
        let classification = self.step("classification", || {
            self.classifier.classify(description, true)
        })?;

        let context = format!("Category: {}", classification.classification.category);
        let mission = self.step("mission_generation", || {
            self.generator.generate(description, Some(&context))
        })?;

        let summary = render_text_summary(description, &classification.classification, &mission);
        let stamp = timestamp_millis();
        let analysis = TextAnalysis {
            description: description.to_string(),
            classification,
            mission,
            summary,
            report_path: self.session_dir.join(format!("report-{stamp}.txt")),
        };
        self.write_artifacts(stamp, &serde_json::to_value(&analysis)?, &analysis.summary)?;
        Ok(analysis)
    }

    pub fn process_image_batch(&self, image_paths: &[PathBuf]) -> Vec<Result<ImageAnalysis>> {
        image_paths
            .iter()
            .map(|path| self.process_image(path))
            .collect()
    }

    fn step<T>(&self, name: &str, body: impl FnOnce() -> Result<T>) -> Result<T> {
        self.events.emit(
            "step_started",
            map_object(json!({ "step": name })),
        )?;
        match body() {
            Ok(value) => {
                self.events
                    .emit("step_finished", map_object(json!({ "step": name })))?;
                Ok(value)
            }
            Err(err) => {
                let _ = self.events.emit(
                    "step_failed",
                    map_object(json!({
                        "step": name,
                        "error": error_chain_text(&err, 512),
                    })),
                );
                Err(err.context(format!("{name} step failed")))
            }
        }
    }

    fn write_artifacts(&self, stamp: u128, analysis: &Value, summary: &str) -> Result<()> {
        let analysis_path = self.session_dir.join(format!("analysis-{stamp}.json"));
        fs::write(&analysis_path, serde_json::to_string_pretty(analysis)?)
            .with_context(|| format!("failed to write {}", analysis_path.display()))?;

        let report_path = self.session_dir.join(format!("report-{stamp}.txt"));
        write_report(&report_path, summary)?;

        self.events.emit(
            "artifacts_written",
            map_object(json!({
                "analysis": analysis_path.to_string_lossy().to_string(),
                "report": report_path.to_string_lossy().to_string(),
            })),
        )?;
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "image/png",
    }
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

pub fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts
            .last()
            .map(|existing| existing == trimmed)
            .unwrap_or(false)
        {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

fn timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0)
}

fn map_object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}
