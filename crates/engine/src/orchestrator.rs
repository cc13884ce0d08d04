//! Generation orchestrator.
//!
//! Each request runs as an explicit state machine:
//!
//! ```text
//! Classifying -> Retrieving -> Generating -> StreamingContent   -> Citations -> Done
//!                                         \-> AccumulatingReport /
//! ```
//!
//! `Failed` is reachable from any state and still ends with one
//! explanatory content frame. Frames go out on an `mpsc` channel; when
//! the receiver is dropped the run stops at its next suspension point,
//! dropping the in-flight upstream stream and releasing its permits.

use crate::citations::derive_citations;
use crate::classifier::{Classification, QueryClassifier, QueryKind};
use crate::context::{ContextAssembler, ContextWindow, Enrichment};
use crate::query::Query;
use crate::report::decode_report;
use crate::transport::Frame;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use govbrief_core::config::GenerationSettings;
use govbrief_core::{AppConfig, AppError, AppResult};
use govbrief_evidence::{
    create_store, GdeltNews, LexiconSentiment, NewsService, RetrievalAdapter, SentimentService,
};
use govbrief_llm::{create_client, LlmClient, LlmRequest, LlmStream, LlmStreamChunk, OutputSchema};
use govbrief_prompt::{
    build_prompt, load_prompt, PromptDefinition, NARRATIVE_PROMPT_ID, REPORT_PROMPT_ID,
    STRICT_REPORT_PROMPT_ID,
};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tracing::Instrument;
use uuid::Uuid;

/// Attempts at opening a generation stream before the request fails.
const OPEN_ATTEMPTS: u32 = 2;

/// Narrative completions tried when a stream stalls before its first frame.
const NARRATIVE_ATTEMPTS: u32 = 2;

/// Channel capacity used by [`Orchestrator::collect`].
pub const FRAME_BUFFER: usize = 32;

/// Prefix of the narrative sent when no valid report could be produced.
pub const FALLBACK_CAVEAT: &str = "Note: a structured decision report could not be produced \
for this question, so the analysis is shown as plain text instead.";

/// Source of report timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Classifying,
    Retrieving,
    Generating,
    StreamingContent,
    AccumulatingReport { attempt: u32 },
    Citations,
    Done,
    Failed,
}

/// How a request ended, for callers that report on it.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub kind: QueryKind,
    /// `Done` or `Failed`
    pub state: PipelineState,
    /// Retrieval gave up and the answer was generated without evidence
    pub degraded: bool,
    /// A decision request was answered with the narrative fallback
    pub fallback: bool,
    pub frames: usize,
}

/// The three prompts a request may use.
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub narrative: PromptDefinition,
    pub report: PromptDefinition,
    /// Used for report retries after a schema failure
    pub strict: PromptDefinition,
}

impl PromptSet {
    /// Load prompts, preferring workspace overrides.
    pub fn load(workspace: &Path) -> AppResult<Self> {
        Ok(Self {
            narrative: load_prompt(workspace, NARRATIVE_PROMPT_ID)?,
            report: load_prompt(workspace, REPORT_PROMPT_ID)?,
            strict: load_prompt(workspace, STRICT_REPORT_PROMPT_ID)?,
        })
    }

    pub fn builtin() -> AppResult<Self> {
        Ok(Self {
            narrative: govbrief_prompt::builtin_prompt(NARRATIVE_PROMPT_ID)?,
            report: govbrief_prompt::builtin_prompt(REPORT_PROMPT_ID)?,
            strict: govbrief_prompt::builtin_prompt(STRICT_REPORT_PROMPT_ID)?,
        })
    }
}

/// Long-lived handles shared by every request.
#[derive(Clone)]
pub struct Orchestrator {
    classifier: QueryClassifier,
    retrieval: RetrievalAdapter,
    assembler: ContextAssembler,
    llm: Arc<dyn LlmClient>,
    model: String,
    prompts: Arc<PromptSet>,
    news: Option<Arc<dyn NewsService>>,
    sentiment: Option<Arc<dyn SentimentService>>,
    settings: GenerationSettings,
    top_k: usize,
    permits: Arc<Semaphore>,
    open_timeout: Duration,
    chunk_timeout: Duration,
    enrichment_timeout: Duration,
    clock: Clock,
}

impl Orchestrator {
    pub fn new(
        config: &AppConfig,
        llm: Arc<dyn LlmClient>,
        retrieval: RetrievalAdapter,
        prompts: PromptSet,
    ) -> Self {
        let settings = config.generation.clone();
        Self {
            classifier: QueryClassifier::new(&config.classifier),
            retrieval,
            assembler: ContextAssembler::new(config.context),
            llm,
            model: config.model.clone(),
            prompts: Arc::new(prompts),
            news: None,
            sentiment: None,
            top_k: config.retrieval.top_k,
            permits: Arc::new(Semaphore::new(settings.max_concurrency.max(1))),
            open_timeout: Duration::from_secs(settings.timeout_secs),
            chunk_timeout: Duration::from_secs(settings.chunk_timeout_secs),
            enrichment_timeout: Duration::from_secs(config.news.timeout_secs),
            settings,
            clock: Arc::new(Utc::now),
        }
    }

    /// Build every handle from configuration: store, provider, prompts
    /// and, when enabled, news with sentiment.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let store = create_store(&config.retrieval, &config.default_passages_path()).await?;
        let retrieval = RetrievalAdapter::new(store, &config.retrieval);

        let provider_config = config.get_provider_config(&config.provider);
        let api_key = config.resolve_api_key(&config.provider);
        let llm = create_client(&config.provider, provider_config.as_ref(), api_key.as_deref())?;

        let prompts = PromptSet::load(&config.workspace)?;

        let mut orchestrator = Self::new(config, llm, retrieval, prompts);
        if config.news.enabled {
            orchestrator = orchestrator
                .with_news(Arc::new(GdeltNews::new(&config.news)?))
                .with_sentiment(Arc::new(LexiconSentiment::default()));
        }

        tracing::info!(
            provider = orchestrator.llm.provider_name(),
            model = %orchestrator.model,
            store = orchestrator.retrieval.store_name(),
            news = orchestrator.news.is_some(),
            "Orchestrator ready"
        );
        Ok(orchestrator)
    }

    pub fn with_news(mut self, news: Arc<dyn NewsService>) -> Self {
        self.news = Some(news);
        self
    }

    pub fn with_sentiment(mut self, sentiment: Arc<dyn SentimentService>) -> Self {
        self.sentiment = Some(sentiment);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Override the stream-open and inter-chunk timeouts.
    pub fn with_timeouts(mut self, open: Duration, chunk: Duration) -> Self {
        self.open_timeout = open;
        self.chunk_timeout = chunk;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.llm.provider_name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn retrieval(&self) -> &RetrievalAdapter {
        &self.retrieval
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn classify(&self, text: &str) -> AppResult<Classification> {
        self.classifier.classify(text)
    }

    /// Classify and run a request, sending frames as they are produced.
    ///
    /// # Errors
    /// `Validation` before any frame for an empty query; `Cancelled` when
    /// the receiver is dropped mid-run. Every other failure is reported
    /// in-band and yields a `Failed` outcome.
    pub async fn run(&self, query: &Query, frames: mpsc::Sender<Frame>) -> AppResult<RunOutcome> {
        let classification = self.classify(&query.message)?;
        self.run_classified(query, &classification, frames).await
    }

    /// Run a request whose classification is already known.
    pub async fn run_classified(
        &self,
        query: &Query,
        classification: &Classification,
        frames: mpsc::Sender<Frame>,
    ) -> AppResult<RunOutcome> {
        let span = tracing::info_span!(
            "request",
            request_id = %Uuid::new_v4(),
            kind = %classification.kind
        );

        let run = Run {
            engine: self,
            query,
            kind: classification.kind,
            frames,
            state: PipelineState::Classifying,
            sent: 0,
        };

        async move {
            tracing::info!(
                confidence = classification.confidence,
                reasoning = %classification.reasoning,
                "Query classified"
            );
            let result = run.execute().await;
            if matches!(result, Err(AppError::Cancelled)) {
                tracing::info!("Caller disconnected; request cancelled");
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Run a request to completion and return every frame it produced.
    pub async fn collect(&self, query: &Query) -> AppResult<(RunOutcome, Vec<Frame>)> {
        let (tx, mut rx) = mpsc::channel(FRAME_BUFFER);
        let gather = async {
            let mut frames = Vec::new();
            while let Some(frame) = rx.recv().await {
                frames.push(frame);
            }
            frames
        };
        let (outcome, frames) = tokio::join!(self.run(query, tx), gather);
        Ok((outcome?, frames))
    }

    async fn enrich(&self, query: &Query) -> Option<Enrichment> {
        if !query.wants_enrichment() {
            return None;
        }
        let news_service = self.news.as_ref()?;

        let fetch = news_service.fetch(&query.message);
        let news = match tokio::time::timeout(self.enrichment_timeout, fetch).await {
            Ok(Ok(articles)) => articles,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "News enrichment unavailable");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!("News enrichment timed out after {:?}", self.enrichment_timeout);
                Vec::new()
            }
        };

        let sentiment = match &self.sentiment {
            Some(service) if query.include_sentiment => match service.analyze(&news).await {
                Ok(summary) => Some(summary),
                Err(e) => {
                    tracing::warn!(error = %e, "Sentiment analysis unavailable");
                    None
                }
            },
            _ => None,
        };

        Some(Enrichment { news, sentiment })
    }

    fn request(
        &self,
        prompt: &PromptDefinition,
        window: &ContextWindow,
        query: &Query,
        temperature: f32,
    ) -> AppResult<LlmRequest> {
        let built = build_prompt(prompt, &window.to_prompt_inputs(&query.message))?;
        let mut request = LlmRequest::new(built.user, &self.model)
            .with_temperature(temperature)
            .with_max_tokens(self.settings.max_tokens);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if built.metadata.expects_json {
            request = request.with_schema(OutputSchema::JsonObject);
        }
        Ok(request)
    }

    /// Open a completion stream, retrying once on error or timeout.
    async fn open_stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        let mut last_error = None;
        for attempt in 1..=OPEN_ATTEMPTS {
            match tokio::time::timeout(self.open_timeout, self.llm.stream(request)).await {
                Ok(Ok(stream)) => return Ok(stream),
                Ok(Err(e)) => {
                    tracing::warn!(
                        provider = self.llm.provider_name(),
                        attempt,
                        error = %e,
                        "Generation request failed"
                    );
                    last_error = Some(e);
                }
                Err(_) => {
                    tracing::warn!(
                        provider = self.llm.provider_name(),
                        attempt,
                        "Generation request timed out after {:?}",
                        self.open_timeout
                    );
                    last_error = Some(AppError::UpstreamDegraded(format!(
                        "provider did not respond within {:?}",
                        self.open_timeout
                    )));
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| AppError::UpstreamDegraded("generation unavailable".to_string())))
    }
}

/// What generation produced, for citation derivation.
struct Generated {
    text: String,
    fallback: bool,
}

/// Per-request state.
struct Run<'a> {
    engine: &'a Orchestrator,
    query: &'a Query,
    kind: QueryKind,
    frames: mpsc::Sender<Frame>,
    state: PipelineState,
    sent: usize,
}

impl Run<'_> {
    fn enter(&mut self, next: PipelineState) {
        tracing::debug!(from = ?self.state, to = ?next, "Pipeline transition");
        self.state = next;
    }

    async fn emit(&mut self, frame: Frame) -> AppResult<()> {
        self.frames
            .send(frame)
            .await
            .map_err(|_| AppError::Cancelled)?;
        self.sent += 1;
        Ok(())
    }

    /// Await `fut` unless the caller goes away first.
    async fn guard<F: Future>(&self, fut: F) -> AppResult<F::Output> {
        tokio::select! {
            biased;
            _ = self.frames.closed() => Err(AppError::Cancelled),
            out = fut => Ok(out),
        }
    }

    async fn next_chunk(&self, stream: &mut LlmStream) -> AppResult<Option<LlmStreamChunk>> {
        let timeout = self.engine.chunk_timeout;
        match self.guard(tokio::time::timeout(timeout, stream.next())).await? {
            Err(_) => Err(AppError::UpstreamDegraded(format!(
                "model produced no output for {:?}",
                timeout
            ))),
            Ok(None) => Ok(None),
            Ok(Some(chunk)) => chunk.map(Some),
        }
    }

    fn outcome(&self, degraded: bool, fallback: bool) -> RunOutcome {
        RunOutcome {
            kind: self.kind,
            state: self.state,
            degraded,
            fallback,
            frames: self.sent,
        }
    }

    async fn execute(mut self) -> AppResult<RunOutcome> {
        let engine = self.engine;
        let query = self.query;

        self.enter(PipelineState::Retrieving);
        let (retrieval, enrichment) = self
            .guard(async {
                tokio::join!(
                    engine.retrieval.retrieve(&query.message, engine.top_k),
                    engine.enrich(query)
                )
            })
            .await?;

        let window = engine
            .assembler
            .assemble(&retrieval.passages, enrichment.as_ref(), query);
        tracing::info!(
            passages = window.len(),
            dropped = window.dropped(),
            news = window.news().len(),
            sentiment = window.has_sentiment(),
            degraded = retrieval.degraded,
            "Context assembled"
        );

        self.enter(PipelineState::Generating);
        let generated = match self.generate(&window).await {
            Ok(generated) => generated,
            Err(AppError::Cancelled) => return Err(AppError::Cancelled),
            Err(e) => {
                self.fail(e).await?;
                return Ok(self.outcome(retrieval.degraded, false));
            }
        };

        self.enter(PipelineState::Citations);
        let citations = derive_citations(&window, &generated.text);
        self.emit(Frame::Citations(citations)).await?;

        self.enter(PipelineState::Done);
        tracing::info!(frames = self.sent, fallback = generated.fallback, "Request complete");
        Ok(self.outcome(retrieval.degraded, generated.fallback))
    }

    async fn generate(&mut self, window: &ContextWindow) -> AppResult<Generated> {
        let engine = self.engine;
        let _permit = self
            .guard(engine.permits.acquire())
            .await?
            .map_err(|_| AppError::Other("generation pool closed".to_string()))?;

        match self.kind {
            QueryKind::Exploratory => self.stream_narrative(window).await,
            QueryKind::Decision => self.accumulate_report(window).await,
        }
    }

    /// Stream the narrative, starting over once if the provider stalls
    /// before anything reached the caller.
    async fn stream_narrative(&mut self, window: &ContextWindow) -> AppResult<Generated> {
        self.enter(PipelineState::StreamingContent);
        let engine = self.engine;
        let request = engine.request(
            &engine.prompts.narrative,
            window,
            self.query,
            engine.settings.temperature,
        )?;

        let mut attempt = 1;
        loop {
            match self.forward(&request).await {
                Ok(text) => {
                    return Ok(Generated {
                        text,
                        fallback: false,
                    })
                }
                Err(AppError::UpstreamDegraded(reason))
                    if self.sent == 0 && attempt < NARRATIVE_ATTEMPTS =>
                {
                    tracing::warn!(attempt, reason = %reason, "Narrative stalled; retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Forward each chunk as a content frame, in arrival order.
    async fn forward(&mut self, request: &LlmRequest) -> AppResult<String> {
        let mut stream = self.guard(self.engine.open_stream(request)).await??;
        let mut text = String::new();
        while let Some(chunk) = self.next_chunk(&mut stream).await? {
            if !chunk.content.is_empty() {
                text.push_str(&chunk.content);
                self.emit(Frame::Content(chunk.content)).await?;
            }
            if chunk.done {
                break;
            }
        }
        Ok(text)
    }

    /// Buffer the full output of one completion.
    async fn drain(&self, request: &LlmRequest) -> AppResult<String> {
        let mut stream = self.guard(self.engine.open_stream(request)).await??;
        let mut text = String::new();
        while let Some(chunk) = self.next_chunk(&mut stream).await? {
            text.push_str(&chunk.content);
            if chunk.done {
                break;
            }
        }
        Ok(text)
    }

    /// Generate and decode a report, retrying with the strict prompt;
    /// fall back to a caveated narrative when every attempt fails.
    ///
    /// A stalled attempt counts against the same bound as a rejected one.
    /// If every attempt stalled there is nothing to fall back to and the
    /// stall is returned.
    async fn accumulate_report(&mut self, window: &ContextWindow) -> AppResult<Generated> {
        let engine = self.engine;
        let attempts = engine.settings.report_retries + 1;
        let mut last_text = String::new();
        let mut stall = None;

        for attempt in 1..=attempts {
            self.enter(PipelineState::AccumulatingReport { attempt });
            let prompt = if attempt == 1 {
                &engine.prompts.report
            } else {
                &engine.prompts.strict
            };
            let request =
                engine.request(prompt, window, self.query, engine.settings.report_temperature)?;
            let text = match self.drain(&request).await {
                Ok(text) => text,
                Err(AppError::UpstreamDegraded(reason)) => {
                    tracing::warn!(attempt, attempts, reason = %reason, "Report attempt stalled");
                    stall = Some(AppError::UpstreamDegraded(reason));
                    continue;
                }
                Err(e) => return Err(e),
            };

            match decode_report(&text) {
                Ok(mut report) => {
                    report.annotate(&self.query.message, window, (engine.clock)());
                    self.emit(Frame::Report(Box::new(report))).await?;
                    return Ok(Generated {
                        text,
                        fallback: false,
                    });
                }
                Err(e) => {
                    tracing::warn!(attempt, attempts, error = %e, "Report output rejected");
                    last_text = text;
                }
            }
        }

        let best_effort = last_text.trim();
        if best_effort.is_empty() {
            if let Some(stall) = stall {
                return Err(stall);
            }
        }

        tracing::warn!(attempts, "No valid report; answering with narrative fallback");
        let body = if best_effort.is_empty() {
            FALLBACK_CAVEAT.to_string()
        } else {
            format!("{}\n\n{}", FALLBACK_CAVEAT, best_effort)
        };
        self.emit(Frame::Content(body)).await?;

        Ok(Generated {
            text: last_text,
            fallback: true,
        })
    }

    /// Enter `Failed` and send the closing explanation.
    async fn fail(&mut self, error: AppError) -> AppResult<()> {
        self.enter(PipelineState::Failed);
        tracing::error!(error = %error, "Request failed");

        let reason = match error {
            AppError::UpstreamDegraded(_) => {
                "The analysis service did not respond in time, so the answer could not be completed."
            }
            _ => "An error occurred while generating the answer, so it could not be completed.",
        };
        let message = if self.sent > 0 {
            format!("\n\n{} Please try again shortly.", reason)
        } else {
            format!("{} Please try again shortly.", reason)
        };
        self.emit(Frame::Content(message)).await
    }
}
