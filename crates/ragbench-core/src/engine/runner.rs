use crate::errors::{BenchError, QuestionError, Stage};
use crate::judge::{estimate_run_cost, JudgeService, Pricing};
use crate::model::{
    now_rfc3339, new_id, Question, RetrievedItem, Run, RunResult, RunStatus, RunUpdate,
    TokenTotals,
};
use crate::providers::llm::{ChatMessage, GenerationRequest, LlmClient};
use crate::providers::retrieval::{ExecutionContext, Retriever};
use crate::report::progress::{ProgressEvent, ProgressSink};
use crate::storage::{QuestionSource, RunStore};
use futures::StreamExt;
use ragbench_metrics::{
    context_coverage, text_similarity, AggregateMetrics, GenerationMetrics, ResultMetrics,
    RetrievalMetrics, StageTimings,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

const DEFAULT_SYSTEM_PROMPT: &str = "You answer questions using only the provided context. \
If the context does not contain the answer, say that you don't know.";

#[derive(Clone)]
pub struct ExecuteOptions {
    pub on_progress: Option<ProgressSink>,
    /// Questions in flight at once. Results are still persisted in question order.
    pub parallelism: usize,
    /// Re-read the run status before persisting each result.
    pub cancellation_check: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            on_progress: None,
            parallelism: 1,
            cancellation_check: true,
        }
    }
}

impl std::fmt::Debug for ExecuteOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecuteOptions")
            .field("on_progress", &self.on_progress.is_some())
            .field("parallelism", &self.parallelism)
            .field("cancellation_check", &self.cancellation_check)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionSummary {
    pub run_id: String,
    pub status: RunStatus,
    pub total_questions: usize,
    pub aggregate_metrics: AggregateMetrics,
    pub tokens: TokenTotals,
    pub estimated_cost_usd: f64,
}

/// A run moved to `running` together with the questions it will execute.
#[derive(Debug, Clone)]
pub struct ClaimedRun {
    pub run: Run,
    pub questions: Vec<Question>,
}

/// Runs a dataset through retrieval, generation and judging for one run.
#[derive(Clone)]
pub struct Executor {
    pub runs: Arc<dyn RunStore>,
    pub questions: Arc<dyn QuestionSource>,
    pub retriever: Arc<dyn Retriever>,
    pub generator: Arc<dyn LlmClient>,
    /// `None` skips qualitative scoring.
    pub judge: Option<JudgeService>,
    pub pricing: Pricing,
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

impl Executor {
    pub async fn execute(&self, run_id: &str, opts: ExecuteOptions) -> anyhow::Result<ExecutionSummary> {
        let claimed = self.claim(run_id)?;
        self.execute_claimed(claimed, opts).await
    }

    /// Checks preconditions and atomically moves the run from `pending` to `running`.
    ///
    /// Nothing is written unless the run can start, except that a missing dataset or one
    /// without active questions marks the run failed.
    pub fn claim(&self, run_id: &str) -> anyhow::Result<ClaimedRun> {
        let mut run = self
            .runs
            .get_run(run_id)?
            .ok_or_else(|| BenchError::RunNotFound(run_id.to_string()))?;
        if run.status != RunStatus::Pending {
            return Err(BenchError::for_start(run_id, run.status).into());
        }
        if self.questions.get_dataset(&run.dataset_id)?.is_none() {
            let err =
                self.fail_pending(run_id, BenchError::DatasetNotFound(run.dataset_id.clone()))?;
            return Err(err);
        }

        let questions = self.questions.list_active_questions(&run.dataset_id)?;
        if questions.is_empty() {
            let err =
                self.fail_pending(run_id, BenchError::EmptyDataset(run.dataset_id.clone()))?;
            return Err(err);
        }

        let started_at = now_rfc3339();
        let update = RunUpdate {
            progress: Some(0),
            started_at: Some(started_at.clone()),
            total_questions: Some(questions.len()),
            ..Default::default()
        };
        if !self
            .runs
            .transition(run_id, RunStatus::Pending, RunStatus::Running, &update)?
        {
            // another start won the race
            let status = self
                .runs
                .get_run(run_id)?
                .map(|r| r.status)
                .filter(|s| *s != RunStatus::Pending)
                .unwrap_or(RunStatus::Running);
            return Err(BenchError::for_start(run_id, status).into());
        }

        run.status = RunStatus::Running;
        run.progress = 0;
        run.started_at = Some(started_at);
        run.total_questions = questions.len();
        Ok(ClaimedRun { run, questions })
    }

    /// A pending run with nothing to execute ends `failed`; `err` is handed back for the caller.
    fn fail_pending(&self, run_id: &str, err: BenchError) -> anyhow::Result<anyhow::Error> {
        let failed = self.runs.transition(
            run_id,
            RunStatus::Pending,
            RunStatus::Failed,
            &RunUpdate::failed(err.to_string()),
        )?;
        if failed {
            warn!(run_id, error = %err, "run failed before start");
        }
        Ok(err.into())
    }

    /// Executes a run already claimed by [`Executor::claim`].
    ///
    /// Systemic failures mark the run failed and are returned; cancellation stops the
    /// loop and returns [`BenchError::Cancelled`] with the persisted results left intact.
    pub async fn execute_claimed(
        &self,
        claimed: ClaimedRun,
        opts: ExecuteOptions,
    ) -> anyhow::Result<ExecutionSummary> {
        let span = info_span!("benchmark.run", run_id = %claimed.run.id);
        async move {
            let ClaimedRun { run, questions } = claimed;
            info!(
                questions = questions.len(),
                run_type = %run.run_type,
                parallelism = opts.parallelism,
                "run started"
            );
            match self.run_loop(&run, &questions, &opts).await {
                Ok(summary) => Ok(summary),
                Err(e) if matches!(e.downcast_ref::<BenchError>(), Some(BenchError::Cancelled(_))) => {
                    info!("run cancelled; persisted results kept");
                    Err(e)
                }
                Err(e) => {
                    let message = format!("{:#}", e);
                    error!(error = %message, "run failed");
                    if let Err(mark_err) = self.runs.transition(
                        &run.id,
                        RunStatus::Running,
                        RunStatus::Failed,
                        &RunUpdate::failed(message),
                    ) {
                        warn!(error = %mark_err, "could not mark run failed");
                    }
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_loop(
        &self,
        run: &Run,
        questions: &[Question],
        opts: &ExecuteOptions,
    ) -> anyhow::Result<ExecutionSummary> {
        let ctx = ExecutionContext::from_snapshot(&run.knowledge_base_id, &run.rag_config_snapshot);
        let total = questions.len();

        let pending: Vec<_> = questions
            .iter()
            .enumerate()
            .map(|(seq, q)| self.process_question(run, &ctx, q, seq as i64))
            .collect();
        let mut outcomes = futures::stream::iter(pending).buffered(opts.parallelism.max(1));

        let mut results: Vec<RunResult> = Vec::with_capacity(total);
        let mut tokens = TokenTotals::default();
        while let Some(result) = outcomes.next().await {
            if opts.cancellation_check {
                self.ensure_active(&run.id)?;
            }
            self.runs.insert_result(&result)?;
            tokens += result.tokens;
            results.push(result);

            let ev = ProgressEvent::new(results.len(), total);
            if !self.runs.transition(
                &run.id,
                RunStatus::Running,
                RunStatus::Running,
                &RunUpdate::progress(ev.percent),
            )? {
                return Err(self.interrupted(&run.id));
            }
            if let Some(sink) = &opts.on_progress {
                sink(ev);
            }
        }
        drop(outcomes);

        let samples: Vec<_> = results.iter().map(RunResult::sample).collect();
        let aggregate = ragbench_metrics::aggregate(&samples, run.run_type.success_criterion());
        let estimated_cost_usd = estimate_run_cost(&tokens, self.pricing);

        let update = RunUpdate {
            progress: Some(100),
            completed_at: Some(now_rfc3339()),
            aggregate_metrics: Some(aggregate.clone()),
            total_questions: Some(total),
            tokens: Some(tokens),
            estimated_cost_usd: Some(estimated_cost_usd),
            ..Default::default()
        };
        if !self
            .runs
            .transition(&run.id, RunStatus::Running, RunStatus::Completed, &update)?
        {
            return Err(self.interrupted(&run.id));
        }

        info!(
            total_questions = total,
            successful = aggregate.successful_questions,
            success_rate = aggregate.success_rate,
            tokens = tokens.total(),
            estimated_cost_usd,
            "run completed"
        );
        Ok(ExecutionSummary {
            run_id: run.id.clone(),
            status: RunStatus::Completed,
            total_questions: total,
            aggregate_metrics: aggregate,
            tokens,
            estimated_cost_usd,
        })
    }

    fn ensure_active(&self, run_id: &str) -> anyhow::Result<()> {
        match self.runs.get_run(run_id)? {
            Some(r) if r.status == RunStatus::Cancelled => {
                Err(BenchError::Cancelled(run_id.to_string()).into())
            }
            Some(_) => Ok(()),
            None => Err(BenchError::RunNotFound(run_id.to_string()).into()),
        }
    }

    /// Error for a conditional write that found the run no longer running.
    fn interrupted(&self, run_id: &str) -> anyhow::Error {
        match self.runs.get_run(run_id) {
            Ok(Some(r)) if r.status == RunStatus::Cancelled => {
                BenchError::Cancelled(run_id.to_string()).into()
            }
            Ok(Some(r)) => anyhow::anyhow!("run {} left the running state (now {})", run_id, r.status),
            Ok(None) => BenchError::RunNotFound(run_id.to_string()).into(),
            Err(e) => e,
        }
    }

    /// Never fails: pipeline errors become a failed result row.
    async fn process_question(
        &self,
        run: &Run,
        ctx: &ExecutionContext,
        question: &Question,
        seq: i64,
    ) -> RunResult {
        match self.evaluate_question(run, ctx, question, seq).await {
            Ok(result) => result,
            Err(qe) => {
                warn!(
                    question_id = %question.id,
                    kind = qe.kind.as_str(),
                    error = %qe.message,
                    "question failed"
                );
                let kind = qe.kind.as_str().to_string();
                RunResult::failed(
                    &run.id,
                    question,
                    seq,
                    ResultMetrics::failed(qe.message, Some(kind)),
                )
            }
        }
    }

    async fn evaluate_question(
        &self,
        run: &Run,
        ctx: &ExecutionContext,
        question: &Question,
        seq: i64,
    ) -> Result<RunResult, QuestionError> {
        let started = Instant::now();
        let mut timings = StageTimings::default();
        let mut tokens = TokenTotals::default();

        let search_started = Instant::now();
        let output = self
            .retriever
            .search(ctx, &question.question)
            .await
            .map_err(|e| QuestionError::at_stage(Stage::Retrieval, &e))?;
        timings.vector_search_ms = Some(elapsed_ms(search_started));
        timings.retrieval_stages_ms = output.stage_timings_ms;
        let enhanced_query = output.enhanced_query;
        let retrieved_ids: Vec<String> = output.items.iter().map(|i| i.id.clone()).collect();
        let mut retrieved: Vec<RetrievedItem> =
            output.items.into_iter().map(RetrievedItem::from).collect();
        debug!(
            question_id = %question.id,
            stage = "retrieval",
            elapsed_ms = timings.vector_search_ms,
            retrieved = retrieved_ids.len(),
            "retrieval done"
        );

        let answer = if run.run_type.generates_answers() {
            self.generate_answer(ctx, question, &retrieved, &mut timings, &mut tokens)
                .await
        } else {
            None
        };

        let mut retrieval = RetrievalMetrics::compute(&retrieved_ids, &question.expected_context_ids);

        let generation = match answer.as_deref() {
            Some(answer) => Some(
                self.score_answer(question, answer, &mut retrieved, &mut retrieval, &mut timings, &mut tokens)
                    .await,
            ),
            None => None,
        };

        timings.total_ms = Some(elapsed_ms(started));
        debug!(
            question_id = %question.id,
            elapsed_ms = timings.total_ms,
            answered = answer.is_some(),
            "question done"
        );

        Ok(RunResult {
            id: new_id(),
            run_id: run.id.clone(),
            question_id: question.id.clone(),
            seq,
            input_question: question.question.clone(),
            enhanced_query,
            retrieved_context_ids: retrieved_ids,
            retrieved_context: retrieved,
            generated_answer: answer,
            timings,
            tokens,
            metrics: ResultMetrics::Scored {
                retrieval,
                generation,
            },
            created_at: now_rfc3339(),
        })
    }

    /// `None` on generation failure or a blank answer; token usage then stays zero.
    async fn generate_answer(
        &self,
        ctx: &ExecutionContext,
        question: &Question,
        retrieved: &[RetrievedItem],
        timings: &mut StageTimings,
        tokens: &mut TokenTotals,
    ) -> Option<String> {
        let request = GenerationRequest {
            provider: ctx.settings.provider.clone(),
            model: ctx.settings.model.clone(),
            messages: vec![ChatMessage::user(answer_prompt(&question.question, retrieved))],
            system_prompt: Some(
                ctx.settings
                    .system_prompt
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            ),
            temperature: ctx.settings.temperature,
            max_tokens: ctx.settings.max_tokens,
        };

        let gen_started = Instant::now();
        let result = self.generator.generate(&request).await;
        timings.generation_ms = Some(elapsed_ms(gen_started));
        match result {
            Ok(resp) => {
                let text = resp.text.trim();
                if text.is_empty() {
                    warn!(question_id = %question.id, stage = "generation", "empty answer");
                    return None;
                }
                tokens.generation_prompt = resp.usage.prompt_tokens;
                tokens.generation_completion = resp.usage.completion_tokens;
                Some(text.to_string())
            }
            Err(e) => {
                let qe = QuestionError::at_stage(Stage::Generation, &e);
                warn!(
                    question_id = %question.id,
                    stage = "generation",
                    kind = qe.kind.as_str(),
                    error = %qe.message,
                    "generation failed; continuing without answer"
                );
                None
            }
        }
    }

    async fn score_answer(
        &self,
        question: &Question,
        answer: &str,
        retrieved: &mut [RetrievedItem],
        retrieval: &mut RetrievalMetrics,
        timings: &mut StageTimings,
        tokens: &mut TokenTotals,
    ) -> GenerationMetrics {
        let contents: Vec<String> = retrieved.iter().map(|r| r.content.clone()).collect();
        let mut generation = GenerationMetrics {
            answer_similarity: question
                .expected_answer
                .as_deref()
                .map(|expected| text_similarity(answer, expected)),
            context_coverage: context_coverage(answer, &contents),
            ..Default::default()
        };

        let Some(judge) = &self.judge else {
            return generation;
        };
        if contents.is_empty() {
            return generation;
        }

        let eval = judge
            .evaluate_rag_response(&question.question, answer, &contents)
            .await;
        timings.faithfulness_ms = Some(eval.faithfulness.duration_ms);
        timings.answer_relevance_ms = Some(eval.answer_relevance.duration_ms);
        timings.context_relevance_ms = Some(eval.context_relevance.duration_ms);
        let mut judge_ms = eval.duration_ms;
        tokens.judge_prompt += eval.usage.prompt_tokens;
        tokens.judge_completion += eval.usage.completion_tokens;

        generation.faithfulness = Some(eval.faithfulness.score);
        generation.answer_relevance = Some(eval.answer_relevance.score);
        generation.context_relevance = Some(eval.context_relevance.score);
        generation.overall_score = Some(eval.overall_score);
        generation.judge_errors = eval.errors();

        if eval.context_relevance.error.is_none() {
            retrieval.apply_llm_context_precision(eval.context_relevance.score);
        }
        for chunk in &eval.context_relevance.chunks {
            if let Some(item) = retrieved.get_mut(chunk.index) {
                item.relevant = Some(chunk.relevant);
                if !chunk.reason.is_empty() {
                    item.relevance_reason = Some(chunk.reason.clone());
                }
            }
        }

        if judge.config().detect_hallucinations {
            let h = judge.hallucinations(answer, &contents).await;
            timings.hallucination_ms = Some(h.duration_ms);
            judge_ms += h.duration_ms;
            tokens.judge_prompt += h.usage.prompt_tokens;
            tokens.judge_completion += h.usage.completion_tokens;
            match h.error {
                None => generation.hallucination_rate = Some(h.hallucination_rate),
                Some(e) => generation.judge_errors.push(format!("hallucination: {}", e)),
            }
        }
        timings.judge_ms = Some(judge_ms);

        debug!(
            question_id = %question.id,
            stage = "judge",
            elapsed_ms = judge_ms,
            overall = eval.overall_score,
            "judge done"
        );
        generation
    }
}

fn answer_prompt(question: &str, retrieved: &[RetrievedItem]) -> String {
    let mut out = String::from("Context:\n");
    if retrieved.is_empty() {
        out.push_str("(no context retrieved)\n");
    }
    for (i, item) in retrieved.iter().enumerate() {
        match &item.title {
            Some(title) => out.push_str(&format!("[{}] {}\n{}\n\n", i + 1, title, item.content)),
            None => out.push_str(&format!("[{}] {}\n\n", i + 1, item.content)),
        }
    }
    out.push_str(&format!("Question: {}", question));
    out
}
