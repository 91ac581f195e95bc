//! Summary pipeline: fingerprint → cache lookup → prompt → dispatch → cache
//! store → timeline, one cohort at a time in grouper order.

use std::ops::Deref;
use std::time::Instant;

use ticketline_ai::{Dispatcher, LlmBackend, LlmSettings};
use ticketline_core::timeline::default_headline;
use ticketline_core::{
    Cohort, ContentFingerprint, Product, StructuredSummary, TimelineDocument, TimelineOptions,
    build_prompt, fingerprint, to_timeline,
};
use ticketline_store::SummaryCache;
use tracing::{info, warn};

/// Where a cohort's summary came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummarySource {
    Cache,
    Generated { backend: &'static str, attempts: u32 },
    /// Every attempt failed; the summary is the error fallback.
    Failed { backend: &'static str, attempts: u32 },
}

#[derive(Debug, Clone)]
pub struct CohortReport {
    pub customer: String,
    pub product: Product,
    pub record_count: usize,
    pub fingerprint: ContentFingerprint,
    pub source: SummarySource,
    pub summary: StructuredSummary,
    pub timeline: TimelineDocument,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunStats {
    pub cached: usize,
    pub generated: usize,
    pub failed: usize,
    pub elapsed_secs: f64,
}

impl RunStats {
    fn record(&mut self, source: SummarySource) {
        match source {
            SummarySource::Cache => self.cached += 1,
            SummarySource::Generated { .. } => self.generated += 1,
            SummarySource::Failed { .. } => self.failed += 1,
        }
    }
}

pub struct Pipeline {
    cache: Option<SummaryCache>,
    dispatcher: Dispatcher,
    timeline: TimelineOptions,
}

impl Pipeline {
    /// `cache: None` disables caching: every cohort goes to the model.
    pub fn new(cache: Option<SummaryCache>, dispatcher: Dispatcher, timeline: TimelineOptions) -> Self {
        Self {
            cache,
            dispatcher,
            timeline,
        }
    }

    /// Summarize every cohort with the backend `settings` selects.
    ///
    /// The backend is resolved again for each cohort.
    pub async fn run(&self, cohorts: &[Cohort], settings: &LlmSettings) -> (Vec<CohortReport>, RunStats) {
        self.run_each(cohorts, || self.dispatcher.backend_for(settings)).await
    }

    /// Summarize every cohort with a fixed backend.
    #[cfg(test)]
    pub async fn run_with(
        &self,
        cohorts: &[Cohort],
        backend: &dyn LlmBackend,
    ) -> (Vec<CohortReport>, RunStats) {
        self.run_each(cohorts, || backend).await
    }

    /// Process cohorts in order, asking `resolve` for a backend before each.
    async fn run_each<'b, B, F>(&self, cohorts: &[Cohort], mut resolve: F) -> (Vec<CohortReport>, RunStats)
    where
        B: Deref<Target = dyn LlmBackend + 'b>,
        F: FnMut() -> B,
    {
        let start = Instant::now();
        let mut stats = RunStats::default();
        let mut reports = Vec::with_capacity(cohorts.len());
        for cohort in cohorts {
            let backend = resolve();
            let report = self.process_cohort(cohort, &*backend).await;
            stats.record(report.source);
            reports.push(report);
        }
        stats.elapsed_secs = start.elapsed().as_secs_f64();
        (reports, stats)
    }

    pub async fn process_cohort(&self, cohort: &Cohort, backend: &dyn LlmBackend) -> CohortReport {
        let customer = cohort.customer();
        let product = cohort.product();
        let fp = fingerprint(cohort);

        let (summary, source) = match self.cached(cohort, &fp) {
            Some(summary) => {
                info!(customer, %product, "cache hit");
                (summary, SummarySource::Cache)
            }
            None => {
                let prompt = build_prompt(cohort);
                let outcome = self.dispatcher.summarize_with(backend, &prompt).await;
                if outcome.is_error {
                    warn!(customer, %product, attempts = outcome.attempts, "summary failed, using fallback");
                    let source = SummarySource::Failed {
                        backend: outcome.backend,
                        attempts: outcome.attempts,
                    };
                    (outcome.summary, source)
                } else {
                    self.remember(cohort, &fp, &outcome.summary);
                    let source = SummarySource::Generated {
                        backend: outcome.backend,
                        attempts: outcome.attempts,
                    };
                    (outcome.summary, source)
                }
            }
        };

        let headline = default_headline(customer, product.as_str());
        let timeline = to_timeline(&summary, &headline, &self.timeline);
        CohortReport {
            customer: customer.to_string(),
            product,
            record_count: cohort.len(),
            fingerprint: fp,
            source,
            summary,
            timeline,
        }
    }

    fn cached(&self, cohort: &Cohort, fp: &ContentFingerprint) -> Option<StructuredSummary> {
        let cache = self.cache.as_ref()?;
        match cache.lookup(cohort.customer(), cohort.product(), fp) {
            Ok(hit) => hit,
            Err(e) => {
                warn!(customer = cohort.customer(), product = %cohort.product(), error = %e, "cache lookup failed, treating as miss");
                None
            }
        }
    }

    fn remember(&self, cohort: &Cohort, fp: &ContentFingerprint, summary: &StructuredSummary) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        if let Err(e) = cache.store(cohort.customer(), cohort.product(), fp, summary) {
            warn!(customer = cohort.customer(), product = %cohort.product(), error = %e, "cache store failed");
        }
    }
}
