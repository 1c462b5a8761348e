use crate::completion::client::CompletionClient;
use crate::driver::form_driver::{DriverConfig, FillReport, FormDriver};
use crate::driver::page::FormPage;
use crate::driver::uploads::UploadResolver;
use crate::error::PipelineError;
use crate::pipeline::extractor::SchemaExtractor;
use crate::pipeline::synthesizer::ValueSynthesizer;
use crate::profile::UserProfile;
use crate::schema::domain::{DomainReport, ValuePolicy, enforce_value_domain};
use crate::trace::logger::TraceLogger;

/// What one pipeline run produced.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub fingerprint: String,
    pub field_count: usize,
    pub extraction_cost_usd: Option<f64>,
    pub synthesis_cost_usd: Option<f64>,
    pub domain: DomainReport,
    pub report: FillReport,
}

impl PipelineOutcome {
    /// Sum of the known completion costs.
    pub fn total_cost_usd(&self) -> Option<f64> {
        match (self.extraction_cost_usd, self.synthesis_cost_usd) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
        }
    }
}

/// Extract -> synthesize -> enforce value domain -> fill and submit.
pub struct Pipeline<'p, 'a> {
    client: &'p CompletionClient<'a>,
    driver: &'p DriverConfig,
    uploads: &'p dyn UploadResolver,
    policy: ValuePolicy,
}

impl<'p, 'a> Pipeline<'p, 'a> {
    pub fn new(
        client: &'p CompletionClient<'a>,
        driver: &'p DriverConfig,
        uploads: &'p dyn UploadResolver,
    ) -> Self {
        Self {
            client,
            driver,
            uploads,
            policy: ValuePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ValuePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run every stage against `markup` and drive `page`.
    ///
    /// The page is borrowed: the caller opens it beforehand and closes it after.
    /// Stage failures abort before the page is touched; per-field failures are
    /// collected in the returned report.
    pub fn run(
        &self,
        page: &mut dyn FormPage,
        markup: &str,
        profile: &UserProfile,
        tracer: &TraceLogger,
    ) -> Result<PipelineOutcome, PipelineError> {
        let (schema, extraction) = SchemaExtractor::new(self.client).extract_with_cost(markup)?;
        let (mut filled, synthesis) =
            ValueSynthesizer::new(self.client).synthesize_with_cost(&schema, profile)?;

        let domain = enforce_value_domain(&mut filled, self.policy)?;
        for name in &domain.rewritten {
            tracing::debug!(field = %name, "value mapped onto option");
        }
        for name in &domain.cleared {
            tracing::warn!(field = %name, "value outside declared options, cleared");
        }

        let report = FormDriver::new(self.driver, self.uploads).fill(page, &filled, tracer);
        tracing::info!(
            filled = report.filled_count(),
            skipped = report.skipped_count(),
            failed = report.failed_count(),
            submitted = report.submitted(),
            "pipeline finished"
        );

        Ok(PipelineOutcome {
            fingerprint: schema.fingerprint(),
            field_count: schema.len(),
            extraction_cost_usd: extraction.cost_usd,
            synthesis_cost_usd: synthesis.cost_usd,
            domain,
            report,
        })
    }
}
