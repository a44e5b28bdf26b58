//! Adverse-event co-occurrence aggregator.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::failures::FailureRecorder;
use crate::models::{AdverseEventSummary, FailureSource};
use crate::sources::openfda::{build_search_query, EventSearchResponse, SAMPLE_LIMIT};
use crate::sources::{OpenFdaApi, SourceResult};

use super::{AdverseEventResult, SynonymExpander};

/// Upper bound on synonym combinations tried after a zero-report query
/// (three names with three synonyms each).
pub const MAX_FALLBACK_COMBINATIONS: usize = 27;
/// Distinct reaction terms kept per summary.
pub const MAX_REACTIONS: usize = 5;

/// Queries the reporting service for reports naming every drug at once.
pub struct AdverseEventAggregator {
    openfda: Arc<dyn OpenFdaApi>,
    synonyms: SynonymExpander,
    failures: Arc<FailureRecorder>,
}

impl AdverseEventAggregator {
    pub fn new(openfda: Arc<dyn OpenFdaApi>, synonyms: SynonymExpander, failures: Arc<FailureRecorder>) -> Self {
        Self {
            openfda,
            synonyms,
            failures,
        }
    }

    /// Summarize reports mentioning all of `drugs`.
    ///
    /// Fewer than two names yield a zeroed summary without a query. A zero
    /// total or a not-found answer falls back to synonym combinations; any
    /// other failure of the primary query is returned as an error.
    pub async fn resolve<S>(&self, drugs: &[S]) -> AdverseEventResult<AdverseEventSummary>
    where
        S: AsRef<str> + Sync,
    {
        let drugs: Vec<String> = drugs.iter().map(|d| d.as_ref().to_string()).collect();
        if drugs.len() < 2 {
            return Ok(AdverseEventSummary::empty(drugs));
        }

        tracing::info!(drugs = ?drugs, "Querying adverse-event reports");
        match self.query(&drugs).await {
            Ok(summary) if summary.has_reports() => return Ok(summary),
            Ok(_) => tracing::info!(drugs = ?drugs, "No reports found, trying synonyms"),
            Err(e) if e.is_not_found() => tracing::info!(drugs = ?drugs, "No reports on record, trying synonyms"),
            Err(e) => return Err(e.into()),
        }

        self.synonym_fallback(&drugs).await
    }

    async fn query(&self, drugs: &[String]) -> SourceResult<AdverseEventSummary> {
        let search = build_search_query(drugs);
        let response = self.openfda.search_events(&search, SAMPLE_LIMIT).await?;
        let summary = summarize(&response, drugs.to_vec());
        tracing::info!(
            drugs = ?drugs,
            total = summary.total_reports,
            sample = summary.sample_size,
            serious = summary.serious_reports,
            "Adverse-event query"
        );
        Ok(summary)
    }

    async fn synonym_fallback(&self, drugs: &[String]) -> AdverseEventResult<AdverseEventSummary> {
        let mut options = Vec::with_capacity(drugs.len());
        for drug in drugs {
            let synonyms = self.synonyms.expand(drug).await;
            options.push(if synonyms.is_empty() { vec![drug.clone()] } else { synonyms });
        }

        for combination in cartesian_product(&options, MAX_FALLBACK_COMBINATIONS) {
            match self.query(&combination).await {
                Ok(summary) if summary.has_reports() => {
                    tracing::info!(drugs = ?drugs, via = ?combination, "Found reports via synonyms");
                    return Ok(summary);
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(combination = ?combination, error = %e, "Synonym combination failed"),
            }
        }

        self.failures.record(drugs, FailureSource::NoAdverseReports).await;
        Ok(AdverseEventSummary::not_found(drugs.to_vec()))
    }
}

/// Summarize one search response. Counts other than the total describe only
/// the returned sample.
pub fn summarize(response: &EventSearchResponse, drugs: Vec<String>) -> AdverseEventSummary {
    let mut summary = AdverseEventSummary::empty(drugs);
    summary.total_reports = response.total();
    summary.sample_size = response.results.len() as u64;

    let mut latest: Option<&str> = None;
    for report in &response.results {
        if report.is_serious() {
            summary.serious_reports += 1;
        }

        for reaction in &report.patient.reaction {
            let Some(term) = reaction.reactionmeddrapt.as_deref().map(str::trim) else {
                continue;
            };
            if summary.top_reactions.len() < MAX_REACTIONS
                && !term.is_empty()
                && !summary.top_reactions.iter().any(|t| t == term)
            {
                summary.top_reactions.push(term.to_string());
            }
        }

        if let Some(date) = report.receivedate.as_deref().filter(|d| is_compact_date(d)) {
            if latest.map_or(true, |l| date > l) {
                latest = Some(date);
            }
        }
    }

    summary.last_report_date = latest.and_then(|d| NaiveDate::parse_from_str(d, "%Y%m%d").ok());
    summary
}

fn is_compact_date(value: &str) -> bool {
    value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit())
}

/// The first `limit` elements of the cartesian product of `options`, with
/// the last position varying fastest.
pub fn cartesian_product(options: &[Vec<String>], limit: usize) -> Vec<Vec<String>> {
    if options.is_empty() || options.iter().any(Vec::is_empty) {
        return Vec::new();
    }

    let mut indices = vec![0usize; options.len()];
    let mut combinations = Vec::new();
    while combinations.len() < limit {
        combinations.push(
            indices
                .iter()
                .zip(options)
                .map(|(&i, choices)| choices[i].clone())
                .collect(),
        );

        // Advance the rightmost position, carrying leftwards
        let mut pos = options.len();
        loop {
            if pos == 0 {
                return combinations;
            }
            pos -= 1;
            indices[pos] += 1;
            if indices[pos] < options[pos].len() {
                break;
            }
            indices[pos] = 0;
        }
    }
    combinations
}
