//! Email validation fan-out.
//!
//! Every row gets its own task; a semaphore caps the requests in flight and
//! results are collected back by row position, so the returned statuses
//! follow row order regardless of completion order.

use crate::models::{EmailStatus, LeadTable, ValidationResult, EMAIL, EMAIL_STATUS};
use crate::progress::{ProgressEvent, ProgressSink, Stage};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Remote email verification, one address per call.
#[async_trait]
pub trait EmailVerifier: Send + Sync {
    /// Returns `None` when the lookup failed for any reason.
    async fn verify(&self, email: &str) -> Option<ValidationResult>;
}

/// Reduces a verification outcome to a single status.
///
/// The checks run in order and the first match wins. A missing score counts
/// as 0, so it falls into `Risky` before the `Invalid` check is reached.
pub fn map_to_status(result: Option<&ValidationResult>) -> EmailStatus {
    let Some(result) = result else {
        return EmailStatus::Unknown;
    };
    let score = result.score.unwrap_or(0.0);

    if result.smtp_check == Some(true) && result.format_valid == Some(true) {
        return EmailStatus::Valid;
    }
    if result.disposable == Some(true) || score < 0.5 {
        return EmailStatus::Risky;
    }
    if result.smtp_check == Some(false) || result.format_valid == Some(false) {
        return EmailStatus::Invalid;
    }
    EmailStatus::Unknown
}

/// Verifies every email with at most `concurrency` requests in flight and
/// returns one status per input, in input order.
///
/// Each row is looked up in its own task. Blank emails resolve to `Unknown`
/// without a remote call, and a panicking lookup only loses its own row.
pub async fn validate_emails(
    verifier: Arc<dyn EmailVerifier>,
    emails: Vec<String>,
    concurrency: usize,
    progress: Arc<dyn ProgressSink>,
) -> Vec<EmailStatus> {
    let total = emails.len();
    if total == 0 {
        return Vec::new();
    }

    let width = concurrency.clamp(1, total);
    let semaphore = Arc::new(Semaphore::new(width));
    let completed = Arc::new(AtomicUsize::new(0));

    tracing::info!("Validating {} email(s) with {} worker(s)", total, width);

    let mut handles = Vec::with_capacity(total);
    for email in emails {
        let verifier = verifier.clone();
        let semaphore = semaphore.clone();
        let completed = completed.clone();
        let progress = progress.clone();

        handles.push(tokio::spawn(async move {
            let email = email.trim();
            let result = if email.is_empty() {
                None
            } else {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return None;
                };
                verifier.verify(email).await
            };

            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            progress.report(ProgressEvent {
                stage: Stage::Validation,
                completed: done,
                total,
            });
            result
        }));
    }

    // Slots are filled in row order, whatever order the lookups finish in
    let mut slots: Vec<Option<ValidationResult>> = Vec::with_capacity(total);
    for (idx, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(result) => slots.push(result),
            Err(e) => {
                tracing::error!("Email validation for row {} failed: {}", idx + 1, e);
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                progress.report(ProgressEvent {
                    stage: Stage::Validation,
                    completed: done,
                    total,
                });
                slots.push(None);
            }
        }
    }

    slots.iter().map(|r| map_to_status(r.as_ref())).collect()
}

/// Validates the table's `email` column and writes `email_status`.
///
/// A table without an `email` column gets `unknown` for every row.
pub async fn annotate_email_status(
    table: &mut LeadTable,
    verifier: Arc<dyn EmailVerifier>,
    concurrency: usize,
    progress: Arc<dyn ProgressSink>,
) -> Vec<EmailStatus> {
    let emails: Vec<String> = table
        .column_values(EMAIL)
        .into_iter()
        .map(|email| email.unwrap_or("").to_string())
        .collect();

    let statuses = validate_emails(verifier, emails, concurrency, progress).await;

    table.set_column(
        EMAIL_STATUS,
        statuses.iter().map(|s| Some(s.as_str().to_string())).collect(),
    );

    statuses
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn result(
        format_valid: Option<bool>,
        smtp_check: Option<bool>,
        disposable: Option<bool>,
        score: Option<f64>,
    ) -> ValidationResult {
        ValidationResult {
            format_valid,
            smtp_check,
            disposable,
            score,
        }
    }

    #[test]
    fn test_no_result_is_unknown() {
        assert_eq!(map_to_status(None), EmailStatus::Unknown);
    }

    #[test]
    fn test_valid_wins_over_disposable() {
        let r = result(Some(true), Some(true), Some(true), Some(0.1));
        assert_eq!(map_to_status(Some(&r)), EmailStatus::Valid);
    }

    #[test]
    fn test_disposable_or_low_score_is_risky() {
        let disposable = result(Some(true), Some(false), Some(true), Some(0.9));
        assert_eq!(map_to_status(Some(&disposable)), EmailStatus::Risky);

        let low_score = result(Some(true), None, Some(false), Some(0.49));
        assert_eq!(map_to_status(Some(&low_score)), EmailStatus::Risky);

        let missing_score = result(Some(false), Some(false), None, None);
        assert_eq!(map_to_status(Some(&missing_score)), EmailStatus::Risky);
    }

    #[test]
    fn test_explicit_failures_are_invalid() {
        let smtp_failed = result(Some(true), Some(false), Some(false), Some(0.5));
        assert_eq!(map_to_status(Some(&smtp_failed)), EmailStatus::Invalid);

        let bad_format = result(Some(false), None, None, Some(0.8));
        assert_eq!(map_to_status(Some(&bad_format)), EmailStatus::Invalid);
    }

    #[test]
    fn test_inconclusive_is_unknown() {
        let r = result(Some(true), None, Some(false), Some(0.7));
        assert_eq!(map_to_status(Some(&r)), EmailStatus::Unknown);
    }

    /// Answers from a fixed table, finishing later rows first.
    struct ScriptedVerifier {
        answers: HashMap<String, ValidationResult>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ScriptedVerifier {
        fn new(answers: HashMap<String, ValidationResult>) -> Self {
            Self {
                answers,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmailVerifier for ScriptedVerifier {
        async fn verify(&self, email: &str) -> Option<ValidationResult> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis(40u64.saturating_sub(call as u64 * 5))).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.answers.get(email).cloned()
        }
    }

    fn valid() -> ValidationResult {
        result(Some(true), Some(true), Some(false), Some(0.9))
    }

    fn invalid() -> ValidationResult {
        result(Some(true), Some(false), Some(false), Some(0.6))
    }

    #[tokio::test]
    async fn test_statuses_follow_input_order() {
        let mut answers = HashMap::new();
        answers.insert("a@acme.io".to_string(), valid());
        answers.insert("b@acme.io".to_string(), invalid());
        answers.insert("d@acme.io".to_string(), valid());
        let verifier = Arc::new(ScriptedVerifier::new(answers));

        let emails = vec![
            "a@acme.io".to_string(),
            "b@acme.io".to_string(),
            "c@acme.io".to_string(),
            " d@acme.io ".to_string(),
        ];

        let statuses = validate_emails(verifier, emails, 4, Arc::new(())).await;

        assert_eq!(
            statuses,
            vec![
                EmailStatus::Valid,
                EmailStatus::Invalid,
                EmailStatus::Unknown,
                EmailStatus::Valid
            ]
        );
    }

    #[tokio::test]
    async fn test_pool_width_bounds_in_flight_requests() {
        let verifier = Arc::new(ScriptedVerifier::new(HashMap::new()));
        let emails: Vec<String> = (0..25).map(|i| format!("lead{}@acme.io", i)).collect();

        let statuses = validate_emails(verifier.clone(), emails, 3, Arc::new(())).await;

        assert_eq!(statuses.len(), 25);
        assert!(verifier.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 25);
    }

    #[tokio::test]
    async fn test_blank_emails_skip_remote_call() {
        let verifier = Arc::new(ScriptedVerifier::new(HashMap::new()));
        let statuses = validate_emails(
            verifier.clone(),
            vec!["".to_string(), "   ".to_string()],
            10,
            Arc::new(()),
        )
        .await;

        assert_eq!(statuses, vec![EmailStatus::Unknown, EmailStatus::Unknown]);
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_progress_reports_every_row() {
        let verifier = Arc::new(ScriptedVerifier::new(HashMap::new()));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let emails: Vec<String> = (0..5).map(|i| format!("lead{}@acme.io", i)).collect();

        validate_emails(verifier, emails, 2, Arc::new(tx)).await;

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(event.completed);
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    /// Panics on `boom*` addresses, verifies everything else.
    struct PanickingVerifier;

    #[async_trait]
    impl EmailVerifier for PanickingVerifier {
        async fn verify(&self, email: &str) -> Option<ValidationResult> {
            if email.starts_with("boom") {
                panic!("provider client blew up on {}", email);
            }
            Some(valid())
        }
    }

    #[tokio::test]
    async fn test_panicking_lookups_only_lose_their_own_rows() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let emails = vec![
            "boom1@a.io".to_string(),
            "boom2@a.io".to_string(),
            "boom3@a.io".to_string(),
            "ok1@a.io".to_string(),
            "ok2@a.io".to_string(),
        ];

        // Fewer slots than panicking rows
        let statuses = validate_emails(Arc::new(PanickingVerifier), emails, 2, Arc::new(tx)).await;

        assert_eq!(
            statuses,
            vec![
                EmailStatus::Unknown,
                EmailStatus::Unknown,
                EmailStatus::Unknown,
                EmailStatus::Valid,
                EmailStatus::Valid
            ]
        );

        let mut last = 0;
        while let Ok(event) = rx.try_recv() {
            last = last.max(event.completed);
        }
        assert_eq!(last, 5);
    }

    #[tokio::test]
    async fn test_annotate_without_email_column() {
        let mut table = LeadTable::new(vec!["company".to_string()]);
        table.push_row(crate::models::LeadRow::new());

        let verifier = Arc::new(ScriptedVerifier::new(HashMap::new()));
        annotate_email_status(&mut table, verifier, 10, Arc::new(())).await;

        assert_eq!(table.rows()[0].get(EMAIL_STATUS), Some("unknown"));
    }
}
