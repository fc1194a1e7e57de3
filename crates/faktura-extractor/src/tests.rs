//! Scenario tests for the Pipeline

#[cfg(test)]
mod tests {
    use crate::{
        CancelToken, CritiqueFailurePolicy, ExtractorConfig, ExtractorError, PassOutcome,
        PayloadSource, Pipeline,
    };
    use faktura_domain::traits::LlmProvider;
    use faktura_domain::{CritiqueAction, GenerationParams};
    use faktura_gatekeeper::{Gatekeeper, SchemaDocument};
    use faktura_llm::{LlmError, MockProvider};
    use serde_json::json;
    use std::sync::Arc;

    // Prompt markers, one per template
    const EXTRACT: &str = "expert invoice parser";
    const REFORMAT: &str = "Your previous output";
    const CRITIQUE: &str = "exacting auditor";
    const CRITIQUE_REPAIR: &str = "Your previous critique";
    const FIX: &str = "Apply the following critique";
    const REGENERATE: &str = "Regenerate the";

    const SCHEMA: &str = r#"{
        "type": "object",
        "required": ["invoice_number", "total", "currency"],
        "properties": {
            "invoice_number": {"type": "string"},
            "total": {"type": "number"},
            "currency": {"type": ["string", "null"]}
        }
    }"#;

    const INVOICE: &str = "Invoice #123\n\nTotal:   100.00 EUR";
    const GOOD: &str = r#"{"invoice_number":"123","total":100.0,"currency":"EUR"}"#;
    const ACCEPT: &str = r#"{"valid": true, "issues": [], "severity": "low", "action": "accept", "suggested_fix": ""}"#;

    fn gatekeeper() -> Arc<Gatekeeper> {
        let schema = SchemaDocument::parse(SCHEMA).unwrap();
        Arc::new(Gatekeeper::default_config(Arc::new(schema)).unwrap())
    }

    fn config(passes: u32) -> ExtractorConfig {
        ExtractorConfig {
            max_critique_passes: passes,
            ..ExtractorConfig::default()
        }
    }

    fn pipeline(llm: &MockProvider, config: ExtractorConfig) -> Pipeline<MockProvider> {
        Pipeline::new(llm.clone(), gatekeeper(), config).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_without_critique() {
        let llm = MockProvider::default();
        llm.add_rule(EXTRACT, GOOD);

        let report = pipeline(&llm, config(0)).run(INVOICE).await.unwrap();

        assert_eq!(report.payload, json!({"invoice_number": "123", "total": 100.0, "currency": "EUR"}));
        assert!(report.initial_validation.valid);
        assert!(report.final_validation.valid);
        assert!(report.passes.is_empty());
        assert!(!report.accepted);
        assert_eq!(report.generation_attempts, 1);
        assert_eq!(report.revisions.len(), 1);
        assert_eq!(report.revisions[0].source, PayloadSource::Generated);
        assert_eq!(llm.call_count(), 1);
        assert_eq!(llm.calls_matching(CRITIQUE), 0);
    }

    #[tokio::test]
    async fn test_prompt_carries_normalized_text_and_schema() {
        let llm = MockProvider::new(GOOD);

        pipeline(&llm, config(0)).run(INVOICE).await.unwrap();

        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("Invoice #123 Total: 100.00 EUR"));
        assert!(prompt.contains("\"required\": [\"invoice_number\", \"total\", \"currency\"]"));
    }

    #[tokio::test]
    async fn test_generation_exhausts_after_max_attempts() {
        let llm = MockProvider::new("I am sorry, I cannot produce that.");
        let config = ExtractorConfig {
            max_json_retries: 3,
            ..config(0)
        };

        let result = pipeline(&llm, config).run(INVOICE).await;

        match result {
            Err(ExtractorError::ExtractionFailure {
                attempts,
                last_raw,
                last_error,
            }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last_raw, "I am sorry, I cannot produce that.");
                assert!(last_error.contains("No JSON object"));
            }
            other => panic!("Expected ExtractionFailure, got {:?}", other),
        }
        // One extraction call plus one reformat call per attempt
        assert_eq!(llm.call_count(), 6);
        assert_eq!(llm.calls_matching(EXTRACT), 3);
        assert_eq!(llm.calls_matching(REFORMAT), 3);
    }

    #[tokio::test]
    async fn test_reformat_recovers_within_attempt() {
        let llm = MockProvider::default();
        llm.add_rule(REFORMAT, GOOD);
        llm.add_rule(EXTRACT, "The invoice number is 123 and the total is 100 EUR.");

        let report = pipeline(&llm, config(0)).run(INVOICE).await.unwrap();

        assert_eq!(report.generation_attempts, 1);
        assert_eq!(report.payload["invoice_number"], "123");
        assert_eq!(llm.call_count(), 2);
        assert!(llm.prompts()[1].contains("The invoice number is 123"));
    }

    #[tokio::test]
    async fn test_unparsable_span_retries_without_reformat() {
        let llm = MockProvider::default();
        llm.add_rule(EXTRACT, "{invoice_number: 123,}");
        llm.add_rule(EXTRACT, GOOD);

        let report = pipeline(&llm, config(0)).run(INVOICE).await.unwrap();

        assert_eq!(report.generation_attempts, 2);
        assert_eq!(llm.calls_matching(REFORMAT), 0);
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_malformed_outer_object_triggers_retry() {
        let llm = MockProvider::default();
        llm.add_rule(
            EXTRACT,
            r#"{"invoice_number": "123", "supplier": {"name": "Acme"}, "total": 100,}"#,
        );
        llm.add_rule(EXTRACT, GOOD);

        let report = pipeline(&llm, config(0)).run(INVOICE).await.unwrap();

        assert_eq!(report.generation_attempts, 2);
        assert_eq!(report.payload, serde_json::from_str::<serde_json::Value>(GOOD).unwrap());
        assert_eq!(llm.calls_matching(REFORMAT), 0);
    }

    #[tokio::test]
    async fn test_malformed_verdict_is_not_read_from_nested_object() {
        let llm = MockProvider::default();
        llm.add_rule(
            CRITIQUE,
            r#"{"valid": false, "details": {"valid": true, "action": "accept"}, "action": "fix",}"#,
        );
        llm.add_rule(CRITIQUE, ACCEPT);
        llm.add_rule(EXTRACT, GOOD);

        let report = pipeline(&llm, config(1)).run(INVOICE).await.unwrap();

        assert!(report.accepted);
        assert_eq!(llm.calls_matching(CRITIQUE), 2);
        assert_eq!(llm.calls_matching(CRITIQUE_REPAIR), 0);
    }

    #[tokio::test]
    async fn test_schema_failure_is_reported_not_fatal() {
        let llm = MockProvider::new(r#"{"invoice_number": "123", "total": 100.0}"#);

        let report = pipeline(&llm, config(0)).run(INVOICE).await.unwrap();

        assert!(!report.initial_validation.valid);
        let message = report.initial_validation.message.clone().unwrap();
        assert!(message.contains("currency"), "message should name the field: {}", message);
        assert!(!report.is_valid());
    }

    #[tokio::test]
    async fn test_optional_null_passes_validation() {
        let llm = MockProvider::new(r#"{"invoice_number": "123", "total": 100.0, "currency": null}"#);

        let report = pipeline(&llm, config(0)).run(INVOICE).await.unwrap();
        assert!(report.is_valid());
    }

    #[tokio::test]
    async fn test_accept_on_first_pass() {
        let llm = MockProvider::default();
        llm.add_rule(CRITIQUE, ACCEPT);
        llm.add_rule(EXTRACT, GOOD);

        let report = pipeline(&llm, config(2)).run(INVOICE).await.unwrap();

        assert!(report.accepted);
        assert_eq!(report.passes.len(), 1);
        assert_eq!(report.passes[0].outcome, PassOutcome::Accepted);
        assert_eq!(report.passes[0].action, Some(CritiqueAction::Accept));
        assert_eq!(llm.calls_matching(CRITIQUE), 1);
        assert_eq!(llm.calls_matching(FIX), 0);
        assert_eq!(llm.calls_matching(REGENERATE), 0);
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_fix_is_revalidated_without_extra_pass() {
        let llm = MockProvider::default();
        llm.add_rule(
            CRITIQUE,
            r#"{"valid": false, "issues": ["total wrong"], "severity": "high", "action": "fix", "suggested_fix": "total is 100"}"#,
        );
        llm.add_rule(FIX, r#"{"invoice_number": "123", "total": "100"}"#);
        llm.add_rule(EXTRACT, GOOD);

        let report = pipeline(&llm, config(1)).run(INVOICE).await.unwrap();

        assert_eq!(report.passes.len(), 1);
        let pass = &report.passes[0];
        assert_eq!(pass.outcome, PassOutcome::Fixed);
        assert_eq!(pass.issue_count, 1);
        assert!(!pass.validation.as_ref().unwrap().valid);
        assert!(report.initial_validation.valid);
        assert!(!report.final_validation.valid);
        assert!(!report.accepted);
        assert_eq!(report.payload["total"], "100");
        assert_eq!(report.revisions.len(), 2);
        assert_eq!(report.revisions[1].source, PayloadSource::Fixed);
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn test_fix_prompt_quotes_current_payload_and_guidance() {
        let llm = MockProvider::default();
        llm.add_rule(CRITIQUE, r#"{"valid": false, "action": "fix", "suggested_fix": "currency is EUR"}"#);
        llm.add_rule(FIX, GOOD);
        llm.add_rule(EXTRACT, r#"{"invoice_number":"123","total":100.0,"currency":"USD"}"#);

        pipeline(&llm, config(1)).run(INVOICE).await.unwrap();

        let fix_prompt = llm
            .prompts()
            .into_iter()
            .find(|p| p.contains(FIX))
            .unwrap();
        assert!(fix_prompt.contains("currency is EUR"));
        assert!(fix_prompt.contains("\"currency\":\"USD\""));
    }

    #[tokio::test]
    async fn test_fix_then_accept() {
        let llm = MockProvider::default();
        llm.add_rule(CRITIQUE, r#"{"valid": false, "action": "fix", "suggested_fix": "currency is EUR"}"#);
        llm.add_rule(CRITIQUE, ACCEPT);
        llm.add_rule(FIX, GOOD);
        llm.add_rule(EXTRACT, r#"{"invoice_number":"123","total":100.0,"currency":"USD"}"#);

        let report = pipeline(&llm, config(3)).run(INVOICE).await.unwrap();

        assert!(report.accepted);
        assert_eq!(report.passes.len(), 2);
        assert_eq!(report.passes[0].outcome, PassOutcome::Fixed);
        assert_eq!(report.passes[1].outcome, PassOutcome::Accepted);
        assert_eq!(report.payload["currency"], "EUR");
        assert_eq!(llm.calls_matching(CRITIQUE), 2);
    }

    #[tokio::test]
    async fn test_regenerate_replaces_payload() {
        let llm = MockProvider::default();
        llm.add_rule(
            CRITIQUE,
            r#"{"valid": false, "issues": ["items missing"], "severity": "high", "action": "regenerate"}"#,
        );
        llm.add_rule(CRITIQUE, ACCEPT);
        llm.add_rule(REGENERATE, GOOD);
        llm.add_rule(EXTRACT, r#"{"invoice_number":"999"}"#);

        let report = pipeline(&llm, config(2)).run(INVOICE).await.unwrap();

        assert_eq!(report.passes[0].outcome, PassOutcome::Regenerated);
        assert_eq!(report.passes[0].action, Some(CritiqueAction::Regenerate));
        assert_eq!(report.revisions[1].source, PayloadSource::Regenerated);
        assert_eq!(report.payload["invoice_number"], "123");
        assert!(report.final_validation.valid);
        assert_eq!(llm.calls_matching(FIX), 0);
        assert_eq!(llm.calls_matching(REGENERATE), 1);
    }

    #[tokio::test]
    async fn test_unknown_or_missing_action_defaults_to_fix() {
        for verdict in [
            r#"{"valid": false, "action": "rewrite"}"#,
            r#"{"valid": false}"#,
            r#"{"valid": true}"#,
            r#"{"valid": false, "action": "accept"}"#,
        ] {
            let llm = MockProvider::default();
            llm.add_rule(CRITIQUE, verdict);
            llm.add_rule(FIX, GOOD);
            llm.add_rule(EXTRACT, GOOD);

            let report = pipeline(&llm, config(1)).run(INVOICE).await.unwrap();

            assert_eq!(report.passes[0].action, Some(CritiqueAction::Fix), "verdict {}", verdict);
            assert_eq!(llm.calls_matching(FIX), 1, "verdict {}", verdict);
            assert!(!report.accepted);
        }
    }

    #[tokio::test]
    async fn test_budget_exhausted_returns_last_payload() {
        let llm = MockProvider::default();
        llm.add_rule(CRITIQUE, r#"{"valid": false, "action": "fix"}"#);
        llm.add_rule(FIX, r#"{"invoice_number":"A","total":1,"currency":"EUR"}"#);
        llm.add_rule(FIX, r#"{"invoice_number":"B","total":2,"currency":"EUR"}"#);
        llm.add_rule(EXTRACT, GOOD);

        let report = pipeline(&llm, config(2)).run(INVOICE).await.unwrap();

        assert!(!report.accepted);
        assert_eq!(report.passes.len(), 2);
        assert_eq!(report.payload["invoice_number"], "B");
        assert_eq!(report.revisions.len(), 3);
        assert_eq!(llm.calls_matching(CRITIQUE), 2);
    }

    #[tokio::test]
    async fn test_critique_reformat_recovers() {
        let llm = MockProvider::default();
        llm.add_rule(CRITIQUE_REPAIR, ACCEPT);
        llm.add_rule(CRITIQUE, "Looks fine to me.");
        llm.add_rule(EXTRACT, GOOD);

        let report = pipeline(&llm, config(1)).run(INVOICE).await.unwrap();

        assert!(report.accepted);
        assert_eq!(llm.calls_matching(CRITIQUE_REPAIR), 1);
    }

    #[tokio::test]
    async fn test_critique_failure_keeps_current_payload() {
        let llm = MockProvider::default();
        llm.add_rule(CRITIQUE_REPAIR, "Still no JSON, sorry.");
        llm.add_rule(CRITIQUE, "Looks fine to me.");
        llm.add_rule(EXTRACT, GOOD);
        let config = ExtractorConfig {
            max_critique_retries: 2,
            ..config(3)
        };

        let report = pipeline(&llm, config).run(INVOICE).await.unwrap();

        assert_eq!(report.passes.len(), 1);
        assert!(matches!(report.passes[0].outcome, PassOutcome::CritiqueFailed(_)));
        assert_eq!(report.passes[0].action, None);
        assert_eq!(report.payload, serde_json::from_str::<serde_json::Value>(GOOD).unwrap());
        assert!(!report.accepted);
        assert_eq!(llm.calls_matching(CRITIQUE), 2);
        assert_eq!(llm.calls_matching(CRITIQUE_REPAIR), 2);
    }

    #[tokio::test]
    async fn test_critique_failure_aborts_under_abort_policy() {
        let llm = MockProvider::default();
        llm.add_rule(CRITIQUE, "{not: json}");
        llm.add_rule(EXTRACT, GOOD);
        let config = ExtractorConfig {
            critique_failure_policy: CritiqueFailurePolicy::Abort,
            max_critique_retries: 2,
            ..config(1)
        };

        let result = pipeline(&llm, config).run(INVOICE).await;

        match result {
            Err(ExtractorError::CritiqueFailure { attempts, last_raw, .. }) => {
                assert_eq!(attempts, 2);
                assert_eq!(last_raw, "{not: json}");
            }
            other => panic!("Expected CritiqueFailure, got {:?}", other),
        }
        // Parse errors are retried without a reformat call
        assert_eq!(llm.calls_matching(CRITIQUE_REPAIR), 0);
    }

    #[tokio::test]
    async fn test_repair_failure_counts_as_failed_pass() {
        let llm = MockProvider::default();
        llm.add_rule(CRITIQUE, r#"{"valid": false, "action": "fix"}"#);
        llm.add_rule(FIX, "I fixed it, trust me.");
        llm.add_rule(EXTRACT, GOOD);

        let report = pipeline(&llm, config(2)).run(INVOICE).await.unwrap();

        assert_eq!(report.passes.len(), 2);
        for pass in &report.passes {
            assert!(matches!(pass.outcome, PassOutcome::RepairFailed(_)));
            assert!(pass.validation.is_none());
        }
        assert_eq!(report.revisions.len(), 1);
        assert_eq!(report.payload["invoice_number"], "123");
        assert!(report.final_validation.valid);
    }

    #[tokio::test]
    async fn test_repair_failure_aborts_under_abort_policy() {
        let llm = MockProvider::default();
        llm.add_rule(CRITIQUE, r#"{"valid": false, "action": "regenerate"}"#);
        llm.add_rule(REGENERATE, "no json");
        llm.add_rule(EXTRACT, GOOD);
        let config = ExtractorConfig {
            critique_failure_policy: CritiqueFailurePolicy::Abort,
            ..config(2)
        };

        let result = pipeline(&llm, config).run(INVOICE).await;

        match result {
            Err(ExtractorError::RepairFailure { action, last_raw, .. }) => {
                assert_eq!(action, CritiqueAction::Regenerate);
                assert_eq!(last_raw, "no json");
            }
            other => panic!("Expected RepairFailure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_error_aborts_immediately() {
        let llm = MockProvider::default();
        llm.push_error(LlmError::Communication("connection refused".to_string()));

        let result = pipeline(&llm, config(0)).run(INVOICE).await;

        match result {
            Err(ExtractorError::Transport(message)) => assert!(message.contains("connection refused")),
            other => panic!("Expected Transport error, got {:?}", other),
        }
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_require_valid_output() {
        let llm = MockProvider::new(r#"{"invoice_number": "123"}"#);
        let config = ExtractorConfig {
            require_valid_output: true,
            ..config(0)
        };

        let result = pipeline(&llm, config).run(INVOICE).await;
        match result {
            Err(ExtractorError::SchemaValidation { message }) => {
                assert!(message.starts_with("/: "));
            }
            other => panic!("Expected SchemaValidation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_report_serializes() {
        let llm = MockProvider::default();
        llm.add_rule(CRITIQUE, ACCEPT);
        llm.add_rule(EXTRACT, GOOD);

        let report = pipeline(&llm, config(1)).run(INVOICE).await.unwrap();
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["run_id"], report.run_id.to_string());
        assert_eq!(value["passes"][0]["action"], "accept");
        assert_eq!(value["revisions"][0]["source"], "generated");
        assert!(report.summary().contains("accepted after 1 critique pass"));
    }

    /// Cancels its token on the first call, then behaves normally
    struct CancellingProvider {
        cancel: CancelToken,
    }

    impl LlmProvider for CancellingProvider {
        type Error = LlmError;

        fn generate(&self, _prompt: &str, _params: &GenerationParams) -> Result<String, LlmError> {
            self.cancel.cancel();
            Ok(GOOD.to_string())
        }
    }

    #[tokio::test]
    async fn test_cancellation_between_stages() {
        let cancel = CancelToken::new();
        let llm = CancellingProvider {
            cancel: cancel.clone(),
        };
        let pipeline = Pipeline::new(llm, gatekeeper(), config(2)).unwrap();

        let result = pipeline.run_with_cancel(INVOICE, &cancel).await;
        assert!(matches!(result, Err(ExtractorError::Cancelled)));
    }

    #[tokio::test]
    async fn test_concurrent_runs_share_pipeline() {
        let llm = MockProvider::new(GOOD);
        let pipeline = Arc::new(pipeline(&llm, config(0)));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let pipeline = Arc::clone(&pipeline);
                tokio::spawn(async move { pipeline.run(&format!("Invoice #{}", i)).await })
            })
            .collect();

        let mut run_ids = Vec::new();
        for handle in handles {
            let report = handle.await.unwrap().unwrap();
            assert!(report.is_valid());
            run_ids.push(report.run_id);
        }
        run_ids.sort();
        run_ids.dedup();
        assert_eq!(run_ids.len(), 4);
        assert_eq!(llm.call_count(), 4);
    }
}
