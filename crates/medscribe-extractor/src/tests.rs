//! Pipeline scenario tests for the Extractor

#[cfg(test)]
mod tests {
    use crate::{
        ExtractionError, ExtractionInput, Extractor, ExtractorConfig, ParseFailure,
    };
    use medscribe_domain::{GenerationProvider, SchemaDescriptor};
    use medscribe_llm::MockProvider;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    const WRAPPED_RESPONSE: &str = "Here you go:\n{\"patient_details\":{\"name\":\"John\",\"age\":45,\"gender\":\"male\"},\"report_content\":{},\"doctor_details\":{}}";

    #[tokio::test]
    async fn test_full_extraction_flow() {
        let llm = MockProvider::new(WRAPPED_RESPONSE);
        let extractor = Extractor::new(llm, ExtractorConfig::default());
        let schema = SchemaDescriptor::report_from_text();

        let record = extractor
            .extract(ExtractionInput::from_text("Patient John, 45, male..."), &schema)
            .await
            .unwrap();

        assert_eq!(
            record.into_value(),
            json!({
                "patient_details": {"name": "John", "age": 45, "gender": "male"},
                "report_content": {},
                "doctor_details": {}
            })
        );

        let prompt = extractor.provider().last_prompt().unwrap();
        assert!(prompt.contains("Patient John, 45, male..."));
        assert_eq!(extractor.provider().call_count(), 1);
    }

    #[tokio::test]
    async fn test_extraction_is_idempotent() {
        let llm = MockProvider::new(WRAPPED_RESPONSE);
        let extractor = Extractor::new(llm, ExtractorConfig::default());
        let schema = SchemaDescriptor::report_from_text();
        let input = ExtractionInput::from_text("Patient John, 45, male...");

        let first = extractor.extract(input.clone(), &schema).await.unwrap();
        let second = extractor.extract(input, &schema).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_extraction_with_no_json() {
        let llm = MockProvider::new("Sorry, I cannot help with that.");
        let extractor = Extractor::new(llm, ExtractorConfig::default());
        let schema = SchemaDescriptor::report_from_text();

        let result = extractor.extract(ExtractionInput::from_text("text"), &schema).await;
        assert_eq!(
            result,
            Err(ExtractionError::ExtractionFailed {
                reason: ParseFailure::NoJsonBlockFound,
                raw_output: "Sorry, I cannot help with that.".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_extraction_with_malformed_json() {
        let llm = MockProvider::new("Result: {\"patient_details\": {\"name\": \"John\",}");
        let extractor = Extractor::new(llm, ExtractorConfig::default());
        let schema = SchemaDescriptor::report_from_text();

        let result = extractor.extract(ExtractionInput::from_text("text"), &schema).await;
        match result {
            Err(ExtractionError::ExtractionFailed { reason, raw_output }) => {
                assert_eq!(reason, ParseFailure::MalformedJsonText);
                assert!(raw_output.starts_with("Result:"));
            }
            other => panic!("Expected ExtractionFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extraction_with_missing_fields() {
        let llm = MockProvider::new(r#"{"patient_details": {"name": "John"}}"#);
        let extractor = Extractor::new(llm, ExtractorConfig::default());
        let schema = SchemaDescriptor::report_from_text();

        let result = extractor.extract(ExtractionInput::from_text("text"), &schema).await;
        assert_eq!(
            result,
            Err(ExtractionError::SchemaViolation {
                missing_fields: vec!["report_content".to_string(), "doctor_details".to_string()],
            })
        );
    }

    #[tokio::test]
    async fn test_generation_failure_not_retried() {
        let llm = MockProvider::failing("quota exhausted");
        let extractor = Extractor::new(llm, ExtractorConfig::default());
        let schema = SchemaDescriptor::report_from_text();

        let result = extractor.extract(ExtractionInput::from_text("text"), &schema).await;
        assert_eq!(
            result,
            Err(ExtractionError::GenerationFailed("LLM error: quota exhausted".to_string()))
        );
        assert_eq!(extractor.provider().call_count(), 1);
    }

    #[tokio::test]
    async fn test_image_extraction_passes_reference() {
        let llm = MockProvider::new(
            r#"```json
{"patient_details": {}, "report_content": {"diagnosis": "fracture"},
 "doctor_details": {}, "model_insights": {"summary": "Broken wrist."}}
```"#,
        );
        let extractor = Extractor::new(llm, ExtractorConfig::default());
        let schema = SchemaDescriptor::report_from_image();

        let record = extractor
            .extract(ExtractionInput::from_image(" gs://reports/xray.png "), &schema)
            .await
            .unwrap();

        assert_eq!(record.pointer("/model_insights/summary"), Some(&json!("Broken wrist.")));
        assert_eq!(
            extractor.provider().last_image_ref().as_deref(),
            Some("gs://reports/xray.png")
        );
    }

    #[tokio::test]
    async fn test_image_extraction_requires_insights() {
        let llm = MockProvider::new(r#"{"patient_details": {}, "report_content": {}, "doctor_details": {}}"#);
        let extractor = Extractor::new(llm, ExtractorConfig::default());
        let schema = SchemaDescriptor::report_from_image();

        let result = extractor.extract(ExtractionInput::from_image("scan.jpg"), &schema).await;
        assert_eq!(
            result,
            Err(ExtractionError::SchemaViolation {
                missing_fields: vec!["model_insights".to_string()],
            })
        );
    }

    /// Provider whose attempts each take 400 ms and never succeed
    #[derive(Clone, Default)]
    struct SlowRetryingProvider {
        attempts: Arc<AtomicUsize>,
    }

    impl GenerationProvider for SlowRetryingProvider {
        type Error = String;

        fn generate(&self, prompt: &str) -> Result<String, String> {
            self.generate_until(prompt, None, None)
        }

        fn generate_until(
            &self,
            _prompt: &str,
            _image_ref: Option<&str>,
            deadline: Option<Instant>,
        ) -> Result<String, String> {
            for _ in 0..5 {
                if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                    return Err("deadline reached".to_string());
                }
                self.attempts.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(400));
            }
            Err("all attempts failed".to_string())
        }
    }

    #[tokio::test]
    async fn test_configured_timeout_is_generation_failure() {
        let config = ExtractorConfig {
            generation_timeout_secs: Some(1),
            ..Default::default()
        };
        let extractor = Extractor::new(SlowRetryingProvider::default(), config);
        let schema = SchemaDescriptor::report_from_text();

        let result = extractor.extract(ExtractionInput::from_text("text"), &schema).await;
        assert_eq!(
            result,
            Err(ExtractionError::GenerationFailed(
                "Generation timed out after 1 s".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_timed_out_generation_stops_working() {
        let config = ExtractorConfig {
            generation_timeout_secs: Some(1),
            ..Default::default()
        };
        let llm = SlowRetryingProvider::default();
        let extractor = Extractor::new(llm.clone(), config);
        let schema = SchemaDescriptor::report_from_text();

        let result = extractor.extract(ExtractionInput::from_text("text"), &schema).await;
        assert!(matches!(result, Err(ExtractionError::GenerationFailed(_))));
        let at_timeout = llm.attempts.load(Ordering::SeqCst);

        // Long enough for all five attempts had the deadline been ignored
        tokio::time::sleep(Duration::from_millis(2500)).await;
        let later = llm.attempts.load(Ordering::SeqCst);

        assert_eq!(later, at_timeout);
        assert!(later <= 3, "attempts continued after the deadline: {}", later);
    }

    #[tokio::test]
    async fn test_concurrent_extractions_are_independent() {
        let llm = MockProvider::new(WRAPPED_RESPONSE);
        llm.add_error(
            crate::PromptBuilder::new(&SchemaDescriptor::report_from_text())
                .with_text("broken")
                .build(),
            "boom",
        );
        let extractor = Extractor::new(llm, ExtractorConfig::default());
        let schema = SchemaDescriptor::report_from_text();

        let (ok, failed) = tokio::join!(
            extractor.extract(ExtractionInput::from_text("fine"), &schema),
            extractor.extract(ExtractionInput::from_text("broken"), &schema),
        );
        assert!(ok.is_ok());
        assert!(matches!(failed, Err(ExtractionError::GenerationFailed(_))));
        assert_eq!(extractor.provider().call_count(), 2);
    }
}
