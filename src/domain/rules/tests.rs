// Unit tests for business rules

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::domain::errors::*;
    use crate::domain::rules::*;

    fn valid_payload() -> serde_json::Value {
        json!({
            "title": "T",
            "asl": 5,
            "totalShots": 4,
            "dominantColors": ["#000000"],
            "shots": [
                {"id": 1, "startTime": 0, "endTime": 5, "duration": 5, "description": "a",
                 "colors": [], "cameraMovement": "pan", "composition": "wide"}
            ],
            "audio": {"mood": "calm", "musicDescription": "piano", "dynamicRange": "soft", "keyEvents": []},
            "visualSummary": "S"
        })
    }

    #[test]
    fn test_timestamps_concrete_scenario() {
        let timestamps = SamplingPlan::timestamps(30.0, 4).unwrap();
        assert_eq!(timestamps, vec![6.0, 12.0, 18.0, 24.0]);
    }

    #[test]
    fn test_timestamps_follow_formula_and_stay_interior() {
        for &duration in &[0.5, 1.0, 7.3, 59.94, 3600.0, 12345.678] {
            for count in 1..=20usize {
                let timestamps = SamplingPlan::timestamps(duration, count).unwrap();
                assert_eq!(timestamps.len(), count);
                for (index, &t) in timestamps.iter().enumerate() {
                    let i = (index + 1) as f64;
                    assert_eq!(t, i * duration / (count + 1) as f64);
                    assert!(t > 0.0 && t < duration);
                }
                assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }

    #[test]
    fn test_timestamps_are_deterministic() {
        let first = SamplingPlan::timestamps(93.7, 16).unwrap();
        let second = SamplingPlan::timestamps(93.7, 16).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_timestamps_zero_count() {
        assert!(SamplingPlan::timestamps(10.0, 0).unwrap().is_empty());
    }

    #[test]
    fn test_timestamps_invalid_duration() {
        for duration in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let err = SamplingPlan::timestamps(duration, 4).unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidDuration);
        }
    }

    #[test]
    fn test_timestamps_collapsing_duration() {
        let err = SamplingPlan::timestamps(f64::from_bits(1), 8).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidDuration);
    }

    #[test]
    fn test_progress_budget_sampling_range() {
        let budget = ProgressBudget::default();
        assert_eq!(budget.sampling(0, 4), 10);
        assert_eq!(budget.sampling(2, 4), 40);
        assert_eq!(budget.sampling(4, 4), 70);
        assert_eq!(budget.sampling(0, 0), 70);

        let mut last = budget.validated;
        for captured in 0..=16 {
            let value = budget.sampling(captured, 16);
            assert!(value >= last);
            last = value;
        }
        assert!(budget.requesting > last);
        assert!(budget.assembling > budget.requesting);
        assert!(ProgressBudget::COMPLETE > budget.assembling);
    }

    #[test]
    fn test_progress_budget_misordered_range_does_not_underflow() {
        let budget = ProgressBudget {
            sampling_start: 70,
            sampling_end: 10,
            ..ProgressBudget::default()
        };
        assert_eq!(budget.sampling(2, 4), 70);
        assert_eq!(budget.sampling(4, 4), 70);
    }

    #[test]
    fn test_stage_percent() {
        assert_eq!(ProgressBudget::stage_percent(0, 4), 0);
        assert_eq!(ProgressBudget::stage_percent(1, 3), 33);
        assert_eq!(ProgressBudget::stage_percent(4, 4), 100);
    }

    #[test]
    fn test_schema_accepts_valid_payload() {
        let schema = ResponseSchema::film_analysis();
        assert!(schema.validate(&valid_payload()).is_ok());
        assert!(schema.parse(&valid_payload().to_string()).is_ok());
    }

    #[test]
    fn test_schema_rejects_missing_shots() {
        let mut payload = valid_payload();
        payload.as_object_mut().unwrap().remove("shots");
        let err = ResponseSchema::film_analysis().validate(&payload).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedResponse);
        assert!(err.message.contains("$.shots"));
    }

    #[test]
    fn test_schema_rejects_empty_shots() {
        let mut payload = valid_payload();
        payload["shots"] = json!([]);
        let err = ResponseSchema::film_analysis().validate(&payload).unwrap_err();
        assert!(err.message.contains("must not be empty"));
    }

    #[test]
    fn test_schema_rejects_non_numeric_asl() {
        let mut payload = valid_payload();
        payload["asl"] = json!("five");
        let err = ResponseSchema::film_analysis().validate(&payload).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedResponse);
        assert!(err.message.contains("$.asl"));
    }

    #[test]
    fn test_schema_rejects_nested_violation() {
        let mut payload = valid_payload();
        payload["shots"][0]["colors"] = json!(["#fff", 3]);
        let err = ResponseSchema::film_analysis().validate(&payload).unwrap_err();
        assert!(err.message.contains("$.shots[0].colors[1]"));

        let mut payload = valid_payload();
        payload["audio"]["mood"] = serde_json::Value::Null;
        let err = ResponseSchema::film_analysis().validate(&payload).unwrap_err();
        assert!(err.message.contains("$.audio.mood"));
    }

    #[test]
    fn test_schema_rejects_negative_duration() {
        let mut payload = valid_payload();
        payload["shots"][0]["duration"] = json!(-1.0);
        assert!(ResponseSchema::film_analysis().validate(&payload).is_err());
    }

    #[test]
    fn test_parse_rejects_empty_and_invalid_text() {
        let schema = ResponseSchema::film_analysis();
        assert_eq!(schema.parse("   ").unwrap_err().kind, ErrorKind::MalformedResponse);
        assert_eq!(schema.parse("{not json").unwrap_err().kind, ErrorKind::MalformedResponse);
        assert_eq!(schema.parse("[1, 2]").unwrap_err().kind, ErrorKind::MalformedResponse);
    }
}
