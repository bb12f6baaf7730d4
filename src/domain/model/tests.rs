// Unit tests for domain models

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::domain::errors::*;
    use crate::domain::model::*;

    fn sample_payload() -> serde_json::Value {
        serde_json::json!({
            "title": "Night Walk",
            "asl": 4.5,
            "totalShots": 2.0,
            "dominantColors": ["#101820", "#f2aa4c"],
            "shots": [
                {
                    "id": 1, "startTime": 0.0, "endTime": 4.0, "duration": 4.0,
                    "description": "Wide street", "colors": ["#101820"],
                    "cameraMovement": "static", "composition": "symmetrical"
                },
                {
                    "id": 2.0, "startTime": 4.0, "endTime": 9.0, "duration": 5.0,
                    "description": "Close-up", "colors": ["#f2aa4c"],
                    "cameraMovement": "handheld", "composition": "rule of thirds"
                }
            ],
            "audio": {
                "mood": "tense", "musicDescription": "low strings",
                "dynamicRange": "narrow", "keyEvents": ["footsteps"]
            },
            "visualSummary": "A lonely walk."
        })
    }

    #[test]
    fn test_analysis_result_accepts_float_counts() {
        let result: AnalysisResult = serde_json::from_value(sample_payload()).unwrap();
        assert_eq!(result.total_shots, 2);
        assert_eq!(result.shots[1].id, 2);
        assert_eq!(result.audio.key_events, vec!["footsteps".to_string()]);
        assert!(result.frames.is_none());
        assert_eq!(result.covered_duration(), 9.0);
    }

    #[test]
    fn test_analysis_result_rejects_fractional_count() {
        let mut payload = sample_payload();
        payload["totalShots"] = serde_json::json!(2.5);
        assert!(serde_json::from_value::<AnalysisResult>(payload).is_err());
    }

    #[test]
    fn test_analysis_result_frames_annotation() {
        let result: AnalysisResult = serde_json::from_value(sample_payload()).unwrap();
        let frames: Arc<[FrameSample]> = vec![
            FrameSample::new(vec![1, 2, 3], 3.0),
            FrameSample::new(vec![4, 5], 6.0),
        ]
        .into();
        let result = result.with_frames(Arc::clone(&frames));
        assert_eq!(result.frame_count(), 2);
        assert_eq!(result.frame_timestamps(), vec![3.0, 6.0]);

        // Frames are not part of the serialized analysis
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("frames").is_none());
        assert_eq!(json["totalShots"], 2);
    }

    #[test]
    fn test_frame_sample_debug_hides_bytes() {
        let sample = FrameSample::new(vec![0; 2048], 1.5);
        let debug = format!("{:?}", sample);
        assert!(debug.contains("bytes: 2048"));
        assert!(debug.contains("1.5"));
    }

    #[test]
    fn test_state_transitions_are_monotonic() {
        let idle = PipelineState::Idle;
        assert!(idle.can_transition_to(&PipelineState::Validating));
        assert!(PipelineState::Validating.can_transition_to(&PipelineState::Sampling { progress: 0 }));
        assert!(PipelineState::Sampling { progress: 25 }
            .can_transition_to(&PipelineState::Sampling { progress: 50 }));
        assert!(!PipelineState::Sampling { progress: 50 }
            .can_transition_to(&PipelineState::Sampling { progress: 25 }));
        assert!(!PipelineState::Requesting.can_transition_to(&PipelineState::Validating));
        assert!(!PipelineState::Requesting.can_transition_to(&PipelineState::Requesting));
    }

    #[test]
    fn test_any_running_state_may_fail() {
        let failure = PipelineState::failed(&DomainError::cancelled("stop"));
        for state in [
            PipelineState::Idle,
            PipelineState::Validating,
            PipelineState::Sampling { progress: 10 },
            PipelineState::Requesting,
            PipelineState::Assembling,
        ] {
            assert!(state.can_transition_to(&failure), "{} should fail", state);
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        let failed = PipelineState::Failed {
            kind: ErrorKind::RunTimeout,
            message: "late".to_string(),
        };
        assert!(failed.is_terminal());
        assert!(!failed.can_transition_to(&PipelineState::Idle));
        assert!(!failed.can_transition_to(&PipelineState::failed(&DomainError::cancelled("again"))));
        assert_eq!(failed.to_string(), "failed (RunTimeout): late");
    }

    #[test]
    fn test_request_accessors() {
        let samples: Arc<[FrameSample]> = vec![FrameSample::new(vec![9; 10], 1.0)].into();
        let request = AnalysisRequest::new(samples, "clip.mp4".to_string());
        assert_eq!(request.samples().len(), 1);
        assert_eq!(request.source_label(), "clip.mp4");
        assert_eq!(request.payload_bytes(), 10);
    }
}
