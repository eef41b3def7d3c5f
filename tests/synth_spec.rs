mod common;

use common::*;
use meeting_intel::models::CanonicalFile;
use meeting_intel::synth::files::PARSE_FAILURE_PLACEHOLDER;
use meeting_intel::synth::{CompletionError, CompletionOptions, SynthError, SynthSettings};

fn settings(max_attempts: u32) -> SynthSettings {
    SynthSettings {
        context_budget: 4_000,
        max_attempts,
        options: CompletionOptions {
            max_tokens: 1234,
            temperature: 0.3,
        },
    }
}

mod completion_requests {
    use super::*;

    #[tokio::test]
    async fn sends_two_message_conversation_with_bearer_key() {
        let upstream = FakeUpstream::completions(&["# Plan"]).await;
        let synth = synthesizer(&upstream.url, settings(3));

        let plan = synth
            .generate_project_plan(&meeting(), 4, "Two developers")
            .await
            .unwrap();
        assert_eq!(plan, "# Plan");

        let requests = upstream.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.authorization.as_deref(), Some("Bearer test-key"));
        assert_eq!(request.body["model"], TEST_MODEL);
        assert_eq!(request.body["max_tokens"], 1234);
        assert!((request.body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);

        let messages = request.body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_error() {
        let upstream = FakeUpstream::start(vec![(429, "slow down".to_string())]).await;
        let synth = synthesizer(&upstream.url, settings(3));

        let err = synth
            .generate_project_plan(&meeting(), 4, "")
            .await
            .unwrap_err();
        match err {
            SynthError::Completion(CompletionError::Upstream { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(upstream.requests().len(), 1, "upstream errors are not retried");
    }

    #[tokio::test]
    async fn unexpected_envelope_is_parse_error() {
        let upstream = FakeUpstream::start(vec![(200, r#"{"result":"?"}"#.to_string())]).await;
        let synth = synthesizer(&upstream.url, settings(3));

        let err = synth.generate_backlog(&meeting(), "").await.unwrap_err();
        assert!(matches!(
            err,
            SynthError::Completion(CompletionError::Parse(_))
        ));
    }
}

mod project_plan {
    use super::*;

    #[tokio::test]
    async fn prompt_contains_extracted_context_and_duration() {
        let upstream = FakeUpstream::completions(&["plan"]).await;
        let synth = synthesizer(&upstream.url, settings(3));

        synth
            .generate_project_plan(&meeting(), 8, "Launch before summer")
            .await
            .unwrap();

        let prompt = upstream.requests()[0].user_prompt();
        assert!(prompt.contains("8-week project"));
        assert!(prompt.contains("## Functional Document\nCustomers must be able to book a slot online."));
        assert!(prompt.contains("## UI Mockups\nBooking page with a calendar"));
        assert!(prompt.contains("Launch before summer"));
    }

    #[tokio::test]
    async fn zero_weeks_is_rejected_without_calling_upstream() {
        let upstream = FakeUpstream::completions(&["plan"]).await;
        let synth = synthesizer(&upstream.url, settings(3));

        let err = synth
            .generate_project_plan(&meeting(), 0, "")
            .await
            .unwrap_err();
        assert!(matches!(err, SynthError::InvalidInput(_)));
        assert!(upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn empty_meeting_is_rejected() {
        let upstream = FakeUpstream::completions(&["plan"]).await;
        let synth = synthesizer(&upstream.url, settings(3));

        let mut empty = meeting();
        empty.summary.clear();
        empty.functional_doc.clear();
        empty.mockups.clear();
        empty.markdown.clear();

        let err = synth.generate_project_plan(&empty, 2, "").await.unwrap_err();
        assert!(matches!(err, SynthError::InvalidInput(_)));
        assert!(upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn long_documents_are_fitted_to_budget() {
        let upstream = FakeUpstream::completions(&["plan"]).await;
        let synth = synthesizer(&upstream.url, settings(3));

        let mut big = meeting();
        big.summary = "Everyone agreed the schedule is tight. ".repeat(2_000);

        synth.generate_project_plan(&big, 2, "").await.unwrap();

        let prompt = upstream.requests()[0].user_prompt();
        assert!(prompt.chars().count() < 4_000 + 2_000);
        assert!(prompt.contains("[... section truncated ...]"));
    }
}

mod backlog {
    use super::*;

    #[tokio::test]
    async fn uses_generated_plan_as_top_section() {
        let upstream = FakeUpstream::completions(&["| ID | User Story |"]).await;
        let synth = synthesizer(&upstream.url, settings(3));

        let mut m = meeting();
        m.generated_project_plan = Some("## Phase 1\nBuild the booking API".to_string());

        let backlog = synth.generate_backlog(&m, "").await.unwrap();
        assert_eq!(backlog, "| ID | User Story |");

        let prompt = upstream.requests()[0].user_prompt();
        let plan_at = prompt.find("## Project Plan\n## Phase 1").unwrap();
        let functional_at = prompt.find("## Functional Document").unwrap();
        assert!(plan_at < functional_at);
    }
}

mod files {
    use super::*;

    #[tokio::test]
    async fn single_complete_reply() {
        let reply = canonical_files_reply("F", "M", "D");
        let upstream = FakeUpstream::completions(&[reply.as_str()]).await;
        let synth = synthesizer(&upstream.url, settings(3));

        let files = synth.generate_files(&meeting()).await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["FunctionalDoc.txt", "Mockups.txt", "Markdown.md"]);
        let contents: Vec<_> = files.iter().map(|f| f.content.as_str()).collect();
        assert_eq!(contents, vec!["F", "M", "D"]);
        assert_eq!(upstream.requests().len(), 1);
    }

    #[tokio::test]
    async fn fenced_reply_is_accepted() {
        let reply = format!("```json\n{}\n```", canonical_files_reply("F", "M", "D"));
        let upstream = FakeUpstream::completions(&[reply.as_str()]).await;
        let synth = synthesizer(&upstream.url, settings(3));

        let files = synth.generate_files(&meeting()).await.unwrap();
        assert_eq!(files[2].content, "D");
    }

    #[tokio::test]
    async fn follow_up_asks_only_for_missing_files() {
        let first = r#"[{"name":"FunctionalDoc.txt","content":"F"}]"#;
        let second = r#"[{"name":"Mockups.txt","content":"M"},{"name":"Markdown.md","content":"D"},{"name":"FunctionalDoc.txt","content":"ignored"}]"#;
        let upstream = FakeUpstream::completions(&[first, second]).await;
        let synth = synthesizer(&upstream.url, settings(3));

        let files = synth.generate_files(&meeting()).await.unwrap();
        let contents: Vec<_> = files.iter().map(|f| f.content.as_str()).collect();
        assert_eq!(contents, vec!["F", "M", "D"]);

        let requests = upstream.requests();
        assert_eq!(requests.len(), 2);
        let follow_up = requests[1].user_prompt();
        assert!(!follow_up.contains(CanonicalFile::Functional.file_name()));
        assert!(follow_up.contains(CanonicalFile::Mockups.file_name()));
        assert!(follow_up.contains(CanonicalFile::Markdown.file_name()));
    }

    #[tokio::test]
    async fn blank_or_placeholder_slots_are_requested_again() {
        let first = format!(
            r#"[{{"name":"FunctionalDoc.txt","content":"  "}},{{"name":"Mockups.txt","content":"M"}},{{"name":"Markdown.md","content":"{}"}}]"#,
            PARSE_FAILURE_PLACEHOLDER
        );
        let second = r#"{"functional":"F","markdown":"D","mockups":"ignored"}"#;
        let upstream = FakeUpstream::completions(&[first.as_str(), second]).await;
        let synth = synthesizer(&upstream.url, settings(3));

        let files = synth.generate_files(&meeting()).await.unwrap();
        let contents: Vec<_> = files.iter().map(|f| f.content.as_str()).collect();
        assert_eq!(contents, vec!["F", "M", "D"]);

        let requests = upstream.requests();
        assert_eq!(requests.len(), 2);
        let follow_up = requests[1].user_prompt();
        assert!(follow_up.contains(CanonicalFile::Functional.file_name()));
        assert!(!follow_up.contains(CanonicalFile::Mockups.file_name()));
        assert!(follow_up.contains(CanonicalFile::Markdown.file_name()));
    }

    #[tokio::test]
    async fn unparseable_reply_counts_as_an_attempt() {
        let reply = canonical_files_reply("F", "M", "D");
        let upstream = FakeUpstream::completions(&["Sorry, no JSON today.", reply.as_str()]).await;
        let synth = synthesizer(&upstream.url, settings(3));

        let files = synth.generate_files(&meeting()).await.unwrap();
        assert!(files.iter().all(|f| f.content != PARSE_FAILURE_PLACEHOLDER));
        assert_eq!(upstream.requests().len(), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let upstream = FakeUpstream::completions(&[
            "I cannot help with that.",
            r#"[{"name":"Mockups.txt","content":"M"}]"#,
            "unused",
        ])
        .await;
        let synth = synthesizer(&upstream.url, settings(2));

        let err = synth.generate_files(&meeting()).await.unwrap_err();
        match err {
            SynthError::IncompleteGeneration { attempts, missing } => {
                assert_eq!(attempts, 2);
                assert_eq!(missing, vec!["FunctionalDoc.txt", "Markdown.md"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(upstream.requests().len(), 2);
    }

    #[tokio::test]
    async fn meeting_without_summary_is_rejected() {
        let upstream = FakeUpstream::completions(&[]).await;
        let synth = synthesizer(&upstream.url, settings(3));

        let mut m = meeting();
        m.summary = "  ".to_string();
        let err = synth.generate_files(&m).await.unwrap_err();
        assert!(matches!(err, SynthError::InvalidInput(_)));
    }
}
