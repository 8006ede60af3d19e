//! Crate-level integration and BDD tests.


use mockall::mock;
use mockall::predicate::{always, function};

use crate::error::PluginError;
use crate::manifest::PluginManifest;
use crate::process::{PluginExecutor, PluginOutcome};
use crate::protocol::{SpeechRequest, SpeechResponse};

/// Executor that echoes the request's line count without spawning anything.
struct StubExecutor;

impl PluginExecutor for StubExecutor {
    fn execute(
        &self,
        _manifest: &PluginManifest,
        request: &SpeechRequest,
    ) -> Result<PluginOutcome, PluginError> {
        Ok(PluginOutcome::Completed {
            response: SpeechResponse::success(vec![format!("{} lines", request.lines().len())]),
        })
    }
}

#[test]
fn executor_trait_objects_are_usable() {
    let executor: &dyn PluginExecutor = &StubExecutor;
    let manifest = PluginManifest::new("stub", "/usr/bin/stub".into());
    let request = SpeechRequest::new(vec![String::from("a"), String::from("b")]);

    let outcome = executor.execute(&manifest, &request).expect("execute");
    assert!(outcome.is_success());
    assert_eq!(outcome.utterances(), ["2 lines"]);
}

mock! {
    Executor {}
    impl PluginExecutor for Executor {
        fn execute(
            &self,
            manifest: &PluginManifest,
            request: &SpeechRequest,
        ) -> Result<PluginOutcome, PluginError>;
    }
}

/// Asks an executor to run the named plugin and returns what should be spoken.
fn speak_with(executor: &dyn PluginExecutor, request: &SpeechRequest) -> Vec<String> {
    let manifest = PluginManifest::new("summary", "/usr/bin/summary".into());
    match executor.execute(&manifest, request) {
        Ok(outcome) => outcome.utterances().to_vec(),
        Err(error) => vec![error.to_string()],
    }
}

#[test]
fn mocked_executor_receives_request_once() {
    let mut executor = MockExecutor::new();
    executor
        .expect_execute()
        .with(always(), function(|request: &SpeechRequest| {
            request.last_command() == Some("ls")
        }))
        .once()
        .returning(|_manifest: &PluginManifest, request: &SpeechRequest| {
            Ok(PluginOutcome::Completed {
                response: SpeechResponse::success(request.lines().to_vec()),
            })
        });

    let request = SpeechRequest::new(vec![String::from("file1")]).with_last_command("ls");
    assert_eq!(speak_with(&executor, &request), ["file1"]);
}

#[test]
fn mocked_executor_errors_are_spoken_as_text() {
    let mut executor = MockExecutor::new();
    executor
        .expect_execute()
        .once()
        .returning(|manifest: &PluginManifest, _request: &SpeechRequest| {
            Err(PluginError::Timeout {
                name: manifest.name().to_owned(),
                timeout_secs: manifest.timeout_secs(),
            })
        });

    let speak = speak_with(&executor, &SpeechRequest::default());
    let [message] = speak.as_slice() else {
        panic!("expected one message, got {speak:?}");
    };
    assert!(message.contains("summary"), "got: {message}");
    assert!(message.contains("30"), "got: {message}");
}

#[test]
fn failed_outcome_only_exposes_diagnostic() {
    let outcome = PluginOutcome::Failed {
        status: 1,
        response: SpeechResponse::success(vec![
            String::from("Plugin error: bad input"),
            String::from("stray analysis"),
        ]),
    };
    assert!(!outcome.is_success());
    assert_eq!(outcome.utterances(), ["Plugin error: bad input"]);
    assert_eq!(outcome.response().speak().len(), 2);
}

#[test]
fn failed_outcome_without_diagnostic_speaks_nothing() {
    let outcome = PluginOutcome::Failed {
        status: 3,
        response: SpeechResponse::success(Vec::new()),
    };
    assert!(outcome.utterances().is_empty());
}
