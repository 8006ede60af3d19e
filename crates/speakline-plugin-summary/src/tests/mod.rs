//! Unit and behavioural tests for the summary plugin.


use std::io::Cursor;

use rstest::rstest;
use speakline_plugins::SpeechResponse;
use speakline_plugins::dispatch::ExitStatus;

use crate::{run, summarise};

fn lines(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|line| (*line).to_owned()).collect()
}

// ---------------------------------------------------------------------------
// summarise
// ---------------------------------------------------------------------------

#[rstest]
#[case::all_blank(&["", "   ", "\t"], 0)]
#[case::mixed(&["$ ls", "", "file1", "  file2  "], 3)]
#[case::empty(&[], 0)]
#[case::prompt_line_counts(&["$ ls", "file1", "file2", ""], 3)]
fn non_empty_count_ignores_whitespace_only_lines(#[case] raw: &[&str], #[case] expected: usize) {
    let speak = summarise(&lines(raw), None);
    assert_eq!(
        speak.first().map(String::as_str),
        Some(format!("Found {expected} non-empty lines").as_str())
    );
}

#[test]
fn absent_command_is_not_mentioned() {
    let speak = summarise(&lines(&["a", "b"]), None);
    assert!(
        speak.iter().all(|utterance| !utterance.contains("Last command")),
        "got: {speak:?}"
    );
}

#[test]
fn empty_command_is_not_mentioned() {
    let speak = summarise(&lines(&["a"]), Some(""));
    assert_eq!(speak, ["Found 1 non-empty lines"]);
}

// Only holds for commands that do not also occur in the fixed count
// wording; see `command_sharing_count_wording_is_heard_more_than_once`.
#[rstest]
#[case::simple("ls")]
#[case::with_args("git status --short")]
#[case::with_quotes("echo \"hi there\"")]
fn command_appears_verbatim_exactly_once(#[case] command: &str) {
    let speak = summarise(&lines(&["output"]), Some(command));
    let mentions = speak
        .iter()
        .filter(|utterance| utterance.contains(command))
        .count();
    assert_eq!(mentions, 1, "got: {speak:?}");
    assert!(speak.contains(&format!("Last command was: {command}")));
}

#[rstest]
#[case::lines_word("lines", 3)]
#[case::found_word("Found", 3)]
#[case::error_word("error", 2)]
fn command_sharing_count_wording_is_heard_more_than_once(
    #[case] command: &str,
    #[case] expected: usize,
) {
    let speak = summarise(&lines(&["error: oops"]), Some(command));
    let mentions = speak
        .iter()
        .filter(|utterance| utterance.contains(command))
        .count();
    assert_eq!(mentions, expected, "got: {speak:?}");
}

#[test]
fn error_marker_is_case_insensitive() {
    let speak = summarise(
        &lines(&["bash: foo: command not found", "ERROR: retry", "Error", "fine"]),
        None,
    );
    assert_eq!(
        speak,
        ["Found 4 non-empty lines", "Found 2 lines containing 'error'"]
    );
}

#[test]
fn utterances_follow_fixed_order() {
    let speak = summarise(&lines(&["error: oops"]), Some("make"));
    assert_eq!(
        speak,
        [
            "Found 1 non-empty lines",
            "Last command was: make",
            "Found 1 lines containing 'error'",
        ]
    );
}

// ---------------------------------------------------------------------------
// run: stdin/stdout and settings handling
// ---------------------------------------------------------------------------

fn run_with(args: &[&str], input: &str) -> (ExitStatus, String) {
    let mut stdin = Cursor::new(input.as_bytes().to_vec());
    let mut stdout = Vec::new();
    let status = run(args.iter().copied(), &mut stdin, &mut stdout).expect("stdout is writable");
    (status, String::from_utf8(stdout).expect("utf8 stdout"))
}

fn parse(output: &str) -> SpeechResponse {
    serde_json::from_str(output.trim_end()).expect("parse response")
}

#[test]
fn run_answers_request() {
    let (status, output) = run_with(
        &["speakline-summary"],
        "{\"lines\": [\"$ ls\", \"file1\"], \"last_command\": \"ls\"}\n",
    );
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(
        parse(&output).speak(),
        ["Found 2 non-empty lines", "Last command was: ls"]
    );
}

#[test]
fn run_turns_bad_settings_into_failure_response() {
    let (status, output) = run_with(&["speakline-summary", "--bogus"], "{}\n");
    assert_eq!(status, ExitStatus::Failure);
    let response = parse(&output);
    assert_eq!(response.speak().len(), 1);
    assert!(
        response
            .speak()
            .first()
            .is_some_and(|text| text.starts_with("Plugin error: invalid plugin settings")),
        "got: {:?}",
        response.speak()
    );
}

#[test]
fn run_prints_help_without_reading_stdin() {
    let (status, output) = run_with(&["speakline-summary", "--help"], "");
    assert_eq!(status, ExitStatus::Success);
    assert!(output.contains("--log-filter"), "got: {output}");
}
