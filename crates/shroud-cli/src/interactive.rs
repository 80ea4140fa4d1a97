//! Guided terminal flow: paste text, copy the anonymized version, paste the
//! reply and read it back with originals restored

use crate::commands::removed_summary;
use anyhow::{Context, Result};
use shroud_pii::{AnonymizationEngine, AnonymizeError, Anonymized, highlight_tags, parse_term_list};
use shroud_session::Session;
use std::io::{BufRead, Write};
use tracing::warn;

const BOLD: &str = "\x1b[1m";
const CYAN: &str = "\x1b[96m";
const PURPLE: &str = "\x1b[95m";
const RESET: &str = "\x1b[0m";

const END_MARKER: &str = "end";
const NO_TERMS: &[&str] = &[];

/// Run the prompt loop once against `session`
pub fn run<R: BufRead, W: Write>(
    engine: &AnonymizationEngine,
    session: &mut Session,
    input: &mut R,
    output: &mut W,
) -> Result<()> {
    let text = read_multiline(
        input,
        output,
        "Enter or paste your text. Type 'END' on a new line and press enter to submit:",
    )?;

    let result = anonymize_for_display(engine, session, &text, NO_TERMS, output)?;
    show_anonymized(&result, output)?;

    let terms = ask_additional_terms(input, output)?;
    if !terms.is_empty() {
        let result = anonymize_for_display(engine, session, &text, &terms, output)?;
        show_anonymized(&result, output)?;
    }

    let response = read_multiline(
        input,
        output,
        "Enter or paste the response. Type 'END' on a new line and press enter to submit:",
    )?;
    writeln!(
        output,
        "{BOLD}{CYAN}\nPrivate information restored:{RESET}\n{}\n",
        session.revert(&response, true)
    )?;

    Ok(())
}

/// Anonymize, falling back to the pattern-only result when the recognizer fails
fn anonymize_for_display<S: AsRef<str>, W: Write>(
    engine: &AnonymizationEngine,
    session: &mut Session,
    text: &str,
    terms: &[S],
    output: &mut W,
) -> Result<Anonymized> {
    match session.anonymize(engine, text, terms) {
        Ok(result) => Ok(result),
        Err(AnonymizeError::Recognizer { partial, source }) => {
            warn!(error = %source, "Showing pattern-only result");
            writeln!(
                output,
                "{BOLD}{PURPLE}\nEntity recognition failed ({}); only patterns were hidden.{RESET}",
                source
            )?;
            Ok(*partial)
        }
        Err(e) => Err(e).context("Anonymization failed"),
    }
}

fn show_anonymized<W: Write>(result: &Anonymized, output: &mut W) -> Result<()> {
    writeln!(
        output,
        "{BOLD}{PURPLE}\nRemoved sensitive information: {}{RESET}",
        removed_summary(&result.mapping)
    )?;
    writeln!(
        output,
        "{BOLD}{CYAN}\nUse the following anonymized text:\n{RESET}{}",
        highlight_tags(&result.text, &result.mapping)
    )?;
    Ok(())
}

/// Read lines until one reading `END` (any case) or end of input
fn read_multiline<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    instruction: &str,
) -> Result<String> {
    writeln!(output, "\n{BOLD}{CYAN}{instruction}{RESET}")?;
    output.flush()?;

    let mut lines = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.trim().eq_ignore_ascii_case(END_MARKER) {
            break;
        }
        lines.push(trimmed.to_string());
    }

    Ok(lines.join("\n"))
}

fn ask_additional_terms<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<Vec<String>> {
    write!(
        output,
        "{BOLD}{CYAN}Do you have additional text to hide? (yes/no): {RESET}"
    )?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    if !matches!(answer.trim().to_lowercase().as_str(), "yes" | "y") {
        return Ok(Vec::new());
    }

    write!(
        output,
        "{BOLD}{CYAN}Enter the text you want to hide, separated by commas: {RESET}"
    )?;
    output.flush()?;

    let mut terms = String::new();
    input.read_line(&mut terms)?;
    Ok(parse_term_list(&terms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shroud_pii::{DetectorConfig, HIGHLIGHT_END, HIGHLIGHT_START};
    use std::io::Cursor;

    fn engine() -> AnonymizationEngine {
        AnonymizationEngine::new(DetectorConfig::default()).unwrap()
    }

    fn run_with(script: &str) -> (Session, String) {
        let mut session = Session::new();
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut output = Vec::new();

        run(&engine(), &mut session, &mut input, &mut output).unwrap();
        (session, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_flow_with_additional_terms() {
        let script = "Mail ana@example.com\nabout Orion\nEND\nyes\nOrion\nSent [ADDITIONAL-1] to [EMAIL-1]\nend\n";
        let (session, output) = run_with(script);

        assert!(output.contains("Removed sensitive information: ana@example.com, Orion"));
        assert!(output.contains(&format!(
            "Mail {}[EMAIL-1]{}\nabout {}[ADDITIONAL-1]{}",
            HIGHLIGHT_START, HIGHLIGHT_END, HIGHLIGHT_START, HIGHLIGHT_END
        )));
        assert!(output.contains(&format!(
            "Sent {}Orion{} to {}ana@example.com{}",
            HIGHLIGHT_START, HIGHLIGHT_END, HIGHLIGHT_START, HIGHLIGHT_END
        )));
        assert_eq!(session.mapping().len(), 2);
    }

    #[test]
    fn test_flow_without_additional_terms() {
        let script = "Call 555-123-4567\nEND\nno\nCalled [PHONE-1]\nEND\n";
        let (_, output) = run_with(script);

        assert_eq!(output.matches("Use the following anonymized text").count(), 1);
        assert!(output.contains(&format!(
            "Called {}555-123-4567{}",
            HIGHLIGHT_START, HIGHLIGHT_END
        )));
    }

    #[test]
    fn test_input_ends_at_eof() {
        let mut input = Cursor::new(b"line one\nline two".to_vec());
        let mut output = Vec::new();

        let text = read_multiline(&mut input, &mut output, "go").unwrap();
        assert_eq!(text, "line one\nline two");
    }

    #[test]
    fn test_end_marker_is_trimmed_and_case_insensitive() {
        let mut input = Cursor::new(b"keep\r\n  End  \nignored\n".to_vec());
        let mut output = Vec::new();

        assert_eq!(read_multiline(&mut input, &mut output, "go").unwrap(), "keep");
    }

    #[test]
    fn test_additional_terms_answer() {
        let mut output = Vec::new();

        let mut input = Cursor::new(b"Y\nAcme, Project X,\n".to_vec());
        assert_eq!(
            ask_additional_terms(&mut input, &mut output).unwrap(),
            vec!["Acme".to_string(), "Project X".to_string()]
        );

        let mut input = Cursor::new(b"nope\nAcme\n".to_vec());
        assert!(ask_additional_terms(&mut input, &mut output).unwrap().is_empty());
    }
}
