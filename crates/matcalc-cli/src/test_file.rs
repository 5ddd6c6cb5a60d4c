//! Test files: entry lists with edit steps and expected variables.
//!
//! ```text
//! -- test: chain
//! a=2
//! b=a+1
//! -- edit 0: a=5
//! -- expect: {"a": "5", "b": "6"}
//! ```
//!
//! Plain lines are the initial entries. Steps run in order after loading:
//! `-- edit N: text`, `-- insert N` (empty entry after N), `-- delete N` and
//! `-- unset name`. The expectation is a JSON object of every variable in
//! scope and its rendered value.

use anyhow::{Context, Result, anyhow, bail};
use matcalc::{Engine, EngineConfig, Snapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Edit { index: usize, text: String },
    Insert(usize),
    Delete(usize),
    Unset(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub entries: Vec<String>,
    pub steps: Vec<Step>,
    pub expected: Option<String>,
}

fn parse_index(text: &str, line_number: usize) -> Result<usize> {
    text.trim()
        .parse()
        .with_context(|| format!("line {line_number}: expected an entry index, got `{text}`"))
}

fn parse_step(directive: &str, line_number: usize) -> Result<Step> {
    if let Some(rest) = directive.strip_prefix("edit ") {
        let (index, text) = rest
            .split_once(':')
            .ok_or_else(|| anyhow!("line {line_number}: `-- edit N: text` needs a colon"))?;
        return Ok(Step::Edit {
            index: parse_index(index, line_number)?,
            text: text.trim().to_owned(),
        });
    }
    if let Some(index) = directive.strip_prefix("insert ") {
        return Ok(Step::Insert(parse_index(index, line_number)?));
    }
    if let Some(index) = directive.strip_prefix("delete ") {
        return Ok(Step::Delete(parse_index(index, line_number)?));
    }
    if let Some(name) = directive.strip_prefix("unset ") {
        return Ok(Step::Unset(name.trim().to_owned()));
    }
    bail!("line {line_number}: unknown directive `-- {directive}`")
}

pub fn parse_test_file(content: &str) -> Result<Vec<TestCase>> {
    let mut cases = Vec::new();
    let mut current: Option<TestCase> = None;

    for (line_index, line) in content.lines().enumerate() {
        let line_number = line_index + 1;
        let Some(directive) = line.strip_prefix("--").map(str::trim) else {
            match current.as_mut() {
                Some(case) if !case.steps.is_empty() => {
                    bail!("line {line_number}: entry after a step in test `{}`", case.name)
                }
                Some(case) => case.entries.push(line.to_owned()),
                // Text between tests is commentary.
                None => {}
            }
            continue;
        };

        if let Some(name) = directive.strip_prefix("test:") {
            cases.extend(current.take());
            current = Some(TestCase {
                name: name.trim().to_owned(),
                entries: Vec::new(),
                steps: Vec::new(),
                expected: None,
            });
            continue;
        }

        let case = current
            .as_mut()
            .ok_or_else(|| anyhow!("line {line_number}: `-- {directive}` outside a test"))?;
        if let Some(expected) = directive.strip_prefix("expect:") {
            case.expected = Some(expected.trim().to_owned());
            cases.extend(current.take());
        } else {
            case.steps.push(parse_step(directive, line_number)?);
        }
    }
    cases.extend(current);
    Ok(cases)
}

fn check_index(engine: &Engine, index: usize) -> Result<()> {
    let len = engine.entries().len();
    if index >= len {
        bail!("entry index {index} out of bounds for {len} entries");
    }
    Ok(())
}

/// Runs `case` and returns the scope as a JSON object of rendered values.
pub fn run_case(case: &TestCase, config: &EngineConfig) -> Result<serde_json::Value> {
    let mut engine = Engine::with_config(config.clone());
    engine.load(&case.entries);
    for step in &case.steps {
        let report = match step {
            Step::Edit { index, text } => {
                check_index(&engine, *index)?;
                engine.edit_entry(*index, text)
            }
            Step::Insert(index) => {
                check_index(&engine, *index)?;
                engine.insert_entry_after(*index);
                continue;
            }
            Step::Delete(index) => {
                check_index(&engine, *index)?;
                engine.delete_entry(*index)
            }
            Step::Unset(name) => engine.delete_variable(name),
        };
        log::debug!("{step:?}: {report:?}");
    }
    let variables = Snapshot::capture(&engine, 0)
        .variables
        .into_iter()
        .map(|variable| (variable.name, serde_json::Value::String(variable.rendered_value)))
        .collect();
    Ok(serde_json::Value::Object(variables))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAIN: &str = "\
Text before the first test is ignored.
-- test: chain
a=2
b=a+1
-- edit 0: a=5
-- expect: {\"a\": \"5\", \"b\": \"6\"}

-- test: no expectation
1+1
";

    #[test]
    fn parses_cases_and_steps() {
        let cases = parse_test_file(CHAIN).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].name, "chain");
        assert_eq!(cases[0].entries, vec!["a=2", "b=a+1"]);
        assert_eq!(
            cases[0].steps,
            vec![Step::Edit { index: 0, text: "a=5".into() }]
        );
        assert_eq!(cases[0].expected.as_deref(), Some("{\"a\": \"5\", \"b\": \"6\"}"));
        assert_eq!(cases[1].entries, vec!["1+1"]);
        assert_eq!(cases[1].expected, None);
    }

    #[test]
    fn rejects_entries_after_steps() {
        let content = "-- test: bad\na=1\n-- delete 0\nb=2\n";
        assert!(parse_test_file(content).is_err());
        assert!(parse_test_file("-- test: bad\n-- frobnicate 1\n").is_err());
        assert!(parse_test_file("-- edit 0: x\n").is_err());
    }

    #[test]
    fn runs_case_to_rendered_scope() {
        let cases = parse_test_file(CHAIN).unwrap();
        let actual = run_case(&cases[0], &EngineConfig::default()).unwrap();
        let expected: serde_json::Value = serde_json::from_str(r#"{"a": "5", "b": "6"}"#).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn out_of_bounds_step_is_an_error() {
        let case = TestCase {
            name: "oob".into(),
            entries: vec!["a=1".into()],
            steps: vec![Step::Delete(4)],
            expected: None,
        };
        assert!(run_case(&case, &EngineConfig::default()).is_err());
    }
}
