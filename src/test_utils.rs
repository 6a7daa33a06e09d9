use std::{io::BufRead, path::{Path, PathBuf}};

use anyhow::bail;
use itertools::Itertools;
use serde::{de::{Error, Visitor}, Deserialize, Serialize};


/// Expected value of a successful evaluation. `Text` is compared against the
/// printed form of the value, which covers strings, `undefined` and functions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestOutput {
    Null,
    Boolean(bool),
    Number(f64),
    Text(String),
}

/// Either the expected output or the name of the expected error kind
#[derive(Debug, Clone)]
pub struct ExpectedResult(Result<TestOutput, String>);

impl From<ExpectedResult> for Result<TestOutput, String> {
    fn from(value: ExpectedResult) -> Self {
        value.0
    }
}

struct ExpectedResultVisitor {}

impl<'de> Deserialize<'de> for ExpectedResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de> {

        deserializer.deserialize_map(ExpectedResultVisitor {})
    }
}

impl<'de> Visitor<'de> for ExpectedResultVisitor {
    type Value = ExpectedResult;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "A structure containing the boolean key 'ok'. If it's okay, contains the key 'output', otherwise the key 'type'")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: serde::de::MapAccess<'de>, {

        if map.next_key::<String>()? != Some("ok".to_owned()) {
            return Err(A::Error::custom("First key should be 'ok'"))
        }

        let ok: bool = map.next_value()?;
        let result = if ok {
            if map.next_key::<String>()?.as_ref()
                .ok_or(A::Error::custom("Must have two keys"))? != "output"
            {
                return Err(A::Error::custom("Second ok key should be 'output'"))
            }

            let value: TestOutput = map.next_value()?;
            ExpectedResult(Ok(value))
        } else {
            if map.next_key::<String>()?.as_ref()
                .ok_or(A::Error::custom("Must have two keys"))? != "type"
            {
                return Err(A::Error::custom("Second ok key should be 'type'"))
            }

            let kind = map.next_value::<String>()?;
            match kind.as_str() {
                "SyntaxError" | "UndefinedVariable" | "ArityError" | "UnimplementedForm"
                | "TypeError" | "NotCallable" | "RecursionLimit" => {}
                other => return Err(A::Error::custom(format!("Unrecognized eva error: {}", other)))
            }
            ExpectedResult(Err(kind))
        };

        if map.next_key::<String>()?.is_some() {
            return Err(A::Error::custom("Only two keys should be present"));
        }

        Ok(result)
    }
}

fn load_input_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<String>> {
    let source = std::fs::read(path)?;
    Ok(source.lines().collect::<Result<Vec<String>, _>>()?)
}

fn load_output_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<ExpectedResult>> {
    let source = std::fs::read(path)?;
    let result: Vec<ExpectedResult> = serde_json::from_slice(&source)?;
    Ok(result)
}

const TESTCASES: usize = 8;

pub fn load_test_pair(testcase: usize) -> anyhow::Result<Vec<(String, ExpectedResult)>> {
    if testcase < 1 || testcase > TESTCASES { bail!("Testcase out of bounds"); }

    let base_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let input = load_input_file(base_path.join("test_inputs").join(format!("{}.eva", testcase)))?;
    let output = load_output_file(base_path.join("test_outputs").join(format!("{}.json", testcase)))?;

    if input.len() != output.len() { bail!("Input and output of testcase {} does not match", testcase); }
    Ok(input.into_iter().zip(output).collect_vec())
}

pub fn all_testcases() -> impl Iterator<Item = usize> {
    1..=TESTCASES
}
