use crate::model::NewQuestion;
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

/// Question file accepted by `dataset import`: either a bare list of questions or
/// `{name, questions}`. JSON files parse as well, being valid YAML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum QuestionFileRepr {
    Named {
        #[serde(default)]
        name: Option<String>,
        questions: Vec<NewQuestion>,
    },
    List(Vec<NewQuestion>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionFile {
    pub name: Option<String>,
    pub questions: Vec<NewQuestion>,
}

pub fn parse_question_file(raw: &str) -> anyhow::Result<QuestionFile> {
    let repr: QuestionFileRepr =
        serde_yaml::from_str(raw).context("question file is neither a list nor {name, questions}")?;
    Ok(match repr {
        QuestionFileRepr::Named { name, questions } => QuestionFile { name, questions },
        QuestionFileRepr::List(questions) => QuestionFile {
            name: None,
            questions,
        },
    })
}

pub fn load_question_file(path: &Path) -> anyhow::Result<QuestionFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question file {}", path.display()))?;
    parse_question_file(&raw)
}
