//! The closed set of evaluators the evaluation service understands, and the
//! ambient parameters each one is constructed with.
//!
//! Every entry lists the parameters its constructor needs. Instantiation
//! passes exactly that subset, so a new entry only has to declare its list.

use crate::config::{AzureAiProject, ModelConfiguration};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum EvaluatorKind {
    BleuScoreEvaluator,
    CoherenceEvaluator,
    ContentSafetyEvaluator,
    HateUnfairnessEvaluator,
    SelfHarmEvaluator,
    SexualEvaluator,
    ViolenceEvaluator,
    F1ScoreEvaluator,
    FluencyEvaluator,
    GleuScoreEvaluator,
    GroundednessEvaluator,
    MeteorScoreEvaluator,
    ProtectedMaterialEvaluator,
    QAEvaluator,
    RelevanceEvaluator,
    RetrievalEvaluator,
    RougeScoreEvaluator,
    SimilarityEvaluator,
    IndirectAttackEvaluator,
}

/// A constructor argument supplied by the run rather than the config entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbientParam {
    Credential,
    ModelConfig,
    AzureAiProject,
    RougeType,
}

impl AmbientParam {
    pub fn as_str(self) -> &'static str {
        match self {
            AmbientParam::Credential => "credential",
            AmbientParam::ModelConfig => "model_config",
            AmbientParam::AzureAiProject => "azure_ai_project",
            AmbientParam::RougeType => "rouge_type",
        }
    }
}

const TEXT_OVERLAP: &[AmbientParam] = &[];
const ROUGE: &[AmbientParam] = &[AmbientParam::RougeType];
const MODEL_GRADED: &[AmbientParam] = &[AmbientParam::ModelConfig];
const SAFETY: &[AmbientParam] = &[AmbientParam::Credential, AmbientParam::AzureAiProject];

impl EvaluatorKind {
    /// Catalog identifier as written in configuration
    pub fn as_str(self) -> &'static str {
        match self {
            EvaluatorKind::BleuScoreEvaluator => "BleuScoreEvaluator",
            EvaluatorKind::CoherenceEvaluator => "CoherenceEvaluator",
            EvaluatorKind::ContentSafetyEvaluator => "ContentSafetyEvaluator",
            EvaluatorKind::HateUnfairnessEvaluator => "HateUnfairnessEvaluator",
            EvaluatorKind::SelfHarmEvaluator => "SelfHarmEvaluator",
            EvaluatorKind::SexualEvaluator => "SexualEvaluator",
            EvaluatorKind::ViolenceEvaluator => "ViolenceEvaluator",
            EvaluatorKind::F1ScoreEvaluator => "F1ScoreEvaluator",
            EvaluatorKind::FluencyEvaluator => "FluencyEvaluator",
            EvaluatorKind::GleuScoreEvaluator => "GleuScoreEvaluator",
            EvaluatorKind::GroundednessEvaluator => "GroundednessEvaluator",
            EvaluatorKind::MeteorScoreEvaluator => "MeteorScoreEvaluator",
            EvaluatorKind::ProtectedMaterialEvaluator => "ProtectedMaterialEvaluator",
            EvaluatorKind::QAEvaluator => "QAEvaluator",
            EvaluatorKind::RelevanceEvaluator => "RelevanceEvaluator",
            EvaluatorKind::RetrievalEvaluator => "RetrievalEvaluator",
            EvaluatorKind::RougeScoreEvaluator => "RougeScoreEvaluator",
            EvaluatorKind::SimilarityEvaluator => "SimilarityEvaluator",
            EvaluatorKind::IndirectAttackEvaluator => "IndirectAttackEvaluator",
        }
    }

    /// Ambient parameters this evaluator's constructor requires
    pub fn required_params(self) -> &'static [AmbientParam] {
        use EvaluatorKind::*;
        match self {
            BleuScoreEvaluator | F1ScoreEvaluator | GleuScoreEvaluator | MeteorScoreEvaluator => {
                TEXT_OVERLAP
            }
            RougeScoreEvaluator => ROUGE,
            CoherenceEvaluator | FluencyEvaluator | RelevanceEvaluator | SimilarityEvaluator
            | GroundednessEvaluator | RetrievalEvaluator | QAEvaluator => MODEL_GRADED,
            ContentSafetyEvaluator
            | HateUnfairnessEvaluator
            | SelfHarmEvaluator
            | SexualEvaluator
            | ViolenceEvaluator
            | ProtectedMaterialEvaluator
            | IndirectAttackEvaluator => SAFETY,
        }
    }
}

/// Rouge subtype passed to the Rouge evaluator; only `rougeL` is used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RougeType {
    #[default]
    #[serde(rename = "rougeL")]
    RougeL,
}

/// Values available to evaluator constructors for this run
#[derive(Debug, Clone, Copy)]
pub struct AmbientParams<'a> {
    /// Whether the backend holds a credential to forward
    pub credential: bool,
    pub model_config: Option<&'a ModelConfiguration>,
    pub azure_ai_project: Option<&'a AzureAiProject>,
    pub rouge_type: RougeType,
}

/// Constructor arguments sent to the evaluation service
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluatorInit {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub credential: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_config: Option<ModelConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure_ai_project: Option<AzureAiProject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rouge_type: Option<RougeType>,
}

/// A configured evaluator ready to be sent to the evaluation service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatorDeclaration {
    pub name: String,
    pub evaluator: EvaluatorKind,
    pub init: EvaluatorInit,
}

/// Build the declaration for one evaluator, passing only its required parameters
pub fn instantiate(
    name: &str,
    kind: EvaluatorKind,
    ambient: &AmbientParams<'_>,
) -> Result<EvaluatorDeclaration, ConfigError> {
    let missing = |param: AmbientParam| ConfigError::MissingParameter {
        evaluator: name.to_string(),
        kind: kind.as_str(),
        param: param.as_str(),
    };

    let mut init = EvaluatorInit::default();
    for &param in kind.required_params() {
        match param {
            AmbientParam::Credential => {
                if !ambient.credential {
                    return Err(missing(param));
                }
                init.credential = true;
            }
            AmbientParam::ModelConfig => {
                init.model_config =
                    Some(ambient.model_config.ok_or_else(|| missing(param))?.clone());
            }
            AmbientParam::AzureAiProject => {
                init.azure_ai_project =
                    Some(ambient.azure_ai_project.ok_or_else(|| missing(param))?.clone());
            }
            AmbientParam::RougeType => init.rouge_type = Some(ambient.rouge_type),
        }
    }

    Ok(EvaluatorDeclaration {
        name: name.to_string(),
        evaluator: kind,
        init,
    })
}

/// Instantiate every configured evaluator
pub fn hydrate_evaluators(
    evaluators: &BTreeMap<String, EvaluatorKind>,
    ambient: &AmbientParams<'_>,
) -> Result<Vec<EvaluatorDeclaration>, ConfigError> {
    evaluators
        .iter()
        .map(|(name, kind)| instantiate(name, *kind, ambient))
        .collect()
}
