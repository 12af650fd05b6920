//! Wire shapes shared by the proxy and the workflow client.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Number of styles the analysis prompt asks for.
pub const EXPECTED_RECOMMENDATIONS: usize = 5;

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("valid fence regex"));

#[derive(Debug, Error)]
pub enum AnalysisParseError {
    #[error("analysis response was empty")]
    Empty,
    #[error("analysis response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("analysis contained no recommendations")]
    NoRecommendations,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceAnalysis {
    pub face_type: String,
    #[serde(default)]
    pub face_features: Map<String, Value>,
    #[serde(default)]
    pub analysis_description: String,
    #[serde(default)]
    pub recommendations: Vec<StyleRecommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleRecommendation {
    pub name: String,
    #[serde(rename = "match", deserialize_with = "clamped_score", default)]
    pub match_score: u8,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "stylingTip", alias = "tip", default)]
    pub styling_tip: String,
    #[serde(rename = "prompt", default)]
    pub generation_prompt: String,
}

fn clamped_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    Ok(raw.round().clamp(0.0, 100.0) as u8)
}

impl FaceAnalysis {
    /// Parses model output, unwrapping a fenced ```json block when present.
    pub fn from_model_text(text: &str) -> Result<Self, AnalysisParseError> {
        let mut json_text = text;
        if let Some(captures) = FENCED_JSON.captures(text) {
            if let Some(inner) = captures.get(1) {
                json_text = inner.as_str();
            }
        }
        let json_text = json_text.trim();
        if json_text.is_empty() {
            return Err(AnalysisParseError::Empty);
        }

        let analysis: FaceAnalysis = serde_json::from_str(json_text)?;
        if analysis.recommendations.is_empty() {
            return Err(AnalysisParseError::NoRecommendations);
        }
        Ok(analysis)
    }

    pub fn best_match(&self) -> Option<&StyleRecommendation> {
        self.recommendations.first()
    }

    fn feature_text(&self, key: &str) -> Option<String> {
        match self.face_features.get(key)? {
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Value::String(_) | Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// The two feature descriptions shown as tags next to the face type.
    ///
    /// Prefers the forehead and cheekbone entries under either naming scheme
    /// the prompts have used, then falls back to whatever comes first.
    pub fn headline_features(&self) -> Vec<String> {
        let preferred = [["forehead", "upperFace"], ["cheekbones", "middleFace"]];
        let mut picked: Vec<String> = Vec::new();
        let mut used_keys: Vec<&str> = Vec::new();

        for aliases in preferred {
            for key in aliases {
                if let Some(text) = self.feature_text(key) {
                    picked.push(text);
                    used_keys.push(key);
                    break;
                }
            }
        }

        if picked.len() < 2 {
            for key in self.face_features.keys() {
                if picked.len() >= 2 {
                    break;
                }
                if used_keys.contains(&key.as_str()) {
                    continue;
                }
                if let Some(text) = self.feature_text(key) {
                    picked.push(text);
                }
            }
        }

        picked
    }
}

/// Body returned by `/api/generate-style`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleImageResponse {
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Body returned with every non-success status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationStatus {
    Pending,
    Ready { image_data: String },
    Failed,
}

/// One per recommendation, created as soon as fan-out begins.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedStyleImage {
    pub source_recommendation_index: usize,
    pub status: GenerationStatus,
    pub status_text: Option<String>,
}

impl GeneratedStyleImage {
    pub fn pending(index: usize) -> Self {
        Self {
            source_recommendation_index: index,
            status: GenerationStatus::Pending,
            status_text: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, GenerationStatus::Pending)
    }

    pub fn image_data(&self) -> Option<&str> {
        match &self.status {
            GenerationStatus::Ready { image_data } => Some(image_data),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn oval_analysis() -> FaceAnalysis {
        let scores = [98u8, 95, 92, 90, 88];
        let recommendations = scores
            .iter()
            .enumerate()
            .map(|(index, score)| StyleRecommendation {
                name: format!("스타일 {}", index + 1),
                match_score: *score,
                description: format!("설명 {}", index + 1),
                styling_tip: format!("팁 {}", index + 1),
                generation_prompt: format!("a person with hairstyle number {}", index + 1),
            })
            .collect();

        let mut face_features = Map::new();
        face_features.insert("forehead".into(), Value::String("넓은 이마".into()));
        face_features.insert("cheekbones".into(), Value::String("부드러운 광대".into()));
        face_features.insert("jawline".into(), Value::String("갸름한 턱선".into()));

        FaceAnalysis {
            face_type: "계란형".to_string(),
            face_features,
            analysis_description: "균형 잡힌 얼굴형입니다.".to_string(),
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "faceType": "둥근형",
        "faceFeatures": {
            "upperFace": "둥근 이마",
            "middleFace": "볼륨 있는 중안부",
            "lowerFace": "짧은 턱"
        },
        "analysisDescription": "부드러운 인상입니다.",
        "recommendations": [
            {"name": "허쉬컷", "match": 97, "description": "d", "tip": "t", "prompt": "p"},
            {"name": "슬릭컷", "match": 140.2, "description": "d", "stylingTip": "t2", "prompt": "p"}
        ]
    }"#;

    #[test]
    fn parses_fenced_model_output() {
        let text = format!("Here you go:\n```json\n{SAMPLE}\n```\n");
        let analysis = FaceAnalysis::from_model_text(&text).unwrap();
        assert_eq!(analysis.face_type, "둥근형");
        assert_eq!(analysis.recommendations.len(), 2);
        assert_eq!(analysis.recommendations[0].styling_tip, "t");
        assert_eq!(analysis.recommendations[1].styling_tip, "t2");
    }

    #[test]
    fn clamps_match_scores() {
        let analysis = FaceAnalysis::from_model_text(SAMPLE).unwrap();
        assert_eq!(analysis.recommendations[0].match_score, 97);
        assert_eq!(analysis.recommendations[1].match_score, 100);
    }

    #[test]
    fn rejects_empty_or_recommendation_free_output() {
        assert!(matches!(
            FaceAnalysis::from_model_text("```json\n```"),
            Err(AnalysisParseError::Empty)
        ));
        assert!(matches!(
            FaceAnalysis::from_model_text(r#"{"faceType":"긴형"}"#),
            Err(AnalysisParseError::NoRecommendations)
        ));
        assert!(matches!(
            FaceAnalysis::from_model_text("not json"),
            Err(AnalysisParseError::Json(_))
        ));
    }

    #[test]
    fn headline_features_accept_both_prompt_schemes() {
        let analysis = FaceAnalysis::from_model_text(SAMPLE).unwrap();
        assert_eq!(
            analysis.headline_features(),
            vec!["둥근 이마".to_string(), "볼륨 있는 중안부".to_string()]
        );

        let classic = fixtures::oval_analysis();
        assert_eq!(
            classic.headline_features(),
            vec!["넓은 이마".to_string(), "부드러운 광대".to_string()]
        );
    }

    #[test]
    fn headline_features_fall_back_to_first_entries() {
        let mut analysis = fixtures::oval_analysis();
        analysis.face_features = Map::new();
        analysis
            .face_features
            .insert("jawline".into(), Value::String("각진 턱".into()));
        analysis
            .face_features
            .insert("eyes".into(), Value::String("큰 눈".into()));
        assert_eq!(
            analysis.headline_features(),
            vec!["각진 턱".to_string(), "큰 눈".to_string()]
        );
    }

    #[test]
    fn wire_names_survive_serialization() {
        let analysis = fixtures::oval_analysis();
        let value = serde_json::to_value(&analysis).unwrap();
        assert_eq!(value["faceType"], "계란형");
        assert_eq!(value["recommendations"][0]["match"], 98);
        assert!(value["recommendations"][0]["stylingTip"].is_string());
        assert!(value["recommendations"][0]["prompt"].is_string());
    }
}
