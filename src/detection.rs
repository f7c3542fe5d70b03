use serde::{Deserialize, Serialize};

/// Class name the detector uses for "nothing here".
pub const BACKGROUND_CLASS: &str = "background";

// ── Data Model ──────────────────────────────────────────────────────────────

/// Region in the image's natural pixel space.
///
/// On the wire this is `[top, left, height, width]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub top: f64,
    pub left: f64,
    pub height: f64,
    pub width: f64,
}

impl From<[f64; 4]> for BoundingBox {
    fn from(v: [f64; 4]) -> Self {
        Self {
            top: v[0],
            left: v[1],
            height: v[2],
            width: v[3],
        }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.top, b.left, b.height, b.width]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub bbox: BoundingBox,
    #[serde(rename = "class")]
    pub class_name: String,
    pub score: f64,
    /// Passed through as sent; any JSON number form is accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<serde_json::Value>,
}

impl Prediction {
    pub fn is_background(&self) -> bool {
        self.class_name == BACKGROUND_CLASS
    }

    /// `"<class> <score>"`, score rounded to two decimals and printed in its
    /// shortest form (`0.9`, not `0.90`).
    pub fn label(&self) -> String {
        format!("{} {}", self.class_name, round2(self.score))
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub predictions: Vec<Prediction>,
}

impl DetectionResult {
    /// Predictions that should be drawn.
    pub fn detections(&self) -> impl Iterator<Item = &Prediction> {
        self.predictions.iter().filter(|p| !p.is_background())
    }

    pub fn background_count(&self) -> usize {
        self.predictions.iter().filter(|p| p.is_background()).count()
    }

    /// Compact JSON, as shown in the result label.
    pub fn summary(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

/// Body returned by `POST /analyze`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub result: DetectionResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(class_name: &str, score: f64) -> Prediction {
        Prediction {
            bbox: BoundingBox::from([0.0, 0.0, 1.0, 1.0]),
            class_name: class_name.to_string(),
            score,
            class_id: None,
        }
    }

    #[test]
    fn parses_server_response() {
        let body = r#"{"result":{"predictions":[
            {"bbox":[10,20,30,40],"class_id":3,"class":"dog","score":0.91}
        ]}}"#;
        let response: AnalyzeResponse = serde_json::from_str(body).unwrap();
        let p = &response.result.predictions[0];
        assert_eq!(
            p.bbox,
            BoundingBox {
                top: 10.0,
                left: 20.0,
                height: 30.0,
                width: 40.0
            }
        );
        assert_eq!(p.class_name, "dog");
        assert_eq!(p.class_id, Some(serde_json::json!(3)));
        assert_eq!(p.score, 0.91);
    }

    #[test]
    fn class_id_is_optional() {
        let body = r#"{"bbox":[1,2,3,4],"class":"cat","score":0.5}"#;
        let p: Prediction = serde_json::from_str(body).unwrap();
        assert_eq!(p.class_id, None);
    }

    #[test]
    fn loose_class_id_does_not_reject_response() {
        for class_id in ["3.0", "-1", "null", "\"7\""] {
            let body = format!(
                r#"{{"result":{{"predictions":[{{"bbox":[1,2,3,4],"class":"cat","score":0.5,"class_id":{}}}]}}}}"#,
                class_id
            );
            let response: AnalyzeResponse = serde_json::from_str(&body).unwrap();
            assert_eq!(response.result.predictions[0].class_name, "cat");
        }
    }

    #[test]
    fn missing_result_is_rejected() {
        let body = r#"{"predictions":[]}"#;
        assert!(serde_json::from_str::<AnalyzeResponse>(body).is_err());
    }

    #[test]
    fn short_bbox_is_rejected() {
        let body = r#"{"bbox":[1,2,3],"class":"cat","score":0.5}"#;
        assert!(serde_json::from_str::<Prediction>(body).is_err());
    }

    #[test]
    fn label_rounds_to_two_decimals() {
        assert_eq!(prediction("cat", 0.8567).label(), "cat 0.86");
        assert_eq!(prediction("dog", 0.91).label(), "dog 0.91");
        assert_eq!(prediction("dog", 0.9).label(), "dog 0.9");
        assert_eq!(prediction("dog", 1.0).label(), "dog 1");
        assert_eq!(prediction("bird", 0.125).label(), "bird 0.13");
    }

    #[test]
    fn background_is_filtered() {
        let result = DetectionResult {
            predictions: vec![
                prediction("background", 0.99),
                prediction("cat", 0.7),
                prediction("background", 0.4),
            ],
        };
        let kept: Vec<_> = result.detections().map(|p| p.class_name.as_str()).collect();
        assert_eq!(kept, vec!["cat"]);
        assert_eq!(result.background_count(), 2);
    }

    #[test]
    fn summary_is_compact_json() {
        let result = DetectionResult {
            predictions: vec![prediction("cat", 0.5)],
        };
        assert_eq!(
            result.summary(),
            r#"{"predictions":[{"bbox":[0.0,0.0,1.0,1.0],"class":"cat","score":0.5}]}"#
        );
    }
}
