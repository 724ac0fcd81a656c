use serde_json::Value;

use crate::api::models::{DetectionBox, DetectionResponse};
use crate::core::detection::DetectError;
use log::debug;

/// 两个版本的服务分别用 `classname` 与 `detected_name` 返回类别
const LABEL_KEYS: [&str; 2] = ["classname", "detected_name"];
const COORD_KEYS: [&str; 4] = ["x1", "y1", "x2", "y2"];

/// 解析检测服务返回的 JSON
///
/// `code != 0` 视为服务不可用；`infos` 中字段缺失或数值非法的条目被丢弃并计数。
pub fn parse_response(body: &str) -> Result<DetectionResponse, DetectError> {
    let value: Value = serde_json::from_str(body)?;
    build_response(&value)
}

/// 兼容整数与浮点写法（`0` / `0.0`）
fn status_code(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.is_finite())
            .map(|f| f as i64)
    })
}

pub fn build_response(value: &Value) -> Result<DetectionResponse, DetectError> {
    let code = value
        .get("code")
        .and_then(status_code)
        .ok_or_else(|| DetectError::ServiceUnavailable("response has no status code".into()))?;

    let message = value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string);

    if code != 0 {
        return Err(DetectError::ServiceUnavailable(format!(
            "code {}: {}",
            code,
            message.as_deref().unwrap_or("error unknown")
        )));
    }

    let infos = value
        .get("infos")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut detections = Vec::with_capacity(infos.len());
    let mut dropped = 0;
    for (i, info) in infos.iter().enumerate() {
        match parse_entry(info) {
            Ok(b) => detections.push(b),
            Err(e) => {
                debug!("⚠️ drop detection #{}: {}", i, e);
                dropped += 1;
            }
        }
    }

    Ok(DetectionResponse {
        code,
        message,
        detections,
        dropped,
    })
}

fn parse_entry(info: &Value) -> Result<DetectionBox, DetectError> {
    let label = LABEL_KEYS
        .iter()
        .find_map(|k| info.get(*k).and_then(Value::as_str))
        .ok_or_else(|| DetectError::MalformedDetection("missing label".into()))?;

    let confidence = number(info, "confidence")?;

    let mut coords = [0f32; 4];
    for (slot, key) in coords.iter_mut().zip(COORD_KEYS) {
        *slot = number(info, key)?;
    }
    let [x1, y1, x2, y2] = coords;

    DetectionBox::new(x1, y1, x2, y2, label, confidence)
        .sanitized()
        .ok_or_else(|| {
            DetectError::MalformedDetection(format!(
                "invalid box ({}, {}, {}, {}) confidence {}",
                x1, y1, x2, y2, confidence
            ))
        })
}

fn number(info: &Value, key: &str) -> Result<f32, DetectError> {
    info.get(key)
        .and_then(Value::as_f64)
        .map(|v| v as f32)
        .ok_or_else(|| DetectError::MalformedDetection(format!("missing or non-numeric `{}`", key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success_with_both_label_keys() {
        let body = r#"{
            "code": 0,
            "infos": [
                {"classname": "aedes", "confidence": 0.92, "x1": 10, "y1": 20, "x2": 40, "y2": 60},
                {"detected_name": "culex", "confidence": 0.5, "x1": 1.5, "y1": 2, "x2": 3, "y2": 4}
            ]
        }"#;

        let response = parse_response(body).unwrap();
        assert_eq!(response.code, 0);
        assert_eq!(response.dropped, 0);
        assert_eq!(response.detections.len(), 2);
        assert_eq!(response.detections[0].label, "aedes");
        assert_eq!(response.detections[0].x2, 40.0);
        assert_eq!(response.detections[1].label, "culex");
        assert_eq!(response.detections[1].x1, 1.5);
    }

    #[test]
    fn test_missing_fields_drop_entry() {
        let body = r#"{
            "code": 0,
            "infos": [
                {"classname": "aedes", "confidence": 0.9, "x1": 0, "y1": 0, "x2": 5},
                {"classname": "aedes", "x1": 0, "y1": 0, "x2": 5, "y2": 5},
                {"confidence": 0.9, "x1": 0, "y1": 0, "x2": 5, "y2": 5},
                {"classname": "aedes", "confidence": "high", "x1": 0, "y1": 0, "x2": 5, "y2": 5},
                {"classname": "aedes", "confidence": 0.9, "x1": 9, "y1": 0, "x2": 5, "y2": 5},
                {"classname": "culex", "confidence": 0.7, "x1": 0, "y1": 0, "x2": 5, "y2": 5}
            ]
        }"#;

        let response = parse_response(body).unwrap();
        assert_eq!(response.dropped, 5);
        assert_eq!(response.detections.len(), 1);
        assert_eq!(response.detections[0].label, "culex");
    }

    #[test]
    fn test_missing_infos_is_empty() {
        let response = parse_response(r#"{"code": 0}"#).unwrap();
        assert!(response.detections.is_empty());
    }

    #[test]
    fn test_error_code_is_service_unavailable() {
        let err = parse_response(r#"{"code": 3, "message": "quota exceeded"}"#).unwrap_err();
        match err {
            DetectError::ServiceUnavailable(msg) => assert!(msg.contains("quota exceeded")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_float_zero_code_is_success() {
        let response = parse_response(
            r#"{"code": 0.0, "infos": [{"detected_name": "culex", "confidence": 0.7, "x1": 0, "y1": 0, "x2": 5, "y2": 5}]}"#,
        )
        .unwrap();
        assert_eq!(response.code, 0);
        assert_eq!(response.detections.len(), 1);

        let err = parse_response(r#"{"code": 1.0}"#).unwrap_err();
        assert!(matches!(err, DetectError::ServiceUnavailable(_)));
    }

    #[test]
    fn test_missing_code_is_service_unavailable() {
        let err = parse_response(r#"{"infos": []}"#).unwrap_err();
        assert!(matches!(err, DetectError::ServiceUnavailable(_)));
    }

    #[test]
    fn test_invalid_json() {
        let err = parse_response("<html>502</html>").unwrap_err();
        assert!(matches!(err, DetectError::Json(_)));
    }
}
