//! 페이로드 새니타이저.
//!
//! 폼 필드/속성에서 비밀번호, 주민번호(SSN), 카드 번호류 키를 찾아
//! 값을 고정 마커로 바꾼다. 키는 camelCase와 `_`, `-`, `.`, 공백 경계로 단어를 나눠
//! 단어 단위로 비교하므로 `businessName`, `secretary` 같은 키는 건드리지 않는다. 중첩 객체/배열도 재귀적으로 처리한다.
//! 이미 새니타이즈된 페이로드를 다시 처리해도 결과가 같다.

use beacon_core::config::PrivacyConfig;
use beacon_core::models::event::EventDetail;
use beacon_core::models::record::Attributes;
use serde_json::Value;

/// 민감 필드 키워드 (정규화된 형태: 소문자, 구분자 제거)
///
/// 키의 연속된 단어 묶음을 이어 붙인 값이 키워드와 같으면 민감 키로 본다.
pub const SENSITIVE_FIELD_KEYWORDS: &[&str] = &[
    // 비밀번호
    "password",
    "passwd",
    "pwd",
    "passcode",
    "secret",
    // 주민/사회보장 번호
    "ssn",
    "socialsecurity",
    // 카드
    "creditcard",
    "cardnumber",
    "ccnumber",
    "cvv",
    "cvc",
];

/// 키 정규화: 단어를 소문자로 이어 붙임
fn normalize_key(key: &str) -> String {
    key_words(key).concat()
}

/// 키를 소문자 단어로 분리 (camelCase 경계, 영숫자가 아닌 문자)
fn key_words(key: &str) -> Vec<String> {
    let chars: Vec<char> = key.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            // `userName` 또는 `SSNValue`의 V
            if prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// 값이 카드 번호처럼 보이는지 (구분자 제외 13~19자리 숫자)
fn looks_like_card_number(value: &str) -> bool {
    let mut digits = 0;
    for c in value.chars() {
        match c {
            '0'..='9' => digits += 1,
            ' ' | '-' => {}
            _ => return false,
        }
    }
    (13..=19).contains(&digits)
}

/// 민감 키 마스킹기
#[derive(Debug, Clone)]
pub struct Sanitizer {
    marker: String,
    keywords: Vec<String>,
}

impl Sanitizer {
    /// 마커와 추가 키워드로 생성 (추가 키워드도 정규화됨)
    pub fn new(marker: impl Into<String>, extra_keys: &[String]) -> Self {
        let mut keywords: Vec<String> = SENSITIVE_FIELD_KEYWORDS
            .iter()
            .map(|kw| kw.to_string())
            .collect();
        keywords.extend(
            extra_keys
                .iter()
                .map(|k| normalize_key(k))
                .filter(|k| !k.is_empty()),
        );
        Self {
            marker: marker.into(),
            keywords,
        }
    }

    pub fn from_config(config: &PrivacyConfig) -> Self {
        Self::new(config.redaction_marker.clone(), &config.extra_sensitive_keys)
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// 키가 민감 필드인지 (대소문자/구분자 무시, 단어 단위 일치)
    pub fn is_sensitive_key(&self, key: &str) -> bool {
        let words = key_words(key);
        (0..words.len()).any(|start| {
            let mut joined = String::new();
            words[start..].iter().any(|word| {
                joined.push_str(word);
                self.keywords.iter().any(|kw| *kw == joined)
            })
        })
    }

    /// JSON 값 새니타이즈
    pub fn sanitize_value(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, inner)| {
                        let cleaned = if self.is_sensitive_key(key) {
                            Value::String(self.marker.clone())
                        } else {
                            self.sanitize_value(inner)
                        };
                        (key.clone(), cleaned)
                    })
                    .collect(),
            ),
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.sanitize_value(item)).collect())
            }
            Value::String(s) if looks_like_card_number(s) => Value::String(self.marker.clone()),
            other => other.clone(),
        }
    }

    /// 속성 맵 새니타이즈
    pub fn sanitize_attributes(&self, attributes: &Attributes) -> Attributes {
        attributes
            .iter()
            .map(|(key, value)| {
                let cleaned = if self.is_sensitive_key(key) {
                    Value::String(self.marker.clone())
                } else {
                    self.sanitize_value(value)
                };
                (key.clone(), cleaned)
            })
            .collect()
    }

    /// 이벤트 상세의 자유 형식 속성 새니타이즈
    pub fn sanitize_event(&self, detail: EventDetail) -> EventDetail {
        match detail {
            EventDetail::FormSubmit {
                form,
                fields,
                success,
            } => EventDetail::FormSubmit {
                form,
                fields: self.sanitize_attributes(&fields),
                success,
            },
            EventDetail::UserAction {
                action,
                target,
                attributes,
            } => EventDetail::UserAction {
                action,
                target,
                attributes: self.sanitize_attributes(&attributes),
            },
            EventDetail::FeatureUsage {
                feature,
                attributes,
            } => EventDetail::FeatureUsage {
                feature,
                attributes: self.sanitize_attributes(&attributes),
            },
            other => other,
        }
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::from_config(&PrivacyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn password_field_is_replaced_by_marker() {
        let sanitizer = Sanitizer::default();
        let fields = attrs(json!({ "email": "kim@example.com", "password": "hunter2" }));

        let cleaned = sanitizer.sanitize_attributes(&fields);
        assert_eq!(cleaned["password"], json!("[REDACTED]"));
        assert_eq!(cleaned["email"], json!("kim@example.com"));
        assert!(!serde_json::to_string(&cleaned).unwrap().contains("hunter2"));
    }

    #[test]
    fn key_matching_ignores_case_and_separators() {
        let sanitizer = Sanitizer::default();
        assert!(sanitizer.is_sensitive_key("Password"));
        assert!(sanitizer.is_sensitive_key("confirm_password"));
        assert!(sanitizer.is_sensitive_key("credit-card"));
        assert!(sanitizer.is_sensitive_key("Card Number"));
        assert!(sanitizer.is_sensitive_key("user.SSN"));
        assert!(sanitizer.is_sensitive_key("CVV"));
        assert!(!sanitizer.is_sensitive_key("username"));
        assert!(!sanitizer.is_sensitive_key("company"));
    }

    #[test]
    fn keywords_inside_other_words_are_kept() {
        let sanitizer = Sanitizer::default();
        for key in ["businessName", "className", "secretary", "accessNumber", "passage"] {
            assert!(!sanitizer.is_sensitive_key(key), "{key}");
        }
        for key in ["password", "user_password", "creditCardNumber", "SSN", "newPasswordConfirm"] {
            assert!(sanitizer.is_sensitive_key(key), "{key}");
        }

        let fields = attrs(json!({
            "businessName": "Acme",
            "className": "btn-primary",
            "creditCardNumber": "4111"
        }));
        let cleaned = sanitizer.sanitize_attributes(&fields);
        assert_eq!(cleaned["businessName"], json!("Acme"));
        assert_eq!(cleaned["className"], json!("btn-primary"));
        assert_eq!(cleaned["creditCardNumber"], json!("[REDACTED]"));
    }

    #[test]
    fn key_words_split_on_case_and_separators() {
        assert_eq!(key_words("creditCardNumber"), ["credit", "card", "number"]);
        assert_eq!(key_words("SSNValue"), ["ssn", "value"]);
        assert_eq!(key_words("user.pass-code"), ["user", "pass", "code"]);
        assert_eq!(normalize_key("API-Token"), "apitoken");
    }

    #[test]
    fn nested_objects_and_arrays_are_sanitized() {
        let sanitizer = Sanitizer::default();
        let fields = attrs(json!({
            "billing": { "name": "Lee", "cardNumber": "4111 1111 1111 1111", "cvc": 123 },
            "contacts": [ { "phone": "010-0000-0000", "secret": "x" } ],
            "note": "4111-1111-1111-1111"
        }));

        let cleaned = sanitizer.sanitize_attributes(&fields);
        assert_eq!(cleaned["billing"]["name"], json!("Lee"));
        assert_eq!(cleaned["billing"]["cardNumber"], json!("[REDACTED]"));
        assert_eq!(cleaned["billing"]["cvc"], json!("[REDACTED]"));
        assert_eq!(cleaned["contacts"][0]["phone"], json!("010-0000-0000"));
        assert_eq!(cleaned["contacts"][0]["secret"], json!("[REDACTED]"));
        // 키가 평범해도 카드 번호 형태의 값은 마스킹
        assert_eq!(cleaned["note"], json!("[REDACTED]"));
    }

    #[test]
    fn sanitizing_twice_is_identical() {
        let sanitizer = Sanitizer::default();
        let fields = attrs(json!({
            "password": "pw",
            "profile": { "ssn": "123-45-6789", "city": "Seoul" },
            "tags": ["a", "b"]
        }));

        let once = sanitizer.sanitize_attributes(&fields);
        let twice = sanitizer.sanitize_attributes(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn extra_keys_and_custom_marker() {
        let sanitizer = Sanitizer::new("***", &["api_token".to_string()]);
        let fields = attrs(json!({ "API-Token": "abc", "plan": "pro" }));

        let cleaned = sanitizer.sanitize_attributes(&fields);
        assert_eq!(cleaned["API-Token"], json!("***"));
        assert_eq!(cleaned["plan"], json!("pro"));
        assert_eq!(sanitizer.marker(), "***");
    }

    #[test]
    fn form_submit_detail_is_sanitized() {
        let sanitizer = Sanitizer::default();
        let detail = EventDetail::FormSubmit {
            form: "signup".to_string(),
            fields: attrs(json!({ "password": "pw", "plan": "free" })),
            success: true,
        };

        match sanitizer.sanitize_event(detail) {
            EventDetail::FormSubmit { fields, .. } => {
                assert_eq!(fields["password"], json!("[REDACTED]"));
                assert_eq!(fields["plan"], json!("free"));
            }
            other => panic!("unexpected detail: {other:?}"),
        }
    }
}
