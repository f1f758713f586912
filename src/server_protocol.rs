use serde_json::Value;

use crate::types::Direction;

#[derive(Debug)]
pub enum ParsedClientMessage {
    /// Starts (or restarts) a round on the given level.
    Hello { level_id: Option<i64> },
    /// A directional key went down. `dir` omitted means a non-directional key.
    Input { dir: Option<Direction> },
    Ping { t: f64 },
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "hello" => {
            let level_id = parse_optional_i64(object.get("levelId"))?;
            Some(ParsedClientMessage::Hello { level_id })
        }
        "input" => {
            let dir = match object.get("dir") {
                None => None,
                Some(value) => Direction::parse_move(value.as_str()?),
            };
            if object.get("dir").is_some() && dir.is_none() {
                return None;
            }
            Some(ParsedClientMessage::Input { dir })
        }
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Ping { t })
        }
        _ => None,
    }
}

/// Clamps a requested level id into the supported range, defaulting when
/// absent.
pub fn normalize_level_id(value: Option<i64>, default_level: u32) -> u32 {
    match value {
        None => default_level,
        Some(level) => level.clamp(1, 999) as u32,
    }
}

pub fn parse_level_query(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
}

fn parse_optional_i64(value: Option<&Value>) -> Option<Option<i64>> {
    const MAX_SAFE_INTEGER_F64: f64 = 9_007_199_254_740_991.0;

    let Some(value) = value else {
        return Some(None);
    };
    if let Some(number) = value.as_i64() {
        return Some(Some(number));
    }
    if let Some(number) = value.as_u64() {
        return i64::try_from(number).ok().map(Some);
    }
    if let Some(number) = value.as_f64() {
        if number.is_finite() {
            let floored = number.floor();
            if floored.abs() > MAX_SAFE_INTEGER_F64 {
                return None;
            }
            return Some(Some(floored as i64));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hello_with_and_without_level() {
        assert!(matches!(
            parse_client_message(r#"{"type":"hello"}"#),
            Some(ParsedClientMessage::Hello { level_id: None })
        ));
        assert!(matches!(
            parse_client_message(r#"{"type":"hello","levelId":2.7}"#),
            Some(ParsedClientMessage::Hello { level_id: Some(2) })
        ));
        assert!(parse_client_message(r#"{"type":"hello","levelId":"two"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"hello","levelId":1e100}"#).is_none());
    }

    #[test]
    fn parse_input_rejects_invalid_direction() {
        let parsed = parse_client_message(r#"{"type":"input","dir":"invalid"}"#);
        assert!(parsed.is_none());
    }

    #[test]
    fn parse_input_accepts_direction_and_bare_key() {
        assert!(matches!(
            parse_client_message(r#"{"type":"input","dir":"left"}"#),
            Some(ParsedClientMessage::Input {
                dir: Some(Direction::Left)
            })
        ));
        assert!(matches!(
            parse_client_message(r#"{"type":"input"}"#),
            Some(ParsedClientMessage::Input { dir: None })
        ));
    }

    #[test]
    fn parse_ping_requires_finite_number() {
        let parsed = parse_client_message(r#"{"type":"ping","t":12.5}"#);
        assert!(matches!(parsed, Some(ParsedClientMessage::Ping { .. })));
        assert!(parse_client_message(r#"{"type":"ping","t":"soon"}"#).is_none());
    }

    #[test]
    fn unknown_or_malformed_messages_are_ignored() {
        assert!(parse_client_message("not json").is_none());
        assert!(parse_client_message(r#"{"type":"lobby_start"}"#).is_none());
        assert!(parse_client_message(r#"["input"]"#).is_none());
    }

    #[test]
    fn level_id_normalization() {
        assert_eq!(normalize_level_id(None, 1), 1);
        assert_eq!(normalize_level_id(Some(-4), 1), 1);
        assert_eq!(normalize_level_id(Some(3), 1), 3);
        assert_eq!(normalize_level_id(Some(50_000), 1), 999);
        assert_eq!(parse_level_query(Some(" 2 ")), Some(2));
        assert_eq!(parse_level_query(Some("x")), None);
        assert_eq!(parse_level_query(None), None);
    }
}
