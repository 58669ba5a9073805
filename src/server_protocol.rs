use serde_json::{Map, Value};

use crate::geometry::Vec2;
use crate::types::Difficulty;

#[derive(Debug, PartialEq)]
pub enum ParsedClientMessage {
    Start {
        difficulty: Option<Difficulty>,
        seed: Option<i64>,
        shift_minutes: Option<i64>,
        starting_balance: Option<i64>,
    },
    PickUp {
        point: Vec2,
    },
    Drag {
        point: Vec2,
    },
    Release {
        point: Vec2,
    },
    Deliver {
        point: Vec2,
    },
    Reject {
        slot: usize,
    },
    Rotate {
        delta: f32,
    },
    Spray,
    CallPolice,
    Search {
        keywords: Vec<String>,
    },
    Ping {
        t: f64,
    },
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "start" => {
            let difficulty = match object.get("difficulty") {
                None => None,
                Some(value) => Some(Difficulty::parse(value.as_str()?)?),
            };
            Some(ParsedClientMessage::Start {
                difficulty,
                seed: parse_optional_i64(object.get("seed"))?,
                shift_minutes: parse_optional_i64(object.get("shiftMinutes"))?,
                starting_balance: parse_optional_i64(object.get("startingBalance"))?,
            })
        }
        "pick_up" => Some(ParsedClientMessage::PickUp {
            point: parse_point(object)?,
        }),
        "drag" => Some(ParsedClientMessage::Drag {
            point: parse_point(object)?,
        }),
        "release" => Some(ParsedClientMessage::Release {
            point: parse_point(object)?,
        }),
        "deliver" => Some(ParsedClientMessage::Deliver {
            point: parse_point(object)?,
        }),
        "reject" => {
            let slot = object.get("slot")?.as_u64()?;
            Some(ParsedClientMessage::Reject {
                slot: usize::try_from(slot).ok()?,
            })
        }
        "rotate" => Some(ParsedClientMessage::Rotate {
            delta: parse_finite(object.get("delta")?)?,
        }),
        "spray" => Some(ParsedClientMessage::Spray),
        "call_police" => Some(ParsedClientMessage::CallPolice),
        "search" => {
            let query = object.get("query")?.as_str()?;
            let keywords: Vec<String> = query
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|word| !word.is_empty())
                .map(str::to_string)
                .collect();
            Some(ParsedClientMessage::Search { keywords })
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

fn parse_point(object: &Map<String, Value>) -> Option<Vec2> {
    let x = parse_finite(object.get("x")?)?;
    let y = parse_finite(object.get("y")?)?;
    Some(Vec2::new(x, y))
}

fn parse_finite(value: &Value) -> Option<f32> {
    let number = value.as_f64()? as f32;
    number.is_finite().then_some(number)
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
    fn parse_start_message() {
        let parsed = parse_client_message(
            r#"{"type":"start","difficulty":"hard","seed":42,"shiftMinutes":2}"#,
        )
        .expect("start message should parse");
        assert_eq!(
            parsed,
            ParsedClientMessage::Start {
                difficulty: Some(Difficulty::Hard),
                seed: Some(42),
                shift_minutes: Some(2),
                starting_balance: None,
            }
        );
    }

    #[test]
    fn parse_start_rejects_unknown_difficulty() {
        assert!(parse_client_message(r#"{"type":"start","difficulty":"brutal"}"#).is_none());
    }

    #[test]
    fn parse_pointer_messages() {
        let parsed = parse_client_message(r#"{"type":"pick_up","x":120.5,"y":400}"#);
        assert_eq!(
            parsed,
            Some(ParsedClientMessage::PickUp {
                point: Vec2::new(120.5, 400.0)
            })
        );
        assert!(matches!(
            parse_client_message(r#"{"type":"release","x":1,"y":2}"#),
            Some(ParsedClientMessage::Release { .. })
        ));
        assert!(parse_client_message(r#"{"type":"deliver","x":1}"#).is_none());
        assert!(parse_client_message(r#"{"type":"drag","x":"1","y":2}"#).is_none());
    }

    #[test]
    fn parse_reject_requires_non_negative_slot() {
        assert_eq!(
            parse_client_message(r#"{"type":"reject","slot":2}"#),
            Some(ParsedClientMessage::Reject { slot: 2 })
        );
        assert!(parse_client_message(r#"{"type":"reject","slot":-1}"#).is_none());
        assert!(parse_client_message(r#"{"type":"reject"}"#).is_none());
    }

    #[test]
    fn parse_search_splits_query_into_keywords() {
        let parsed = parse_client_message(r#"{"type":"search","query":" blue, school  read"}"#);
        assert_eq!(
            parsed,
            Some(ParsedClientMessage::Search {
                keywords: vec!["blue".to_string(), "school".to_string(), "read".to_string()]
            })
        );
    }

    #[test]
    fn parse_bare_actions() {
        assert_eq!(
            parse_client_message(r#"{"type":"spray"}"#),
            Some(ParsedClientMessage::Spray)
        );
        assert_eq!(
            parse_client_message(r#"{"type":"call_police"}"#),
            Some(ParsedClientMessage::CallPolice)
        );
        assert!(parse_client_message(r#"{"type":"teleport"}"#).is_none());
        assert!(parse_client_message("not json").is_none());
    }

    #[test]
    fn parse_start_floors_float_values() {
        let parsed =
            parse_client_message(r#"{"type":"start","shiftMinutes":2.7,"startingBalance":-1.5}"#);
        assert!(matches!(
            parsed,
            Some(ParsedClientMessage::Start {
                shift_minutes: Some(2),
                starting_balance: Some(-2),
                ..
            })
        ));
        assert!(parse_client_message(r#"{"type":"start","seed":1e100}"#).is_none());
    }
}
