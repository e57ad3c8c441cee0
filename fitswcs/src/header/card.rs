use log::debug;

use super::KeywordMap;
use crate::error::{WcsError, WcsResult};

pub const CARD_SIZE: usize = 80;
const KEYWORD_SIZE: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum CardValue {
    Logical(bool),
    Integer(i64),
    Real(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCard {
    pub keyword: String,
    pub value: Option<CardValue>,
    pub comment: Option<String>,
}

impl HeaderCard {
    /// Parses one card image. Cards shorter than 80 columns are treated as
    /// blank-padded. Errors report the card as number 1; [`parse_header`]
    /// renumbers them by position.
    pub fn parse(card: &str) -> WcsResult<Self> {
        Self::parse_image(card).map_err(|message| WcsError::header_parse(1, message))
    }

    fn parse_image(card: &str) -> Result<Self, String> {
        if !card.is_ascii() {
            return Err("card contains non-ASCII characters".to_string());
        }
        if card.len() > CARD_SIZE {
            return Err(format!("card is {} columns long", card.len()));
        }

        let keyword = card[..card.len().min(KEYWORD_SIZE)].trim_end().to_string();
        validate_keyword(&keyword)?;

        let rest = card.get(KEYWORD_SIZE..).unwrap_or("");
        if !rest.starts_with("= ") || is_commentary(&keyword) {
            let comment = rest.trim();
            return Ok(Self {
                keyword,
                value: None,
                comment: (!comment.is_empty()).then(|| comment.to_string()),
            });
        }

        let (value, comment) = parse_value_field(&rest[2..])?;
        Ok(Self {
            keyword,
            value,
            comment,
        })
    }

    pub fn is_end(&self) -> bool {
        self.keyword == "END"
    }

    /// Splits a record-valued card (`DP1 = 'AXIS.1: 1'`) into its
    /// dotted keyword (`DP1.AXIS.1`) and numeric value. Only `DPj` and
    /// `D2IMj` cards are record-valued.
    pub fn record_value(&self) -> Option<(String, f64)> {
        if !is_record_keyword(&self.keyword) {
            return None;
        }
        let CardValue::String(text) = self.value.as_ref()? else {
            return None;
        };
        let (field, number) = text.split_once(':')?;
        let field = field.trim();
        let valid_field = !field.is_empty()
            && field
                .split('.')
                .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        if !valid_field {
            return None;
        }
        let number = parse_number(number.trim())?;
        let value = match number {
            CardValue::Integer(i) => i as f64,
            CardValue::Real(r) => r,
            _ => return None,
        };
        Some((format!("{}.{}", self.keyword, field), value))
    }
}

fn is_record_keyword(keyword: &str) -> bool {
    let axis = keyword
        .strip_prefix("D2IM")
        .or_else(|| keyword.strip_prefix("DP"));
    axis.is_some_and(|axis| !axis.is_empty() && axis.chars().all(|c| c.is_ascii_digit()))
}

fn is_commentary(keyword: &str) -> bool {
    matches!(keyword, "COMMENT" | "HISTORY" | "" | "CONTINUE")
}

fn validate_keyword(keyword: &str) -> Result<(), String> {
    let ok = keyword
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(format!("invalid keyword name '{}'", keyword))
    }
}

fn parse_value_field(field: &str) -> Result<(Option<CardValue>, Option<String>), String> {
    let trimmed = field.trim_start();

    if let Some(body) = trimmed.strip_prefix('\'') {
        let (text, remainder) = parse_quoted(body)?;
        let comment = remainder
            .trim_start()
            .strip_prefix('/')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        return Ok((Some(CardValue::String(text)), comment));
    }

    let (value_part, comment) = match trimmed.split_once('/') {
        Some((v, c)) => (v.trim(), Some(c.trim().to_string()).filter(|c| !c.is_empty())),
        None => (trimmed.trim(), None),
    };

    if value_part.is_empty() {
        return Ok((None, comment));
    }
    match value_part {
        "T" => return Ok((Some(CardValue::Logical(true)), comment)),
        "F" => return Ok((Some(CardValue::Logical(false)), comment)),
        _ => {}
    }
    if value_part.starts_with('(') {
        debug!("ignoring complex-valued card value {}", value_part);
        return Ok((None, comment));
    }

    parse_number(value_part)
        .map(|v| (Some(v), comment))
        .ok_or_else(|| format!("unparseable value '{}'", value_part))
}

fn parse_quoted(body: &str) -> Result<(String, &str), String> {
    let mut text = String::new();
    let mut chars = body.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '\'' {
            if let Some(&(_, '\'')) = chars.peek() {
                chars.next();
                text.push('\'');
                continue;
            }
            return Ok((text.trim_end().to_string(), &body[i + 1..]));
        }
        text.push(c);
    }
    Err("missing closing quote in string value".to_string())
}

fn parse_number(text: &str) -> Option<CardValue> {
    if let Ok(i) = text.parse::<i64>() {
        return Some(CardValue::Integer(i));
    }
    let normalized = text.replace(['D', 'd'], "E");
    normalized.parse::<f64>().ok().map(CardValue::Real)
}

fn split_cards(text: &str) -> Vec<&str> {
    if text.contains('\n') {
        text.lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty())
            .collect()
    } else {
        let mut cards = Vec::with_capacity(text.len() / CARD_SIZE + 1);
        let mut start = 0;
        while start < text.len() {
            let end = (start + CARD_SIZE).min(text.len());
            match text.get(start..end) {
                Some(card) => cards.push(card),
                None => {
                    // non-ASCII boundary; hand the remainder to the card parser to reject
                    cards.push(&text[start..]);
                    break;
                }
            }
            start = end;
        }
        cards
    }
}

/// Parses header text into a [`KeywordMap`].
///
/// Accepts either the raw FITS layout (a single run of 80-column cards) or
/// one card per line. Parsing stops at the `END` card. Record-valued cards
/// are stored under their dotted names, so repeated `DPj` cards do not
/// overwrite each other.
pub fn parse_header(text: &str) -> WcsResult<KeywordMap> {
    let mut map = KeywordMap::new();

    for (index, raw) in split_cards(text).into_iter().enumerate() {
        let line = raw.trim_end();
        let card =
            HeaderCard::parse_image(line).map_err(|msg| WcsError::header_parse(index + 1, msg))?;

        if card.is_end() {
            break;
        }
        if let Some((key, value)) = card.record_value() {
            map.set_float(key, value);
            continue;
        }
        if let Some(value) = card.value {
            map.set_value(card.keyword, value);
        }
    }

    Ok(map)
}
