//! Value jitter
//!
//! Multiplies numeric fields by a factor drawn uniformly from
//! `[1 - pct, 1 + pct]`, one draw per field. Fields come from an explicit
//! list or are detected: JSON numbers and strings made of digits with at most
//! one decimal point. Jittered values are written back as JSON numbers.

use crate::error::ReplayError;
use crate::source::Row;
use rand::Rng;
use serde_json::{Number, Value};

pub const DEFAULT_JITTER_PERCENTAGE: f64 = 0.05;

#[derive(Debug, Clone)]
pub struct Jitter {
    percentage: f64,
    fields: Vec<String>,
    excluded: Vec<String>,
}

impl Jitter {
    /// `fields` empty means auto-detect
    pub fn new(percentage: f64, fields: Vec<String>) -> Result<Self, ReplayError> {
        if !(0.0..1.0).contains(&percentage) {
            return Err(ReplayError::InvalidJitter(percentage));
        }
        Ok(Self {
            percentage,
            fields,
            excluded: Vec::new(),
        })
    }

    /// Columns auto-detection never touches
    pub fn excluding<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    pub fn factor<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        1.0 + (rng.random::<f64>() * 2.0 - 1.0) * self.percentage
    }

    /// Jitter `row` in place. Returns how many fields changed.
    pub fn apply<R: Rng + ?Sized>(&self, row: &mut Row, rng: &mut R) -> usize {
        let targets: Vec<String> = if self.fields.is_empty() {
            row.iter()
                .filter(|(k, v)| !self.excluded.contains(k) && detect_numeric(v).is_some())
                .map(|(k, _)| k.clone())
                .collect()
        } else {
            self.fields.clone()
        };

        let mut changed = 0;
        for field in targets {
            let Some(slot) = row.get_mut(&field) else {
                continue;
            };
            let Some(value) = parse_numeric(slot) else {
                continue;
            };
            if let Some(n) = Number::from_f64(value * self.factor(rng)) {
                *slot = Value::Number(n);
                changed += 1;
            }
        }
        changed
    }
}

/// Digits with at most one '.', e.g. "12", "3.50", ".5"
fn looks_numeric(s: &str) -> bool {
    let mut digits = 0;
    let mut dots = 0;
    for c in s.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}

fn detect_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if looks_numeric(s) => s.parse().ok(),
        _ => None,
    }
}

/// Looser than detection: any string that parses as a finite float
fn parse_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_percentage_bounds() {
        assert!(Jitter::new(0.0, vec![]).is_ok());
        assert!(Jitter::new(0.99, vec![]).is_ok());
        assert!(matches!(
            Jitter::new(1.0, vec![]),
            Err(ReplayError::InvalidJitter(_))
        ));
        assert!(Jitter::new(-0.1, vec![]).is_err());
        assert!(Jitter::new(f64::NAN, vec![]).is_err());
    }

    #[test]
    fn test_factor_within_range() {
        let jitter = Jitter::new(0.1, vec![]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let f = jitter.factor(&mut rng);
            assert!((0.9..=1.1).contains(&f));
        }
    }

    #[test]
    fn test_auto_detect() {
        let jitter = Jitter::new(0.05, vec![]).unwrap().excluding(["timestamp"]);
        let mut rng = StdRng::seed_from_u64(4);
        let mut r = row(json!({
            "amount": "100",
            "bet": 20.0,
            "timestamp": "20240101",
            "game": "slots",
            "signed": "-5",
            "version": "1.2.3",
            "flag": true
        }));

        assert_eq!(jitter.apply(&mut r, &mut rng), 2);
        let amount = r["amount"].as_f64().unwrap();
        assert!((95.0..=105.0).contains(&amount));
        let bet = r["bet"].as_f64().unwrap();
        assert!((19.0..=21.0).contains(&bet));
        assert_eq!(r["timestamp"], "20240101");
        assert_eq!(r["signed"], "-5");
        assert_eq!(r["version"], "1.2.3");
        assert_eq!(r["flag"], true);
    }

    #[test]
    fn test_explicit_fields_only() {
        let jitter = Jitter::new(0.5, vec!["signed".into(), "missing".into(), "game".into()]).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let mut r = row(json!({"signed": "-10", "amount": "7", "game": "poker"}));

        assert_eq!(jitter.apply(&mut r, &mut rng), 1);
        let signed = r["signed"].as_f64().unwrap();
        assert!((-15.0..=-5.0).contains(&signed));
        assert_eq!(r["amount"], "7");
        assert_eq!(r["game"], "poker");
    }

    #[test]
    fn test_zero_percentage_keeps_values() {
        let jitter = Jitter::new(0.0, vec![]).unwrap();
        let mut rng = StdRng::seed_from_u64(6);
        let mut r = row(json!({"amount": "12.5"}));
        jitter.apply(&mut r, &mut rng);
        assert_eq!(r["amount"].as_f64(), Some(12.5));
    }

    #[test]
    fn test_looks_numeric() {
        assert!(looks_numeric("12"));
        assert!(looks_numeric("3.50"));
        assert!(looks_numeric(".5"));
        assert!(!looks_numeric("."));
        assert!(!looks_numeric(""));
        assert!(!looks_numeric("1e5"));
        assert!(!looks_numeric("1.2.3"));
    }
}
