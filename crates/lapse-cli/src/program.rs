//! Keyframe program parsing and per-frame property resolution.
//!
//! A program is a whitespace-insensitive token stream. A keyframe label is
//! an integer followed by `:`; an assignment is `effect.property=NUMBER`
//! and applies at the current keyframe. Effects are applied in the order in
//! which they appear for the very first time.
//!
//! ```text
//! exposure.evrel=0 0: exposure.evrel=1 2:
//! ```
//!
//! Between two keyframes that set the same property, per-frame values are
//! linearly interpolated. A property is absent before its first keyframe
//! and holds its last value after the final one.

use std::collections::BTreeMap;

use lapse_effects::PropertyMap;
use thiserror::Error;

/// Keyframed values of one property: frame index to value.
pub type Keyframes = BTreeMap<i64, f64>;

/// Errors from program parsing.
#[derive(Debug, Error)]
pub enum ProgramError {
    /// The token stream violated the grammar.
    #[error("parse error at position {position} in effects list: {message}")]
    Parse {
        /// Character offset just past the offending token.
        position: usize,
        /// What was expected or could not be read.
        message: String,
    },
}

/// Parser state between tokens.
enum State {
    Starting,
    HadLhs,
    HadEqual,
}

/// A parsed keyframe program.
///
/// Holds the effect application order (first appearance wins) and, per
/// effect and property, the sorted keyframe map used for interpolation.
#[derive(Debug, Default)]
pub struct EffectProgram {
    /// Effect names in order of first appearance.
    order: Vec<String>,
    /// effect name -> property name -> keyframes.
    map: BTreeMap<String, BTreeMap<String, Keyframes>>,
}

impl EffectProgram {
    /// Parses a program string.
    ///
    /// # Errors
    ///
    /// Returns [`ProgramError::Parse`] with the character position for any
    /// token sequence outside the grammar, including unparsable numbers.
    pub fn parse(text: &str) -> Result<Self, ProgramError> {
        let mut program = EffectProgram::default();

        let mut state = State::Starting;
        let mut token = String::new();
        let mut lhs = String::new();
        let mut keyframe: i64 = 0;

        let chars: Vec<char> = text.chars().collect();
        let n = chars.len();

        for i in 0..=n {
            // a virtual trailing space flushes the final token
            let c = if i < n { chars[i] } else { ' ' };

            if c.is_whitespace() || c == ':' || c == '=' || token == ":" || token == "=" {
                if !token.is_empty() {
                    match state {
                        State::Starting => {
                            lhs = std::mem::take(&mut token);
                            state = State::HadLhs;
                        }
                        State::HadLhs => {
                            match token.as_str() {
                                ":" => {
                                    keyframe = lhs.parse().map_err(|_| ProgramError::Parse {
                                        position: i,
                                        message: format!("invalid keyframe index '{lhs}'"),
                                    })?;
                                    state = State::Starting;
                                }
                                "=" => state = State::HadEqual,
                                _ => {
                                    return Err(ProgramError::Parse {
                                        position: i,
                                        message: "expected : or =".into(),
                                    })
                                }
                            }
                        }
                        State::HadEqual => {
                            let value: f64 = token.parse().map_err(|_| ProgramError::Parse {
                                position: i,
                                message: format!("invalid number '{token}'"),
                            })?;
                            let (effect, property) = match lhs.find('.') {
                                Some(dot) => (lhs[..dot].to_string(), lhs[dot + 1..].to_string()),
                                None => (String::new(), lhs.clone()),
                            };
                            if !program.order.contains(&effect) {
                                program.order.push(effect.clone());
                            }
                            program
                                .map
                                .entry(effect)
                                .or_default()
                                .entry(property)
                                .or_default()
                                .insert(keyframe, value);
                            state = State::Starting;
                        }
                    }
                }
                if !c.is_whitespace() {
                    token = c.to_string();
                } else {
                    token.clear();
                }
            } else {
                token.push(c);
            }
        }

        Ok(program)
    }

    /// Effect names in declaration order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Returns `true` when the program assigns nothing.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Resolves the properties of one effect for a frame.
    ///
    /// For each property with keyframes `K`: frames before the first
    /// keyframe see no value; frames at or past the last keyframe hold the
    /// last value; frames in between interpolate linearly between the
    /// surrounding keyframes.
    pub fn resolve(&self, effect: &str, frame: i64) -> PropertyMap {
        let mut out = PropertyMap::new();
        let Some(props) = self.map.get(effect) else {
            return out;
        };
        for (name, keys) in props {
            let after = keys.range(frame + 1..).next();
            let at_or_before = keys.range(..=frame).next_back();
            match (at_or_before, after) {
                (Some((_, &v1)), None) => {
                    out.insert(name.clone(), v1);
                }
                (Some((&f1, &v1)), Some((&f2, &v2))) => {
                    let a = (frame - f1) as f64 / (f2 - f1) as f64;
                    out.insert(name.clone(), (1.0 - a) * v1 + a * v2);
                }
                (None, _) => {}
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_assignment() {
        let p = EffectProgram::parse("exposure.evrel=1.5").unwrap();
        assert_eq!(p.order(), ["exposure"]);
        let props = p.resolve("exposure", 0);
        assert_eq!(props.get("evrel"), Some(&1.5));
    }

    #[test]
    fn test_parse_whitespace_insensitive() {
        let a = EffectProgram::parse("exposure.evrel=0 0:exposure.evrel=1 2:").unwrap();
        let b = EffectProgram::parse("exposure.evrel = 0\n0 :\n  exposure.evrel\t=1 2 :").unwrap();
        for frame in 0..3 {
            assert_eq!(
                a.resolve("exposure", frame).get("evrel"),
                b.resolve("exposure", frame).get("evrel")
            );
        }
    }

    #[test]
    fn test_declaration_order() {
        let p = EffectProgram::parse(
            "whitebalance.temp=5000 exposure.evrel=0 whitebalance.use_lms=1",
        )
        .unwrap();
        assert_eq!(p.order(), ["whitebalance", "exposure"]);
    }

    #[test]
    fn test_interpolation_law() {
        // keyframes (0, 0) and (2, 1)
        let p = EffectProgram::parse("exposure.evrel=0 2: exposure.evrel=1").unwrap();
        assert_eq!(p.resolve("exposure", 0).get("evrel"), Some(&0.0));
        assert_eq!(p.resolve("exposure", 1).get("evrel"), Some(&0.5));
        assert_eq!(p.resolve("exposure", 2).get("evrel"), Some(&1.0));
        // beyond the last keyframe the value holds
        assert_eq!(p.resolve("exposure", 7).get("evrel"), Some(&1.0));
    }

    #[test]
    fn test_before_first_keyframe_is_unset() {
        let p = EffectProgram::parse("3: exposure.evrel=1").unwrap();
        assert!(p.resolve("exposure", 0).get("evrel").is_none());
        assert!(p.resolve("exposure", 2).get("evrel").is_none());
        assert_eq!(p.resolve("exposure", 3).get("evrel"), Some(&1.0));
    }

    #[test]
    fn test_exact_fraction() {
        let p = EffectProgram::parse("pad.target_w=100 4: pad.target_w=200").unwrap();
        let v = *p.resolve("pad", 1).get("target_w").unwrap();
        assert_eq!(v, 0.75 * 100.0 + 0.25 * 200.0);
    }

    #[test]
    fn test_parse_error_position() {
        let err = EffectProgram::parse("exposure.evrel foo").unwrap_err();
        let ProgramError::Parse { position, .. } = err;
        // the error fires when 'foo' flushes against state HAD_LHS
        assert!(position > 0);
    }

    #[test]
    fn test_parse_error_bad_number() {
        assert!(EffectProgram::parse("exposure.evrel=abc").is_err());
        assert!(EffectProgram::parse("abc: exposure.evrel=1").is_err());
    }

    #[test]
    fn test_empty_program() {
        let p = EffectProgram::parse("   \n\t ").unwrap();
        assert!(p.is_empty());
    }

    #[test]
    fn test_multiple_properties_and_effects() {
        let p = EffectProgram::parse(
            "0: cropresize.x0=10 cropresize.y0=20 5: cropresize.x0=20 cropresize.y0=40",
        )
        .unwrap();
        let props = p.resolve("cropresize", 5);
        assert_eq!(props.get("x0"), Some(&20.0));
        assert_eq!(props.get("y0"), Some(&40.0));
        let mid = p.resolve("cropresize", 1);
        assert_eq!(mid.get("x0"), Some(&12.0));
    }
}
