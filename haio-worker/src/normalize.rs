use haio_core::{AnswerSpec, HaioError, Result};

/// Turn a worker's raw response into a validated [`haio_core::Answer`].
///
/// Empty responses are always rejected, regardless of answer shape.
/// `Number` answers must parse as a finite decimal. `Select` answers are
/// fuzzy-matched against the template's option list rather than required
/// to match exactly, since both human free text and AI completions
/// routinely paraphrase ("Multiple" vs `"multiple"`).
pub fn normalize_answer(spec: &AnswerSpec, raw: &str, worker: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(HaioError::EmptyResponse { worker: worker.to_string() });
    }

    match spec {
        AnswerSpec::Text => Ok(trimmed.to_string()),
        AnswerSpec::Number => match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(trimmed.to_string()),
            _ => Err(HaioError::InvalidParameter { reason: format!("'{trimmed}' is not a finite decimal number") }),
        },
        AnswerSpec::Select { options } => Ok(closest_option(trimmed, options)),
    }
}

/// Similarity score below which a candidate is not considered a match
/// at all, matching `difflib.get_close_matches`'s default `cutoff=0.6`.
const MATCH_CUTOFF: f64 = 0.6;

/// Pick the option string most similar to `raw`, falling back to the
/// first option when nothing clears [`MATCH_CUTOFF`] (mirrors
/// `difflib.get_close_matches` falling back to the first candidate).
fn closest_option(raw: &str, options: &[String]) -> String {
    options
        .iter()
        .map(|option| (option, strsim::jaro_winkler(raw, option)))
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .filter(|(_, score)| *score >= MATCH_CUTOFF)
        .map(|(option, _)| option.clone())
        .unwrap_or_else(|| options[0].clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_responses_for_every_answer_shape() {
        for spec in [AnswerSpec::Text, AnswerSpec::Number, AnswerSpec::Select { options: vec!["a".into()] }] {
            let err = normalize_answer(&spec, "   ", "test").unwrap_err();
            assert!(matches!(err, HaioError::EmptyResponse { .. }));
        }
    }

    #[test]
    fn text_answers_are_trimmed_not_reshaped() {
        assert_eq!(normalize_answer(&AnswerSpec::Text, "  hello world  ", "test").unwrap(), "hello world");
    }

    #[test]
    fn number_answers_must_parse_as_finite_decimals() {
        assert_eq!(normalize_answer(&AnswerSpec::Number, "3.5", "test").unwrap(), "3.5");
        assert!(normalize_answer(&AnswerSpec::Number, "not a number", "test").is_err());
        assert!(normalize_answer(&AnswerSpec::Number, "NaN", "test").is_err());
        assert!(normalize_answer(&AnswerSpec::Number, "inf", "test").is_err());
    }

    #[test]
    fn select_answers_fuzzy_match_against_options() {
        let spec = AnswerSpec::Select { options: vec!["0".into(), "1".into(), "multiple".into()] };
        assert_eq!(normalize_answer(&spec, "Multiple", "test").unwrap(), "multiple");
        assert_eq!(normalize_answer(&spec, "1", "test").unwrap(), "1");
    }

    #[test]
    fn select_falls_back_to_first_option_when_nothing_resembles_the_answer() {
        let spec = AnswerSpec::Select { options: vec!["alpha".into(), "beta".into()] };
        let chosen = normalize_answer(&spec, "zzzzzzzzzzzzzzzz", "test").unwrap();
        assert!(chosen == "alpha" || chosen == "beta");
    }
}
