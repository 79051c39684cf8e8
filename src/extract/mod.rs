use regex::Regex;

use crate::error::BenchmarkError;

/// Pulls the elapsed-seconds measurement out of the benchmark's raw output.
///
/// The external program's output contract is a single line of the form
/// `Time: <seconds> s`; everything else it prints is opaque and ignored.
/// The matching rule lives here so it can be swapped out (e.g. for a
/// structured output format) without touching the aggregator.
pub struct DurationExtractor {
    pattern: Regex,
}

impl DurationExtractor {
    pub fn new() -> Self {
        DurationExtractor {
            pattern: Regex::new(r"Time:\s*([0-9.]+)\s*s").unwrap(),
        }
    }

    /// Returns the first duration found anywhere in the text.
    pub fn extract(&self, output: &str) -> Result<f64, BenchmarkError> {
        let caps = self.pattern.captures(output).ok_or_else(|| {
            BenchmarkError::Extraction(
                "no 'Time: <seconds> s' line in benchmark output".to_string(),
            )
        })?;
        caps[1].parse::<f64>().map_err(|e| {
            BenchmarkError::Extraction(format!("unparseable duration '{}': {}", &caps[1], e))
        })
    }
}

impl Default for DurationExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_duration_from_noisy_output() {
        let extractor = DurationExtractor::new();
        let output = "Initializing matrices...\nTime: 0.123456 s\nDone.\n";
        assert_eq!(extractor.extract(output).unwrap(), 0.123456);
    }

    #[test]
    fn tolerates_missing_whitespace_after_colon() {
        let extractor = DurationExtractor::new();
        assert_eq!(extractor.extract("Time:0.5 s").unwrap(), 0.5);
    }

    #[test]
    fn first_match_wins() {
        let extractor = DurationExtractor::new();
        let output = "Time: 1.5 s\nTime: 2.5 s\n";
        assert_eq!(extractor.extract(output).unwrap(), 1.5);
    }

    #[test]
    fn missing_pattern_is_an_error() {
        let extractor = DurationExtractor::new();
        assert!(matches!(
            extractor.extract("no timing here"),
            Err(BenchmarkError::Extraction(_))
        ));
    }

    #[test]
    fn malformed_capture_is_an_error() {
        let extractor = DurationExtractor::new();
        // "..." matches the character class but is not a number.
        assert!(matches!(
            extractor.extract("Time: ... s"),
            Err(BenchmarkError::Extraction(_))
        ));
    }
}
