use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{RecognizeError, RecognizeResult};

/// Class names, indexed by class id, in training order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelTable(Vec<String>);

impl LabelTable {
    pub fn new(labels: Vec<String>) -> LabelTable {
        LabelTable(labels)
    }

    /// One label per line. A trailing line terminator does not add an empty label.
    pub fn from_text(text: &str) -> LabelTable {
        text.lines().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, ix: usize) -> Option<&str> {
        self.0.get(ix).map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    /// Picks the most likely class of `probabilities`.
    ///
    /// The vector may be shorter than the table, but never longer. NaNs are skipped and the
    /// winner must be finite.
    pub fn resolve(&self, probabilities: &[f32]) -> RecognizeResult<ClassificationResult> {
        if probabilities.len() > self.len() {
            return Err(RecognizeError::IndexOutOfRange {
                index: probabilities.len() - 1,
                labels: self.len(),
            });
        }
        if probabilities.is_empty() {
            return Err(RecognizeError::NoClasses);
        }
        let best = argmax(probabilities).ok_or(RecognizeError::NonFiniteProbability(0))?;
        if !probabilities[best].is_finite() {
            return Err(RecognizeError::NonFiniteProbability(best));
        }
        let label = self
            .get(best)
            .ok_or(RecognizeError::IndexOutOfRange { index: best, labels: self.len() })?;
        let confidence = probabilities[best] * 100.0;
        Ok(ClassificationResult { label: label.to_string(), confidence })
    }
}

impl<S: Into<String>> FromIterator<S> for LabelTable {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> LabelTable {
        LabelTable(iter.into_iter().map(Into::into).collect())
    }
}

/// Index of the first maximum, ignoring NaNs. `None` if there is no number at all.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (ix, v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        if best.is_none_or(|b| *v > values[b]) {
            best = Some(ix);
        }
    }
    best
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: String,
    /// Probability of `label`, in percent.
    pub confidence: f32,
}

impl fmt::Display for ClassificationResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({:.2}% likely)", self.label, self.confidence)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::collection::vec;
    use proptest::prelude::*;

    fn animals() -> LabelTable {
        ["cat", "dog", "bird"].into_iter().collect()
    }

    #[test]
    fn picks_the_winner() {
        let found = animals().resolve(&[0.1, 0.7, 0.2]).unwrap();
        assert_eq!(found.label, "dog");
        assert_abs_diff_eq!(found.confidence, 70.0, epsilon = 1e-4);
    }

    #[test]
    fn ties_go_to_the_lowest_index() {
        let found = animals().resolve(&[0.5, 0.5, 0.0]).unwrap();
        assert_eq!(found.label, "cat");
        assert_abs_diff_eq!(found.confidence, 50.0, epsilon = 1e-4);
    }

    #[test]
    fn longer_vector_than_table() {
        let labels: LabelTable = ["cat", "dog"].into_iter().collect();
        let err = labels.resolve(&[0.2, 0.3, 0.5]).unwrap_err();
        assert!(matches!(err, RecognizeError::IndexOutOfRange { index: 2, labels: 2 }));
    }

    #[test]
    fn shorter_vector_than_table() {
        let found = animals().resolve(&[0.4, 0.6]).unwrap();
        assert_eq!(found.label, "dog");
    }

    #[test]
    fn empty_vector() {
        assert!(matches!(animals().resolve(&[]), Err(RecognizeError::NoClasses)));
    }

    #[test]
    fn nans_never_win() {
        assert_eq!(argmax(&[f32::NAN, 1.0]), Some(1));
        assert_eq!(argmax(&[0.5, f32::NAN, 1.0]), Some(2));
        assert_eq!(argmax(&[f32::NAN, f32::NAN]), None);
        let found = animals().resolve(&[f32::NAN, 0.3, 0.2]).unwrap();
        assert_eq!(found.label, "dog");
    }

    #[test]
    fn non_finite_winner() {
        let err = animals().resolve(&[f32::NAN, f32::NAN, f32::NAN]).unwrap_err();
        assert!(matches!(err, RecognizeError::NonFiniteProbability(0)), "{:?}", err);
        let err = animals().resolve(&[0.1, f32::INFINITY, 0.2]).unwrap_err();
        assert!(matches!(err, RecognizeError::NonFiniteProbability(1)), "{:?}", err);
    }

    #[test]
    fn from_text() {
        let table = LabelTable::from_text("dummy\nkit fox\r\nEnglish setter\n");
        assert_eq!(table.iter().collect::<Vec<_>>(), vec!["dummy", "kit fox", "English setter"]);
        assert!(LabelTable::from_text("").is_empty());
    }

    #[test]
    fn display() {
        let result = ClassificationResult { label: "tabby".into(), confidence: 81.234 };
        assert_eq!(result.to_string(), "tabby (81.23% likely)");
    }

    proptest! {
        #[test]
        fn argmax_is_the_first_maximum(p in vec(0f32..=1.0, 1..64)) {
            let best = argmax(&p).unwrap();
            prop_assert!(p.iter().all(|&v| p[best] >= v));
            prop_assert!(p[..best].iter().all(|&v| v < p[best]));
        }

        #[test]
        fn long_enough_tables_resolve(p in vec(0f32..=1.0, 1..32), extra in 0usize..4) {
            let labels: LabelTable = (0..p.len() + extra).map(|i| format!("class-{}", i)).collect();
            let found = labels.resolve(&p).unwrap();
            prop_assert!(found.confidence >= 0.0 && found.confidence <= 100.0);
            let best = argmax(&p).unwrap();
            prop_assert_eq!(found.label, format!("class-{}", best));
        }

        #[test]
        fn short_tables_fail(p in vec(0f32..=1.0, 2..32), missing in 1usize..32) {
            let len = p.len() - missing.min(p.len() - 1);
            let labels: LabelTable = (0..len).map(|i| i.to_string()).collect();
            let found = labels.resolve(&p);
            prop_assert!(
                matches!(found, Err(RecognizeError::IndexOutOfRange { .. })),
                "expected IndexOutOfRange, got {:?}",
                found
            );
        }
    }
}
