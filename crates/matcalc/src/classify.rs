//! Assignment vs. plain-expression classification of raw entry text.

/// How a piece of raw entry text reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    /// The expression (plain mode) or the assigned variable name.
    pub lhs: String,
    /// Right-hand side text, present only for assignments.
    pub rhs_text: Option<String>,
    pub is_assignment: bool,
}

impl Classification {
    fn plain(text: &str) -> Self {
        Self {
            lhs: text.to_owned(),
            rhs_text: None,
            is_assignment: false,
        }
    }

    /// True when an assignment mentions its own name on the right-hand side.
    ///
    /// This is a textual check: `x = x_old` counts as self-referential, and a
    /// cycle through another variable does not.
    pub fn is_self_referential(&self) -> bool {
        match &self.rhs_text {
            Some(rhs) if self.is_assignment => rhs.contains(self.lhs.as_str()),
            _ => false,
        }
    }

    /// The text to hand to the evaluator.
    pub fn expression(&self) -> &str {
        self.rhs_text.as_deref().unwrap_or(&self.lhs)
    }
}

/// Classifies raw entry text. Total over all strings.
///
/// The text is split on its first `=`. It is an assignment only when both
/// trimmed sides are non-empty; `name=` falls back to the plain expression
/// `name`, and text whose left side is blank stays plain as a whole.
pub fn classify(raw_text: &str) -> Classification {
    if let Some((left, right)) = raw_text.split_once('=') {
        let (left, right) = (left.trim(), right.trim());
        if !left.is_empty() {
            if right.is_empty() {
                return Classification::plain(left);
            }
            return Classification {
                lhs: left.to_owned(),
                rhs_text: Some(right.to_owned()),
                is_assignment: true,
            };
        }
    }
    Classification::plain(raw_text.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_plain() {
        let classification = classify("");
        assert!(!classification.is_assignment);
        assert_eq!(classification.lhs, "");
        assert_eq!(classification.rhs_text, None);
    }

    #[test]
    fn plain_expression_is_trimmed() {
        let classification = classify("  1 + 2 ");
        assert!(!classification.is_assignment);
        assert_eq!(classification.lhs, "1 + 2");
    }

    #[test]
    fn assignment_splits_on_first_equals() {
        let classification = classify(" a = b = c ");
        assert!(classification.is_assignment);
        assert_eq!(classification.lhs, "a");
        assert_eq!(classification.rhs_text.as_deref(), Some("b = c"));
        assert_eq!(classification.expression(), "b = c");
    }

    #[test]
    fn empty_right_side_is_plain_left_part() {
        let classification = classify("name=");
        assert!(!classification.is_assignment);
        assert_eq!(classification.lhs, "name");
        assert_eq!(classification.expression(), "name");
    }

    #[test]
    fn blank_left_side_is_plain_whole_text() {
        let classification = classify(" = 5");
        assert!(!classification.is_assignment);
        assert_eq!(classification.lhs, "= 5");
        assert_eq!(classify("=").lhs, "=");
    }

    #[test]
    fn self_reference_is_detected_textually() {
        let classification = classify("x=x+1");
        assert!(classification.is_assignment);
        assert_eq!(classification.lhs, "x");
        assert!(classification.is_self_referential());

        assert!(classify("x = max(x_old, 1)").is_self_referential());
        assert!(!classify("y = x + 1").is_self_referential());
        assert!(!classify("x + 1").is_self_referential());
    }
}
