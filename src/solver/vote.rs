use super::normalize::NormalizedCandidate;
use serde::Serialize;

/// How many strategies produced a given answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub text: String,
    pub votes: usize,
}

/// Frequency counts in first-seen order
pub fn tally<'a, I>(candidates: I) -> Vec<Tally>
where
    I: IntoIterator<Item = &'a NormalizedCandidate>,
{
    let mut counts: Vec<Tally> = Vec::new();
    for candidate in candidates {
        match counts.iter_mut().find(|t| t.text == candidate.as_str()) {
            Some(entry) => entry.votes += 1,
            None => counts.push(Tally {
                text: candidate.as_str().to_string(),
                votes: 1,
            }),
        }
    }
    counts
}

/// Plurality vote: the most frequent candidate, ties going to the one seen first.
/// `None` for an empty input.
pub fn consensus<'a, I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a NormalizedCandidate>,
{
    let mut best: Option<Tally> = None;
    for entry in tally(candidates) {
        // Strictly greater keeps the earliest entry on ties
        if best.as_ref().map_or(true, |b| entry.votes > b.votes) {
            best = Some(entry);
        }
    }
    best.map(|b| b.text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(texts: &[&str]) -> Vec<NormalizedCandidate> {
        texts
            .iter()
            .map(|t| NormalizedCandidate::new(t, 1).unwrap())
            .collect()
    }

    #[test]
    fn test_unanimous() {
        let c = candidates(&["AB12", "AB12", "AB12", "AB12"]);
        assert_eq!(consensus(&c), Some("AB12".to_string()));
    }

    #[test]
    fn test_plurality_winner() {
        let c = candidates(&["AB12", "AB1Z", "AB12", "XB12"]);
        assert_eq!(consensus(&c), Some("AB12".to_string()));
    }

    #[test]
    fn test_tie_goes_to_first_seen() {
        let c = candidates(&["XY99", "AB12", "AB12", "XY99"]);
        assert_eq!(consensus(&c), Some("XY99".to_string()));

        let c = candidates(&["QQQQ", "WWWW"]);
        assert_eq!(consensus(&c), Some("QQQQ".to_string()));
    }

    #[test]
    fn test_later_majority_beats_earlier_single() {
        let c = candidates(&["AAAA", "BBBB", "BBBB"]);
        assert_eq!(consensus(&c), Some("BBBB".to_string()));
    }

    #[test]
    fn test_single_candidate_wins_alone() {
        let c = candidates(&["LONE"]);
        assert_eq!(consensus(&c), Some("LONE".to_string()));
    }

    #[test]
    fn test_empty_has_no_consensus() {
        let c: Vec<NormalizedCandidate> = Vec::new();
        assert_eq!(consensus(&c), None);
    }

    #[test]
    fn test_tally_is_case_sensitive_and_ordered() {
        let c = candidates(&["abcd", "ABCD", "abcd"]);
        assert_eq!(
            tally(&c),
            vec![
                Tally {
                    text: "abcd".to_string(),
                    votes: 2
                },
                Tally {
                    text: "ABCD".to_string(),
                    votes: 1
                },
            ]
        );
    }
}
