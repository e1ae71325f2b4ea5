use super::variant_caller::Variant;

/// Which side of the alignment carries the gap run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndelKind {
    /// Gap in the reference row.
    Insertion,
    /// Gap in the consensus row.
    Deletion,
}

impl IndelKind {
    /// Token prefix used in the compact variant string.
    pub fn prefix(self) -> &'static str {
        match self {
            IndelKind::Insertion => "ins",
            IndelKind::Deletion => "del",
        }
    }
}

/// Collapse ascending 1-based gap positions into run-length indel variants.
///
/// Each run of consecutive positions becomes one variant located at the first
/// position of the run. Input order is preserved.
pub fn merge_indel_runs(positions: &[u32], kind: IndelKind) -> Vec<Variant> {
    let mut merged = Vec::new();
    let mut iter = positions.iter().copied();
    let Some(first) = iter.next() else {
        return merged;
    };

    let mut start = first;
    let mut previous = first;
    for position in iter {
        if previous.checked_add(1) == Some(position) {
            previous = position;
            continue;
        }
        merged.push(Variant::indel(start, kind, previous - start + 1));
        start = position;
        previous = position;
    }
    merged.push(Variant::indel(start, kind, previous - start + 1));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn tokens(positions: &[u32], kind: IndelKind) -> Vec<String> {
        merge_indel_runs(positions, kind)
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test_case(&[5, 6, 7, 10], IndelKind::Insertion, &["5:ins3", "10:ins1"] ; "two insertion runs")]
    #[test_case(&[1], IndelKind::Deletion, &["1:del1"] ; "single deletion")]
    #[test_case(&[2, 3, 4, 5], IndelKind::Deletion, &["2:del4"] ; "one long run")]
    #[test_case(&[1, 3, 5], IndelKind::Insertion, &["1:ins1", "3:ins1", "5:ins1"] ; "no adjacent positions")]
    #[test_case(&[], IndelKind::Insertion, &[] ; "empty input")]
    fn merges_runs(positions: &[u32], kind: IndelKind, expected: &[&str]) {
        assert_eq!(tokens(positions, kind), expected);
    }
}
