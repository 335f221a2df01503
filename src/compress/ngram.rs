use std::collections::{BTreeMap, BTreeSet};

/// Every contiguous n-gram (length 2 up to half the input) that occurs at
/// least twice without overlapping itself, mapped to its start positions.
///
/// Lengths are searched in increasing order and only positions that started
/// a repeated gram of the previous length are extended. Overlapping
/// occurrences are dropped greedily: a position is kept only if it starts at
/// least `n` after the previously kept one.
pub fn find_repeated_ngrams<T: Clone + Ord>(seq: &[T]) -> BTreeMap<Vec<T>, Vec<usize>> {
    let mut found = BTreeMap::new();
    let mut candidates: BTreeSet<usize> = (0..seq.len()).collect();

    for n in 2..=seq.len() / 2 {
        let mut by_gram: BTreeMap<&[T], Vec<usize>> = BTreeMap::new();
        for &p in &candidates {
            if p + n <= seq.len() {
                by_gram.entry(&seq[p..p + n]).or_default().push(p);
            }
        }

        candidates.clear();
        for (gram, positions) in by_gram {
            if positions.len() < 2 {
                continue;
            }
            candidates.extend(positions.iter().copied());

            let mut kept: Vec<usize> = Vec::with_capacity(positions.len());
            for p in positions {
                if kept.last().is_none_or(|&last| p >= last + n) {
                    kept.push(p);
                }
            }
            if kept.len() >= 2 {
                found.insert(gram.to_vec(), kept);
            }
        }
        if candidates.is_empty() {
            break;
        }
    }
    found
}

/// Like [`find_repeated_ngrams`], with occurrences grouped into runs of
/// back-to-back repeats (gap exactly the gram length).
pub fn find_repeated_ngrams_grouped<T: Clone + Ord>(
    seq: &[T],
) -> BTreeMap<Vec<T>, Vec<Vec<usize>>> {
    find_repeated_ngrams(seq)
        .into_iter()
        .map(|(gram, positions)| {
            let n = gram.len();
            let mut groups: Vec<Vec<usize>> = Vec::new();
            for p in positions {
                match groups.last_mut() {
                    Some(g) if g.last().is_some_and(|&last| last + n == p) => g.push(p),
                    _ => groups.push(vec![p]),
                }
            }
            (gram, groups)
        })
        .collect()
}

/// Net node count removed by extracting `len`-long gram occurrences `groups`
/// into one subroutine.
pub(crate) fn savings(len: usize, groups: &[Vec<usize>]) -> i64 {
    let occurrences: usize = groups.iter().map(Vec::len).sum();
    let removed = len * occurrences;
    let added = len
        + 1
        + groups
            .iter()
            .map(|g| if g.len() == 1 { 1 } else { 2 })
            .sum::<usize>();
    removed as i64 - added as i64
}

/// The most profitable extraction: strictly positive savings, ties broken by
/// longer gram, then earliest first occurrence.
pub(crate) fn best_candidate<T: Clone + Ord>(seq: &[T]) -> Option<(usize, Vec<Vec<usize>>)> {
    find_repeated_ngrams_grouped(seq)
        .into_iter()
        .map(|(gram, groups)| (savings(gram.len(), &groups), gram.len(), groups))
        .filter(|(s, _, _)| *s > 0)
        .max_by(|a, b| {
            let first = |g: &Vec<Vec<usize>>| g.first().and_then(|v| v.first()).copied();
            a.0.cmp(&b.0)
                .then(a.1.cmp(&b.1))
                .then_with(|| first(&b.2).cmp(&first(&a.2)))
        })
        .map(|(_, len, groups)| (len, groups))
}
