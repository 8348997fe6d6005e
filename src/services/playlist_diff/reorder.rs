/// Indices (into `values`) of one longest strictly increasing subsequence.
///
/// Patience sorting with predecessor links, O(n log n). Among equally long subsequences the one
/// ending on the smallest tail is returned, which keeps the choice deterministic.
pub fn longest_increasing_subsequence(values: &[usize]) -> Vec<usize> {
    if values.is_empty() {
        return Vec::new();
    }

    // tails[k] = index into `values` of the smallest tail of an increasing run of length k + 1
    let mut tails: Vec<usize> = Vec::with_capacity(values.len());
    let mut predecessor: Vec<Option<usize>> = vec![None; values.len()];

    for (i, &value) in values.iter().enumerate() {
        let slot = tails.partition_point(|&t| values[t] < value);
        if slot > 0 {
            predecessor[i] = Some(tails[slot - 1]);
        }
        if slot == tails.len() {
            tails.push(i);
        } else {
            tails[slot] = i;
        }
    }

    let mut sequence = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        sequence.push(i);
        cursor = predecessor[i];
    }
    sequence.reverse();
    sequence
}
