//! Levenshtein distance with an edit script.

/// One edit turning the old sequence into the new one. `index` is the
/// position in the old sequence the edit applies at; `old` is `None` for an
/// insertion and `new` is `None` for a deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOp {
    pub index: usize,
    pub old: Option<char>,
    pub new: Option<char>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Substitute,
    Delete,
    Insert,
}

/// Edit distance between `s` and `t`.
pub fn distance(s: &[char], t: &[char]) -> usize {
    let mut row: Vec<usize> = (0..=t.len()).collect();
    for (i, &sc) in s.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, &tc) in t.iter().enumerate() {
            let substitute = diagonal + usize::from(sc != tc);
            diagonal = row[j + 1];
            row[j + 1] = substitute.min(row[j + 1] + 1).min(row[j] + 1);
        }
    }
    row[t.len()]
}

/// Minimal edit script from `s` to `t`, ordered by position. Unchanged
/// characters are not listed. On ties a substitution is preferred over a
/// deletion, and a deletion over an insertion.
pub fn edit_script(s: &[char], t: &[char]) -> Vec<EditOp> {
    let width = t.len() + 1;
    let mut cost = vec![0usize; (s.len() + 1) * width];
    let mut step = vec![Step::Substitute; (s.len() + 1) * width];
    for i in 0..=s.len() {
        cost[i * width] = i;
        step[i * width] = Step::Delete;
    }
    for j in 0..=t.len() {
        cost[j] = j;
        step[j] = Step::Insert;
    }
    for i in 1..=s.len() {
        for j in 1..=t.len() {
            let substitute = cost[(i - 1) * width + j - 1] + usize::from(s[i - 1] != t[j - 1]);
            let delete = cost[(i - 1) * width + j] + 1;
            let insert = cost[i * width + j - 1] + 1;
            let (best, how) = if substitute <= delete && substitute <= insert {
                (substitute, Step::Substitute)
            } else if delete <= insert {
                (delete, Step::Delete)
            } else {
                (insert, Step::Insert)
            };
            cost[i * width + j] = best;
            step[i * width + j] = how;
        }
    }

    let mut ops = Vec::new();
    let (mut i, mut j) = (s.len(), t.len());
    while i > 0 || j > 0 {
        let how = if i == 0 {
            Step::Insert
        } else if j == 0 {
            Step::Delete
        } else {
            step[i * width + j]
        };
        match how {
            Step::Substitute => {
                i -= 1;
                j -= 1;
                if s[i] != t[j] {
                    ops.push(EditOp {
                        index: i,
                        old: Some(s[i]),
                        new: Some(t[j]),
                    });
                }
            }
            Step::Delete => {
                i -= 1;
                ops.push(EditOp {
                    index: i,
                    old: Some(s[i]),
                    new: None,
                });
            }
            Step::Insert => {
                j -= 1;
                ops.push(EditOp {
                    index: i,
                    old: None,
                    new: Some(t[j]),
                });
            }
        }
    }
    ops.reverse();
    ops
}
