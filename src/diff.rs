//! Line diff between the pre- and post-image of a rewritten file.
//!
//! The edit script is computed with Myers' O(ND) algorithm after trimming the
//! common prefix and suffix, then grouped into insert/delete/change deltas.

use serde::Serialize;

pub const CONTEXT_LINES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaKind {
    Insert,
    Delete,
    Change,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Zero-based index of the first line in its sequence.
    pub position: usize,
    pub lines: Vec<String>,
}

impl Chunk {
    fn end(&self) -> usize {
        self.position + self.lines.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delta {
    pub kind: DeltaKind,
    pub original: Chunk,
    pub revised: Chunk,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    pub original_name: String,
    pub revised_name: String,
    pub deltas: Vec<Delta>,
    pub unified: Vec<String>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn added_lines(&self) -> usize {
        self.deltas.iter().map(|d| d.revised.lines.len()).sum()
    }

    pub fn removed_lines(&self) -> usize {
        self.deltas.iter().map(|d| d.original.lines.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal,
    Delete,
    Insert,
}

/// Computes deltas and the unified rendering of `original` vs `revised`.
pub fn calculate(
    original_name: &str,
    revised_name: &str,
    original: &[String],
    revised: &[String],
) -> DiffResult {
    let deltas = diff(original, revised);
    let unified = unified_diff(
        original_name,
        revised_name,
        original,
        &deltas,
        CONTEXT_LINES,
    );
    DiffResult {
        original_name: original_name.to_string(),
        revised_name: revised_name.to_string(),
        deltas,
        unified,
    }
}

pub fn diff(original: &[String], revised: &[String]) -> Vec<Delta> {
    let prefix = original
        .iter()
        .zip(revised)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = original[prefix..]
        .iter()
        .rev()
        .zip(revised[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let a = &original[prefix..original.len() - suffix];
    let b = &revised[prefix..revised.len() - suffix];

    let mut ops = vec![Op::Equal; prefix];
    ops.extend(edit_ops(a, b));
    ops.extend(std::iter::repeat_n(Op::Equal, suffix));

    group(&ops, original, revised)
}

fn edit_ops<T: PartialEq>(a: &[T], b: &[T]) -> Vec<Op> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max = n + m;
    let offset = max;
    let mut v = vec![0isize; 2 * max as usize + 2];
    let mut trace: Vec<Vec<isize>> = Vec::new();

    'search: for d in 0..=max {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let idx = (k + offset) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x >= n && y >= m {
                break 'search;
            }
            k += 2;
        }
    }

    let mut ops = Vec::with_capacity((n + m) as usize);
    let (mut x, mut y) = (n, m);
    for (d, v) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let k = x - y;
        let idx = (k + offset) as usize;
        let prev_k = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[(prev_k + offset) as usize];
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            ops.push(Op::Equal);
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            ops.push(if x == prev_x { Op::Insert } else { Op::Delete });
        }
        x = prev_x;
        y = prev_y;
    }
    ops.reverse();
    ops
}

fn group(ops: &[Op], original: &[String], revised: &[String]) -> Vec<Delta> {
    let mut deltas = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    let mut cursor = 0usize;

    while cursor < ops.len() {
        if ops[cursor] == Op::Equal {
            i += 1;
            j += 1;
            cursor += 1;
            continue;
        }

        let (start_i, start_j) = (i, j);
        while cursor < ops.len() && ops[cursor] != Op::Equal {
            match ops[cursor] {
                Op::Delete => i += 1,
                Op::Insert => j += 1,
                Op::Equal => {}
            }
            cursor += 1;
        }

        let kind = match (i > start_i, j > start_j) {
            (true, true) => DeltaKind::Change,
            (true, false) => DeltaKind::Delete,
            _ => DeltaKind::Insert,
        };
        deltas.push(Delta {
            kind,
            original: Chunk {
                position: start_i,
                lines: original[start_i..i].to_vec(),
            },
            revised: Chunk {
                position: start_j,
                lines: revised[start_j..j].to_vec(),
            },
        });
    }

    deltas
}

/// Rebuilds the revised sequence from `original` and its deltas.
pub fn apply(original: &[String], deltas: &[Delta]) -> Vec<String> {
    let mut result = Vec::with_capacity(original.len());
    let mut pos = 0usize;
    for delta in deltas {
        result.extend_from_slice(&original[pos..delta.original.position]);
        result.extend(delta.revised.lines.iter().cloned());
        pos = delta.original.end();
    }
    result.extend_from_slice(&original[pos..]);
    result
}

pub fn unified_diff(
    original_name: &str,
    revised_name: &str,
    original: &[String],
    deltas: &[Delta],
    context: usize,
) -> Vec<String> {
    if deltas.is_empty() {
        return Vec::new();
    }

    let mut out = vec![format!("--- {original_name}"), format!("+++ {revised_name}")];

    let mut start = 0usize;
    while start < deltas.len() {
        let mut end = start + 1;
        while end < deltas.len()
            && deltas[end].original.position - deltas[end - 1].original.end() <= 2 * context
        {
            end += 1;
        }
        render_hunk(&mut out, original, &deltas[start..end], context);
        start = end;
    }

    out
}

fn render_hunk(out: &mut Vec<String>, original: &[String], hunk: &[Delta], context: usize) {
    let (Some(first), Some(last)) = (hunk.first(), hunk.last()) else {
        return;
    };

    let orig_start = first.original.position.saturating_sub(context);
    let orig_end = (last.original.end() + context).min(original.len());
    let leading = first.original.position - orig_start;
    let trailing = orig_end - last.original.end();
    let rev_start = first.revised.position - leading;
    let rev_end = last.revised.end() + trailing;

    out.push(format!(
        "@@ -{} +{} @@",
        hunk_range(orig_start, orig_end - orig_start),
        hunk_range(rev_start, rev_end - rev_start)
    ));

    let mut cursor = orig_start;
    for delta in hunk {
        for line in &original[cursor..delta.original.position] {
            out.push(format!(" {line}"));
        }
        for line in &delta.original.lines {
            out.push(format!("-{line}"));
        }
        for line in &delta.revised.lines {
            out.push(format!("+{line}"));
        }
        cursor = delta.original.end();
    }
    for line in &original[cursor..orig_end] {
        out.push(format!(" {line}"));
    }
}

fn hunk_range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{}", start + 1, len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn identical_sequences_have_no_deltas() {
        let a = lines("a\nb\nc");
        let result = calculate("A", "B", &a, &a);
        assert!(result.is_empty());
        assert!(result.unified.is_empty());
    }

    #[test]
    fn classifies_insert_delete_and_change() {
        let a = lines("a\nb\nc\nd\ne");
        let b = lines("a\nX\nb\nc\ne\nf");
        let deltas = diff(&a, &b);
        let kinds: Vec<_> = deltas.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            [DeltaKind::Insert, DeltaKind::Delete, DeltaKind::Insert]
        );

        let c = lines("a\nB\nc");
        let deltas = diff(&lines("a\nb\nc"), &c);
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].kind, DeltaKind::Change);
        assert_eq!(deltas[0].original.lines, ["b"]);
        assert_eq!(deltas[0].revised.lines, ["B"]);
    }

    #[test]
    fn applying_deltas_reproduces_revised() {
        let cases = [
            ("", "a\nb"),
            ("a\nb", ""),
            ("a\nb\nc\nd", "d\nc\nb\na"),
            ("x\ny\nz\nx\ny\nz", "y\nz\nx\nq\nz"),
            ("/**\n * @author Old\n */\npublic class C {}", "/**\n * @author Old\n * @author New\n */\npublic class C {}"),
        ];
        for (before, after) in cases {
            let a = lines(before);
            let b = lines(after);
            assert_eq!(apply(&a, &diff(&a, &b)), b, "{before:?} -> {after:?}");
        }
    }

    #[test]
    fn unified_rendering_uses_three_lines_of_context() {
        let a = lines("1\n2\n3\n4\n5\n6\n7\n8\n9\n10");
        let mut b = a.clone();
        b.insert(5, "new".to_string());
        let result = calculate("C.java", "C.java.at-test", &a, &b);
        assert_eq!(
            result.unified,
            [
                "--- C.java",
                "+++ C.java.at-test",
                "@@ -3,6 +3,7 @@",
                " 3",
                " 4",
                " 5",
                "+new",
                " 6",
                " 7",
                " 8",
            ]
        );
        assert_eq!(result.added_lines(), 1);
        assert_eq!(result.removed_lines(), 0);
    }

    #[test]
    fn distant_changes_get_separate_hunks() {
        let a: Vec<String> = (1..=20).map(|n| n.to_string()).collect();
        let mut b = a.clone();
        b[1] = "two".to_string();
        b[17] = "eighteen".to_string();
        let unified = calculate("a", "b", &a, &b).unified;
        let headers: Vec<_> = unified.iter().filter(|l| l.starts_with("@@")).collect();
        assert_eq!(headers, ["@@ -1,5 +1,5 @@", "@@ -15,6 +15,6 @@"]);
    }

    #[test]
    fn insertion_into_empty_file_renders_zero_length_range() {
        let result = calculate("a", "b", &[], &lines("x"));
        assert_eq!(result.unified[2], "@@ -0,0 +1 @@");
    }
}
