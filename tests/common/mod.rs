//! Shared helpers for the end-to-end tests: a plain sequential Myers
//! implementation as the ground truth, and an edit-script interpreter.

use pardiff::backtrace::{EditMode, EditStep};

/// Textbook single-array Myers: the value every distributed run must match.
pub fn sequential_edit_distance(a: &[i32], b: &[i32]) -> i32 {
    let a_len = a.len() as i32;
    let b_len = b.len() as i32;
    let d_max = a_len + b_len;
    let mut v = vec![0i32; (2 * d_max + 3) as usize];
    let idx = |k: i32| (k + d_max + 1) as usize;

    for d in 0..=d_max {
        let mut k = -d;
        while k <= d {
            let mut x = if d == 0 {
                0
            } else if k == -d || (k != d && v[idx(k - 1)] < v[idx(k + 1)]) {
                v[idx(k + 1)]
            } else {
                v[idx(k - 1)] + 1
            };
            let mut y = x - k;
            while x < a_len && y < b_len && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx(k)] = x;
            if x >= a_len && y >= b_len && k == a_len - b_len {
                return d;
            }
            k += 2;
        }
    }
    unreachable!("the search always terminates by layer |A| + |B|")
}

/// Applies an edit script to `a`. Step positions are in A coordinates:
/// an insert places its value after the first `x` elements of the original
/// sequence (several inserts at the same anchor keep their script order), a
/// delete removes the 1-based element `x`.
pub fn apply_edit_script(a: &[i32], script: &[EditStep]) -> Vec<i32> {
    let mut deleted = vec![false; a.len()];
    let mut inserts: Vec<Vec<i32>> = vec![Vec::new(); a.len() + 1];
    for step in script {
        match step.mode {
            EditMode::Insert => inserts[step.x as usize].push(step.insert_val),
            EditMode::Delete => deleted[step.x as usize - 1] = true,
        }
    }

    let mut result = Vec::new();
    for i in 0..=a.len() {
        result.extend_from_slice(&inserts[i]);
        if i < a.len() && !deleted[i] {
            result.push(a[i]);
        }
    }
    result
}

#[test]
fn sequential_reference_sanity() {
    assert_eq!(sequential_edit_distance(&[], &[]), 0);
    assert_eq!(sequential_edit_distance(&[1, 2, 3], &[1, 2, 3]), 0);
    assert_eq!(sequential_edit_distance(&[], &[1, 2, 3]), 3);
    assert_eq!(sequential_edit_distance(&[1, 2, 3], &[]), 3);
    assert_eq!(
        sequential_edit_distance(&[2, 4, 1, 3, 3], &[2, 4, 7, 1, 3, 3, 3]),
        2
    );
}

#[test]
fn apply_edit_script_sanity() {
    let script = [
        EditStep {
            x: 2,
            insert_val: 7,
            mode: EditMode::Insert,
        },
        EditStep {
            x: 5,
            insert_val: 3,
            mode: EditMode::Insert,
        },
    ];
    assert_eq!(
        apply_edit_script(&[2, 4, 1, 3, 3], &script),
        vec![2, 4, 7, 1, 3, 3, 3]
    );
}
