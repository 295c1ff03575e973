// src/reporting/mod.rs

//! Pure aggregation over rows already fetched from the database.
//! Nothing in here touches the pool, so every rule is unit tested in place.

pub mod exams;
pub mod export;
pub mod fees;
pub mod toppers;

use std::{cmp::Ordering, iter::Peekable, str::Chars};

/// Rounds to two decimal places, the precision every percentage is shown at.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `obtained / max * 100`, or exactly 0 when nothing counts towards the denominator.
pub fn percentage(obtained: f64, max: f64) -> f64 {
    if max > 0.0 {
        round2(obtained / max * 100.0)
    } else {
        0.0
    }
}

/// Natural ("alphanumeric") ordering: digit runs compare by numeric value,
/// everything else case-insensitively. `"Roll 9" < "Roll 10"`.
/// Strings that are equal under those rules fall back to byte order so the
/// result is total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_cmp_loose(a, b).then_with(|| a.cmp(b))
}

fn natural_cmp_loose(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();

    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let na = take_digits(&mut ai);
                let nb = take_digits(&mut bi);
                let ord = compare_digit_runs(&na, &nb);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                let ord = x.to_ascii_lowercase().cmp(&y.to_ascii_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                ai.next();
                bi.next();
            }
        }
    }
}

fn take_digits(it: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = it.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        it.next();
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
