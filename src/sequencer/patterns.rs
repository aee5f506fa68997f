// Row generators: ways of filling a track without clicking every step.

use std::sync::OnceLock;

use rand::Rng;

const DEBRUIJN_ORDER: usize = 8;
pub const DEBRUIJN_OFFSETS: usize = 1 << DEBRUIJN_ORDER;
const PHONETIC_TOKEN_LEN: usize = 4;

/// Binary de Bruijn sequence B(2, 8), lexicographically least. Read
/// cyclically, every 8-bit window appears exactly once.
fn debruijn_sequence() -> &'static [bool] {
    static SEQ: OnceLock<Vec<bool>> = OnceLock::new();
    SEQ.get_or_init(|| {
        fn walk(t: usize, p: usize, a: &mut [u8], seq: &mut Vec<bool>) {
            if t > DEBRUIJN_ORDER {
                if DEBRUIJN_ORDER % p == 0 {
                    seq.extend(a[1..=p].iter().map(|&x| x == 1));
                }
            } else {
                a[t] = a[t - p];
                walk(t + 1, p, a, seq);
                for j in (a[t - p] + 1)..2 {
                    a[t] = j;
                    walk(t + 1, t, a, seq);
                }
            }
        }
        let mut a = [0u8; DEBRUIJN_ORDER + 1];
        let mut seq = Vec::with_capacity(DEBRUIJN_OFFSETS);
        walk(1, 1, &mut a, &mut seq);
        seq
    })
}

/// `width` bits of the de Bruijn sequence starting at `offset` (0..=255).
pub fn debruijn_row(offset: usize, width: usize) -> Vec<bool> {
    let seq = debruijn_sequence();
    let offset = offset.min(DEBRUIJN_OFFSETS - 1);
    (0..width).map(|i| seq[(offset + i) % seq.len()]).collect()
}

/// `value` as a most-significant-bit-first row of `width` steps. Bits above
/// `width` are dropped.
pub fn binary_row(value: u32, width: usize) -> Vec<bool> {
    (0..width)
        .map(|i| {
            let shift = width - 1 - i;
            shift < 32 && (value >> shift) & 1 == 1
        })
        .collect()
}

/// Inverse of [`binary_row`]; only the last 32 steps count.
pub fn row_value(row: &[bool]) -> u32 {
    row.iter().fold(0u32, |acc, &on| (acc << 1) | on as u32)
}

/// Number sequences that can light up a track: step `i` is on when `i + 1`
/// is a member.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntegerSequence {
    Odd,
    Even,
    Prime,
    Fibonacci,
    Lucas,
    Triangular,
    Square,
    Cubic,
    Tetrahedral,
    Pentagonal,
    Hexagonal,
    PowersOfTwo,
    Happy,
}

impl IntegerSequence {
    pub const ALL: [IntegerSequence; 13] = [
        IntegerSequence::Odd,
        IntegerSequence::Even,
        IntegerSequence::Prime,
        IntegerSequence::Fibonacci,
        IntegerSequence::Lucas,
        IntegerSequence::Triangular,
        IntegerSequence::Square,
        IntegerSequence::Cubic,
        IntegerSequence::Tetrahedral,
        IntegerSequence::Pentagonal,
        IntegerSequence::Hexagonal,
        IntegerSequence::PowersOfTwo,
        IntegerSequence::Happy,
    ];

    pub fn label(self) -> &'static str {
        match self {
            IntegerSequence::Odd => "ODD",
            IntegerSequence::Even => "EVEN",
            IntegerSequence::Prime => "PRIME",
            IntegerSequence::Fibonacci => "FIBONACCI",
            IntegerSequence::Lucas => "LUCAS",
            IntegerSequence::Triangular => "TRIANGULAR",
            IntegerSequence::Square => "SQUARE",
            IntegerSequence::Cubic => "CUBIC",
            IntegerSequence::Tetrahedral => "TETRAHEDRAL",
            IntegerSequence::Pentagonal => "PENTAGONAL",
            IntegerSequence::Hexagonal => "HEXAGONAL",
            IntegerSequence::PowersOfTwo => "POWERS OF 2",
            IntegerSequence::Happy => "HAPPY",
        }
    }

    /// Members of the sequence in `1..=limit`, ascending and without repeats.
    pub fn members(self, limit: usize) -> Vec<usize> {
        let polygonal = |f: fn(usize) -> usize| -> Vec<usize> {
            (1..).map(f).take_while(|&n| n <= limit).collect()
        };
        match self {
            IntegerSequence::Odd => (1..=limit).step_by(2).collect(),
            IntegerSequence::Even => (2..=limit).step_by(2).collect(),
            IntegerSequence::Prime => (2..=limit).filter(|&n| is_prime(n)).collect(),
            IntegerSequence::Fibonacci => recurrence(0, 1, limit),
            IntegerSequence::Lucas => recurrence(2, 1, limit),
            IntegerSequence::Triangular => polygonal(|k| k * (k + 1) / 2),
            IntegerSequence::Square => polygonal(|k| k * k),
            IntegerSequence::Cubic => polygonal(|k| k * k * k),
            IntegerSequence::Tetrahedral => polygonal(|k| k * (k + 1) * (k + 2) / 6),
            IntegerSequence::Pentagonal => polygonal(|k| k * (3 * k - 1) / 2),
            IntegerSequence::Hexagonal => polygonal(|k| k * (2 * k - 1)),
            IntegerSequence::PowersOfTwo => polygonal(|k| 1 << (k - 1)),
            IntegerSequence::Happy => (1..=limit).filter(|&n| is_happy(n)).collect(),
        }
    }
}

// a, b, a + b, ... kept within 1..=limit, sorted and deduplicated
fn recurrence(mut a: usize, mut b: usize, limit: usize) -> Vec<usize> {
    let mut out = Vec::new();
    while a <= limit || b <= limit {
        if (1..=limit).contains(&a) {
            out.push(a);
        }
        (a, b) = (b, a + b);
    }
    out.sort_unstable();
    out.dedup();
    out
}

fn is_prime(n: usize) -> bool {
    n >= 2 && (2..).take_while(|d| d * d <= n).all(|d| n % d != 0)
}

// repeatedly summing the squares of the digits reaches 1
fn is_happy(mut n: usize) -> bool {
    let mut seen = Vec::new();
    while n != 1 && !seen.contains(&n) {
        seen.push(n);
        n = std::iter::successors(Some(n), |&m| (m >= 10).then_some(m / 10))
            .map(|m| (m % 10) * (m % 10))
            .sum();
    }
    n == 1
}

/// A row of `width` steps with step `i` on when `i + 1` is in `sequence`.
pub fn sequence_row(sequence: IntegerSequence, width: usize) -> Vec<bool> {
    let members = sequence.members(width);
    (1..=width).map(|n| members.contains(&n)).collect()
}

pub fn random_row<R: Rng>(rng: &mut R, width: usize, density: f64) -> Vec<bool> {
    let density = density.clamp(0.0, 1.0);
    (0..width).map(|_| rng.random_bool(density)).collect()
}

/// Parse a "drum language" line into steps. A space is a rest; anything
/// else is read as a four-letter word and matched against the first four
/// letters of each track name, case-insensitively. Unknown words are rests.
///
/// `"boom chit"` with tracks `["Boom", "Chit"]` gives
/// `[Some(0), None, Some(1)]`.
pub fn parse_phonetic(text: &str, names: &[String]) -> Vec<Option<usize>> {
    let keys: Vec<String> = names
        .iter()
        .map(|n| n.chars().take(PHONETIC_TOKEN_LEN).collect::<String>().to_lowercase())
        .collect();
    let chars: Vec<char> = text.trim_start().chars().collect();
    let mut steps = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ' ' {
            steps.push(None);
            i += 1;
            continue;
        }
        let end = (i + PHONETIC_TOKEN_LEN).min(chars.len());
        let token: String = chars[i..end].iter().collect::<String>().to_lowercase();
        steps.push(keys.iter().position(|k| !k.is_empty() && *k == token));
        i = end;
    }
    steps
}
