use icu_normalizer::ComposingNormalizerBorrowed;

const NFKC: ComposingNormalizerBorrowed<'static> = ComposingNormalizerBorrowed::new_nfkc();

const NUMBER_WORDS: [&str; 11] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
];

/// Typographic apostrophes folded to `'` before punctuation is stripped.
const APOSTROPHES: [char; 4] = ['\u{2018}', '\u{2019}', '\u{02BC}', '\u{FF07}'];

/// Canonical form used for every comparison: lowercase, small numbers spelled
/// out, apostrophes unified, punctuation removed, whitespace collapsed.
///
/// Compatibility decomposition runs first so full-width digits and letters
/// coming out of a recognizer compare equal to their ASCII forms.
pub fn normalize(text: &str) -> String {
    let lowered = NFKC.normalize(text).to_lowercase();
    let spelled = spell_small_numbers(&lowered);

    let mut out = String::with_capacity(spelled.len());
    let mut pending_space = false;
    for ch in spelled.chars() {
        let ch = if APOSTROPHES.contains(&ch) { '\'' } else { ch };
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '\'' {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(ch);
        }
    }
    out
}

/// Normalized words, split on single spaces. Blank input gives no tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return Vec::new();
    }
    normalized.split(' ').map(str::to_string).collect()
}

/// Replace standalone digit runs `0`..=`10` with their word form. A run is
/// standalone when neither neighbour is an ASCII letter or digit.
fn spell_small_numbers(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        if !chars[i].is_ascii_digit() {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        let run: String = chars[start..i].iter().collect();

        let before = start.checked_sub(1).map(|p| chars[p]);
        let after = chars.get(i).copied();
        let standalone = !before.is_some_and(|c| c.is_ascii_alphanumeric())
            && !after.is_some_and(|c| c.is_ascii_alphanumeric());

        match run.parse::<usize>() {
            Ok(n) if standalone && n <= 10 && (run.len() == 1 || run == "10") => {
                out.push_str(NUMBER_WORDS[n]);
            }
            _ => out.push_str(&run),
        }
    }

    out
}
