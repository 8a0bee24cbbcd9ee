//! In-place text normalisation.
//!
//! Two stages, applied in order by the producers:
//!
//! 1. [`pre_process`] — line-end normalisation (lone CR becomes LF, CR/LF
//!    pairs collapse), tab folding, space-run collapse and decimal character
//!    reference decoding. Runs on every text chunk the XML parser emits.
//! 2. [`trim_text`] — the whitespace policy of [`TextFlags`]: edge-space
//!    handling, wrapped-line joining with optional end-of-line hyphen
//!    removal. Runs on already-normalised strings.

use bookflow_core::TextFlags;

/// Normalises a character buffer in place, truncating it to the new length.
///
/// Outside `PRE` mode tabs become spaces and space runs collapse to one.
/// In every mode a lone CR becomes LF and a CRLF/LFCR pair becomes a single
/// LF, and numeric character references of the form `&#NNNN;` (decimal only)
/// are decoded. Malformed references are dropped silently.
pub fn pre_process(chars: &mut Vec<char>, flags: TextFlags) {
    let pre = flags.contains(TextFlags::PRE);
    let len = chars.len();
    let mut j = 0usize;
    // Reference scanner: 0 = plain text, 1 = after '&', 2 = inside digits.
    let mut state = 0u8;
    let mut ref_value: u32 = 0;
    let mut run_spaces = 0usize;
    let mut prev = '\0';
    for i in 0..len {
        let ch = chars[i];
        if ch == '\r' || ch == '\n' {
            state = 0;
            let pair = ch == '\r'
                && (prev == '\n' || (i + 1 < len && chars[i + 1] == '\n'));
            if !pair {
                chars[j] = '\n';
                j += 1;
            }
            run_spaces = 0;
        } else if ch == '&' {
            state = 1;
            ref_value = 0;
        } else if state == 0 {
            let ch = if ch == '\t' && !pre { ' ' } else { ch };
            if ch == ' ' {
                if pre || run_spaces == 0 {
                    chars[j] = ' ';
                    j += 1;
                }
                run_spaces += 1;
            } else {
                chars[j] = ch;
                j += 1;
                run_spaces = 0;
            }
        } else if state == 2 && ch.is_ascii_digit() {
            ref_value = ref_value
                .saturating_mul(10)
                .saturating_add(u32::from(ch) - u32::from('0'));
        } else if ch == '#' && state == 1 {
            state = 2;
        } else if ch == ';' {
            if ref_value > 0 {
                chars[j] = char::from_u32(ref_value).unwrap_or('\u{FFFD}');
                j += 1;
            }
            state = 0;
            run_spaces = 0;
        } else {
            // Not a numeric reference after all; drop it and resume.
            state = 0;
        }
        prev = ch;
    }
    chars.truncate(j);
}

/// Convenience wrapper over [`pre_process`] for string inputs.
#[must_use]
pub fn pre_process_str(text: &str, flags: TextFlags) -> String {
    let mut chars: Vec<char> = text.chars().collect();
    pre_process(&mut chars, flags);
    chars.into_iter().collect()
}

/// Applies the trim policy of `flags` to an already-normalised string.
///
/// With `TRIM` set, interior whitespace runs (spaces, tabs, newlines)
/// collapse to single spaces; leading and trailing whitespace is removed
/// unless the corresponding `TRIM_ALLOW_*` bit keeps one space; with
/// `TRIM_REMOVE_EOL_HYPHENS` a hyphen at the end of a wrapped line is
/// removed and the word halves are joined. `PRE`, or an absent `TRIM`,
/// returns the input unchanged.
#[must_use]
pub fn trim_text(text: &str, flags: TextFlags) -> String {
    if flags.contains(TextFlags::PRE) || !flags.contains(TextFlags::TRIM) {
        return text.to_string();
    }
    let remove_hyphens = flags.contains(TextFlags::TRIM_REMOVE_EOL_HYPHENS);
    let starts_spaced = text.starts_with(is_trimmable);
    let ends_spaced = text.ends_with(is_trimmable);

    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '-' && remove_hyphens && chars.peek() == Some(&'\n') {
            // Wrapped word: drop the hyphen and the break, join the halves.
            chars.next();
            continue;
        }
        if is_trimmable(ch) {
            pending_space = true;
        } else {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        }
    }
    if flags.contains(TextFlags::TRIM_ALLOW_START_SPACE) && starts_spaced && !out.is_empty() {
        out.insert(0, ' ');
    }
    if flags.contains(TextFlags::TRIM_ALLOW_END_SPACE) && ends_spaced && !out.is_empty() {
        out.push(' ');
    }
    out
}

fn is_trimmable(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r')
}
