use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Write;
use std::process::Stdio;

use crate::espeak::EspeakConfig;

use super::model::KokoroError;

/// Convert text to Kokoro phoneme token IDs via espeak-ng.
///
/// # Arguments
/// - `text`: The input text to phonemize
/// - `lang`: espeak-ng language code (`"en-us"` or `"en-gb"`)
/// - `vocab`: Mapping from IPA characters to token IDs
/// - `espeak`: Which espeak-ng executable to run
///
/// # Returns
/// A `Vec<i64>` of token IDs. Characters not in the vocab are silently dropped.
pub fn phonemize(
    text: &str,
    lang: &str,
    vocab: &HashMap<char, i64>,
    espeak: &EspeakConfig,
) -> Result<Vec<i64>, KokoroError> {
    let parts = split_text_parts(text);
    if parts.is_empty() {
        return Ok(Vec::new());
    }

    let text_segments: Vec<&str> = parts
        .iter()
        .filter_map(|part| match part {
            TextPart::Text(segment) => Some(segment.as_str()),
            TextPart::Punct(_) => None,
        })
        .collect();

    let segment_ids = if text_segments.is_empty() {
        Vec::new()
    } else {
        phonemize_segments_batch(&text_segments, lang, vocab, espeak)?
    };

    let space = vocab.get(&' ').copied();
    let mut ids = Vec::new();
    let mut segment_index = 0usize;
    let mut pending_space = false;
    let mut quote_open = false;
    for part in parts {
        match part {
            TextPart::Text(_) => {
                if pending_space {
                    push_space(&mut ids, space);
                }
                pending_space = false;
                if let Some(chunk) = segment_ids.get(segment_index) {
                    ids.extend_from_slice(chunk);
                }
                segment_index += 1;
            }
            TextPart::Punct(ch) => {
                match punct_spacing(ch, &mut quote_open) {
                    PunctSpacing::Opening => {
                        push_space(&mut ids, space);
                        pending_space = false;
                    }
                    PunctSpacing::Dash => {
                        push_space(&mut ids, space);
                        pending_space = true;
                    }
                    PunctSpacing::Closing => pending_space = true,
                }
                if let Some(&id) = vocab.get(&ch) {
                    ids.push(id);
                }
            }
        }
    }

    Ok(ids)
}

/// Where a punctuation mark takes its surrounding spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PunctSpacing {
    /// Space before, none after: `(`, `“`, an opening `"`.
    Opening,
    /// Space on both sides: `—`.
    Dash,
    /// Space after only: sentence punctuation and closing quotes.
    Closing,
}

fn punct_spacing(ch: char, quote_open: &mut bool) -> PunctSpacing {
    match ch {
        '(' | '\u{201c}' => PunctSpacing::Opening,
        '—' => PunctSpacing::Dash,
        '"' => {
            *quote_open = !*quote_open;
            if *quote_open {
                PunctSpacing::Opening
            } else {
                PunctSpacing::Closing
            }
        }
        _ => PunctSpacing::Closing,
    }
}

/// Append a word separator unless the output is empty or already ends in one.
fn push_space(ids: &mut Vec<i64>, space: Option<i64>) {
    if let (Some(space), Some(&last)) = (space, ids.last()) {
        if last != space {
            ids.push(space);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TextPart {
    Text(String),
    Punct(char),
}

fn split_text_parts(text: &str) -> Vec<TextPart> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for (idx, ch) in text.char_indices() {
        let ch_len = ch.len_utf8();
        if let Some(punct) = map_boundary_punctuation(ch) {
            if !is_numeric_connector_between_digits(text, idx, ch_len, ch) {
                flush_text_part(&mut parts, &mut current);
                parts.push(TextPart::Punct(punct));
                continue;
            }
        }

        if ch.is_whitespace() {
            if !current.is_empty() && !current.ends_with(' ') {
                current.push(' ');
            }
            continue;
        }

        current.push(ch);
    }

    flush_text_part(&mut parts, &mut current);
    parts
}

fn flush_text_part(parts: &mut Vec<TextPart>, current: &mut String) {
    let trimmed = current.trim();
    if trimmed.is_empty() {
        current.clear();
        return;
    }
    parts.push(TextPart::Text(trimmed.to_string()));
    current.clear();
}

fn map_boundary_punctuation(ch: char) -> Option<char> {
    match ch {
        '.' | '!' | '?' | ',' | ';' | ':' | '—' | '…' | '"' | '(' | ')' | '\u{201c}'
        | '\u{201d}' => Some(ch),
        '\n' | '\r' => Some('.'),
        _ => None,
    }
}

fn is_numeric_connector_between_digits(text: &str, idx: usize, ch_len: usize, ch: char) -> bool {
    if !matches!(ch, '.' | ',') {
        return false;
    }

    let prev = text[..idx].chars().next_back();
    let next = text[idx + ch_len..].chars().next();

    matches!(
        (prev, next),
        (Some(left), Some(right)) if left.is_ascii_digit() && right.is_ascii_digit()
    )
}

fn phonemize_segments_batch(
    segments: &[&str],
    lang: &str,
    vocab: &HashMap<char, i64>,
    espeak: &EspeakConfig,
) -> Result<Vec<Vec<i64>>, KokoroError> {
    let batched_input = segments.join("\n");
    let output = run_espeak(&batched_input, lang, espeak)?;
    let lines: Vec<&str> = output.lines().collect();

    // espeak-ng should emit one line per input line for stdin mode.
    // If this assumption breaks, fall back to per-segment invocation.
    if lines.len() != segments.len() {
        return segments
            .iter()
            .map(|segment| {
                let output = run_espeak(segment, lang, espeak)?;
                Ok(ipa_to_ids(&output, lang, vocab))
            })
            .collect();
    }

    Ok(lines
        .iter()
        .map(|line| ipa_to_ids(line, lang, vocab))
        .collect())
}

fn run_espeak(input: &str, lang: &str, espeak: &EspeakConfig) -> Result<String, KokoroError> {
    let mut child = espeak
        .command()
        .args(["--ipa", "--stdin", "-q", "-v", lang])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                KokoroError::EspeakNotFound
            } else {
                KokoroError::Io(e)
            }
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        // espeak-ng reads stdin line by line; an unterminated last line
        // loses its final phoneme.
        let stdin_payload = canonicalize_espeak_stdin_payload(input);
        stdin
            .write_all(stdin_payload.as_bytes())
            .map_err(KokoroError::Io)?;
    }

    let output = child.wait_with_output().map_err(KokoroError::Io)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(KokoroError::PhonemizerFailed(format!(
            "espeak-ng exited with code {:?}: {stderr}",
            output.status.code()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn canonicalize_espeak_stdin_payload(input: &str) -> Cow<'_, str> {
    if input.ends_with('\n') {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(format!("{input}\n"))
    }
}

fn ipa_to_ids(ipa: &str, lang: &str, vocab: &HashMap<char, i64>) -> Vec<i64> {
    let mut ids = Vec::new();
    for line in ipa.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        for ch in normalize_ipa(line, lang).chars() {
            if ch == '_' {
                continue;
            }
            if let Some(&id) = vocab.get(&ch) {
                ids.push(id);
            }
        }
    }
    ids
}

/// Clean up espeak-ng output before it is mapped onto the vocabulary.
///
/// Fixes the pronunciation of "Kokoro", folds symbols the model was not
/// trained on onto close neighbours and re-attaches plural `z` that espeak
/// splits off as its own word.
pub fn normalize_ipa(ipa: &str, lang: &str) -> String {
    let fixed = ipa
        .replace("kəkˈoːɹoʊ", "kˈoʊkəɹoʊ")
        .replace("kəkˈɔːɹəʊ", "kˈəʊkəɹəʊ");
    let folded: String = fixed
        .chars()
        .map(|ch| match ch {
            'ʲ' => 'j',
            'r' => 'ɹ',
            'x' => 'k',
            'ɬ' => 'l',
            other => other,
        })
        .collect();
    let spaced = space_before_hundred(&folded);
    let joined = join_detached_z(&spaced);
    if lang == "en-us" {
        flap_ninety(&joined)
    } else {
        joined
    }
}

/// `twoʊhˈʌndɹɪd` → `twoʊ hˈʌndɹɪd`
fn space_before_hundred(ps: &str) -> String {
    const HUNDRED: &str = "hˈʌndɹɪd";
    let mut out = String::with_capacity(ps.len());
    let mut rest = ps;
    while let Some(pos) = rest.find(HUNDRED) {
        let (head, tail) = rest.split_at(pos);
        out.push_str(head);
        if out
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_lowercase() || c == 'ɹ' || c == 'ː')
        {
            out.push(' ');
        }
        out.push_str(HUNDRED);
        rest = &tail[HUNDRED.len()..];
    }
    out.push_str(rest);
    out
}

/// Drop the space in ` z` when the `z` ends a word.
fn join_detached_z(ps: &str) -> String {
    let chars: Vec<char> = ps.chars().collect();
    let mut out = String::with_capacity(ps.len());
    for (i, &ch) in chars.iter().enumerate() {
        if ch == ' ' && chars.get(i + 1) == Some(&'z') {
            let after = chars.get(i + 2).copied();
            if after.map_or(true, |c| c == ' ' || map_boundary_punctuation(c).is_some()) {
                continue;
            }
        }
        out.push(ch);
    }
    out
}

/// American English flaps the `t` in "ninety".
fn flap_ninety(ps: &str) -> String {
    const NINETY: &str = "nˈaɪnti";
    let mut out = String::with_capacity(ps.len());
    let mut rest = ps;
    while let Some(pos) = rest.find(NINETY) {
        let (head, tail) = rest.split_at(pos);
        let tail = &tail[NINETY.len()..];
        out.push_str(head);
        if tail.starts_with('ː') {
            out.push_str(NINETY);
        } else {
            out.push_str("nˈaɪndi");
        }
        rest = tail;
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::{
        canonicalize_espeak_stdin_payload, normalize_ipa, phonemize, run_espeak,
        split_text_parts, TextPart,
    };
    use crate::engines::kokoro::vocab::{hardcoded_vocab, ids_to_phonemes};
    use crate::espeak::EspeakConfig;
    use std::process::Command;

    #[test]
    fn splits_text_and_punctuation_parts() {
        let parts = split_text_parts("Hello, world. Testing!");
        assert_eq!(
            parts,
            vec![
                TextPart::Text("Hello".to_string()),
                TextPart::Punct(','),
                TextPart::Text("world".to_string()),
                TextPart::Punct('.'),
                TextPart::Text("Testing".to_string()),
                TextPart::Punct('!'),
            ]
        );
    }

    #[test]
    fn keeps_decimal_and_thousands_separators_inside_text() {
        let parts = split_text_parts("Version 2.0 reached 1,000 users.");
        assert_eq!(
            parts,
            vec![
                TextPart::Text("Version 2.0 reached 1,000 users".to_string()),
                TextPart::Punct('.'),
            ]
        );
    }

    #[test]
    fn still_splits_comma_when_not_between_digits() {
        let parts = split_text_parts("Value 2, next");
        assert_eq!(
            parts,
            vec![
                TextPart::Text("Value 2".to_string()),
                TextPart::Punct(','),
                TextPart::Text("next".to_string()),
            ]
        );
    }

    #[test]
    fn appends_trailing_newline_for_espeak_stdin() {
        assert_eq!(canonicalize_espeak_stdin_payload("America"), "America\n");
    }

    #[test]
    fn keeps_single_trailing_newline_for_espeak_stdin() {
        assert_eq!(canonicalize_espeak_stdin_payload("America\n"), "America\n");
    }

    #[test]
    fn espeak_output_is_stable_with_or_without_trailing_newline() {
        // Skip when espeak-ng is unavailable in the execution environment.
        if Command::new("espeak-ng").arg("--version").output().is_err() {
            return;
        }

        let espeak = EspeakConfig::default();
        let without_newline =
            run_espeak("America", "en-us", &espeak).expect("espeak should succeed");
        let with_newline =
            run_espeak("America\n", "en-us", &espeak).expect("espeak should succeed");
        assert_eq!(
            without_newline.trim(),
            with_newline.trim(),
            "stdin canonicalization must prevent final-token truncation"
        );
    }

    #[test]
    fn phonemize_keeps_terminal_schwa_for_america() {
        if Command::new("espeak-ng").arg("--version").output().is_err() {
            return;
        }

        let vocab = hardcoded_vocab();
        let ids = phonemize("America", "en-us", &vocab, &EspeakConfig::default())
            .expect("phonemize should succeed");
        let schwa_id = *vocab
            .get(&'ə')
            .expect("hardcoded vocab should include schwa");
        assert_eq!(
            ids.last(),
            Some(&schwa_id),
            "terminal schwa should be preserved for 'America'"
        );
    }

    /// An espeak-ng stand-in that answers every input line with ` həlˈoʊ`.
    #[cfg(unix)]
    fn echo_espeak(dir: &std::path::Path) -> EspeakConfig {
        use std::os::unix::fs::PermissionsExt;

        let library = dir.join("libespeak-ng.so.1");
        std::fs::write(&library, b"").unwrap();
        let executable = dir.join("espeak-ng");
        std::fs::write(
            &executable,
            "#!/bin/sh\nwhile IFS= read -r line; do echo ' həlˈoʊ'; done\n",
        )
        .unwrap();
        std::fs::set_permissions(&executable, std::fs::Permissions::from_mode(0o755)).unwrap();
        EspeakConfig::configure(&library, &executable).unwrap()
    }

    #[cfg(unix)]
    fn render(text: &str, espeak: &EspeakConfig) -> String {
        let vocab = hardcoded_vocab();
        let ids = phonemize(text, "en-us", &vocab, espeak).unwrap();
        ids_to_phonemes(&ids, &vocab)
    }

    #[cfg(unix)]
    #[test]
    fn punctuation_keeps_source_spacing() {
        let dir = tempfile::tempdir().unwrap();
        let espeak = echo_espeak(dir.path());

        assert_eq!(render("\"Hello\"", &espeak), "\"həlˈoʊ\"");
        assert_eq!(render("Hello — hello", &espeak), "həlˈoʊ — həlˈoʊ");
        assert_eq!(render("Hello, hello", &espeak), "həlˈoʊ, həlˈoʊ");
        assert_eq!(
            render("Hello. \"Hello\" (hello)", &espeak),
            "həlˈoʊ. \"həlˈoʊ\" (həlˈoʊ)"
        );
    }

    #[test]
    fn normalize_fixes_kokoro_pronunciation() {
        assert_eq!(normalize_ipa("kəkˈoːɹoʊ", "en-us"), "kˈoʊkəɹoʊ");
    }

    #[test]
    fn normalize_folds_untrained_symbols() {
        assert_eq!(normalize_ipa("rxɬʲ", "en-gb"), "ɹklj");
    }

    #[test]
    fn normalize_reattaches_plural_z() {
        assert_eq!(normalize_ipa("kˈæt z", "en-us"), "kˈætz");
        assert_eq!(normalize_ipa("kˈæt z dˈɔɡ", "en-us"), "kˈætz dˈɔɡ");
        assert_eq!(normalize_ipa("ðə zˈuː", "en-us"), "ðə zˈuː");
    }

    #[test]
    fn normalize_separates_hundred() {
        assert_eq!(normalize_ipa("tˈuːhˈʌndɹɪd", "en-us"), "tˈuː hˈʌndɹɪd");
        assert_eq!(normalize_ipa("wʌn hˈʌndɹɪd", "en-us"), "wʌn hˈʌndɹɪd");
    }

    #[test]
    fn ninety_is_flapped_only_in_american_english() {
        assert_eq!(normalize_ipa("nˈaɪnti", "en-us"), "nˈaɪndi");
        assert_eq!(normalize_ipa("nˈaɪnti", "en-gb"), "nˈaɪnti");
        assert_eq!(normalize_ipa("nˈaɪntiːn", "en-us"), "nˈaɪntiːn");
    }
}
