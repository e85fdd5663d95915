//! Title canonicalization for fuzzy deduplication.
//!
//! Two gift ideas count as the same idea when their titles reduce to the
//! same canonical key: lowercased, accents folded, possessives dropped,
//! `&` rewritten to `and`, punctuation collapsed, stop words removed, and
//! each remaining token lightly singularized. The function is pure and
//! total; anything unusable reduces to the empty string, which callers
//! must treat as "no key".

/// Stop-word tokens dropped during canonicalization. Only tokens present
/// before the `&` → `and` substitution are eligible, so an `and` produced
/// from `&` always survives.
const STOP_WORDS: &[&str] =
    &["a", "an", "the", "for", "to", "of", "and", "with", "from", "gift", "idea"];

/// Reduce a title to its canonical dedup key.
///
/// Returns `""` for empty or whitespace-only input; never panics.
pub fn canonicalize(title: &str) -> String {
    let lowered: String = title.chars().flat_map(char::to_lowercase).map(fold_accent).collect();
    let stripped = strip_possessives(&lowered);

    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    for ch in stripped.chars() {
        if ch.is_alphanumeric() {
            current.push(ch);
        } else {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            if ch == '&' {
                tokens.push("&".to_string());
            }
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    if tokens.is_empty() {
        return String::new();
    }

    let kept: Vec<String> = tokens.iter().filter(|token| !is_stop_word(token)).cloned().collect();
    // Dropping every token would leave nothing to key on; keep the original
    // tokens instead so titles made entirely of stop words still dedup.
    let kept = if kept.is_empty() { tokens } else { kept };

    kept.iter()
        .map(|token| if token == "&" { "and".to_string() } else { singularize(token) })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Fold common Latin diacritics to their base letter. Anything outside the
/// mapped range passes through unchanged.
fn fold_accent(ch: char) -> char {
    match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        _ => ch,
    }
}

/// Remove possessive `'s` suffixes and any remaining apostrophes.
/// `dad's` becomes `dad`, `don't` becomes `dont`.
fn strip_possessives(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut index = 0;

    while index < chars.len() {
        let ch = chars[index];
        if ch == '\'' || ch == '\u{2019}' {
            let possessive = chars.get(index + 1) == Some(&'s')
                && chars.get(index + 2).map_or(true, |next| !next.is_alphanumeric());
            index += if possessive { 2 } else { 1 };
            continue;
        }
        out.push(ch);
        index += 1;
    }

    out
}

/// Light singularization: `ies` → `y`, `xes`/`zes`/`ches`/`shes` drop the
/// trailing `es`, and a trailing `s` is stripped unless the token ends in
/// `ss`. Intentionally heuristic; canonical keys only need to agree with
/// themselves.
fn singularize(token: &str) -> String {
    if let Some(stem) = token.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }

    for suffix in ["ches", "shes", "xes", "zes"] {
        if let Some(stem) = token.strip_suffix(suffix) {
            let kept = &suffix[..suffix.len() - 2];
            return format!("{stem}{kept}");
        }
    }

    if token.len() > 1 && token.ends_with('s') && !token.ends_with("ss") {
        return token[..token.len() - 1].to_string();
    }

    token.to_string()
}
