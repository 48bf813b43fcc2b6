//! Resolves the payer phone number of a mobile-money notification to a tenant.
//!
//! Gateway callbacks report numbers as `254712345678` while tenant records are typed in
//! by staff (`0712 345 678`, `+254 712 345 678`, ...). Two numbers are treated as the same
//! subscriber when the last nine characters of one are a suffix of the other.

const SUBSCRIBER_DIGITS: usize = 9;

/// Strips every `+` and whitespace character.
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.chars().filter(|c| *c != '+' && !c.is_whitespace()).collect()
}

fn subscriber_suffix(normalized: &str) -> &str {
    let start = normalized
        .char_indices()
        .rev()
        .nth(SUBSCRIBER_DIGITS - 1)
        .map_or(0, |(index, _)| index);
    &normalized[start..]
}

/// Compares two already normalized numbers. Empty numbers never match.
#[must_use]
pub fn numbers_match(left: &str, right: &str) -> bool {
    if left.is_empty() || right.is_empty() {
        return false;
    }
    right.ends_with(subscriber_suffix(left)) || left.ends_with(subscriber_suffix(right))
}

/// Returns the id of the candidate whose phone matches `raw_phone`.
///
/// Candidates are expected to be active tenants in ascending id order. When several share
/// the subscriber suffix, a candidate whose normalized number is identical to the payer's
/// wins; otherwise the first one in iteration order is returned and the ambiguity is logged.
pub fn match_tenant<'a, I>(raw_phone: &str, candidates: I) -> Option<i64>
where
    I: IntoIterator<Item = (i64, &'a str)>,
{
    let payer = normalize(raw_phone);
    let matches: Vec<(i64, String)> = candidates
        .into_iter()
        .map(|(id, phone)| (id, normalize(phone)))
        .filter(|(_, phone)| numbers_match(&payer, phone))
        .collect();

    match matches.as_slice() {
        [] => None,
        [(id, _)] => Some(*id),
        [(first_id, _), ..] => {
            let exact = matches.iter().find(|(_, phone)| *phone == payer).map(|(id, _)| *id);
            let chosen = exact.unwrap_or(*first_id);
            tracing::warn!(
                phone = %raw_phone,
                candidates = ?matches.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
                chosen,
                exact_match = exact.is_some(),
                "Ambiguous phone match, several active tenants share the same subscriber number"
            );
            Some(chosen)
        }
    }
}
