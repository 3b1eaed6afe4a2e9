//! Helpers over a fetched list of letters: display order, search, and the
//! restore guard for reused numbers.

use std::cmp::Ordering;

use crate::models::Letter;

/// `dd/mm/yyyy` in the offset the server sent.
pub fn format_date(letter: &Letter) -> String {
    letter.registered_at.format("%d/%m/%Y").to_string()
}

/// `hh:mm AM/PM` in the offset the server sent.
pub fn format_time(letter: &Letter) -> String {
    letter.registered_at.format("%I:%M %p").to_string()
}

/// Newest number first; for a shared number the active letter comes before
/// cancelled ones; then most recently registered first.
pub fn display_order(a: &Letter, b: &Letter) -> Ordering {
    b.number
        .cmp(&a.number)
        .then_with(|| a.is_cancelled.cmp(&b.is_cancelled))
        .then_with(|| b.registered_at.cmp(&a.registered_at))
}

pub fn sort_for_display(letters: &mut [Letter]) {
    letters.sort_by(display_order);
}

/// Letters whose number, subject, addressee, or registration date contains
/// `term`, case-insensitively. An empty term matches everything.
pub fn search<'a>(letters: &'a [Letter], term: &str) -> Vec<&'a Letter> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return letters.iter().collect();
    }

    letters
        .iter()
        .filter(|letter| {
            letter.number.to_string().contains(&needle)
                || letter.subject.to_lowercase().contains(&needle)
                || letter.addressee.to_lowercase().contains(&needle)
                || format_date(letter).contains(&needle)
        })
        .collect()
}

/// True when an active letter carries the same number as `letter`.
pub fn is_number_reassigned(letter: &Letter, letters: &[Letter]) -> bool {
    letters
        .iter()
        .any(|other| other.number == letter.number && !other.is_cancelled)
}

/// A cancelled letter cannot be restored once its number is back in use.
pub fn restore_blocked(letter: &Letter, letters: &[Letter]) -> bool {
    letter.is_cancelled && is_number_reassigned(letter, letters)
}
