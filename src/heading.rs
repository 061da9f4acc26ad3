/// Decides whether the word heading in the detail panel should be visible.
///
/// The heading is redundant when the search box already spells the displayed
/// word, so it is hidden on a case-insensitive match of the trimmed texts and
/// shown otherwise, including when the search box is empty.
pub fn heading_visible(input_text: &str, displayed_word: &str) -> bool {
    let search = input_text.trim().to_lowercase();
    if search.is_empty() {
        return true;
    }
    search != displayed_word.trim().to_lowercase()
}
