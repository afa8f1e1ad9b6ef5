//! Local search over the stored `visitedUrls` and `bookmarkedUrls` lists.
//!
//! A query matches an entry when its lowercased text occurs in the title or
//! URL, or when the Hangul initial consonants (choseong) of the query occur in
//! those of the title. Typing `ㄹㅅㅌ` therefore finds a page titled `러스트`.

use serde::{Deserialize, Serialize};

use crate::store::{ExtensionStorage, LocalStore};
use crate::types::errors::StoreError;
use crate::types::visit::VisitEntry;

/// First precomposed Hangul syllable, U+AC00.
const HANGUL_FIRST: u32 = 0xAC00;

/// Number of precomposed Hangul syllables.
const HANGUL_COUNT: u32 = 11_172;

/// Syllables sharing one initial consonant (21 vowels x 28 finals).
const SYLLABLES_PER_INITIAL: u32 = 588;

const CHOSEONG: [char; 19] = [
    'ㄱ', 'ㄲ', 'ㄴ', 'ㄷ', 'ㄸ', 'ㄹ', 'ㅁ', 'ㅂ', 'ㅃ', 'ㅅ', 'ㅆ', 'ㅇ', 'ㅈ', 'ㅉ', 'ㅊ', 'ㅋ', 'ㅌ',
    'ㅍ', 'ㅎ',
];

/// Which local list a search runs over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryFilter {
    #[default]
    All,
    Bookmarks,
}

/// Replaces every precomposed Hangul syllable with its initial consonant.
/// Other characters pass through unchanged.
pub fn choseong(text: &str) -> String {
    text.chars()
        .map(|ch| {
            let offset = (ch as u32).wrapping_sub(HANGUL_FIRST);
            if offset < HANGUL_COUNT {
                CHOSEONG[(offset / SYLLABLES_PER_INITIAL) as usize]
            } else {
                ch
            }
        })
        .collect()
}

fn matches(entry: &VisitEntry, query: &str, query_choseong: &str) -> bool {
    let title = entry.title.to_lowercase();
    title.contains(query)
        || entry.url.to_lowercase().contains(query)
        || choseong(&title).contains(query_choseong)
}

/// Entries matching `query`, in list order. A blank query matches everything.
pub fn search_entries<'e>(entries: &'e [VisitEntry], query: &str) -> Vec<&'e VisitEntry> {
    let query = query.trim().to_lowercase();
    let query_choseong = choseong(&query);
    entries
        .iter()
        .filter(|entry| matches(entry, &query, &query_choseong))
        .collect()
}

/// Searches the stored list selected by `filter`.
pub fn search_stored<S: LocalStore>(
    storage: &ExtensionStorage<S>,
    filter: HistoryFilter,
    query: &str,
) -> Result<Vec<VisitEntry>, StoreError> {
    let entries = match filter {
        HistoryFilter::All => storage.visited()?,
        HistoryFilter::Bookmarks => storage.bookmarks()?,
    };
    Ok(search_entries(&entries, query).into_iter().cloned().collect())
}
