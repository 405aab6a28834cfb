use crate::domain::card::Card;
use crate::domain::ports::{CardSort, PageRequest};

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;

/// Orders a result set and cuts the requested page out of it. Shared by the
/// backends, which all materialize candidate rows before paging.
pub(crate) fn sort_and_paginate(mut cards: Vec<Card>, page: PageRequest) -> Vec<Card> {
    match page.sort() {
        CardSort::IdAsc => cards.sort_by_key(|card| card.id),
        CardSort::IdDesc => cards.sort_by_key(|card| std::cmp::Reverse(card.id)),
        CardSort::ExpiresAsc => cards.sort_by_key(|card| (card.expires, card.id)),
    }
    cards
        .into_iter()
        .skip(page.offset())
        .take(page.size())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::expiry::Expiry;

    fn card(id: u64, months_ahead: i32) -> Card {
        let mut card = Card::issue(1, Expiry::current().shift(months_ahead), format!("n{id}"));
        card.id = id;
        card
    }

    #[test]
    fn test_sort_and_paginate() {
        let cards = vec![card(3, 1), card(1, 3), card(2, 2)];

        let page = PageRequest::new(0, 10, CardSort::IdAsc).unwrap();
        let ids: Vec<_> = sort_and_paginate(cards.clone(), page).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let page = PageRequest::new(0, 10, CardSort::IdDesc).unwrap();
        let ids: Vec<_> = sort_and_paginate(cards.clone(), page).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        let page = PageRequest::new(0, 10, CardSort::ExpiresAsc).unwrap();
        let ids: Vec<_> = sort_and_paginate(cards.clone(), page).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        let page = PageRequest::new(1, 2, CardSort::IdAsc).unwrap();
        let ids: Vec<_> = sort_and_paginate(cards, page).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_page_past_the_end_is_empty() {
        let page = PageRequest::new(5, 10, CardSort::IdAsc).unwrap();
        assert!(sort_and_paginate(vec![card(1, 1)], page).is_empty());
    }
}
