//! Property tests for the catalog pipeline and pagination.

#![allow(clippy::unwrap_used)]

use club_portal_core::catalog::{self, Availability, CatalogFilter, DateBucket, SortKey};
use club_portal_core::environment::Clock;
use club_portal_core::pagination::{page, page_count};
use club_portal_testing::{properties, test_clock};
use proptest::prelude::*;

fn sort_key() -> impl Strategy<Value = SortKey> {
    prop_oneof![
        Just(SortKey::DateAsc),
        Just(SortKey::DateDesc),
        Just(SortKey::PriceLowToHigh),
        Just(SortKey::PriceHighToLow),
    ]
}

proptest! {
    #[test]
    fn filtered_tickets_all_match_and_none_are_lost(
        tickets in properties::tickets(30),
        upcoming in any::<bool>(),
        available in any::<bool>(),
        sort in sort_key(),
    ) {
        let now = test_clock().now();
        let filter = CatalogFilter {
            date_bucket: if upcoming { DateBucket::Upcoming } else { DateBucket::Past },
            availability: if available { Availability::Available } else { Availability::SoldOut },
            sort,
            ..CatalogFilter::default()
        };

        let result = catalog::apply(&tickets, &filter, now);

        prop_assert!(result.iter().all(|t| filter.matches(t, now)));
        let expected = tickets.iter().filter(|t| filter.matches(t, now)).count();
        prop_assert_eq!(result.len(), expected);
    }

    #[test]
    fn price_sort_is_ordered(tickets in properties::tickets(30)) {
        let filter = CatalogFilter {
            sort: SortKey::PriceLowToHigh,
            ..CatalogFilter::default()
        };
        let result = catalog::apply(&tickets, &filter, test_clock().now());
        prop_assert!(result.windows(2).all(|pair| pair[0].price <= pair[1].price));
    }

    #[test]
    fn pages_partition_the_list(len in 0_usize..100, page_size in 1_usize..12) {
        let items: Vec<usize> = (0..len).collect();
        let pages = page_count(len, page_size);

        let rejoined: Vec<usize> = (1..=pages)
            .flat_map(|n| page(&items, n, page_size).to_vec())
            .collect();

        prop_assert_eq!(rejoined, items);
        prop_assert!(page(&(0..len).collect::<Vec<_>>(), pages + 1, page_size).is_empty());
    }
}
