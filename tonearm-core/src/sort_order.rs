// Tonearm - Content management and storefront backend for hi-fi brands
// Copyright (C) 2025 Tonearm Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::record::Sortable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

impl FromStr for MoveDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(MoveDirection::Up),
            "down" => Ok(MoveDirection::Down),
            other => Err(format!("Unknown direction: {}", other)),
        }
    }
}

/// New `sort_order` values for the two rows trading places
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSwap {
    pub moved: (i64, i32),
    pub neighbour: (i64, i32),
}

/// Plan a move of `id` one step in `direction` within `items`, which must be
/// in display order.
///
/// The two rows exchange their current `sort_order` values; nothing else is
/// renumbered, so gaps and duplicate values survive. Returns `None` when the
/// row is missing or already at the edge.
pub fn plan_move<T: Sortable>(items: &[T], id: i64, direction: MoveDirection) -> Option<SortSwap> {
    let index = items.iter().position(|item| item.id() == Some(id))?;
    let neighbour_index = match direction {
        MoveDirection::Up => index.checked_sub(1)?,
        MoveDirection::Down => {
            let next = index + 1;
            if next >= items.len() {
                return None;
            }
            next
        }
    };

    let moved = &items[index];
    let neighbour = &items[neighbour_index];
    Some(SortSwap {
        moved: (id, neighbour.sort_order()),
        neighbour: (neighbour.id()?, moved.sort_order()),
    })
}

/// Apply a planned swap to a locally held list and restore display order
pub fn apply_swap<T: Sortable>(items: &mut [T], swap: SortSwap) {
    for item in items.iter_mut() {
        if item.id() == Some(swap.moved.0) {
            item.set_sort_order(swap.moved.1);
        } else if item.id() == Some(swap.neighbour.0) {
            item.set_sort_order(swap.neighbour.1);
        }
    }
    items.sort_by_key(|item| item.sort_order());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Faq;

    fn faq(id: i64, sort_order: i32) -> Faq {
        let mut faq = Faq::new(format!("Question {}", id), "Answer".to_string());
        faq.id = Some(id);
        faq.sort_order = sort_order;
        faq
    }

    #[test]
    fn test_move_up_swaps_values_with_previous() {
        let items = vec![faq(1, 10), faq(2, 20), faq(3, 30)];
        let swap = plan_move(&items, 2, MoveDirection::Up).unwrap();
        assert_eq!(swap.moved, (2, 10));
        assert_eq!(swap.neighbour, (1, 20));
    }

    #[test]
    fn test_move_down_swaps_values_with_next() {
        let items = vec![faq(1, 0), faq(2, 5), faq(3, 9)];
        let swap = plan_move(&items, 2, MoveDirection::Down).unwrap();
        assert_eq!(swap.moved, (2, 9));
        assert_eq!(swap.neighbour, (3, 5));
    }

    #[test]
    fn test_move_at_edges_is_noop() {
        let items = vec![faq(1, 0), faq(2, 1)];
        assert_eq!(plan_move(&items, 1, MoveDirection::Up), None);
        assert_eq!(plan_move(&items, 2, MoveDirection::Down), None);
        assert_eq!(plan_move(&items, 99, MoveDirection::Up), None);
    }

    #[test]
    fn test_duplicate_values_are_preserved() {
        let items = vec![faq(1, 4), faq(2, 4), faq(3, 7)];
        let swap = plan_move(&items, 2, MoveDirection::Up).unwrap();
        assert_eq!(swap.moved, (2, 4));
        assert_eq!(swap.neighbour, (1, 4));
    }

    #[test]
    fn test_apply_swap_reorders_locally() {
        let mut items = vec![faq(1, 10), faq(2, 20), faq(3, 30)];
        let swap = plan_move(&items, 3, MoveDirection::Up).unwrap();
        apply_swap(&mut items, swap);
        let ids: Vec<_> = items.iter().filter_map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
        assert_eq!(items[1].sort_order, 20);
        assert_eq!(items[2].sort_order, 30);
    }

    #[test]
    fn test_direction_from_str() {
        assert_eq!("up".parse(), Ok(MoveDirection::Up));
        assert_eq!("down".parse(), Ok(MoveDirection::Down));
        assert!("left".parse::<MoveDirection>().is_err());
    }
}
