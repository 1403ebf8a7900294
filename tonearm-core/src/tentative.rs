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

//! Optimistic local updates with a compensating rollback.
//!
//! The local copy is changed first so it can be shown right away; the remote
//! write runs second and a failure puts the previous snapshot back.

use std::future::Future;

/// Apply `mutate` to `state`, then run `commit` with the new value.
///
/// On `Err` the pre-mutation snapshot is restored and the error returned.
pub async fn apply_tentatively<T, M, C, Fut, E>(state: &mut T, mutate: M, commit: C) -> Result<(), E>
where
    T: Clone,
    M: FnOnce(&mut T),
    C: FnOnce(T) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let snapshot = state.clone();
    mutate(state);

    match commit(state.clone()).await {
        Ok(()) => Ok(()),
        Err(e) => {
            *state = snapshot;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: i64,
        is_active: bool,
    }

    #[test]
    fn test_commit_success_keeps_mutation() {
        let mut row = Row { id: 1, is_active: false };
        let result: Result<(), String> = block_on(apply_tentatively(
            &mut row,
            |row| row.is_active = !row.is_active,
            |row| async move {
                assert!(row.is_active);
                Ok(())
            },
        ));
        assert!(result.is_ok());
        assert!(row.is_active);
    }

    #[test]
    fn test_commit_failure_restores_snapshot() {
        let mut row = Row { id: 1, is_active: true };
        let result = block_on(apply_tentatively(
            &mut row,
            |row| row.is_active = !row.is_active,
            |_| async { Err("permission denied".to_string()) },
        ));
        assert_eq!(result, Err("permission denied".to_string()));
        assert_eq!(row, Row { id: 1, is_active: true });
    }

    #[test]
    fn test_rollback_covers_whole_list() {
        let mut rows = vec![Row { id: 1, is_active: true }, Row { id: 2, is_active: false }];
        let result = block_on(apply_tentatively(
            &mut rows,
            |rows| {
                if let Some(row) = rows.iter_mut().find(|row| row.id == 2) {
                    row.is_active = true;
                }
            },
            |_| async { Err::<(), _>("offline") },
        ));
        assert!(result.is_err());
        assert!(!rows[1].is_active);
    }
}
