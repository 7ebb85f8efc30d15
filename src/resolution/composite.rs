//! Composite synthesis and group commit.

use serde::{Deserialize, Serialize};

use crate::resolution::linkage::Group;
use crate::restaurant::{NewRestaurant, Restaurant, RestaurantId};
use crate::storage::{GroupCommit, RecordStore, StorageError};

/// Longest value by character count; the first one wins ties.
fn longest<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for value in values.into_iter().flatten() {
        let len = value.chars().count();
        if best.map_or(true, |(_, best_len)| len > best_len) {
            best = Some((value, len));
        }
    }
    best.map(|(value, _)| value.to_string())
}

fn first<T: Copy>(values: impl IntoIterator<Item = Option<T>>) -> Option<T> {
    values.into_iter().flatten().next()
}

/// Reduces a group to one canonical record.
///
/// String attributes take the longest member value, numeric attributes the
/// first non-null one, both in group order. The result is marked resolved.
#[must_use]
pub fn composite_of(members: &[Restaurant]) -> NewRestaurant {
    let text = |f: fn(&Restaurant) -> Option<&str>| longest(members.iter().map(f));
    NewRestaurant {
        name: text(|r| Some(r.name.as_str())).unwrap_or_default(),
        facility_type: text(|r| r.facility_type.as_deref()),
        address: text(|r| r.address.as_deref()),
        city: text(|r| r.city.as_deref()),
        state: text(|r| r.state.as_deref()),
        zip: text(|r| r.zip.as_deref()),
        latitude: first(members.iter().map(|r| r.latitude)),
        longitude: first(members.iter().map(|r| r.longitude)),
        resolved: true,
    }
}

/// What committing a group did to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SynthesisOutcome {
    /// A lone row was marked resolved; no composite was created.
    Singleton { id: RestaurantId },
    /// A composite was created and absorbed the listed rows.
    Merged {
        composite: RestaurantId,
        absorbed: Vec<RestaurantId>,
    },
}

/// Commits one group.
///
/// A singleton is only marked resolved. A larger group becomes a composite
/// through [`RecordStore::commit_group`], which applies every write or none.
pub fn synthesize(store: &dyn RecordStore, group: &Group) -> Result<SynthesisOutcome, StorageError> {
    if group.is_singleton() {
        store.mark_resolved(group.anchor)?;
        return Ok(SynthesisOutcome::Singleton { id: group.anchor });
    }
    let absorbed = group.member_ids();
    let composite = store.commit_group(GroupCommit {
        composite: composite_of(&group.members),
        members: absorbed.clone(),
    })?;
    Ok(SynthesisOutcome::Merged { composite, absorbed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryStores, LinkStore, RestaurantStore};

    fn member(id: i64, name: &str, address: Option<&str>, lat: Option<f64>) -> Restaurant {
        let new = NewRestaurant {
            address: address.map(str::to_string),
            city: Some("Chicago".to_string()),
            state: Some("IL".to_string()),
            latitude: lat,
            ..NewRestaurant::named(name)
        };
        Restaurant::from_new(RestaurantId::new(id), new)
    }

    #[test]
    fn longest_string_wins_and_ties_keep_first() {
        let members = vec![
            member(1, "Kims Diner", Some("100 W Randolph St"), None),
            member(2, "Kim's Diner", Some("100 W Randolph"), Some(41.88)),
            member(3, "Kim's Dinor", None, Some(41.99)),
        ];
        let composite = composite_of(&members);
        assert_eq!(composite.name, "Kim's Diner");
        assert_eq!(composite.address.as_deref(), Some("100 W Randolph St"));
        assert_eq!(composite.latitude, Some(41.88));
        assert_eq!(composite.longitude, None);
        assert!(composite.resolved);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let members = vec![member(1, "Café", None, None), member(2, "Cafe!", None, None)];
        assert_eq!(composite_of(&members).name, "Cafe!");
    }

    #[test]
    fn singleton_is_marked_resolved_without_composite() {
        let store = InMemoryStores::new();
        let id = store
            .insert_restaurant(NewRestaurant::named("Alinea"))
            .unwrap();
        let row = store.get_restaurant(id).unwrap().unwrap();
        let outcome = synthesize(
            &store,
            &Group {
                anchor: id,
                members: vec![row],
            },
        )
        .unwrap();

        assert_eq!(outcome, SynthesisOutcome::Singleton { id });
        assert_eq!(store.count_restaurants().unwrap(), 1);
        assert!(store.get_restaurant(id).unwrap().unwrap().resolved);
        assert!(store.find_links().unwrap().is_empty());
    }

    #[test]
    fn merged_group_returns_composite_id() {
        let store = InMemoryStores::new();
        let a = store.insert_restaurant(NewRestaurant::named("Kims Diner")).unwrap();
        let b = store.insert_restaurant(NewRestaurant::named("Kim's Diner")).unwrap();
        let members = vec![
            store.get_restaurant(a).unwrap().unwrap(),
            store.get_restaurant(b).unwrap().unwrap(),
        ];
        let outcome = synthesize(&store, &Group { anchor: a, members }).unwrap();

        let SynthesisOutcome::Merged { composite, absorbed } = outcome else {
            panic!("expected a merge");
        };
        assert_eq!(absorbed, vec![a, b]);
        assert_eq!(store.get_restaurant(composite).unwrap().unwrap().name, "Kim's Diner");
        assert_eq!(store.find_primary(a).unwrap(), Some(composite));
    }
}
