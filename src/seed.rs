//! Initial demo data for a fresh store.

use crate::records::Collection;
use serde_json::{json, Value};

/// What `ensure_seed_data` puts into a collection it finds missing
#[derive(Debug, Clone, PartialEq)]
pub enum Seed {
    /// Records inserted when the collection is absent, not an array, or empty
    Records(Vec<Value>),
    /// Empty array inserted when the collection is absent or not an array
    Empty,
    /// Object inserted when the entry is absent or null
    Document(Value),
}

pub fn seed_for(collection: Collection) -> Seed {
    match collection {
        Collection::Projects => Seed::Records(vec![json!({
            "id": "p-1",
            "name": "Residential Complex Phase 1",
            "location": "Mumbai, Maharashtra",
            "budget": 5000000,
            "startDate": "2024-01-05",
            "endDate": "2024-12-31",
            "status": "Active"
        })]),
        Collection::Users => Seed::Records(vec![
            json!({
                "id": "u-admin",
                "name": "Admin User",
                "email": "admin@example.com",
                "role": "admin",
                "salary": 0,
                "phone": "9999999999",
                "dateOfJoining": "2024-01-01",
                "createdAt": "2024-01-01"
            }),
            json!({
                "id": "u-sm-1",
                "name": "Site Manager",
                "email": "manager@example.com",
                "role": "sitemanager",
                "salary": 25000,
                "phone": "8888888888",
                "dateOfJoining": "2024-02-01",
                "createdAt": "2024-02-01",
                "assignedSites": ["p-1"]
            }),
        ]),
        Collection::Labours => Seed::Records(vec![json!({
            "id": "l-1",
            "name": "Ravi",
            "designation": "Helper",
            "dailyWage": 800,
            "assignedSite": "p-1"
        })]),
        Collection::Accounts => Seed::Document(json!({ "capital": 1000000 })),
        _ => Seed::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{validate_value, Project, User};

    #[test]
    fn test_seed_records_match_schemas() {
        for collection in Collection::ALL {
            match seed_for(collection) {
                Seed::Records(records) => {
                    for record in &records {
                        assert!(
                            validate_value(collection, record).is_ok(),
                            "seed record for {} fails validation",
                            collection
                        );
                    }
                }
                Seed::Document(doc) => assert!(validate_value(collection, &doc).is_ok()),
                Seed::Empty => {}
            }
        }
    }

    #[test]
    fn test_seed_shape() {
        let Seed::Records(users) = seed_for(Collection::Users) else {
            panic!("users should seed records");
        };
        let users: Vec<User> = users
            .into_iter()
            .map(|u| serde_json::from_value(u).unwrap())
            .collect();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].assigned_sites, vec!["p-1".to_string()]);

        let Seed::Records(projects) = seed_for(Collection::Projects) else {
            panic!("projects should seed records");
        };
        let project: Project = serde_json::from_value(projects[0].clone()).unwrap();
        assert_eq!(project.id, "p-1");
        assert_eq!(project.budget, 5_000_000.0);

        assert_eq!(seed_for(Collection::Payments), Seed::Empty);
    }
}
