use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use super::{EmployeeStore, Listing, StoreError, UserStore, Window};
use crate::filters::employee::EmployeeFilter;
use crate::models::employee::{Employee, EmployeeChanges, NewEmployee};
use crate::models::user::User;

#[derive(Default)]
struct Tables {
    employees: BTreeMap<i64, Employee>,
    last_id: i64,
    users: Vec<User>,
}

/// Process-local store. Every operation runs under a single lock, so the
/// email check and the write it guards cannot interleave with another write.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.employees
            .values()
            .any(|e| e.email == email && Some(e.id) != except)
    }
}

#[async_trait]
impl EmployeeStore for MemoryStore {
    async fn create(&self, employee: NewEmployee) -> Result<Employee, StoreError> {
        let mut tables = self.lock();
        if tables.email_taken(&employee.email, None) {
            return Err(StoreError::DuplicateEmail);
        }

        tables.last_id += 1;
        let now = Utc::now();
        let created = Employee {
            id: tables.last_id,
            name: employee.name,
            email: employee.email,
            department: employee.department,
            gender: employee.gender,
            birthdate: employee.birthdate,
            hire_date: employee.hire_date,
            created: now,
            updated: now,
        };
        tables.employees.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: i64) -> Result<Employee, StoreError> {
        self.lock()
            .employees
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, id: i64, changes: EmployeeChanges) -> Result<Employee, StoreError> {
        let mut tables = self.lock();
        if !tables.employees.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        if let Some(email) = &changes.email {
            if tables.email_taken(email, Some(id)) {
                return Err(StoreError::DuplicateEmail);
            }
        }

        let employee = tables.employees.get_mut(&id).ok_or(StoreError::NotFound)?;
        changes.apply_to(employee);
        employee.updated = Utc::now();
        Ok(employee.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.lock()
            .employees
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self, filter: &EmployeeFilter, window: Window) -> Result<Listing, StoreError> {
        let tables = self.lock();
        let mut matches: Vec<&Employee> = tables
            .employees
            .values()
            .filter(|e| filter.matches(e))
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        Ok(Listing {
            count: matches.len(),
            items: matches
                .into_iter()
                .skip(window.offset)
                .take(window.limit)
                .cloned()
                .collect(),
        })
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut tables = self.lock();
        if tables.users.iter().any(|u| u.username == username) {
            return Err(StoreError::DuplicateUsername);
        }
        let user = User {
            user_id: Uuid::new_v4(),
            username: username.to_string(),
            password: password_hash.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.user_id == user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::employee::Gender;
    use std::sync::Arc;

    const ALL: Window = Window {
        offset: 0,
        limit: usize::MAX,
    };

    fn new_employee(name: &str, email: &str) -> NewEmployee {
        NewEmployee {
            name: name.to_string(),
            email: email.to_string(),
            department: "Development".to_string(),
            gender: Gender::M,
            birthdate: None,
            hire_date: None,
        }
    }

    #[tokio::test]
    async fn created_records_are_retrievable() {
        let store = MemoryStore::new();
        let john = store.create(new_employee("John Doe", "john@x.com")).await.unwrap();
        let jane = store.create(new_employee("Jane Doe", "jane@x.com")).await.unwrap();

        assert_ne!(john.id, jane.id);
        assert_eq!(store.get(john.id).await.unwrap(), john);
        assert_eq!(store.get(jane.id).await.unwrap(), jane);
        assert_eq!(john.created, john.updated);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        store.create(new_employee("John Doe", "test@luizalabs.com")).await.unwrap();
        let err = store
            .create(new_employee("Jane Doe", "test@luizalabs.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));

        // Exact match only: a different casing is a different address.
        store.create(new_employee("Jane Doe", "TEST@luizalabs.com")).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_with_same_email_admit_one() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .create(new_employee(&format!("Worker {}", i), "same@x.com"))
                        .await
                })
            })
            .collect();

        let mut ok = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(StoreError::DuplicateEmail) => duplicates += 1,
                Err(other) => panic!("unexpected error: {}", other),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(duplicates, 15);
    }

    #[tokio::test]
    async fn default_listing_is_ordered_by_name() {
        let store = MemoryStore::new();
        for (name, email) in [
            ("John Doe", "john.doe@luizalabs.com"),
            ("Jane Doe", "jane.doe@luizalabs.com"),
            ("Richard Roe", "richard.roe@luizalabs.com"),
        ] {
            store.create(new_employee(name, email)).await.unwrap();
        }

        let listing = store.list(&EmployeeFilter::default(), ALL).await.unwrap();
        let names: Vec<_> = listing.items.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Jane Doe", "John Doe", "Richard Roe"]);
        assert_eq!(listing.count, 3);
    }

    #[tokio::test]
    async fn listing_window_keeps_total_count() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .create(new_employee(&format!("Person {}", i), &format!("p{}@x.com", i)))
                .await
                .unwrap();
        }
        let listing = store
            .list(&EmployeeFilter::default(), Window { offset: 2, limit: 2 })
            .await
            .unwrap();
        assert_eq!(listing.count, 5);
        let names: Vec<_> = listing.items.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Person 2", "Person 3"]);
    }

    #[tokio::test]
    async fn update_preserves_identity_and_refreshes_timestamp() {
        let store = MemoryStore::new();
        let original = store.create(new_employee("John Doe", "john@x.com")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let changes = EmployeeChanges {
            name: Some("Johnny Doe".to_string()),
            email: Some("johnny@x.com".to_string()),
            ..Default::default()
        };
        let updated = store.update(original.id, changes).await.unwrap();

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.created, original.created);
        assert!(updated.updated > original.updated);
        assert_eq!(updated.name, "Johnny Doe");
        assert_eq!(updated.email, "johnny@x.com");
        assert_eq!(updated.department, original.department);
        assert_eq!(updated.gender, original.gender);
    }

    #[tokio::test]
    async fn update_rejects_email_of_another_record() {
        let store = MemoryStore::new();
        store.create(new_employee("John Doe", "john@x.com")).await.unwrap();
        let jane = store.create(new_employee("Jane Doe", "jane@x.com")).await.unwrap();

        let taken = EmployeeChanges {
            name: Some("Jane Smith".to_string()),
            email: Some("john@x.com".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            store.update(jane.id, taken).await,
            Err(StoreError::DuplicateEmail)
        ));
        // Nothing from the rejected update is applied.
        assert_eq!(store.get(jane.id).await.unwrap().name, "Jane Doe");

        let own = EmployeeChanges {
            email: Some("jane@x.com".to_string()),
            ..Default::default()
        };
        store.update(jane.id, own).await.unwrap();
    }

    #[tokio::test]
    async fn deleted_ids_are_not_reused() {
        let store = MemoryStore::new();
        let first = store.create(new_employee("John Doe", "john@x.com")).await.unwrap();
        store.delete(first.id).await.unwrap();

        assert!(matches!(store.get(first.id).await, Err(StoreError::NotFound)));
        assert!(matches!(store.delete(first.id).await, Err(StoreError::NotFound)));
        assert!(matches!(
            store.update(first.id, EmployeeChanges::default()).await,
            Err(StoreError::NotFound)
        ));

        let second = store.create(new_employee("John Doe", "john@x.com")).await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let store = MemoryStore::new();
        let user = store.create_user("test_user", "hash").await.unwrap();
        assert!(matches!(
            store.create_user("test_user", "other").await,
            Err(StoreError::DuplicateUsername)
        ));
        let found = store.find_user_by_username("test_user").await.unwrap().unwrap();
        assert_eq!(found.user_id, user.user_id);
        assert!(store.find_user(Uuid::new_v4()).await.unwrap().is_none());
    }
}
