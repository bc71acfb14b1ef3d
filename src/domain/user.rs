use crate::domain::model::UserId;
use crate::utils::error::{RecordsError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Professor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Professor => "Professor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
}

impl User {
    pub fn role_string(&self) -> &'static str {
        self.role.as_str()
    }

    pub fn display_info(&self) -> String {
        format!("{}: {} (ID: {})", self.role, self.name, self.id)
    }

    pub fn check_password(&self, password: &str, salt: &str) -> bool {
        self.password_hash == hash_password(password, salt)
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    pub fn is_professor(&self) -> bool {
        self.role == Role::Professor
    }
}

/// Hex encoded SHA-256 of the password followed by the salt.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

/// Users keyed by login name, plus the id counter new registrations draw from.
#[derive(Debug, Clone)]
pub struct UserRegistry {
    users: BTreeMap<String, User>,
    next_id: UserId,
    salt: String,
}

impl UserRegistry {
    pub fn new(salt: impl Into<String>) -> Self {
        Self {
            users: BTreeMap::new(),
            next_id: 1,
            salt: salt.into(),
        }
    }

    pub fn next_id(&self) -> UserId {
        self.next_id
    }

    /// Makes sure `id` is never handed out again.
    pub fn advance_to(&mut self, id: UserId) {
        if id >= self.next_id {
            self.next_id = id + 1;
        }
    }

    /// Restores the stored counter; it never moves backwards.
    pub fn set_next_id(&mut self, next_id: UserId) {
        self.next_id = self.next_id.max(next_id);
    }

    pub fn register(&mut self, name: &str, password: &str, role: Role) -> Result<&User> {
        if name.trim().is_empty() {
            return Err(RecordsError::ValidationError {
                message: "user name cannot be empty".to_string(),
            });
        }
        if self.users.contains_key(name) {
            return Err(RecordsError::DuplicateUser {
                name: name.to_string(),
            });
        }

        let user = User {
            id: self.next_id,
            name: name.to_string(),
            password_hash: hash_password(password, &self.salt),
            role,
        };
        self.next_id += 1;

        tracing::info!("Registered {} '{}' with id {}", role, user.name, user.id);
        Ok(self.users.entry(name.to_string()).or_insert(user))
    }

    /// Adds a user read back from storage, keeping its id and hash.
    pub fn restore(&mut self, user: User) {
        self.advance_to(user.id);
        self.users.insert(user.name.clone(), user);
    }

    pub fn authenticate(&self, name: &str, password: &str) -> Result<&User> {
        let user = self
            .users
            .get(name)
            .ok_or_else(|| RecordsError::not_found("user", name))?;

        if user.check_password(password, &self.salt) {
            Ok(user)
        } else {
            Err(RecordsError::WrongPassword {
                name: name.to_string(),
            })
        }
    }

    pub fn by_id(&self, id: UserId) -> Option<&User> {
        self.users.values().find(|u| u.id == id)
    }

    pub fn student(&self, id: UserId) -> Result<&User> {
        self.by_id(id)
            .filter(|u| u.is_student())
            .ok_or_else(|| RecordsError::not_found("student", id.to_string()))
    }

    pub fn professor(&self, id: UserId) -> Result<&User> {
        self.by_id(id)
            .filter(|u| u.is_professor())
            .ok_or_else(|| RecordsError::not_found("professor", id.to_string()))
    }

    /// All users ordered by id.
    pub fn users(&self) -> Vec<&User> {
        let mut users: Vec<&User> = self.users.values().collect();
        users.sort_by_key(|u| u.id);
        users
    }

    pub fn students(&self) -> Vec<&User> {
        self.users().into_iter().filter(|u| u.is_student()).collect()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_sequential_ids() {
        let mut registry = UserRegistry::new("salt");
        let ana = registry.register("Ana", "pw", Role::Student).unwrap().id;
        let bob = registry.register("Bob", "pw", Role::Professor).unwrap().id;
        assert_eq!((ana, bob), (1, 2));
        assert_eq!(registry.next_id(), 3);
    }

    #[test]
    fn test_register_rejects_duplicate_names() {
        let mut registry = UserRegistry::new("salt");
        registry.register("Ana", "pw", Role::Student).unwrap();
        let err = registry.register("Ana", "other", Role::Professor).unwrap_err();
        assert!(matches!(err, RecordsError::DuplicateUser { .. }));
        assert_eq!(registry.next_id(), 2);
    }

    #[test]
    fn test_restore_advances_counter() {
        let mut registry = UserRegistry::new("salt");
        registry.restore(User {
            id: 41,
            name: "Old".to_string(),
            password_hash: hash_password("pw", "salt"),
            role: Role::Student,
        });
        assert_eq!(registry.next_id(), 42);

        registry.restore(User {
            id: 3,
            name: "Older".to_string(),
            password_hash: String::new(),
            role: Role::Student,
        });
        assert_eq!(registry.next_id(), 42);
        assert_eq!(registry.register("New", "pw", Role::Student).unwrap().id, 42);
    }

    #[test]
    fn test_authenticate() {
        let mut registry = UserRegistry::new("salt");
        registry.register("Ana", "secret", Role::Student).unwrap();

        assert_eq!(registry.authenticate("Ana", "secret").unwrap().name, "Ana");
        assert!(matches!(
            registry.authenticate("Ana", "nope"),
            Err(RecordsError::WrongPassword { .. })
        ));
        assert!(matches!(
            registry.authenticate("Nobody", "secret"),
            Err(RecordsError::NotFound { .. })
        ));
    }

    #[test]
    fn test_hash_depends_on_salt() {
        assert_ne!(hash_password("pw", "a"), hash_password("pw", "b"));
        assert_eq!(hash_password("pw", "a").len(), 64);
    }

    #[test]
    fn test_role_lookups() {
        let mut registry = UserRegistry::new("salt");
        registry.register("Ana", "pw", Role::Student).unwrap();
        registry.register("Bob", "pw", Role::Professor).unwrap();
        assert!(registry.student(1).is_ok());
        assert!(registry.student(2).is_err());
        assert!(registry.professor(2).is_ok());
        assert_eq!(registry.students().len(), 1);
        assert_eq!(registry.by_id(2).unwrap().display_info(), "Professor: Bob (ID: 2)");
    }
}
