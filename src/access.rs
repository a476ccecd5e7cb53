use std::collections::HashMap;

/// Allow-list of chat ids that may talk to the bot, together with the name
/// each id signs entries with.
#[derive(Debug, Clone, Default)]
pub struct AccessGuard {
    users: HashMap<u64, String>,
}

impl AccessGuard {
    pub fn new(users: impl IntoIterator<Item = (u64, String)>) -> Self {
        Self {
            users: users.into_iter().collect(),
        }
    }

    pub fn is_authorized(&self, id: u64) -> bool {
        self.users.contains_key(&id)
    }

    pub fn name(&self, id: u64) -> Option<&str> {
        self.users.get(&id).map(String::as_str)
    }

    /// Uppercased first letter of the user's name. Entries are signed with
    /// this instead of the full name.
    pub fn initial(&self, id: u64) -> Option<String> {
        let name = self.users.get(&id)?;
        let first = name.chars().next()?;
        Some(first.to_uppercase().collect())
    }

    /// Everyone on the list, for the startup announcement.
    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.users.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
