//! Ordered conversation list, most recent first

use crate::api::Conversation;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    conversations: Vec<Conversation>,
}

impl Directory {
    pub fn new(conversations: Vec<Conversation>) -> Self {
        Self { conversations }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Replace the whole list with the server's
    pub fn replace_all(&mut self, conversations: Vec<Conversation>) {
        self.conversations = conversations;
    }

    /// Newly created conversations go to the front.
    /// A duplicate id (server list refreshed in between) is moved instead.
    pub fn prepend(&mut self, conversation: Conversation) {
        self.conversations.retain(|c| c.id != conversation.id);
        self.conversations.insert(0, conversation);
    }

    /// Replace the stored entry in place; returns false for unknown ids
    pub fn update(&mut self, conversation: Conversation) -> bool {
        match self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation.id)
        {
            Some(slot) => {
                *slot = conversation;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Conversation> {
        let index = self.conversations.iter().position(|c| c.id == id)?;
        Some(self.conversations.remove(index))
    }

    /// Case-insensitive title filter. Untitled conversations match as "New Chat".
    pub fn search(&self, query: &str) -> Vec<&Conversation> {
        let needle = query.trim().to_lowercase();
        self.conversations
            .iter()
            .filter(|c| c.display_title().to_lowercase().contains(&needle))
            .collect()
    }
}
