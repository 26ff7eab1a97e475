//! Durable storage for interactions and shopping lists.
//!
//! The engine only depends on the two traits; [`SledStore`] is the embedded key-value
//! implementation used by the binaries. Values are bincode-encoded and come back
//! exactly as they were written.

use crate::error::StoreError;
use crate::models::Interaction;
use crate::shopping::ShoppingList;
use std::path::Path;

pub trait InteractionStore: Send + Sync {
    fn record(&self, interaction: &Interaction) -> Result<(), StoreError>;

    /// Interactions for `user_id`, most recent first.
    fn interactions_for(&self, user_id: &str) -> Result<Vec<Interaction>, StoreError>;
}

pub trait ShoppingListStore: Send + Sync {
    fn save_list(&self, list: &ShoppingList) -> Result<u64, StoreError>;
    fn get_list(&self, id: u64) -> Result<Option<ShoppingList>, StoreError>;
    fn update_list(&self, id: u64, list: &ShoppingList) -> Result<(), StoreError>;

    /// Lists owned by `user_id`, newest first.
    fn lists_for_user(&self, user_id: &str) -> Result<Vec<(u64, ShoppingList)>, StoreError>;

    /// Returns `false` if there was no such list.
    fn delete_list(&self, id: u64) -> Result<bool, StoreError>;
}

pub struct SledStore {
    db: sled::Db,
    interactions: sled::Tree,
    lists: sled::Tree,
    // user \0 list-id -> ()
    user_lists: sled::Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::from_db(sled::open(path)?)
    }

    /// Store that lives only as long as the process.
    pub fn temporary() -> Result<Self, StoreError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self, StoreError> {
        let interactions = db.open_tree("interactions")?;
        let lists = db.open_tree("shopping_lists")?;
        let user_lists = db.open_tree("user_shopping_lists")?;
        Ok(Self { db, interactions, lists, user_lists })
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

fn user_prefix(user_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(user_id.len() + 1);
    key.extend_from_slice(user_id.as_bytes());
    key.push(0);
    key
}

/// `user \0 timestamp recipe`, with the timestamp encoded so byte order is time order.
fn interaction_key(i: &Interaction) -> Vec<u8> {
    let mut key = user_prefix(&i.user_id);
    let nanos = (i.timestamp.unix_timestamp_nanos() as u128) ^ (1u128 << 127);
    key.extend_from_slice(&nanos.to_be_bytes());
    key.extend_from_slice(i.recipe_id.as_bytes());
    key
}

fn owner_key(user_id: &str, id: u64) -> Vec<u8> {
    let mut key = user_prefix(user_id);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

impl SledStore {
    fn index_owner(&self, id: u64, list: &ShoppingList) -> Result<(), StoreError> {
        if let Some(user_id) = &list.user_id {
            self.user_lists.insert(owner_key(user_id, id), Vec::<u8>::new())?;
        }
        Ok(())
    }

    fn unindex_owner(&self, id: u64, list: &ShoppingList) -> Result<(), StoreError> {
        if let Some(user_id) = &list.user_id {
            self.user_lists.remove(owner_key(user_id, id))?;
        }
        Ok(())
    }
}

impl InteractionStore for SledStore {
    fn record(&self, interaction: &Interaction) -> Result<(), StoreError> {
        let bytes = bincode::serialize(interaction)?;
        self.interactions.insert(interaction_key(interaction), bytes)?;
        Ok(())
    }

    fn interactions_for(&self, user_id: &str) -> Result<Vec<Interaction>, StoreError> {
        let mut out = Vec::new();
        for entry in self.interactions.scan_prefix(user_prefix(user_id)).rev() {
            let (_, value) = entry?;
            out.push(bincode::deserialize(&value)?);
        }
        Ok(out)
    }
}

impl ShoppingListStore for SledStore {
    fn save_list(&self, list: &ShoppingList) -> Result<u64, StoreError> {
        let id = self.db.generate_id()?;
        self.lists.insert(id.to_be_bytes(), bincode::serialize(list)?)?;
        self.index_owner(id, list)?;
        Ok(id)
    }

    fn get_list(&self, id: u64) -> Result<Option<ShoppingList>, StoreError> {
        match self.lists.get(id.to_be_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn update_list(&self, id: u64, list: &ShoppingList) -> Result<(), StoreError> {
        let previous: ShoppingList = match self.lists.get(id.to_be_bytes())? {
            Some(bytes) => bincode::deserialize(&bytes)?,
            None => return Err(StoreError::ListNotFound(id)),
        };
        self.lists.insert(id.to_be_bytes(), bincode::serialize(list)?)?;
        if previous.user_id != list.user_id {
            self.unindex_owner(id, &previous)?;
            self.index_owner(id, list)?;
        }
        Ok(())
    }

    fn lists_for_user(&self, user_id: &str) -> Result<Vec<(u64, ShoppingList)>, StoreError> {
        let mut out = Vec::new();
        for entry in self.user_lists.scan_prefix(user_prefix(user_id)).rev() {
            let (key, _) = entry?;
            let Ok(raw) = <[u8; 8]>::try_from(&key[key.len().saturating_sub(8)..]) else { continue };
            let id = u64::from_be_bytes(raw);
            if let Some(list) = self.get_list(id)? {
                out.push((id, list));
            }
        }
        Ok(out)
    }

    fn delete_list(&self, id: u64) -> Result<bool, StoreError> {
        match self.lists.remove(id.to_be_bytes())? {
            Some(bytes) => {
                let list: ShoppingList = bincode::deserialize(&bytes)?;
                self.unindex_owner(id, &list)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
