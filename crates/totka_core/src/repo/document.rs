//! Typed JSON documents on top of `KeyValueStore`.
//!
//! Loading never fails: a missing key, a storage error or undecodable JSON
//! all yield `T::default()` and a warning event. Saving reports failures to
//! the caller after logging them.

use crate::model::history::HistoryLog;
use crate::model::medicine::Medicine;
use crate::repo::kv_store::{KeyValueStore, StoreKey, StoreResult};
use log::{error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Loads and decodes one document, degrading to the empty default.
pub fn load_document<T, S>(store: &S, key: StoreKey) -> T
where
    T: DeserializeOwned + Default,
    S: KeyValueStore + ?Sized,
{
    let raw = match store.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(err) => {
            warn!(
                "event=document_load module=repo status=degraded key={key} error_code=read_failed error={err}"
            );
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            warn!(
                "event=document_load module=repo status=degraded key={key} error_code=decode_failed error={err}"
            );
            T::default()
        }
    }
}

/// Encodes and writes one document, replacing the previous value.
pub fn save_document<T, S>(store: &S, key: StoreKey, value: &T) -> StoreResult<()>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let result: StoreResult<()> = serde_json::to_string(value)
        .map_err(Into::into)
        .and_then(|raw| store.write(key, &raw));

    if let Err(err) = &result {
        error!("event=document_save module=repo status=error key={key} error={err}");
    }
    result
}

pub fn load_medicines<S: KeyValueStore + ?Sized>(store: &S) -> Vec<Medicine> {
    load_document(store, StoreKey::Medicines)
}

pub fn save_medicines<S: KeyValueStore + ?Sized>(
    store: &S,
    medicines: &[Medicine],
) -> StoreResult<()> {
    save_document(store, StoreKey::Medicines, medicines)
}

pub fn load_history<S: KeyValueStore + ?Sized>(store: &S) -> HistoryLog {
    load_document(store, StoreKey::History)
}

pub fn save_history<S: KeyValueStore + ?Sized>(store: &S, history: &HistoryLog) -> StoreResult<()> {
    save_document(store, StoreKey::History, history)
}

/// Removes every document (factory reset). Stops at the first failure.
pub fn clear_all<S: KeyValueStore + ?Sized>(store: &S) -> StoreResult<()> {
    for key in StoreKey::ALL {
        if let Err(err) = store.remove(key) {
            error!("event=document_clear module=repo status=error key={key} error={err}");
            return Err(err);
        }
    }
    Ok(())
}
