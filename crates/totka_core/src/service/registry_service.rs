//! Medicine registry: CRUD over the medicine list document.
//!
//! The registry knows nothing about alerts. Callers that delete or edit a
//! medicine are responsible for reconciling its scheduled alerts.

use crate::model::medicine::{normalize_times, Medicine, MedicineId, ValidationError};
use crate::repo::document::{load_medicines, save_medicines};
use crate::repo::kv_store::{KeyValueStore, StoreError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum RegistryError {
    Validation(ValidationError),
    Storage(StoreError),
    NotFound(MedicineId),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "medicine not found: {id}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::NotFound(_) => None,
        }
    }
}

impl From<ValidationError> for RegistryError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for RegistryError {
    fn from(value: StoreError) -> Self {
        Self::Storage(value)
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

pub struct MedicineRegistry<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> MedicineRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Validates and appends a new medicine.
    ///
    /// # Contract
    /// - Blank names fail with `ValidationError::EmptyName`.
    /// - Invalid times are dropped; none left fails with `NoValidTimes`.
    /// - Validation failures never touch the store.
    pub fn add<T: AsRef<str>>(&self, name: &str, raw_times: &[T]) -> RegistryResult<Medicine> {
        let medicine = Medicine::new(name, raw_times).map_err(|err| {
            warn!("event=medicine_add module=registry status=rejected reason={err}");
            err
        })?;

        let mut medicines = load_medicines(&self.store);
        medicines.push(medicine.clone());
        save_medicines(&self.store, &medicines)?;

        info!(
            "event=medicine_add module=registry status=ok medicine_id={} times={}",
            medicine.id,
            medicine.times.len()
        );
        Ok(medicine)
    }

    /// Removes a medicine. Unknown ids are a no-op and skip the write.
    pub fn delete(&self, id: MedicineId) -> RegistryResult<()> {
        let mut medicines = load_medicines(&self.store);
        let before = medicines.len();
        medicines.retain(|medicine| medicine.id != id);
        if medicines.len() == before {
            return Ok(());
        }

        save_medicines(&self.store, &medicines)?;
        info!("event=medicine_delete module=registry status=ok medicine_id={id}");
        Ok(())
    }

    /// Lists medicines oldest-added first.
    pub fn list(&self) -> Vec<Medicine> {
        load_medicines(&self.store)
    }

    pub fn get(&self, id: MedicineId) -> Option<Medicine> {
        load_medicines(&self.store)
            .into_iter()
            .find(|medicine| medicine.id == id)
    }

    /// Replaces the intake times of an existing medicine.
    pub fn update_times<T: AsRef<str>>(
        &self,
        id: MedicineId,
        raw_times: &[T],
    ) -> RegistryResult<Medicine> {
        let times = normalize_times(raw_times)?;
        let mut medicines = load_medicines(&self.store);
        let medicine = medicines
            .iter_mut()
            .find(|medicine| medicine.id == id)
            .ok_or(RegistryError::NotFound(id))?;
        medicine.times = times;
        let updated = medicine.clone();

        save_medicines(&self.store, &medicines)?;
        info!(
            "event=medicine_update module=registry status=ok medicine_id={id} times={}",
            updated.times.len()
        );
        Ok(updated)
    }
}
