// ============================================================================
// Order Record Store
// Exclusive-mutator record storage with transferable record ownership
// ============================================================================

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::domain::{Address, Order, OrderId};

/// Errors surfaced by store operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Mutating entry point called by someone other than the authorized
    /// mutator, or a transfer attempted by a non-owner
    NotAuthorized,
    /// `create` called with an id that already has a record
    AlreadyExists,
    /// `destroy`/`update`/`transfer` called for an id with no owner
    NoSuchRecord,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotAuthorized => write!(f, "caller is not authorized for this record"),
            StoreError::AlreadyExists => write!(f, "a record already exists under this id"),
            StoreError::NoSuchRecord => write!(f, "no record exists under this id"),
        }
    }
}

impl std::error::Error for StoreError {}

struct Record {
    /// Current holder of the record; the authority for cancel/modify rights,
    /// independent of the `owner` field inside the payload.
    owner: Address,
    order: Order,
}

/// One record per live order, each bound to an exclusive current owner.
///
/// Field mutations (`create`/`destroy`/`update`) are gated to the single
/// authorized mutator fixed at construction; ownership transfer follows the
/// usual transferable-certificate discipline and is driven by the record's
/// current owner. Reads are open to anyone and side-effect free.
pub struct OrderStore {
    /// The one identity allowed to mutate record fields (the coordinator).
    authorized: Address,
    records: Arc<RwLock<HashMap<OrderId, Record>>>,
}

impl OrderStore {
    pub fn new(authorized: Address) -> Self {
        Self {
            authorized,
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn gate(&self, caller: Address) -> Result<(), StoreError> {
        if caller != self.authorized {
            return Err(StoreError::NotAuthorized);
        }
        Ok(())
    }

    /// Register a new record under `id`, owned by `record_owner`.
    pub fn create(
        &self,
        caller: Address,
        record_owner: Address,
        id: OrderId,
        order: Order,
    ) -> Result<(), StoreError> {
        self.gate(caller)?;
        let mut records = self.records.write();
        if records.contains_key(&id) {
            return Err(StoreError::AlreadyExists);
        }
        records.insert(
            id,
            Record {
                owner: record_owner,
                order,
            },
        );
        Ok(())
    }

    /// Remove the record and clear its ownership association.
    pub fn destroy(&self, caller: Address, id: OrderId) -> Result<(), StoreError> {
        self.gate(caller)?;
        self.records
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NoSuchRecord)
    }

    /// Replace the stored order fields for an existing record.
    pub fn update(&self, caller: Address, id: OrderId, order: Order) -> Result<(), StoreError> {
        self.gate(caller)?;
        let mut records = self.records.write();
        let record = records.get_mut(&id).ok_or(StoreError::NoSuchRecord)?;
        record.order = order;
        Ok(())
    }

    /// Reassign the record to `to`. Only the current record owner may do
    /// this; the stored order fields are untouched.
    pub fn transfer(&self, caller: Address, id: OrderId, to: Address) -> Result<(), StoreError> {
        let mut records = self.records.write();
        let record = records.get_mut(&id).ok_or(StoreError::NoSuchRecord)?;
        if record.owner != caller {
            return Err(StoreError::NotAuthorized);
        }
        record.owner = to;
        Ok(())
    }

    /// Read the stored record. Returns the all-zero sentinel when no record
    /// exists under `id`.
    pub fn read(&self, id: OrderId) -> Order {
        self.records
            .read()
            .get(&id)
            .map(|record| record.order)
            .unwrap_or_default()
    }

    /// Current owner of the record, if it exists.
    pub fn owner_of(&self, id: OrderId) -> Option<Address> {
        self.records.read().get(&id).map(|record| record.owner)
    }

    pub fn contains(&self, id: OrderId) -> bool {
        self.records.read().contains_key(&id)
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
