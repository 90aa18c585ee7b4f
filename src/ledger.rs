//! Stock ledger: the only code that moves `Medicine::stock`.
//!
//! It works on the [`StoreTx`] of the enclosing lifecycle transaction and
//! keeps no history, only the current stock figure.
use crate::error::RequestError;
use crate::request::MedicineRequestItem;
use crate::store::StoreTx;
use crate::types::{Medicine, MedicineId, TimeStamp};
use std::collections::BTreeMap;

pub struct StockLedger<'a> {
    tx: &'a mut dyn StoreTx,
}

impl<'a> StockLedger<'a> {
    pub fn new(tx: &'a mut dyn StoreTx) -> Self {
        Self { tx }
    }

    fn load(&self, id: MedicineId) -> Result<Medicine, RequestError> {
        self.tx
            .medicine(id)?
            .ok_or(RequestError::MedicineNotFound(id))
    }

    /// Take `quantity` units out of stock. Fails without writing if that
    /// would leave the stock negative.
    pub fn decrement(&mut self, id: MedicineId, quantity: u64) -> Result<(), RequestError> {
        let mut medicine = self.load(id)?;
        medicine.stock = checked_remaining(&medicine, quantity)?;
        medicine.updated_at = TimeStamp::new();
        self.tx.put_medicine(&medicine)?;

        tracing::debug!(medicine = %id, quantity, stock = medicine.stock, "stock decremented");
        Ok(())
    }

    /// Put `quantity` units back. Only ever mirrors an earlier decrement.
    pub fn increment(&mut self, id: MedicineId, quantity: u64) -> Result<(), RequestError> {
        let mut medicine = self.load(id)?;
        medicine.stock = u32::try_from(quantity)
            .ok()
            .and_then(|quantity| medicine.stock.checked_add(quantity))
            .ok_or(RequestError::StockOverflow {
                medicine_id: id,
                quantity,
            })?;
        medicine.updated_at = TimeStamp::new();
        self.tx.put_medicine(&medicine)?;

        tracing::debug!(medicine = %id, quantity, stock = medicine.stock, "stock restored");
        Ok(())
    }

    /// Dispense every line item. All medicines are checked before the first
    /// decrement is written, so a shortage anywhere leaves all stock as it was.
    pub fn deduct(&mut self, items: &[MedicineRequestItem]) -> Result<(), RequestError> {
        let totals = totals_by_medicine(items);

        for (&id, &quantity) in &totals {
            let medicine = self.load(id)?;
            checked_remaining(&medicine, quantity)?;
        }
        for (&id, &quantity) in &totals {
            self.decrement(id, quantity)?;
        }
        Ok(())
    }

    /// Exact inverse of [`deduct`](Self::deduct) for the same items.
    pub fn restore(&mut self, items: &[MedicineRequestItem]) -> Result<(), RequestError> {
        for (id, quantity) in totals_by_medicine(items) {
            self.increment(id, quantity)?;
        }
        Ok(())
    }
}

fn checked_remaining(medicine: &Medicine, quantity: u64) -> Result<u32, RequestError> {
    u64::from(medicine.stock)
        .checked_sub(quantity)
        .and_then(|left| u32::try_from(left).ok())
        .ok_or_else(|| RequestError::InsufficientStock {
            medicine_id: medicine.id,
            medicine_name: medicine.name.clone(),
            requested: quantity,
            available: medicine.stock,
        })
}

// the same medicine can't appear twice in a submitted request, but sum
// anyway so a check never passes per item and then fails on the total
fn totals_by_medicine(items: &[MedicineRequestItem]) -> BTreeMap<MedicineId, u64> {
    let mut totals = BTreeMap::new();
    for item in items {
        *totals.entry(item.medicine_id).or_insert(0) += u64::from(item.quantity);
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;
    use crate::store::RequestStore;
    use crate::types::{ItemId, RequestId};

    fn item(medicine: u64, quantity: u32) -> MedicineRequestItem {
        MedicineRequestItem {
            id: ItemId(100 + medicine),
            request_id: RequestId(1),
            medicine_id: MedicineId(medicine),
            quantity,
        }
    }

    fn stock_of(store: &MemoryStore, id: u64) -> u32 {
        store.medicine(MedicineId(id)).unwrap().unwrap().stock
    }

    #[test]
    fn deduct_then_restore_is_net_zero() {
        let store = MemoryStore::new();
        store.put_medicine(&Medicine::new(MedicineId(1), "Cetirizine", "Virlix", 12)).unwrap();
        store.put_medicine(&Medicine::new(MedicineId(2), "Loperamide", "Diatabs", 4)).unwrap();
        let items = vec![item(1, 5), item(2, 4)];

        store
            .transaction(|tx| StockLedger::new(tx).deduct(&items))
            .unwrap();
        assert_eq!(stock_of(&store, 1), 7);
        assert_eq!(stock_of(&store, 2), 0);

        store
            .transaction(|tx| StockLedger::new(tx).restore(&items))
            .unwrap();
        assert_eq!(stock_of(&store, 1), 12);
        assert_eq!(stock_of(&store, 2), 4);
    }

    #[test]
    fn shortage_on_second_item_writes_nothing() {
        let store = MemoryStore::new();
        store.put_medicine(&Medicine::new(MedicineId(1), "Cetirizine", "Virlix", 12)).unwrap();
        store.put_medicine(&Medicine::new(MedicineId(2), "Loperamide", "Diatabs", 1)).unwrap();
        let items = vec![item(1, 5), item(2, 3)];

        let err = store
            .transaction(|tx| StockLedger::new(tx).deduct(&items))
            .unwrap_err();

        match err {
            RequestError::InsufficientStock {
                medicine_name,
                requested,
                available,
                ..
            } => {
                assert_eq!(medicine_name, "Loperamide");
                assert_eq!(requested, 3);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(stock_of(&store, 1), 12);
    }

    #[test]
    fn repeated_medicine_is_checked_on_its_total() {
        let store = MemoryStore::new();
        store.put_medicine(&Medicine::new(MedicineId(1), "Cetirizine", "Virlix", 6)).unwrap();
        let items = vec![item(1, 4), item(1, 4)];

        let err = store
            .transaction(|tx| StockLedger::new(tx).deduct(&items))
            .unwrap_err();

        assert!(matches!(err, RequestError::InsufficientStock { requested: 8, .. }));
        assert_eq!(stock_of(&store, 1), 6);
    }

    #[test]
    fn decrement_to_exactly_zero_is_allowed() {
        let store = MemoryStore::new();
        store.put_medicine(&Medicine::new(MedicineId(3), "Salbutamol", "Ventolin", 2)).unwrap();

        store
            .transaction(|tx| StockLedger::new(tx).decrement(MedicineId(3), 2))
            .unwrap();

        assert_eq!(stock_of(&store, 3), 0);
    }

    #[test]
    fn unknown_medicine_is_not_found() {
        let store = MemoryStore::new();

        let err = store
            .transaction(|tx| StockLedger::new(tx).increment(MedicineId(42), 1))
            .unwrap_err();

        assert!(matches!(err, RequestError::MedicineNotFound(MedicineId(42))));
    }
}
