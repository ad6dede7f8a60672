use crate::domain::appointment::{Appointment, InsertOutcome, NewAppointment};
use crate::domain::ports::{AppointmentRepository, ProviderResult};
use crate::error::ProviderError;
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, Options, TransactionDB, TransactionDBOptions};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Column Family for appointment rows, keyed by appointment id.
pub const CF_APPOINTMENTS: &str = "appointments";
/// Column Family mapping payment reference to appointment id.
pub const CF_PAYMENT_REFS: &str = "payment_refs";

/// A persistent appointment store using a RocksDB `TransactionDB`.
///
/// The payment reference index is read with `get_for_update_cf`, which takes an
/// exclusive lock on the key even when it is absent. Two transactions racing on
/// the same reference therefore serialize: the loser sees the winner's row.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<TransactionDB>`).
#[derive(Clone)]
pub struct RocksDbAppointmentRepository {
    db: Arc<TransactionDB>,
}

impl RocksDbAppointmentRepository {
    /// Opens or creates a database at the specified path.
    ///
    /// Ensures that the "appointments" and "payment_refs" column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> ProviderResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_appointments = ColumnFamilyDescriptor::new(CF_APPOINTMENTS, Options::default());
        let cf_refs = ColumnFamilyDescriptor::new(CF_PAYMENT_REFS, Options::default());

        let db = TransactionDB::open_cf_descriptors(
            &opts,
            &TransactionDBOptions::default(),
            path,
            vec![cf_appointments, cf_refs],
        )?;

        Ok(Self { db: Arc::new(db) })
    }

    pub fn get(&self, id: Uuid) -> ProviderResult<Option<Appointment>> {
        let cf = self.column_family(CF_APPOINTMENTS)?;
        match self.db.get_cf(cf, id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Number of stored appointments.
    pub fn count(&self) -> ProviderResult<usize> {
        let cf = self.column_family(CF_APPOINTMENTS)?;
        let mut count = 0;
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    fn column_family(&self, name: &str) -> ProviderResult<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| ProviderError::Storage(format!("{} column family not found", name)))
    }

    fn insert_or_fetch_blocking(&self, new_appointment: NewAppointment) -> ProviderResult<InsertOutcome> {
        let cf_appointments = self.column_family(CF_APPOINTMENTS)?;
        let cf_refs = self.column_family(CF_PAYMENT_REFS)?;
        let reference_key = new_appointment.payment_reference.as_bytes().to_vec();

        let txn = self.db.transaction();
        if let Some(id_bytes) = txn.get_for_update_cf(cf_refs, &reference_key, true)? {
            let bytes = txn.get_cf(cf_appointments, &id_bytes)?.ok_or_else(|| {
                ProviderError::Storage(format!(
                    "payment reference {} points at a missing appointment",
                    new_appointment.payment_reference
                ))
            })?;
            let existing: Appointment = serde_json::from_slice(&bytes)?;
            txn.rollback()?;
            return Ok(InsertOutcome::Existing(existing));
        }

        let appointment = new_appointment.into_appointment();
        let value = serde_json::to_vec(&appointment)?;
        txn.put_cf(cf_appointments, appointment.id.as_bytes(), value)?;
        txn.put_cf(cf_refs, &reference_key, appointment.id.as_bytes())?;
        txn.commit()?;

        Ok(InsertOutcome::Created(appointment))
    }
}

#[async_trait]
impl AppointmentRepository for RocksDbAppointmentRepository {
    async fn insert_or_fetch(&self, appointment: NewAppointment) -> ProviderResult<InsertOutcome> {
        let repository = self.clone();
        tokio::task::spawn_blocking(move || repository.insert_or_fetch_blocking(appointment))
            .await
            .map_err(|e| ProviderError::Storage(format!("storage task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::{Currency, MinorUnits, Money};
    use crate::domain::payment::AppointmentDetails;
    use chrono::{NaiveDate, NaiveTime};
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn new_appointment(payment_reference: &str) -> NewAppointment {
        NewAppointment {
            user_id: "user-1".to_string(),
            payment_reference: payment_reference.to_string(),
            details: AppointmentDetails {
                patient_name: "Jane Doe".to_string(),
                appointment_type: "General Checkup".to_string(),
                appointment_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
                appointment_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                contact_number: None,
            },
            amount: Money::from_minor_units(MinorUnits(4999), Currency::usd()).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let repository = RocksDbAppointmentRepository::open(dir.path()).expect("Failed to open RocksDB");

        assert!(repository.db.cf_handle(CF_APPOINTMENTS).is_some());
        assert!(repository.db.cf_handle(CF_PAYMENT_REFS).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_insert_or_fetch() {
        let dir = tempdir().unwrap();
        let repository = RocksDbAppointmentRepository::open(dir.path()).unwrap();

        let first = repository.insert_or_fetch(new_appointment("pi_1")).await.unwrap();
        let second = repository.insert_or_fetch(new_appointment("pi_1")).await.unwrap();

        assert!(first.is_created());
        assert!(!second.is_created());
        assert_eq!(first.appointment().id, second.appointment().id);

        let stored = repository.get(first.appointment().id).unwrap().unwrap();
        assert_eq!(stored.total_amount, dec!(49.99));
        assert_eq!(repository.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rocksdb_survives_reopen() {
        let dir = tempdir().unwrap();
        let id = {
            let repository = RocksDbAppointmentRepository::open(dir.path()).unwrap();
            repository
                .insert_or_fetch(new_appointment("pi_1"))
                .await
                .unwrap()
                .appointment()
                .id
        };

        let repository = RocksDbAppointmentRepository::open(dir.path()).unwrap();
        let replay = repository.insert_or_fetch(new_appointment("pi_1")).await.unwrap();
        assert_eq!(replay, InsertOutcome::Existing(repository.get(id).unwrap().unwrap()));
    }
}
