//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait
//! on a pessimistic `TransactionDB`. Every compound operation runs in one
//! transaction; `get_for_update_cf` takes an exclusive row lock that is held
//! until commit or rollback (dropping the transaction rolls it back).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, MultiThreaded, Options,
    Transaction, TransactionDB, TransactionDBOptions, TransactionOptions, WriteOptions,
};
use tracing::debug;

use gym_core::{
    check_cancellation_cutoff, Booking, BookingError, BookingId, BookingReceipt, BlockId,
    CancellationReceipt, Canceller, EntryReason, EntryRef, GymTime, LedgerEntry, LedgerEntryId,
    MemberId, Occurrence, OccurrenceId, OccurrenceView, RecurringTemplate, TemplateId,
    UnavailableBlock, CREDITS_PER_BOOKING,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::Store;

type Db = TransactionDB<MultiThreaded>;
type Txn<'db> = Transaction<'db, Db>;
type KvResult = std::result::Result<(Box<[u8]>, Box<[u8]>), rocksdb::Error>;

/// How long a transaction waits for a row lock before giving up with `Busy`.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<Db>,
}

/// A member's ledger, read under its lock key.
struct MemberLedger {
    member: MemberId,
    last: Option<LedgerEntryId>,
    balance: i64,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_lock_timeout(path, DEFAULT_LOCK_TIMEOUT)
    }

    /// Open with a specific row-lock timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open_with_lock_timeout<P: AsRef<Path>>(path: P, lock_timeout: Duration) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let timeout_ms = i64::try_from(lock_timeout.as_millis()).unwrap_or(i64::MAX);
        let mut txn_db_opts = TransactionDBOptions::default();
        txn_db_opts.set_txn_lock_timeout(timeout_ms);
        txn_db_opts.set_default_lock_timeout(timeout_ms);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = Db::open_cf_descriptors(&opts, &txn_db_opts, path, cf_descriptors)?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Run `f` in a transaction and commit it if `f` succeeds.
    fn in_transaction<T>(&self, f: impl FnOnce(&Txn<'_>) -> Result<T>) -> Result<T> {
        let mut txn_opts = TransactionOptions::default();
        txn_opts.set_deadlock_detect(true);
        let txn = self.db.transaction_opt(&WriteOptions::default(), &txn_opts);
        let value = f(&txn)?;
        txn.commit()?;
        Ok(value)
    }

    fn get<T: serde::de::DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Read a row and hold an exclusive lock on its key until commit.
    fn get_locked<T: serde::de::DeserializeOwned>(
        txn: &Txn<'_>,
        cf: &Arc<BoundColumnFamily<'_>>,
        key: &[u8],
    ) -> Result<Option<T>> {
        txn.get_for_update_cf(cf, key, true)?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn scan_all<T: serde::de::DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .iterator_cf(&cf, IteratorMode::Start)
            .map(|item| {
                let (_, value) = item?;
                Self::deserialize(&value)
            })
            .collect()
    }

    fn count_bookings(
        txn: &Txn<'_>,
        cf: &Arc<BoundColumnFamily<'_>>,
        occurrence: &OccurrenceId,
    ) -> Result<u32> {
        let prefix = keys::occurrence_bookings_prefix(occurrence);
        let iter = txn.iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));
        count(prefixed(iter, &prefix))
    }

    fn booked_count(&self, occurrence: &OccurrenceId) -> Result<u32> {
        let cf = self.cf(cf::BOOKINGS_BY_OCCURRENCE)?;
        let prefix = keys::occurrence_bookings_prefix(occurrence);
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));
        count(prefixed(iter, &prefix))
    }

    fn write_occurrence(&self, txn: &Txn<'_>, occurrence: &Occurrence) -> Result<()> {
        let occurrences = self.cf(cf::OCCURRENCES)?;
        let by_date = self.cf(cf::OCCURRENCES_BY_DATE)?;
        txn.put_cf(
            &occurrences,
            keys::occurrence_key(&occurrence.id),
            Self::serialize(occurrence)?,
        )?;
        txn.put_cf(
            &by_date,
            keys::date_index_key(occurrence.date, &occurrence.id),
            [],
        )?;
        Ok(())
    }

    fn delete_occurrence(&self, txn: &Txn<'_>, occurrence: &Occurrence) -> Result<()> {
        let occurrences = self.cf(cf::OCCURRENCES)?;
        let by_date = self.cf(cf::OCCURRENCES_BY_DATE)?;
        txn.delete_cf(&occurrences, keys::occurrence_key(&occurrence.id))?;
        txn.delete_cf(&by_date, keys::date_index_key(occurrence.date, &occurrence.id))?;
        if let Some(template) = occurrence.template_id() {
            let slots = self.cf(cf::OCCURRENCE_SLOTS)?;
            txn.delete_cf(
                &slots,
                keys::slot_key(&template, occurrence.date, occurrence.start_time),
            )?;
        }
        Ok(())
    }

    /// Lock a member's ledger and sum it.
    fn lock_ledger(&self, txn: &Txn<'_>, member: &MemberId) -> Result<MemberLedger> {
        let locks = self.cf(cf::LEDGER_LOCKS)?;
        let ledger = self.cf(cf::LEDGER)?;
        let prefix = keys::member_prefix(member);

        let last = txn
            .get_for_update_cf(&locks, &prefix, true)?
            .map(|bytes| keys::ledger_entry_id(&bytes))
            .transpose()?;

        let iter = txn.iterator_cf(&ledger, IteratorMode::From(&prefix, Direction::Forward));
        let entries = prefixed(iter, &prefix)
            .map(|item| item.and_then(|(_, value)| Self::deserialize::<LedgerEntry>(&value)))
            .collect::<Result<Vec<_>>>()?;

        Ok(MemberLedger {
            member: *member,
            last,
            balance: gym_core::balance(&entries),
        })
    }

    /// Append to a ledger locked by [`Self::lock_ledger`].
    fn append_locked(
        &self,
        txn: &Txn<'_>,
        ledger: &mut MemberLedger,
        mut entry: LedgerEntry,
    ) -> Result<LedgerEntry> {
        if entry.member_id != ledger.member {
            return Err(BookingError::InvalidInput("ledger entry for another member".into()).into());
        }
        entry.id = ledger.last.map_or_else(LedgerEntryId::generate, LedgerEntryId::after);

        let entries = self.cf(cf::LEDGER)?;
        let locks = self.cf(cf::LEDGER_LOCKS)?;
        txn.put_cf(
            &entries,
            keys::ledger_key(&entry.member_id, &entry.id),
            Self::serialize(&entry)?,
        )?;
        txn.put_cf(&locks, keys::member_prefix(&entry.member_id), entry.id.to_bytes())?;

        ledger.last = Some(entry.id);
        ledger.balance += entry.amount;
        Ok(entry)
    }

    fn bookings_by_ids(&self, ids: Vec<BookingId>) -> Result<Vec<Booking>> {
        let mut bookings = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(booking) = self.get_booking(&id)? {
                bookings.push(booking);
            }
        }
        bookings.sort_by_key(|b| b.created_at);
        Ok(bookings)
    }
}

/// Keep iterator items while their key starts with `prefix`.
fn prefixed<'a>(
    iter: impl Iterator<Item = KvResult> + 'a,
    prefix: &'a [u8],
) -> impl Iterator<Item = Result<(Box<[u8]>, Box<[u8]>)>> + 'a {
    iter.map(|item| item.map_err(StoreError::from))
        .take_while(move |item| item.as_ref().map_or(true, |(key, _)| key.starts_with(prefix)))
}

fn count(iter: impl Iterator<Item = Result<(Box<[u8]>, Box<[u8]>)>>) -> Result<u32> {
    let mut n: u32 = 0;
    for item in iter {
        item?;
        n = n.saturating_add(1);
    }
    Ok(n)
}

impl Store for RocksStore {
    // =========================================================================
    // Settings
    // =========================================================================

    fn timezone(&self) -> Result<Option<String>> {
        self.get(cf::SETTINGS, keys::TIMEZONE_SETTING)
    }

    fn set_timezone(&self, name: &str) -> Result<()> {
        let cf = self.cf(cf::SETTINGS)?;
        self.db
            .put_cf(&cf, keys::TIMEZONE_SETTING, Self::serialize(&name)?)?;
        Ok(())
    }

    // =========================================================================
    // Templates
    // =========================================================================

    fn put_template(&self, template: &RecurringTemplate) -> Result<()> {
        let cf = self.cf(cf::TEMPLATES)?;
        self.db.put_cf(
            &cf,
            keys::template_key(&template.id),
            Self::serialize(template)?,
        )?;
        Ok(())
    }

    fn get_template(&self, id: &TemplateId) -> Result<Option<RecurringTemplate>> {
        self.get(cf::TEMPLATES, &keys::template_key(id))
    }

    fn list_templates(&self) -> Result<Vec<RecurringTemplate>> {
        let mut templates: Vec<RecurringTemplate> = self.scan_all(cf::TEMPLATES)?;
        templates.sort_by_key(|t| t.created_at);
        Ok(templates)
    }

    fn delete_template(&self, id: &TemplateId) -> Result<usize> {
        self.in_transaction(|txn| {
            let templates = self.cf(cf::TEMPLATES)?;
            let slots = self.cf(cf::OCCURRENCE_SLOTS)?;
            let occurrences = self.cf(cf::OCCURRENCES)?;
            let by_occurrence = self.cf(cf::BOOKINGS_BY_OCCURRENCE)?;

            let template_key = keys::template_key(id);
            Self::get_locked::<RecurringTemplate>(txn, &templates, &template_key)?
                .ok_or_else(|| BookingError::not_found("template", id))?;

            let prefix = keys::template_slots_prefix(id);
            let iter = txn.iterator_cf(&slots, IteratorMode::From(&prefix, Direction::Forward));
            let occurrence_ids = prefixed(iter, &prefix)
                .map(|item| {
                    item.and_then(|(_, value)| keys::id_bytes_at(&value, 0))
                        .map(OccurrenceId::from_bytes)
                })
                .collect::<Result<Vec<_>>>()?;

            let mut doomed = Vec::with_capacity(occurrence_ids.len());
            let mut bookings = 0usize;
            for occurrence_id in &occurrence_ids {
                let key = keys::occurrence_key(occurrence_id);
                if let Some(occurrence) = Self::get_locked::<Occurrence>(txn, &occurrences, &key)? {
                    bookings += Self::count_bookings(txn, &by_occurrence, occurrence_id)? as usize;
                    doomed.push(occurrence);
                }
            }
            if bookings > 0 {
                return Err(BookingError::TemplateInUse {
                    template_id: id.to_string(),
                    bookings,
                }
                .into());
            }

            for occurrence in &doomed {
                self.delete_occurrence(txn, occurrence)?;
            }
            txn.delete_cf(&templates, &template_key)?;
            Ok(doomed.len())
        })
    }

    // =========================================================================
    // Occurrences
    // =========================================================================

    fn insert_generated(
        &self,
        template: &TemplateId,
        occurrences: &[Occurrence],
    ) -> Result<Vec<OccurrenceId>> {
        self.in_transaction(|txn| {
            let templates = self.cf(cf::TEMPLATES)?;
            let slots = self.cf(cf::OCCURRENCE_SLOTS)?;

            // Holding the template row keeps a concurrent delete from
            // orphaning what we insert.
            Self::get_locked::<RecurringTemplate>(txn, &templates, &keys::template_key(template))?
                .ok_or_else(|| BookingError::not_found("template", template))?;

            let mut inserted = Vec::new();
            for occurrence in occurrences {
                if occurrence.template_id() != Some(*template) {
                    return Err(BookingError::InvalidInput(format!(
                        "occurrence {} was not generated from template {template}",
                        occurrence.id
                    ))
                    .into());
                }
                let slot = keys::slot_key(template, occurrence.date, occurrence.start_time);
                if txn.get_for_update_cf(&slots, &slot, true)?.is_some() {
                    debug!(
                        template_id = %template,
                        date = %occurrence.date,
                        time = %occurrence.start_time,
                        "slot already generated, skipping"
                    );
                    continue;
                }
                txn.put_cf(&slots, &slot, occurrence.id.as_bytes())?;
                self.write_occurrence(txn, occurrence)?;
                inserted.push(occurrence.id);
            }
            Ok(inserted)
        })
    }

    fn insert_occurrence(&self, occurrence: &Occurrence) -> Result<()> {
        self.in_transaction(|txn| self.write_occurrence(txn, occurrence))
    }

    fn get_occurrence(&self, id: &OccurrenceId) -> Result<Option<OccurrenceView>> {
        let Some(occurrence) = self.get::<Occurrence>(cf::OCCURRENCES, &keys::occurrence_key(id))?
        else {
            return Ok(None);
        };
        let booked_count = self.booked_count(id)?;
        Ok(Some(OccurrenceView {
            occurrence,
            booked_count,
        }))
    }

    fn list_occurrences(&self, from: NaiveDate, until: NaiveDate) -> Result<Vec<OccurrenceView>> {
        let by_date = self.cf(cf::OCCURRENCES_BY_DATE)?;
        let start = keys::date_bytes(from);
        let end = keys::date_bytes(until);

        let mut ids = Vec::new();
        for item in self
            .db
            .iterator_cf(&by_date, IteratorMode::From(&start, Direction::Forward))
        {
            let (key, _) = item?;
            if key.get(..4).map_or(true, |date| date >= end.as_slice()) {
                break;
            }
            ids.push(keys::occurrence_from_date_key(&key)?);
        }

        let mut views = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(view) = self.get_occurrence(&id)? {
                views.push(view);
            }
        }
        views.sort_by_key(|v| (v.occurrence.date, v.occurrence.start_time));
        Ok(views)
    }

    // =========================================================================
    // Bookings
    // =========================================================================

    fn book_with_credit(
        &self,
        member: MemberId,
        occurrence_id: &OccurrenceId,
        at: &GymTime,
    ) -> Result<BookingReceipt> {
        self.in_transaction(|txn| {
            let occurrences = self.cf(cf::OCCURRENCES)?;
            let bookings = self.cf(cf::BOOKINGS)?;
            let by_occurrence = self.cf(cf::BOOKINGS_BY_OCCURRENCE)?;
            let by_member = self.cf(cf::BOOKINGS_BY_MEMBER)?;

            // The occurrence lock serializes every booking and cancellation
            // for it, so the count below cannot change before commit.
            let occurrence: Occurrence =
                Self::get_locked(txn, &occurrences, &keys::occurrence_key(occurrence_id))?
                    .ok_or_else(|| BookingError::not_found("occurrence", occurrence_id))?;

            if occurrence.has_started(at) {
                return Err(BookingError::OccurrenceStarted {
                    occurrence_id: occurrence_id.to_string(),
                    starts_at: occurrence.starts_at(at),
                }
                .into());
            }

            let booked = Self::count_bookings(txn, &by_occurrence, occurrence_id)?;
            if booked >= occurrence.capacity {
                return Err(BookingError::CapacityExceeded {
                    occurrence_id: occurrence_id.to_string(),
                    capacity: occurrence.capacity,
                }
                .into());
            }

            let seat_key = keys::occurrence_member_key(occurrence_id, &member);
            if txn.get_cf(&by_occurrence, &seat_key)?.is_some() {
                return Err(BookingError::DuplicateBooking {
                    member_id: member.to_string(),
                    occurrence_id: occurrence_id.to_string(),
                }
                .into());
            }

            let mut ledger = self.lock_ledger(txn, &member)?;
            if ledger.balance < CREDITS_PER_BOOKING {
                return Err(BookingError::InsufficientCredit {
                    balance: ledger.balance,
                    required: CREDITS_PER_BOOKING,
                }
                .into());
            }

            let booking = Booking::new(member, *occurrence_id, at.now());
            txn.put_cf(&bookings, keys::booking_key(&booking.id), Self::serialize(&booking)?)?;
            txn.put_cf(&by_occurrence, &seat_key, booking.id.as_bytes())?;
            txn.put_cf(&by_member, keys::member_booking_key(&member, &booking.id), [])?;

            let mut debit = LedgerEntry::debit(
                member,
                CREDITS_PER_BOOKING,
                EntryReason::Booking,
                EntryRef::Booking(booking.id),
            );
            debit.created_at = at.now();
            self.append_locked(txn, &mut ledger, debit)?;

            Ok(BookingReceipt {
                booking,
                occurrence,
                booked_count: booked + 1,
                balance_after: ledger.balance,
            })
        })
    }

    fn cancel_booking(
        &self,
        booking_id: &BookingId,
        canceller: Canceller,
        at: &GymTime,
    ) -> Result<CancellationReceipt> {
        self.in_transaction(|txn| {
            let occurrences = self.cf(cf::OCCURRENCES)?;
            let bookings = self.cf(cf::BOOKINGS)?;
            let by_occurrence = self.cf(cf::BOOKINGS_BY_OCCURRENCE)?;
            let by_member = self.cf(cf::BOOKINGS_BY_MEMBER)?;

            let booking_key = keys::booking_key(booking_id);
            let booking: Booking = Self::get_locked(txn, &bookings, &booking_key)?
                .ok_or_else(|| BookingError::not_found("booking", booking_id))?;
            let occurrence: Occurrence = Self::get_locked(
                txn,
                &occurrences,
                &keys::occurrence_key(&booking.occurrence_id),
            )?
            .ok_or_else(|| BookingError::not_found("occurrence", booking.occurrence_id))?;

            let reason = match canceller {
                Canceller::Member(member) => {
                    if member != booking.member_id {
                        return Err(BookingError::Unauthorized.into());
                    }
                    check_cancellation_cutoff(&occurrence, at)?;
                    EntryReason::MemberCancel
                }
                Canceller::Staff => EntryReason::StaffCancel,
            };

            let mut ledger = self.lock_ledger(txn, &booking.member_id)?;

            txn.delete_cf(&bookings, &booking_key)?;
            txn.delete_cf(
                &by_occurrence,
                keys::occurrence_member_key(&booking.occurrence_id, &booking.member_id),
            )?;
            txn.delete_cf(
                &by_member,
                keys::member_booking_key(&booking.member_id, &booking.id),
            )?;

            let mut refund = LedgerEntry::grant(
                booking.member_id,
                CREDITS_PER_BOOKING,
                reason,
                EntryRef::Booking(booking.id),
            );
            refund.created_at = at.now();
            self.append_locked(txn, &mut ledger, refund)?;

            let booked_count = Self::count_bookings(txn, &by_occurrence, &booking.occurrence_id)?;
            Ok(CancellationReceipt {
                booking,
                occurrence,
                booked_count,
                balance_after: ledger.balance,
            })
        })
    }

    fn get_booking(&self, id: &BookingId) -> Result<Option<Booking>> {
        self.get(cf::BOOKINGS, &keys::booking_key(id))
    }

    fn bookings_for_occurrence(&self, occurrence: &OccurrenceId) -> Result<Vec<Booking>> {
        let cf = self.cf(cf::BOOKINGS_BY_OCCURRENCE)?;
        let prefix = keys::occurrence_bookings_prefix(occurrence);
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));
        let ids = prefixed(iter, &prefix)
            .map(|item| {
                item.and_then(|(_, value)| keys::id_bytes_at(&value, 0))
                    .map(BookingId::from_bytes)
            })
            .collect::<Result<Vec<_>>>()?;
        self.bookings_by_ids(ids)
    }

    fn bookings_for_member(&self, member: &MemberId) -> Result<Vec<Booking>> {
        let cf = self.cf(cf::BOOKINGS_BY_MEMBER)?;
        let prefix = keys::member_prefix(member);
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));
        let ids = prefixed(iter, &prefix)
            .map(|item| item.and_then(|(key, _)| keys::booking_from_member_key(&key)))
            .collect::<Result<Vec<_>>>()?;
        self.bookings_by_ids(ids)
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    fn append_entry(&self, entry: &LedgerEntry) -> Result<(LedgerEntry, i64)> {
        self.in_transaction(|txn| {
            let mut ledger = self.lock_ledger(txn, &entry.member_id)?;
            let stored = self.append_locked(txn, &mut ledger, entry.clone())?;
            Ok((stored, ledger.balance))
        })
    }

    fn balance(&self, member: &MemberId) -> Result<i64> {
        let cf = self.cf(cf::LEDGER)?;
        let prefix = keys::member_prefix(member);
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));
        let entries = prefixed(iter, &prefix)
            .map(|item| item.and_then(|(_, value)| Self::deserialize::<LedgerEntry>(&value)))
            .collect::<Result<Vec<_>>>()?;
        Ok(gym_core::balance(&entries))
    }

    fn ledger_entries(
        &self,
        member: &MemberId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        let cf = self.cf(cf::LEDGER)?;
        let prefix = keys::member_prefix(member);
        let end = keys::member_ledger_end(member);
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&end, Direction::Reverse));

        // Keys are time-ordered, so a reverse scan is newest first.
        prefixed(iter, &prefix)
            .skip(offset)
            .take(limit)
            .map(|item| item.and_then(|(_, value)| Self::deserialize(&value)))
            .collect()
    }

    // =========================================================================
    // Unavailable blocks
    // =========================================================================

    fn put_block(&self, block: &UnavailableBlock) -> Result<()> {
        let cf = self.cf(cf::BLOCKS)?;
        self.db
            .put_cf(&cf, keys::block_key(&block.id), Self::serialize(block)?)?;
        Ok(())
    }

    fn list_blocks(&self) -> Result<Vec<UnavailableBlock>> {
        let mut blocks: Vec<UnavailableBlock> = self.scan_all(cf::BLOCKS)?;
        blocks.sort_by_key(|b| (b.weekday, b.start_time));
        Ok(blocks)
    }

    fn delete_block(&self, id: &BlockId) -> Result<()> {
        self.in_transaction(|txn| {
            let cf = self.cf(cf::BLOCKS)?;
            let key = keys::block_key(id);
            if txn.get_for_update_cf(&cf, &key, true)?.is_none() {
                return Err(BookingError::not_found("block", id).into());
            }
            txn.delete_cf(&cf, &key)?;
            Ok(())
        })
    }
}
